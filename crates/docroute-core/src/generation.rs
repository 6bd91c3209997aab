//! Text generation trait and output cleanup.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::GenerationError;

static THINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("think regex is valid"));

/// Reply used when the context does not contain the answer.
pub const NO_ANSWER_REPLY: &str =
    "I could not find relevant information in the provided context. Please provide additional details if needed.";

/// A text-generation backend.
///
/// Implementors provide [`complete`](GenerationProvider::complete) for raw
/// prompts. [`generate`](GenerationProvider::generate) wraps the context and
/// query in the grounded answer prompt and is what the query pipeline
/// calls. Vocabulary extraction uses `complete` directly.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn model_name(&self) -> &str;

    /// Run a raw prompt and return the model's text.
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Answer `query` using only `context`.
    async fn generate(&self, context: &str, query: &str) -> Result<String, GenerationError> {
        self.complete(&answer_prompt(context, query)).await
    }
}

/// The grounded answer prompt.
pub fn answer_prompt(context: &str, query: &str) -> String {
    format!(
        "You are an assistant that must follow strict response rules.\n\n\
         Rules:\n\
         1. Use ONLY information from the context below.\n\
         2. If the answer is not in the context, reply exactly with:\n   \
         '{}'\n\
         3. Do not answer from outside knowledge.\n\
         4. Do not make up information.\n\n\
         Context:\n\"\"\"\n{}\n\"\"\"\n\n\
         Query: {}",
        NO_ANSWER_REPLY, context, query
    )
}

/// Remove `<think>…</think>` regions and surrounding whitespace.
///
/// ```rust
/// use docroute_core::generation::strip_thinking;
///
/// assert_eq!(strip_thinking("<think>hmm</think>\nAnswer."), "Answer.");
/// ```
pub fn strip_thinking(text: &str) -> String {
    THINK_RE.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_multiline_regions() {
        let raw = "<think>\nstep one\nstep two\n</think>\n\nThe tenant is created.";
        assert_eq!(strip_thinking(raw), "The tenant is created.");
    }

    #[test]
    fn test_strips_every_region_non_greedy() {
        let raw = "A <think>x</think>B<think>y</think> C";
        assert_eq!(strip_thinking(raw), "A B C");
    }

    #[test]
    fn test_leaves_plain_output_alone() {
        assert_eq!(strip_thinking("  plain answer "), "plain answer");
    }

    #[test]
    fn test_answer_prompt_embeds_context_and_query() {
        let prompt = answer_prompt("Tenants own VPCs.", "who owns a vpc?");
        assert!(prompt.contains("\"\"\"\nTenants own VPCs.\n\"\"\""));
        assert!(prompt.ends_with("Query: who owns a vpc?"));
        assert!(prompt.contains(NO_ANSWER_REPLY));
    }

    #[test]
    fn test_unclosed_region_is_kept() {
        assert_eq!(strip_thinking("<think>never closed"), "<think>never closed");
    }
}
