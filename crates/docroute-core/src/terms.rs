//! Term extraction: rebuilds the domain vocabulary from corpus text.
//!
//! A rebuild samples the corpus, asks a [`GenerationProvider`] for a JSON
//! array of domain terms, and parses the reply through an ordered chain of
//! parsers. Each parser is total (it returns an empty list instead of
//! failing) and the first one that yields terms wins:
//!
//! 1. [`parse_cleaned_json`]: drop code fences and everything outside the
//!    outermost brackets, parse as JSON.
//! 2. [`parse_bracketed_span`]: parse the first `[...]` span as JSON.
//! 3. [`parse_quoted_strings`]: every double-quoted substring.
//! 4. [`parse_lines`]: one term per short line, list markers removed.
//!
//! When every stage comes back empty, or the model call fails, the seed
//! vocabulary is installed. A rebuild always replaces the whole snapshot.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::generation::{strip_thinking, GenerationProvider};
use crate::store::VectorStore;
use crate::vocabulary::{normalize_terms, DomainVocabulary, VocabularyHandle};

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?").expect("fence regex is valid"));
static SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*?\]").expect("span regex is valid"));
static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)""#).expect("quoted regex is valid"));
static LIST_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*•]+|\d+[.)])\s*").expect("marker regex is valid"));

/// Longest line accepted by [`parse_lines`], in characters.
const MAX_LINE_TERM_CHARS: usize = 100;

/// Sampling and output limits for a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionSettings {
    /// Corpora larger than this are reduced to their shortest documents.
    pub sample_documents: usize,
    /// Cap on the combined sample text, in characters.
    pub sample_chars: usize,
    /// Cap on extracted terms.
    pub max_terms: usize,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            sample_documents: 50,
            sample_chars: 10_000,
            max_terms: 100,
        }
    }
}

/// Parser stage that produced the terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStage {
    CleanedJson,
    BracketedSpan,
    QuotedStrings,
    Lines,
}

impl fmt::Display for ParseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseStage::CleanedJson => "cleaned JSON",
            ParseStage::BracketedSpan => "bracketed span",
            ParseStage::QuotedStrings => "quoted strings",
            ParseStage::Lines => "line heuristic",
        };
        f.write_str(name)
    }
}

type TermParser = fn(&str) -> Vec<String>;

/// The fallback chain, in order.
pub const PARSERS: [(ParseStage, TermParser); 4] = [
    (ParseStage::CleanedJson, parse_cleaned_json),
    (ParseStage::BracketedSpan, parse_bracketed_span),
    (ParseStage::QuotedStrings, parse_quoted_strings),
    (ParseStage::Lines, parse_lines),
];

/// What a rebuild installed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebuildReport {
    pub terms: Vec<String>,
    /// `None` when the seed vocabulary was installed.
    pub stage: Option<ParseStage>,
    pub fell_back: bool,
}

impl RebuildReport {
    fn seed(vocabulary: &DomainVocabulary) -> Self {
        Self {
            terms: vocabulary.terms().to_vec(),
            stage: None,
            fell_back: true,
        }
    }
}

/// Rebuilds the shared vocabulary. Invoked by an administrative trigger,
/// never on its own schedule.
#[derive(Debug, Clone)]
pub struct TermExtractor {
    vocabulary: VocabularyHandle,
    settings: ExtractionSettings,
}

impl TermExtractor {
    pub fn new(vocabulary: VocabularyHandle) -> Self {
        Self {
            vocabulary,
            settings: ExtractionSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ExtractionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the text sample sent to the model.
    ///
    /// Small corpora are used whole. Larger ones keep only the shortest
    /// `sample_documents` documents, which tend to be dense. The joined
    /// text is cut to `sample_chars` characters.
    pub fn sample_documents(&self, documents: &[String]) -> String {
        let mut picked: Vec<&str> = documents.iter().map(String::as_str).collect();
        if picked.len() > self.settings.sample_documents {
            picked.sort_by_key(|d| d.chars().count());
            picked.truncate(self.settings.sample_documents);
        }
        let combined = picked.join("\n\n");
        match combined.char_indices().nth(self.settings.sample_chars) {
            Some((byte_idx, _)) => combined[..byte_idx].to_string(),
            None => combined,
        }
    }

    /// Parse a model reply into normalized terms using the fallback chain.
    pub fn parse_terms(&self, response: &str) -> Option<(Vec<String>, ParseStage)> {
        for (stage, parser) in PARSERS {
            let terms = normalize_terms(parser(response), self.settings.max_terms);
            if terms.is_empty() {
                warn!(stage = %stage, "term parser produced nothing, trying next");
                continue;
            }
            info!(stage = %stage, count = terms.len(), "extracted domain terms");
            return Some((terms, stage));
        }
        None
    }

    /// Rebuild from the given corpus and install the result.
    pub async fn rebuild(
        &self,
        documents: &[String],
        generator: &dyn GenerationProvider,
    ) -> RebuildReport {
        if documents.is_empty() {
            warn!("no documents available for term extraction, installing seed vocabulary");
            return self.install_seed();
        }

        let sample = self.sample_documents(documents);
        let prompt = extraction_prompt(&sample);
        info!(
            documents = documents.len(),
            sample_chars = sample.chars().count(),
            model = generator.model_name(),
            "extracting domain terms"
        );

        let response = match generator.complete(&prompt).await {
            Ok(text) => strip_thinking(&text),
            Err(e) => {
                warn!(error = %e, "term extraction call failed, installing seed vocabulary");
                return self.install_seed();
            }
        };
        debug!(preview = %response.chars().take(200).collect::<String>(), "raw extraction output");

        match self.parse_terms(&response) {
            Some((terms, stage)) => {
                let vocabulary = DomainVocabulary::from_terms(&terms);
                let report = RebuildReport {
                    terms: vocabulary.terms().to_vec(),
                    stage: Some(stage),
                    fell_back: false,
                };
                self.vocabulary.replace(vocabulary);
                report
            }
            None => {
                warn!("all term parsers failed, installing seed vocabulary");
                self.install_seed()
            }
        }
    }

    /// Rebuild from every document currently in `store`.
    ///
    /// A store failure installs the seed vocabulary.
    pub async fn rebuild_from_store(
        &self,
        store: &dyn VectorStore,
        generator: &dyn GenerationProvider,
    ) -> RebuildReport {
        match store.get_all(false).await {
            Ok(hits) => self.rebuild(&hits.documents, generator).await,
            Err(e) => {
                warn!(error = %e, "could not read corpus for term extraction, installing seed vocabulary");
                self.install_seed()
            }
        }
    }

    fn install_seed(&self) -> RebuildReport {
        let seed = DomainVocabulary::seed();
        let report = RebuildReport::seed(&seed);
        self.vocabulary.replace(seed);
        report
    }
}

/// Instructions sent to the model together with the corpus sample.
pub fn extraction_prompt(sample: &str) -> String {
    format!(
        "You extract domain-specific vocabulary from a knowledge base so that \
         questions about it can be recognised.\n\n\
         From the text below, list the terms a user would only use when asking \
         about this material:\n\
         - technical terms and jargon\n\
         - product names, features and components\n\
         - proper nouns (people, organisations, places)\n\
         - abbreviations and acronyms, together with their expansions\n\
         - important multi-word phrases (two or three words)\n\n\
         Output rules:\n\
         - Reply with a JSON array of strings and nothing else.\n\
         - Start with [ and end with ].\n\
         - Write every term in lowercase.\n\
         - No markdown, no code fences, no commentary.\n\n\
         Example: [\"term one\", \"acronym\", \"acronym expansion\", \"product name\"]\n\n\
         Text:\n\n{}\n",
        sample
    )
}

fn terms_from_json(candidate: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<Value>>(candidate.trim()) {
        Ok(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(true) => Some("true".to_string()),
                _ => None,
            })
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Stage 1: strip fences and text outside the outermost brackets.
pub fn parse_cleaned_json(response: &str) -> Vec<String> {
    let cleaned = FENCE_RE.replace_all(response, "");
    let (Some(start), Some(end)) = (cleaned.find('['), cleaned.rfind(']')) else {
        return Vec::new();
    };
    if end < start {
        return Vec::new();
    }
    terms_from_json(&cleaned[start..=end])
}

/// Stage 2: the first non-greedy `[...]` span.
pub fn parse_bracketed_span(response: &str) -> Vec<String> {
    SPAN_RE
        .find(response)
        .map(|m| terms_from_json(m.as_str()))
        .unwrap_or_default()
}

/// Stage 3: every double-quoted substring.
pub fn parse_quoted_strings(response: &str) -> Vec<String> {
    QUOTED_RE
        .captures_iter(response)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Stage 4: one term per line after removing list markers and quotes.
pub fn parse_lines(response: &str) -> Vec<String> {
    response
        .lines()
        .filter_map(|line| {
            let line = LIST_MARKER_RE.replace(line.trim(), "");
            let line: String = line
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .replace(['"', '\''], "");
            let line = line.trim();
            if line.is_empty() || line.chars().count() > MAX_LINE_TERM_CHARS {
                None
            } else {
                Some(line.to_string())
            }
        })
        .collect()
}
