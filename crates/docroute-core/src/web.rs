//! Web search trait.

use async_trait::async_trait;

use crate::error::WebSearchError;
use crate::models::WebResult;

/// Live web search used to augment document context.
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    /// Provider identifier (e.g. `"serper"`).
    fn name(&self) -> &str;

    /// Return up to `max_results` results, best first.
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<WebResult>, WebSearchError>;

    /// Render results as a context block placed ahead of document context.
    fn format_as_context(&self, results: &[WebResult]) -> String {
        format_results(results)
    }
}

/// Default context rendering: numbered entries with title, URL and content.
pub fn format_results(results: &[WebResult]) -> String {
    if results.is_empty() {
        return String::new();
    }
    let mut out = String::from("Web search results:\n");
    for (i, r) in results.iter().enumerate() {
        out.push_str(&format!("\n[{}] {}\nURL: {}\n{}\n", i + 1, r.title, r.url, r.content));
    }
    out.trim_end().to_string()
}
