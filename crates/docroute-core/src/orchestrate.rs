//! Query orchestration: one grounded answer per query.
//!
//! [`Orchestrator::process`] runs a strictly sequential pipeline:
//!
//! ```text
//! count ─▶ embed ─▶ search ─▶ aggregate ─▶ route ─▶ web? ─▶ generate
//!   │                  │                      │        │
//!   └─ EmptyCorpus     └─ NotFound            │        └─ failure logged,
//!                                             │           document-only
//!                       classifier or explicit flag
//! ```
//!
//! Every fatal failure becomes a [`QueryResult`] with a failure status and
//! empty sources. Web search failures are the only ones recovered.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::aggregate::{combine, singleton_groups};
use crate::classify::{ClassificationResult, QueryClassifier, SourceType};
use crate::embedding::EmbeddingProvider;
use crate::error::{EmbeddingError, QueryError};
use crate::generation::{strip_thinking, GenerationProvider};
use crate::models::{DocumentGroup, Metadata, WebResult};
use crate::store::VectorStore;
use crate::web::WebSearchProvider;

/// Response text for an empty store.
pub const EMPTY_CORPUS_MESSAGE: &str =
    "No documents have been processed yet. Add documents to the vector store before querying.";
/// Response text when retrieval finds nothing.
pub const NOT_FOUND_MESSAGE: &str = "No relevant documents found in the database.";

/// Outcome discriminator carried by every [`QueryResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Success,
    EmptyCorpus,
    NotFound,
    EmbeddingBackendFailure,
    VectorDimensionMismatch,
    GenericFailure,
}

impl QueryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryStatus::Success => "success",
            QueryStatus::EmptyCorpus => "empty_corpus",
            QueryStatus::NotFound => "not_found",
            QueryStatus::EmbeddingBackendFailure => "embedding_backend_failure",
            QueryStatus::VectorDimensionMismatch => "vector_dimension_mismatch",
            QueryStatus::GenericFailure => "generic_failure",
        }
    }

    /// True for the fatal statuses.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            QueryStatus::EmbeddingBackendFailure
                | QueryStatus::VectorDimensionMismatch
                | QueryStatus::GenericFailure
        )
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request options.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Groups (or raw chunks) used for context and sources.
    pub n_results: usize,
    /// Merge chunks of the same document before ranking.
    pub combine_chunks: bool,
    /// `Some` forces web augmentation on or off and skips classification.
    pub web_search: Option<bool>,
    pub web_results_count: usize,
    /// Attach the classification payload to the result.
    pub explain_classification: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            n_results: 3,
            combine_chunks: true,
            web_search: None,
            web_results_count: 5,
            explain_classification: false,
        }
    }
}

/// Pipeline constants shared by every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Raw hits fetched per requested group when combining chunks.
    pub candidate_multiplier: usize,
    /// Below this many whitespace tokens the second group is appended.
    pub min_context_tokens: usize,
    /// Upper bound on web results per request.
    pub max_web_results: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            candidate_multiplier: 3,
            min_context_tokens: 100,
            max_web_results: 10,
        }
    }
}

/// Material the answer was built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Sources {
    pub documents: Vec<String>,
    pub ids: Vec<String>,
    pub metadatas: Vec<Metadata>,
    pub distances: Vec<f64>,
    pub combined_chunks: bool,
    pub web_results: Vec<WebResult>,
}

impl Sources {
    /// Combined groups report merged text under the source id; otherwise
    /// every raw chunk is reported as retrieved.
    fn from_groups(groups: &[DocumentGroup], combined: bool, web_results: Vec<WebResult>) -> Self {
        let mut sources = Sources {
            combined_chunks: combined,
            web_results,
            ..Sources::default()
        };
        if combined {
            for group in groups {
                sources.documents.push(group.merged_text.clone());
                sources.ids.push(group.source_id.clone());
                sources.metadatas.push(group.metadata.clone());
                sources.distances.push(group.average_distance);
            }
        } else {
            for chunk in groups.iter().flat_map(|g| &g.chunks) {
                sources.documents.push(chunk.text.clone());
                sources.ids.push(chunk.id.clone());
                sources.metadatas.push(chunk.metadata.clone());
                sources.distances.push(chunk.distance);
            }
        }
        sources
    }
}

/// Structured answer for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub query: String,
    pub response: String,
    pub sources: Sources,
    pub status: QueryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
    /// True only when at least one web result reached the context.
    pub web_search_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationResult>,
}

impl QueryResult {
    fn terminal(query: &str, status: QueryStatus, response: &str) -> Self {
        Self {
            query: query.to_string(),
            response: response.to_string(),
            sources: Sources::default(),
            status,
            error: None,
            suggestion: None,
            source_type: None,
            web_search_used: false,
            classification: None,
        }
    }

    fn empty_corpus(query: &str) -> Self {
        let mut result = Self::terminal(query, QueryStatus::EmptyCorpus, EMPTY_CORPUS_MESSAGE);
        result.error = Some("Empty collection".to_string());
        result
    }

    fn not_found(query: &str) -> Self {
        Self::terminal(query, QueryStatus::NotFound, NOT_FOUND_MESSAGE)
    }

    fn failure(query: &str, err: &QueryError) -> Self {
        let mut result = Self::terminal(query, err.status(), &err.response_message());
        result.error = Some(err.to_string());
        result.suggestion = err.suggestion().map(str::to_string);
        result
    }
}

/// Join the top group's text with the runner-up when the top group is short.
pub fn assemble_context(groups: &[DocumentGroup], min_tokens: usize) -> String {
    let mut iter = groups.iter();
    let Some(first) = iter.next() else {
        return String::new();
    };
    match iter.next() {
        Some(second) if first.merged_text.split_whitespace().count() < min_tokens => {
            format!("{}\n\n{}", first.merged_text, second.merged_text)
        }
        _ => first.merged_text.clone(),
    }
}

/// Similarity scores fed to the classifier: `1 - min(distance, 1)`.
pub fn similarity_scores(groups: &[DocumentGroup]) -> Vec<f64> {
    groups
        .iter()
        .map(|g| 1.0 - g.average_distance.min(1.0))
        .collect()
}

/// Sequences the collaborators for each query.
///
/// Requests share nothing mutable except the classifier's vocabulary
/// handle, so one orchestrator can serve concurrent queries.
pub struct Orchestrator {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn GenerationProvider>,
    web: Option<Arc<dyn WebSearchProvider>>,
    classifier: QueryClassifier,
    settings: PipelineSettings,
}

impl Orchestrator {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn GenerationProvider>,
        classifier: QueryClassifier,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            web: None,
            classifier,
            settings: PipelineSettings::default(),
        }
    }

    pub fn with_web_search(mut self, web: Arc<dyn WebSearchProvider>) -> Self {
        self.web = Some(web);
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Answer `query`. Never fails: errors are reported through the
    /// result's status, `error` and `suggestion` fields.
    pub async fn process(&self, query: &str, options: &QueryOptions) -> QueryResult {
        match self.run(query, options).await {
            Ok(result) => result,
            Err(e) => {
                error!(status = %e.status(), error = %e, "query failed");
                QueryResult::failure(query, &e)
            }
        }
    }

    async fn run(&self, query: &str, options: &QueryOptions) -> Result<QueryResult, QueryError> {
        let stored = self.store.count().await?;
        if stored == 0 {
            info!("vector store is empty, skipping retrieval");
            return Ok(QueryResult::empty_corpus(query));
        }

        let embedding = self.embedder.embed(query).await?;
        if embedding.is_empty() {
            return Err(EmbeddingError::Empty.into());
        }
        info!(
            dims = embedding.len(),
            model = self.embedder.model_name(),
            "embedded query"
        );

        let top_k = if options.combine_chunks {
            options
                .n_results
                .saturating_mul(self.settings.candidate_multiplier)
        } else {
            options.n_results
        };
        let hits = self.store.search(&embedding, top_k).await?;
        info!(requested = top_k, returned = hits.len(), "retrieved chunks");
        if hits.is_empty() {
            return Ok(QueryResult::not_found(query));
        }

        let chunks = hits.into_chunks();
        let groups = if options.combine_chunks {
            combine(chunks, options.n_results)
        } else {
            singleton_groups(chunks)
        };
        if groups.is_empty() {
            return Ok(QueryResult::not_found(query));
        }
        debug!(groups = groups.len(), "assembled document groups");

        let mut context = assemble_context(&groups, self.settings.min_context_tokens);

        let (source_type, classification) = match options.web_search {
            Some(true) => (SourceType::Web, None),
            Some(false) => (SourceType::Documents, None),
            None => {
                let scores = similarity_scores(&groups);
                let verdict = self.classifier.classify(query, Some(&scores));
                info!(
                    source_type = %verdict.source_type,
                    confidence = verdict.confidence,
                    matched_terms = verdict.matched_terms.len(),
                    "classified query"
                );
                (verdict.source_type, Some(verdict))
            }
        };

        let web_results = if source_type.wants_web() {
            self.search_web(query, options.web_results_count).await
        } else {
            Vec::new()
        };
        if let (Some(web), false) = (&self.web, web_results.is_empty()) {
            context = format!("{}\n\n{}", web.format_as_context(&web_results), context);
            info!(results = web_results.len(), "added web results to context");
        }

        let answer = self.generator.generate(&context, query).await?;
        let answer = strip_thinking(&answer);

        Ok(QueryResult {
            query: query.to_string(),
            response: answer,
            web_search_used: !web_results.is_empty(),
            sources: Sources::from_groups(&groups, options.combine_chunks, web_results),
            status: QueryStatus::Success,
            error: None,
            suggestion: None,
            source_type: Some(source_type),
            classification: classification.filter(|_| options.explain_classification),
        })
    }

    /// Web augmentation. Failures are logged and yield no results.
    async fn search_web(&self, query: &str, requested: usize) -> Vec<WebResult> {
        let Some(web) = &self.web else {
            debug!("web augmentation wanted but no provider is configured");
            return Vec::new();
        };
        let limit = requested.min(self.settings.max_web_results);
        if limit == 0 {
            return Vec::new();
        }

        info!(provider = web.name(), limit, "searching the web");
        match web.search(query, limit).await {
            Ok(mut results) => {
                results.truncate(limit);
                results
            }
            Err(e) => {
                warn!(provider = web.name(), error = %e, "web search failed, continuing with documents only");
                Vec::new()
            }
        }
    }
}
