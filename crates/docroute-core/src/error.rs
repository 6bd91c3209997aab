//! Error types surfaced by collaborators and by the query pipeline.
//!
//! Every collaborator (embedding backend, vector store, answer generator,
//! web search) reports failures through its own typed enum. The
//! orchestrator folds the fatal ones into [`QueryError`] and decides the
//! outcome by matching on the error kind, never on message text.

use thiserror::Error;

use crate::orchestrate::QueryStatus;

/// Failure while computing a query embedding.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding backend returned no vector")]
    Empty,
}

/// Failure reported by a vector store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The query vector does not match the dimensionality of stored vectors.
    ///
    /// Usually means documents were embedded with a different model than
    /// the one currently configured.
    #[error("vector dimension mismatch: query has {actual}, collection expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The store could not be reached.
    #[error("vector store unavailable: {0}")]
    Unavailable(String),

    #[error("vector store error: {0}")]
    Backend(String),
}

/// Failure while generating text (answers or vocabulary extraction).
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Request(String),

    #[error("invalid generation response: {0}")]
    InvalidResponse(String),
}

/// Failure during web search. Always recovered by the orchestrator.
#[derive(Debug, Error)]
pub enum WebSearchError {
    #[error("web search request failed: {0}")]
    Request(String),

    #[error("invalid web search response: {0}")]
    InvalidResponse(String),
}

/// A fatal failure inside the query pipeline.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl QueryError {
    /// The status discriminator reported for this failure.
    pub fn status(&self) -> QueryStatus {
        match self {
            QueryError::Embedding(_) => QueryStatus::EmbeddingBackendFailure,
            QueryError::Store(StoreError::DimensionMismatch { .. }) => {
                QueryStatus::VectorDimensionMismatch
            }
            QueryError::Store(_) | QueryError::Generation(_) => QueryStatus::GenericFailure,
        }
    }

    /// Human-facing message placed in the result's `response` field.
    pub fn response_message(&self) -> String {
        match self {
            QueryError::Embedding(_) => {
                "Error generating embeddings. The embedding model may not support the embedding API."
                    .to_string()
            }
            QueryError::Store(StoreError::DimensionMismatch { .. }) => {
                "Error: Embedding dimension mismatch. Please reprocess documents with the current embedding model."
                    .to_string()
            }
            QueryError::Store(StoreError::Unavailable(_)) => {
                "Error connecting to the vector database.".to_string()
            }
            other => format!("An error occurred while processing your query: {}", other),
        }
    }

    /// Actionable next step for the caller, when one is known.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            QueryError::Embedding(_) => {
                Some("Check that the embedding model supports embeddings or configure a different model.")
            }
            QueryError::Store(StoreError::DimensionMismatch { .. }) => {
                Some("Re-embed the stored documents with the currently configured embedding model.")
            }
            QueryError::Store(StoreError::Unavailable(_)) => {
                Some("Verify the vector store is running and accessible.")
            }
            QueryError::Store(StoreError::Backend(_)) | QueryError::Generation(_) => None,
        }
    }
}
