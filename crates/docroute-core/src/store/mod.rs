//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is everything the query pipeline and the term
//! extractor need from storage. Implementations must be `Send + Sync` to
//! work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::SearchHits;

/// Abstract nearest-neighbour store of embedded chunks.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`count`](VectorStore::count) | Number of stored chunks |
/// | [`search`](VectorStore::search) | Nearest neighbours of an embedding |
/// | [`get_all`](VectorStore::get_all) | Every stored chunk |
/// | [`delete_all`](VectorStore::delete_all) | Remove every chunk |
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn count(&self) -> Result<usize, StoreError>;

    /// Up to `top_k` hits ordered by ascending distance.
    ///
    /// Returns [`StoreError::DimensionMismatch`] when `embedding` does not
    /// match the dimensionality of the stored vectors.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<SearchHits, StoreError>;

    /// All stored chunks. Vectors are only included when requested.
    async fn get_all(&self, include_embeddings: bool) -> Result<SearchHits, StoreError>;

    /// Remove every chunk. Returns how many were removed.
    async fn delete_all(&self) -> Result<usize, StoreError>;
}
