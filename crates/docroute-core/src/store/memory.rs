//! In-memory [`VectorStore`] implementation for tests and embedding.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`. Search is
//! brute-force cosine distance over every stored vector. The first stored
//! vector fixes the collection's dimensionality.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::error::StoreError;
use crate::models::{Metadata, SearchHits};

use super::VectorStore;

/// One stored chunk.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

impl StoredChunk {
    pub fn new(id: impl Into<String>, document: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            document: document.into(),
            metadata: Metadata::new(),
            embedding,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<StoredChunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace chunks by id.
    pub fn upsert(&self, chunks: impl IntoIterator<Item = StoredChunk>) -> Result<(), StoreError> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        for chunk in chunks {
            if let Some(expected) = records.first().map(|r| r.embedding.len()) {
                if chunk.embedding.len() != expected {
                    return Err(StoreError::DimensionMismatch {
                        expected,
                        actual: chunk.embedding.len(),
                    });
                }
            }
            records.retain(|r| r.id != chunk.id);
            records.push(chunk);
        }
        Ok(())
    }

    fn dims(records: &[StoredChunk]) -> Option<usize> {
        records.first().map(|r| r.embedding.len())
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().unwrap_or_else(|e| e.into_inner()).len())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<SearchHits, StoreError> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        if let Some(expected) = Self::dims(&records) {
            if expected != embedding.len() {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        let mut scored: Vec<(f64, &StoredChunk)> = records
            .iter()
            .map(|r| (cosine_distance(embedding, &r.embedding), r))
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        let mut hits = SearchHits::default();
        for (distance, r) in scored {
            hits.ids.push(r.id.clone());
            hits.documents.push(r.document.clone());
            hits.metadatas.push(r.metadata.clone());
            hits.distances.push(distance);
        }
        Ok(hits)
    }

    async fn get_all(&self, include_embeddings: bool) -> Result<SearchHits, StoreError> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut hits = SearchHits::default();
        for r in records.iter() {
            hits.ids.push(r.id.clone());
            hits.documents.push(r.document.clone());
            hits.metadatas.push(r.metadata.clone());
            if include_embeddings {
                hits.embeddings.push(r.embedding.clone());
            }
        }
        Ok(hits)
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let removed = records.len();
        records.clear();
        Ok(removed)
    }
}
