//! Core data models that flow through the query pipeline.
//!
//! Chunk metadata is schema-less: ingestion may attach arbitrary keys, so
//! it is carried as an open JSON map. The keys below have a fixed meaning.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Open key/value metadata attached to a stored chunk.
pub type Metadata = serde_json::Map<String, Value>;

/// Reserved metadata keys.
pub mod keys {
    /// Name of the file the chunk was cut from.
    pub const FILENAME: &str = "filename";
    /// Chunk text before enrichment was appended.
    pub const ORIGINAL_TEXT: &str = "original_text";
    /// Model-generated enrichment text.
    pub const ENRICHMENT: &str = "enrichment";
    /// Whether `enrichment` is present.
    pub const HAS_ENRICHMENT: &str = "has_enrichment";
    /// Number of chunks merged into a document group.
    pub const CHUNK_COUNT: &str = "chunk_count";
    /// Ordered member chunk ids of a document group.
    pub const CHUNKS: &str = "chunks";
}

/// Literal marker separating a source document id from a chunk suffix.
pub const CHUNK_MARKER: &str = "#chunk-";

/// Raw nearest-neighbour response from a vector store.
///
/// The four vectors are parallel: index `i` of each describes one hit.
/// Stores may omit `metadatas` or `distances`; missing entries default to
/// an empty map and `0.0` when converted into [`RetrievedChunk`]s.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHits {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    #[serde(default)]
    pub metadatas: Vec<Metadata>,
    #[serde(default)]
    pub distances: Vec<f64>,
    /// Stored vectors, only populated when explicitly requested.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeddings: Vec<Vec<f32>>,
}

impl SearchHits {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() || self.documents.is_empty()
    }

    /// Convert the parallel arrays into chunks, preserving retrieval order.
    pub fn into_chunks(self) -> Vec<RetrievedChunk> {
        let mut metadatas = self.metadatas.into_iter();
        let mut distances = self.distances.into_iter();
        self.ids
            .into_iter()
            .zip(self.documents)
            .map(|(id, text)| {
                RetrievedChunk::new(
                    id,
                    text,
                    metadatas.next().unwrap_or_default(),
                    distances.next().unwrap_or(0.0),
                )
            })
            .collect()
    }
}

/// One retrieval hit. Read-only inside the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    /// Document this chunk belongs to, derived from `id`.
    pub source_id: String,
    pub metadata: Metadata,
    /// Smaller is more similar. Metric owned by the store.
    pub distance: f64,
}

impl RetrievedChunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>, metadata: Metadata, distance: f64) -> Self {
        let id = id.into();
        let source_id = crate::aggregate::source_id_of(&id).to_string();
        Self {
            id,
            text: text.into(),
            source_id,
            metadata,
            distance,
        }
    }
}

/// Chunks of one source document, merged for context assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentGroup {
    pub source_id: String,
    /// Members in retrieval order.
    pub chunks: Vec<RetrievedChunk>,
    pub average_distance: f64,
    pub merged_text: String,
    /// First member's metadata plus `chunk_count` and `chunks`.
    pub metadata: Metadata,
}

impl DocumentGroup {
    /// Start a group from its first member.
    pub fn new(first: RetrievedChunk) -> Self {
        let mut group = Self {
            source_id: first.source_id.clone(),
            chunks: Vec::new(),
            average_distance: 0.0,
            merged_text: String::new(),
            metadata: Metadata::new(),
        };
        group.push(first);
        group
    }

    /// Append a member and recompute every derived field.
    pub fn push(&mut self, chunk: RetrievedChunk) {
        self.chunks.push(chunk);
        self.refresh();
    }

    pub fn member_ids(&self) -> Vec<&str> {
        self.chunks.iter().map(|c| c.id.as_str()).collect()
    }

    fn refresh(&mut self) {
        let n = self.chunks.len();
        self.average_distance = self.chunks.iter().map(|c| c.distance).sum::<f64>() / n as f64;
        self.merged_text = self
            .chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut metadata = self
            .chunks
            .first()
            .map(|c| c.metadata.clone())
            .unwrap_or_default();
        metadata.insert(keys::CHUNK_COUNT.to_string(), Value::from(n));
        metadata.insert(
            keys::CHUNKS.to_string(),
            Value::from(
                self.chunks
                    .iter()
                    .map(|c| Value::from(c.id.clone()))
                    .collect::<Vec<_>>(),
            ),
        );
        self.metadata = metadata;
    }
}

/// One web search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub content: String,
    pub url: String,
    /// Provider-specific extras (date, position, site links).
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub extra: Metadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(v: Value) -> Metadata {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_into_chunks_fills_missing_columns() {
        let hits = SearchHits {
            ids: vec!["a#chunk-0".into(), "b".into()],
            documents: vec!["alpha".into(), "beta".into()],
            metadatas: vec![meta(json!({"filename": "a.txt"}))],
            distances: vec![],
            embeddings: vec![],
        };
        let chunks = hits.into_chunks();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].source_id, "a");
        assert_eq!(chunks[0].metadata["filename"], "a.txt");
        assert_eq!(chunks[1].source_id, "b");
        assert!(chunks[1].metadata.is_empty());
        assert_eq!(chunks[1].distance, 0.0);
    }

    #[test]
    fn test_group_recomputes_on_push() {
        let mut group = DocumentGroup::new(RetrievedChunk::new(
            "doc#chunk-0",
            "first",
            meta(json!({"filename": "doc.txt"})),
            0.2,
        ));
        group.push(RetrievedChunk::new(
            "doc#chunk-3",
            "second",
            meta(json!({"filename": "other.txt"})),
            0.4,
        ));

        assert!((group.average_distance - 0.3).abs() < 1e-9);
        assert_eq!(group.merged_text, "first\n\nsecond");
        assert_eq!(group.metadata["filename"], "doc.txt");
        assert_eq!(group.metadata[keys::CHUNK_COUNT], 2);
        assert_eq!(
            group.metadata[keys::CHUNKS],
            json!(["doc#chunk-0", "doc#chunk-3"])
        );
    }

    #[test]
    fn test_group_metadata_is_a_copy() {
        let original = meta(json!({"filename": "doc.txt"}));
        let group = DocumentGroup::new(RetrievedChunk::new("doc", "t", original.clone(), 0.1));
        assert!(!original.contains_key(keys::CHUNK_COUNT));
        assert!(group.metadata.contains_key(keys::CHUNK_COUNT));
    }
}
