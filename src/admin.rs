//! `docroute stats`, `docroute chunks` and `docroute clear`.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use docroute_core::models::{keys, Metadata, SearchHits};
use serde::Serialize;

use crate::app;
use crate::config::Config;
use crate::vocab_file::VocabularyFile;

/// Collection summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub chunks: usize,
    pub documents: usize,
    /// Vector length → number of chunks with that length.
    pub dimensions: BTreeMap<usize, usize>,
}

impl StoreStats {
    pub fn from_hits(hits: &SearchHits) -> Self {
        let mut dimensions = BTreeMap::new();
        for embedding in &hits.embeddings {
            *dimensions.entry(embedding.len()).or_insert(0) += 1;
        }
        let mut sources: Vec<&str> = hits
            .ids
            .iter()
            .map(|id| docroute_core::aggregate::source_id_of(id))
            .collect();
        sources.sort_unstable();
        sources.dedup();
        Self {
            chunks: hits.len(),
            documents: sources.len(),
            dimensions,
        }
    }
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let store = app::build_store(config)?;
    let count = store.count().await.context("Failed to count stored chunks")?;
    let hits = store
        .get_all(true)
        .await
        .context("Failed to list stored chunks")?;
    let stats = StoreStats::from_hits(&hits);

    println!("docroute: Store Stats");
    println!("======================");
    println!();
    println!("  Store:       {}", config.store.url);
    println!("  Collection:  {}", config.store.collection);
    println!();
    println!("  Chunks:      {}", count);
    println!("  Documents:   {}", stats.documents);
    if stats.dimensions.is_empty() {
        println!("  Dimensions:  -");
    }
    for (dims, n) in &stats.dimensions {
        println!("  Dimensions:  {} ({} chunks)", dims, n);
    }
    if stats.dimensions.len() > 1 {
        println!();
        println!("  Warning: mixed vector dimensions; queries will fail for some models.");
    }
    println!();
    Ok(())
}

/// One stored chunk as shown by `docroute chunks`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkInfo {
    pub id: String,
    /// Original chunk text when recorded, otherwise the stored document.
    pub text: String,
    pub filename: String,
    pub has_enrichment: bool,
    pub enrichment: String,
    pub embedding_dimension: usize,
}

impl ChunkInfo {
    fn from_parts(id: &str, document: &str, metadata: Option<&Metadata>, dims: usize) -> Self {
        let text_field = |key: &str| {
            metadata
                .and_then(|m| m.get(key))
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
        };
        let has_enrichment = metadata
            .and_then(|m| m.get(keys::HAS_ENRICHMENT))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        Self {
            id: id.to_string(),
            text: text_field(keys::ORIGINAL_TEXT).unwrap_or(document).to_string(),
            filename: text_field(keys::FILENAME).unwrap_or("unknown").to_string(),
            has_enrichment,
            enrichment: if has_enrichment {
                text_field(keys::ENRICHMENT).unwrap_or_default().to_string()
            } else {
                String::new()
            },
            embedding_dimension: dims,
        }
    }

    fn matches(&self, filter: &ChunkFilter) -> bool {
        let contains = |haystack: &str, needle: &Option<String>| match needle {
            Some(n) => haystack.to_lowercase().contains(&n.to_lowercase()),
            None => true,
        };
        contains(&self.filename, &filter.filename) && contains(&self.text, &filter.content)
    }
}

/// Case-insensitive substring filters for `docroute chunks`.
#[derive(Debug, Clone, Default)]
pub struct ChunkFilter {
    pub filename: Option<String>,
    pub content: Option<String>,
}

/// A page of stored chunks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkPage {
    pub total_in_store: usize,
    pub total_matching: usize,
    pub offset: usize,
    pub chunks: Vec<ChunkInfo>,
}

/// Filter the stored chunks, then return `limit` of them starting at
/// `offset`. An offset past the end yields an empty page.
pub fn list_chunks(
    hits: &SearchHits,
    filter: &ChunkFilter,
    offset: usize,
    limit: usize,
) -> ChunkPage {
    let matching: Vec<ChunkInfo> = hits
        .ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            ChunkInfo::from_parts(
                id,
                hits.documents.get(i).map(String::as_str).unwrap_or_default(),
                hits.metadatas.get(i),
                hits.embeddings.get(i).map_or(0, Vec::len),
            )
        })
        .filter(|chunk| chunk.matches(filter))
        .collect();

    let total_matching = matching.len();
    ChunkPage {
        total_in_store: hits.len(),
        total_matching,
        offset,
        chunks: matching.into_iter().skip(offset).take(limit).collect(),
    }
}

pub async fn run_chunks(
    config: &Config,
    filter: &ChunkFilter,
    offset: usize,
    limit: usize,
    json: bool,
) -> Result<()> {
    let store = app::build_store(config)?;
    let hits = store
        .get_all(true)
        .await
        .context("Failed to list stored chunks")?;
    let page = list_chunks(&hits, filter, offset, limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.total_in_store == 0 {
        println!("The vector store is empty.");
        return Ok(());
    }
    if page.chunks.is_empty() {
        println!(
            "No chunks to show ({} matching, {} stored)",
            page.total_matching, page.total_in_store
        );
        return Ok(());
    }
    println!(
        "Chunks {}-{} of {} matching ({} stored)",
        page.offset + 1,
        page.offset + page.chunks.len(),
        page.total_matching,
        page.total_in_store
    );
    for chunk in &page.chunks {
        println!();
        println!("  {} [{}] dims={}", chunk.id, chunk.filename, chunk.embedding_dimension);
        println!("    {}", preview(&chunk.text, 160));
        if chunk.has_enrichment {
            println!("    enrichment: {}", preview(&chunk.enrichment, 160));
        }
    }
    Ok(())
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

pub async fn run_clear(config: &Config) -> Result<()> {
    let store = app::build_store(config)?;
    let removed = store
        .delete_all()
        .await
        .context("Failed to clear the vector store")?;
    let saved = app::persist_vocabulary(config, &VocabularyFile::seed())?;

    println!("clear");
    println!("  removed chunks: {}", removed);
    if saved.is_some() {
        println!("  vocabulary reset to seed terms");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_from_hits() {
        let hits = SearchHits {
            ids: vec![
                "guide#chunk-0".to_string(),
                "guide#chunk-1".to_string(),
                "faq".to_string(),
            ],
            documents: vec!["a".into(), "b".into(), "c".into()],
            metadatas: Vec::new(),
            distances: Vec::new(),
            embeddings: vec![vec![0.0; 768], vec![0.0; 768], vec![0.0; 384]],
        };
        let stats = StoreStats::from_hits(&hits);
        assert_eq!(stats.chunks, 3);
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.dimensions.get(&768), Some(&2));
        assert_eq!(stats.dimensions.get(&384), Some(&1));
    }

    fn stored_chunks() -> SearchHits {
        let meta = |value: serde_json::Value| match value {
            serde_json::Value::Object(map) => map,
            _ => Metadata::new(),
        };
        SearchHits {
            ids: vec![
                "guide#chunk-0".to_string(),
                "guide#chunk-1".to_string(),
                "faq".to_string(),
                "loose".to_string(),
            ],
            documents: vec![
                "Context: install guide\n\nInstall the agent.".into(),
                "Configure the tenant.".into(),
                "Tenants own one VPC.".into(),
                "orphan".into(),
            ],
            metadatas: vec![
                meta(serde_json::json!({
                    "filename": "Guide.md",
                    "original_text": "Install the agent.",
                    "has_enrichment": true,
                    "enrichment": "install guide"
                })),
                meta(serde_json::json!({"filename": "Guide.md", "enrichment": "ignored"})),
                meta(serde_json::json!({"filename": "faq.txt"})),
            ],
            distances: Vec::new(),
            embeddings: vec![vec![0.0; 4], vec![0.0; 4], vec![0.0; 4]],
        }
    }

    #[test]
    fn test_chunk_fields_from_metadata() {
        let page = list_chunks(&stored_chunks(), &ChunkFilter::default(), 0, 20);
        assert_eq!(page.total_in_store, 4);
        assert_eq!(page.total_matching, 4);

        let first = &page.chunks[0];
        assert_eq!(first.text, "Install the agent.");
        assert!(first.has_enrichment);
        assert_eq!(first.enrichment, "install guide");
        assert_eq!(first.embedding_dimension, 4);

        assert_eq!(page.chunks[1].enrichment, "");
        assert_eq!(page.chunks[1].text, "Configure the tenant.");

        let loose = &page.chunks[3];
        assert_eq!(loose.filename, "unknown");
        assert_eq!(loose.embedding_dimension, 0);
    }

    #[test]
    fn test_chunk_filters_are_case_insensitive_substrings() {
        let hits = stored_chunks();
        let by_file = ChunkFilter {
            filename: Some("guide".to_string()),
            content: None,
        };
        let page = list_chunks(&hits, &by_file, 0, 20);
        assert_eq!(page.total_matching, 2);

        let both = ChunkFilter {
            filename: Some("GUIDE".to_string()),
            content: Some("TENANT".to_string()),
        };
        let page = list_chunks(&hits, &both, 0, 20);
        let ids: Vec<_> = page.chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["guide#chunk-1"]);
    }

    #[test]
    fn test_chunk_pagination() {
        let hits = stored_chunks();
        let page = list_chunks(&hits, &ChunkFilter::default(), 1, 2);
        let ids: Vec<_> = page.chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["guide#chunk-1", "faq"]);
        assert_eq!(page.total_matching, 4);

        let past_end = list_chunks(&hits, &ChunkFilter::default(), 10, 2);
        assert!(past_end.chunks.is_empty());
        assert_eq!(past_end.total_matching, 4);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("héllo   wörld", 7), "héllo w...");
        assert_eq!(preview("short", 10), "short");
    }

    #[test]
    fn test_stats_empty() {
        let stats = StoreStats::from_hits(&SearchHits::default());
        assert_eq!(stats.chunks, 0);
        assert!(stats.dimensions.is_empty());
    }
}
