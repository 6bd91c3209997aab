//! ChromaDB REST client implementing [`VectorStore`].
//!
//! Talks to the v1 HTTP API of a Chroma server:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | resolve collection | `POST /api/v1/collections` with `get_or_create` |
//! | count | `GET /api/v1/collections/{id}/count` |
//! | search | `POST /api/v1/collections/{id}/query` |
//! | get all | `POST /api/v1/collections/{id}/get` |
//! | delete all | `POST /api/v1/collections/{id}/delete` with every id |
//!
//! The collection id is resolved once and cached. Connection failures map
//! to [`StoreError::Unavailable`]; an error body complaining about
//! dimensionality maps to [`StoreError::DimensionMismatch`].

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use docroute_core::error::StoreError;
use docroute_core::models::{Metadata, SearchHits};
use docroute_core::store::VectorStore;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::StoreConfig;

pub struct ChromaStore {
    client: reqwest::Client,
    url: String,
    collection: String,
    collection_id: OnceCell<String>,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
}

/// `/query` returns one inner list per query embedding.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f64>>>>,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    ids: Vec<String>,
    #[serde(default)]
    documents: Option<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Option<Vec<Option<Metadata>>>,
    #[serde(default)]
    embeddings: Option<Vec<Vec<f32>>>,
}

impl ChromaStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
            collection: config.collection.clone(),
            collection_id: OnceCell::new(),
        })
    }

    async fn collection_id(&self) -> Result<&str, StoreError> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                let created: CollectionResponse = self
                    .send(
                        self.client
                            .post(format!("{}/api/v1/collections", self.url))
                            .json(&json!({ "name": self.collection, "get_or_create": true })),
                    )
                    .await?;
                debug!(collection = %self.collection, id = %created.id, "resolved Chroma collection");
                Ok::<_, StoreError>(created.id)
            })
            .await?;
        Ok(id.as_str())
    }

    fn collection_url(&self, id: &str, op: &str) -> String {
        format!("{}/api/v1/collections/{}/{}", self.url, id, op)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, StoreError> {
        let response = request.send().await.map_err(|e| {
            StoreError::Unavailable(format!("Chroma at {} unreachable: {}", self.url, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error_body(status.as_u16(), &body));
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("invalid Chroma response: {}", e)))
    }
}

/// Map a failed Chroma response onto a store error kind.
pub fn classify_error_body(status: u16, body: &str) -> StoreError {
    if body.to_lowercase().contains("dimension") {
        let numbers: Vec<usize> = body
            .split(|c: char| !c.is_ascii_digit())
            .filter_map(|s| s.parse().ok())
            .collect();
        // Chroma reports the offending size first, then the collection's.
        let (actual, expected) = match numbers.as_slice() {
            [actual, expected, ..] => (*actual, *expected),
            _ => (0, 0),
        };
        return StoreError::DimensionMismatch { expected, actual };
    }
    StoreError::Backend(format!("Chroma error {}: {}", status, body))
}

fn first_batch<T>(batches: Option<Vec<Vec<T>>>) -> Vec<T> {
    batches
        .and_then(|b| b.into_iter().next())
        .unwrap_or_default()
}

fn flatten_query(response: QueryResponse) -> SearchHits {
    let ids = first_batch(Some(response.ids));
    let documents = first_batch(response.documents);
    let metadatas = first_batch(response.metadatas);
    let distances = first_batch(response.distances);

    SearchHits {
        documents: documents.into_iter().map(Option::unwrap_or_default).collect(),
        metadatas: metadatas.into_iter().map(Option::unwrap_or_default).collect(),
        distances: distances.into_iter().map(|d| d.unwrap_or(0.0)).collect(),
        ids,
        embeddings: Vec::new(),
    }
}

fn flatten_get(response: GetResponse) -> SearchHits {
    SearchHits {
        documents: response
            .documents
            .unwrap_or_default()
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect(),
        metadatas: response
            .metadatas
            .unwrap_or_default()
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect(),
        distances: Vec::new(),
        embeddings: response.embeddings.unwrap_or_default(),
        ids: response.ids,
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn count(&self) -> Result<usize, StoreError> {
        let id = self.collection_id().await?;
        self.send(self.client.get(self.collection_url(id, "count")))
            .await
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<SearchHits, StoreError> {
        let id = self.collection_id().await?;
        let body = json!({
            "query_embeddings": [embedding],
            "n_results": top_k,
            "include": ["documents", "metadatas", "distances"],
        });
        let response: QueryResponse = self
            .send(self.client.post(self.collection_url(id, "query")).json(&body))
            .await?;
        Ok(flatten_query(response))
    }

    async fn get_all(&self, include_embeddings: bool) -> Result<SearchHits, StoreError> {
        let id = self.collection_id().await?;
        let mut include = vec!["documents", "metadatas"];
        if include_embeddings {
            include.push("embeddings");
        }
        let response: GetResponse = self
            .send(
                self.client
                    .post(self.collection_url(id, "get"))
                    .json(&json!({ "include": include })),
            )
            .await?;
        Ok(flatten_get(response))
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        let id = self.collection_id().await?;
        let listed: GetResponse = self
            .send(
                self.client
                    .post(self.collection_url(id, "get"))
                    .json(&json!({ "include": [] })),
            )
            .await?;
        if listed.ids.is_empty() {
            return Ok(0);
        }

        let removed = listed.ids.len();
        let _: Value = self
            .send(
                self.client
                    .post(self.collection_url(id, "delete"))
                    .json(&json!({ "ids": listed.ids })),
            )
            .await?;
        Ok(removed)
    }
}
