//! Serper.dev web search client implementing [`WebSearchProvider`].
//!
//! Calls `POST https://google.serper.dev/search` with the API key in the
//! `X-API-KEY` header and maps the `organic` results onto [`WebResult`]s.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use docroute_core::error::WebSearchError;
use docroute_core::models::{Metadata, WebResult};
use docroute_core::web::WebSearchProvider;
use serde::Deserialize;
use serde_json::Value;

use crate::config::WebSearchConfig;

const SERPER_URL: &str = "https://google.serper.dev/search";

pub struct SerperSearch {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    position: Option<u64>,
    #[serde(default)]
    date: Option<String>,
}

impl From<OrganicResult> for WebResult {
    fn from(r: OrganicResult) -> Self {
        let mut extra = Metadata::new();
        if let Some(position) = r.position {
            extra.insert("position".to_string(), Value::from(position));
        }
        if let Some(date) = r.date {
            extra.insert("date".to_string(), Value::from(date));
        }
        WebResult {
            title: r.title,
            content: r.snippet,
            url: r.link,
            extra,
        }
    }
}

impl SerperSearch {
    /// Build a client, reading the API key from `config.api_key_env`.
    pub fn from_config(config: &WebSearchConfig) -> Result<Self> {
        let api_key = match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!(
                "{} environment variable not set (required by web_search.provider = \"serper\")",
                config.api_key_env
            ),
        };
        Self::new(api_key, config.timeout_secs)
    }

    pub fn new(api_key: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
        })
    }
}

#[async_trait]
impl WebSearchProvider for SerperSearch {
    fn name(&self) -> &str {
        "serper"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<WebResult>, WebSearchError> {
        let response = self
            .client
            .post(SERPER_URL)
            .header("X-API-KEY", &self.api_key)
            .json(&serde_json::json!({ "q": query, "num": max_results }))
            .send()
            .await
            .map_err(|e| WebSearchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WebSearchError::Request(format!(
                "Serper API error {}: {}",
                status, body
            )));
        }

        let parsed: SerperResponse = response
            .json()
            .await
            .map_err(|e| WebSearchError::InvalidResponse(e.to_string()))?;
        Ok(into_results(parsed, max_results))
    }
}

fn into_results(response: SerperResponse, max_results: usize) -> Vec<WebResult> {
    response
        .organic
        .into_iter()
        .filter(|r| !r.link.is_empty())
        .take(max_results)
        .map(WebResult::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_organic_results_mapped() {
        let response: SerperResponse = serde_json::from_value(json!({
            "searchParameters": { "q": "tenant isolation" },
            "organic": [
                {
                    "title": "Tenant isolation",
                    "link": "https://example.com/tenants",
                    "snippet": "How tenants are isolated.",
                    "position": 1,
                    "date": "Mar 3, 2025"
                },
                { "title": "No link", "snippet": "dropped" },
                {
                    "title": "VPC basics",
                    "link": "https://example.com/vpc",
                    "snippet": "What a VPC is.",
                    "position": 2
                }
            ]
        }))
        .unwrap();

        let results = into_results(response, 5);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Tenant isolation");
        assert_eq!(results[0].content, "How tenants are isolated.");
        assert_eq!(results[0].url, "https://example.com/tenants");
        assert_eq!(results[0].extra["position"], 1);
        assert!(results[1].extra.get("date").is_none());
    }

    #[test]
    fn test_result_count_bounded() {
        let organic: Vec<Value> = (0..8)
            .map(|i| json!({ "title": format!("r{}", i), "link": format!("https://e.com/{}", i) }))
            .collect();
        let response: SerperResponse =
            serde_json::from_value(json!({ "organic": organic })).unwrap();
        assert_eq!(into_results(response, 3).len(), 3);
    }

    #[test]
    fn test_missing_organic_is_empty() {
        let response: SerperResponse = serde_json::from_value(json!({})).unwrap();
        assert!(into_results(response, 5).is_empty());
    }
}
