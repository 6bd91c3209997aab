use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub web_search: WebSearchConfig,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_store_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            collection: default_collection(),
            timeout_secs: default_store_timeout_secs(),
        }
    }
}

fn default_store_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_collection() -> String {
    "documents".to_string()
}
fn default_store_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Falls back to `model` when unset.
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default = "default_ollama_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_model(),
            embedding_model: None,
            timeout_secs: default_ollama_timeout_secs(),
            max_retries: 0,
            max_tokens: None,
        }
    }
}

impl OllamaConfig {
    pub fn embedding_model(&self) -> &str {
        self.embedding_model.as_deref().unwrap_or(&self.model)
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama2".to_string()
}
fn default_ollama_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_n_results")]
    pub n_results: usize,
    #[serde(default = "default_true")]
    pub combine_chunks: bool,
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,
    #[serde(default = "default_min_context_tokens")]
    pub min_context_tokens: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            n_results: default_n_results(),
            combine_chunks: true,
            candidate_multiplier: default_candidate_multiplier(),
            min_context_tokens: default_min_context_tokens(),
        }
    }
}

fn default_n_results() -> usize {
    3
}
fn default_true() -> bool {
    true
}
fn default_candidate_multiplier() -> usize {
    3
}
fn default_min_context_tokens() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

fn default_confidence_threshold() -> f64 {
    docroute_core::classify::DEFAULT_CONFIDENCE_THRESHOLD
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebSearchConfig {
    #[serde(default = "default_web_provider")]
    pub provider: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_web_results")]
    pub results: usize,
    #[serde(default = "default_max_web_results")]
    pub max_results: usize,
    #[serde(default = "default_web_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            provider: default_web_provider(),
            api_key_env: default_api_key_env(),
            results: default_web_results(),
            max_results: default_max_web_results(),
            timeout_secs: default_web_timeout_secs(),
        }
    }
}

impl WebSearchConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_web_provider() -> String {
    "disabled".to_string()
}
fn default_api_key_env() -> String {
    "SERPER_API_KEY".to_string()
}
fn default_web_results() -> usize {
    5
}
fn default_max_web_results() -> usize {
    10
}
fn default_web_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct VocabularyConfig {
    /// JSON snapshot shared between CLI invocations. In-memory only when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_sample_documents")]
    pub sample_documents: usize,
    #[serde(default = "default_sample_chars")]
    pub sample_chars: usize,
    #[serde(default = "default_max_terms")]
    pub max_terms: usize,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            path: None,
            sample_documents: default_sample_documents(),
            sample_chars: default_sample_chars(),
            max_terms: default_max_terms(),
        }
    }
}

fn default_sample_documents() -> usize {
    50
}
fn default_sample_chars() -> usize {
    10_000
}
fn default_max_terms() -> usize {
    100
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    let config = apply_env_overrides(config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

/// `OLLAMA_BASE_URL` and `MODEL` take precedence over the file.
pub fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("OLLAMA_BASE_URL").filter(|v| !v.trim().is_empty()) {
        config.ollama.url = url;
    }
    if let Some(model) = lookup("MODEL").filter(|v| !v.trim().is_empty()) {
        config.ollama.model = model;
    }
    config.ollama.url = config.ollama.url.trim_end_matches('/').to_string();
    config.store.url = config.store.url.trim_end_matches('/').to_string();
    config
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate retrieval
    if config.retrieval.n_results < 1 {
        anyhow::bail!("retrieval.n_results must be >= 1");
    }
    if config.retrieval.candidate_multiplier < 1 {
        anyhow::bail!("retrieval.candidate_multiplier must be >= 1");
    }

    // Validate classifier
    let threshold = config.classifier.confidence_threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        anyhow::bail!("classifier.confidence_threshold must be in (0.0, 1.0]");
    }

    // Validate web search
    match config.web_search.provider.as_str() {
        "disabled" | "serper" => {}
        other => anyhow::bail!(
            "Unknown web search provider: '{}'. Must be disabled or serper.",
            other
        ),
    }
    if config.web_search.max_results < 1 {
        anyhow::bail!("web_search.max_results must be >= 1");
    }
    if config.web_search.results > config.web_search.max_results {
        anyhow::bail!(
            "web_search.results ({}) must not exceed web_search.max_results ({})",
            config.web_search.results,
            config.web_search.max_results
        );
    }

    // Validate vocabulary
    if config.vocabulary.max_terms < 1 {
        anyhow::bail!("vocabulary.max_terms must be >= 1");
    }
    if config.vocabulary.sample_documents < 1 {
        anyhow::bail!("vocabulary.sample_documents must be >= 1");
    }

    Ok(())
}
