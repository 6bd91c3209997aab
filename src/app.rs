//! Wiring: collaborators and pipeline components built from [`Config`].

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use docroute_core::classify::QueryClassifier;
use docroute_core::orchestrate::{Orchestrator, PipelineSettings, QueryOptions};
use docroute_core::store::VectorStore;
use docroute_core::terms::{ExtractionSettings, TermExtractor};
use docroute_core::vocabulary::{DomainVocabulary, VocabularyHandle};
use tracing::{debug, info, warn};

use crate::chroma::ChromaStore;
use crate::config::Config;
use crate::ollama::{OllamaEmbedder, OllamaGenerator};
use crate::serper::SerperSearch;
use crate::vocab_file;

/// Load the persisted vocabulary, or the seed set when none is stored.
///
/// An unreadable snapshot is logged and replaced by the seed set so that
/// queries keep working until the next `vocab rebuild`.
pub fn load_vocabulary(config: &Config) -> VocabularyHandle {
    let vocabulary = match config.vocabulary.path.as_deref().map(vocab_file::load) {
        Some(Ok(Some(file))) => {
            debug!(terms = file.terms.len(), generated_at = %file.generated_at, "loaded vocabulary snapshot");
            file.to_vocabulary()
        }
        Some(Err(e)) => {
            warn!(error = %e, "ignoring vocabulary snapshot, using seed terms");
            DomainVocabulary::seed()
        }
        Some(Ok(None)) | None => DomainVocabulary::seed(),
    };
    VocabularyHandle::new(vocabulary)
}

/// Persist the current snapshot when a vocabulary path is configured.
pub fn persist_vocabulary<'a>(
    config: &'a Config,
    file: &vocab_file::VocabularyFile,
) -> Result<Option<&'a Path>> {
    match config.vocabulary.path.as_deref() {
        Some(path) => {
            vocab_file::save(path, file)?;
            info!(path = %path.display(), terms = file.terms.len(), "saved vocabulary snapshot");
            Ok(Some(path))
        }
        None => Ok(None),
    }
}

pub fn build_store(config: &Config) -> Result<Arc<dyn VectorStore>> {
    Ok(Arc::new(ChromaStore::new(&config.store)?))
}

pub fn build_classifier(config: &Config, vocabulary: VocabularyHandle) -> QueryClassifier {
    QueryClassifier::new(vocabulary).with_threshold(config.classifier.confidence_threshold)
}

pub fn pipeline_settings(config: &Config) -> PipelineSettings {
    PipelineSettings {
        candidate_multiplier: config.retrieval.candidate_multiplier,
        min_context_tokens: config.retrieval.min_context_tokens,
        max_web_results: config.web_search.max_results,
    }
}

pub fn extraction_settings(config: &Config) -> ExtractionSettings {
    ExtractionSettings {
        sample_documents: config.vocabulary.sample_documents,
        sample_chars: config.vocabulary.sample_chars,
        max_terms: config.vocabulary.max_terms,
    }
}

pub fn build_extractor(config: &Config, vocabulary: VocabularyHandle) -> TermExtractor {
    TermExtractor::new(vocabulary).with_settings(extraction_settings(config))
}

/// Request defaults taken from `[retrieval]` and `[web_search]`.
pub fn default_query_options(config: &Config) -> QueryOptions {
    QueryOptions {
        n_results: config.retrieval.n_results,
        combine_chunks: config.retrieval.combine_chunks,
        web_search: None,
        web_results_count: config.web_search.results,
        explain_classification: false,
    }
}

/// Build the full query pipeline.
pub fn build_orchestrator(config: &Config, vocabulary: VocabularyHandle) -> Result<Orchestrator> {
    let embedder = Arc::new(OllamaEmbedder::new(&config.ollama)?);
    let generator = Arc::new(OllamaGenerator::new(&config.ollama)?);
    let store = build_store(config)?;

    let mut orchestrator = Orchestrator::new(
        embedder,
        store,
        generator,
        build_classifier(config, vocabulary),
    )
    .with_settings(pipeline_settings(config));

    match config.web_search.provider.as_str() {
        "serper" => {
            let web = SerperSearch::from_config(&config.web_search)?;
            orchestrator = orchestrator.with_web_search(Arc::new(web));
        }
        _ => debug!("web search disabled"),
    }

    Ok(orchestrator)
}
