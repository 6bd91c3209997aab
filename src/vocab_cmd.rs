//! `docroute vocab` and `docroute classify`.
//!
//! `vocab rebuild` is the administrative trigger for term extraction. It
//! reads every stored chunk, asks the generation model for domain terms
//! and persists the resulting snapshot. `classify` runs the classifier
//! offline against that snapshot, which makes routing decisions easy to
//! inspect without a vector store or model.

use anyhow::Result;
use docroute_core::terms::RebuildReport;

use crate::app;
use crate::config::Config;
use crate::ollama::OllamaGenerator;
use crate::vocab_file::{self, VocabularyFile};

pub async fn run_rebuild(config: &Config) -> Result<()> {
    let vocabulary = app::load_vocabulary(config);
    let extractor = app::build_extractor(config, vocabulary);
    let store = app::build_store(config)?;
    let generator = OllamaGenerator::new(&config.ollama)?;

    let report = extractor
        .rebuild_from_store(store.as_ref(), &generator)
        .await;
    let saved = app::persist_vocabulary(config, &VocabularyFile::from_report(&report))?;

    print_report(&report);
    match saved {
        Some(path) => println!("  saved to: {}", path.display()),
        None => println!("  not saved (set [vocabulary].path to persist)"),
    }
    Ok(())
}

fn print_report(report: &RebuildReport) {
    println!("vocab rebuild");
    println!("  terms: {}", report.terms.len());
    match report.stage {
        Some(stage) => println!("  parsed with: {}", stage),
        None => println!("  fell back to seed vocabulary"),
    }
}

pub fn run_show(config: &Config, json: bool) -> Result<()> {
    let stored = match config.vocabulary.path.as_deref() {
        Some(path) => vocab_file::load(path)?,
        None => None,
    };
    let file = stored.unwrap_or_else(VocabularyFile::seed);

    if json {
        println!("{}", serde_json::to_string_pretty(&file)?);
        return Ok(());
    }

    println!("Domain vocabulary ({} terms)", file.terms.len());
    if file.fell_back {
        println!("  source: seed");
    } else {
        println!(
            "  generated: {}",
            file.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!();
    for term in &file.terms {
        println!("  {}", term);
    }
    Ok(())
}

pub fn run_classify(config: &Config, query: &str, scores: &[f64]) -> Result<()> {
    let vocabulary = app::load_vocabulary(config);
    let classifier = app::build_classifier(config, vocabulary);
    let doc_scores = if scores.is_empty() { None } else { Some(scores) };

    let result = classifier.classify(query, doc_scores);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
