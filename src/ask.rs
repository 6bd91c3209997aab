//! `docroute ask`: answer a question through the full pipeline.

use anyhow::{bail, Result};
use docroute_core::models::keys;
use docroute_core::orchestrate::{QueryOptions, QueryResult};

use crate::app;
use crate::config::Config;

/// Command-line overrides for a single query.
#[derive(Debug, Clone, Default)]
pub struct AskArgs {
    pub results: Option<usize>,
    pub no_combine: bool,
    pub web: Option<bool>,
    pub web_results: Option<usize>,
    pub explain: bool,
    pub json: bool,
}

/// Merge command-line overrides onto the configured defaults.
pub fn query_options(config: &Config, args: &AskArgs) -> QueryOptions {
    let defaults = app::default_query_options(config);
    QueryOptions {
        n_results: args.results.unwrap_or(defaults.n_results).max(1),
        combine_chunks: defaults.combine_chunks && !args.no_combine,
        web_search: args.web,
        web_results_count: args
            .web_results
            .unwrap_or(defaults.web_results_count)
            .min(config.web_search.max_results),
        explain_classification: args.explain,
    }
}

pub async fn run_ask(config: &Config, query: &str, args: &AskArgs) -> Result<()> {
    let vocabulary = app::load_vocabulary(config);
    let orchestrator = app::build_orchestrator(config, vocabulary)?;
    let options = query_options(config, args);

    let result = orchestrator.process(query, &options).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    if result.status.is_failure() {
        bail!(
            "query failed ({}): {}",
            result.status,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn print_result(result: &QueryResult) {
    println!("{}", result.response);
    println!();

    if let Some(suggestion) = &result.suggestion {
        println!("Suggestion: {}", suggestion);
        println!();
    }

    if let Some(source_type) = result.source_type {
        println!(
            "source: {}{}",
            source_type,
            if result.web_search_used { " (web results used)" } else { "" }
        );
    }

    let sources = &result.sources;
    for (i, id) in sources.ids.iter().enumerate() {
        let distance = sources.distances.get(i).copied().unwrap_or_default();
        let chunk_count = sources
            .metadatas
            .get(i)
            .and_then(|m| m.get(keys::CHUNK_COUNT))
            .and_then(|v| v.as_u64());
        match chunk_count {
            Some(n) => println!("{}. [{:.3}] {} ({} chunks)", i + 1, distance, id, n),
            None => println!("{}. [{:.3}] {}", i + 1, distance, id),
        }
    }
    for (i, web) in sources.web_results.iter().enumerate() {
        println!("web {}. {}", i + 1, web.title);
        println!("    url: {}", web.url);
    }

    if let Some(classification) = &result.classification {
        println!();
        println!(
            "classification: {} (confidence {:.2})",
            classification.source_type, classification.confidence
        );
        for explanation in &classification.explanations {
            println!("    {}", explanation);
        }
        if !classification.matched_terms.is_empty() {
            println!("    matched: {}", classification.matched_terms.join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_config() {
        let config = Config::default();
        let options = query_options(&config, &AskArgs::default());
        assert_eq!(options, app::default_query_options(&config));
    }

    #[test]
    fn test_overrides() {
        let config = Config::default();
        let args = AskArgs {
            results: Some(5),
            no_combine: true,
            web: Some(true),
            web_results: Some(50),
            explain: true,
            json: false,
        };
        let options = query_options(&config, &args);
        assert_eq!(options.n_results, 5);
        assert!(!options.combine_chunks);
        assert_eq!(options.web_search, Some(true));
        assert_eq!(options.web_results_count, 10);
        assert!(options.explain_classification);
    }

    #[test]
    fn test_zero_results_clamped() {
        let args = AskArgs {
            results: Some(0),
            ..AskArgs::default()
        };
        assert_eq!(query_options(&Config::default(), &args).n_results, 1);
    }
}
