//! # docroute CLI
//!
//! Asks questions against a Chroma collection, rebuilds the domain
//! vocabulary that drives document/web routing, and inspects the store.
//!
//! ## Usage
//!
//! ```bash
//! docroute --config ./config/docroute.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docroute ask "<query>"` | Answer a question from stored documents (and the web when routed there) |
//! | `docroute classify "<query>"` | Show the routing decision for a query without retrieval |
//! | `docroute vocab rebuild` | Re-extract domain terms from every stored chunk |
//! | `docroute vocab show` | Print the current domain vocabulary |
//! | `docroute stats` | Chunk count and vector dimensions in the store |
//! | `docroute chunks` | Page through stored chunks, filtered by filename or content |
//! | `docroute clear` | Delete every stored chunk and reset the vocabulary |
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docroute::{admin, ask, config, vocab_cmd};

/// docroute: grounded answers from your documents, with web search when
/// the question is not about them.
#[derive(Parser)]
#[command(
    name = "docroute",
    about = "Grounded question answering over a vector store with document/web routing",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docroute.toml`. Every section is optional.
    #[arg(long, global = true, default_value = "./config/docroute.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question.
    ///
    /// Embeds the query, retrieves and groups matching chunks, decides
    /// whether to add web results, and asks the generation model for an
    /// answer grounded in that context.
    Ask {
        /// The question.
        query: String,

        /// Number of documents (or chunks with --no-combine) to use.
        #[arg(long)]
        results: Option<usize>,

        /// Use raw chunks instead of merging chunks of the same document.
        #[arg(long)]
        no_combine: bool,

        /// Always add web results (skips classification).
        #[arg(long, conflicts_with = "no_web")]
        web: bool,

        /// Never add web results (skips classification).
        #[arg(long)]
        no_web: bool,

        /// Number of web results to request.
        #[arg(long)]
        web_results: Option<usize>,

        /// Include the classification scores and explanations.
        #[arg(long)]
        explain: bool,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Classify a query as documents, web, or hybrid.
    ///
    /// Uses the persisted vocabulary only; no store or model is contacted.
    Classify {
        /// The query to classify.
        query: String,

        /// Retrieval similarity score in [0, 1]. Repeatable.
        #[arg(long = "score")]
        scores: Vec<f64>,
    },

    /// Manage the domain vocabulary.
    Vocab {
        #[command(subcommand)]
        action: VocabAction,
    },

    /// Show vector store statistics.
    Stats,

    /// List stored chunks with their metadata.
    Chunks {
        /// Maximum number of chunks to print.
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Number of matching chunks to skip.
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Only chunks whose filename contains this (case-insensitive).
        #[arg(long)]
        filename: Option<String>,

        /// Only chunks whose text contains this (case-insensitive).
        #[arg(long)]
        content: Option<String>,

        /// Print the page as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete every stored chunk and reset the vocabulary to its seed terms.
    Clear,
}

#[derive(Subcommand)]
enum VocabAction {
    /// Extract domain terms from every stored chunk and save them.
    Rebuild,

    /// Print the current vocabulary.
    Show {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ask {
            query,
            results,
            no_combine,
            web,
            no_web,
            web_results,
            explain,
            json,
        } => {
            let web = match (web, no_web) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let args = ask::AskArgs {
                results,
                no_combine,
                web,
                web_results,
                explain,
                json,
            };
            ask::run_ask(&cfg, &query, &args).await?;
        }
        Commands::Classify { query, scores } => {
            vocab_cmd::run_classify(&cfg, &query, &scores)?;
        }
        Commands::Vocab { action } => match action {
            VocabAction::Rebuild => {
                vocab_cmd::run_rebuild(&cfg).await?;
            }
            VocabAction::Show { json } => {
                vocab_cmd::run_show(&cfg, json)?;
            }
        },
        Commands::Stats => {
            admin::run_stats(&cfg).await?;
        }
        Commands::Chunks {
            limit,
            offset,
            filename,
            content,
            json,
        } => {
            let filter = admin::ChunkFilter { filename, content };
            admin::run_chunks(&cfg, &filter, offset, limit, json).await?;
        }
        Commands::Clear => {
            admin::run_clear(&cfg).await?;
        }
    }

    Ok(())
}
