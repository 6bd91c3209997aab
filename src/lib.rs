//! # docroute
//!
//! Answers natural-language questions from an embedded document collection,
//! deciding per query whether to add live web results.
//!
//! The decision logic lives in [`docroute_core`]. This crate supplies the
//! collaborators it needs and a CLI around them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────┐
//! │  Ollama  │◀──│ Orchestrator │──▶│  Chroma  │
//! │ embed +  │   │  classify +  │   │  vectors │
//! │ generate │   │  aggregate   │   └──────────┘
//! └──────────┘   └──────┬───────┘
//!                       ▼
//!                 ┌──────────┐
//!                 │  Serper  │ (when routed to web)
//!                 └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docroute vocab rebuild                  # extract domain terms from stored chunks
//! docroute ask "how do tenants get a VPC?"
//! docroute classify "weather in paris" --score 0.1
//! docroute stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`ollama`] | Ollama embedding and generation clients |
//! | [`chroma`] | ChromaDB vector store client |
//! | [`serper`] | Serper.dev web search client |
//! | [`vocab_file`] | Vocabulary snapshot persistence |
//! | [`app`] | Builds the pipeline from configuration |
//! | [`ask`] | `ask` command |
//! | [`vocab_cmd`] | `vocab` and `classify` commands |
//! | [`admin`] | `stats`, `chunks` and `clear` commands |

pub mod admin;
pub mod app;
pub mod ask;
pub mod chroma;
pub mod config;
pub mod ollama;
pub mod serper;
pub mod vocab_cmd;
pub mod vocab_file;
