//! # docroute core
//!
//! Decision logic for answering questions over an embedded document
//! collection: which retrieved chunks belong together, whether a question
//! is about the collection at all, and whether live web results should be
//! mixed into the answer context.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`aggregate`] | Group chunk hits by source document and rank the groups |
//! | [`vocabulary`] | Swappable snapshot of domain terms |
//! | [`terms`] | Rebuild the vocabulary from corpus text with a model |
//! | [`classify`] | Choose documents, web or hybrid for a query |
//! | [`orchestrate`] | The per-query pipeline and its result type |
//! | [`error`] | Collaborator errors and the pipeline failure taxonomy |
//! | [`embedding`], [`store`], [`generation`], [`web`] | Collaborator traits |
//!
//! This crate performs no network or filesystem I/O. HTTP clients for the
//! collaborators live in the `docroute` application crate; tests use
//! [`store::memory::InMemoryStore`] and scripted fakes.

pub mod aggregate;
pub mod classify;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod models;
pub mod orchestrate;
pub mod store;
pub mod terms;
pub mod vocabulary;
pub mod web;
