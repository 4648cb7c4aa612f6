//! contentpipe - route, parse and index a content tree into JSON artifacts.
//!
//! A [`pipeline::Pipeline`] owns an ordered [`rules::RuleRegistry`], a
//! [`parser::ParserRegistry`] and an [`store::IndexStore`]. `build()` rebuilds
//! everything; `incremental()` updates a single path; `watch()` drives
//! `incremental()` from debounced file system events.

pub mod cli;
pub mod config;
pub mod logger;
pub mod parser;
pub mod pipeline;
pub mod rules;
pub mod store;
pub mod watch;

pub use pipeline::{BuildReport, Pipeline, PipelineError};
pub use rules::{EntryHooks, Publish, RuleSpec};
