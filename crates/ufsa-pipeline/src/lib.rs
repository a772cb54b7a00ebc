#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # ufsa-pipeline
//!
//! Normalization engine: resolves every registry entry to a parser, parses
//! sources on a worker pool, merges the fragments into one canonical graph
//! in registry order, proposes candidate mappings and emits the tables.
//!
//! A failing source is recorded in the [`RunSummary`] and never stops the
//! other sources. Only an unusable catalog, worker pool or output
//! directory aborts a run.

pub mod config;
pub mod engine;
pub mod outcome;

pub use config::EngineConfig;
pub use engine::{Engine, Normalized};
pub use outcome::{FailureKind, RunSummary, SourceFailure, SourceOutcome, SourceStatus};

use thiserror::Error;

/// Errors that abort a whole run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Registry error: {0}")]
    Registry(#[from] ufsa_registry::Error),

    #[error("Identifier catalog error: {0}")]
    Catalog(#[source] ufsa_model::Error),

    #[error("Candidate configuration error: {0}")]
    Candidates(#[from] ufsa_mapping::Error),

    #[error("Emission error: {0}")]
    Emit(#[from] ufsa_emit::Error),

    #[error("Cannot start worker pool with {workers} threads: {message}")]
    WorkerPool { workers: usize, message: String },

    #[error("Cannot serialize run summary: {0}")]
    Summary(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_converts_with_context() {
        let error: Error = ufsa_registry::Error::io("registry.yaml", "not found").into();
        assert!(error.to_string().contains("registry.yaml"));
    }
}
