//! # ufsa-emit
//!
//! Deterministic serializer for the canonical graph.
//!
//! Every table has a fixed column order and a header row, rows are sorted
//! by their key columns, and files end with a single `\n` record
//! terminator, so identical graphs always produce byte-identical files.
//!
//! ```rust,no_run
//! use ufsa_emit::{EmitConfig, TableEmitter};
//! use ufsa_model::CanonicalGraph;
//!
//! let emitter = TableEmitter::new(EmitConfig::new("build")).unwrap();
//! let report = emitter.emit(&CanonicalGraph::new()).unwrap();
//! println!("{} files written", report.files.len());
//! ```

pub mod config;
pub mod emitter;
pub mod table;

pub use config::EmitConfig;
pub use emitter::{EmitReport, TableEmitter, TableSummary};
pub use table::Table;

use thiserror::Error;

/// Errors that can occur during emission
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Cannot create output directory '{path}': {message}")]
    OutputDir { path: String, message: String },

    #[error("Cannot write '{path}': {message}")]
    Write { path: String, message: String },

    #[error("Invalid specialized scheme pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("JSON serialization error for '{document}': {message}")]
    Json { document: String, message: String },
}

impl Error {
    /// Create a write error for `path`
    pub fn write(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
