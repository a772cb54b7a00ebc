//! # ufsa-registry
//!
//! Source descriptors, parser selection, and registry loading.
//!
//! The registry is an ordered list of standards to ingest. Each entry
//! becomes a [`SourceDescriptor`]; entries that cannot be read are kept as
//! [`RegistryEntry::Invalid`] so the engine can report them per source
//! without aborting the run.

pub mod descriptor;
pub mod format;
pub mod loader;
pub mod settings;

pub use descriptor::{SourceDescriptor, SourceLocation};
pub use format::{SourceFormat, parser_tag_stem};
pub use loader::{Registry, RegistryEntry, RegistryLoader};
pub use settings::{RunSettings, SpecializedPatterns};

use thiserror::Error;

/// Errors that can occur when loading a registry or resolving its entries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("IO error reading '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Invalid registry format: {0}")]
    InvalidFormat(String),

    #[error("Invalid registry entry #{index}: {reason}")]
    InvalidEntry { index: usize, reason: String },

    #[error(
        "No parser registered for source '{source_id}' (parser tag '{parser_tag}', data format '{data_format}')"
    )]
    UnknownFormat {
        source_id: String,
        parser_tag: String,
        data_format: String,
    },

    #[error("Source '{source_id}' has unusable location '{location}': {reason}")]
    InvalidLocation {
        source_id: String,
        location: String,
        reason: String,
    },
}

impl Error {
    /// Build an I/O error with path context.
    pub fn io(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Build an invalid-location error for a source.
    pub fn invalid_location(
        source_id: impl Into<String>,
        location: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidLocation {
            source_id: source_id.into(),
            location: location.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
