#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # ufsa-model
//!
//! Canonical semantic graph shared by every parser and emitter.
//!
//! Parsers build self-contained [`GraphFragment`]s; the engine merges them
//! into one [`CanonicalGraph`] whose identity rules make re-runs and
//! re-merges idempotent. Concept identifiers are derived from the owning
//! source id and a source-local key, never from insertion order.

/// Concept schemes, concepts and their typed payloads.
pub mod concept;
/// Per-source graph fragments produced by parsers.
pub mod fragment;
/// The merged, deduplicated canonical graph.
pub mod graph;
/// Stable identifier newtypes.
pub mod ids;
/// Identifier systems and curated/candidate mappings.
pub mod identifiers;
/// Relation predicates and semantic relations.
pub mod relation;

pub use concept::{ColumnInfo, ComponentInfo, Concept, ConceptKind, ConceptScheme, ForeignKeyRef};
pub use fragment::GraphFragment;
pub use graph::{CanonicalGraph, MergeStats, URI_NOTE};
pub use identifiers::{IdentifierSystem, Mapping, MappingOrigin};
pub use ids::ConceptId;
pub use relation::{Predicate, SemanticRelation};

use thiserror::Error;

/// Integrity errors raised while building or merging graph content
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Concept '{concept}' references scheme '{scheme_uri}' which is not its owning scheme")]
    DanglingScheme { concept: String, scheme_uri: String },

    #[error("Concept '{concept}' was declared twice with different content")]
    ConceptConflict { concept: String },

    #[error("Concept scheme '{scheme}' conflicts with an existing scheme: {reason}")]
    SchemeConflict { scheme: String, reason: String },

    #[error("Concept scheme URI '{uri}' is already owned by scheme '{existing}' (incoming '{incoming}')")]
    DuplicateSchemeUri {
        uri: String,
        existing: String,
        incoming: String,
    },

    #[error("Identifier system URI '{uri}' is already owned by system '{existing}' (incoming '{incoming}')")]
    DuplicateSystemUri {
        uri: String,
        existing: String,
        incoming: String,
    },

    #[error("Identifier system '{id}' was declared twice with different content")]
    SystemConflict { id: String },

    #[error("Unknown relation predicate: {0}")]
    UnknownPredicate(String),
}

impl Error {
    /// Build a scheme conflict error with a human-readable reason.
    pub fn scheme_conflict(scheme: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemeConflict {
            scheme: scheme.into(),
            reason: reason.into(),
        }
    }

    /// Build a concept conflict error for the given concept id.
    pub fn concept_conflict(concept: impl Into<String>) -> Self {
        Self::ConceptConflict {
            concept: concept.into(),
        }
    }
}

/// Crate-local result type for graph operations.
pub type Result<T> = std::result::Result<T, Error>;
