//! # ufsa-mapping
//!
//! Post-pass over the merged graph that proposes candidate mappings between
//! concepts of different schemes. Candidates are never curated and are
//! never chained: A~B and B~C does not yield A~C.

pub mod candidates;

pub use candidates::{CandidateConfig, CandidateGenerator, normalize_label};

use thiserror::Error;

/// Errors raised while configuring candidate generation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid candidate relation '{relation}': {reason}")]
    InvalidRelation { relation: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
