//! Per-source outcomes and the run summary

use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use ufsa_emit::EmitReport;
use ufsa_registry::SourceFormat;

/// Category of a per-source failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Malformed registry entry, unknown format or unusable location
    Configuration,
    /// The source document could not be read
    Io,
    /// The parser rejected the document
    Parse,
    /// The fragment conflicts with content already in the graph
    Integrity,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Io => "io",
            Self::Parse => "parse",
            Self::Integrity => "integrity",
        };
        f.write_str(name)
    }
}

/// Why a source contributed nothing to the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl SourceFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Succeeded,
    Failed(SourceFailure),
}

/// What happened to one registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    /// Source id, or `#<index>` for entries without a readable id
    pub source_id: String,
    /// Resolved format, when resolution got that far
    pub format: Option<SourceFormat>,
    #[serde(flatten)]
    pub status: SourceStatus,
    /// Concepts in the source's fragment, including ones the graph
    /// already held
    pub concepts: usize,
    /// Relations in the source's fragment
    pub relations: usize,
    /// Skipped rows and other recoverable findings
    pub warnings: Vec<String>,
}

impl SourceOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == SourceStatus::Succeeded
    }

    pub fn failure(&self) -> Option<&SourceFailure> {
        match &self.status {
            SourceStatus::Failed(failure) => Some(failure),
            SourceStatus::Succeeded => None,
        }
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Outcomes in registry order
    pub sources: Vec<SourceOutcome>,
    pub schemes: usize,
    pub concepts: usize,
    pub relations: usize,
    pub identifier_systems: usize,
    pub curated_mappings: usize,
    pub candidate_mappings: usize,
    /// Run-level warnings (catalog entries skipped while loading)
    pub warnings: Vec<String>,
    /// Present when tables were written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emit: Option<EmitReport>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.sources.iter().filter(|s| s.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.sources.len() - self.succeeded()
    }

    /// At least one source made it into the graph
    pub fn is_success(&self) -> bool {
        self.succeeded() > 0
    }

    /// Outcome for a source id
    pub fn source(&self, source_id: &str) -> Option<&SourceOutcome> {
        self.sources.iter().find(|s| s.source_id == source_id)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Summary(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str, status: SourceStatus) -> SourceOutcome {
        SourceOutcome {
            source_id: id.to_string(),
            format: Some(SourceFormat::Tabular),
            status,
            concepts: 0,
            relations: 0,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_success_requires_one_source() {
        let mut summary = RunSummary::default();
        assert!(!summary.is_success());

        summary.sources.push(outcome(
            "broken",
            SourceStatus::Failed(SourceFailure::new(FailureKind::Parse, "bad row")),
        ));
        assert!(!summary.is_success());
        assert_eq!(summary.failed(), 1);

        summary.sources.push(outcome("iso", SourceStatus::Succeeded));
        assert!(summary.is_success());
        assert_eq!(summary.succeeded(), 1);
    }

    #[test]
    fn test_failed_status_serializes_flat() {
        let failed = outcome(
            "broken",
            SourceStatus::Failed(SourceFailure::new(FailureKind::Configuration, "no parser")),
        );
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "configuration");
        assert_eq!(json["message"], "no parser");
        assert_eq!(json["format"], "tabular");
    }
}
