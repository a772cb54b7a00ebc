//! Run settings file
//!
//! Optional YAML/JSON file read by the binary. Every field has a default so
//! an empty document is valid; command-line flags override these values.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSettings {
    /// Directory `fixtures://` locations resolve against
    pub fixtures_dir: PathBuf,
    /// Directory relative paths resolve against
    pub base_dir: PathBuf,
    /// Output directory for tables
    pub out_dir: PathBuf,
    /// Parse sources on a worker pool
    pub parallel: bool,
    /// Worker count; `None` uses the pool default
    pub workers: Option<usize>,
    /// Relation label applied to candidate mappings
    pub candidate_relation: String,
    /// Labels shorter than this never produce candidates
    pub min_label_length: usize,
    /// Write one concept table per scheme
    pub per_scheme_tables: bool,
    /// Write one JSON document per scheme
    pub per_scheme_json: bool,
    /// Scheme URI patterns that select specialized tables
    pub specialized: SpecializedPatterns,
}

/// Regular expressions matched against concept scheme URIs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecializedPatterns {
    /// Schemes whose components go to the software-component table
    pub components: Vec<String>,
    /// Schemes whose tables/columns go to the database-schema table
    pub database: Vec<String>,
}

impl Default for SpecializedPatterns {
    fn default() -> Self {
        Self {
            components: vec![r"/sbom/".to_string(), r"(?i)cyclonedx".to_string()],
            database: vec![r"/ast/".to_string(), r"(?i)sql|ddl|schema\.sql".to_string()],
        }
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            fixtures_dir: PathBuf::from("data/fixtures"),
            base_dir: PathBuf::from("."),
            out_dir: PathBuf::from("build"),
            parallel: true,
            workers: None,
            candidate_relation: "skos:relatedMatch".to_string(),
            min_label_length: 1,
            per_scheme_tables: true,
            per_scheme_json: false,
            specialized: SpecializedPatterns::default(),
        }
    }
}

impl RunSettings {
    /// Load settings from a file; `.json` is read as JSON, everything else as YAML
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading run settings");
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(path.display().to_string(), e.to_string()))?;
        if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content)
                .map_err(|e| Error::InvalidFormat(format!("settings JSON parse error: {e}")))
        } else if content.trim().is_empty() {
            Ok(Self::default())
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| Error::InvalidFormat(format!("settings YAML parse error: {e}")))
        }
    }
}
