//! Emitter configuration

use std::path::PathBuf;
use ufsa_registry::{RunSettings, SpecializedPatterns};

/// Output options for one emission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitConfig {
    /// Directory all files are written to
    pub out_dir: PathBuf,
    /// Write `<scheme_id>.concepts.csv` for every scheme
    pub per_scheme_tables: bool,
    /// Write `<scheme_id>.concepts.json` for every scheme
    pub per_scheme_json: bool,
    /// Scheme URI patterns selecting the specialized tables
    pub specialized: SpecializedPatterns,
}

impl EmitConfig {
    /// Default options writing into `out_dir`
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            ..Self::default()
        }
    }

    /// Take the emission options from run settings
    pub fn from_settings(settings: &RunSettings) -> Self {
        Self {
            out_dir: settings.out_dir.clone(),
            per_scheme_tables: settings.per_scheme_tables,
            per_scheme_json: settings.per_scheme_json,
            specialized: settings.specialized.clone(),
        }
    }

    pub fn with_per_scheme_tables(mut self, enabled: bool) -> Self {
        self.per_scheme_tables = enabled;
        self
    }

    pub fn with_per_scheme_json(mut self, enabled: bool) -> Self {
        self.per_scheme_json = enabled;
        self
    }
}

impl Default for EmitConfig {
    fn default() -> Self {
        let settings = RunSettings::default();
        Self::from_settings(&settings)
    }
}
