//! Engine configuration

use std::path::PathBuf;
use ufsa_registry::RunSettings;

/// How sources are located and scheduled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Directory `fixtures://` locations resolve against
    pub fixtures_dir: PathBuf,
    /// Directory relative paths resolve against
    pub base_dir: PathBuf,
    /// Parse sources on a worker pool instead of one by one
    pub parallel: bool,
    /// Pool size; `None` uses the global rayon pool
    pub workers: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_settings(&RunSettings::default())
    }
}

impl EngineConfig {
    /// Take the scheduling options from run settings
    pub fn from_settings(settings: &RunSettings) -> Self {
        Self {
            fixtures_dir: settings.fixtures_dir.clone(),
            base_dir: settings.base_dir.clone(),
            parallel: settings.parallel,
            workers: settings.workers,
        }
    }

    pub fn with_fixtures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixtures_dir = dir.into();
        self
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Use a dedicated pool of `workers` threads; zero falls back to the
    /// global pool
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = (workers > 0).then_some(workers);
        self
    }
}
