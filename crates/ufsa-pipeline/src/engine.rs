//! Normalization engine
//!
//! Sources are parsed independently (optionally on a rayon pool), then
//! merged one at a time in registry order. The graph is owned by the run
//! and threaded through each step explicitly.

use crate::config::EngineConfig;
use crate::outcome::{FailureKind, RunSummary, SourceFailure, SourceOutcome, SourceStatus};
use crate::{Error, Result};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, info, warn};
use ufsa_emit::{EmitConfig, TableEmitter};
use ufsa_mapping::{CandidateConfig, CandidateGenerator};
use ufsa_model::{CanonicalGraph, GraphFragment};
use ufsa_parsers::{SourceInput, parse_source};
use ufsa_registry::{Registry, RegistryEntry, RegistryLoader, RunSettings, SourceDescriptor, SourceFormat};

/// A parsed (or failed) registry entry awaiting merge
#[derive(Debug)]
struct Parsed {
    source_id: String,
    format: Option<SourceFormat>,
    result: std::result::Result<GraphFragment, SourceFailure>,
}

impl Parsed {
    fn failed(source_id: impl Into<String>, format: Option<SourceFormat>, failure: SourceFailure) -> Self {
        Self {
            source_id: source_id.into(),
            format,
            result: Err(failure),
        }
    }
}

/// The merged graph with per-source outcomes, before emission
#[derive(Debug, Clone)]
pub struct Normalized {
    pub graph: CanonicalGraph,
    /// Outcomes in registry order
    pub sources: Vec<SourceOutcome>,
    /// Candidate mappings added to the graph
    pub candidates: usize,
    /// Run-level warnings
    pub warnings: Vec<String>,
}

impl Normalized {
    /// Summary of the graph without an emit report
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            sources: self.sources.clone(),
            schemes: self.graph.schemes().count(),
            concepts: self.graph.concept_count(),
            relations: self.graph.relation_count(),
            identifier_systems: self.graph.identifier_systems().count(),
            curated_mappings: self.graph.curated_mappings().count(),
            candidate_mappings: self.candidates,
            warnings: self.warnings.clone(),
            emit: None,
        }
    }
}

/// Registry-driven normalization and emission
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    candidates: CandidateGenerator,
    emitter: TableEmitter,
}

impl Engine {
    pub fn new(config: EngineConfig, candidates: CandidateGenerator, emitter: TableEmitter) -> Self {
        Self {
            config,
            candidates,
            emitter,
        }
    }

    /// Build an engine from run settings, validating the candidate relation
    /// and the specialized scheme patterns
    pub fn from_settings(settings: &RunSettings) -> Result<Self> {
        let candidates =
            CandidateConfig::new(&settings.candidate_relation, settings.min_label_length)?;
        let emitter = TableEmitter::new(EmitConfig::from_settings(settings))?;
        Ok(Self::new(
            EngineConfig::from_settings(settings),
            CandidateGenerator::new(candidates),
            emitter,
        ))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn emitter(&self) -> &TableEmitter {
        &self.emitter
    }

    /// Load a registry file and run it; an unreadable registry aborts
    /// before any source is parsed
    pub fn run_file(&self, registry_path: &Path) -> Result<RunSummary> {
        let registry = RegistryLoader::new().load_from_file(registry_path)?;
        self.run(&registry)
    }

    /// Normalize every source and write the tables
    pub fn run(&self, registry: &Registry) -> Result<RunSummary> {
        let normalized = self.normalize(registry)?;
        let report = self.emitter.emit(&normalized.graph)?;

        let mut summary = normalized.summary();
        summary.emit = Some(report);
        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            concepts = summary.concepts,
            relations = summary.relations,
            candidates = summary.candidate_mappings,
            "Run complete"
        );
        if !summary.is_success() {
            warn!("No source was ingested");
        }
        Ok(summary)
    }

    /// Parse and merge every source, load the curated catalog, resolve
    /// IRI references across sources and add candidate mappings
    pub fn normalize(&self, registry: &Registry) -> Result<Normalized> {
        let mut graph = CanonicalGraph::new();
        for system in &registry.identifier_systems {
            graph
                .add_identifier_system(system.clone())
                .map_err(Error::Catalog)?;
        }
        for mapping in &registry.mappings {
            graph.add_mapping(mapping.clone());
        }

        info!(
            sources = registry.entries.len(),
            parallel = self.config.parallel,
            "Normalizing sources"
        );
        let parsed = self.parse_all(&registry.entries)?;
        let sources = parsed
            .into_iter()
            .map(|item| merge_parsed(&mut graph, item))
            .collect();

        let resolved = graph.resolve_uri_references();
        if resolved > 0 {
            info!(relations = resolved, "Cross-source references resolved");
        }

        let candidates = self.candidates.annotate(&mut graph);
        Ok(Normalized {
            graph,
            sources,
            candidates,
            warnings: registry.warnings.clone(),
        })
    }

    fn parse_all(&self, entries: &[RegistryEntry]) -> Result<Vec<Parsed>> {
        if !self.config.parallel {
            return Ok(entries.iter().map(|e| self.parse_entry(e)).collect());
        }
        let parse = || -> Vec<Parsed> { entries.par_iter().map(|e| self.parse_entry(e)).collect() };
        match self.config.workers {
            Some(workers) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|e| Error::WorkerPool {
                        workers,
                        message: e.to_string(),
                    })?;
                Ok(pool.install(parse))
            }
            None => Ok(parse()),
        }
    }

    fn parse_entry(&self, entry: &RegistryEntry) -> Parsed {
        let descriptor = match entry {
            RegistryEntry::Valid(descriptor) => descriptor,
            RegistryEntry::Invalid {
                index,
                source_id,
                reason,
            } => {
                let id = source_id.clone().unwrap_or_else(|| format!("#{index}"));
                return Parsed::failed(id, None, SourceFailure::new(FailureKind::Configuration, reason));
            }
        };
        let format = match descriptor.format() {
            Ok(format) => format,
            Err(e) => {
                return Parsed::failed(
                    &descriptor.id,
                    None,
                    SourceFailure::new(FailureKind::Configuration, e.to_string()),
                );
            }
        };
        Parsed {
            source_id: descriptor.id.clone(),
            format: Some(format),
            result: self.read_and_parse(descriptor, format),
        }
    }

    fn read_and_parse(
        &self,
        descriptor: &SourceDescriptor,
        format: SourceFormat,
    ) -> std::result::Result<GraphFragment, SourceFailure> {
        let path = descriptor
            .resolve_path(&self.config.fixtures_dir, &self.config.base_dir)
            .map_err(|e| SourceFailure::new(FailureKind::Configuration, e.to_string()))?;
        let content = std::fs::read_to_string(&path).map_err(|e| {
            SourceFailure::new(FailureKind::Io, format!("cannot read '{}': {e}", path.display()))
        })?;

        debug!(
            source = %descriptor.id,
            %format,
            path = %path.display(),
            bytes = content.len(),
            "Parsing source"
        );
        let input = SourceInput::new(descriptor, &content);
        match panic::catch_unwind(AssertUnwindSafe(|| parse_source(format, &input))) {
            Ok(Ok(fragment)) => Ok(fragment),
            Ok(Err(e @ ufsa_parsers::Error::Integrity { .. })) => {
                Err(SourceFailure::new(FailureKind::Integrity, e.to_string()))
            }
            Ok(Err(e)) => Err(SourceFailure::new(FailureKind::Parse, e.to_string())),
            Err(payload) => Err(SourceFailure::new(
                FailureKind::Parse,
                format!("parser panicked: {}", panic_message(payload.as_ref())),
            )),
        }
    }
}

fn merge_parsed(graph: &mut CanonicalGraph, parsed: Parsed) -> SourceOutcome {
    let Parsed {
        source_id,
        format,
        result,
    } = parsed;
    let mut outcome = SourceOutcome {
        source_id,
        format,
        status: SourceStatus::Succeeded,
        concepts: 0,
        relations: 0,
        warnings: Vec::new(),
    };

    let fragment = match result {
        Ok(fragment) => fragment,
        Err(failure) => {
            warn!(source = %outcome.source_id, kind = %failure.kind, error = %failure.message, "Source failed");
            outcome.status = SourceStatus::Failed(failure);
            return outcome;
        }
    };

    let concepts = fragment.concept_count();
    let relations = fragment.relation_count();
    let warnings = fragment.warnings().to_vec();
    match graph.merge(fragment) {
        Ok(stats) => {
            info!(
                source = %outcome.source_id,
                concepts,
                relations,
                new_concepts = stats.concepts_added,
                warnings = warnings.len(),
                "Source merged"
            );
            outcome.concepts = concepts;
            outcome.relations = relations;
            outcome.warnings = warnings;
        }
        Err(e) => {
            warn!(source = %outcome.source_id, error = %e, "Source rejected at merge");
            outcome.status = SourceStatus::Failed(SourceFailure::new(FailureKind::Integrity, e.to_string()));
            outcome.warnings = warnings;
        }
    }
    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
