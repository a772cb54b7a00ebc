//! # ufsa-cli
//!
//! Command-line runner for the UFSA normalization engine.
//!
//! `ufsa run` ingests every source of a registry and writes the tables;
//! `ufsa check` reports how each registry entry resolves without parsing.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use ufsa_pipeline::{Engine, RunSummary};
use ufsa_registry::{RegistryEntry, RegistryLoader, RunSettings, SourceFormat};

/// Exit code when the run finished but no source was ingested
const EXIT_NO_SOURCES: u8 = 2;

#[derive(Parser)]
#[command(name = "ufsa")]
#[command(about = "Normalize heterogeneous standards into one semantic graph")]
#[command(version)]
struct Cli {
    /// Path to a run settings file (YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every registry source and write the output tables
    Run {
        /// Registry file listing the sources
        #[arg(short, long)]
        registry: PathBuf,

        /// Output directory
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Directory `fixtures://` locations resolve against
        #[arg(long)]
        fixtures: Option<PathBuf>,

        /// Directory relative source paths resolve against
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// Parser pool size
        #[arg(long)]
        workers: Option<usize>,

        /// Parse sources one at a time
        #[arg(long)]
        sequential: bool,

        /// Skip the per-scheme concept tables
        #[arg(long)]
        no_per_scheme: bool,

        /// Also write one JSON document per scheme
        #[arg(long)]
        per_scheme_json: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report how every registry entry resolves, without parsing sources
    Check {
        /// Registry file listing the sources
        #[arg(short, long)]
        registry: PathBuf,

        /// Directory `fixtures://` locations resolve against
        #[arg(long)]
        fixtures: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Resolution of one registry entry
#[derive(Debug, Serialize)]
struct EntryCheck {
    source_id: String,
    format: Option<SourceFormat>,
    path: Option<PathBuf>,
    problem: Option<String>,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = match &cli.config {
        Some(path) => RunSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => RunSettings::default(),
    };

    match cli.command {
        Commands::Run {
            registry,
            out,
            fixtures,
            base_dir,
            workers,
            sequential,
            no_per_scheme,
            per_scheme_json,
            json,
        } => {
            if let Some(out) = out {
                settings.out_dir = out;
            }
            if let Some(fixtures) = fixtures {
                settings.fixtures_dir = fixtures;
            }
            if let Some(base_dir) = base_dir {
                settings.base_dir = base_dir;
            }
            if workers.is_some() {
                settings.workers = workers;
            }
            if sequential {
                settings.parallel = false;
            }
            if no_per_scheme {
                settings.per_scheme_tables = false;
            }
            if per_scheme_json {
                settings.per_scheme_json = true;
            }
            debug!(?settings, "Effective settings");

            let engine = Engine::from_settings(&settings).context("invalid run settings")?;
            let summary = engine
                .run_file(&registry)
                .with_context(|| format!("run of {} aborted", registry.display()))?;

            if json {
                println!("{}", summary.to_json()?);
            } else {
                print_summary(&summary, &settings.out_dir);
            }
            Ok(if summary.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_NO_SOURCES)
            })
        }
        Commands::Check {
            registry,
            fixtures,
            json,
        } => {
            if let Some(fixtures) = fixtures {
                settings.fixtures_dir = fixtures;
            }
            let checks = check_registry(&registry, &settings)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&checks)?);
            } else {
                for check in &checks {
                    let format = check.format.map_or("-", SourceFormat::name);
                    match &check.problem {
                        None => println!("ok    {:<24} {:<18} {}", check.source_id, format, display(check.path.as_ref())),
                        Some(problem) => println!("FAIL  {:<24} {:<18} {problem}", check.source_id, format),
                    }
                }
            }
            let problems = checks.iter().filter(|c| c.problem.is_some()).count();
            info!(entries = checks.len(), problems, "Registry checked");
            Ok(if problems == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_NO_SOURCES)
            })
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn check_registry(path: &Path, settings: &RunSettings) -> anyhow::Result<Vec<EntryCheck>> {
    let registry = RegistryLoader::new()
        .load_from_file(path)
        .with_context(|| format!("loading registry {}", path.display()))?;

    let checks = registry
        .entries
        .iter()
        .map(|entry| match entry {
            RegistryEntry::Invalid {
                index,
                source_id,
                reason,
            } => EntryCheck {
                source_id: source_id.clone().unwrap_or_else(|| format!("#{index}")),
                format: None,
                path: None,
                problem: Some(reason.clone()),
            },
            RegistryEntry::Valid(descriptor) => {
                let format = descriptor.format();
                let path = descriptor.resolve_path(&settings.fixtures_dir, &settings.base_dir);
                let problem = match (&format, &path) {
                    (Err(e), _) | (_, Err(e)) => Some(e.to_string()),
                    (Ok(_), Ok(p)) if !p.is_file() => Some(format!("{} does not exist", p.display())),
                    _ => None,
                };
                EntryCheck {
                    source_id: descriptor.id.clone(),
                    format: format.ok(),
                    path: path.ok(),
                    problem,
                }
            }
        })
        .collect();
    Ok(checks)
}

fn print_summary(summary: &RunSummary, out_dir: &Path) {
    for source in &summary.sources {
        match source.failure() {
            None => println!(
                "ok    {:<24} {:>6} concepts {:>6} relations {:>4} warnings",
                source.source_id,
                source.concepts,
                source.relations,
                source.warnings.len()
            ),
            Some(failure) => println!("FAIL  {:<24} {failure}", source.source_id),
        }
    }
    println!(
        "{} succeeded, {} failed; {} concepts, {} relations, {} curated and {} candidate mappings",
        summary.succeeded(),
        summary.failed(),
        summary.concepts,
        summary.relations,
        summary.curated_mappings,
        summary.candidate_mappings
    );
    if let Some(report) = &summary.emit {
        println!(
            "{} files written to {} ({} warnings)",
            report.files.len(),
            out_dir.display(),
            report.warnings.len()
        );
    }
}

fn display(path: Option<&PathBuf>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}
