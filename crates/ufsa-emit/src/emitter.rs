//! Graph to table emission
//!
//! Concepts of schemes matching a specialized pattern, and of the matching
//! kind, go to `software_components.csv` or `database_schemas.csv` instead
//! of the global concept table. Specialized tables end with a `concept_id`
//! column so every relation endpoint can be found in exactly one global
//! table.
//!
//! Alongside the tables, `concepts.all.csv` and `concepts.all.json` list
//! every concept regardless of placement, `concept_schemes.index.json` maps
//! each scheme to its concept ids and `mappings.candidates.json` mirrors the
//! candidate table.

use crate::config::EmitConfig;
use crate::table::Table;
use crate::{Error, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use ufsa_model::{CanonicalGraph, Concept, ConceptId, ConceptKind, ConceptScheme, Mapping, SemanticRelation};

pub const CONCEPT_SCHEMES: &str = "concept_schemes.csv";
pub const CONCEPTS: &str = "concepts.csv";
pub const SEMANTIC_RELATIONS: &str = "semantic_relations.csv";
pub const IDENTIFIER_SYSTEMS: &str = "identifier_systems.csv";
pub const MAPPINGS: &str = "mappings.csv";
pub const CANDIDATE_MAPPINGS: &str = "mappings.candidates.csv";
pub const SOFTWARE_COMPONENTS: &str = "software_components.csv";
pub const DATABASE_SCHEMAS: &str = "database_schemas.csv";
pub const ALL_CONCEPTS: &str = "concepts.all.csv";
pub const ALL_CONCEPTS_JSON: &str = "concepts.all.json";
pub const SCHEME_INDEX_JSON: &str = "concept_schemes.index.json";
pub const CANDIDATE_MAPPINGS_JSON: &str = "mappings.candidates.json";

const CONCEPT_HEADERS: [&str; 5] = ["concept_id", "pref_label", "definition", "notation", "scheme_uri"];
const MAPPING_HEADERS: [&str; 5] = ["from_system", "from_value", "to_concept_id", "relation", "note"];

/// Multi-valued cells are joined with this separator
const LIST_SEPARATOR: &str = ";";

/// Which global table a concept belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Concepts,
    Components,
    Database,
}

/// Rows written to one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub rows: usize,
}

/// Outcome of an emission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmitReport {
    /// Files written, in write order
    pub files: Vec<PathBuf>,
    /// Row counts per table
    pub tables: Vec<TableSummary>,
    /// Dropped relations and unresolved mappings
    pub warnings: Vec<String>,
}

impl EmitReport {
    /// Row count of a table by file name
    pub fn rows(&self, name: &str) -> Option<usize> {
        self.tables.iter().find(|t| t.name == name).map(|t| t.rows)
    }
}

#[derive(Serialize)]
struct SchemeDocument<'g> {
    scheme: &'g ConceptScheme,
    concepts: Vec<&'g Concept>,
    relations: Vec<&'g SemanticRelation>,
}

/// One entry of `concepts.all.json`
#[derive(Serialize)]
struct IndexedConcept<'g> {
    scheme: &'g str,
    scheme_label: &'g str,
    id: &'g ConceptId,
    label: &'g str,
    scheme_uri: &'g str,
    notes: &'g BTreeMap<String, String>,
}

/// One value of `concept_schemes.index.json`, keyed by scheme id
#[derive(Serialize)]
struct SchemeIndex<'g> {
    label: &'g str,
    uri: &'g str,
    concepts: Vec<&'g ConceptId>,
}

/// One entry of `mappings.candidates.json`, taken from a candidate row
#[derive(Serialize)]
struct CandidateRecord<'r> {
    from_system: &'r str,
    from_value: &'r str,
    to_concept_id: &'r str,
    relation: &'r str,
    note: &'r str,
}

/// Writes the canonical graph as tables
#[derive(Debug, Clone)]
pub struct TableEmitter {
    config: EmitConfig,
    component_patterns: Vec<Regex>,
    database_patterns: Vec<Regex>,
}

impl TableEmitter {
    /// Create an emitter, compiling the specialized scheme patterns
    pub fn new(config: EmitConfig) -> Result<Self> {
        let compile = |patterns: &[String]| {
            patterns
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|e| Error::InvalidPattern {
                        pattern: p.clone(),
                        message: e.to_string(),
                    })
                })
                .collect::<Result<Vec<_>>>()
        };
        Ok(Self {
            component_patterns: compile(&config.specialized.components)?,
            database_patterns: compile(&config.specialized.database)?,
            config,
        })
    }

    pub fn config(&self) -> &EmitConfig {
        &self.config
    }

    /// Build every table in memory; returns the tables in write order plus
    /// warnings for rows that could not be emitted
    pub fn build_tables(&self, graph: &CanonicalGraph) -> (Vec<Table>, Vec<String>) {
        let mut warnings = Vec::new();

        let mut schemes = Table::new(
            CONCEPT_SCHEMES,
            &["scheme_id", "scheme_label", "scheme_uri", "governing_body"],
        );
        for scheme in graph.schemes() {
            schemes.push(vec![
                scheme.id.clone(),
                scheme.label.clone(),
                scheme.uri.clone(),
                scheme.governing_body.clone().unwrap_or_default(),
            ]);
        }

        let mut concepts = Table::new(CONCEPTS, &CONCEPT_HEADERS);
        let mut components = Table::new(
            SOFTWARE_COMPONENTS,
            &[
                "identifier",
                "name",
                "version",
                "licenses",
                "hashes",
                "external_references",
                "scheme_uri",
                "concept_id",
            ],
        );
        let mut database = Table::new(
            DATABASE_SCHEMAS,
            &[
                "table_name",
                "column_name",
                "data_type",
                "nullable",
                "fk_table",
                "fk_column",
                "scheme_uri",
                "concept_id",
            ],
        );
        for concept in graph.concepts() {
            match (self.placement(concept), &concept.kind) {
                (Placement::Components, ConceptKind::Component(info)) => components.push(vec![
                    info.identifier.clone(),
                    info.name.clone(),
                    info.version.clone().unwrap_or_default(),
                    info.licenses.join(LIST_SEPARATOR),
                    info.hashes.join(LIST_SEPARATOR),
                    info.external_references.join(LIST_SEPARATOR),
                    concept.scheme_uri.clone(),
                    concept.id.to_string(),
                ]),
                (Placement::Database, ConceptKind::Column(info)) => {
                    let (fk_table, fk_column) = info
                        .foreign_key
                        .as_ref()
                        .map(|fk| (fk.table.clone(), fk.column.clone()))
                        .unwrap_or_default();
                    database.push(vec![
                        info.table.clone(),
                        info.column.clone(),
                        info.data_type.clone(),
                        info.nullable.to_string(),
                        fk_table,
                        fk_column,
                        concept.scheme_uri.clone(),
                        concept.id.to_string(),
                    ]);
                }
                (Placement::Database, ConceptKind::Table) => database.push(vec![
                    concept.pref_label.clone(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    concept.scheme_uri.clone(),
                    concept.id.to_string(),
                ]),
                _ => concepts.push(concept_row(concept)),
            }
        }

        let mut relations = Table::new(SEMANTIC_RELATIONS, &["subject_id", "predicate", "object_id"]);
        for relation in graph.relations() {
            let missing = [&relation.subject, &relation.object]
                .into_iter()
                .find(|id| !graph.contains_concept(id));
            match missing {
                Some(id) => warnings.push(format!(
                    "relation {} {} {} dropped: '{id}' is not a known concept",
                    relation.subject, relation.predicate, relation.object
                )),
                None => relations.push(vec![
                    relation.subject.to_string(),
                    relation.predicate.as_str().to_string(),
                    relation.object.to_string(),
                ]),
            }
        }

        let mut systems = Table::new(
            IDENTIFIER_SYSTEMS,
            &["id", "name", "authority", "uri", "description"],
        );
        for system in graph.identifier_systems() {
            systems.push(vec![
                system.id.clone(),
                system.name.clone(),
                system.authority.clone().unwrap_or_default(),
                system.uri.clone(),
                system.description.clone().unwrap_or_default(),
            ]);
        }

        let mut curated = Table::new(MAPPINGS, &MAPPING_HEADERS);
        for mapping in graph.curated_mappings() {
            if graph.identifier_system(&mapping.from_system).is_none() {
                warnings.push(format!(
                    "curated mapping {}={} dropped: unknown identifier system '{}'",
                    mapping.from_system, mapping.from_value, mapping.from_system
                ));
            } else if !graph.contains_concept(&mapping.to_concept_id) {
                warnings.push(format!(
                    "curated mapping {}={} dropped: unknown concept '{}'",
                    mapping.from_system, mapping.from_value, mapping.to_concept_id
                ));
            } else {
                curated.push(mapping_row(mapping));
            }
        }

        let mut candidates = Table::new(CANDIDATE_MAPPINGS, &MAPPING_HEADERS);
        for mapping in graph.candidate_mappings() {
            if graph.contains_concept(&mapping.to_concept_id) {
                candidates.push(mapping_row(mapping));
            } else {
                warnings.push(format!(
                    "candidate mapping {} -> {} dropped: unknown concept",
                    mapping.from_value, mapping.to_concept_id
                ));
            }
        }

        let mut all = Table::new(
            ALL_CONCEPTS,
            &["concept_id", "pref_label", "scheme_id", "scheme_label", "scheme_uri", "notes_json"],
        );
        for concept in graph.concepts() {
            let scheme = graph.scheme_by_uri(&concept.scheme_uri);
            all.push(vec![
                concept.id.to_string(),
                concept.pref_label.clone(),
                scheme.map(|s| s.id.clone()).unwrap_or_default(),
                scheme.map(|s| s.label.clone()).unwrap_or_default(),
                concept.scheme_uri.clone(),
                notes_json(&concept.notes),
            ]);
        }

        let mut tables = vec![
            schemes, concepts, relations, systems, curated, candidates, components, database, all,
        ];
        if self.config.per_scheme_tables {
            for scheme in graph.schemes() {
                let mut table = Table::new(scheme_file(&scheme.id, "concepts.csv"), &CONCEPT_HEADERS);
                for concept in graph.concepts_in_scheme(&scheme.uri) {
                    table.push(concept_row(concept));
                }
                tables.push(table);
            }
        }
        for table in &mut tables {
            table.sort();
        }
        (tables, warnings)
    }

    /// Write all tables (and per-scheme JSON when enabled) to the output
    /// directory
    pub fn emit(&self, graph: &CanonicalGraph) -> Result<EmitReport> {
        let out_dir = &self.config.out_dir;
        std::fs::create_dir_all(out_dir).map_err(|e| Error::OutputDir {
            path: out_dir.display().to_string(),
            message: e.to_string(),
        })?;

        let (tables, warnings) = self.build_tables(graph);
        for message in &warnings {
            warn!("{message}");
        }

        let mut report = EmitReport {
            warnings,
            ..EmitReport::default()
        };
        for table in &tables {
            let path = out_dir.join(table.name());
            let file = create(&path)?;
            table.write(file)?;
            debug!(path = %path.display(), rows = table.len(), "Wrote table");
            report.tables.push(TableSummary {
                name: table.name().to_string(),
                rows: table.len(),
            });
            report.files.push(path);
        }

        let path = out_dir.join(ALL_CONCEPTS_JSON);
        write_json(&path, &all_concepts(graph))?;
        report.files.push(path);

        let path = out_dir.join(SCHEME_INDEX_JSON);
        write_json(&path, &scheme_index(graph))?;
        report.files.push(path);

        let candidates: Vec<CandidateRecord<'_>> = tables
            .iter()
            .find(|t| t.name() == CANDIDATE_MAPPINGS)
            .map(|t| t.rows().iter().map(|row| candidate_record(row)).collect())
            .unwrap_or_default();
        let path = out_dir.join(CANDIDATE_MAPPINGS_JSON);
        write_json(&path, &candidates)?;
        report.files.push(path);

        if self.config.per_scheme_json {
            for scheme in graph.schemes() {
                let path = out_dir.join(scheme_file(&scheme.id, "concepts.json"));
                self.write_scheme_json(graph, scheme, &path)?;
                report.files.push(path);
            }
        }

        info!(
            out_dir = %out_dir.display(),
            files = report.files.len(),
            warnings = report.warnings.len(),
            "Emission complete"
        );
        Ok(report)
    }

    fn write_scheme_json(&self, graph: &CanonicalGraph, scheme: &ConceptScheme, path: &Path) -> Result<()> {
        let concepts = graph.concepts_in_scheme(&scheme.uri);
        let ids: BTreeSet<_> = concepts.iter().copied().map(|c| &c.id).collect();
        let document = SchemeDocument {
            scheme,
            relations: graph
                .relations()
                .filter(|r| ids.contains(&r.subject))
                .collect(),
            concepts,
        };
        write_json(path, &document)
    }

    fn placement(&self, concept: &Concept) -> Placement {
        let matches = |patterns: &[Regex]| patterns.iter().any(|p| p.is_match(&concept.scheme_uri));
        match concept.kind {
            ConceptKind::Component(_) if matches(&self.component_patterns) => Placement::Components,
            ConceptKind::Table | ConceptKind::Column(_) if matches(&self.database_patterns) => {
                Placement::Database
            }
            _ => Placement::Concepts,
        }
    }
}

fn concept_row(concept: &Concept) -> Vec<String> {
    vec![
        concept.id.to_string(),
        concept.pref_label.clone(),
        concept.definition_or_empty().to_string(),
        concept.notation_or_empty().to_string(),
        concept.scheme_uri.clone(),
    ]
}

fn mapping_row(mapping: &Mapping) -> Vec<String> {
    vec![
        mapping.from_system.clone(),
        mapping.from_value.clone(),
        mapping.to_concept_id.to_string(),
        mapping.relation.as_str().to_string(),
        mapping.note.clone().unwrap_or_default(),
    ]
}

/// File name for a scheme-scoped output; path separators are replaced
fn scheme_file(scheme_id: &str, suffix: &str) -> String {
    let safe: String = scheme_id
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    format!("{safe}.{suffix}")
}

/// Every concept in id order, whatever table it was placed in
fn all_concepts(graph: &CanonicalGraph) -> Vec<IndexedConcept<'_>> {
    graph
        .concepts()
        .into_iter()
        .map(|concept| {
            let scheme = graph.scheme_by_uri(&concept.scheme_uri);
            IndexedConcept {
                scheme: scheme.map_or("", |s| s.id.as_str()),
                scheme_label: scheme.map_or("", |s| s.label.as_str()),
                id: &concept.id,
                label: &concept.pref_label,
                scheme_uri: &concept.scheme_uri,
                notes: &concept.notes,
            }
        })
        .collect()
}

fn scheme_index(graph: &CanonicalGraph) -> BTreeMap<&str, SchemeIndex<'_>> {
    graph
        .schemes()
        .map(|scheme| {
            let concepts = graph
                .concepts_in_scheme(&scheme.uri)
                .into_iter()
                .map(|c| &c.id)
                .collect();
            (
                scheme.id.as_str(),
                SchemeIndex {
                    label: &scheme.label,
                    uri: &scheme.uri,
                    concepts,
                },
            )
        })
        .collect()
}

fn candidate_record(row: &[String]) -> CandidateRecord<'_> {
    CandidateRecord {
        from_system: &row[0],
        from_value: &row[1],
        to_concept_id: &row[2],
        relation: &row[3],
        note: &row[4],
    }
}

/// Notes as a compact JSON object with sorted keys
fn notes_json(notes: &BTreeMap<String, String>) -> String {
    if notes.is_empty() {
        return "{}".to_string();
    }
    serde_json::to_string(notes).unwrap_or_default()
}

/// Pretty JSON followed by a single newline
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(create(path)?);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| Error::Json {
        document: path.display().to_string(),
        message: e.to_string(),
    })?;
    writer
        .write_all(b"\n")
        .and_then(|()| writer.flush())
        .map_err(|e| Error::write(path.display().to_string(), e.to_string()))
}

fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| Error::write(path.display().to_string(), e.to_string()))
}
