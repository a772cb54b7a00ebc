//! Label-equality candidate generator

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};
use ufsa_model::{CanonicalGraph, Concept, Mapping, Predicate};

/// Note attached to every generated candidate
pub const CANDIDATE_NOTE: &str = "candidate: case-normalized label equality";

/// Candidate generation options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateConfig {
    /// Relation label applied to every candidate
    pub relation: Predicate,
    /// Normalized labels shorter than this (in characters) are ignored
    pub min_label_length: usize,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            relation: Predicate::RelatedMatch,
            min_label_length: 1,
        }
    }
}

impl CandidateConfig {
    /// Build a config from a relation label such as `skos:closeMatch`
    pub fn new(relation: &str, min_label_length: usize) -> Result<Self> {
        let predicate: Predicate = relation.parse().map_err(|e: ufsa_model::Error| {
            Error::InvalidRelation {
                relation: relation.to_string(),
                reason: e.to_string(),
            }
        })?;
        if !predicate.is_mapping_grade() {
            return Err(Error::InvalidRelation {
                relation: relation.to_string(),
                reason: "candidates need a mapping-grade relation".to_string(),
            });
        }
        Ok(Self {
            relation: predicate,
            min_label_length,
        })
    }
}

/// Case-fold and trim a label for comparison
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Proposes candidate mappings between concepts of different schemes
#[derive(Debug, Clone, Default)]
pub struct CandidateGenerator {
    config: CandidateConfig,
}

impl CandidateGenerator {
    pub fn new(config: CandidateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CandidateConfig {
        &self.config
    }

    /// Candidate mappings for the graph, deduplicated and sorted.
    ///
    /// Each pair of concepts from different schemes whose normalized labels
    /// are equal yields one mapping from the lower concept id to the higher
    /// one; `from_system` is the lower concept's scheme URI.
    pub fn generate(&self, graph: &CanonicalGraph) -> Vec<Mapping> {
        let mut groups: BTreeMap<String, Vec<&Concept>> = BTreeMap::new();
        for concept in graph.concepts() {
            let label = normalize_label(&concept.pref_label);
            if label.is_empty() || label.chars().count() < self.config.min_label_length {
                continue;
            }
            groups.entry(label).or_default().push(concept);
        }

        let mut candidates = BTreeSet::new();
        for (label, mut members) in groups {
            if members.len() < 2 {
                continue;
            }
            members.sort_by(|a, b| a.id.cmp(&b.id));
            for (i, from) in members.iter().enumerate() {
                for to in &members[i + 1..] {
                    if from.scheme_uri == to.scheme_uri {
                        continue;
                    }
                    let mapping = Mapping::candidate(
                        from.scheme_uri.clone(),
                        from.id.as_str(),
                        to.id.clone(),
                        self.config.relation,
                    )
                    .with_note(CANDIDATE_NOTE);
                    candidates.insert(mapping);
                }
            }
            debug!(label = %label, concepts = members.len(), "Label group considered");
        }

        let candidates: Vec<Mapping> = candidates.into_iter().collect();
        info!(
            candidates = candidates.len(),
            relation = %self.config.relation,
            "Generated candidate mappings"
        );
        candidates
    }

    /// Add the generated candidates to the graph; returns how many were new
    pub fn annotate(&self, graph: &mut CanonicalGraph) -> usize {
        self.generate(graph)
            .into_iter()
            .filter(|mapping| graph.add_mapping(mapping.clone()))
            .count()
    }
}
