//! Canonical graph: merged, deduplicated entities from all sources

use crate::concept::{Concept, ConceptScheme};
use crate::fragment::GraphFragment;
use crate::identifiers::{IdentifierSystem, Mapping, MappingOrigin};
use crate::ids::ConceptId;
use crate::relation::SemanticRelation;
use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, trace};

/// Concept note holding the IRI a vocabulary concept was declared under
pub const URI_NOTE: &str = "uri";

/// Counts reported by a single merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Concepts that were new to the graph
    pub concepts_added: usize,
    /// Concepts already present with identical content
    pub concepts_unchanged: usize,
    /// Relations that were new to the graph
    pub relations_added: usize,
}

/// Run-scoped accumulator for every merged fragment
///
/// Concepts live in an arena indexed by their derived id; relations and
/// mappings are ordered sets. Nothing here depends on merge order, so two
/// graphs built from the same fragments in different orders compare equal.
#[derive(Debug, Default, Clone)]
pub struct CanonicalGraph {
    schemes: BTreeMap<String, ConceptScheme>,
    scheme_uris: HashMap<String, String>,
    concepts: Vec<Concept>,
    concept_index: HashMap<ConceptId, usize>,
    relations: BTreeSet<SemanticRelation>,
    identifier_systems: BTreeMap<String, IdentifierSystem>,
    system_uris: HashMap<String, String>,
    mappings: BTreeSet<Mapping>,
}

impl CanonicalGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a parser fragment into the graph.
    ///
    /// The fragment is checked completely before anything is applied, so a
    /// rejected fragment leaves the graph untouched. Re-merging the same
    /// fragment is idempotent.
    pub fn merge(&mut self, fragment: GraphFragment) -> Result<MergeStats> {
        self.check_scheme(fragment.scheme())?;
        for concept in fragment.concepts() {
            if let Some(existing) = self.concept(&concept.id) {
                if existing != concept {
                    return Err(Error::concept_conflict(concept.id.as_str()));
                }
            }
        }

        let (scheme, concepts, relations) = fragment.into_parts();
        let mut stats = MergeStats::default();

        debug!(scheme = %scheme.id, concepts = concepts.len(), relations = relations.len(), "Merging fragment");
        self.scheme_uris
            .insert(scheme.uri.clone(), scheme.id.clone());
        self.schemes.insert(scheme.id.clone(), scheme);

        for (id, concept) in concepts {
            if self.concept_index.contains_key(&id) {
                stats.concepts_unchanged += 1;
                continue;
            }
            trace!(concept = %id, "Adding concept");
            self.concept_index.insert(id, self.concepts.len());
            self.concepts.push(concept);
            stats.concepts_added += 1;
        }

        for relation in relations {
            if self.relations.insert(relation) {
                stats.relations_added += 1;
            }
        }

        Ok(stats)
    }

    /// Rewrite relation endpoints that are bare IRIs onto the concepts whose
    /// `uri` note carries that IRI; returns the number of relations rewritten.
    ///
    /// An IRI claimed by several concepts resolves to each of them. Endpoints
    /// that match nothing are left as they are.
    pub fn resolve_uri_references(&mut self) -> usize {
        let mut owners: BTreeMap<&str, Vec<&ConceptId>> = BTreeMap::new();
        for concept in &self.concepts {
            if let Some(uri) = concept.notes.get(URI_NOTE) {
                owners.entry(uri.as_str()).or_default().push(&concept.id);
            }
        }
        if owners.is_empty() {
            return 0;
        }
        let lookup = |id: &ConceptId| -> Option<Vec<ConceptId>> {
            if self.concept_index.contains_key(id) {
                return None;
            }
            owners
                .get(id.as_str())
                .map(|ids| ids.iter().map(|&id| id.clone()).collect())
        };

        let mut rewritten = Vec::new();
        for relation in &self.relations {
            let subjects = lookup(&relation.subject);
            let objects = lookup(&relation.object);
            if subjects.is_none() && objects.is_none() {
                continue;
            }
            let subjects = subjects.unwrap_or_else(|| vec![relation.subject.clone()]);
            let objects = objects.unwrap_or_else(|| vec![relation.object.clone()]);
            let resolved: Vec<SemanticRelation> = subjects
                .iter()
                .flat_map(|s| {
                    objects
                        .iter()
                        .map(move |o| SemanticRelation::new(s.clone(), relation.predicate, o.clone()))
                })
                .collect();
            rewritten.push((relation.clone(), resolved));
        }

        let count = rewritten.len();
        for (pending, resolved) in rewritten {
            trace!(subject = %pending.subject, object = %pending.object, "Resolving IRI reference");
            self.relations.remove(&pending);
            self.relations.extend(resolved);
        }
        if count > 0 {
            debug!(relations = count, "Resolved IRI references");
        }
        count
    }

    fn check_scheme(&self, scheme: &ConceptScheme) -> Result<()> {
        if let Some(owner) = self.scheme_uris.get(&scheme.uri) {
            if owner != &scheme.id {
                return Err(Error::DuplicateSchemeUri {
                    uri: scheme.uri.clone(),
                    existing: owner.clone(),
                    incoming: scheme.id.clone(),
                });
            }
        }
        match self.schemes.get(&scheme.id) {
            Some(existing) if existing != scheme => Err(Error::scheme_conflict(
                &scheme.id,
                format!(
                    "already registered as '{}' <{}>",
                    existing.label, existing.uri
                ),
            )),
            _ => Ok(()),
        }
    }

    /// Register an identifier system; identical re-registration is a no-op
    pub fn add_identifier_system(&mut self, system: IdentifierSystem) -> Result<()> {
        if let Some(owner) = self.system_uris.get(&system.uri) {
            if owner != &system.id {
                return Err(Error::DuplicateSystemUri {
                    uri: system.uri.clone(),
                    existing: owner.clone(),
                    incoming: system.id.clone(),
                });
            }
        }
        if let Some(existing) = self.identifier_systems.get(&system.id) {
            if *existing != system {
                return Err(Error::SystemConflict { id: system.id });
            }
            return Ok(());
        }
        self.system_uris.insert(system.uri.clone(), system.id.clone());
        self.identifier_systems.insert(system.id.clone(), system);
        Ok(())
    }

    /// Add a curated or candidate mapping; returns `false` for duplicates
    pub fn add_mapping(&mut self, mapping: Mapping) -> bool {
        self.mappings.insert(mapping)
    }

    /// Concept schemes sorted by id
    pub fn schemes(&self) -> impl Iterator<Item = &ConceptScheme> {
        self.schemes.values()
    }

    /// Look up a scheme by id
    pub fn scheme(&self, id: &str) -> Option<&ConceptScheme> {
        self.schemes.get(id)
    }

    /// Look up a scheme by canonical URI
    pub fn scheme_by_uri(&self, uri: &str) -> Option<&ConceptScheme> {
        self.scheme_uris.get(uri).and_then(|id| self.schemes.get(id))
    }

    /// Look up a concept by id
    pub fn concept(&self, id: &ConceptId) -> Option<&Concept> {
        self.concept_index.get(id).map(|&idx| &self.concepts[idx])
    }

    /// Whether a concept with this id exists
    pub fn contains_concept(&self, id: &ConceptId) -> bool {
        self.concept_index.contains_key(id)
    }

    /// All concepts sorted by id
    pub fn concepts(&self) -> Vec<&Concept> {
        let mut all: Vec<&Concept> = self.concepts.iter().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Concepts owned by the scheme with this URI, sorted by id
    pub fn concepts_in_scheme(&self, scheme_uri: &str) -> Vec<&Concept> {
        let mut owned: Vec<&Concept> = self
            .concepts
            .iter()
            .filter(|c| c.scheme_uri == scheme_uri)
            .collect();
        owned.sort_by(|a, b| a.id.cmp(&b.id));
        owned
    }

    /// Relations sorted by (subject, predicate, object)
    pub fn relations(&self) -> impl Iterator<Item = &SemanticRelation> {
        self.relations.iter()
    }

    /// Identifier systems sorted by id
    pub fn identifier_systems(&self) -> impl Iterator<Item = &IdentifierSystem> {
        self.identifier_systems.values()
    }

    /// Look up an identifier system by id
    pub fn identifier_system(&self, id: &str) -> Option<&IdentifierSystem> {
        self.identifier_systems.get(id)
    }

    /// Curated mappings in key order
    pub fn curated_mappings(&self) -> impl Iterator<Item = &Mapping> {
        self.mappings_with(MappingOrigin::Curated)
    }

    /// Candidate mappings in key order
    pub fn candidate_mappings(&self) -> impl Iterator<Item = &Mapping> {
        self.mappings_with(MappingOrigin::Candidate)
    }

    fn mappings_with(&self, origin: MappingOrigin) -> impl Iterator<Item = &Mapping> {
        self.mappings.iter().filter(move |m| m.origin == origin)
    }

    /// Number of concepts
    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    /// Number of relations
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }
}

impl PartialEq for CanonicalGraph {
    fn eq(&self, other: &Self) -> bool {
        self.schemes == other.schemes
            && self.concepts() == other.concepts()
            && self.relations == other.relations
            && self.identifier_systems == other.identifier_systems
            && self.mappings == other.mappings
    }
}

impl Eq for CanonicalGraph {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::Predicate;

    fn fragment(id: &str, uri: &str, labels: &[(&str, &str)]) -> GraphFragment {
        let mut frag = GraphFragment::new(ConceptScheme::new(id, id.to_uppercase(), uri));
        for (key, label) in labels {
            frag.add_concept(frag.concept(key, *label)).unwrap();
        }
        frag
    }

    #[test]
    fn test_merge_twice_is_idempotent() {
        let mut frag = fragment("iso", "urn:iso", &[("US", "United States"), ("DE", "Germany")]);
        frag.add_relation(
            frag.concept_id("US"),
            Predicate::Related,
            frag.concept_id("DE"),
        );

        let mut graph = CanonicalGraph::new();
        let first = graph.merge(frag.clone()).unwrap();
        let snapshot = graph.clone();
        let second = graph.merge(frag).unwrap();

        assert_eq!(first.concepts_added, 2);
        assert_eq!(first.relations_added, 1);
        assert_eq!(second.concepts_added, 0);
        assert_eq!(second.concepts_unchanged, 2);
        assert_eq!(second.relations_added, 0);
        assert_eq!(graph, snapshot);
    }

    #[test]
    fn test_merge_order_independent() {
        let a = fragment("a", "urn:a", &[("1", "One")]);
        let b = fragment("b", "urn:b", &[("2", "Two")]);

        let mut forward = CanonicalGraph::new();
        forward.merge(a.clone()).unwrap();
        forward.merge(b.clone()).unwrap();

        let mut reverse = CanonicalGraph::new();
        reverse.merge(b).unwrap();
        reverse.merge(a).unwrap();

        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_duplicate_scheme_uri_rejected_without_side_effects() {
        let mut graph = CanonicalGraph::new();
        graph.merge(fragment("a", "urn:shared", &[("1", "One")])).unwrap();

        let err = graph
            .merge(fragment("b", "urn:shared", &[("2", "Two")]))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateSchemeUri { .. }));
        assert_eq!(graph.concept_count(), 1);
        assert!(graph.scheme("b").is_none());
    }

    #[test]
    fn test_conflicting_concept_content_rejected() {
        let mut graph = CanonicalGraph::new();
        graph.merge(fragment("a", "urn:a", &[("1", "One")])).unwrap();
        let err = graph
            .merge(fragment("a", "urn:a", &[("1", "Uno")]))
            .unwrap_err();
        assert!(matches!(err, Error::ConceptConflict { .. }));
        assert_eq!(
            graph.concept(&ConceptId::derive("a", "1")).unwrap().pref_label,
            "One"
        );
    }

    #[test]
    fn test_identifier_system_uri_unique() {
        let mut graph = CanonicalGraph::new();
        let isin = IdentifierSystem {
            id: "isin".to_string(),
            name: "ISIN".to_string(),
            authority: Some("ISO".to_string()),
            uri: "urn:ufsa:id:isin".to_string(),
            description: None,
        };
        graph.add_identifier_system(isin.clone()).unwrap();
        graph.add_identifier_system(isin.clone()).unwrap();

        let clash = IdentifierSystem {
            id: "cusip".to_string(),
            ..isin
        };
        assert!(matches!(
            graph.add_identifier_system(clash),
            Err(Error::DuplicateSystemUri { .. })
        ));
    }

    #[test]
    fn test_bare_iri_objects_resolve_across_schemes() {
        let mut a = GraphFragment::new(ConceptScheme::new("a", "A", "urn:a"));
        a.add_concept(a.concept("http://a.org/eq", "Equity").with_note(URI_NOTE, "http://a.org/eq"))
            .unwrap();
        let subject = a.concept_id("http://a.org/eq");
        a.add_relation(subject.clone(), Predicate::ExactMatch, ConceptId::new("http://b.org/share"));
        a.add_relation(subject.clone(), Predicate::CloseMatch, ConceptId::new("http://c.org/none"));

        let mut b = GraphFragment::new(ConceptScheme::new("b", "B", "urn:b"));
        b.add_concept(b.concept("http://b.org/share", "Share").with_note(URI_NOTE, "http://b.org/share"))
            .unwrap();

        let mut graph = CanonicalGraph::new();
        graph.merge(a).unwrap();
        graph.merge(b).unwrap();
        assert_eq!(graph.resolve_uri_references(), 1);
        assert_eq!(graph.resolve_uri_references(), 0);

        let relations: Vec<_> = graph.relations().cloned().collect();
        assert_eq!(
            relations,
            vec![
                SemanticRelation::new(subject.clone(), Predicate::ExactMatch, ConceptId::derive("b", "http://b.org/share")),
                SemanticRelation::new(subject, Predicate::CloseMatch, ConceptId::new("http://c.org/none")),
            ]
        );
    }

    #[test]
    fn test_candidate_never_replaces_curated() {
        let mut graph = CanonicalGraph::new();
        let target = ConceptId::derive("a", "1");
        graph.add_mapping(Mapping::curated("isin", "X", target.clone(), Predicate::ExactMatch));
        graph.add_mapping(Mapping::candidate("isin", "X", target, Predicate::ExactMatch));
        assert_eq!(graph.curated_mappings().count(), 1);
        assert_eq!(graph.candidate_mappings().count(), 1);
    }
}
