//! Per-source graph fragments

use crate::concept::{Concept, ConceptScheme};
use crate::ids::ConceptId;
use crate::relation::{Predicate, SemanticRelation};
use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Self-contained output of one parser run
///
/// A fragment owns exactly one concept scheme; every concept added to it
/// must belong to that scheme. Relations are kept as a set so duplicates
/// collapse on insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphFragment {
    scheme: ConceptScheme,
    concepts: BTreeMap<ConceptId, Concept>,
    relations: BTreeSet<SemanticRelation>,
    warnings: Vec<String>,
}

impl GraphFragment {
    /// Create an empty fragment for `scheme`
    pub fn new(scheme: ConceptScheme) -> Self {
        Self {
            scheme,
            concepts: BTreeMap::new(),
            relations: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }

    /// The owning concept scheme
    pub fn scheme(&self) -> &ConceptScheme {
        &self.scheme
    }

    /// Derive a concept id for a source-local key in this fragment's source
    pub fn concept_id(&self, local_key: &str) -> ConceptId {
        ConceptId::derive(&self.scheme.id, local_key)
    }

    /// Start a concept owned by this fragment's scheme
    pub fn concept(&self, local_key: &str, pref_label: impl Into<String>) -> Concept {
        Concept::new(self.concept_id(local_key), pref_label, self.scheme.uri.clone())
    }

    /// Add a concept.
    ///
    /// Re-adding an identical concept is a no-op and returns `Ok(false)`.
    /// A concept owned by another scheme, or a second concept with the same
    /// id but different content, is an error.
    pub fn add_concept(&mut self, concept: Concept) -> Result<bool> {
        if concept.scheme_uri != self.scheme.uri {
            return Err(Error::DanglingScheme {
                concept: concept.id.to_string(),
                scheme_uri: concept.scheme_uri,
            });
        }
        match self.concepts.get(&concept.id) {
            Some(existing) if *existing == concept => Ok(false),
            Some(_) => Err(Error::concept_conflict(concept.id.as_str())),
            None => {
                self.concepts.insert(concept.id.clone(), concept);
                Ok(true)
            }
        }
    }

    /// Add a relation; returns `false` when it was already present
    pub fn add_relation(&mut self, subject: ConceptId, predicate: Predicate, object: ConceptId) -> bool {
        self.relations
            .insert(SemanticRelation::new(subject, predicate, object))
    }

    /// Record a non-fatal issue found while parsing
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(source = %self.scheme.id, "{message}");
        self.warnings.push(message);
    }

    /// Whether a concept with this id has been added
    pub fn contains(&self, id: &ConceptId) -> bool {
        self.concepts.contains_key(id)
    }

    /// Look up a concept by id
    pub fn get(&self, id: &ConceptId) -> Option<&Concept> {
        self.concepts.get(id)
    }

    /// Concepts sorted by id
    pub fn concepts(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values()
    }

    /// Relations sorted by (subject, predicate, object)
    pub fn relations(&self) -> impl Iterator<Item = &SemanticRelation> {
        self.relations.iter()
    }

    /// Warnings recorded while parsing
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Number of concepts
    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    /// Number of relations
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    /// Whether the fragment holds no concepts and no relations
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty() && self.relations.is_empty()
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        ConceptScheme,
        BTreeMap<ConceptId, Concept>,
        BTreeSet<SemanticRelation>,
    ) {
        (self.scheme, self.concepts, self.relations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment() -> GraphFragment {
        GraphFragment::new(ConceptScheme::new("iso", "ISO 3166", "urn:iso"))
    }

    #[test]
    fn test_add_concept_idempotent() {
        let mut frag = fragment();
        let concept = frag.concept("US", "United States");
        assert!(frag.add_concept(concept.clone()).unwrap());
        assert!(!frag.add_concept(concept).unwrap());
        assert_eq!(frag.concept_count(), 1);
    }

    #[test]
    fn test_conflicting_concept_rejected() {
        let mut frag = fragment();
        frag.add_concept(frag.concept("US", "United States")).unwrap();
        let err = frag
            .add_concept(frag.concept("US", "United States of America"))
            .unwrap_err();
        assert!(matches!(err, Error::ConceptConflict { .. }));
    }

    #[test]
    fn test_foreign_scheme_concept_is_dangling() {
        let mut frag = fragment();
        let stray = Concept::new(ConceptId::derive("iso", "DE"), "Germany", "urn:other");
        assert!(matches!(
            frag.add_concept(stray),
            Err(Error::DanglingScheme { .. })
        ));
    }

    #[test]
    fn test_duplicate_relations_collapse() {
        let mut frag = fragment();
        let a = frag.concept_id("a");
        let b = frag.concept_id("b");
        assert!(frag.add_relation(a.clone(), Predicate::Related, b.clone()));
        assert!(!frag.add_relation(a, Predicate::Related, b));
        assert_eq!(frag.relation_count(), 1);
    }
}
