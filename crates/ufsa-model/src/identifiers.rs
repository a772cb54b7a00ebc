//! Identifier systems and mappings

use crate::ids::ConceptId;
use crate::relation::Predicate;
use serde::{Deserialize, Serialize};

/// External identification scheme, independent of any concept scheme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierSystem {
    pub id: String,
    pub name: String,
    pub authority: Option<String>,
    pub uri: String,
    pub description: Option<String>,
}

/// Whether a mapping was declared by a curator or proposed by the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingOrigin {
    Curated,
    Candidate,
}

/// Correspondence from a value in an identifier system to a concept
///
/// Curated and candidate mappings with the same key are distinct values;
/// a candidate is never promoted by colliding with a curated mapping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Mapping {
    pub from_system: String,
    pub from_value: String,
    pub to_concept_id: ConceptId,
    pub relation: Predicate,
    pub origin: MappingOrigin,
    pub note: Option<String>,
}

impl Mapping {
    /// Build a curated mapping
    pub fn curated(
        from_system: impl Into<String>,
        from_value: impl Into<String>,
        to_concept_id: ConceptId,
        relation: Predicate,
    ) -> Self {
        Self {
            from_system: from_system.into(),
            from_value: from_value.into(),
            to_concept_id,
            relation,
            origin: MappingOrigin::Curated,
            note: None,
        }
    }

    /// Build a machine-proposed candidate mapping
    pub fn candidate(
        from_system: impl Into<String>,
        from_value: impl Into<String>,
        to_concept_id: ConceptId,
        relation: Predicate,
    ) -> Self {
        Self {
            origin: MappingOrigin::Candidate,
            ..Self::curated(from_system, from_value, to_concept_id, relation)
        }
    }

    /// Attach a note
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        self.note = if note.trim().is_empty() { None } else { Some(note) };
        self
    }

    /// Whether this mapping is curated
    pub fn is_curated(&self) -> bool {
        self.origin == MappingOrigin::Curated
    }
}
