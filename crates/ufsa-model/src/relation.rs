//! Relation predicates and semantic relations

use crate::ids::ConceptId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SKOS_NS: &str = "http://www.w3.org/2004/02/skos/core#";

/// Fixed relation vocabulary (SKOS semantic and mapping properties)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Predicate {
    Broader,
    Narrower,
    Related,
    ExactMatch,
    CloseMatch,
    BroadMatch,
    NarrowMatch,
    RelatedMatch,
}

impl Predicate {
    /// Every predicate, in declaration order
    pub const ALL: [Predicate; 8] = [
        Self::Broader,
        Self::Narrower,
        Self::Related,
        Self::ExactMatch,
        Self::CloseMatch,
        Self::BroadMatch,
        Self::NarrowMatch,
        Self::RelatedMatch,
    ];

    /// SKOS local name, e.g. `broader`
    pub fn local_name(self) -> &'static str {
        match self {
            Self::Broader => "broader",
            Self::Narrower => "narrower",
            Self::Related => "related",
            Self::ExactMatch => "exactMatch",
            Self::CloseMatch => "closeMatch",
            Self::BroadMatch => "broadMatch",
            Self::NarrowMatch => "narrowMatch",
            Self::RelatedMatch => "relatedMatch",
        }
    }

    /// Compact form written to tables, e.g. `skos:broader`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Broader => "skos:broader",
            Self::Narrower => "skos:narrower",
            Self::Related => "skos:related",
            Self::ExactMatch => "skos:exactMatch",
            Self::CloseMatch => "skos:closeMatch",
            Self::BroadMatch => "skos:broadMatch",
            Self::NarrowMatch => "skos:narrowMatch",
            Self::RelatedMatch => "skos:relatedMatch",
        }
    }

    /// Full SKOS IRI
    pub fn iri(self) -> String {
        format!("{SKOS_NS}{}", self.local_name())
    }

    /// Whether this is a mapping-grade predicate (usable for mappings)
    pub fn is_mapping_grade(self) -> bool {
        matches!(
            self,
            Self::ExactMatch
                | Self::CloseMatch
                | Self::BroadMatch
                | Self::NarrowMatch
                | Self::RelatedMatch
        )
    }

    /// Resolve a full SKOS IRI
    pub fn from_iri(iri: &str) -> Option<Self> {
        let local = iri.strip_prefix(SKOS_NS)?;
        Self::ALL.into_iter().find(|p| p.local_name() == local)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Predicate {
    type Err = Error;

    /// Accepts `skos:broader`, `broader` or the full SKOS IRI
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Some(p) = Self::from_iri(trimmed) {
            return Ok(p);
        }
        let local = trimmed.strip_prefix("skos:").unwrap_or(trimmed);
        Self::ALL
            .into_iter()
            .find(|p| p.local_name().eq_ignore_ascii_case(local))
            .ok_or_else(|| Error::UnknownPredicate(s.to_string()))
    }
}

/// Directed, typed edge between two concepts
///
/// Ordering is (subject, predicate, object) so a sorted set of relations is
/// already in emission order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SemanticRelation {
    pub subject: ConceptId,
    pub predicate: Predicate,
    pub object: ConceptId,
}

impl SemanticRelation {
    /// Create a new relation
    pub fn new(subject: ConceptId, predicate: Predicate, object: ConceptId) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_parsing_forms() {
        assert_eq!("skos:broader".parse::<Predicate>().unwrap(), Predicate::Broader);
        assert_eq!("relatedMatch".parse::<Predicate>().unwrap(), Predicate::RelatedMatch);
        assert_eq!(
            "http://www.w3.org/2004/02/skos/core#closeMatch"
                .parse::<Predicate>()
                .unwrap(),
            Predicate::CloseMatch
        );
        assert!("skos:sameAs".parse::<Predicate>().is_err());
    }

    #[test]
    fn test_mapping_grade() {
        assert!(!Predicate::Broader.is_mapping_grade());
        assert!(!Predicate::Related.is_mapping_grade());
        assert!(Predicate::RelatedMatch.is_mapping_grade());
    }

    #[test]
    fn test_relation_ordering_by_subject_first() {
        let a = SemanticRelation::new("a".into(), Predicate::RelatedMatch, "z".into());
        let b = SemanticRelation::new("b".into(), Predicate::Broader, "a".into());
        assert!(a < b);
    }
}
