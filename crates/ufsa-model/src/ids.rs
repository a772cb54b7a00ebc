//! Identifier newtypes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Globally unique concept identifier.
///
/// Derived ids have the shape `<source_id>:<local_key>`, so the same source
/// document always yields the same identifiers regardless of run order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(String);

impl ConceptId {
    /// Derive a concept id from the owning source id and a source-local key
    pub fn derive(source_id: &str, local_key: &str) -> Self {
        Self(format!("{source_id}:{local_key}"))
    }

    /// Wrap an id that was produced elsewhere (e.g. an external IRI)
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The source-local key, if this id was derived for `source_id`
    pub fn local_key<'a>(&'a self, source_id: &str) -> Option<&'a str> {
        self.0
            .strip_prefix(source_id)
            .and_then(|rest| rest.strip_prefix(':'))
    }
}

impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConceptId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConceptId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_content_determined() {
        let a = ConceptId::derive("iso_3166", "US");
        let b = ConceptId::derive("iso_3166", "US");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "iso_3166:US");
    }

    #[test]
    fn test_local_key_round_trip() {
        let id = ConceptId::derive("dw", "orders.user_id");
        assert_eq!(id.local_key("dw"), Some("orders.user_id"));
        assert_eq!(id.local_key("other"), None);
    }
}
