//! Concept schemes and concepts
#![allow(clippy::must_use_candidate)] // Builder API intentionally omits pervasive #[must_use].
#![allow(clippy::return_self_not_must_use)]

use crate::ids::ConceptId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One ingested standard/source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptScheme {
    /// Stable identifier (the registry source id)
    pub id: String,

    /// Display label
    pub label: String,

    /// Canonical URI, unique across the graph
    pub uri: String,

    /// Governing body label
    pub governing_body: Option<String>,
}

impl ConceptScheme {
    /// Create a new concept scheme
    pub fn new(id: impl Into<String>, label: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            uri: uri.into(),
            governing_body: None,
        }
    }

    /// Set the governing body; blank values are ignored
    pub fn with_governing_body(mut self, body: impl Into<String>) -> Self {
        self.governing_body = non_blank(body.into());
        self
    }
}

/// One semantic unit drawn from a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    /// Derived, globally unique identifier
    pub id: ConceptId,

    /// Preferred label
    pub pref_label: String,

    /// Definition text
    pub definition: Option<String>,

    /// Notation or code
    pub notation: Option<String>,

    /// URI of the owning concept scheme
    pub scheme_uri: String,

    /// Structural kind with its typed payload
    pub kind: ConceptKind,

    /// Free-form structured notes retained from the source
    pub notes: BTreeMap<String, String>,
}

/// What a concept stands for in its source
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConceptKind {
    /// Vocabulary term or code list entry
    #[default]
    Term,

    /// Field or property of a structured schema
    Field,

    /// Database table
    Table,

    /// Database column
    Column(ColumnInfo),

    /// Software component from a bill of materials
    Component(ComponentInfo),
}

/// Column details kept for the database-schema table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub table: String,
    pub column: String,
    pub data_type: String,
    pub nullable: bool,
    pub foreign_key: Option<ForeignKeyRef>,
}

/// Referenced table/column of a foreign key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

/// Component details kept for the software-component table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComponentInfo {
    /// Package identifier (purl, bom-ref or name@version)
    pub identifier: String,
    pub name: String,
    pub version: Option<String>,
    /// License ids or SPDX expressions
    pub licenses: Vec<String>,
    /// `ALG:digest` pairs
    pub hashes: Vec<String>,
    /// External reference URLs
    pub external_references: Vec<String>,
}

impl ConceptKind {
    /// Whether concepts of this kind are written to a specialized table
    pub fn is_specialized(&self) -> bool {
        matches!(self, Self::Table | Self::Column(_) | Self::Component(_))
    }

    /// Short tag used in notes and JSON output
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Term => "term",
            Self::Field => "field",
            Self::Table => "table",
            Self::Column(_) => "column",
            Self::Component(_) => "software_component",
        }
    }
}

impl Concept {
    /// Create a new term concept owned by `scheme_uri`
    pub fn new(id: ConceptId, pref_label: impl Into<String>, scheme_uri: impl Into<String>) -> Self {
        Self {
            id,
            pref_label: pref_label.into(),
            definition: None,
            notation: None,
            scheme_uri: scheme_uri.into(),
            kind: ConceptKind::Term,
            notes: BTreeMap::new(),
        }
    }

    /// Set the definition; blank text leaves it empty
    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = non_blank(definition.into());
        self
    }

    /// Set the notation; blank text leaves it empty
    pub fn with_notation(mut self, notation: impl Into<String>) -> Self {
        self.notation = non_blank(notation.into());
        self
    }

    /// Set the structural kind
    pub fn with_kind(mut self, kind: ConceptKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attach a note; blank values are dropped
    pub fn with_note(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Some(value) = non_blank(value.into()) {
            self.notes.insert(key.into(), value);
        }
        self
    }

    /// Definition text or the empty string
    pub fn definition_or_empty(&self) -> &str {
        self.definition.as_deref().unwrap_or("")
    }

    /// Notation text or the empty string
    pub fn notation_or_empty(&self) -> &str {
        self.notation.as_deref().unwrap_or("")
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_definition_stays_empty() {
        let concept = Concept::new(ConceptId::derive("s", "a"), "A", "urn:s").with_definition("   ");
        assert!(concept.definition.is_none());
        assert_eq!(concept.definition_or_empty(), "");
    }

    #[test]
    fn test_specialized_kinds() {
        assert!(!ConceptKind::Term.is_specialized());
        assert!(!ConceptKind::Field.is_specialized());
        assert!(ConceptKind::Table.is_specialized());
        assert!(ConceptKind::Component(ComponentInfo::default()).is_specialized());
    }

    #[test]
    fn test_kind_serializes_with_tag() {
        let kind = ConceptKind::Column(ColumnInfo {
            table: "orders".to_string(),
            column: "user_id".to_string(),
            data_type: "INTEGER".to_string(),
            nullable: true,
            foreign_key: None,
        });
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["kind"], "column");
        assert_eq!(json["table"], "orders");
    }

    #[test]
    fn test_governing_body_blank_ignored() {
        let scheme = ConceptScheme::new("iso", "ISO", "urn:iso").with_governing_body("");
        assert!(scheme.governing_body.is_none());
    }
}
