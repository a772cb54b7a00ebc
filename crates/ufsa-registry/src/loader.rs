//! Registry loader
//!
//! Reads the pointer registry (YAML or JSON). The document itself must be
//! readable; individual entries that fail to deserialize are kept as
//! [`RegistryEntry::Invalid`] so the rest of the run can proceed.

use crate::descriptor::SourceDescriptor;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};
use ufsa_model::{ConceptId, IdentifierSystem, Mapping, Predicate};

/// Serializable registry entry, as written in registry files
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StandardFile {
    standard_id: String,
    name: String,
    #[serde(default)]
    governing_body: Option<String>,
    specification_url: String,
    #[serde(default)]
    data_format: String,
    #[serde(default)]
    parser_module: String,
    concept_scheme_uri: String,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct IdentifierSystemFile {
    id: String,
    name: String,
    #[serde(default)]
    authority: Option<String>,
    uri: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MappingFile {
    from_system: String,
    from_value: String,
    to_concept_id: String,
    #[serde(default = "default_relation")]
    relation: String,
    #[serde(default)]
    note: Option<String>,
}

fn default_relation() -> String {
    Predicate::ExactMatch.as_str().to_string()
}

/// One position in the registry's ordered source list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEntry {
    /// Well-formed descriptor
    Valid(SourceDescriptor),
    /// Entry that could not be turned into a descriptor
    Invalid {
        index: usize,
        source_id: Option<String>,
        reason: String,
    },
}

impl RegistryEntry {
    /// Source id, when one could be read
    pub fn source_id(&self) -> Option<&str> {
        match self {
            Self::Valid(d) => Some(&d.id),
            Self::Invalid { source_id, .. } => source_id.as_deref(),
        }
    }
}

/// Parsed registry: ordered sources plus the curated identifier catalog
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub entries: Vec<RegistryEntry>,
    pub identifier_systems: Vec<IdentifierSystem>,
    pub mappings: Vec<Mapping>,
    /// Catalog entries skipped while loading
    pub warnings: Vec<String>,
}

impl Registry {
    /// Build a registry directly from descriptors
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = SourceDescriptor>) -> Self {
        Self {
            entries: descriptors.into_iter().map(RegistryEntry::Valid).collect(),
            ..Self::default()
        }
    }

    /// Well-formed descriptors in registry order
    pub fn descriptors(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.entries.iter().filter_map(|e| match e {
            RegistryEntry::Valid(d) => Some(d),
            RegistryEntry::Invalid { .. } => None,
        })
    }
}

/// Loads registry documents from disk or strings
#[derive(Debug, Default, Clone, Copy)]
pub struct RegistryLoader;

impl RegistryLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a registry file; `.json` is read as JSON, everything else as YAML
    pub fn load_from_file(&self, path: &Path) -> Result<Registry> {
        debug!(path = %path.display(), "Loading registry");
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(path.display().to_string(), e.to_string()))?;

        let registry = if path.extension().is_some_and(|e| e == "json") {
            self.load_from_json(&content)?
        } else {
            self.load_from_yaml(&content)?
        };
        info!(
            path = %path.display(),
            sources = registry.entries.len(),
            identifier_systems = registry.identifier_systems.len(),
            mappings = registry.mappings.len(),
            "Loaded registry"
        );
        Ok(registry)
    }

    /// Load a registry from a YAML string
    pub fn load_from_yaml(&self, yaml: &str) -> Result<Registry> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml)
            .map_err(|e| Error::InvalidFormat(format!("YAML parse error: {e}")))?;
        self.convert_document(value)
    }

    /// Load a registry from a JSON string
    pub fn load_from_json(&self, json: &str) -> Result<Registry> {
        let value: serde_yaml::Value = serde_json::from_str(json)
            .map_err(|e| Error::InvalidFormat(format!("JSON parse error: {e}")))?;
        self.convert_document(value)
    }

    fn convert_document(&self, value: serde_yaml::Value) -> Result<Registry> {
        let serde_yaml::Value::Mapping(mut root) = value else {
            return Err(Error::InvalidFormat(
                "registry document must be a mapping".to_string(),
            ));
        };

        let standards = take_sequence(&mut root, "standards")?;
        let mut registry = Registry::default();
        let mut seen_ids = HashSet::new();
        for (index, raw) in standards.into_iter().enumerate() {
            let entry = convert_standard(index, raw, &mut seen_ids);
            if let RegistryEntry::Invalid { reason, .. } = &entry {
                warn!(index, %reason, "Invalid registry entry");
            }
            registry.entries.push(entry);
        }

        for (index, raw) in take_sequence(&mut root, "identifier_systems")?
            .into_iter()
            .enumerate()
        {
            match serde_yaml::from_value::<IdentifierSystemFile>(raw) {
                Ok(s) => registry.identifier_systems.push(IdentifierSystem {
                    id: s.id,
                    name: s.name,
                    authority: s.authority,
                    uri: s.uri,
                    description: s.description,
                }),
                Err(e) => registry
                    .warnings
                    .push(format!("identifier system #{index} skipped: {e}")),
            }
        }

        for (index, raw) in take_sequence(&mut root, "mappings")?.into_iter().enumerate() {
            match convert_mapping(raw) {
                Ok(m) => registry.mappings.push(m),
                Err(reason) => registry
                    .warnings
                    .push(format!("curated mapping #{index} skipped: {reason}")),
            }
        }

        for message in &registry.warnings {
            warn!("{message}");
        }
        Ok(registry)
    }
}

fn take_sequence(root: &mut serde_yaml::Mapping, key: &str) -> Result<Vec<serde_yaml::Value>> {
    match root.remove(key) {
        None | Some(serde_yaml::Value::Null) => Ok(Vec::new()),
        Some(serde_yaml::Value::Sequence(items)) => Ok(items),
        Some(_) => Err(Error::InvalidFormat(format!("'{key}' must be a list"))),
    }
}

fn convert_standard(
    index: usize,
    raw: serde_yaml::Value,
    seen_ids: &mut HashSet<String>,
) -> RegistryEntry {
    let declared_id = raw
        .get("standard_id")
        .and_then(serde_yaml::Value::as_str)
        .map(str::to_string);
    let invalid = |reason: String| RegistryEntry::Invalid {
        index,
        source_id: declared_id.clone(),
        reason,
    };

    let file: StandardFile = match serde_yaml::from_value(raw) {
        Ok(file) => file,
        Err(e) => return invalid(e.to_string()),
    };
    if file.standard_id.trim().is_empty() {
        return invalid("standard_id must not be empty".to_string());
    }
    if file.concept_scheme_uri.trim().is_empty() {
        return invalid("concept_scheme_uri must not be empty".to_string());
    }
    if !seen_ids.insert(file.standard_id.clone()) {
        return invalid(format!("duplicate standard_id '{}'", file.standard_id));
    }

    RegistryEntry::Valid(SourceDescriptor {
        id: file.standard_id,
        label: file.name,
        governing_body: file.governing_body,
        location: file.specification_url,
        data_format: file.data_format,
        parser_tag: file.parser_module,
        scheme_uri: file.concept_scheme_uri,
        metadata: file.metadata,
    })
}

fn convert_mapping(raw: serde_yaml::Value) -> std::result::Result<Mapping, String> {
    let file: MappingFile = serde_yaml::from_value(raw).map_err(|e| e.to_string())?;
    let relation: Predicate = file.relation.parse().map_err(|e: ufsa_model::Error| e.to_string())?;
    if !relation.is_mapping_grade() {
        return Err(format!("'{relation}' is not a mapping-grade relation"));
    }
    let mapping = Mapping::curated(
        file.from_system,
        file.from_value,
        ConceptId::new(file.to_concept_id),
        relation,
    );
    Ok(match file.note {
        Some(note) => mapping.with_note(note),
        None => mapping,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"
standards:
  - standard_id: iso_3166_1_a2
    name: ISO 3166-1 A2
    governing_body: ISO
    specification_url: fixtures://iso/iso_3166_1_a2.csv
    data_format: csv
    parser_module: ufsa_v2.parsers.csv_parser
    concept_scheme_uri: http://ufsa.org/v2/standards/iso_3166_1_a2
  - name: missing id
    specification_url: fixtures://x.csv
    concept_scheme_uri: urn:x
  - standard_id: iso_3166_1_a2
    name: duplicate
    specification_url: fixtures://y.csv
    concept_scheme_uri: urn:y
identifier_systems:
  - id: isin
    name: International Securities Identification Number
    authority: ISO
    uri: urn:ufsa:id:isin
mappings:
  - from_system: isin
    from_value: US0378331005
    to_concept_id: "companies:apple"
    relation: skos:exactMatch
    note: issuer ISIN
  - from_system: isin
    from_value: X
    to_concept_id: "companies:x"
    relation: skos:broader
"#;

    #[test]
    fn test_load_registry_with_invalid_entries() {
        let registry = RegistryLoader::new().load_from_yaml(REGISTRY).unwrap();
        assert_eq!(registry.entries.len(), 3);

        let first = registry.descriptors().next().unwrap();
        assert_eq!(first.id, "iso_3166_1_a2");
        assert_eq!(first.governing_body.as_deref(), Some("ISO"));
        assert_eq!(first.parser_tag, "ufsa_v2.parsers.csv_parser");

        assert!(matches!(registry.entries[1], RegistryEntry::Invalid { index: 1, .. }));
        match &registry.entries[2] {
            RegistryEntry::Invalid { reason, source_id, .. } => {
                assert!(reason.contains("duplicate"));
                assert_eq!(source_id.as_deref(), Some("iso_3166_1_a2"));
            }
            RegistryEntry::Valid(_) => panic!("duplicate id should be invalid"),
        }
    }

    #[test]
    fn test_catalog_sections() {
        let registry = RegistryLoader::new().load_from_yaml(REGISTRY).unwrap();
        assert_eq!(registry.identifier_systems.len(), 1);
        assert_eq!(registry.mappings.len(), 1);
        assert_eq!(registry.mappings[0].note.as_deref(), Some("issuer ISIN"));
        assert_eq!(registry.warnings.len(), 1);
    }

    #[test]
    fn test_non_mapping_document_is_fatal() {
        let err = RegistryLoader::new().load_from_yaml("- a\n- b\n").unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_json_registry() {
        let json = r#"{"standards": [{"standard_id": "a", "name": "A",
            "specification_url": "a.sql", "data_format": "sql",
            "concept_scheme_uri": "urn:a"}]}"#;
        let registry = RegistryLoader::new().load_from_json(json).unwrap();
        assert_eq!(registry.descriptors().count(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = RegistryLoader::new()
            .load_from_file(Path::new("/definitely/not/here.yaml"))
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
