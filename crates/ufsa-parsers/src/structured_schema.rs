//! Structured-schema (JSON Schema) parser
//!
//! The selected root schema becomes one concept; every property becomes a
//! field concept keyed by its dotted path and linked `skos:broader` to its
//! parent. Array `items` become a `path[]` child. Local `$ref`s are
//! followed, recursive ones only once per branch. Property names are
//! percent-escaped in paths where they contain `.`, `[`, `]` or `%`.

use crate::{Error, FormatParser, Result, SourceInput};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeSet;
use tracing::debug;
use ufsa_model::{ConceptId, ConceptKind, GraphFragment, Predicate};
use ufsa_registry::SourceFormat;

const MAX_DEPTH: usize = 64;

/// Parser for JSON-Schema-like documents
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredSchemaParser;

impl FormatParser for StructuredSchemaParser {
    fn format(&self) -> SourceFormat {
        SourceFormat::StructuredSchema
    }

    fn parse(&self, input: &SourceInput<'_>) -> Result<GraphFragment> {
        let source_id = input.source_id();
        let document: Value = serde_json::from_str(input.content)
            .map_err(|e| Error::syntax(source_id, e.line(), e.to_string()))?;
        let contract = |message: String| Error::contract(source_id, SourceFormat::StructuredSchema, message);

        let (root_name, root) = match input.descriptor.metadata("definition") {
            Some(name) => {
                let found = ["definitions", "$defs"]
                    .iter()
                    .find_map(|section| document.get(section).and_then(|d| d.get(name)));
                let Some(found) = found else {
                    return Err(contract(format!("definition '{name}' not found")));
                };
                (name.to_string(), found)
            }
            None => {
                let name = document
                    .get("title")
                    .and_then(Value::as_str)
                    .filter(|t| !t.trim().is_empty())
                    .map(|t| t.trim().to_string())
                    .unwrap_or_else(|| source_id.to_string());
                (name, &document)
            }
        };
        if !root.is_object() {
            return Err(contract("root schema must be an object".to_string()));
        }

        let mut walker = Walker {
            input,
            document: &document,
            fragment: input.fragment(),
            expanding: BTreeSet::new(),
        };
        let root_id = walker.add_node(&root_name, &root_name, root, root, false, None)?;
        walker.walk(root, &root_id, &root_name, 1)?;

        let fragment = walker.fragment;
        debug!(
            source = source_id,
            concepts = fragment.concept_count(),
            relations = fragment.relation_count(),
            "Parsed structured schema"
        );
        Ok(fragment)
    }
}

struct Walker<'a> {
    input: &'a SourceInput<'a>,
    document: &'a Value,
    fragment: GraphFragment,
    /// `$ref`s currently being expanded on this branch
    expanding: BTreeSet<String>,
}

impl<'a> Walker<'a> {
    /// Descend into the `properties` of `schema`
    fn walk(&mut self, schema: &'a Value, parent: &ConceptId, parent_path: &str, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            self.fragment
                .warn(format!("'{parent_path}': nesting deeper than {MAX_DEPTH} levels not expanded"));
            return Ok(());
        }
        let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
            return Ok(());
        };
        let required: BTreeSet<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        for (name, declared) in properties {
            let path = format!("{parent_path}.{}", path_segment(name));
            let (resolved, reference) = self.resolve(declared, &path);
            let id = self.add_node(&path, name, declared, resolved, required.contains(name.as_str()), Some(parent))?;

            let entered = match reference {
                Some(reference) if !self.expanding.insert(reference.clone()) => {
                    self.fragment
                        .warn(format!("'{path}': recursive $ref '{reference}' not expanded"));
                    continue;
                }
                other => other,
            };
            self.expand(resolved, &id, &path, name, depth)?;
            if let Some(reference) = entered {
                self.expanding.remove(&reference);
            }
        }
        Ok(())
    }

    /// Expand nested properties and array items below a field
    fn expand(&mut self, schema: &'a Value, id: &ConceptId, path: &str, name: &str, depth: usize) -> Result<()> {
        self.walk(schema, id, path, depth + 1)?;

        let Some(items) = schema.get("items").filter(|i| i.is_object()) else {
            return Ok(());
        };
        let item_path = format!("{path}[]");
        let (resolved, reference) = self.resolve(items, &item_path);
        let item_id = self.add_node(&item_path, &format!("{name}[]"), items, resolved, false, Some(id))?;
        if let Some(reference) = reference {
            if !self.expanding.insert(reference.clone()) {
                self.fragment
                    .warn(format!("'{item_path}': recursive $ref '{reference}' not expanded"));
                return Ok(());
            }
            self.walk(resolved, &item_id, &item_path, depth + 1)?;
            self.expanding.remove(&reference);
            Ok(())
        } else {
            self.walk(resolved, &item_id, &item_path, depth + 1)
        }
    }

    /// Follow a local `$ref`; unresolvable references are kept opaque
    fn resolve(&mut self, schema: &'a Value, path: &str) -> (&'a Value, Option<String>) {
        let Some(reference) = schema.get("$ref").and_then(Value::as_str) else {
            return (schema, None);
        };
        let target = reference
            .strip_prefix('#')
            .and_then(|pointer| self.document.pointer(pointer));
        match target {
            Some(target) if target.is_object() => (target, Some(reference.to_string())),
            _ => {
                self.fragment
                    .warn(format!("'{path}': unresolved $ref '{reference}'"));
                (schema, None)
            }
        }
    }

    /// Add the concept for one schema node. `declared` is the schema as
    /// written, `resolved` the schema after `$ref` resolution.
    fn add_node(
        &mut self,
        path: &str,
        name: &str,
        declared: &Value,
        resolved: &Value,
        required: bool,
        parent: Option<&ConceptId>,
    ) -> Result<ConceptId> {
        let text = |key: &str| {
            declared
                .get(key)
                .or_else(|| resolved.get(key))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };
        let label = text("title").unwrap_or(name);
        let mut concept = self
            .fragment
            .concept(path, label)
            .with_kind(ConceptKind::Field)
            .with_notation(path);
        if let Some(description) = text("description") {
            concept = concept.with_definition(description);
        }
        if let Some(kind) = type_note(declared.get("type").or_else(|| resolved.get("type"))) {
            concept = concept.with_note("type", kind);
        }
        if let Some(format) = text("format") {
            concept = concept.with_note("format", format);
        }
        if let Some(values) = resolved.get("enum").and_then(Value::as_array) {
            concept = concept.with_note("enum", join_values(values));
        }
        if let Some(reference) = declared.get("$ref").and_then(Value::as_str) {
            concept = concept.with_note("ref", reference);
        }
        if required {
            concept = concept.with_note("required", "true");
        }

        let id = concept.id.clone();
        self.input.add(&mut self.fragment, concept)?;
        if let Some(parent) = parent {
            self.fragment
                .add_relation(id.clone(), Predicate::Broader, parent.clone());
        }
        Ok(id)
    }
}

/// Escape the characters that structure a path so every property gets a
/// distinct key
fn path_segment(name: &str) -> Cow<'_, str> {
    if !name.contains(['.', '[', ']', '%']) {
        return Cow::Borrowed(name);
    }
    let mut escaped = String::with_capacity(name.len() + 6);
    for c in name.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '.' => escaped.push_str("%2E"),
            '[' => escaped.push_str("%5B"),
            ']' => escaped.push_str("%5D"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

fn type_note(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Array(types) => Some(join_values(types)),
        _ => None,
    }
}

fn join_values(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ufsa_model::SemanticRelation;
    use ufsa_registry::SourceDescriptor;

    fn parse(descriptor: &SourceDescriptor, content: &str) -> Result<GraphFragment> {
        StructuredSchemaParser.parse(&SourceInput::new(descriptor, content))
    }

    fn broader(child: &str, parent: &str) -> SemanticRelation {
        SemanticRelation::new(child.into(), Predicate::Broader, parent.into())
    }

    const ACCOUNT: &str = r#"{
        "title": "Account",
        "type": "object",
        "required": ["id"],
        "properties": {
            "id": {"type": "string", "description": "Account identifier"},
            "owner": {
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "email": {"type": "string", "format": "email"}
                }
            },
            "tags": {"type": "array", "items": {"type": "string"}}
        }
    }"#;

    #[test]
    fn test_nested_properties_link_to_parent_field() {
        let d = SourceDescriptor::new("acct", "json-schema", "a.json", "urn:acct");
        let fragment = parse(&d, ACCOUNT).unwrap();

        let relations: Vec<_> = fragment.relations().cloned().collect();
        assert!(relations.contains(&broader("acct:Account.id", "acct:Account")));
        assert!(relations.contains(&broader("acct:Account.owner", "acct:Account")));
        assert!(relations.contains(&broader("acct:Account.owner.name", "acct:Account.owner")));
        assert!(!relations.contains(&broader("acct:Account.owner.name", "acct:Account")));
        assert!(relations.contains(&broader("acct:Account.tags[]", "acct:Account.tags")));

        let id = fragment.get(&"acct:Account.id".into()).unwrap();
        assert_eq!(id.definition.as_deref(), Some("Account identifier"));
        assert_eq!(id.notes.get("required").map(String::as_str), Some("true"));
        let email = fragment.get(&"acct:Account.owner.email".into()).unwrap();
        assert_eq!(email.notes.get("format").map(String::as_str), Some("email"));
        assert_eq!(email.notation.as_deref(), Some("Account.owner.email"));
    }

    #[test]
    fn test_untitled_root_uses_source_id() {
        let d = SourceDescriptor::new("acct", "json-schema", "a.json", "urn:acct");
        let fragment = parse(&d, r#"{"properties": {"a": {"type": "integer"}}}"#).unwrap();
        assert!(fragment.contains(&"acct:acct".into()));
        assert!(fragment.contains(&"acct:acct.a".into()));
    }

    #[test]
    fn test_selected_definition_with_recursive_ref() {
        let schema = r##"{
            "$defs": {
                "Node": {
                    "properties": {
                        "label": {"type": "string"},
                        "children": {"type": "array", "items": {"$ref": "#/$defs/Node"}},
                        "parent": {"$ref": "#/$defs/Node"}
                    }
                }
            }
        }"##;
        let d = SourceDescriptor::new("tree", "json-schema", "t.json", "urn:tree")
            .with_metadata("definition", "Node");
        let fragment = parse(&d, schema).unwrap();

        assert!(fragment.contains(&"tree:Node.children[]".into()));
        assert!(fragment.contains(&"tree:Node.children[].label".into()));
        assert!(fragment.contains(&"tree:Node.parent.label".into()));
        assert!(!fragment.contains(&"tree:Node.parent.parent.label".into()));
        assert!(!fragment.warnings().is_empty());
    }

    #[test]
    fn test_dotted_property_name_does_not_collide_with_nesting() {
        let schema = r#"{
            "title": "Doc",
            "properties": {
                "a.b": {"type": "string", "description": "flat"},
                "a": {"type": "object", "properties": {"b": {"type": "integer"}}},
                "c[]": {"type": "string"},
                "c": {"type": "array", "items": {"type": "string"}}
            }
        }"#;
        let d = SourceDescriptor::new("doc", "json-schema", "d.json", "urn:doc");
        let fragment = parse(&d, schema).unwrap();

        assert_eq!(fragment.concept_count(), 7);
        let flat = fragment.get(&"doc:Doc.a%2Eb".into()).unwrap();
        assert_eq!(flat.pref_label, "a.b");
        assert_eq!(flat.definition.as_deref(), Some("flat"));
        assert!(fragment.contains(&"doc:Doc.a.b".into()));
        assert!(fragment.contains(&"doc:Doc.c%5B%5D".into()));
        assert!(fragment.contains(&"doc:Doc.c[]".into()));
        assert!(
            fragment
                .relations()
                .any(|r| *r == broader("doc:Doc.a%2Eb", "doc:Doc"))
        );
    }

    #[test]
    fn test_missing_definition_is_contract_error() {
        let d = SourceDescriptor::new("tree", "json-schema", "t.json", "urn:tree")
            .with_metadata("definition", "Missing");
        let err = parse(&d, "{}").unwrap_err();
        assert!(matches!(err, Error::Contract { .. }));
    }

    #[test]
    fn test_malformed_json_is_syntax_error() {
        let d = SourceDescriptor::new("bad", "json-schema", "b.json", "urn:bad");
        let err = parse(&d, "{\n  \"properties\": ").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 2, .. }));
    }
}
