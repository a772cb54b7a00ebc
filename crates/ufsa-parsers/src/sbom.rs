//! Software bill of materials (CycloneDX JSON) parser
//!
//! Every component, including `metadata.component` and nested components,
//! becomes a software-component concept. Nested components are linked
//! `skos:broader` to their parent and `dependencies` become `skos:related`.

use crate::{Error, FormatParser, Result, SourceInput};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;
use ufsa_model::{ComponentInfo, ConceptId, ConceptKind, GraphFragment, Predicate};
use ufsa_registry::SourceFormat;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Bom {
    #[serde(default)]
    bom_format: Option<String>,
    #[serde(default)]
    metadata: Option<BomMetadata>,
    #[serde(default)]
    components: Vec<Component>,
    #[serde(default)]
    dependencies: Vec<Dependency>,
}

#[derive(Debug, Deserialize)]
struct BomMetadata {
    #[serde(default)]
    component: Option<Component>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Component {
    #[serde(rename = "bom-ref", default)]
    bom_ref: Option<String>,
    #[serde(rename = "type", default)]
    component_type: Option<String>,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    purl: Option<String>,
    #[serde(default)]
    licenses: Vec<LicenseChoice>,
    #[serde(default)]
    hashes: Vec<Hash>,
    #[serde(default)]
    external_references: Vec<ExternalReference>,
    #[serde(default)]
    components: Vec<Component>,
}

#[derive(Debug, Deserialize)]
struct LicenseChoice {
    #[serde(default)]
    license: Option<License>,
    #[serde(default)]
    expression: Option<String>,
}

#[derive(Debug, Deserialize)]
struct License {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Hash {
    alg: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ExternalReference {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Dependency {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(default)]
    depends_on: Vec<String>,
}

impl Component {
    /// Package identifier: purl, then bom-ref, then `name@version`
    fn identifier(&self) -> Option<String> {
        let non_blank = |s: &Option<String>| s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        non_blank(&self.purl)
            .or_else(|| non_blank(&self.bom_ref))
            .or_else(|| {
                let name = self.name.trim();
                if name.is_empty() {
                    return None;
                }
                Some(match non_blank(&self.version) {
                    Some(version) => format!("{name}@{version}"),
                    None => name.to_string(),
                })
            })
    }

    /// Strings other components may use to reference this one
    fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = [&self.bom_ref, &self.purl]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        if let Some(version) = &self.version {
            aliases.push(format!("{}@{version}", self.name));
        }
        aliases.push(self.name.clone());
        aliases
    }

    fn info(&self, identifier: &str) -> ComponentInfo {
        ComponentInfo {
            identifier: identifier.to_string(),
            name: self.name.clone(),
            version: self.version.clone().filter(|v| !v.trim().is_empty()),
            licenses: self
                .licenses
                .iter()
                .filter_map(|choice| {
                    choice
                        .license
                        .as_ref()
                        .and_then(|l| l.id.clone().or_else(|| l.name.clone()))
                        .or_else(|| choice.expression.clone())
                })
                .collect(),
            hashes: self
                .hashes
                .iter()
                .map(|h| format!("{}:{}", h.alg, h.content))
                .collect(),
            external_references: self
                .external_references
                .iter()
                .map(|r| r.url.clone())
                .filter(|u| !u.is_empty())
                .collect(),
        }
    }
}

/// Parser for CycloneDX JSON documents
#[derive(Debug, Default, Clone, Copy)]
pub struct SbomParser;

impl FormatParser for SbomParser {
    fn format(&self) -> SourceFormat {
        SourceFormat::Sbom
    }

    fn parse(&self, input: &SourceInput<'_>) -> Result<GraphFragment> {
        let source_id = input.source_id();
        let bom: Bom = serde_json::from_str(input.content)
            .map_err(|e| Error::syntax(source_id, e.line(), e.to_string()))?;

        let mut builder = Builder {
            input,
            fragment: input.fragment(),
            aliases: HashMap::new(),
        };
        if let Some(format) = bom.bom_format.as_deref().filter(|f| !f.eq_ignore_ascii_case("CycloneDX")) {
            builder.fragment.warn(format!("unexpected bomFormat '{format}'"));
        }

        if let Some(component) = bom.metadata.as_ref().and_then(|m| m.component.as_ref()) {
            builder.add_component(component, None, "metadata.component")?;
        }
        for (index, component) in bom.components.iter().enumerate() {
            builder.add_component(component, None, &format!("components[{index}]"))?;
        }

        for dependency in &bom.dependencies {
            let Some(subject) = builder.aliases.get(&dependency.reference).cloned() else {
                builder
                    .fragment
                    .warn(format!("dependency ref '{}' matches no component", dependency.reference));
                continue;
            };
            for target in &dependency.depends_on {
                match builder.aliases.get(target).cloned() {
                    Some(object) if object != subject => {
                        builder
                            .fragment
                            .add_relation(subject.clone(), Predicate::Related, object);
                    }
                    Some(_) => {}
                    None => builder
                        .fragment
                        .warn(format!("dependsOn '{target}' matches no component")),
                }
            }
        }

        let fragment = builder.fragment;
        debug!(
            source = source_id,
            components = fragment.concept_count(),
            relations = fragment.relation_count(),
            "Parsed bill of materials"
        );
        Ok(fragment)
    }
}

struct Builder<'a> {
    input: &'a SourceInput<'a>,
    fragment: GraphFragment,
    /// bom-ref, purl and name@version to concept id; first declaration wins
    aliases: HashMap<String, ConceptId>,
}

impl Builder<'_> {
    fn add_component(&mut self, component: &Component, parent: Option<&ConceptId>, context: &str) -> Result<()> {
        let id = match component.identifier() {
            Some(identifier) => {
                let label = if component.name.trim().is_empty() { identifier.as_str() } else { component.name.trim() };
                let mut concept = self
                    .fragment
                    .concept(&identifier, label)
                    .with_kind(ConceptKind::Component(component.info(&identifier)))
                    .with_note("type", component.component_type.clone().unwrap_or_default())
                    .with_note("group", component.group.clone().unwrap_or_default())
                    .with_note("bom_ref", component.bom_ref.clone().unwrap_or_default())
                    .with_note("purl", component.purl.clone().unwrap_or_default());
                if let Some(version) = &component.version {
                    concept = concept.with_notation(version);
                }
                if let Some(description) = &component.description {
                    concept = concept.with_definition(description);
                }
                let id = concept.id.clone();
                self.input.add_or_warn(&mut self.fragment, concept, context)?;
                for alias in component.aliases() {
                    if !alias.trim().is_empty() {
                        self.aliases.entry(alias).or_insert_with(|| id.clone());
                    }
                }
                if let Some(parent) = parent {
                    self.fragment
                        .add_relation(id.clone(), Predicate::Broader, parent.clone());
                }
                Some(id)
            }
            None => {
                self.fragment
                    .warn(format!("{context}: component without purl, bom-ref or name skipped"));
                None
            }
        };

        for (index, child) in component.components.iter().enumerate() {
            let context = format!("{context}.components[{index}]");
            self.add_component(child, id.as_ref().or(parent), &context)?;
        }
        Ok(())
    }
}
