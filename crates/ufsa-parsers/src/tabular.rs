//! Tabular (delimited text) parser
//!
//! One concept per row. A profile names the label, code and definition
//! columns; descriptor metadata can override any of them.

use crate::{Error, FormatParser, Result, SourceInput};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;
use ufsa_model::{ConceptKind, GraphFragment};
use ufsa_registry::{SourceFormat, parser_tag_stem};

/// How the local key of a row is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRule {
    /// Code column value, with separators normalized
    Code,
    /// Slug of the label column
    LabelSlug,
}

/// Column contract for one kind of tabular source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularProfile {
    pub name_column: String,
    pub code_column: String,
    pub definition_column: Option<String>,
    pub key: KeyRule,
    pub kind: ConceptKind,
    /// Keep the code as the concept notation
    pub code_as_notation: bool,
}

impl TabularProfile {
    /// Code lists: `name`, `code`, optional `description`
    pub fn codes() -> Self {
        Self {
            name_column: "name".to_string(),
            code_column: "code".to_string(),
            definition_column: Some("description".to_string()),
            key: KeyRule::Code,
            kind: ConceptKind::Term,
            code_as_notation: true,
        }
    }

    /// Field dictionaries: `Name`, `Description`; keys are label slugs
    pub fn fields() -> Self {
        Self {
            name_column: "name".to_string(),
            code_column: "name".to_string(),
            definition_column: Some("description".to_string()),
            key: KeyRule::LabelSlug,
            kind: ConceptKind::Field,
            code_as_notation: false,
        }
    }

    /// Media-type registries: `Name`, `Template`
    pub fn media_types() -> Self {
        Self {
            name_column: "name".to_string(),
            code_column: "template".to_string(),
            definition_column: None,
            key: KeyRule::Code,
            kind: ConceptKind::Term,
            code_as_notation: true,
        }
    }

    /// Pick the profile for a source from its `profile` metadata or parser
    /// tag, then apply column overrides from metadata
    pub fn for_source(input: &SourceInput<'_>) -> Self {
        let descriptor = input.descriptor;
        let named = descriptor
            .metadata("profile")
            .map(|p| p.to_ascii_lowercase())
            .unwrap_or_else(|| parser_tag_stem(&descriptor.parser_tag));
        let mut profile = match named.as_str() {
            "fields" | "fields_csv" => Self::fields(),
            "media_types" | "iana" | "iana_csv" => Self::media_types(),
            _ => Self::codes(),
        };
        if let Some(column) = descriptor.metadata("name_column") {
            profile.name_column = column.to_string();
        }
        if let Some(column) = descriptor.metadata("code_column") {
            profile.code_column = column.to_string();
        }
        if let Some(column) = descriptor.metadata("definition_column") {
            profile.definition_column = Some(column.to_string());
        }
        profile
    }
}

/// Parser for delimited tables
#[derive(Debug, Default, Clone, Copy)]
pub struct TabularParser;

impl FormatParser for TabularParser {
    fn format(&self) -> SourceFormat {
        SourceFormat::Tabular
    }

    fn parse(&self, input: &SourceInput<'_>) -> Result<GraphFragment> {
        let profile = TabularProfile::for_source(input);
        let delimiter = delimiter(input)?;
        let source_id = input.source_id();

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(input.content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| Error::syntax(source_id, 1, e.to_string()))?
            .clone();
        let columns = Columns::locate(&headers, &profile)
            .map_err(|message| Error::contract(source_id, SourceFormat::Tabular, message))?;

        let mut fragment = input.fragment();
        for (index, record) in reader.records().enumerate() {
            let line = index + 2;
            let record = record.map_err(|e| {
                let line = e.position().map_or(line, |p| p.line() as usize);
                Error::syntax(source_id, line, e.to_string())
            })?;
            if record.iter().all(str::is_empty) {
                continue;
            }

            let code = record.get(columns.code).unwrap_or_default();
            let name = record.get(columns.name).unwrap_or_default();
            if code.is_empty() {
                fragment.warn(format!("row {line}: missing '{}' value, skipped", profile.code_column));
                continue;
            }
            let key = match profile.key {
                KeyRule::Code => normalize_code(code),
                KeyRule::LabelSlug => slugify(code),
            };
            let label = if name.is_empty() { code } else { name };

            let mut concept = fragment.concept(&key, label).with_kind(profile.kind.clone());
            if profile.code_as_notation {
                concept = concept.with_notation(code);
            }
            if let Some(definition) = columns.definition.and_then(|i| record.get(i)) {
                concept = concept.with_definition(definition);
            }
            for (i, header) in headers.iter().enumerate() {
                if columns.is_mapped(i) {
                    continue;
                }
                if let Some(value) = record.get(i) {
                    concept = concept.with_note(header.to_ascii_lowercase(), value);
                }
            }
            input.add_or_warn(&mut fragment, concept, &format!("row {line}"))?;
        }

        debug!(
            source = source_id,
            concepts = fragment.concept_count(),
            "Parsed tabular source"
        );
        Ok(fragment)
    }
}

/// Header positions of the profile's columns
struct Columns {
    name: usize,
    code: usize,
    definition: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord, profile: &TabularProfile) -> std::result::Result<Self, String> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(column))
        };
        let missing = |column: &str| format!("required column '{column}' not found in header");
        Ok(Self {
            name: find(&profile.name_column).ok_or_else(|| missing(&profile.name_column))?,
            code: find(&profile.code_column).ok_or_else(|| missing(&profile.code_column))?,
            definition: profile.definition_column.as_deref().and_then(find),
        })
    }

    fn is_mapped(&self, index: usize) -> bool {
        index == self.name || index == self.code || Some(index) == self.definition
    }
}

fn delimiter(input: &SourceInput<'_>) -> Result<u8> {
    let descriptor = input.descriptor;
    if let Some(raw) = descriptor.metadata("delimiter") {
        let raw = if raw == "\\t" || raw.eq_ignore_ascii_case("tab") { "\t" } else { raw };
        return match raw.as_bytes() {
            [byte] => Ok(*byte),
            _ => Err(Error::contract(
                input.source_id(),
                SourceFormat::Tabular,
                format!("delimiter must be a single byte, got '{raw}'"),
            )),
        };
    }
    let tab_separated = descriptor.data_format.eq_ignore_ascii_case("tsv")
        || descriptor.file_name().to_ascii_lowercase().ends_with(".tsv");
    Ok(if tab_separated { b'\t' } else { b',' })
}

/// Codes keep their text; path and space separators become underscores
fn normalize_code(code: &str) -> String {
    code.chars()
        .map(|c| if matches!(c, '/' | '+' | ' ') { '_' } else { c })
        .collect()
}

/// Lowercase ASCII slug; runs of other characters collapse to one underscore
fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_separator = false;
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    if slug.is_empty() {
        "field".to_string()
    } else {
        slug
    }
}
