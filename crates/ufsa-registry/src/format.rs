//! Declared source formats and parser selection

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of source formats the engine can parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// JSON-Schema-like structured definitions
    StructuredSchema,
    /// Delimited tables, one row per concept
    Tabular,
    /// SKOS vocabularies in RDF/XML or N-Triples
    RdfVocabulary,
    /// CycloneDX software bill of materials
    Sbom,
    /// SQL data-definition scripts
    SqlDdl,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 5] = [
        Self::StructuredSchema,
        Self::Tabular,
        Self::RdfVocabulary,
        Self::Sbom,
        Self::SqlDdl,
    ];

    /// Stable name used in logs and summaries
    pub fn name(self) -> &'static str {
        match self {
            Self::StructuredSchema => "structured_schema",
            Self::Tabular => "tabular",
            Self::RdfVocabulary => "rdf_vocabulary",
            Self::Sbom => "sbom",
            Self::SqlDdl => "sql_ddl",
        }
    }

    /// Resolve a parser-selection tag such as `csv`, `fields_csv` or a
    /// dotted module path ending in `parser_cyclonedx`
    pub fn from_parser_tag(tag: &str) -> Option<Self> {
        match parser_tag_stem(tag).as_str() {
            "json_schema" | "jsonschema" | "structured_schema" | "schema" => {
                Some(Self::StructuredSchema)
            }
            "csv" | "fields_csv" | "iana_csv" | "tabular" | "codes" | "fields" | "media_types" => {
                Some(Self::Tabular)
            }
            "rdf" | "skos" | "rdf_vocabulary" => Some(Self::RdfVocabulary),
            "cyclonedx" | "sbom" => Some(Self::Sbom),
            "ast_sql" | "sql" | "sql_ddl" | "ddl" => Some(Self::SqlDdl),
            _ => None,
        }
    }

    /// Resolve a declared data-format tag
    pub fn from_data_format(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "json-schema" | "jsonschema" | "structured-schema" => Some(Self::StructuredSchema),
            "csv" | "tsv" | "tabular" => Some(Self::Tabular),
            "rdf" | "rdf/xml" | "rdfxml" | "rdf-xml" | "xml" | "nt" | "ntriples" | "n-triples"
            | "skos" => Some(Self::RdfVocabulary),
            "cyclonedx" | "cyclonedx-json" | "sbom" => Some(Self::Sbom),
            "sql" | "ddl" | "sql-ddl" => Some(Self::SqlDdl),
            _ => None,
        }
    }

    /// Parser tag wins over data format; neither recognized yields `None`
    pub fn resolve(parser_tag: &str, data_format: &str) -> Option<Self> {
        Self::from_parser_tag(parser_tag).or_else(|| Self::from_data_format(data_format))
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalize a parser tag to its stem.
///
/// `ufsa_v2.parsers.parser_ast_sql` → `ast_sql`, `Fields-CSV` → `fields_csv`.
pub fn parser_tag_stem(tag: &str) -> String {
    let last = tag
        .trim()
        .rsplit(['.', '/', ':'])
        .find(|s| !s.is_empty())
        .unwrap_or("");
    let lower = last.to_ascii_lowercase().replace('-', "_");
    let stem = lower.strip_prefix("parser_").unwrap_or(&lower);
    let stem = stem.strip_suffix("_parser").unwrap_or(stem);
    stem.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_tag_stem() {
        assert_eq!(parser_tag_stem("ufsa_v2.parsers.parser_ast_sql"), "ast_sql");
        assert_eq!(parser_tag_stem("ufsa_v2.parsers.csv_parser"), "csv");
        assert_eq!(parser_tag_stem("Fields-CSV"), "fields_csv");
        assert_eq!(parser_tag_stem(""), "");
    }

    #[test]
    fn test_parser_tag_takes_precedence() {
        assert_eq!(
            SourceFormat::resolve("ufsa_v2.parsers.parser_cyclonedx", "json"),
            Some(SourceFormat::Sbom)
        );
        assert_eq!(
            SourceFormat::resolve("", "json-schema"),
            Some(SourceFormat::StructuredSchema)
        );
    }

    #[test]
    fn test_unknown_tags_do_not_resolve() {
        assert_eq!(SourceFormat::resolve("yaml_magic", "json"), None);
    }

    #[test]
    fn test_all_variants_named_uniquely() {
        let names: std::collections::BTreeSet<_> = SourceFormat::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(names.len(), SourceFormat::ALL.len());
    }
}
