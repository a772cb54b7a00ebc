//! # ufsa-parsers
//!
//! One parser per source format. Every parser consumes a raw document plus
//! its [`SourceDescriptor`] and returns a self-contained [`GraphFragment`]
//! for the descriptor's concept scheme.
//!
//! ```rust
//! use ufsa_parsers::{SourceInput, parse_source};
//! use ufsa_registry::{SourceDescriptor, SourceFormat};
//!
//! let descriptor = SourceDescriptor::new("iso", "csv", "iso.csv", "urn:iso");
//! let input = SourceInput::new(&descriptor, "name,code\nUnited States,US\n");
//! let fragment = parse_source(SourceFormat::Tabular, &input).unwrap();
//! assert_eq!(fragment.concept_count(), 1);
//! ```

pub mod rdf;
pub mod sbom;
pub mod sql_ddl;
pub mod structured_schema;
pub mod tabular;

pub use rdf::RdfVocabularyParser;
pub use sbom::SbomParser;
pub use sql_ddl::SqlDdlParser;
pub use structured_schema::StructuredSchemaParser;
pub use tabular::{KeyRule, TabularParser, TabularProfile};

use thiserror::Error;
use ufsa_model::{Concept, ConceptScheme, GraphFragment};
use ufsa_registry::{SourceDescriptor, SourceFormat};

/// Errors that abort the parse of a single source document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Syntax error in source '{source_id}' at line {line}: {message}")]
    Syntax {
        source_id: String,
        line: usize,
        message: String,
    },

    #[error("Source '{source_id}' does not satisfy the {format} input contract: {message}")]
    Contract {
        source_id: String,
        format: SourceFormat,
        message: String,
    },

    #[error("Integrity error in source '{source_id}': {error}")]
    Integrity {
        source_id: String,
        #[source]
        error: ufsa_model::Error,
    },
}

impl Error {
    /// Create a syntax error; `line` is 0 when unknown
    pub fn syntax(source_id: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            source_id: source_id.into(),
            line,
            message: message.into(),
        }
    }

    /// Create an input-contract error
    pub fn contract(
        source_id: impl Into<String>,
        format: SourceFormat,
        message: impl Into<String>,
    ) -> Self {
        Self::Contract {
            source_id: source_id.into(),
            format,
            message: message.into(),
        }
    }

    /// Wrap a graph integrity error
    pub fn integrity(source_id: impl Into<String>, error: ufsa_model::Error) -> Self {
        Self::Integrity {
            source_id: source_id.into(),
            error,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A raw source document together with its descriptor
#[derive(Debug, Clone, Copy)]
pub struct SourceInput<'a> {
    pub descriptor: &'a SourceDescriptor,
    pub content: &'a str,
}

impl<'a> SourceInput<'a> {
    pub fn new(descriptor: &'a SourceDescriptor, content: &'a str) -> Self {
        Self {
            descriptor,
            content,
        }
    }

    /// Source id (also the concept scheme id)
    pub fn source_id(&self) -> &'a str {
        &self.descriptor.id
    }

    /// Concept scheme described by the descriptor
    pub fn scheme(&self) -> ConceptScheme {
        let scheme = ConceptScheme::new(
            &self.descriptor.id,
            &self.descriptor.label,
            &self.descriptor.scheme_uri,
        );
        match &self.descriptor.governing_body {
            Some(body) => scheme.with_governing_body(body),
            None => scheme,
        }
    }

    /// Empty fragment for this source
    pub fn fragment(&self) -> GraphFragment {
        GraphFragment::new(self.scheme())
    }

    /// Add a concept, turning integrity failures into parse errors
    pub fn add(&self, fragment: &mut GraphFragment, concept: Concept) -> Result<bool> {
        fragment
            .add_concept(concept)
            .map_err(|e| Error::integrity(self.source_id(), e))
    }

    /// Add a concept; a conflicting duplicate is recorded as a warning and
    /// the first declaration is kept
    pub fn add_or_warn(&self, fragment: &mut GraphFragment, concept: Concept, context: &str) -> Result<bool> {
        let id = concept.id.clone();
        match fragment.add_concept(concept) {
            Ok(added) => Ok(added),
            Err(ufsa_model::Error::ConceptConflict { .. }) => {
                fragment.warn(format!("{context}: duplicate key for '{id}' skipped"));
                Ok(false)
            }
            Err(e) => Err(Error::integrity(self.source_id(), e)),
        }
    }
}

/// Parser for one source format
pub trait FormatParser {
    /// Format handled by this parser
    fn format(&self) -> SourceFormat;

    /// Parse one document into a fragment for its concept scheme
    fn parse(&self, input: &SourceInput<'_>) -> Result<GraphFragment>;
}

/// Parse a source with the parser registered for `format`
pub fn parse_source(format: SourceFormat, input: &SourceInput<'_>) -> Result<GraphFragment> {
    match format {
        SourceFormat::StructuredSchema => StructuredSchemaParser.parse(input),
        SourceFormat::Tabular => TabularParser.parse(input),
        SourceFormat::RdfVocabulary => RdfVocabularyParser.parse(input),
        SourceFormat::Sbom => SbomParser.parse(input),
        SourceFormat::SqlDdl => SqlDdlParser.parse(input),
    }
}
