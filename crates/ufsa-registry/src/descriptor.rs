//! Source descriptors
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

use crate::format::SourceFormat;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const FIXTURE_SCHEME: &str = "fixtures://";

/// One registry entry describing how to ingest a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Source id; also the owning concept scheme id
    pub id: String,
    /// Human label
    pub label: String,
    /// Governing body label
    pub governing_body: Option<String>,
    /// Local path, `fixtures://` reference or URL
    pub location: String,
    /// Declared data format tag
    pub data_format: String,
    /// Parser-selection tag
    pub parser_tag: String,
    /// Target concept scheme URI
    pub scheme_uri: String,
    /// Free-form parser options
    pub metadata: BTreeMap<String, String>,
}

/// Where a source document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// Relative path under the fixtures directory
    Fixture(String),
    /// Local filesystem path
    Path(PathBuf),
    /// Remote URL; fetching is not the engine's job
    Remote(String),
}

impl SourceDescriptor {
    /// Create a descriptor with the minimum required fields
    pub fn new(
        id: impl Into<String>,
        data_format: impl Into<String>,
        location: impl Into<String>,
        scheme_uri: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            governing_body: None,
            location: location.into(),
            data_format: data_format.into(),
            parser_tag: String::new(),
            scheme_uri: scheme_uri.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Set the display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the governing body
    pub fn with_governing_body(mut self, body: impl Into<String>) -> Self {
        self.governing_body = Some(body.into());
        self
    }

    /// Set the parser-selection tag
    pub fn with_parser_tag(mut self, tag: impl Into<String>) -> Self {
        self.parser_tag = tag.into();
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Metadata value for `key`, if present and non-blank
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Resolve the declared parser/format tags to a format
    pub fn format(&self) -> Result<SourceFormat> {
        SourceFormat::resolve(&self.parser_tag, &self.data_format).ok_or_else(|| {
            Error::UnknownFormat {
                source_id: self.id.clone(),
                parser_tag: self.parser_tag.clone(),
                data_format: self.data_format.clone(),
            }
        })
    }

    /// Classify the declared location
    pub fn source_location(&self) -> SourceLocation {
        SourceLocation::parse(&self.location)
    }

    /// Resolve the location to a readable local path
    pub fn resolve_path(&self, fixtures_dir: &Path, base_dir: &Path) -> Result<PathBuf> {
        match self.source_location() {
            SourceLocation::Fixture(rel) if rel.is_empty() => Err(Error::invalid_location(
                &self.id,
                &self.location,
                "empty fixture reference",
            )),
            SourceLocation::Fixture(rel) => Ok(fixtures_dir.join(rel)),
            SourceLocation::Path(path) if path.is_absolute() => Ok(path),
            SourceLocation::Path(path) => Ok(base_dir.join(path)),
            SourceLocation::Remote(url) => Err(Error::invalid_location(
                &self.id,
                url,
                "remote sources must be fetched before the run",
            )),
        }
    }

    /// Final path segment of the location, used for syntax sniffing
    pub fn file_name(&self) -> &str {
        self.location
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.location)
    }
}

impl SourceLocation {
    /// Classify a raw location string
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(rel) = raw.strip_prefix(FIXTURE_SCHEME) {
            Self::Fixture(rel.to_string())
        } else if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Remote(raw.to_string())
        } else {
            Self::Path(PathBuf::from(raw.strip_prefix("file://").unwrap_or(raw)))
        }
    }
}
