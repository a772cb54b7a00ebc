//! RDF vocabulary (SKOS) parser
//!
//! The document is first read into plain triples, from RDF/XML or
//! N-Triples, then every `skos:Concept` subject with a label becomes a
//! concept. SKOS hierarchical, associative and mapping relations are kept;
//! an object outside the document is kept as its bare IRI.

mod ntriples;
mod xml;

use crate::{FormatParser, Result, SourceInput};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use ufsa_model::{ConceptId, GraphFragment, Predicate, URI_NOTE};
use ufsa_registry::SourceFormat;

pub(crate) const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
const SKOS_NS: &str = "http://www.w3.org/2004/02/skos/core#";

/// One RDF term
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Term {
    Iri(String),
    Blank(String),
    Literal { value: String, lang: Option<String> },
}

impl Term {
    /// Node key for IRIs and blank nodes
    fn node(&self) -> Option<&str> {
        match self {
            Self::Iri(iri) | Self::Blank(iri) => Some(iri),
            Self::Literal { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Triple {
    /// IRI or `_:label`
    pub subject: String,
    pub predicate: String,
    pub object: Term,
}

/// Concrete syntax of an RDF document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfSyntax {
    RdfXml,
    NTriples,
}

impl RdfSyntax {
    /// Pick the syntax from `syntax` metadata, the declared format, the
    /// file extension and finally the content
    pub fn detect(input: &SourceInput<'_>) -> Self {
        let descriptor = input.descriptor;
        let hint = descriptor
            .metadata("syntax")
            .unwrap_or(&descriptor.data_format)
            .to_ascii_lowercase();
        match hint.as_str() {
            "nt" | "ntriples" | "n-triples" => return Self::NTriples,
            "xml" | "rdf/xml" | "rdfxml" | "rdf-xml" => return Self::RdfXml,
            _ => {}
        }
        let file = descriptor.file_name().to_ascii_lowercase();
        if file.ends_with(".nt") {
            return Self::NTriples;
        }
        if file.ends_with(".rdf") || file.ends_with(".xml") || file.ends_with(".owl") {
            return Self::RdfXml;
        }
        let head = input.content.trim_start_matches('\u{feff}').trim_start();
        if head.starts_with("<?xml") || head.starts_with("<rdf:RDF") || head.starts_with("<!--") {
            Self::RdfXml
        } else {
            Self::NTriples
        }
    }
}

/// Parser for SKOS vocabularies
#[derive(Debug, Default, Clone, Copy)]
pub struct RdfVocabularyParser;

impl FormatParser for RdfVocabularyParser {
    fn format(&self) -> SourceFormat {
        SourceFormat::RdfVocabulary
    }

    fn parse(&self, input: &SourceInput<'_>) -> Result<GraphFragment> {
        let syntax = RdfSyntax::detect(input);
        let triples = match syntax {
            RdfSyntax::RdfXml => xml::parse(input)?,
            RdfSyntax::NTriples => ntriples::parse(input)?,
        };
        let fragment = extract(input, &triples)?;
        debug!(
            source = input.source_id(),
            ?syntax,
            triples = triples.len(),
            concepts = fragment.concept_count(),
            "Parsed RDF vocabulary"
        );
        Ok(fragment)
    }
}

#[derive(Default)]
struct Description<'t> {
    pref_labels: Vec<(&'t str, Option<&'t str>)>,
    rdfs_labels: Vec<(&'t str, Option<&'t str>)>,
    definitions: Vec<(&'t str, Option<&'t str>)>,
    notations: Vec<&'t str>,
    alt_labels: Vec<&'t str>,
}

fn extract(input: &SourceInput<'_>, triples: &[Triple]) -> Result<GraphFragment> {
    let concept_type = format!("{SKOS_NS}Concept");
    let rdf_type = format!("{RDF_NS}type");
    let subjects: BTreeSet<&str> = triples
        .iter()
        .filter(|t| t.predicate == rdf_type && matches!(&t.object, Term::Iri(iri) if *iri == concept_type))
        .map(|t| t.subject.as_str())
        .collect();

    let mut descriptions: BTreeMap<&str, Description<'_>> = BTreeMap::new();
    for triple in triples {
        if !subjects.contains(triple.subject.as_str()) {
            continue;
        }
        let Term::Literal { value, lang } = &triple.object else {
            continue;
        };
        let entry = descriptions.entry(triple.subject.as_str()).or_default();
        let literal = (value.as_str(), lang.as_deref());
        match triple.predicate.strip_prefix(SKOS_NS) {
            Some("prefLabel") => entry.pref_labels.push(literal),
            Some("definition") => entry.definitions.push(literal),
            Some("notation") => entry.notations.push(value),
            Some("altLabel") => entry.alt_labels.push(value),
            _ if triple.predicate == RDFS_LABEL => entry.rdfs_labels.push(literal),
            _ => {}
        }
    }

    let mut fragment = input.fragment();
    let mut accepted: BTreeSet<&str> = BTreeSet::new();
    for subject in &subjects {
        let description = descriptions.remove(subject).unwrap_or_default();
        let label = preferred(&description.pref_labels).or_else(|| preferred(&description.rdfs_labels));
        let Some(label) = label else {
            fragment.warn(format!("concept <{subject}> has no label, skipped"));
            continue;
        };
        let concept = fragment
            .concept(subject, label)
            .with_definition(preferred(&description.definitions).unwrap_or_default())
            .with_notation(description.notations.join(";"))
            .with_note("alt_labels", description.alt_labels.join(";"))
            .with_note(URI_NOTE, *subject);
        input.add(&mut fragment, concept)?;
        accepted.insert(*subject);
    }

    for triple in triples {
        if !accepted.contains(triple.subject.as_str()) {
            continue;
        }
        let Some(predicate) = Predicate::from_iri(&triple.predicate) else {
            continue;
        };
        let Some(object) = triple.object.node() else {
            fragment.warn(format!(
                "<{}> {predicate} has a literal object, ignored",
                triple.subject
            ));
            continue;
        };
        // Objects outside this document stay as bare IRIs until the graph
        // resolves them against concepts carrying a matching `uri` note
        let object_id = if accepted.contains(object) {
            fragment.concept_id(object)
        } else {
            ConceptId::new(object)
        };
        fragment.add_relation(fragment.concept_id(&triple.subject), predicate, object_id);
    }
    Ok(fragment)
}

/// Untagged or English literal first, otherwise the first one seen
fn preferred<'t>(literals: &[(&'t str, Option<&'t str>)]) -> Option<&'t str> {
    let usable = || literals.iter().filter(|(value, _)| !value.trim().is_empty());
    usable()
        .find(|(_, lang)| lang.is_none_or(|l| l.eq_ignore_ascii_case("en") || l.to_ascii_lowercase().starts_with("en-")))
        .or_else(|| usable().next())
        .map(|(value, _)| value.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ufsa_model::SemanticRelation;
    use ufsa_registry::SourceDescriptor;

    const NT: &str = r#"
<http://ex.org/c/1> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/2004/02/skos/core#Concept> .
<http://ex.org/c/1> <http://www.w3.org/2004/02/skos/core#prefLabel> "Equity"@en .
<http://ex.org/c/1> <http://www.w3.org/2004/02/skos/core#prefLabel> "Action"@fr .
<http://ex.org/c/1> <http://www.w3.org/2004/02/skos/core#notation> "EQ" .
<http://ex.org/c/1> <http://www.w3.org/2004/02/skos/core#exactMatch> <http://other.org/equity> .
<http://ex.org/c/2> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/2004/02/skos/core#Concept> .
<http://ex.org/c/2> <http://www.w3.org/2000/01/rdf-schema#label> "Common share" .
<http://ex.org/c/2> <http://www.w3.org/2004/02/skos/core#broader> <http://ex.org/c/1> .
<http://ex.org/c/3> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/2004/02/skos/core#Concept> .
"#;

    fn parse(location: &str, content: &str) -> Result<GraphFragment> {
        let d = SourceDescriptor::new("fibo", "rdf", location, "urn:fibo");
        RdfVocabularyParser.parse(&SourceInput::new(&d, content))
    }

    #[test]
    fn test_ntriples_concepts_and_relations() {
        let fragment = parse("vocab.nt", NT).unwrap();
        assert_eq!(fragment.concept_count(), 2);

        let equity = fragment.get(&"fibo:http://ex.org/c/1".into()).unwrap();
        assert_eq!(equity.pref_label, "Equity");
        assert_eq!(equity.notation.as_deref(), Some("EQ"));

        let relations: Vec<_> = fragment.relations().cloned().collect();
        assert!(relations.contains(&SemanticRelation::new(
            "fibo:http://ex.org/c/2".into(),
            Predicate::Broader,
            "fibo:http://ex.org/c/1".into(),
        )));
        assert!(relations.contains(&SemanticRelation::new(
            "fibo:http://ex.org/c/1".into(),
            Predicate::ExactMatch,
            "http://other.org/equity".into(),
        )));
        assert_eq!(fragment.warnings().len(), 1);
    }

    #[test]
    fn test_rdf_xml_matches_ntriples() {
        let xml = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#"
         xmlns:skos="http://www.w3.org/2004/02/skos/core#">
  <skos:Concept rdf:about="http://ex.org/c/1">
    <skos:prefLabel xml:lang="en">Equity</skos:prefLabel>
    <skos:prefLabel xml:lang="fr">Action</skos:prefLabel>
    <skos:notation>EQ</skos:notation>
    <skos:exactMatch rdf:resource="http://other.org/equity"/>
  </skos:Concept>
  <rdf:Description rdf:about="http://ex.org/c/2">
    <rdf:type rdf:resource="http://www.w3.org/2004/02/skos/core#Concept"/>
    <rdfs:label>Common share</rdfs:label>
    <skos:broader rdf:resource="http://ex.org/c/1"/>
  </rdf:Description>
  <skos:Concept rdf:about="http://ex.org/c/3"/>
</rdf:RDF>"#;
        let from_xml = parse("vocab.rdf", xml).unwrap();
        let from_nt = parse("vocab.nt", NT).unwrap();
        assert_eq!(
            from_xml.concepts().collect::<Vec<_>>(),
            from_nt.concepts().collect::<Vec<_>>()
        );
        assert_eq!(
            from_xml.relations().collect::<Vec<_>>(),
            from_nt.relations().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_outside_objects_stay_bare_iris() {
        let nt = r#"
<http://ex.org/c/9> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://www.w3.org/2004/02/skos/core#Concept> .
<http://ex.org/c/9> <http://www.w3.org/2004/02/skos/core#prefLabel> "Bond" .
<http://ex.org/c/9> <http://www.w3.org/2004/02/skos/core#broader> <http://other.org/instrument> .
"#;
        let fragment = parse("vocab.nt", nt).unwrap();
        let bond = fragment.get(&"fibo:http://ex.org/c/9".into()).unwrap();
        assert_eq!(bond.notes.get(URI_NOTE).map(String::as_str), Some("http://ex.org/c/9"));
        let relations: Vec<_> = fragment.relations().cloned().collect();
        assert_eq!(
            relations,
            vec![SemanticRelation::new(
                "fibo:http://ex.org/c/9".into(),
                Predicate::Broader,
                "http://other.org/instrument".into(),
            )]
        );
    }

    #[test]
    fn test_syntax_detection() {
        let d = SourceDescriptor::new("v", "rdf", "fixtures://v/vocab", "urn:v");
        let input = SourceInput::new(&d, "<?xml version=\"1.0\"?><rdf:RDF/>");
        assert_eq!(RdfSyntax::detect(&input), RdfSyntax::RdfXml);

        let d = d.with_metadata("syntax", "ntriples");
        let input = SourceInput::new(&d, "<?xml version=\"1.0\"?>");
        assert_eq!(RdfSyntax::detect(&input), RdfSyntax::NTriples);
    }
}
