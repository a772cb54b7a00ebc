//! Integration test: registry-declared formats routed to their parsers
//!
//! Each source is resolved from its parser tag or data format, parsed, and
//! merged into one canonical graph.

use ufsa_model::{CanonicalGraph, ConceptId, ConceptKind, Predicate};
use ufsa_parsers::{Error, SourceInput, parse_source};
use ufsa_registry::SourceDescriptor;

fn parse(descriptor: &SourceDescriptor, content: &str) -> Result<ufsa_model::GraphFragment, Error> {
    let format = descriptor.format().expect("format resolves");
    parse_source(format, &SourceInput::new(descriptor, content))
}

#[test]
fn test_five_formats_merge_into_one_graph() -> anyhow::Result<()> {
    let sources = [
        (
            SourceDescriptor::new("iso_3166_1_a2", "csv", "fixtures://iso.csv", "urn:ufsa:iso_3166_1_a2")
                .with_parser_tag("ufsa_v2.parsers.csv_parser"),
            "name,code\nUnited States,US\n",
        ),
        (
            SourceDescriptor::new("acct", "json-schema", "fixtures://acct.json", "urn:ufsa:acct"),
            r#"{"title": "Account", "properties": {"country": {"type": "string"}}}"#,
        ),
        (
            SourceDescriptor::new("geo", "rdf", "fixtures://geo.nt", "urn:ufsa:geo"),
            concat!(
                "<http://ex.org/us> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ",
                "<http://www.w3.org/2004/02/skos/core#Concept> .\n",
                "<http://ex.org/us> <http://www.w3.org/2004/02/skos/core#prefLabel> \"United States\" .\n",
            ),
        ),
        (
            SourceDescriptor::new("shop_sbom", "json", "fixtures://bom.json", "urn:ufsa:sbom/shop")
                .with_parser_tag("parser_cyclonedx"),
            r#"{"bomFormat": "CycloneDX", "components": [{"name": "serde", "version": "1.0"}]}"#,
        ),
        (
            SourceDescriptor::new("shop_db", "sql", "fixtures://schema.sql", "urn:ufsa:ast/shop"),
            "CREATE TABLE users (user_id INT PRIMARY KEY);",
        ),
    ];

    let mut graph = CanonicalGraph::new();
    for (descriptor, content) in &sources {
        graph.merge(parse(descriptor, content)?)?;
    }

    assert_eq!(graph.schemes().count(), 5);
    assert_eq!(graph.concept_count(), 1 + 2 + 1 + 1 + 2);
    assert!(graph.contains_concept(&ConceptId::new("iso_3166_1_a2:US")));
    assert!(graph.contains_concept(&ConceptId::new("geo:http://ex.org/us")));

    let component = graph
        .concept(&ConceptId::new("shop_sbom:serde@1.0"))
        .expect("component parsed");
    assert!(matches!(component.kind, ConceptKind::Component(_)));

    assert!(graph.relations().any(|r| r.subject.as_str() == "acct:Account.country"
        && r.predicate == Predicate::Broader
        && r.object.as_str() == "acct:Account"));
    Ok(())
}

#[test]
fn test_failed_parse_leaves_no_fragment() {
    let descriptor = SourceDescriptor::new("broken", "json-schema", "b.json", "urn:ufsa:broken");
    let err = parse(&descriptor, "{ not json").unwrap_err();
    assert!(err.to_string().contains("broken"));
}

#[test]
fn test_parsing_is_deterministic() -> anyhow::Result<()> {
    let descriptor = SourceDescriptor::new("shop_db", "sql", "schema.sql", "urn:ufsa:ast/shop");
    let ddl = "CREATE TABLE users (user_id INT PRIMARY KEY, email TEXT);
               CREATE TABLE orders (order_id INT, user_id INT REFERENCES users(user_id));";
    let first = parse(&descriptor, ddl)?;
    let second = parse(&descriptor, ddl)?;
    assert_eq!(first, second);
    Ok(())
}
