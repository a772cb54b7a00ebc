//! Integration test: candidate mappings over a merged multi-source graph

use ufsa_mapping::{CandidateConfig, CandidateGenerator};
use ufsa_model::{CanonicalGraph, ConceptScheme, GraphFragment, Predicate};

fn code_list(id: &str, rows: &[(&str, &str)]) -> anyhow::Result<GraphFragment> {
    let mut fragment = GraphFragment::new(ConceptScheme::new(id, id, format!("http://ufsa.org/v2/standards/{id}")));
    for (label, code) in rows {
        let concept = fragment.concept(code, *label).with_notation(*code);
        fragment.add_concept(concept)?;
    }
    Ok(fragment)
}

fn build_graph() -> anyhow::Result<CanonicalGraph> {
    let mut graph = CanonicalGraph::new();
    graph.merge(code_list("countries_en", &[("United States", "US")])?)?;
    graph.merge(code_list("countries_de", &[("Vereinigte Staaten", "US")])?)?;
    graph.merge(code_list("issuers", &[("Apple Inc.", "AAPL")])?)?;
    graph.merge(code_list("lei_names", &[("APPLE INC.", "HWUPKR0MPOU8FGXBT394")])?)?;
    Ok(graph)
}

#[test]
fn test_one_candidate_for_matching_labels_only() -> anyhow::Result<()> {
    let graph = build_graph()?;
    let candidates = CandidateGenerator::default().generate(&graph);

    assert_eq!(candidates.len(), 1);
    let mapping = &candidates[0];
    assert_eq!(mapping.from_value, "issuers:AAPL");
    assert_eq!(mapping.to_concept_id.as_str(), "lei_names:HWUPKR0MPOU8FGXBT394");
    assert!(!mapping.is_curated());
    Ok(())
}

#[test]
fn test_generation_is_stable_across_runs() -> anyhow::Result<()> {
    let generator = CandidateGenerator::new(CandidateConfig::new("skos:closeMatch", 1)?);
    let first = generator.generate(&build_graph()?);
    let second = generator.generate(&build_graph()?);
    assert_eq!(first, second);
    assert!(first.iter().all(|m| m.relation == Predicate::CloseMatch));
    Ok(())
}
