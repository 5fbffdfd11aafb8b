use assert_matches::assert_matches;
use serde_json::json;

use isa_study_designer::config::StudyCreatorConfig;
use isa_study_designer::design::{
    AssayDeclaration, AssayGraph, ProductDeclaration, ProductNode, ProductType, ProtocolNode,
    SampleAndAssayPlan, generate_assay,
};
use isa_study_designer::error::IsaError;
use isa_study_designer::model::{Sample, SequentialIdGenerator};

fn sequencing_declaration() -> AssayDeclaration {
    AssayDeclaration::new("genome sequencing", "nucleic acid sequencing")
        .protocol_step("extraction", json!({"extraction method": ["phenol", "column"]}))
        .product_step("extract", vec![ProductDeclaration::new("extract", 1)])
        .protocol_step(
            "library sequencing",
            json!({"#replicates": 2, "library layout": ["single"]}),
        )
        .product_step(
            "raw file",
            vec![ProductDeclaration::new("data file", 1).with_extension("fastq")],
        )
}

fn sequencing_graph() -> AssayGraph {
    AssayGraph::from_declaration(&sequencing_declaration(), "AT0", None, None).unwrap()
}

#[test]
fn declaration_expands_layer_by_layer() {
    let graph = sequencing_graph();
    assert_eq!(graph.node_count(), 8);
    let starts: Vec<&str> = graph.start_nodes().iter().map(|node| node.id()).collect();
    assert_eq!(starts, ["extraction_000", "extraction_001"]);
    let ends: Vec<&str> = graph.end_nodes().iter().map(|node| node.id()).collect();
    assert_eq!(ends, ["raw_file_000_000", "raw_file_000_001"]);
    assert_eq!(
        graph.find_all_paths().unwrap(),
        vec![
            vec![
                "extraction_000".to_string(),
                "extract_000_000".to_string(),
                "library_sequencing_000_000".to_string(),
                "raw_file_000_000".to_string(),
            ],
            vec![
                "extraction_001".to_string(),
                "extract_000_001".to_string(),
                "library_sequencing_000_001".to_string(),
                "raw_file_000_001".to_string(),
            ],
        ]
    );
    let sequencing = graph.node("library_sequencing_000_000").unwrap();
    assert_eq!(sequencing.multiplicity(), 2);
}

#[test]
fn previous_protocols_skip_product_layers() {
    let graph = sequencing_graph();
    let upstream = graph
        .previous_protocol_nodes("library_sequencing_000_001")
        .unwrap();
    assert_eq!(upstream.len(), 1);
    assert_eq!(upstream[0].id, "extraction_001");
    assert!(graph.previous_protocol_nodes("extraction_000").unwrap().is_empty());
    assert_matches!(
        graph.previous_protocol_nodes("missing"),
        Err(IsaError::GraphTopology { .. })
    );
}

#[test]
fn product_to_product_links_are_rejected() {
    let mut graph = AssayGraph::new("AT9", "metabolite profiling", "mass spectrometry");
    graph
        .add_node(ProductNode::new("a", ProductType::Extract, "extract", 1))
        .unwrap();
    graph
        .add_node(ProductNode::new("b", ProductType::DataFile, "raw", 1))
        .unwrap();
    assert_matches!(graph.add_link("a", "b"), Err(IsaError::GraphTopology { .. }));
    assert_matches!(graph.add_link("a", "c"), Err(IsaError::GraphTopology { .. }));
    assert!(graph.links().is_empty());
}

#[test]
fn malformed_declarations_fail() {
    let leading_product = AssayDeclaration::new("m", "t")
        .product_step("extract", vec![ProductDeclaration::new("extract", 1)]);
    assert_matches!(
        AssayGraph::from_declaration(&leading_product, "AT1", None, None),
        Err(IsaError::GraphTopology { .. })
    );

    let empty_values = AssayDeclaration::new("m", "t").protocol_step("extraction", json!({"method": []}));
    assert_matches!(
        AssayGraph::from_declaration(&empty_values, "AT2", None, None),
        Err(IsaError::InvalidValue(_))
    );

    let no_replicates =
        AssayDeclaration::new("m", "t").protocol_step("extraction", json!({"#replicates": 0}));
    assert_matches!(
        AssayGraph::from_declaration(&no_replicates, "AT3", None, None),
        Err(IsaError::TypeViolation { .. })
    );

    let mut node = ProtocolNode::new("p", "p", "p");
    assert_matches!(node.set_replicates(0), Err(IsaError::TypeViolation { .. }));
}

#[test]
fn process_count_follows_combinations_and_replicates() {
    let graph = sequencing_graph();
    let samples: Vec<Sample> = (1..=3).map(|i| Sample::new(format!("s{i}"))).collect();
    let generated =
        generate_assay(&graph, &samples, &StudyCreatorConfig::default(), "2026-01-01", None).unwrap();
    assert!(generated.derived_samples.is_empty());
    let assay = generated.assay;
    let extraction = assay
        .process_sequence
        .iter()
        .filter(|process| process.name.contains("_extraction-"))
        .count();
    let sequencing = assay
        .process_sequence
        .iter()
        .filter(|process| process.name.contains("_library_sequencing-"))
        .count();
    assert_eq!(extraction, 3 * 2);
    assert_eq!(sequencing, 3 * 2 * 2);
    assert_eq!(assay.other_material.len(), 6);
    assert_eq!(assay.data_files.len(), 12);
    assert!(assay
        .data_files
        .iter()
        .all(|file| file.filename.ends_with(".fastq")));
    assert!(assay
        .process_sequence
        .iter()
        .all(|process| process.date == "2026-01-01"));
    assert_eq!(assay.samples.len(), 3);
}

#[test]
fn generated_ids_come_from_the_generator() {
    let mut ids = SequentialIdGenerator::new();
    let graph =
        AssayGraph::from_declaration(&sequencing_declaration(), "AT0", None, Some(&mut ids)).unwrap();
    assert!(graph.nodes().all(|node| !node.id().starts_with("extraction")));
    assert_eq!(graph.node_count(), 8);
}

#[test]
fn plans_map_only_selected_sample_types() {
    let sample_types = [
        ProductDeclaration::new("sample", 2).with_characteristic("organism part", "blood"),
        ProductDeclaration::new("sample", 1).with_characteristic("organism part", "saliva"),
    ];
    let mut declaration = sequencing_declaration();
    declaration.selected_sample_types = Some(vec!["blood".to_string()]);
    let plan = SampleAndAssayPlan::from_declaration("plan", &sample_types, &[declaration], &[], None)
        .unwrap();
    assert_eq!(plan.sample_plan().len(), 2);
    assert_eq!(plan.assay_plan().len(), 1);
    assert_eq!(plan.graphs_for_sample("sample_000").len(), 1);
    assert!(plan.graphs_for_sample("sample_001").is_empty());
    assert_eq!(plan.assay_plan()[0].id, "AT0");
}
