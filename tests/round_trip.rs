use assert_matches::assert_matches;
use serde_json::json;

use isa_study_designer::design::element::{AGENT, DURATION, INTENSITY};
use isa_study_designer::design::factory::TreatmentEntry;
use isa_study_designer::design::{
    AssayDeclaration, MaterializeOptions, NonTreatmentMaps, ProductDeclaration, SampleAndAssayPlan,
    StudyDesignFactory, TreatmentFactory,
};
use isa_study_designer::error::IsaError;
use isa_study_designer::model::{
    Assay, Characteristic, DataFile, DataFileKind, FactorValue, IsaDict, Material, OntologySource,
    OntologyAnnotation, ParameterValue, Process, ProcessIo, Protocol, Sample, Source, Study,
    StudyFactor, Investigation, Value, plink_at,
};

/// Extraction then sequencing of one sample, linked through the extract.
fn sequencing_assay(group: u32, extraction: &Protocol, sequencing: &Protocol, sample_id: &str) -> Assay {
    let mut assay = Assay::new(
        format!("a_0{group}_sequencing.txt"),
        "transcription profiling",
        "nucleic acid sequencing",
    );
    let mut extract = Material::extract(format!("GRP{group}-extract-1"));
    extract.derives_from = vec![sample_id.to_string()];
    let mut reads = DataFile::new(format!("GRP{group}-reads-1.fastq"), DataFileKind::RawData);
    reads.generated_from = vec![sample_id.to_string()];

    let mut extracting = Process::new(format!("extraction-GRP{group}"), extraction.id.as_str());
    extracting.inputs.push(ProcessIo::Sample(sample_id.to_string()));
    extracting.outputs.push(ProcessIo::Material(extract.id.clone()));
    extracting.parameter_values = vec![
        ParameterValue::new(
            extraction.get_param("extraction method").cloned().unwrap(),
            "TRIzol",
            None,
        )
        .unwrap(),
    ];
    let mut reading = Process::new(format!("sequencing-GRP{group}"), sequencing.id.as_str());
    reading.inputs.push(ProcessIo::Material(extract.id.clone()));
    reading.outputs.push(ProcessIo::DataFile(reads.id.clone()));
    assay.process_sequence = vec![extracting, reading];
    plink_at(&mut assay.process_sequence, 0, 1).unwrap();

    assay.samples = vec![sample_id.to_string()];
    assay.other_material.push(extract);
    assay.data_files.push(reads);
    assay.collect_categories();
    assay
}

fn sampled_study(group: u32) -> Study {
    let mut study = Study::new(format!("s_0{group}"), format!("s_0{group}.txt"));
    study.title = "Liver toxicity".to_string();

    let protocol = Protocol::new("sample collection", "sample collection")
        .with_parameters(["run order", "collection site"]);
    study.add_protocol(protocol.clone()).unwrap();

    let dose = StudyFactor::new("dose", "dose");
    study.add_factor(dose.clone());

    let extraction = Protocol::new("extraction", "nucleic acid extraction")
        .with_parameters(["extraction method"]);
    let sequencing = Protocol::new("sequencing", "nucleic acid sequencing");
    study.add_protocol(extraction.clone()).unwrap();
    study.add_protocol(sequencing.clone()).unwrap();

    let source = Source::new(format!("GRP{group}_SUBJ1")).with_characteristics(vec![Characteristic::new(
        "organism",
        OntologyAnnotation::sourced("Mus musculus", "NCBITaxon", "http://purl.obolibrary.org/obo/NCBITaxon_10090"),
    )]);
    let mut sample = Sample::new(format!("GRP{group}_SUBJ1_liver"));
    sample.characteristics = vec![
        Characteristic::new(
            "organism part",
            OntologyAnnotation::sourced("liver", "UBERON", "http://purl.obolibrary.org/obo/UBERON_0002107"),
        ),
        Characteristic::new("weight", 1.5).with_unit("gram"),
    ];
    sample.factor_values = vec![FactorValue::new(dose, 10).with_unit("milligram")];
    sample.derives_from = vec![source.id.clone()];

    let mut process = Process::new(format!("sampling-{}", sample.name), protocol.id.as_str());
    process.performer = "Unknown".to_string();
    process.date = "2026-01-15".to_string();
    process.inputs.push(ProcessIo::Source(source.id.clone()));
    process.outputs.push(ProcessIo::Sample(sample.id.clone()));
    process.parameter_values = vec![
        ParameterValue::new(protocol.get_param("run order").cloned().unwrap(), 1, None).unwrap(),
        ParameterValue::new(
            protocol.get_param("collection site").cloned().unwrap(),
            "necropsy room",
            None,
        )
        .unwrap(),
    ];

    let assay = sequencing_assay(group, &extraction, &sequencing, &sample.id);
    study.add_source(source);
    study.add_sample(sample);
    study.process_sequence.push(process);
    study.assays.push(assay);
    study.collect_categories();
    study
}

fn investigation() -> Investigation {
    let mut investigation = Investigation::new("i_01");
    investigation.title = "Round trip".to_string();
    for (name, description) in [("NCBITaxon", "NCBI taxonomy"), ("UBERON", "Uberon anatomy")] {
        investigation.add_ontology_source(OntologySource::with_details(name, "", "2024-01-01", description));
    }
    investigation.studies.push(sampled_study(1));
    investigation.studies.push(sampled_study(2));
    investigation
}

/// A two-arm design whose blood samples are aliquoted, extracted and sequenced.
fn materialized_investigation() -> Investigation {
    let assay = AssayDeclaration::new("transcription profiling", "nucleic acid sequencing")
        .protocol_step("aliquoting", json!({"aliquot volume": ["200 ul"]}))
        .product_step("aliquot", vec![ProductDeclaration::new("sample", 2)])
        .protocol_step("extraction", json!({"extraction method": ["TRIzol"]}))
        .product_step("extract", vec![ProductDeclaration::new("extract", 1)])
        .protocol_step("sequencing", json!({"#replicates": 2, "library layout": ["paired"]}))
        .product_step("raw data file", vec![ProductDeclaration::new("data file", 1)]);
    let plan = SampleAndAssayPlan::from_declaration(
        "blood plan",
        &[ProductDeclaration::new("sample", 1).with_characteristic("organism part", "blood")],
        &[assay],
        &[],
        None,
    )
    .unwrap();
    let mut factory = TreatmentFactory::default();
    factory.add_factor_values(AGENT, ["placebo", "metformin"]).unwrap();
    factory.add_factor_value(INTENSITY, "500 mg").unwrap();
    factory.add_factor_value(DURATION, 30).unwrap();
    let entries: Vec<TreatmentEntry> = factory
        .compute_full_factorial_design()
        .into_iter()
        .map(|treatment| (treatment, Some(plan.clone())))
        .collect();
    let design =
        StudyDesignFactory::compute_parallel_design(&entries, 2, &NonTreatmentMaps::default()).unwrap();
    design
        .generate_isa_investigation(&MaterializeOptions {
            date: "2026-05-01".to_string(),
            ..MaterializeOptions::default()
        })
        .unwrap()
}

#[test]
fn investigation_survives_a_dict_round_trip() {
    let original = investigation();
    let reloaded = Investigation::load(&original.to_dict(None)).unwrap();
    assert_eq!(reloaded, original);

    let sample = &reloaded.studies[0].samples[0];
    assert_matches!(&sample.characteristics[0].value, Value::Term(term) if term.term_source.as_deref() == Some("UBERON"));
    assert_eq!(sample.characteristics[1].value, Value::Float(1.5));
    assert_eq!(sample.factor_values[0].value, Value::Int(10));

    for study in &reloaded.studies {
        assert_eq!(study.assays.len(), 1);
        let assay = &study.assays[0];
        assert_eq!(assay.extracts().count(), 1);
        assert_eq!(assay.data_files.len(), 1);
        assert_eq!(
            assay.process_sequence[1].prev_process.as_deref(),
            Some(assay.process_sequence[0].id.as_str())
        );
    }
}

#[test]
fn materialized_investigation_survives_a_dict_round_trip() {
    let original = materialized_investigation();
    let study = &original.studies[0];
    let assay = &study.assays[0];
    assert!(assay.extracts().count() > 0);
    assert!(!assay.data_files.is_empty());
    assert!(assay.process_sequence.iter().any(|process| process.prev_process.is_some()));
    assert!(study.samples.iter().any(|sample| sample.name.contains("-Sample-R")));

    let reloaded = Investigation::load(&original.to_dict(None)).unwrap();
    assert_eq!(reloaded, original);
}

#[test]
fn string_rendering_is_stable() {
    let first = investigation().to_json_string(None).unwrap();
    let second = Investigation::load_str(&first)
        .unwrap()
        .to_json_string(None)
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn dangling_references_fail_to_load() {
    let mut dict = investigation().to_dict(None);
    dict["studies"][0]["materials"]["samples"][0]["derivesFrom"] = json!([{"@id": "#source/nobody"}]);
    assert!(Investigation::load(&dict).is_err());

    let mut dict = investigation().to_dict(None);
    dict["studies"][0]["processSequence"][0]["executesProtocol"] = json!({"@id": "#protocol/unknown"});
    assert_matches!(Investigation::load(&dict), Err(IsaError::MissingReference { .. }));
}

#[test]
fn malformed_json_is_reported() {
    assert_matches!(Investigation::load_str("{not json"), Err(IsaError::Json(_)));
    assert_matches!(Investigation::load(&json!([])), Err(IsaError::TypeViolation { .. }));
}
