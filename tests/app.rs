use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use serde_json::json;

use isa_study_designer::app::{App, DesignSource, GenerateOptions};
use isa_study_designer::config::StudyCreatorConfig;
use isa_study_designer::design::codec::dump_design;
use isa_study_designer::design::element::{AGENT, DURATION, INTENSITY};
use isa_study_designer::design::factory::TreatmentEntry;
use isa_study_designer::design::{
    NonTreatmentMaps, ProductDeclaration, SampleAndAssayPlan, AssayDeclaration, StudyDesign,
    StudyDesignFactory, TreatmentFactory,
};
use isa_study_designer::error::IsaError;
use isa_study_designer::model::Investigation;

fn workspace() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, root)
}

fn liver_design() -> StudyDesign {
    let assay = AssayDeclaration::new("transcription profiling", "nucleic acid sequencing")
        .protocol_step("extraction", json!({"extraction method": ["TRIzol"]}))
        .product_step("extract", vec![ProductDeclaration::new("extract", 1)])
        .protocol_step("nucleic acid sequencing", json!({"library layout": ["paired"]}))
        .product_step("raw data file", vec![ProductDeclaration::new("data file", 1)]);
    let plan = SampleAndAssayPlan::from_declaration(
        "liver plan",
        &[ProductDeclaration::new("sample", 1).with_characteristic("organism part", "liver")],
        &[assay],
        &[],
        None,
    )
    .unwrap();
    let mut factory = TreatmentFactory::default();
    factory.add_factor_values(AGENT, ["vehicle", "acetaminophen"]).unwrap();
    factory.add_factor_value(INTENSITY, "300 mg/kg").unwrap();
    factory.add_factor_value(DURATION, 24).unwrap();
    let entries: Vec<TreatmentEntry> = factory
        .compute_full_factorial_design()
        .into_iter()
        .map(|treatment| (treatment, Some(plan.clone())))
        .collect();
    let mut design =
        StudyDesignFactory::compute_parallel_design(&entries, 5, &NonTreatmentMaps::default()).unwrap();
    design.name = "hepatotoxicity".to_string();
    design
}

fn options() -> GenerateOptions {
    GenerateOptions {
        date: Some("2026-04-01".to_string()),
        ..GenerateOptions::default()
    }
}

#[test]
fn generate_writes_a_loadable_investigation() {
    let (_dir, root) = workspace();
    let design_path = root.join("design.json");
    fs::write(&design_path, dump_design(&liver_design()).unwrap()).unwrap();

    let app = App::new(StudyCreatorConfig::default());
    let design = app.load_design(&DesignSource::Codec(design_path)).unwrap();
    assert_eq!(design, liver_design());

    let out = root.join("out").join("i_investigation.json");
    let result = app.generate(&design, &options(), &out).unwrap();
    assert_eq!(result.output, out.as_str());
    assert_eq!(result.summary.design, "hepatotoxicity");
    assert_eq!(result.summary.arms, 2);
    assert_eq!(result.summary.sources, 10);
    assert_eq!(result.summary.samples, 10);
    assert_eq!(result.summary.assays, 1);
    assert_eq!(result.summary.data_files, 10);
    assert_eq!(result.summary.processes, 10 + 20);

    let written = fs::read_to_string(&out).unwrap();
    let investigation = Investigation::load_str(&written).unwrap();
    assert_eq!(investigation.identifier, result.investigation);
    assert!(investigation.studies[0]
        .process_sequence
        .iter()
        .all(|process| process.date == "2026-04-01"));

    let check = app.check(&written).unwrap();
    assert!(check.stable);
    assert!(check.duplicate_ids.is_empty());
    assert_eq!(check.studies, 1);
    assert_eq!(check.entities, investigation.entity_ids().len());
}

#[test]
fn summary_does_not_touch_the_filesystem() {
    let app = App::new(StudyCreatorConfig::default());
    let summary = app.summary(&liver_design(), &options()).unwrap();
    assert_eq!(summary.samples, 10);
    assert_eq!(app.config().performer(), "Unknown");
}

#[test]
fn missing_design_file_is_a_filesystem_error() {
    let (_dir, root) = workspace();
    let app = App::new(StudyCreatorConfig::default());
    assert_matches!(
        app.load_design(&DesignSource::External(root.join("absent.json"))),
        Err(IsaError::Filesystem(_))
    );
}

#[test]
fn check_rejects_invalid_documents() {
    let app = App::new(StudyCreatorConfig::default());
    assert_matches!(app.check("not json"), Err(IsaError::Json(_)));
}
