use assert_matches::assert_matches;
use serde_json::json;

use isa_study_designer::design::{
    CellItem, Element, ExternalStudyConfig, InterventionType, MaterializeOptions, NonTreatmentType,
};
use isa_study_designer::error::IsaError;
use isa_study_designer::model::Value;

fn sucrose_trial() -> serde_json::Value {
    json!({
        "_id": "study-42",
        "name": "Sucrose trial",
        "description": "Dietary sugars and the plasma metabolome",
        "design": {
            "designType": {
                "term": "crossover design",
                "iri": "http://purl.obolibrary.org/obo/OBI_0500003",
                "source": "OBI"
            },
            "subjectType": "Homo sapiens",
            "observationalFactors": [{"name": "age", "value": 42, "unit": "year"}],
            "elements": [
                {"id": "scr", "type": "screen", "duration": 7, "durationUnit": "day"},
                {
                    "id": "suc", "type": "treatment", "interventionType": "dietary intervention",
                    "agent": "sucrose", "intensity": 10, "intensityUnit": "g",
                    "duration": 14, "durationUnit": "day"
                },
                {
                    "id": "fru", "type": "dietary",
                    "agent": "fructose", "intensity": 10, "intensityUnit": "g",
                    "duration": 14, "durationUnit": "day"
                },
                {"id": "fu", "type": "follow-up", "duration": 30, "durationUnit": "day"}
            ],
            "arms": {"selected": [
                {"name": "Arm_0", "size": 10, "epochs": [
                    {"elements": ["scr"]}, {"elements": ["suc"]}, {"elements": ["fu"]}
                ]},
                {"name": "Arm_1", "size": 12, "epochs": [
                    {"elements": ["scr"]}, {"elements": ["suc", "fru"]}, {"elements": ["fu"]}
                ]}
            ]},
            "samplePlan": [
                {
                    "sampleType": "blood", "size": 2,
                    "selectedCells": {"Arm_0": [true, true, false], "Arm_1": [false, 3, true]}
                },
                {"sampleType": {"term": "urine"}, "selectedCells": {"Arm_0": [false, true, false]}}
            ],
            "assayPlan": [{
                "name": "metabolomics",
                "measurementType": "metabolite profiling",
                "technologyType": "mass spectrometry",
                "workflow": [
                    ["extraction", {"extraction method": ["methanol"]}],
                    ["extract", [{"node_type": "extract", "size": 1}]],
                    ["mass spectrometry", {"#replicates": 2, "ion source": ["ESI"]}],
                    ["raw spectral data file", [{"node_type": "data file", "size": 1}]]
                ],
                "selectedCells": {"Arm_0": [true, true, false], "Arm_1": [false, true, true]},
                "selectedSampleTypes": ["blood"]
            }]
        }
    })
}

fn parse(value: &serde_json::Value) -> Result<ExternalStudyConfig, IsaError> {
    ExternalStudyConfig::parse(&value.to_string())
}

#[test]
fn arms_follow_the_epoch_layout() {
    let design = parse(&sucrose_trial()).unwrap().to_study_design().unwrap();
    assert_eq!(design.identifier.as_deref(), Some("study-42"));
    assert_eq!(design.name, "Sucrose trial");
    let design_type = design.design_type.as_ref().unwrap();
    assert_eq!(design_type.term_source.as_deref(), Some("OBI"));
    assert_eq!(design.study_arms().len(), 2);

    let arm = &design.study_arms()[0];
    assert_eq!(arm.name, "Arm_0");
    assert_eq!(arm.group_size, 10);
    assert!(arm.is_completed());
    let cells: Vec<&str> = arm.cells().map(|cell| cell.name.as_str()).collect();
    assert_eq!(cells, ["Arm_0_CELL_00", "Arm_0_CELL_01", "Arm_0_CELL_02"]);
    assert_eq!(
        arm.cells().next().unwrap().first_non_treatment(),
        Some(NonTreatmentType::Screen)
    );
    assert_eq!(arm.source_type.value, Value::Term("Homo sapiens".into()));
    assert!(arm
        .source_characteristics()
        .iter()
        .any(|characteristic| characteristic.category.term == "age"
            && characteristic.value == Value::Int(42)));
}

#[test]
fn several_treatments_in_an_epoch_run_concomitantly() {
    let design = parse(&sucrose_trial()).unwrap().to_study_design().unwrap();
    let arm = &design.study_arms()[1];
    let cell = arm.cells().nth(1).unwrap();
    assert_matches!(&cell.elements()[0], CellItem::Concomitant(treatments) if treatments.len() == 2);
    assert!(arm
        .treatments()
        .iter()
        .all(|treatment| treatment.treatment_type == InterventionType::Dietary));

    let first = design.study_arms()[0].cells().nth(1).unwrap();
    assert_matches!(&first.elements()[0], CellItem::Single(Element::Treatment(treatment)) if treatment.factor_values().len() == 3);
}

#[test]
fn plans_exist_only_for_sampled_epochs() {
    let design = parse(&sucrose_trial()).unwrap().to_study_design().unwrap();
    let plan_names = |index: usize| -> Vec<Option<String>> {
        design.study_arms()[index]
            .arm_map()
            .iter()
            .map(|entry| entry.plan.as_ref().map(|plan| plan.name.clone()))
            .collect()
    };
    assert_eq!(
        plan_names(0),
        [Some("Arm_0_CELL_00_PLAN".to_string()), Some("Arm_0_CELL_01_PLAN".to_string()), None]
    );
    assert_eq!(
        plan_names(1),
        [None, Some("Arm_1_CELL_01_PLAN".to_string()), Some("Arm_1_CELL_02_PLAN".to_string())]
    );

    let plan = design.study_arms()[0].arm_map()[1].plan.as_ref().unwrap();
    assert_eq!(plan.sample_plan().len(), 2);
    assert_eq!(plan.assay_plan().len(), 1);
    assert_eq!(plan.graphs_for_sample("sample_000").len(), 1);
    assert!(plan.graphs_for_sample("sample_001").is_empty());

    let counted = design.study_arms()[1].arm_map()[1].plan.as_ref().unwrap();
    assert_eq!(counted.sample_plan()[0].size, 3);
}

#[test]
fn translated_design_materializes() {
    let design = parse(&sucrose_trial()).unwrap().to_study_design().unwrap();
    let study = design
        .generate_isa_study(&MaterializeOptions::default())
        .unwrap();
    assert_eq!(study.identifier, "study-42");
    assert_eq!(study.sources.len(), 22);
    // Arm_0: 10 x 2 blood, then 10 x (2 blood + 1 urine); Arm_1: 12 x 3 blood, then 12 x 2 blood
    assert_eq!(study.samples.len(), 20 + 30 + 36 + 24);
    assert_eq!(study.assays.len(), 1);
    let assay = &study.assays[0];
    assert_eq!(assay.samples.len(), 20 + 20 + 36 + 24);
    assert_eq!(assay.extracts().count(), 100);
    assert_eq!(assay.data_files.len(), 200);
    assert_eq!(assay.process_sequence.len(), 300);
}

#[test]
fn unknown_element_references_fail() {
    let mut config = sucrose_trial();
    config["design"]["arms"]["selected"][0]["epochs"][1]["elements"] = json!(["nope"]);
    assert_matches!(
        parse(&config).unwrap().to_study_design(),
        Err(IsaError::MissingReference { .. })
    );
}

#[test]
fn malformed_configs_are_parse_errors() {
    assert_matches!(ExternalStudyConfig::parse("{}"), Err(IsaError::ConfigParse(_)));
    let mut config = sucrose_trial();
    config["design"]["elements"][1]["interventionType"] = json!("telepathic");
    assert_matches!(
        parse(&config).unwrap().to_study_design(),
        Err(IsaError::TypeViolation { .. })
    );
}
