use assert_matches::assert_matches;

use isa_study_designer::design::element::{AGENT, DURATION, INTENSITY};
use isa_study_designer::design::factory::TreatmentEntry;
use isa_study_designer::design::{
    AssayGraph, InterventionType, MaterializeOptions, NonTreatment, NonTreatmentMaps,
    NonTreatmentType, ProductNode, ProductType, ProtocolNode, SampleAndAssayPlan,
    StudyDesignFactory, Treatment, TreatmentFactory,
};
use isa_study_designer::error::IsaError;
use isa_study_designer::model::{Characteristic, OntologyAnnotation};

fn radiation_factory() -> TreatmentFactory {
    let mut factory = TreatmentFactory::default();
    factory.add_factor_values(AGENT, ["Cs 137"]).unwrap();
    factory
        .add_factor_values(INTENSITY, ["2.5 cGy", "10 cGy"])
        .unwrap();
    factory.add_factor_values(DURATION, ["1 hr", "72 hr"]).unwrap();
    factory
}

fn nmr_graph() -> AssayGraph {
    let mut graph = AssayGraph::new("nmr", "metabolite profiling", "NMR spectroscopy");
    graph
        .add_node(ProductNode::new("extract_000", ProductType::Extract, "extract", 1))
        .unwrap();
    let mut nmr = ProtocolNode::new("nmr_000", "nmr spectroscopy", "nmr spectroscopy");
    nmr.set_replicates(2).unwrap();
    nmr.add_parameter_value("instrument", "Bruker AVANCE II 1 GHz", None)
        .unwrap();
    graph.add_node(nmr).unwrap();
    graph
        .add_node(ProductNode::new("fid_000", ProductType::DataFile, "nmr data file", 1))
        .unwrap();
    graph.add_link("extract_000", "nmr_000").unwrap();
    graph.add_link("nmr_000", "fid_000").unwrap();
    graph
}

fn muscle_plan() -> SampleAndAssayPlan {
    let mut plan = SampleAndAssayPlan::new("muscle plan");
    plan.add_sample_type_to_plan(
        ProductNode::new("sample_000", ProductType::Sample, "sample", 1).with_characteristics(vec![
            Characteristic::new("organism part", OntologyAnnotation::new("muscle tissue")),
        ]),
    )
    .unwrap();
    plan.add_assay_graph_to_plan(nmr_graph());
    plan.add_element_to_map("sample_000", "nmr").unwrap();
    plan
}

#[test]
fn full_factorial_is_the_cartesian_product() {
    let treatments = radiation_factory().compute_full_factorial_design();
    assert_eq!(treatments.len(), 8);
    assert!(treatments.iter().all(|treatment| treatment.factor_values().len() == 3));
}

#[test]
fn factor_without_values_yields_nothing() {
    let mut factory = TreatmentFactory::default();
    factory.add_factor_value(AGENT, "aspirin").unwrap();
    assert!(factory.compute_full_factorial_design().is_empty());
    assert_matches!(
        factory.add_factor_value("DOSE", 1),
        Err(IsaError::MissingReference { .. })
    );
}

#[test]
fn parallel_factorial_design_materializes() {
    let plan = muscle_plan();
    let entries: Vec<TreatmentEntry> = radiation_factory()
        .compute_full_factorial_design()
        .into_iter()
        .map(|treatment| (treatment, Some(plan.clone())))
        .collect();
    let design =
        StudyDesignFactory::compute_parallel_design(&entries, 10, &NonTreatmentMaps::default())
            .unwrap();
    assert_eq!(design.study_arms().len(), 8);
    assert_eq!(design.study_arms()[0].name, "ARM_00");
    assert_eq!(design.study_arms()[0].cells().next().unwrap().name, "ARM_00_CELL_00");

    let study = design
        .generate_isa_study(&MaterializeOptions::default())
        .unwrap();
    assert_eq!(study.sources.len(), 80);
    assert_eq!(study.samples.len(), 80);
    assert_eq!(study.process_sequence.len(), 80);
    assert_eq!(study.assays.len(), 1);
    let assay = &study.assays[0];
    assert_eq!(assay.extracts().count(), 80);
    assert_eq!(assay.process_sequence.len(), 160);
    assert_eq!(assay.data_files.len(), 160);
}

#[test]
fn group_sizes_must_match_arm_count() {
    let entries: Vec<TreatmentEntry> = radiation_factory()
        .compute_full_factorial_design()
        .into_iter()
        .map(|treatment| (treatment, None))
        .collect();
    assert_matches!(
        StudyDesignFactory::compute_parallel_design(&entries, vec![10, 10], &NonTreatmentMaps::default()),
        Err(IsaError::GroupSizeMismatch { expected: 8, actual: 2 })
    );
}

fn three_treatments() -> Vec<Treatment> {
    let mut factory = TreatmentFactory::default();
    factory
        .add_factor_values(AGENT, ["aspirin", "ibuprofen", "paracetamol"])
        .unwrap();
    factory.add_factor_value(INTENSITY, "10 mg").unwrap();
    factory.add_factor_value(DURATION, 7).unwrap();
    factory.compute_full_factorial_design().into_iter().collect()
}

fn wrapper_maps(plan: &SampleAndAssayPlan) -> NonTreatmentMaps {
    let day = || Some(OntologyAnnotation::new("day"));
    NonTreatmentMaps {
        screen: Some((NonTreatment::new(NonTreatmentType::Screen, 14, day()), Some(plan.clone()))),
        run_in: None,
        washout: Some((NonTreatment::new(NonTreatmentType::Washout, 7, day()), None)),
        follow_up: Some((NonTreatment::new(NonTreatmentType::FollowUp, 30, day()), Some(plan.clone()))),
    }
}

#[test]
fn crossover_has_one_arm_per_ordering() {
    let plan = muscle_plan();
    let entries: Vec<TreatmentEntry> = three_treatments()
        .into_iter()
        .map(|treatment| (treatment, Some(plan.clone())))
        .collect();
    let design =
        StudyDesignFactory::compute_crossover_design(&entries, 20, &wrapper_maps(&plan)).unwrap();
    assert_eq!(design.study_arms().len(), 6);
    for arm in design.study_arms() {
        let kinds: Vec<Option<NonTreatmentType>> =
            arm.cells().map(|cell| cell.first_non_treatment()).collect();
        assert_eq!(
            kinds,
            [
                Some(NonTreatmentType::Screen),
                None,
                Some(NonTreatmentType::Washout),
                None,
                Some(NonTreatmentType::Washout),
                None,
                Some(NonTreatmentType::FollowUp),
            ]
        );
    }

    let study = design
        .generate_isa_study(&MaterializeOptions::default())
        .unwrap();
    assert_eq!(study.sources.len(), 120);
    assert_eq!(study.samples.len(), 6 * 20 * 5);
}

#[test]
fn wrapper_maps_are_type_checked() {
    let maps = NonTreatmentMaps {
        screen: Some((NonTreatment::bare(NonTreatmentType::Washout), None)),
        ..NonTreatmentMaps::default()
    };
    let entries: Vec<TreatmentEntry> = three_treatments()
        .into_iter()
        .map(|treatment| (treatment, None))
        .collect();
    assert_matches!(
        StudyDesignFactory::compute_single_arm_design(&entries, 4, &maps),
        Err(IsaError::TypeViolation { .. })
    );
}

#[test]
fn single_arm_and_concomitant_designs() {
    let treatments = three_treatments();
    let entries: Vec<TreatmentEntry> = treatments
        .iter()
        .cloned()
        .map(|treatment| (treatment, None))
        .collect();
    let maps = NonTreatmentMaps {
        washout: Some((NonTreatment::new(NonTreatmentType::Washout, 7, None), None)),
        ..NonTreatmentMaps::default()
    };
    let single = StudyDesignFactory::compute_single_arm_design(&entries, 4, &maps).unwrap();
    assert_eq!(single.study_arms().len(), 1);
    assert_eq!(single.study_arms()[0].arm_map().len(), 5);

    let concomitant = StudyDesignFactory::compute_concomitant_treatments_design(
        &treatments,
        None,
        4,
        &NonTreatmentMaps::default(),
    )
    .unwrap();
    let arm = &concomitant.study_arms()[0];
    assert_eq!(arm.arm_map().len(), 1);
    assert_eq!(arm.cells().next().unwrap().get_all_elements().len(), 3);
    assert_eq!(arm.treatments().len(), 3);
}

#[test]
fn multi_element_crossover_interleaves_washouts() {
    let treatments = three_treatments();
    let design = StudyDesignFactory::compute_crossover_design_multi_element_cell(
        &treatments,
        None,
        5,
        Some(NonTreatment::new(NonTreatmentType::Washout, 7, None)),
        &NonTreatmentMaps::default(),
    )
    .unwrap();
    assert_eq!(design.study_arms().len(), 6);
    for arm in design.study_arms() {
        let cell = arm.cells().next().unwrap();
        assert_eq!(cell.len(), 5);
        assert_eq!(cell.last_non_treatment(), None);
    }
    assert_eq!(
        InterventionType::default(),
        treatments[0].treatment_type
    );
}
