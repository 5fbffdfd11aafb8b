use isa_study_designer::config::{RUN_ORDER, STUDY_CELL, StudyCreatorConfig};
use isa_study_designer::design::quality_control::{QC_RUN_ORDER, QcContext, interleave};
use isa_study_designer::design::{
    AssayGraph, MaterializeOptions, ProductNode, ProductType, ProtocolNode, QualityControl,
    SampleAndAssayPlan, StudyArm, StudyCell, StudyDesign,
};
use isa_study_designer::model::{Characteristic, QcSampleType, Sample, Value};

fn qc_node(id: &str, size: usize, kind: &str) -> ProductNode {
    ProductNode::new(id, ProductType::Sample, id, size)
        .with_characteristics(vec![Characteristic::new("quality control sample type", kind)])
}

fn standard_qc() -> QualityControl {
    let mut qc = QualityControl::new(
        Some(qc_node("qc_pre", 2, "solvent blank")),
        Some(qc_node("qc_post", 2, "solvent blank")),
    );
    qc.add_interspersed_sample_type(qc_node("qc_mid", 1, "pooled QC"), 10)
        .unwrap();
    qc
}

fn samples(count: usize) -> Vec<Sample> {
    // reversed so the interleaving has to sort them
    (1..=count)
        .rev()
        .map(|i| Sample::new(format!("s{i:02}")))
        .collect()
}

#[test]
fn interval_qc_follows_every_tenth_sample() {
    let sampling = StudyCreatorConfig::default().sampling_protocol().unwrap();
    let context = QcContext {
        sampling: &sampling,
        performer: "lab",
        date: "2026-02-02",
    };
    let run = interleave("AT0", &standard_qc(), &samples(30), &context, None).unwrap();
    assert_eq!(run.ordered_samples.len(), 37);
    assert_eq!(run.qc_samples.len(), 7);
    assert_eq!(run.qc_sources.len(), 7);
    assert_eq!(run.processes.len(), 7);

    let kinds: Vec<Option<QcSampleType>> = run
        .ordered_samples
        .iter()
        .map(Sample::qc_sample_type)
        .collect();
    assert_eq!(kinds[0], Some(QcSampleType::PreRun));
    assert_eq!(kinds[1], Some(QcSampleType::PreRun));
    for position in [12, 23, 34] {
        assert_eq!(kinds[position], Some(QcSampleType::Interspersed), "slot {position}");
    }
    assert_eq!(kinds[35], Some(QcSampleType::PostRun));
    assert_eq!(kinds[36], Some(QcSampleType::PostRun));
    assert_eq!(kinds.iter().filter(|kind| kind.is_none()).count(), 30);
    assert_eq!(run.ordered_samples[2].name, "s01");
    assert_eq!(run.ordered_samples[11].name, "s10");
    assert_eq!(run.ordered_samples[13].name, "s11");
}

#[test]
fn qc_processes_use_the_sampling_protocol() {
    let sampling = StudyCreatorConfig::default().sampling_protocol().unwrap();
    let context = QcContext {
        sampling: &sampling,
        performer: "lab",
        date: "2026-02-02",
    };
    let run = interleave("AT0", &standard_qc(), &samples(5), &context, None).unwrap();
    // 5 samples never reach the interval of 10
    assert_eq!(run.qc_samples.len(), 4);
    let process = &run.processes[0];
    assert_eq!(process.executes_protocol, sampling.id);
    assert_eq!(process.performer, "lab");
    let value_of = |name: &str| {
        process
            .parameter_values
            .iter()
            .find(|value| value.category.parameter_name.term == name)
            .map(|value| value.value.clone())
    };
    assert_eq!(value_of(RUN_ORDER), Some(Value::Int(QC_RUN_ORDER)));
    assert_eq!(value_of(STUDY_CELL), Some(Value::from("AT0")));
    assert_eq!(run.qc_samples[0].name, "SMP-QC-PRE-AT0_sample_QC_0000");
    assert_eq!(run.qc_samples[0].derives_from, vec![run.qc_sources[0].id.clone()]);
}

fn design_with_qc() -> StudyDesign {
    let mut graph = AssayGraph::new("AT0", "metabolite profiling", "mass spectrometry");
    graph
        .add_node(ProtocolNode::new("extraction_000", "extraction", "extraction"))
        .unwrap();
    graph
        .add_node(ProductNode::new("raw_000_000", ProductType::DataFile, "raw", 1))
        .unwrap();
    graph.add_link("extraction_000", "raw_000_000").unwrap();
    graph.quality_control = Some(standard_qc());

    let mut plan = SampleAndAssayPlan::new("plan");
    plan.add_sample_type_to_plan(
        ProductNode::new("sample_000", ProductType::Sample, "sample", 1)
            .with_characteristics(vec![Characteristic::new("organism part", "plasma")]),
    )
    .unwrap();
    plan.add_assay_graph_to_plan(graph);
    plan.add_element_to_map("sample_000", "AT0").unwrap();

    let mut arm = StudyArm::new("ARM_01", 20);
    arm.add_item_to_arm_map(StudyCell::new("ARM_01_CELL_00"), Some(plan))
        .unwrap();
    let mut design = StudyDesign::new("observational");
    design.add_study_arm(arm).unwrap();
    design
}

#[test]
fn declared_quality_control_applies_by_default() {
    let design = design_with_qc();
    let plain = design
        .generate_isa_study(&MaterializeOptions {
            skip_quality_control: true,
            ..MaterializeOptions::default()
        })
        .unwrap();
    assert_eq!(plain.samples.len(), 20);
    assert_eq!(plain.assays[0].process_sequence.len(), 20);

    let with_qc = design
        .generate_isa_study(&MaterializeOptions::default())
        .unwrap();
    // 2 pre-run, 2 interspersed, 2 post-run
    assert_eq!(with_qc.samples.len(), 26);
    assert_eq!(with_qc.sources.len(), 26);
    assert_eq!(with_qc.process_sequence.len(), 26);
    assert_eq!(with_qc.assays[0].samples.len(), 26);
    assert_eq!(with_qc.assays[0].process_sequence.len(), 26);
}
