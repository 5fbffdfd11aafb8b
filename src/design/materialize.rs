use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::{RUN_ORDER, STUDY_CELL, StudyCreatorConfig};
use crate::design::assay_graph::{AssayGraph, ProductNode, ProductType, ProtocolNode, SequenceNode};
use crate::design::element::{IS_TREATMENT_EPOCH, sequence_order_factor};
use crate::design::quality_control;
use crate::design::study_design::StudyDesign;
use crate::error::IsaError;
use crate::model::identifiers::{Identifier, n_digits, urlify};
use crate::model::{
    Assay, Commentable, DataFile, DataFileKind, FactorValue, IdGenerator, Material, ParameterValue,
    Process, ProcessIo, Protocol, Sample, Source, Study, plink_at,
};

/// Knobs for turning a design into a study.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializeOptions {
    pub use_uuids: bool,
    /// Leaves declared quality-control policies unapplied.
    pub skip_quality_control: bool,
    pub config: StudyCreatorConfig,
    /// Written into every process; empty leaves processes undated.
    pub date: String,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            use_uuids: false,
            skip_quality_control: false,
            config: StudyCreatorConfig::default(),
            date: String::new(),
        }
    }
}

/// Samples collected for one assay graph, in emission order.
struct AssayBatch {
    graph: AssayGraph,
    samples: Vec<Sample>,
}

pub(crate) struct Materializer<'a, 'b> {
    design: &'a StudyDesign,
    options: &'a MaterializeOptions,
    ids: Option<&'a mut (dyn IdGenerator + 'b)>,
    run_order: i64,
}

impl<'a, 'b> Materializer<'a, 'b> {
    pub(crate) fn new(
        design: &'a StudyDesign,
        options: &'a MaterializeOptions,
        ids: Option<&'a mut (dyn IdGenerator + 'b)>,
    ) -> Self {
        Self {
            design,
            options,
            ids,
            run_order: 0,
        }
    }

    pub(crate) fn run(mut self) -> Result<Study, IsaError> {
        let sampling = self.validate()?;
        let options = self.options;
        let config = &options.config;
        let identifier = self
            .design
            .identifier
            .clone()
            .unwrap_or_else(|| config.study_identifier().to_string());
        let mut study = Study::new(identifier, urlify(&config.study.filename));
        study.title = self.design.name.clone();
        study.description = self.design.description.clone();
        study.design_descriptors.extend(self.design.design_type.clone());
        study.add_protocol(sampling.clone())?;

        let sources = self.generate_sources(&mut study);
        info!(sources = study.sources.len(), "sources generated");

        let batches = self.generate_samples(&mut study, &sampling, &sources)?;
        info!(
            samples = study.samples.len(),
            processes = study.process_sequence.len(),
            "samples generated"
        );

        for batch in batches.into_values() {
            for node in batch.graph.protocol_nodes() {
                if study.get_protocol_by_id(&node.protocol_id(&batch.graph.id)).is_none() {
                    study.add_protocol(node.to_protocol(&batch.graph.id))?;
                }
            }
            let samples = match (&batch.graph.quality_control, options.skip_quality_control) {
                (Some(qc), false) => {
                    let run = quality_control::interleave(
                        &batch.graph.id,
                        qc,
                        &batch.samples,
                        &quality_control::QcContext {
                            sampling: &sampling,
                            performer: config.performer(),
                            date: &options.date,
                        },
                        self.ids.as_deref_mut(),
                    )?;
                    info!(
                        graph = %batch.graph.id,
                        qc_samples = run.qc_samples.len(),
                        "quality control samples interleaved"
                    );
                    study.sources.extend(run.qc_sources);
                    study.samples.extend(run.qc_samples);
                    study.process_sequence.extend(run.processes);
                    run.ordered_samples
                }
                _ => batch.samples,
            };
            let GeneratedAssay { assay, derived_samples } = generate_assay(
                &batch.graph,
                &samples,
                config,
                &options.date,
                self.ids.as_deref_mut(),
            )?;
            info!(
                assay = %assay.filename,
                processes = assay.process_sequence.len(),
                data_files = assay.data_files.len(),
                derived_samples = derived_samples.len(),
                "assay generated"
            );
            for sample in derived_samples {
                study.add_sample(sample);
            }
            study.assays.push(assay);
        }
        study.collect_categories();
        Ok(study)
    }

    /// Everything that can fail is checked before the first entity is built.
    fn validate(&self) -> Result<Protocol, IsaError> {
        let sampling = self.options.config.sampling_protocol()?;
        for arm in self.design.study_arms() {
            for plan in arm.sample_assay_plans() {
                let mut terms = BTreeSet::new();
                for node in plan.sample_plan() {
                    if !terms.insert(node.sample_term()) {
                        return Err(IsaError::DuplicateName {
                            kind: "sample type".to_string(),
                            name: node.sample_term(),
                        });
                    }
                }
                for graph in plan.assay_plan() {
                    if graph.start_nodes().is_empty() {
                        return Err(IsaError::topology(&graph.id, "the workflow has no start node"));
                    }
                    for node in graph.nodes() {
                        if let SequenceNode::Protocol(protocol) = node {
                            if graph.previous_protocol_nodes(&protocol.id)?.len() > 1 {
                                debug!(
                                    graph = %graph.id,
                                    node = %protocol.id,
                                    "protocol has several upstream protocols, processes stay unlinked"
                                );
                            }
                        }
                    }
                }
            }
        }
        Ok(sampling)
    }

    fn assign_id(&mut self, kind: &str, name: &str) -> String {
        Identifier::assign(kind, name, self.ids.as_deref_mut())
    }

    /// Group numbers come from the arm names when those are distinct, else from arm order.
    fn group_numbers(&self) -> Vec<i64> {
        let numeric: Vec<i64> = self.design.study_arms().iter().map(|arm| arm.numeric_id()).collect();
        let distinct: BTreeSet<i64> = numeric.iter().copied().collect();
        let usable = numeric.iter().all(|id| *id >= 0) && distinct.len() == numeric.len();
        if usable {
            numeric
        } else {
            (1..=numeric.len() as i64).collect()
        }
    }

    /// Arm name to the `(id, name)` of each of its subjects.
    fn generate_sources(&mut self, study: &mut Study) -> IndexMap<String, Vec<(String, String)>> {
        let mut by_arm = IndexMap::new();
        let groups = self.group_numbers();
        let design = self.design;
        for (arm, group) in design.study_arms().iter().zip(groups) {
            let mut characteristics = vec![arm.source_type.clone()];
            let mut extra: Vec<_> = arm.source_characteristics().iter().cloned().collect();
            extra.sort_by(|a, b| a.category.term.cmp(&b.category.term));
            characteristics.extend(extra);
            let width = n_digits(arm.group_size);
            let mut ids = Vec::with_capacity(arm.group_size);
            for n in 1..=arm.group_size {
                let name = format!("GRP{group}_SUBJ{n:0width$}").replace(' ', "-");
                let mut source = Source::new(name.as_str()).with_characteristics(characteristics.clone());
                source.id = self.assign_id("source", &name);
                ids.push((source.id.clone(), name));
                study.add_source(source);
            }
            debug!(arm = %arm.name, group, sources = ids.len(), "arm sources");
            by_arm.insert(arm.name.clone(), ids);
        }
        by_arm
    }

    fn generate_samples(
        &mut self,
        study: &mut Study,
        sampling: &Protocol,
        sources: &IndexMap<String, Vec<(String, String)>>,
    ) -> Result<IndexMap<String, AssayBatch>, IsaError> {
        let run_order_param = sampling
            .get_param(RUN_ORDER)
            .cloned()
            .ok_or_else(|| IsaError::missing("protocol parameter", RUN_ORDER))?;
        let study_cell_param = sampling
            .get_param(STUDY_CELL)
            .cloned()
            .ok_or_else(|| IsaError::missing("protocol parameter", STUDY_CELL))?;
        let performer = self.options.config.performer().to_string();
        let mut batches: IndexMap<String, AssayBatch> = IndexMap::new();
        let design = self.design;
        for arm in design.study_arms() {
            let arm_sources = sources.get(&arm.name).map(Vec::as_slice).unwrap_or(&[]);
            for (epoch_nb, entry) in arm.arm_map().iter().enumerate() {
                let Some(plan) = &entry.plan else {
                    continue;
                };
                let cell = &entry.cell;
                let treatment_flag = if cell.has_treatments() { "YES" } else { "NO" };
                let mut factor_values = vec![FactorValue::new(sequence_order_factor(), epoch_nb as i64)];
                factor_values.extend(cell.factor_values());
                for value in &factor_values {
                    study.add_factor(value.factor_name.clone());
                }
                for node in plan.sample_plan() {
                    let graphs = plan.graphs_for_sample(&node.id);
                    let term = node.sample_term();
                    for (source_id, source_name) in arm_sources {
                        for k in 1..=node.size {
                            let name = format!("{source_name}_{}_SMP-{term}-{k}", cell.name).replace(' ', "-");
                            let mut sample = Sample::new(name.as_str());
                            sample.id = self.assign_id("sample", &name);
                            sample.characteristics = node.characteristics.clone();
                            sample.factor_values = factor_values.clone();
                            sample.derives_from = vec![source_id.clone()];
                            sample.add_comment(IS_TREATMENT_EPOCH, treatment_flag);

                            self.run_order += 1;
                            let process_name = format!("sampling-{name}");
                            let mut process = Process::new(process_name.as_str(), sampling.id.as_str());
                            process.id = self.assign_id("process", &process_name);
                            process.performer = performer.clone();
                            process.date = self.options.date.clone();
                            process.inputs.push(ProcessIo::Source(source_id.clone()));
                            process.outputs.push(ProcessIo::Sample(sample.id.clone()));
                            process.parameter_values.push(ParameterValue::new(
                                run_order_param.clone(),
                                self.run_order,
                                None,
                            )?);
                            process.parameter_values.push(ParameterValue::new(
                                study_cell_param.clone(),
                                cell.name.as_str(),
                                None,
                            )?);
                            study.process_sequence.push(process);

                            for graph in &graphs {
                                batches
                                    .entry(graph.id.clone())
                                    .or_insert_with(|| AssayBatch {
                                        graph: (*graph).clone(),
                                        samples: Vec::new(),
                                    })
                                    .samples
                                    .push(sample.clone());
                            }
                            study.add_sample(sample);
                        }
                    }
                }
            }
        }
        Ok(batches)
    }
}

/// An assay plus the samples its sample nodes derived. Those belong in the study's sample list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAssay {
    pub assay: Assay,
    pub derived_samples: Vec<Sample>,
}

/// Expands one assay workflow over its input samples.
pub fn generate_assay(
    graph: &AssayGraph,
    samples: &[Sample],
    config: &StudyCreatorConfig,
    date: &str,
    ids: Option<&mut (dyn IdGenerator + '_)>,
) -> Result<GeneratedAssay, IsaError> {
    let measurement = graph.measurement_type.term.clone();
    let technology = graph.technology_type.term.clone();
    let filename = urlify(&format!("a_{}_{measurement}_{technology}.txt", graph.id));
    let mut walk = AssayWalk {
        graph,
        performer: config.performer(),
        date,
        data_file_kind: config.raw_data_file(&measurement, &technology),
        ids,
        assay: Assay::new(
            filename,
            graph.measurement_type.clone(),
            graph.technology_type.clone(),
        ),
        counters: HashMap::new(),
        processes: Vec::new(),
        derived_samples: Vec::new(),
        start_idx: 0,
        origin: String::new(),
    };
    let starts = graph.start_nodes();
    for (i, start) in starts.iter().enumerate() {
        let size = start.multiplicity();
        for (j, sample) in samples.iter().enumerate() {
            for k in 0..size {
                walk.start_idx = i * samples.len() * size + j * size + k + 1;
                walk.origin = sample.id.clone();
                walk.counters.clear();
                walk.visit(start, &ProcessIo::Sample(sample.id.clone()), None)?;
                walk.assay.process_sequence.append(&mut walk.processes);
            }
        }
    }
    let derived_samples = walk.derived_samples;
    let mut assay = walk.assay;
    assay.samples = samples
        .iter()
        .chain(&derived_samples)
        .map(|sample| sample.id.clone())
        .collect();
    assay.collect_categories();
    debug!(
        assay = %assay.filename,
        samples = samples.len(),
        derived = derived_samples.len(),
        materials = assay.other_material.len(),
        "assay walk complete"
    );
    Ok(GeneratedAssay {
        assay,
        derived_samples,
    })
}

struct AssayWalk<'a, 'b> {
    graph: &'a AssayGraph,
    performer: &'a str,
    date: &'a str,
    data_file_kind: DataFileKind,
    ids: Option<&'a mut (dyn IdGenerator + 'b)>,
    assay: Assay,
    counters: HashMap<String, usize>,
    /// Processes of the current walk; linking only happens inside one walk.
    processes: Vec<Process>,
    derived_samples: Vec<Sample>,
    start_idx: usize,
    origin: String,
}

impl AssayWalk<'_, '_> {
    fn bump(&mut self, key: &str) -> usize {
        let counter = self.counters.entry(key.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    fn assign_id(&mut self, kind: &str, name: &str) -> String {
        Identifier::assign(kind, name, self.ids.as_deref_mut())
    }

    fn visit(&mut self, node: &SequenceNode, input: &ProcessIo, parent: Option<usize>) -> Result<(), IsaError> {
        let (material, process) = match node {
            SequenceNode::Protocol(protocol) => {
                let ix = self.emit_process(protocol, input)?;
                (input.clone(), Some(ix))
            }
            SequenceNode::Product(product) => {
                let output = self.emit_product(product, input);
                if let Some(parent) = parent {
                    self.processes[parent].outputs.push(output.clone());
                }
                (output, None)
            }
        };
        let graph = self.graph;
        for next in graph.next_nodes(node.id())? {
            for _ in 0..next.multiplicity() {
                self.visit(next, &material, process)?;
            }
        }
        Ok(())
    }

    fn emit_process(&mut self, node: &ProtocolNode, input: &ProcessIo) -> Result<usize, IsaError> {
        let counter = self.bump(&node.name);
        let name = format!(
            "{}-S{}-{}-Acquisition-R{counter}",
            self.graph.id,
            self.start_idx,
            urlify(&node.name)
        );
        let mut process = Process::new(name.as_str(), node.protocol_id(&self.graph.id));
        process.id = self.assign_id("process", &name);
        process.performer = self.performer.to_string();
        process.date = self.date.to_string();
        process.parameter_values = node.parameter_values.clone();
        process.inputs.push(input.clone());
        self.processes.push(process);
        let ix = self.processes.len() - 1;

        let graph = self.graph;
        let upstream = graph.previous_protocol_nodes(&node.id)?;
        if let [previous] = upstream.as_slice() {
            let previous_id = previous.protocol_id(&graph.id);
            if let Some(prev_ix) = self.processes[..ix]
                .iter()
                .rposition(|process| process.executes_protocol == previous_id)
            {
                plink_at(&mut self.processes, prev_ix, ix)?;
            }
        }
        Ok(ix)
    }

    fn emit_product(&mut self, node: &ProductNode, input: &ProcessIo) -> ProcessIo {
        let prefix = self.graph.id.clone();
        match node.node_type {
            ProductType::Source => input.clone(),
            ProductType::Sample => {
                let counter = self.bump(node.node_type.as_str());
                let name = format!("{prefix}-S{}-Sample-R{counter}", self.start_idx);
                let mut sample = Sample::new(name.as_str());
                sample.id = self.assign_id("sample", &name);
                sample.characteristics = node.characteristics.clone();
                sample.derives_from = vec![input.id().to_string()];
                let output = ProcessIo::Sample(sample.id.clone());
                self.derived_samples.push(sample);
                output
            }
            ProductType::Extract | ProductType::LabeledExtract => {
                let counter = self.bump(node.node_type.as_str());
                let (label, mut material) = if node.node_type == ProductType::Extract {
                    let name = format!("{prefix}-S{}-Extract-R{counter}", self.start_idx);
                    ("Extract", Material::extract(name))
                } else {
                    let name = format!("{prefix}-S{}-LE-R{counter}", self.start_idx);
                    ("LE", Material::labeled_extract(name))
                };
                material.id = self.assign_id("material", &material.name);
                material.characteristics = node.characteristics.clone();
                material.derives_from = vec![input.id().to_string()];
                debug!(material = %material.name, kind = label, "material emitted");
                let output = ProcessIo::Material(material.id.clone());
                self.assay.other_material.push(material);
                output
            }
            ProductType::DataFile => {
                let counter = self.bump(&node.name);
                let extension = match node.extension.as_deref() {
                    Some(ext) if ext.starts_with('.') => ext.to_string(),
                    Some(ext) if !ext.is_empty() => format!(".{ext}"),
                    _ => String::new(),
                };
                let filename = format!(
                    "{prefix}-S{}-{}-R{counter}{extension}",
                    self.start_idx,
                    urlify(&node.name)
                );
                let mut file = DataFile::new(filename.as_str(), self.data_file_kind);
                file.id = self.assign_id("data_file", &filename);
                file.generated_from = vec![self.origin.clone()];
                let output = ProcessIo::DataFile(file.id.clone());
                self.assay.data_files.push(file);
                output
            }
        }
    }
}
