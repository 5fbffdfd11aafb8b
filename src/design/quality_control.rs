use tracing::debug;

use crate::config::{RUN_ORDER, STUDY_CELL};
use crate::design::assay_graph::{ProductNode, QualityControl};
use crate::error::IsaError;
use crate::model::identifiers::Identifier;
use crate::model::{
    Characteristic, IdGenerator, ParameterValue, Process, ProcessIo, Protocol, QcSampleType, Sample,
    Source, Value,
};

pub const QC_SOURCE_NAME: &str = "source_QC";
pub const QC_SAMPLE_NAME: &str = "sample_QC";

/// Run-order value given to every QC sampling process.
pub const QC_RUN_ORDER: i64 = -1;

pub struct QcContext<'a> {
    pub sampling: &'a Protocol,
    pub performer: &'a str,
    pub date: &'a str,
}

/// QC entities for one assay plus the full sample sequence the assay is rebuilt from.
#[derive(Debug, Default)]
pub struct QcRun {
    pub qc_sources: Vec<Source>,
    pub qc_samples: Vec<Sample>,
    pub processes: Vec<Process>,
    pub ordered_samples: Vec<Sample>,
}

impl QcRun {
    #[allow(clippy::too_many_arguments)]
    fn emit(
        &mut self,
        name_tag: &str,
        index: usize,
        qc_type: QcSampleType,
        characteristics: Vec<Characteristic>,
        context: &QcContext<'_>,
        batch: &str,
        ids: &mut Option<&mut (dyn IdGenerator + '_)>,
    ) -> Result<Sample, IsaError> {
        let source_name = format!("SRC-QC-{name_tag}-{batch}_{QC_SOURCE_NAME}_{index:04}");
        let sample_name = format!("SMP-QC-{name_tag}-{batch}_{QC_SAMPLE_NAME}_{index:04}");

        let mut source = Source::new(source_name.as_str());
        source.id = Identifier::assign("source", &source_name, ids.as_deref_mut());
        let mut sample = Sample::quality_control(sample_name.as_str(), qc_type);
        sample.id = Identifier::assign("sample", &sample_name, ids.as_deref_mut());
        sample.characteristics = characteristics;
        sample.derives_from = vec![source.id.clone()];

        let process_name = format!("sampling-{sample_name}");
        let mut process = Process::new(process_name.as_str(), context.sampling.id.as_str());
        process.id = Identifier::assign("process", &process_name, ids.as_deref_mut());
        process.performer = context.performer.to_string();
        process.date = context.date.to_string();
        process.inputs.push(ProcessIo::Source(source.id.clone()));
        process.outputs.push(ProcessIo::Sample(sample.id.clone()));
        for (parameter, value) in [
            (RUN_ORDER, Value::from(QC_RUN_ORDER)),
            (STUDY_CELL, Value::from(batch)),
        ] {
            let category = context
                .sampling
                .get_param(parameter)
                .cloned()
                .ok_or_else(|| IsaError::missing("protocol parameter", parameter))?;
            process
                .parameter_values
                .push(ParameterValue::new(category, value, None)?);
        }

        self.qc_sources.push(source);
        self.qc_samples.push(sample.clone());
        self.processes.push(process);
        Ok(sample)
    }
}

/// The i-th characteristic of a run node, reusing the last one once they run out.
fn nth_characteristic(node: &ProductNode, i: usize) -> Vec<Characteristic> {
    node.characteristics
        .get(i)
        .or_else(|| node.characteristics.last())
        .cloned()
        .into_iter()
        .collect()
}

/// Surrounds the name-sorted `samples` with pre-run and post-run QC samples and
/// places one interspersed QC sample after every `interval`-th real sample.
pub fn interleave(
    batch: &str,
    quality_control: &QualityControl,
    samples: &[Sample],
    context: &QcContext<'_>,
    mut ids: Option<&mut (dyn IdGenerator + '_)>,
) -> Result<QcRun, IsaError> {
    let mut run = QcRun::default();
    let mut sorted: Vec<Sample> = samples.to_vec();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut pre = Vec::new();
    if let Some(node) = &quality_control.pre_run_sample_type {
        for i in 0..node.size {
            pre.push(run.emit(
                "PRE",
                i,
                QcSampleType::PreRun,
                nth_characteristic(node, i),
                context,
                batch,
                &mut ids,
            )?);
        }
    }

    let mut interspersed: Vec<(usize, Sample)> = Vec::new();
    for (t, (node, interval)) in quality_control.interspersed_sample_types().iter().enumerate() {
        let interval = *interval;
        let tag = if t == 0 { "INT".to_string() } else { format!("INT{t}") };
        for k in 1..=sorted.len() / interval {
            let position = k * interval;
            let sample = run.emit(
                &tag,
                position,
                QcSampleType::Interspersed,
                node.characteristics.clone(),
                context,
                batch,
                &mut ids,
            )?;
            interspersed.push((position, sample));
        }
    }
    // stable: QC samples sharing a slot keep the declaration order of their types
    interspersed.sort_by_key(|(position, _)| *position);

    let mut post = Vec::new();
    if let Some(node) = &quality_control.post_run_sample_type {
        for i in 0..node.size {
            post.push(run.emit(
                "POST",
                i,
                QcSampleType::PostRun,
                nth_characteristic(node, i),
                context,
                batch,
                &mut ids,
            )?);
        }
    }

    let mut ordered = pre;
    let mut pending = interspersed.into_iter().peekable();
    for (seen, sample) in sorted.into_iter().enumerate() {
        ordered.push(sample);
        while let Some((_, qc)) = pending.next_if(|(position, _)| *position == seen + 1) {
            ordered.push(qc);
        }
    }
    ordered.extend(pending.map(|(_, qc)| qc));
    ordered.extend(post);
    debug!(
        batch,
        qc = run.qc_samples.len(),
        total = ordered.len(),
        "quality control sequence built"
    );
    run.ordered_samples = ordered;
    Ok(run)
}
