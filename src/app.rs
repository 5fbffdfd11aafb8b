use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::info;

use crate::config::StudyCreatorConfig;
use crate::design::codec::load_design;
use crate::design::external::ExternalStudyConfig;
use crate::design::materialize::MaterializeOptions;
use crate::design::study_design::StudyDesign;
use crate::error::IsaError;
use crate::fs_util::{read_text, write_atomic};
use crate::model::Investigation;

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub use_uuids: bool,
    pub skip_quality_control: bool,
    /// Date stamped on every process; today when unset.
    pub date: Option<String>,
}

#[derive(Debug, Clone)]
pub enum DesignSource {
    Codec(Utf8PathBuf),
    External(Utf8PathBuf),
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResult {
    pub design: String,
    pub arms: usize,
    pub sources: usize,
    pub samples: usize,
    pub processes: usize,
    pub assays: usize,
    pub data_files: usize,
}

impl SummaryResult {
    pub fn of(design: &StudyDesign, investigation: &Investigation) -> Self {
        let mut summary = SummaryResult {
            design: design.name.clone(),
            arms: design.study_arms().len(),
            sources: 0,
            samples: 0,
            processes: 0,
            assays: 0,
            data_files: 0,
        };
        for study in &investigation.studies {
            summary.sources += study.sources.len();
            summary.samples += study.samples.len();
            summary.processes += study.process_sequence.len();
            summary.assays += study.assays.len();
            for assay in &study.assays {
                summary.processes += assay.process_sequence.len();
                summary.data_files += assay.data_files.len();
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateResult {
    pub investigation: String,
    pub output: String,
    pub summary: SummaryResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub studies: usize,
    pub entities: usize,
    pub duplicate_ids: Vec<String>,
    pub stable: bool,
}

#[derive(Debug, Clone)]
pub struct App {
    config: StudyCreatorConfig,
}

impl App {
    pub fn new(config: StudyCreatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StudyCreatorConfig {
        &self.config
    }

    pub fn load_design(&self, source: &DesignSource) -> Result<StudyDesign, IsaError> {
        match source {
            DesignSource::Codec(path) => load_design(&read_text(path)?),
            DesignSource::External(path) => {
                ExternalStudyConfig::parse(&read_text(path)?)?.to_study_design()
            }
        }
    }

    pub fn materialize(
        &self,
        design: &StudyDesign,
        options: &GenerateOptions,
    ) -> Result<Investigation, IsaError> {
        let date = options
            .date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
        let materialize = MaterializeOptions {
            use_uuids: options.use_uuids,
            skip_quality_control: options.skip_quality_control,
            config: self.config.clone(),
            date,
        };
        design.generate_isa_investigation(&materialize)
    }

    /// Materializes `design` and writes the ISA-JSON to `out`.
    pub fn generate(
        &self,
        design: &StudyDesign,
        options: &GenerateOptions,
        out: &Utf8Path,
    ) -> Result<GenerateResult, IsaError> {
        let investigation = self.materialize(design, options)?;
        write_atomic(out, &investigation.to_json_string(None)?)?;
        info!(output = %out, "investigation written");
        Ok(GenerateResult {
            investigation: investigation.identifier.clone(),
            output: out.to_string(),
            summary: SummaryResult::of(design, &investigation),
        })
    }

    pub fn summary(
        &self,
        design: &StudyDesign,
        options: &GenerateOptions,
    ) -> Result<SummaryResult, IsaError> {
        let investigation = self.materialize(design, options)?;
        Ok(SummaryResult::of(design, &investigation))
    }

    /// Loads an ISA-JSON investigation, dumps it, reloads the dump and compares both renderings.
    pub fn check(&self, content: &str) -> Result<CheckResult, IsaError> {
        let investigation = Investigation::load_str(content)?;
        let first = investigation.to_json_string(None)?;
        let second = Investigation::load_str(&first)?.to_json_string(None)?;
        Ok(CheckResult {
            studies: investigation.studies.len(),
            entities: investigation.entity_ids().len(),
            duplicate_ids: investigation
                .duplicate_ids()
                .into_iter()
                .map(str::to_string)
                .collect(),
            stable: first == second,
        })
    }
}
