use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::IsaError;
use crate::model::{DataFileKind, OntologySource, Protocol};

pub const DEFAULT_CONFIG: &str = include_str!("../config/study-creator.yml");
pub const CONFIG_FILE_NAME: &str = "study-creator.yml";

pub const RUN_ORDER: &str = "run order";
pub const STUDY_CELL: &str = "study cell";
pub const DEFAULT_PERFORMER: &str = "Unknown";
pub const DEFAULT_STUDY_IDENTIFIER: &str = "s_01";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StudyCreatorConfig {
    pub study: StudyConfig,
    #[serde(default)]
    pub protocol_parameters: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub assay_options: Vec<AssayOption>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StudyConfig {
    pub filename: String,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub performers: Vec<PerformerConfig>,
    #[serde(default)]
    pub ontology_source_references: Vec<OntologySourceConfig>,
    #[serde(default)]
    pub protocols: Vec<ProtocolConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PerformerConfig {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OntologySourceConfig {
    pub name: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProtocolConfig {
    pub name: String,
    pub protocol_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AssayOption {
    pub measurement_type: String,
    pub technology_type: String,
    pub raw_data_file: DataFileKind,
}

impl StudyCreatorConfig {
    pub fn performer(&self) -> &str {
        self.study
            .performers
            .first()
            .map(|performer| performer.name.as_str())
            .unwrap_or(DEFAULT_PERFORMER)
    }

    pub fn study_identifier(&self) -> &str {
        self.study
            .identifier
            .as_deref()
            .unwrap_or(DEFAULT_STUDY_IDENTIFIER)
    }

    pub fn ontology_sources(&self) -> Vec<OntologySource> {
        self.study
            .ontology_source_references
            .iter()
            .map(|source| {
                OntologySource::with_details(
                    source.name.as_str(),
                    source.file.as_str(),
                    source.version.as_str(),
                    source.description.as_str(),
                )
            })
            .collect()
    }

    pub fn protocols(&self) -> Vec<Protocol> {
        self.study
            .protocols
            .iter()
            .map(|config| {
                let mut protocol = Protocol::new(config.name.as_str(), config.protocol_type.as_str())
                    .with_parameters(config.parameters.iter().map(String::as_str));
                protocol.description = config.description.clone();
                protocol
            })
            .collect()
    }

    /// The first configured protocol; it must declare the run order and study cell parameters.
    pub fn sampling_protocol(&self) -> Result<Protocol, IsaError> {
        let protocol = self
            .protocols()
            .into_iter()
            .next()
            .ok_or_else(|| IsaError::ConfigParse("no sampling protocol configured".to_string()))?;
        for parameter in [RUN_ORDER, STUDY_CELL] {
            if protocol.get_param(parameter).is_none() {
                return Err(IsaError::ConfigParse(format!(
                    "sampling protocol {} lacks the {parameter} parameter",
                    protocol.name
                )));
            }
        }
        Ok(protocol)
    }

    /// File class for data produced by a (measurement, technology) pair; Raw Data File when unlisted.
    pub fn raw_data_file(&self, measurement_type: &str, technology_type: &str) -> DataFileKind {
        self.assay_options
            .iter()
            .find(|option| {
                option.measurement_type == measurement_type
                    && option.technology_type == technology_type
            })
            .map(|option| option.raw_data_file)
            .unwrap_or(DataFileKind::RawData)
    }

    pub fn recommended_parameters(&self, protocol_type: &str) -> &[String] {
        self.protocol_parameters
            .get(protocol_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Default for StudyCreatorConfig {
    fn default() -> Self {
        ConfigLoader::parse(DEFAULT_CONFIG).unwrap_or_else(|_| StudyCreatorConfig {
            study: StudyConfig {
                filename: "s_study_01.txt".to_string(),
                identifier: None,
                performers: Vec::new(),
                ontology_source_references: Vec::new(),
                protocols: Vec::new(),
            },
            protocol_parameters: BTreeMap::new(),
            assay_options: Vec::new(),
        })
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Explicit path, then the user config directory, then the embedded default.
    pub fn resolve(path: Option<&Utf8Path>) -> Result<StudyCreatorConfig, IsaError> {
        let config_path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::user_config_path().filter(|path| path.as_std_path().exists()),
        };
        match config_path {
            Some(config_path) => {
                debug!(path = %config_path, "reading study creator config");
                let content = fs::read_to_string(config_path.as_std_path())
                    .map_err(|_| IsaError::ConfigRead(config_path.clone()))?;
                Self::parse(&content)
            }
            None => Self::parse(DEFAULT_CONFIG),
        }
    }

    pub fn parse(content: &str) -> Result<StudyCreatorConfig, IsaError> {
        serde_yaml::from_str(content).map_err(|err| IsaError::ConfigParse(err.to_string()))
    }

    pub fn user_config_path() -> Option<Utf8PathBuf> {
        ProjectDirs::from("", "", "isa-study-designer").and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.config_dir().join(CONFIG_FILE_NAME)).ok()
        })
    }
}
