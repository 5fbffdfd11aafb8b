use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::IsaError;
use crate::model::factor::StudyFactor;
use crate::model::ontology::{OntologyAnnotation, OntologySource};
use crate::model::process::ProcessIo;
use crate::model::protocol::{Protocol, ProtocolParameter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IoKind {
    Source,
    Sample,
    Material,
    DataFile,
}

impl IoKind {
    pub fn namespace(&self) -> &'static str {
        match self {
            IoKind::Source => "source",
            IoKind::Sample => "sample",
            IoKind::Material => "material",
            IoKind::DataFile => "data_file",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        [
            IoKind::Source,
            IoKind::Sample,
            IoKind::Material,
            IoKind::DataFile,
        ]
        .into_iter()
        .find(|kind| id.starts_with(&format!("#{}/", kind.namespace())))
    }
}

/// Index of already loaded entities used to resolve `@id` references while
/// an investigation is read. Lives exactly as long as one `from_dict` call.
#[derive(Debug, Default)]
pub struct LoaderStore {
    term_sources: HashMap<String, OntologySource>,
    characteristic_categories: HashMap<String, OntologyAnnotation>,
    units: HashMap<String, OntologyAnnotation>,
    factors: HashMap<String, StudyFactor>,
    protocols: HashMap<String, Protocol>,
    parameters: HashMap<String, ProtocolParameter>,
    materials: HashMap<String, IoKind>,
    processes: HashSet<String>,
}

impl LoaderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_term_source(&mut self, source: &OntologySource) {
        self.term_sources
            .insert(source.name.clone(), source.clone());
    }

    pub fn register_characteristic_category(&mut self, category: &OntologyAnnotation) {
        self.characteristic_categories
            .insert(category.id.clone(), category.clone());
    }

    pub fn register_unit(&mut self, unit: &OntologyAnnotation) {
        self.units.insert(unit.id.clone(), unit.clone());
    }

    pub fn register_factor(&mut self, factor: &StudyFactor) {
        self.factors.insert(factor.id.clone(), factor.clone());
    }

    pub fn register_protocol(&mut self, protocol: &Protocol) {
        for parameter in &protocol.parameters {
            self.register_parameter(parameter);
        }
        self.protocols.insert(protocol.id.clone(), protocol.clone());
    }

    pub fn register_parameter(&mut self, parameter: &ProtocolParameter) {
        self.parameters
            .insert(parameter.id.clone(), parameter.clone());
    }

    pub fn register_material(&mut self, id: &str, kind: IoKind) {
        self.materials.insert(id.to_string(), kind);
    }

    pub fn register_process(&mut self, id: &str) {
        self.processes.insert(id.to_string());
    }

    pub fn term_source(&self, name: &str) -> Result<&OntologySource, IsaError> {
        self.term_sources
            .get(name)
            .ok_or_else(|| IsaError::missing("ontology source", name))
    }

    pub fn characteristic_category(&self, id: &str) -> Result<OntologyAnnotation, IsaError> {
        lookup(&self.characteristic_categories, "characteristic category", id)
    }

    pub fn unit(&self, id: &str) -> Result<OntologyAnnotation, IsaError> {
        lookup(&self.units, "unit", id)
    }

    pub fn factor(&self, id: &str) -> Result<StudyFactor, IsaError> {
        lookup(&self.factors, "factor", id)
    }

    pub fn protocol(&self, id: &str) -> Result<Protocol, IsaError> {
        lookup(&self.protocols, "protocol", id)
    }

    pub fn parameter(&self, id: &str) -> Result<ProtocolParameter, IsaError> {
        lookup(&self.parameters, "protocol parameter", id)
    }

    pub fn has_process(&self, id: &str) -> bool {
        self.processes.contains(id)
    }

    /// Dispatches on the id namespace first, then on whatever was registered under that id.
    pub fn resolve_io(&self, id: &str) -> Result<ProcessIo, IsaError> {
        match (IoKind::from_id(id), self.materials.get(id)) {
            (_, Some(kind)) => Ok(ProcessIo::new(*kind, id)),
            (Some(hint), None) => Err(IsaError::missing(hint.namespace(), id)),
            (None, None) => Err(IsaError::missing("material", id)),
        }
    }

    pub fn expect_material(&self, id: &str, allowed: &[IoKind]) -> Result<IoKind, IsaError> {
        let io = self.resolve_io(id)?;
        if allowed.contains(&io.kind()) {
            Ok(io.kind())
        } else {
            Err(IsaError::missing(
                &allowed
                    .iter()
                    .map(|kind| kind.namespace())
                    .collect::<Vec<_>>()
                    .join("|"),
                id,
            ))
        }
    }

    pub fn len(&self) -> usize {
        self.term_sources.len()
            + self.characteristic_categories.len()
            + self.units.len()
            + self.factors.len()
            + self.protocols.len()
            + self.parameters.len()
            + self.materials.len()
            + self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        debug!(entries = self.len(), "clearing loader store");
        *self = Self::default();
    }
}

fn lookup<T: Clone>(index: &HashMap<String, T>, kind: &str, id: &str) -> Result<T, IsaError> {
    index
        .get(id)
        .cloned()
        .ok_or_else(|| IsaError::missing(kind, id))
}
