use serde_json::{Map, Value as Json};

use crate::error::IsaError;
use crate::impl_commentable;
use crate::model::comment::Comment;
use crate::model::dict::{
    IsaDict, LdContext, array_field, as_object, finish, from_dicts, opt_ref_id, ref_id, reference,
    str_field, to_dicts,
};
use crate::model::identifiers::Identifier;
use crate::model::protocol::ParameterValue;
use crate::model::store::{IoKind, LoaderStore};

/// Weak reference to a process input or output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProcessIo {
    Source(String),
    Sample(String),
    Material(String),
    DataFile(String),
}

impl ProcessIo {
    pub fn new(kind: IoKind, id: impl Into<String>) -> Self {
        let id = id.into();
        match kind {
            IoKind::Source => ProcessIo::Source(id),
            IoKind::Sample => ProcessIo::Sample(id),
            IoKind::Material => ProcessIo::Material(id),
            IoKind::DataFile => ProcessIo::DataFile(id),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ProcessIo::Source(id)
            | ProcessIo::Sample(id)
            | ProcessIo::Material(id)
            | ProcessIo::DataFile(id) => id,
        }
    }

    pub fn kind(&self) -> IoKind {
        match self {
            ProcessIo::Source(_) => IoKind::Source,
            ProcessIo::Sample(_) => IoKind::Sample,
            ProcessIo::Material(_) => IoKind::Material,
            ProcessIo::DataFile(_) => IoKind::DataFile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Process {
    pub id: String,
    pub name: String,
    /// Id of the protocol this process executes.
    pub executes_protocol: String,
    pub performer: String,
    pub date: String,
    pub parameter_values: Vec<ParameterValue>,
    pub inputs: Vec<ProcessIo>,
    pub outputs: Vec<ProcessIo>,
    pub prev_process: Option<String>,
    pub next_process: Option<String>,
    pub comments: Vec<Comment>,
}

impl Process {
    pub fn new(name: impl Into<String>, executes_protocol: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Identifier::ordinal("process", &name),
            name,
            executes_protocol: executes_protocol.into(),
            ..Self::default()
        }
    }
}

impl_commentable!(Process);

pub fn plink(prev: &mut Process, next: &mut Process) {
    prev.next_process = Some(next.id.clone());
    next.prev_process = Some(prev.id.clone());
}

/// `plink` for two processes living in the same sequence.
pub fn plink_at(processes: &mut [Process], prev: usize, next: usize) -> Result<(), IsaError> {
    if prev == next || prev >= processes.len() || next >= processes.len() {
        return Err(IsaError::InvalidValue(format!(
            "cannot link process {prev} to process {next}"
        )));
    }
    let (prev, next) = if prev < next {
        let (head, tail) = processes.split_at_mut(next);
        (&mut head[prev], &mut tail[0])
    } else {
        let (head, tail) = processes.split_at_mut(prev);
        (&mut tail[0], &mut head[next])
    };
    plink(prev, next);
    Ok(())
}

fn io_dicts(items: &[ProcessIo]) -> Json {
    Json::Array(items.iter().map(|item| reference(item.id())).collect())
}

fn io_refs(
    map: &Map<String, Json>,
    key: &str,
    store: &LoaderStore,
) -> Result<Vec<ProcessIo>, IsaError> {
    array_field(map, "Process", key)?
        .iter()
        .map(|item| store.resolve_io(&ref_id(item, "Process", key)?))
        .collect()
}

impl IsaDict for Process {
    const LD_TYPE: &'static str = "Process";

    fn to_dict(&self, ld: Option<&LdContext>) -> Json {
        let mut map = Map::new();
        map.insert("@id".to_string(), Json::String(self.id.clone()));
        map.insert("name".to_string(), Json::String(self.name.clone()));
        map.insert(
            "executesProtocol".to_string(),
            reference(&self.executes_protocol),
        );
        map.insert("date".to_string(), Json::String(self.date.clone()));
        map.insert("performer".to_string(), Json::String(self.performer.clone()));
        map.insert(
            "parameterValues".to_string(),
            to_dicts(&self.parameter_values, ld),
        );
        map.insert("inputs".to_string(), io_dicts(&self.inputs));
        map.insert("outputs".to_string(), io_dicts(&self.outputs));
        if let Some(prev) = &self.prev_process {
            map.insert("previousProcess".to_string(), reference(prev));
        }
        if let Some(next) = &self.next_process {
            map.insert("nextProcess".to_string(), reference(next));
        }
        map.insert("comments".to_string(), to_dicts(&self.comments, ld));
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Json, store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "Process")?;
        let name = str_field(map, "Process", "name")?;
        let id = str_field(map, "Process", "@id")?;
        let protocol = map
            .get("executesProtocol")
            .ok_or_else(|| IsaError::missing("protocol", "<absent>"))?;
        let executes_protocol = store.protocol(&ref_id(protocol, "Process", "executesProtocol")?)?.id;
        let process = Self {
            id: if id.is_empty() {
                Identifier::ordinal("process", &name)
            } else {
                id
            },
            name,
            executes_protocol,
            performer: str_field(map, "Process", "performer")?,
            date: str_field(map, "Process", "date")?,
            parameter_values: from_dicts(map, "Process", "parameterValues", store)?,
            inputs: io_refs(map, "inputs", store)?,
            outputs: io_refs(map, "outputs", store)?,
            prev_process: opt_ref_id(map, "Process", "previousProcess")?,
            next_process: opt_ref_id(map, "Process", "nextProcess")?,
            comments: from_dicts(map, "Process", "comments", store)?,
        };
        store.register_process(&process.id);
        Ok(process)
    }
}

/// Loads a process sequence and checks that every prev/next link stays inside it.
pub fn process_sequence_from_dicts(
    items: &[Json],
    store: &mut LoaderStore,
) -> Result<Vec<Process>, IsaError> {
    let processes = items
        .iter()
        .map(|item| Process::from_dict(item, store))
        .collect::<Result<Vec<_>, IsaError>>()?;
    for process in &processes {
        for link in [&process.prev_process, &process.next_process]
            .into_iter()
            .flatten()
        {
            if !store.has_process(link) {
                return Err(IsaError::missing("process", link.clone()));
            }
        }
    }
    Ok(processes)
}
