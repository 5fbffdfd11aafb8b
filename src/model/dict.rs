use std::cell::Cell;

use camino::Utf8PathBuf;
use serde_json::{Map, Value, json};

use crate::error::IsaError;
use crate::model::identifiers::snake_case;
use crate::model::store::LoaderStore;

pub const REMOTE_CONTEXT: &str =
    "https://raw.githubusercontent.com/ISA-tools/isa-api/master/isatools/resources/json-context";

/// Conversion between model entities and ISA-JSON shaped values.
pub trait IsaDict: Sized {
    const LD_TYPE: &'static str;

    fn to_dict(&self, ld: Option<&LdContext>) -> Value;

    fn from_dict(value: &Value, store: &mut LoaderStore) -> Result<Self, IsaError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Vocabulary {
    #[default]
    Obo,
    Sdo,
    Wd,
    Sio,
}

impl Vocabulary {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vocabulary::Obo => "obo",
            Vocabulary::Sdo => "sdo",
            Vocabulary::Wd => "wd",
            Vocabulary::Sio => "sio",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextPath {
    Remote(String),
    Local(Utf8PathBuf),
}

#[derive(Debug)]
pub struct LdContext {
    pub vocabulary: Vocabulary,
    pub context_path: ContextPath,
    pub all_in_one: bool,
    anonymous: Cell<u64>,
}

impl Default for LdContext {
    fn default() -> Self {
        Self::new(Vocabulary::Obo, ContextPath::Remote(REMOTE_CONTEXT.to_string()))
    }
}

impl LdContext {
    pub fn new(vocabulary: Vocabulary, context_path: ContextPath) -> Self {
        Self {
            vocabulary,
            context_path,
            all_in_one: true,
            anonymous: Cell::new(0),
        }
    }

    pub fn per_class(mut self) -> Self {
        self.all_in_one = false;
        self
    }

    pub fn context_for(&self, type_name: &str) -> String {
        let vocab = self.vocabulary.as_str();
        let filename = if self.all_in_one {
            format!("isa_allinone_{vocab}_context.jsonld")
        } else {
            format!("isa_{}_{vocab}_context.jsonld", snake_case(context_name(type_name)))
        };
        match &self.context_path {
            ContextPath::Remote(base) => {
                format!("{}/{vocab}/{filename}", base.trim_end_matches('/'))
            }
            ContextPath::Local(dir) => dir.join(vocab).join(filename).to_string(),
        }
    }

    pub fn decorate(&self, type_name: &str, map: &mut Map<String, Value>) {
        map.insert("@type".to_string(), Value::String(type_name.to_string()));
        map.insert(
            "@context".to_string(),
            Value::String(self.context_for(type_name)),
        );
        if !map.contains_key("@id") {
            let next = self.anonymous.get() + 1;
            self.anonymous.set(next);
            map.insert(
                "@id".to_string(),
                Value::String(format!("#{}/{next}", snake_case(type_name))),
            );
        }
    }
}

fn context_name(type_name: &str) -> &str {
    match type_name {
        "OntologySource" => "OntologySourceReference",
        "Characteristic" => "MaterialAttributeValue",
        "StudyFactor" => "Factor",
        "DataFile" => "Data",
        other => other,
    }
}

pub(crate) fn finish(ld: Option<&LdContext>, type_name: &str, mut map: Map<String, Value>) -> Value {
    if let Some(ld) = ld {
        ld.decorate(type_name, &mut map);
    }
    Value::Object(map)
}

pub(crate) fn reference(id: &str) -> Value {
    json!({ "@id": id })
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn as_object<'a>(
    value: &'a Value,
    class: &str,
) -> Result<&'a Map<String, Value>, IsaError> {
    value
        .as_object()
        .ok_or_else(|| IsaError::type_violation(class, "<self>", value.to_string(), json_type(value)))
}

pub(crate) fn str_field(
    map: &Map<String, Value>,
    class: &str,
    key: &str,
) -> Result<String, IsaError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(IsaError::type_violation(
            class,
            key,
            other.to_string(),
            json_type(other),
        )),
    }
}

pub(crate) fn opt_str_field(
    map: &Map<String, Value>,
    class: &str,
    key: &str,
) -> Result<Option<String>, IsaError> {
    let value = str_field(map, class, key)?;
    Ok((!value.is_empty()).then_some(value))
}

pub(crate) fn array_field<'a>(
    map: &'a Map<String, Value>,
    class: &str,
    key: &str,
) -> Result<&'a [Value], IsaError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(other) => Err(IsaError::type_violation(
            class,
            key,
            other.to_string(),
            json_type(other),
        )),
    }
}

pub(crate) fn ref_id(value: &Value, class: &str, attribute: &str) -> Result<String, IsaError> {
    match value.get("@id") {
        Some(Value::String(id)) => Ok(id.clone()),
        _ => Err(IsaError::type_violation(
            class,
            attribute,
            value.to_string(),
            json_type(value),
        )),
    }
}

pub(crate) fn opt_ref_id(
    map: &Map<String, Value>,
    class: &str,
    key: &str,
) -> Result<Option<String>, IsaError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => ref_id(value, class, key).map(Some),
    }
}

pub(crate) fn to_dicts<T: IsaDict>(items: &[T], ld: Option<&LdContext>) -> Value {
    Value::Array(items.iter().map(|item| item.to_dict(ld)).collect())
}

pub(crate) fn from_dicts<T: IsaDict>(
    map: &Map<String, Value>,
    class: &str,
    key: &str,
    store: &mut LoaderStore,
) -> Result<Vec<T>, IsaError> {
    array_field(map, class, key)?
        .iter()
        .map(|item| T::from_dict(item, store))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ld_decoration_adds_type_context_and_id() {
        let ld = LdContext::default();
        let mut map = Map::new();
        ld.decorate("Comment", &mut map);
        assert_eq!(map["@type"], "Comment");
        assert_eq!(
            map["@context"],
            format!("{REMOTE_CONTEXT}/obo/isa_allinone_obo_context.jsonld")
        );
        assert_eq!(map["@id"], "#comment/1");
    }

    #[test]
    fn per_class_context_uses_exception_names() {
        let ld = LdContext::new(
            Vocabulary::Sdo,
            ContextPath::Local(Utf8PathBuf::from("/contexts")),
        )
        .per_class();
        assert_eq!(
            ld.context_for("StudyFactor"),
            "/contexts/sdo/isa_factor_sdo_context.jsonld"
        );
    }
}
