use serde_json::{Map, Value as Json, json};

use crate::error::IsaError;
use crate::impl_commentable;
use crate::model::comment::Comment;
use crate::model::dict::{
    IsaDict, LdContext, array_field, as_object, finish, from_dicts, opt_ref_id, ref_id, reference,
    str_field, to_dicts,
};
use crate::model::identifiers::Identifier;
use crate::model::ontology::OntologyAnnotation;
use crate::model::store::LoaderStore;
use crate::model::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtocolParameter {
    pub id: String,
    pub parameter_name: OntologyAnnotation,
    pub comments: Vec<Comment>,
}

impl ProtocolParameter {
    pub fn new(parameter_name: impl Into<OntologyAnnotation>) -> Self {
        let parameter_name = parameter_name.into();
        Self {
            id: Identifier::ordinal("parameter", &parameter_name.term),
            parameter_name,
            comments: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.parameter_name.term
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterValue {
    pub category: ProtocolParameter,
    pub value: Value,
    pub unit: Option<OntologyAnnotation>,
    pub comments: Vec<Comment>,
}

impl ParameterValue {
    pub fn new(
        category: ProtocolParameter,
        value: impl Into<Value>,
        unit: Option<OntologyAnnotation>,
    ) -> Result<Self, IsaError> {
        let value = value.into();
        if let Some(unit) = &unit {
            if !value.is_numeric() {
                return Err(IsaError::ParamUnitMismatch {
                    parameter: category.name().to_string(),
                    unit: unit.term.clone(),
                    value: value.to_string(),
                });
            }
        }
        Ok(Self {
            category,
            value,
            unit,
            comments: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Protocol {
    pub id: String,
    pub name: String,
    pub protocol_type: OntologyAnnotation,
    pub description: String,
    pub uri: String,
    pub version: String,
    pub parameters: Vec<ProtocolParameter>,
    pub components: Vec<OntologyAnnotation>,
    pub comments: Vec<Comment>,
}

impl Protocol {
    pub fn new(name: impl Into<String>, protocol_type: impl Into<OntologyAnnotation>) -> Self {
        let name = name.into();
        Self {
            id: Identifier::ordinal("protocol", &name),
            name,
            protocol_type: protocol_type.into(),
            ..Self::default()
        }
    }

    pub fn with_parameters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OntologyAnnotation>,
    {
        for name in names {
            self.parameters.push(ProtocolParameter::new(name));
        }
        self
    }

    pub fn get_param(&self, name: &str) -> Option<&ProtocolParameter> {
        self.parameters
            .iter()
            .find(|parameter| parameter.parameter_name.term == name)
    }

    /// Adds a parameter unless one with the same name is already declared.
    pub fn add_param(&mut self, name: impl Into<OntologyAnnotation>) -> Result<&ProtocolParameter, IsaError> {
        let name = name.into();
        if name.term.trim().is_empty() {
            return Err(IsaError::type_violation("Protocol", "parameters", name.term, "empty string"));
        }
        let position = match self
            .parameters
            .iter()
            .position(|parameter| parameter.parameter_name.term == name.term)
        {
            Some(position) => position,
            None => {
                self.parameters.push(ProtocolParameter::new(name));
                self.parameters.len() - 1
            }
        };
        Ok(&self.parameters[position])
    }
}

impl_commentable!(ProtocolParameter, ParameterValue, Protocol);

impl IsaDict for ProtocolParameter {
    const LD_TYPE: &'static str = "ProtocolParameter";

    fn to_dict(&self, ld: Option<&LdContext>) -> Json {
        let mut map = Map::new();
        map.insert("@id".to_string(), Json::String(self.id.clone()));
        map.insert("parameterName".to_string(), self.parameter_name.to_dict(ld));
        map.insert("comments".to_string(), to_dicts(&self.comments, ld));
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Json, store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "ProtocolParameter")?;
        let parameter_name = match map.get("parameterName") {
            Some(Json::String(name)) => OntologyAnnotation::new(name.clone()),
            Some(name) => OntologyAnnotation::from_dict(name, store)?,
            None => OntologyAnnotation::default(),
        };
        let id = str_field(map, "ProtocolParameter", "@id")?;
        let parameter = Self {
            id: if id.is_empty() {
                Identifier::ordinal("parameter", &parameter_name.term)
            } else {
                id
            },
            parameter_name,
            comments: from_dicts(map, "ProtocolParameter", "comments", store)?,
        };
        store.register_parameter(&parameter);
        Ok(parameter)
    }
}

impl IsaDict for ParameterValue {
    const LD_TYPE: &'static str = "ParameterValue";

    fn to_dict(&self, ld: Option<&LdContext>) -> Json {
        let mut map = Map::new();
        map.insert("category".to_string(), reference(&self.category.id));
        map.insert("value".to_string(), self.value.to_json(ld));
        if let Some(unit) = &self.unit {
            map.insert("unit".to_string(), reference(&unit.id));
        }
        map.insert("comments".to_string(), to_dicts(&self.comments, ld));
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Json, store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "ParameterValue")?;
        let category = map
            .get("category")
            .ok_or_else(|| IsaError::missing("protocol parameter", "<absent>"))?;
        let category = store.parameter(&ref_id(category, "ParameterValue", "category")?)?;
        let unit = opt_ref_id(map, "ParameterValue", "unit")?
            .map(|id| store.unit(&id))
            .transpose()?;
        let value = match map.get("value") {
            Some(value) => Value::from_json(value, "ParameterValue", store)?,
            None => Value::Text(String::new()),
        };
        let mut parameter_value = Self::new(category, value, unit)?;
        parameter_value.comments = from_dicts(map, "ParameterValue", "comments", store)?;
        Ok(parameter_value)
    }
}

impl IsaDict for Protocol {
    const LD_TYPE: &'static str = "Protocol";

    fn to_dict(&self, ld: Option<&LdContext>) -> Json {
        let mut map = Map::new();
        map.insert("@id".to_string(), Json::String(self.id.clone()));
        map.insert("name".to_string(), Json::String(self.name.clone()));
        map.insert("protocolType".to_string(), self.protocol_type.to_dict(ld));
        map.insert(
            "description".to_string(),
            Json::String(self.description.clone()),
        );
        map.insert("uri".to_string(), Json::String(self.uri.clone()));
        map.insert("version".to_string(), Json::String(self.version.clone()));
        map.insert("parameters".to_string(), to_dicts(&self.parameters, ld));
        let components = self
            .components
            .iter()
            .map(|component| {
                json!({
                    "componentName": component.term,
                    "componentType": component.to_dict(ld),
                })
            })
            .collect();
        map.insert("components".to_string(), Json::Array(components));
        map.insert("comments".to_string(), to_dicts(&self.comments, ld));
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Json, store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "Protocol")?;
        let name = str_field(map, "Protocol", "name")?;
        let id = str_field(map, "Protocol", "@id")?;
        let protocol_type = match map.get("protocolType") {
            Some(Json::String(term)) => OntologyAnnotation::new(term.clone()),
            Some(protocol_type) => OntologyAnnotation::from_dict(protocol_type, store)?,
            None => OntologyAnnotation::default(),
        };
        let mut components = Vec::new();
        for component in array_field(map, "Protocol", "components")? {
            match component.get("componentType") {
                Some(component_type) => {
                    components.push(OntologyAnnotation::from_dict(component_type, store)?)
                }
                None => {
                    let component = as_object(component, "Protocol")?;
                    components.push(OntologyAnnotation::new(str_field(
                        component,
                        "Protocol",
                        "componentName",
                    )?));
                }
            }
        }
        let protocol = Self {
            id: if id.is_empty() {
                Identifier::ordinal("protocol", &name)
            } else {
                id
            },
            name,
            protocol_type,
            description: str_field(map, "Protocol", "description")?,
            uri: str_field(map, "Protocol", "uri")?,
            version: str_field(map, "Protocol", "version")?,
            parameters: from_dicts(map, "Protocol", "parameters", store)?,
            components,
            comments: from_dicts(map, "Protocol", "comments", store)?,
        };
        store.register_protocol(&protocol);
        Ok(protocol)
    }
}
