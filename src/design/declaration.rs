use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::IsaError;
use crate::model::{Characteristic, OntologyAnnotation, Value};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TermDeclaration {
    Shorthand(String),
    Detailed(TermObject),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TermObject {
    pub term: String,
    #[serde(default, alias = "termSource")]
    pub term_source: Option<String>,
    #[serde(default, alias = "termAccession")]
    pub term_accession: String,
}

impl TermDeclaration {
    pub fn to_annotation(&self) -> OntologyAnnotation {
        match self {
            TermDeclaration::Shorthand(term) => OntologyAnnotation::new(term.as_str()),
            TermDeclaration::Detailed(object) => match &object.term_source {
                Some(source) => OntologyAnnotation::sourced(
                    object.term.as_str(),
                    source.as_str(),
                    object.term_accession.as_str(),
                ),
                None => OntologyAnnotation {
                    term_accession: object.term_accession.clone(),
                    ..OntologyAnnotation::new(object.term.as_str())
                },
            },
        }
    }

    pub fn term(&self) -> &str {
        match self {
            TermDeclaration::Shorthand(term) => term,
            TermDeclaration::Detailed(object) => &object.term,
        }
    }
}

impl From<&str> for TermDeclaration {
    fn from(value: &str) -> Self {
        TermDeclaration::Shorthand(value.to_string())
    }
}

/// A product slot of a workflow layer or a sample plan.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProductDeclaration {
    pub node_type: String,
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub characteristics_category: Option<TermDeclaration>,
    #[serde(default)]
    pub characteristics_value: Option<TermDeclaration>,
    #[serde(default)]
    pub extension: Option<String>,
}

impl ProductDeclaration {
    pub fn new(node_type: &str, size: usize) -> Self {
        Self {
            node_type: node_type.to_string(),
            size,
            characteristics_category: None,
            characteristics_value: None,
            extension: None,
        }
    }

    pub fn with_characteristic(mut self, category: &str, value: &str) -> Self {
        self.characteristics_category = Some(category.into());
        self.characteristics_value = Some(value.into());
        self
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = Some(extension.to_string());
        self
    }

    pub fn characteristics(&self) -> Vec<Characteristic> {
        match &self.characteristics_category {
            Some(category) => {
                let value = self
                    .characteristics_value
                    .as_ref()
                    .map(|value| Value::Term(value.to_annotation()))
                    .unwrap_or_else(|| Value::Text(String::new()));
                vec![Characteristic::new(category.to_annotation(), value)]
            }
            None => Vec::new(),
        }
    }
}

/// One assay workflow: measurement/technology plus ordered `[name, step]` pairs.
/// A step is either a protocol (`{parameter: [values…], "#replicates": n}`) or a product layer (`[{…}]`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AssayDeclaration {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub measurement_type: TermDeclaration,
    pub technology_type: TermDeclaration,
    #[serde(default)]
    pub selected_sample_types: Option<Vec<String>>,
    pub workflow: Vec<(String, Json)>,
}

pub const REPLICATES_KEY: &str = "#replicates";

pub enum WorkflowStep {
    Protocol {
        parameters: Vec<(String, Vec<Value>)>,
        replicates: usize,
    },
    Products(Vec<ProductDeclaration>),
}

impl AssayDeclaration {
    pub fn new(measurement_type: &str, technology_type: &str) -> Self {
        Self {
            id: None,
            name: String::new(),
            measurement_type: measurement_type.into(),
            technology_type: technology_type.into(),
            selected_sample_types: None,
            workflow: Vec::new(),
        }
    }

    pub fn protocol_step(mut self, name: &str, parameters: Json) -> Self {
        self.workflow.push((name.to_string(), parameters));
        self
    }

    pub fn product_step(mut self, name: &str, products: Vec<ProductDeclaration>) -> Self {
        let products = products
            .iter()
            .filter_map(|product| serde_json::to_value(product).ok())
            .collect();
        self.workflow.push((name.to_string(), Json::Array(products)));
        self
    }

    pub fn steps(&self) -> Result<Vec<(&str, WorkflowStep)>, IsaError> {
        self.workflow
            .iter()
            .map(|(name, step)| Ok((name.as_str(), parse_step(name, step)?)))
            .collect()
    }
}

fn parse_step(name: &str, step: &Json) -> Result<WorkflowStep, IsaError> {
    match step {
        Json::Array(items) => {
            let products = items
                .iter()
                .map(|item| {
                    serde_json::from_value::<ProductDeclaration>(item.clone())
                        .map_err(|err| IsaError::InvalidValue(format!("product layer {name}: {err}")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(WorkflowStep::Products(products))
        }
        Json::Object(map) => {
            let mut replicates = 1;
            let mut parameters = Vec::new();
            for (key, values) in map {
                if key == REPLICATES_KEY {
                    replicates = values
                        .as_u64()
                        .filter(|count| *count >= 1)
                        .ok_or_else(|| {
                            IsaError::type_violation("ProtocolNode", "replicates", values.to_string(), "int < 1")
                        })? as usize;
                    continue;
                }
                let Json::Array(values) = values else {
                    return Err(IsaError::type_violation(
                        "ProtocolNode",
                        key,
                        values.to_string(),
                        "not a list",
                    ));
                };
                if values.is_empty() {
                    return Err(IsaError::InvalidValue(format!(
                        "protocol {name}: parameter {key} has no values"
                    )));
                }
                let values = values
                    .iter()
                    .map(|value| declared_value(value, key))
                    .collect::<Result<Vec<_>, _>>()?;
                parameters.push((key.clone(), values));
            }
            Ok(WorkflowStep::Protocol {
                parameters,
                replicates,
            })
        }
        other => Err(IsaError::type_violation(
            "AssayGraph",
            name,
            other.to_string(),
            "neither a protocol nor a product layer",
        )),
    }
}

/// Scalar or term carried by a declaration.
pub(crate) fn declared_value(value: &Json, attribute: &str) -> Result<Value, IsaError> {
    match value {
        Json::String(text) => Ok(Value::Text(text.clone())),
        Json::Number(number) => match number.as_i64() {
            Some(int) => Ok(Value::Int(int)),
            None => Ok(Value::Float(number.as_f64().unwrap_or_default())),
        },
        Json::Object(_) => serde_json::from_value::<TermDeclaration>(value.clone())
            .map(|term| Value::Term(term.to_annotation()))
            .map_err(|err| IsaError::type_violation("ParameterValue", attribute, err.to_string(), "object")),
        other => Err(IsaError::type_violation(
            "ParameterValue",
            attribute,
            other.to_string(),
            "unsupported value",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn workflow_steps_keep_declaration_order() {
        let declaration: AssayDeclaration = serde_json::from_value(json!({
            "measurement_type": "metabolite profiling",
            "technology_type": {"term": "NMR spectroscopy", "term_source": "OBI"},
            "workflow": [
                ["extraction", {"#replicates": 2, "solvent": ["water", "methanol"]}],
                ["extract", [{"node_type": "extract", "size": 1}]]
            ]
        }))
        .unwrap();
        let steps = declaration.steps().unwrap();
        assert_eq!(steps[0].0, "extraction");
        match &steps[0].1 {
            WorkflowStep::Protocol { parameters, replicates } => {
                assert_eq!(*replicates, 2);
                assert_eq!(parameters[0].1.len(), 2);
            }
            WorkflowStep::Products(_) => panic!("expected a protocol step"),
        }
        assert_eq!(
            declaration.technology_type.to_annotation().term_source.as_deref(),
            Some("OBI")
        );
    }
}
