use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde_json::{Number, Value as Json};

use crate::error::IsaError;
use crate::model::dict::{IsaDict, LdContext, json_type};
use crate::model::ontology::OntologyAnnotation;
use crate::model::store::LoaderStore;

/// Payload of a characteristic, factor value or parameter value.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Term(OntologyAnnotation),
}

impl Value {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_term(&self) -> Option<&OntologyAnnotation> {
        match self {
            Value::Term(term) => Some(term),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "str",
            Value::Term(_) => "OntologyAnnotation",
        }
    }

    pub fn to_json(&self, ld: Option<&LdContext>) -> Json {
        match self {
            Value::Int(value) => Json::Number(Number::from(*value)),
            Value::Float(value) => Number::from_f64(*value)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Text(value) => Json::String(value.clone()),
            Value::Term(term) => term.to_dict(ld),
        }
    }

    pub fn from_json(
        value: &Json,
        class: &str,
        store: &mut LoaderStore,
    ) -> Result<Self, IsaError> {
        match value {
            Json::Number(number) => {
                if let Some(int) = number.as_i64() {
                    Ok(Value::Int(int))
                } else if let Some(float) = number.as_f64() {
                    Ok(Value::Float(float))
                } else {
                    Err(IsaError::type_violation(class, "value", number.to_string(), "number"))
                }
            }
            Json::String(text) => Ok(Value::Text(text.clone())),
            Json::Object(_) => Ok(Value::Term(OntologyAnnotation::from_dict(value, store)?)),
            other => Err(IsaError::type_violation(
                class,
                "value",
                other.to_string(),
                json_type(other),
            )),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Int(_) | Value::Float(_) => 0,
            Value::Text(_) => 1,
            Value::Term(_) => 2,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(left), Value::Int(right)) => left == right,
            (Value::Float(left), Value::Float(right)) => left.to_bits() == right.to_bits(),
            (Value::Text(left), Value::Text(right)) => left == right,
            (Value::Term(left), Value::Term(right)) => left == right,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Int(value) => {
                0u8.hash(state);
                value.hash(state);
            }
            Value::Float(value) => {
                1u8.hash(state);
                value.to_bits().hash(state);
            }
            Value::Text(value) => {
                2u8.hash(state);
                value.hash(state);
            }
            Value::Term(value) => {
                3u8.hash(state);
                value.hash(state);
            }
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(left), Value::Int(right)) => left.cmp(right),
            (Value::Float(left), Value::Float(right)) => left.total_cmp(right),
            (Value::Int(left), Value::Float(right)) => {
                (*left as f64).total_cmp(right).then(Ordering::Less)
            }
            (Value::Float(left), Value::Int(right)) => {
                left.total_cmp(&(*right as f64)).then(Ordering::Greater)
            }
            (Value::Text(left), Value::Text(right)) => left.cmp(right),
            (Value::Term(left), Value::Term(right)) => left.cmp(right),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Text(value) => write!(f, "{value}"),
            Value::Term(value) => write!(f, "{}", value.term),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<OntologyAnnotation> for Value {
    fn from(value: OntologyAnnotation) -> Self {
        Value::Term(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ordering_mixes_ints_and_floats() {
        assert!(Value::Int(2) < Value::Float(2.5));
        assert!(Value::Float(10.0) > Value::Int(2));
        assert!(Value::Int(1000) < Value::Text("a".to_string()));
        assert_ne!(Value::Int(2), Value::Float(2.0));
    }
}
