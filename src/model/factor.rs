use serde_json::{Map, Value as Json};

use crate::error::IsaError;
use crate::impl_commentable;
use crate::model::comment::Comment;
use crate::model::dict::{
    IsaDict, LdContext, as_object, finish, from_dicts, opt_ref_id, ref_id, reference, str_field,
    to_dicts,
};
use crate::model::identifiers::Identifier;
use crate::model::ontology::OntologyAnnotation;
use crate::model::store::LoaderStore;
use crate::model::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StudyFactor {
    pub id: String,
    pub name: String,
    pub factor_type: OntologyAnnotation,
    pub comments: Vec<Comment>,
}

impl StudyFactor {
    pub fn new(name: impl Into<String>, factor_type: impl Into<OntologyAnnotation>) -> Self {
        let name = name.into();
        Self {
            id: Identifier::ordinal("factor", &name),
            name,
            factor_type: factor_type.into(),
            comments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactorValue {
    pub factor_name: StudyFactor,
    pub value: Value,
    pub unit: Option<OntologyAnnotation>,
}

impl FactorValue {
    pub fn new(factor_name: StudyFactor, value: impl Into<Value>) -> Self {
        Self {
            factor_name,
            value: value.into(),
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<OntologyAnnotation>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

impl_commentable!(StudyFactor);

impl IsaDict for StudyFactor {
    const LD_TYPE: &'static str = "StudyFactor";

    fn to_dict(&self, ld: Option<&LdContext>) -> Json {
        let mut map = Map::new();
        map.insert("@id".to_string(), Json::String(self.id.clone()));
        map.insert("factorName".to_string(), Json::String(self.name.clone()));
        map.insert("factorType".to_string(), self.factor_type.to_dict(ld));
        map.insert("comments".to_string(), to_dicts(&self.comments, ld));
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Json, store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "StudyFactor")?;
        let name = str_field(map, "StudyFactor", "factorName")?;
        let id = str_field(map, "StudyFactor", "@id")?;
        let factor_type = match map.get("factorType") {
            Some(factor_type) => OntologyAnnotation::from_dict(factor_type, store)?,
            None => OntologyAnnotation::default(),
        };
        let factor = Self {
            id: if id.is_empty() {
                Identifier::ordinal("factor", &name)
            } else {
                id
            },
            name,
            factor_type,
            comments: from_dicts(map, "StudyFactor", "comments", store)?,
        };
        store.register_factor(&factor);
        Ok(factor)
    }
}

impl IsaDict for FactorValue {
    const LD_TYPE: &'static str = "FactorValue";

    fn to_dict(&self, ld: Option<&LdContext>) -> Json {
        let mut map = Map::new();
        map.insert("category".to_string(), reference(&self.factor_name.id));
        map.insert("value".to_string(), self.value.to_json(ld));
        if let Some(unit) = &self.unit {
            map.insert("unit".to_string(), reference(&unit.id));
        }
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Json, store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "FactorValue")?;
        let category = map
            .get("category")
            .ok_or_else(|| IsaError::missing("factor", "<absent>"))?;
        let factor_name = store.factor(&ref_id(category, "FactorValue", "category")?)?;
        let unit = opt_ref_id(map, "FactorValue", "unit")?
            .map(|id| store.unit(&id))
            .transpose()?;
        let value = match map.get("value") {
            Some(value) => Value::from_json(value, "FactorValue", store)?,
            None => Value::Text(String::new()),
        };
        Ok(Self {
            factor_name,
            value,
            unit,
        })
    }
}
