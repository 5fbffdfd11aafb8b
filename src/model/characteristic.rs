use serde_json::{Map, Value as Json};

use crate::error::IsaError;
use crate::impl_commentable;
use crate::model::comment::Comment;
use crate::model::dict::{
    IsaDict, LdContext, as_object, finish, from_dicts, opt_ref_id, ref_id, reference, to_dicts,
};
use crate::model::ontology::OntologyAnnotation;
use crate::model::store::LoaderStore;
use crate::model::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Characteristic {
    pub category: OntologyAnnotation,
    pub value: Value,
    pub unit: Option<OntologyAnnotation>,
    pub comments: Vec<Comment>,
}

impl Characteristic {
    pub fn new(category: impl Into<OntologyAnnotation>, value: impl Into<Value>) -> Self {
        Self {
            category: category.into(),
            value: value.into(),
            unit: None,
            comments: Vec::new(),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<OntologyAnnotation>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn category_term(&self) -> &str {
        &self.category.term
    }

    pub fn value_term(&self) -> String {
        self.value.to_string()
    }
}

impl_commentable!(Characteristic);

impl IsaDict for Characteristic {
    const LD_TYPE: &'static str = "Characteristic";

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
        let map = as_object(value, "Characteristic")?;
        let category = map
            .get("category")
            .ok_or_else(|| IsaError::missing("characteristic category", "<absent>"))?;
        let category = store.characteristic_category(&ref_id(category, "Characteristic", "category")?)?;
        let unit = opt_ref_id(map, "Characteristic", "unit")?
            .map(|id| store.unit(&id))
            .transpose()?;
        let value = match map.get("value") {
            Some(value) => Value::from_json(value, "Characteristic", store)?,
            None => Value::Text(String::new()),
        };
        Ok(Self {
            category,
            value,
            unit,
            comments: from_dicts(map, "Characteristic", "comments", store)?,
        })
    }
}
