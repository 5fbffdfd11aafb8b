use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value as Json};

use crate::error::IsaError;
use crate::impl_commentable;
use crate::model::characteristic::Characteristic;
use crate::model::comment::{Comment, Commentable};
use crate::model::dict::{
    IsaDict, LdContext, array_field, as_object, finish, from_dicts, ref_id, reference, str_field,
    to_dicts,
};
use crate::model::factor::FactorValue;
use crate::model::identifiers::Identifier;
use crate::model::store::{IoKind, LoaderStore};

pub const QC_SAMPLE_TYPE_COMMENT: &str = "QC sample type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QcSampleType {
    PreRun,
    Interspersed,
    PostRun,
}

impl QcSampleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QcSampleType::PreRun => "QC sample type pre-run",
            QcSampleType::Interspersed => "QC sample type interspersed",
            QcSampleType::PostRun => "QC sample type post-run",
        }
    }
}

impl fmt::Display for QcSampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QcSampleType {
    type Err = IsaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "QC sample type pre-run" | "pre-run" => Ok(QcSampleType::PreRun),
            "QC sample type interspersed" | "interspersed" => Ok(QcSampleType::Interspersed),
            "QC sample type post-run" | "post-run" => Ok(QcSampleType::PostRun),
            other => Err(IsaError::InvalidValue(format!("unknown QC sample type {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub characteristics: Vec<Characteristic>,
    pub comments: Vec<Comment>,
}

impl Source {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Identifier::ordinal("source", &name),
            name,
            ..Self::default()
        }
    }

    pub fn with_characteristics(mut self, characteristics: Vec<Characteristic>) -> Self {
        self.characteristics = characteristics;
        self
    }

    pub fn has_char(&self, category: &str) -> bool {
        self.characteristics
            .iter()
            .any(|characteristic| characteristic.category.term == category)
    }

    pub fn get_char(&self, category: &str) -> Option<&Characteristic> {
        self.characteristics
            .iter()
            .find(|characteristic| characteristic.category.term == category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Sample {
    pub id: String,
    pub name: String,
    pub characteristics: Vec<Characteristic>,
    pub factor_values: Vec<FactorValue>,
    /// Ids of the sources, or for aliquots the samples, this sample was taken from.
    pub derives_from: Vec<String>,
    pub comments: Vec<Comment>,
}

impl Sample {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Identifier::ordinal("sample", &name),
            name,
            ..Self::default()
        }
    }

    pub fn quality_control(name: impl Into<String>, qc_type: QcSampleType) -> Self {
        let mut sample = Self::new(name);
        sample.add_comment(QC_SAMPLE_TYPE_COMMENT, qc_type.as_str());
        sample
    }

    pub fn qc_sample_type(&self) -> Option<QcSampleType> {
        self.get_comment(QC_SAMPLE_TYPE_COMMENT)
            .and_then(|comment| comment.value.parse().ok())
    }

    pub fn has_char(&self, category: &str) -> bool {
        self.characteristics
            .iter()
            .any(|characteristic| characteristic.category.term == category)
    }

    pub fn get_char(&self, category: &str) -> Option<&Characteristic> {
        self.characteristics
            .iter()
            .find(|characteristic| characteristic.category.term == category)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum MaterialKind {
    #[default]
    Extract,
    LabeledExtract,
}

impl MaterialKind {
    pub fn label(&self) -> &'static str {
        match self {
            MaterialKind::Extract => "Extract Name",
            MaterialKind::LabeledExtract => "Labeled Extract Name",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, IsaError> {
        match label {
            "Extract Name" => Ok(MaterialKind::Extract),
            "Labeled Extract Name" => Ok(MaterialKind::LabeledExtract),
            other => Err(IsaError::type_violation("Material", "type", other, "str")),
        }
    }
}

/// Extract or labeled extract produced inside an assay.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Material {
    pub id: String,
    pub name: String,
    pub kind: MaterialKind,
    pub characteristics: Vec<Characteristic>,
    pub derives_from: Vec<String>,
    pub comments: Vec<Comment>,
}

impl Material {
    pub fn new(name: impl Into<String>, kind: MaterialKind) -> Self {
        let name = name.into();
        Self {
            id: Identifier::ordinal("material", &name),
            name,
            kind,
            ..Self::default()
        }
    }

    pub fn extract(name: impl Into<String>) -> Self {
        Self::new(name, MaterialKind::Extract)
    }

    pub fn labeled_extract(name: impl Into<String>) -> Self {
        Self::new(name, MaterialKind::LabeledExtract)
    }
}

impl_commentable!(Source, Sample, Material);

fn derives_from_dicts(ids: &[String]) -> Json {
    Json::Array(ids.iter().map(|id| reference(id)).collect())
}

fn derives_from_ids(
    map: &Map<String, Json>,
    class: &str,
    store: &LoaderStore,
    allowed: &[IoKind],
) -> Result<Vec<String>, IsaError> {
    array_field(map, class, "derivesFrom")?
        .iter()
        .map(|item| {
            let id = ref_id(item, class, "derivesFrom")?;
            store.expect_material(&id, allowed)?;
            Ok(id)
        })
        .collect()
}

impl IsaDict for Source {
    const LD_TYPE: &'static str = "Source";

    fn to_dict(&self, ld: Option<&LdContext>) -> Json {
        let mut map = Map::new();
        map.insert("@id".to_string(), Json::String(self.id.clone()));
        map.insert("name".to_string(), Json::String(self.name.clone()));
        map.insert(
            "characteristics".to_string(),
            to_dicts(&self.characteristics, ld),
        );
        map.insert("comments".to_string(), to_dicts(&self.comments, ld));
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Json, store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "Source")?;
        let name = str_field(map, "Source", "name")?;
        let id = str_field(map, "Source", "@id")?;
        let source = Self {
            id: if id.is_empty() {
                Identifier::ordinal("source", &name)
            } else {
                id
            },
            name,
            characteristics: from_dicts(map, "Source", "characteristics", store)?,
            comments: from_dicts(map, "Source", "comments", store)?,
        };
        store.register_material(&source.id, IoKind::Source);
        Ok(source)
    }
}

impl IsaDict for Sample {
    const LD_TYPE: &'static str = "Sample";

    fn to_dict(&self, ld: Option<&LdContext>) -> Json {
        let mut map = Map::new();
        map.insert("@id".to_string(), Json::String(self.id.clone()));
        map.insert("name".to_string(), Json::String(self.name.clone()));
        map.insert(
            "characteristics".to_string(),
            to_dicts(&self.characteristics, ld),
        );
        map.insert("factorValues".to_string(), to_dicts(&self.factor_values, ld));
        map.insert(
            "derivesFrom".to_string(),
            derives_from_dicts(&self.derives_from),
        );
        map.insert("comments".to_string(), to_dicts(&self.comments, ld));
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Json, store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "Sample")?;
        let name = str_field(map, "Sample", "name")?;
        let id = str_field(map, "Sample", "@id")?;
        let sample = Self {
            id: if id.is_empty() {
                Identifier::ordinal("sample", &name)
            } else {
                id
            },
            name,
            characteristics: from_dicts(map, "Sample", "characteristics", store)?,
            factor_values: from_dicts(map, "Sample", "factorValues", store)?,
            derives_from: derives_from_ids(map, "Sample", store, &[IoKind::Source, IoKind::Sample])?,
            comments: from_dicts(map, "Sample", "comments", store)?,
        };
        store.register_material(&sample.id, IoKind::Sample);
        Ok(sample)
    }
}

impl IsaDict for Material {
    const LD_TYPE: &'static str = "Material";

    fn to_dict(&self, ld: Option<&LdContext>) -> Json {
        let mut map = Map::new();
        map.insert("@id".to_string(), Json::String(self.id.clone()));
        map.insert("name".to_string(), Json::String(self.name.clone()));
        map.insert("type".to_string(), Json::String(self.kind.label().to_string()));
        map.insert(
            "characteristics".to_string(),
            to_dicts(&self.characteristics, ld),
        );
        map.insert(
            "derivesFrom".to_string(),
            derives_from_dicts(&self.derives_from),
        );
        map.insert("comments".to_string(), to_dicts(&self.comments, ld));
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Json, store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "Material")?;
        let name = str_field(map, "Material", "name")?;
        let id = str_field(map, "Material", "@id")?;
        let material = Self {
            id: if id.is_empty() {
                Identifier::ordinal("material", &name)
            } else {
                id
            },
            name,
            kind: MaterialKind::from_label(&str_field(map, "Material", "type")?)?,
            characteristics: from_dicts(map, "Material", "characteristics", store)?,
            derives_from: derives_from_ids(
                map,
                "Material",
                store,
                &[IoKind::Sample, IoKind::Material],
            )?,
            comments: from_dicts(map, "Material", "comments", store)?,
        };
        store.register_material(&material.id, IoKind::Material);
        Ok(material)
    }
}
