use indexmap::IndexMap;
use rand::Rng;
use serde_json::{Map, Value as Json};

use crate::error::IsaError;
use crate::impl_commentable;
use crate::model::characteristic::Characteristic;
use crate::model::comment::Comment;
use crate::model::data_file::DataFile;
use crate::model::dict::{
    IsaDict, LdContext, array_field, as_object, finish, from_dicts, ref_id, reference, str_field,
    to_dicts,
};
use crate::model::identifiers::Identifier;
use crate::model::material::{Material, MaterialKind};
use crate::model::ontology::OntologyAnnotation;
use crate::model::process::{Process, process_sequence_from_dicts};
use crate::model::store::{IoKind, LoaderStore};
use crate::model::study::{
    ShuffleTarget, assign_random_order, categories_from_dicts, categories_to_dicts,
    units_from_dicts,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assay {
    pub id: String,
    pub measurement_type: OntologyAnnotation,
    pub technology_type: OntologyAnnotation,
    pub technology_platform: String,
    pub filename: String,
    /// Ids of the study samples this assay consumes.
    pub samples: Vec<String>,
    pub other_material: Vec<Material>,
    pub data_files: Vec<DataFile>,
    pub process_sequence: Vec<Process>,
    pub characteristic_categories: Vec<OntologyAnnotation>,
    pub units: Vec<OntologyAnnotation>,
    pub comments: Vec<Comment>,
}

impl Assay {
    pub fn new(
        filename: impl Into<String>,
        measurement_type: impl Into<OntologyAnnotation>,
        technology_type: impl Into<OntologyAnnotation>,
    ) -> Self {
        let filename = filename.into();
        Self {
            id: Identifier::ordinal("assay", &filename),
            filename,
            measurement_type: measurement_type.into(),
            technology_type: technology_type.into(),
            ..Self::default()
        }
    }

    pub fn extracts(&self) -> impl Iterator<Item = &Material> + '_ {
        self.other_material
            .iter()
            .filter(|material| material.kind == MaterialKind::Extract)
    }

    pub fn labeled_extracts(&self) -> impl Iterator<Item = &Material> + '_ {
        self.other_material
            .iter()
            .filter(|material| material.kind == MaterialKind::LabeledExtract)
    }

    pub fn add_characteristic_category(&mut self, category: OntologyAnnotation) {
        if !self
            .characteristic_categories
            .iter()
            .any(|existing| existing.id == category.id)
        {
            self.characteristic_categories.push(category);
        }
    }

    pub fn add_unit(&mut self, unit: OntologyAnnotation) {
        if !self.units.iter().any(|existing| existing.id == unit.id) {
            self.units.push(unit);
        }
    }

    /// Rebuilds categories and units from the assay's own materials and processes.
    pub fn collect_categories(&mut self) {
        let mut categories = IndexMap::new();
        let mut units = IndexMap::new();
        for material in &self.other_material {
            collect_from_characteristics(&material.characteristics, &mut categories, &mut units);
        }
        for process in &self.process_sequence {
            for value in &process.parameter_values {
                if let Some(unit) = &value.unit {
                    units.entry(unit.id.clone()).or_insert_with(|| unit.clone());
                }
            }
        }
        self.characteristic_categories = categories.into_values().collect();
        self.units = units.into_values().collect();
    }

    pub fn shuffle_materials<R: Rng + ?Sized>(
        &mut self,
        target: ShuffleTarget,
        rng: &mut R,
    ) -> Result<(), IsaError> {
        let kind = match target {
            ShuffleTarget::Extracts => MaterialKind::Extract,
            ShuffleTarget::LabeledExtracts => MaterialKind::LabeledExtract,
            other => {
                return Err(IsaError::InvalidValue(format!(
                    "{} cannot be shuffled inside an assay",
                    other.attribute()
                )));
            }
        };
        let targets = self
            .other_material
            .iter_mut()
            .filter(|material| material.kind == kind)
            .map(|material| &mut material.characteristics)
            .collect();
        assign_random_order(targets, target.order_term(), rng);
        Ok(())
    }
}

pub(crate) fn collect_from_characteristics(
    characteristics: &[Characteristic],
    categories: &mut IndexMap<String, OntologyAnnotation>,
    units: &mut IndexMap<String, OntologyAnnotation>,
) {
    for characteristic in characteristics {
        categories
            .entry(characteristic.category.id.clone())
            .or_insert_with(|| characteristic.category.clone());
        if let Some(unit) = &characteristic.unit {
            units.entry(unit.id.clone()).or_insert_with(|| unit.clone());
        }
    }
}

impl_commentable!(Assay);

impl IsaDict for Assay {
    const LD_TYPE: &'static str = "Assay";

    fn to_dict(&self, ld: Option<&LdContext>) -> Json {
        let mut map = Map::new();
        map.insert("@id".to_string(), Json::String(self.id.clone()));
        map.insert("measurementType".to_string(), self.measurement_type.to_dict(ld));
        map.insert("technologyType".to_string(), self.technology_type.to_dict(ld));
        map.insert(
            "technologyPlatform".to_string(),
            Json::String(self.technology_platform.clone()),
        );
        map.insert("filename".to_string(), Json::String(self.filename.clone()));
        map.insert(
            "characteristicCategories".to_string(),
            categories_to_dicts(&self.characteristic_categories, ld),
        );
        map.insert("unitCategories".to_string(), to_dicts(&self.units, ld));
        map.insert("comments".to_string(), to_dicts(&self.comments, ld));
        let mut materials = Map::new();
        materials.insert(
            "samples".to_string(),
            Json::Array(self.samples.iter().map(|id| reference(id)).collect()),
        );
        materials.insert(
            "otherMaterials".to_string(),
            to_dicts(&self.other_material, ld),
        );
        map.insert("materials".to_string(), Json::Object(materials));
        map.insert("dataFiles".to_string(), to_dicts(&self.data_files, ld));
        map.insert(
            "processSequence".to_string(),
            to_dicts(&self.process_sequence, ld),
        );
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Json, store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "Assay")?;
        let filename = str_field(map, "Assay", "filename")?;
        let id = str_field(map, "Assay", "@id")?;
        let units = units_from_dicts(map, "Assay", store)?;
        let characteristic_categories = categories_from_dicts(map, "Assay", store)?;
        let measurement_type = match map.get("measurementType") {
            Some(value) => OntologyAnnotation::from_dict(value, store)?,
            None => OntologyAnnotation::default(),
        };
        let technology_type = match map.get("technologyType") {
            Some(value) => OntologyAnnotation::from_dict(value, store)?,
            None => OntologyAnnotation::default(),
        };
        let empty = Map::new();
        let materials = match map.get("materials") {
            Some(materials) => as_object(materials, "Assay")?,
            None => &empty,
        };
        let samples = array_field(materials, "Assay", "samples")?
            .iter()
            .map(|item| {
                let id = ref_id(item, "Assay", "samples")?;
                store.expect_material(&id, &[IoKind::Sample])?;
                Ok(id)
            })
            .collect::<Result<Vec<_>, IsaError>>()?;
        let other_material = from_dicts(materials, "Assay", "otherMaterials", store)?;
        let data_files = from_dicts(map, "Assay", "dataFiles", store)?;
        let process_sequence =
            process_sequence_from_dicts(array_field(map, "Assay", "processSequence")?, store)?;
        Ok(Self {
            id: if id.is_empty() {
                Identifier::ordinal("assay", &filename)
            } else {
                id
            },
            measurement_type,
            technology_type,
            technology_platform: str_field(map, "Assay", "technologyPlatform")?,
            filename,
            samples,
            other_material,
            data_files,
            process_sequence,
            characteristic_categories,
            units,
            comments: from_dicts(map, "Assay", "comments", store)?,
        })
    }
}
