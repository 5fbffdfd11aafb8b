use indexmap::IndexMap;
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Map, Value as Json, json};

use crate::error::IsaError;
use crate::impl_commentable;
use crate::model::assay::{Assay, collect_from_characteristics};
use crate::model::characteristic::Characteristic;
use crate::model::comment::Comment;
use crate::model::dict::{
    IsaDict, LdContext, array_field, as_object, finish, from_dicts, str_field, to_dicts,
};
use crate::model::factor::{FactorValue, StudyFactor};
use crate::model::identifiers::Identifier;
use crate::model::material::{Material, MaterialKind, Sample, Source};
use crate::model::ontology::OntologyAnnotation;
use crate::model::people::{Person, Publication};
use crate::model::process::{Process, process_sequence_from_dicts};
use crate::model::protocol::Protocol;
use crate::model::store::LoaderStore;
use crate::model::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleTarget {
    Samples,
    Sources,
    Extracts,
    LabeledExtracts,
}

impl ShuffleTarget {
    pub fn attribute(&self) -> &'static str {
        match self {
            ShuffleTarget::Samples => "samples",
            ShuffleTarget::Sources => "sources",
            ShuffleTarget::Extracts => "Extract Name",
            ShuffleTarget::LabeledExtracts => "Labeled Extract Name",
        }
    }

    pub fn order_term(&self) -> &'static str {
        match self {
            ShuffleTarget::Samples => "randomized extraction order",
            ShuffleTarget::Sources => "randomized sampling order",
            ShuffleTarget::Extracts => "randomized order",
            ShuffleTarget::LabeledExtracts => "randomized data acquisition order",
        }
    }
}

/// Gives every material a `<term> = position` characteristic where the
/// positions are a random permutation; the material list itself keeps its order.
pub(crate) fn assign_random_order<R: Rng + ?Sized>(
    mut targets: Vec<&mut Vec<Characteristic>>,
    term: &str,
    rng: &mut R,
) {
    let mut order = (0..targets.len()).collect::<Vec<_>>();
    order.shuffle(rng);
    for (position, target) in order.into_iter().enumerate() {
        let characteristics = &mut targets[target];
        let characteristic = Characteristic::new(term, Value::from(position));
        match characteristics
            .iter()
            .position(|existing| existing.category.term == term)
        {
            Some(ix) => characteristics[ix] = characteristic,
            None => characteristics.push(characteristic),
        }
    }
}

pub(crate) fn categories_to_dicts(categories: &[OntologyAnnotation], ld: Option<&LdContext>) -> Json {
    Json::Array(
        categories
            .iter()
            .map(|category| {
                json!({
                    "@id": category.id,
                    "characteristicType": category.to_dict(ld),
                })
            })
            .collect(),
    )
}

pub(crate) fn categories_from_dicts(
    map: &Map<String, Json>,
    class: &str,
    store: &mut LoaderStore,
) -> Result<Vec<OntologyAnnotation>, IsaError> {
    let mut categories = Vec::new();
    for item in array_field(map, class, "characteristicCategories")? {
        let entry = as_object(item, class)?;
        let mut category = match entry.get("characteristicType") {
            Some(Json::String(term)) => OntologyAnnotation::new(term.clone()),
            Some(value) => OntologyAnnotation::from_dict(value, store)?,
            None => OntologyAnnotation::default(),
        };
        let id = str_field(entry, class, "@id")?;
        if !id.is_empty() {
            category.id = id;
        }
        store.register_characteristic_category(&category);
        categories.push(category);
    }
    Ok(categories)
}

pub(crate) fn units_from_dicts(
    map: &Map<String, Json>,
    class: &str,
    store: &mut LoaderStore,
) -> Result<Vec<OntologyAnnotation>, IsaError> {
    let units = from_dicts::<OntologyAnnotation>(map, class, "unitCategories", store)?;
    for unit in &units {
        store.register_unit(unit);
    }
    Ok(units)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Study {
    pub id: String,
    pub filename: String,
    pub identifier: String,
    pub title: String,
    pub description: String,
    pub submission_date: String,
    pub public_release_date: String,
    pub publications: Vec<Publication>,
    pub contacts: Vec<Person>,
    pub design_descriptors: Vec<OntologyAnnotation>,
    pub protocols: Vec<Protocol>,
    pub factors: Vec<StudyFactor>,
    pub sources: Vec<Source>,
    pub samples: Vec<Sample>,
    pub other_material: Vec<Material>,
    pub process_sequence: Vec<Process>,
    pub assays: Vec<Assay>,
    pub characteristic_categories: Vec<OntologyAnnotation>,
    pub units: Vec<OntologyAnnotation>,
    pub comments: Vec<Comment>,
}

impl Study {
    pub fn new(identifier: impl Into<String>, filename: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            id: Identifier::ordinal("study", &identifier),
            identifier,
            filename: filename.into(),
            ..Self::default()
        }
    }

    pub fn add_source(&mut self, source: Source) -> &Source {
        self.sources.push(source);
        &self.sources[self.sources.len() - 1]
    }

    pub fn add_sample(&mut self, sample: Sample) -> &Sample {
        self.samples.push(sample);
        &self.samples[self.samples.len() - 1]
    }

    pub fn get_source(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|source| source.name == name)
    }

    pub fn get_sample(&self, name: &str) -> Option<&Sample> {
        self.samples.iter().find(|sample| sample.name == name)
    }

    pub fn get_sample_by_id(&self, id: &str) -> Option<&Sample> {
        self.samples.iter().find(|sample| sample.id == id)
    }

    pub fn yield_samples_by_characteristic<'a>(
        &'a self,
        characteristic: Option<&'a Characteristic>,
    ) -> impl Iterator<Item = &'a Sample> + 'a {
        self.samples.iter().filter(move |sample| match characteristic {
            Some(characteristic) => sample.characteristics.contains(characteristic),
            None => true,
        })
    }

    pub fn yield_samples_by_factor_value<'a>(
        &'a self,
        factor_value: Option<&'a FactorValue>,
    ) -> impl Iterator<Item = &'a Sample> + 'a {
        self.samples.iter().filter(move |sample| match factor_value {
            Some(factor_value) => sample.factor_values.contains(factor_value),
            None => true,
        })
    }

    pub fn get_protocol(&self, name: &str) -> Option<&Protocol> {
        self.protocols.iter().find(|protocol| protocol.name == name)
    }

    pub fn get_protocol_by_id(&self, id: &str) -> Option<&Protocol> {
        self.protocols.iter().find(|protocol| protocol.id == id)
    }

    pub fn add_protocol(&mut self, protocol: Protocol) -> Result<(), IsaError> {
        if self.protocols.iter().any(|existing| existing.id == protocol.id) {
            return Err(IsaError::DuplicateName {
                kind: "protocol".to_string(),
                name: protocol.name,
            });
        }
        self.protocols.push(protocol);
        Ok(())
    }

    pub fn add_factor(&mut self, factor: StudyFactor) {
        if !self.factors.iter().any(|existing| existing.name == factor.name) {
            self.factors.push(factor);
        }
    }

    pub fn get_factor(&self, name: &str) -> Option<&StudyFactor> {
        self.factors.iter().find(|factor| factor.name == name)
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

    /// Rebuilds study and assay categories/units from every characteristic,
    /// factor value and parameter value currently held.
    pub fn collect_categories(&mut self) {
        let mut categories = IndexMap::new();
        let mut units = IndexMap::new();
        for source in &self.sources {
            collect_from_characteristics(&source.characteristics, &mut categories, &mut units);
        }
        for sample in &self.samples {
            collect_from_characteristics(&sample.characteristics, &mut categories, &mut units);
            for value in &sample.factor_values {
                if let Some(unit) = &value.unit {
                    units.entry(unit.id.clone()).or_insert_with(|| unit.clone());
                }
            }
        }
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
        for assay in &mut self.assays {
            assay.collect_categories();
        }
    }

    pub fn shuffle_materials<R: Rng + ?Sized>(&mut self, target: ShuffleTarget, rng: &mut R) {
        let targets = match target {
            ShuffleTarget::Samples => self
                .samples
                .iter_mut()
                .map(|sample| &mut sample.characteristics)
                .collect(),
            ShuffleTarget::Sources => self
                .sources
                .iter_mut()
                .map(|source| &mut source.characteristics)
                .collect(),
            ShuffleTarget::Extracts | ShuffleTarget::LabeledExtracts => {
                let kind = if target == ShuffleTarget::Extracts {
                    MaterialKind::Extract
                } else {
                    MaterialKind::LabeledExtract
                };
                self.other_material
                    .iter_mut()
                    .filter(|material| material.kind == kind)
                    .map(|material| &mut material.characteristics)
                    .collect()
            }
        };
        assign_random_order(targets, target.order_term(), rng);
    }
}

impl_commentable!(Study);

impl IsaDict for Study {
    const LD_TYPE: &'static str = "Study";

    fn to_dict(&self, ld: Option<&LdContext>) -> Json {
        let mut map = Map::new();
        map.insert("@id".to_string(), Json::String(self.id.clone()));
        for (key, value) in [
            ("filename", &self.filename),
            ("identifier", &self.identifier),
            ("title", &self.title),
            ("description", &self.description),
            ("submissionDate", &self.submission_date),
            ("publicReleaseDate", &self.public_release_date),
        ] {
            map.insert(key.to_string(), Json::String(value.clone()));
        }
        map.insert("publications".to_string(), to_dicts(&self.publications, ld));
        map.insert("people".to_string(), to_dicts(&self.contacts, ld));
        map.insert(
            "studyDesignDescriptors".to_string(),
            to_dicts(&self.design_descriptors, ld),
        );
        map.insert("protocols".to_string(), to_dicts(&self.protocols, ld));
        let mut materials = Map::new();
        materials.insert("sources".to_string(), to_dicts(&self.sources, ld));
        materials.insert("samples".to_string(), to_dicts(&self.samples, ld));
        materials.insert(
            "otherMaterials".to_string(),
            to_dicts(&self.other_material, ld),
        );
        map.insert("materials".to_string(), Json::Object(materials));
        map.insert(
            "processSequence".to_string(),
            to_dicts(&self.process_sequence, ld),
        );
        map.insert("factors".to_string(), to_dicts(&self.factors, ld));
        map.insert(
            "characteristicCategories".to_string(),
            categories_to_dicts(&self.characteristic_categories, ld),
        );
        map.insert("unitCategories".to_string(), to_dicts(&self.units, ld));
        map.insert("comments".to_string(), to_dicts(&self.comments, ld));
        map.insert("assays".to_string(), to_dicts(&self.assays, ld));
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Json, store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "Study")?;
        let identifier = str_field(map, "Study", "identifier")?;
        let id = str_field(map, "Study", "@id")?;
        let units = units_from_dicts(map, "Study", store)?;
        let characteristic_categories = categories_from_dicts(map, "Study", store)?;
        let factors = from_dicts(map, "Study", "factors", store)?;
        let protocols = from_dicts(map, "Study", "protocols", store)?;
        let empty = Map::new();
        let materials = match map.get("materials") {
            Some(materials) => as_object(materials, "Study")?,
            None => &empty,
        };
        let sources = from_dicts(materials, "Study", "sources", store)?;
        let samples = from_dicts(materials, "Study", "samples", store)?;
        let other_material = from_dicts(materials, "Study", "otherMaterials", store)?;
        let assays = from_dicts(map, "Study", "assays", store)?;
        let process_sequence =
            process_sequence_from_dicts(array_field(map, "Study", "processSequence")?, store)?;
        Ok(Self {
            id: if id.is_empty() {
                Identifier::ordinal("study", &identifier)
            } else {
                id
            },
            filename: str_field(map, "Study", "filename")?,
            identifier,
            title: str_field(map, "Study", "title")?,
            description: str_field(map, "Study", "description")?,
            submission_date: str_field(map, "Study", "submissionDate")?,
            public_release_date: str_field(map, "Study", "publicReleaseDate")?,
            publications: from_dicts(map, "Study", "publications", store)?,
            contacts: from_dicts(map, "Study", "people", store)?,
            design_descriptors: from_dicts(map, "Study", "studyDesignDescriptors", store)?,
            protocols,
            factors,
            sources,
            samples,
            other_material,
            process_sequence,
            assays,
            characteristic_categories,
            units,
            comments: from_dicts(map, "Study", "comments", store)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn shuffle_assigns_a_permutation_of_positions() {
        let mut study = Study::new("s_01", "s_01.txt");
        for name in ["a", "b", "c", "d"] {
            study.add_sample(Sample::new(name));
        }
        let mut rng = StdRng::seed_from_u64(7);
        study.shuffle_materials(ShuffleTarget::Samples, &mut rng);

        let mut positions = study
            .samples
            .iter()
            .map(|sample| {
                sample
                    .get_char("randomized extraction order")
                    .map(|characteristic| characteristic.value.clone())
            })
            .collect::<Vec<_>>();
        positions.sort();
        assert_eq!(
            positions,
            (0..4_i64).map(|ix| Some(Value::Int(ix))).collect::<Vec<_>>()
        );
        let names = study.samples.iter().map(|sample| sample.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn add_protocol_rejects_duplicates() {
        let mut study = Study::new("s_01", "s_01.txt");
        study
            .add_protocol(Protocol::new("sample collection", "sample collection"))
            .unwrap();
        assert!(
            study
                .add_protocol(Protocol::new("sample collection", "sample collection"))
                .is_err()
        );
    }
}
