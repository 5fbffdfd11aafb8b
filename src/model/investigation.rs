use std::collections::{BTreeSet, HashSet};

use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::error::IsaError;
use crate::impl_commentable;
use crate::model::comment::Comment;
use crate::model::dict::{
    IsaDict, LdContext, array_field, as_object, finish, from_dicts, str_field, to_dicts,
};
use crate::model::identifiers::Identifier;
use crate::model::ontology::OntologySource;
use crate::model::people::{Person, Publication};
use crate::model::store::LoaderStore;
use crate::model::study::Study;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Investigation {
    pub id: String,
    pub filename: String,
    pub identifier: String,
    pub title: String,
    pub description: String,
    pub submission_date: String,
    pub public_release_date: String,
    pub ontology_source_references: Vec<OntologySource>,
    pub publications: Vec<Publication>,
    pub contacts: Vec<Person>,
    pub studies: Vec<Study>,
    pub comments: Vec<Comment>,
}

impl Investigation {
    pub fn new(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            id: Identifier::ordinal("investigation", &identifier),
            identifier,
            ..Self::default()
        }
    }

    pub fn add_ontology_source(&mut self, source: OntologySource) {
        if !self
            .ontology_source_references
            .iter()
            .any(|existing| existing.name == source.name)
        {
            self.ontology_source_references.push(source);
        }
    }

    pub fn get_ontology_source(&self, name: &str) -> Option<&OntologySource> {
        self.ontology_source_references
            .iter()
            .find(|source| source.name == name)
    }

    /// Reads an investigation with a fresh loader store that is dropped on return.
    pub fn load(value: &Json) -> Result<Self, IsaError> {
        let mut store = LoaderStore::new();
        let result = Self::from_dict(value, &mut store);
        store.clear();
        result
    }

    pub fn load_str(content: &str) -> Result<Self, IsaError> {
        let value: Json =
            serde_json::from_str(content).map_err(|err| IsaError::Json(err.to_string()))?;
        Self::load(&value)
    }

    pub fn to_json_string(&self, ld: Option<&LdContext>) -> Result<String, IsaError> {
        serde_json::to_string_pretty(&self.to_dict(ld)).map_err(|err| IsaError::Json(err.to_string()))
    }

    /// Every id carried by an entity anywhere below this investigation, in emission order.
    pub fn entity_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        for study in &self.studies {
            ids.extend(study.sources.iter().map(|source| source.id.as_str()));
            ids.extend(study.samples.iter().map(|sample| sample.id.as_str()));
            ids.extend(study.other_material.iter().map(|material| material.id.as_str()));
            ids.extend(study.process_sequence.iter().map(|process| process.id.as_str()));
            for assay in &study.assays {
                ids.extend(assay.other_material.iter().map(|material| material.id.as_str()));
                ids.extend(assay.data_files.iter().map(|data_file| data_file.id.as_str()));
                ids.extend(assay.process_sequence.iter().map(|process| process.id.as_str()));
            }
        }
        ids
    }

    pub fn duplicate_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.entity_ids()
            .into_iter()
            .filter(|id| !seen.insert(*id))
            .collect()
    }

    /// Names of every term source an annotation below this investigation points at.
    pub fn referenced_term_sources(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        collect_term_sources(&self.to_dict(None), &mut names);
        names
    }

    /// Adds a bare source for each referenced term source not declared yet; returns the added names.
    pub fn declare_referenced_sources(&mut self) -> Vec<String> {
        let missing: Vec<String> = self
            .referenced_term_sources()
            .into_iter()
            .filter(|name| self.get_ontology_source(name).is_none())
            .collect();
        for name in &missing {
            debug!(source = %name, "declaring referenced term source");
            self.add_ontology_source(OntologySource::new(name.as_str()));
        }
        missing
    }
}

fn collect_term_sources(value: &Json, names: &mut BTreeSet<String>) {
    match value {
        Json::Object(map) => {
            for (key, value) in map {
                match (key.as_str(), value) {
                    ("termSource", Json::String(name)) if !name.is_empty() => {
                        names.insert(name.clone());
                    }
                    _ => collect_term_sources(value, names),
                }
            }
        }
        Json::Array(items) => {
            for item in items {
                collect_term_sources(item, names);
            }
        }
        _ => {}
    }
}

impl_commentable!(Investigation);

impl IsaDict for Investigation {
    const LD_TYPE: &'static str = "Investigation";

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
        map.insert("comments".to_string(), to_dicts(&self.comments, ld));
        map.insert(
            "ontologySourceReferences".to_string(),
            to_dicts(&self.ontology_source_references, ld),
        );
        map.insert("people".to_string(), to_dicts(&self.contacts, ld));
        map.insert("publications".to_string(), to_dicts(&self.publications, ld));
        map.insert("studies".to_string(), to_dicts(&self.studies, ld));
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Json, store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "Investigation")?;
        let mut ontology_source_references = Vec::new();
        for item in array_field(map, "Investigation", "ontologySourceReferences")? {
            let source = OntologySource::from_dict(item, store)?;
            store.register_term_source(&source);
            ontology_source_references.push(source);
        }
        let identifier = str_field(map, "Investigation", "identifier")?;
        let id = str_field(map, "Investigation", "@id")?;
        let studies = from_dicts::<Study>(map, "Investigation", "studies", store)?;
        debug!(
            studies = studies.len(),
            indexed = store.len(),
            "investigation references resolved"
        );
        Ok(Self {
            id: if id.is_empty() {
                Identifier::ordinal("investigation", &identifier)
            } else {
                id
            },
            filename: str_field(map, "Investigation", "filename")?,
            identifier,
            title: str_field(map, "Investigation", "title")?,
            description: str_field(map, "Investigation", "description")?,
            submission_date: str_field(map, "Investigation", "submissionDate")?,
            public_release_date: str_field(map, "Investigation", "publicReleaseDate")?,
            ontology_source_references,
            publications: from_dicts(map, "Investigation", "publications", store)?,
            contacts: from_dicts(map, "Investigation", "people", store)?,
            studies,
            comments: from_dicts(map, "Investigation", "comments", store)?,
        })
    }
}
