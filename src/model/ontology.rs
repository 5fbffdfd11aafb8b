use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde_json::{Map, Value};

use crate::error::IsaError;
use crate::impl_commentable;
use crate::model::comment::Comment;
use crate::model::dict::{IsaDict, LdContext, as_object, finish, from_dicts, str_field, to_dicts};
use crate::model::identifiers::Identifier;
use crate::model::store::LoaderStore;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct OntologySource {
    pub name: String,
    pub file: String,
    pub version: String,
    pub description: String,
    pub comments: Vec<Comment>,
}

impl OntologySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_details(
        name: impl Into<String>,
        file: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            version: version.into(),
            description: description.into(),
            comments: Vec::new(),
        }
    }
}

impl IsaDict for OntologySource {
    const LD_TYPE: &'static str = "OntologySource";

    fn to_dict(&self, ld: Option<&LdContext>) -> Value {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String(self.name.clone()));
        map.insert("file".to_string(), Value::String(self.file.clone()));
        map.insert("version".to_string(), Value::String(self.version.clone()));
        map.insert(
            "description".to_string(),
            Value::String(self.description.clone()),
        );
        map.insert("comments".to_string(), to_dicts(&self.comments, ld));
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Value, store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "OntologySource")?;
        Ok(Self {
            name: str_field(map, "OntologySource", "name")?,
            file: str_field(map, "OntologySource", "file")?,
            version: str_field(map, "OntologySource", "version")?,
            description: str_field(map, "OntologySource", "description")?,
            comments: from_dicts(map, "OntologySource", "comments", store)?,
        })
    }
}

/// A term, optionally anchored in a declared ontology source.
///
/// The source is held by name; it must match one of the enclosing
/// investigation's `ontology_source_references`. Equality, ordering and
/// hashing ignore the id, so the same term built twice compares equal.
#[derive(Debug, Clone, Default)]
pub struct OntologyAnnotation {
    pub id: String,
    pub term: String,
    pub term_source: Option<String>,
    pub term_accession: String,
    pub comments: Vec<Comment>,
}

impl OntologyAnnotation {
    pub fn new(term: impl Into<String>) -> Self {
        let term = term.into();
        Self {
            id: Identifier::ordinal("ontology_annotation", &term),
            term,
            ..Self::default()
        }
    }

    pub fn sourced(
        term: impl Into<String>,
        term_source: impl Into<String>,
        term_accession: impl Into<String>,
    ) -> Self {
        let term = term.into();
        let term_source = term_source.into();
        Self {
            id: Identifier::ordinal("ontology_annotation", &format!("{term_source}-{term}")),
            term,
            term_source: (!term_source.is_empty()).then_some(term_source),
            term_accession: term_accession.into(),
            comments: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Identifier::namespaced("ontology_annotation", &id.into());
        self
    }

    fn key(&self) -> (&str, Option<&str>, &str, &[Comment]) {
        (
            &self.term,
            self.term_source.as_deref(),
            &self.term_accession,
            &self.comments,
        )
    }
}

impl PartialEq for OntologyAnnotation {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for OntologyAnnotation {}

impl Hash for OntologyAnnotation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for OntologyAnnotation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OntologyAnnotation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for OntologyAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.term)
    }
}

impl From<&str> for OntologyAnnotation {
    fn from(term: &str) -> Self {
        Self::new(term)
    }
}

impl From<String> for OntologyAnnotation {
    fn from(term: String) -> Self {
        Self::new(term)
    }
}

impl_commentable!(OntologySource, OntologyAnnotation);

impl IsaDict for OntologyAnnotation {
    const LD_TYPE: &'static str = "OntologyAnnotation";

    fn to_dict(&self, ld: Option<&LdContext>) -> Value {
        let mut map = Map::new();
        map.insert("@id".to_string(), Value::String(self.id.clone()));
        map.insert("annotationValue".to_string(), Value::String(self.term.clone()));
        map.insert(
            "termSource".to_string(),
            Value::String(self.term_source.clone().unwrap_or_default()),
        );
        map.insert(
            "termAccession".to_string(),
            Value::String(self.term_accession.clone()),
        );
        map.insert("comments".to_string(), to_dicts(&self.comments, ld));
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Value, store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "OntologyAnnotation")?;
        let term = match map.get("annotationValue") {
            Some(Value::Number(number)) => number.to_string(),
            _ => str_field(map, "OntologyAnnotation", "annotationValue")?,
        };
        let term_source = str_field(map, "OntologyAnnotation", "termSource")?;
        let term_source = if term_source.is_empty() {
            None
        } else {
            Some(store.term_source(&term_source)?.name.clone())
        };
        let id = str_field(map, "OntologyAnnotation", "@id")?;
        let mut annotation = Self {
            id: String::new(),
            term,
            term_source,
            term_accession: str_field(map, "OntologyAnnotation", "termAccession")?,
            comments: from_dicts(map, "OntologyAnnotation", "comments", store)?,
        };
        annotation.id = if id.is_empty() {
            Identifier::ordinal("ontology_annotation", &annotation.term)
        } else {
            id
        };
        Ok(annotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_id() {
        let left = OntologyAnnotation::new("time").with_id("a");
        let right = OntologyAnnotation::new("time").with_id("b");
        assert_eq!(left, right);
        assert_ne!(left.id, right.id);
    }

    #[test]
    fn sourced_annotation_keeps_source_name() {
        let human = OntologyAnnotation::sourced("Human", "NCIT", "http://purl.obolibrary.org/obo/NCIT_C14225");
        assert_eq!(human.term_source.as_deref(), Some("NCIT"));
        assert_eq!(human.id, "#ontology_annotation/NCIT-Human");
    }
}
