use serde_json::{Map, Value as Json};

use crate::error::IsaError;
use crate::impl_commentable;
use crate::model::comment::Comment;
use crate::model::dict::{IsaDict, LdContext, as_object, finish, from_dicts, str_field, to_dicts};
use crate::model::ontology::OntologyAnnotation;
use crate::model::store::LoaderStore;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Person {
    pub last_name: String,
    pub first_name: String,
    pub mid_initials: String,
    pub email: String,
    pub phone: String,
    pub fax: String,
    pub address: String,
    pub affiliation: String,
    pub roles: Vec<OntologyAnnotation>,
    pub comments: Vec<Comment>,
}

impl Person {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Publication {
    pub pubmed_id: String,
    pub doi: String,
    pub author_list: String,
    pub title: String,
    pub status: Option<OntologyAnnotation>,
    pub comments: Vec<Comment>,
}

impl_commentable!(Person, Publication);

impl IsaDict for Person {
    const LD_TYPE: &'static str = "Person";

    fn to_dict(&self, ld: Option<&LdContext>) -> Json {
        let mut map = Map::new();
        for (key, value) in [
            ("lastName", &self.last_name),
            ("firstName", &self.first_name),
            ("midInitials", &self.mid_initials),
            ("email", &self.email),
            ("phone", &self.phone),
            ("fax", &self.fax),
            ("address", &self.address),
            ("affiliation", &self.affiliation),
        ] {
            map.insert(key.to_string(), Json::String(value.clone()));
        }
        map.insert("roles".to_string(), to_dicts(&self.roles, ld));
        map.insert("comments".to_string(), to_dicts(&self.comments, ld));
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Json, store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "Person")?;
        Ok(Self {
            last_name: str_field(map, "Person", "lastName")?,
            first_name: str_field(map, "Person", "firstName")?,
            mid_initials: str_field(map, "Person", "midInitials")?,
            email: str_field(map, "Person", "email")?,
            phone: str_field(map, "Person", "phone")?,
            fax: str_field(map, "Person", "fax")?,
            address: str_field(map, "Person", "address")?,
            affiliation: str_field(map, "Person", "affiliation")?,
            roles: from_dicts(map, "Person", "roles", store)?,
            comments: from_dicts(map, "Person", "comments", store)?,
        })
    }
}

impl IsaDict for Publication {
    const LD_TYPE: &'static str = "Publication";

    fn to_dict(&self, ld: Option<&LdContext>) -> Json {
        let mut map = Map::new();
        map.insert("pubMedID".to_string(), Json::String(self.pubmed_id.clone()));
        map.insert("doi".to_string(), Json::String(self.doi.clone()));
        map.insert(
            "authorList".to_string(),
            Json::String(self.author_list.clone()),
        );
        map.insert("title".to_string(), Json::String(self.title.clone()));
        if let Some(status) = &self.status {
            map.insert("status".to_string(), status.to_dict(ld));
        }
        map.insert("comments".to_string(), to_dicts(&self.comments, ld));
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Json, store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "Publication")?;
        let status = match map.get("status") {
            None | Some(Json::Null) => None,
            Some(status) => Some(OntologyAnnotation::from_dict(status, store)?),
        };
        Ok(Self {
            pubmed_id: str_field(map, "Publication", "pubMedID")?,
            doi: str_field(map, "Publication", "doi")?,
            author_list: str_field(map, "Publication", "authorList")?,
            title: str_field(map, "Publication", "title")?,
            status,
            comments: from_dicts(map, "Publication", "comments", store)?,
        })
    }
}
