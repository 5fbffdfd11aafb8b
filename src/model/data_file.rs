use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::error::IsaError;
use crate::impl_commentable;
use crate::model::comment::Comment;
use crate::model::dict::{
    IsaDict, LdContext, array_field, as_object, finish, from_dicts, ref_id, reference, str_field,
    to_dicts,
};
use crate::model::identifiers::Identifier;
use crate::model::store::{IoKind, LoaderStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataFileKind {
    #[default]
    RawData,
    DerivedData,
    RawSpectralData,
    DerivedArrayData,
    ArrayData,
    DerivedSpectralData,
    ProteinAssignment,
    PeptideAssignment,
    DerivedArrayDataMatrix,
    PostTranslationalModificationAssignment,
    AcquisitionParameterData,
    FreeInductionDecayData,
}

impl DataFileKind {
    pub const ALL: [DataFileKind; 12] = [
        DataFileKind::RawData,
        DataFileKind::DerivedData,
        DataFileKind::RawSpectralData,
        DataFileKind::DerivedArrayData,
        DataFileKind::ArrayData,
        DataFileKind::DerivedSpectralData,
        DataFileKind::ProteinAssignment,
        DataFileKind::PeptideAssignment,
        DataFileKind::DerivedArrayDataMatrix,
        DataFileKind::PostTranslationalModificationAssignment,
        DataFileKind::AcquisitionParameterData,
        DataFileKind::FreeInductionDecayData,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DataFileKind::RawData => "Raw Data File",
            DataFileKind::DerivedData => "Derived Data File",
            DataFileKind::RawSpectralData => "Raw Spectral Data File",
            DataFileKind::DerivedArrayData => "Derived Array Data File",
            DataFileKind::ArrayData => "Array Data File",
            DataFileKind::DerivedSpectralData => "Derived Spectral Data File",
            DataFileKind::ProteinAssignment => "Protein Assignment File",
            DataFileKind::PeptideAssignment => "Peptide Assignment File",
            DataFileKind::DerivedArrayDataMatrix => "Derived Array Data Matrix File",
            DataFileKind::PostTranslationalModificationAssignment => {
                "Post Translational Modification Assignment File"
            }
            DataFileKind::AcquisitionParameterData => "Acquisition Parameter Data File",
            DataFileKind::FreeInductionDecayData => "Free Induction Decay Data File",
        }
    }
}

impl fmt::Display for DataFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for DataFileKind {
    type Err = IsaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        DataFileKind::ALL
            .into_iter()
            .find(|kind| {
                kind.label() == normalized || kind.label().replace(' ', "") == normalized
            })
            .ok_or_else(|| IsaError::type_violation("DataFile", "label", value, "str"))
    }
}

impl TryFrom<String> for DataFileKind {
    type Error = IsaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataFileKind> for String {
    fn from(value: DataFileKind) -> Self {
        value.label().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DataFile {
    pub id: String,
    pub filename: String,
    pub kind: DataFileKind,
    /// Ids of the samples whose processing produced this file.
    pub generated_from: Vec<String>,
    pub comments: Vec<Comment>,
}

impl DataFile {
    pub fn new(filename: impl Into<String>, kind: DataFileKind) -> Self {
        let filename = filename.into();
        Self {
            id: Identifier::ordinal("data_file", &filename),
            filename,
            kind,
            ..Self::default()
        }
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }
}

impl_commentable!(DataFile);

impl IsaDict for DataFile {
    const LD_TYPE: &'static str = "DataFile";

    fn to_dict(&self, ld: Option<&LdContext>) -> Json {
        let mut map = Map::new();
        map.insert("@id".to_string(), Json::String(self.id.clone()));
        map.insert("name".to_string(), Json::String(self.filename.clone()));
        map.insert("type".to_string(), Json::String(self.kind.label().to_string()));
        map.insert(
            "generatedFrom".to_string(),
            Json::Array(self.generated_from.iter().map(|id| reference(id)).collect()),
        );
        map.insert("comments".to_string(), to_dicts(&self.comments, ld));
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Json, store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "DataFile")?;
        let filename = str_field(map, "DataFile", "name")?;
        let id = str_field(map, "DataFile", "@id")?;
        let generated_from = array_field(map, "DataFile", "generatedFrom")?
            .iter()
            .map(|item| {
                let id = ref_id(item, "DataFile", "generatedFrom")?;
                store.expect_material(&id, &[IoKind::Sample])?;
                Ok(id)
            })
            .collect::<Result<Vec<_>, IsaError>>()?;
        let data_file = Self {
            id: if id.is_empty() {
                Identifier::ordinal("data_file", &filename)
            } else {
                id
            },
            filename,
            kind: str_field(map, "DataFile", "type")?.parse()?,
            generated_from,
            comments: from_dicts(map, "DataFile", "comments", store)?,
        };
        store.register_material(&data_file.id, IoKind::DataFile);
        Ok(data_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_with_or_without_spaces() {
        for kind in DataFileKind::ALL {
            assert_eq!(kind.label().parse::<DataFileKind>().unwrap(), kind);
        }
        assert_eq!(
            "RawSpectralDataFile".parse::<DataFileKind>().unwrap(),
            DataFileKind::RawSpectralData
        );
        assert!("Spreadsheet".parse::<DataFileKind>().is_err());
    }
}
