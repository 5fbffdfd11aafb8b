pub mod assay;
pub mod characteristic;
pub mod comment;
pub mod data_file;
pub mod dict;
pub mod factor;
pub mod graph;
pub mod identifiers;
pub mod investigation;
pub mod material;
pub mod ontology;
pub mod people;
pub mod process;
pub mod protocol;
pub mod store;
pub mod study;
pub mod value;

pub use assay::Assay;
pub use characteristic::Characteristic;
pub use comment::{Comment, Commentable};
pub use data_file::{DataFile, DataFileKind};
pub use dict::{ContextPath, IsaDict, LdContext, Vocabulary};
pub use factor::{FactorValue, StudyFactor};
pub use graph::{ProcessGraph, infer_process_links};
pub use identifiers::{IdGenerator, Identifier, SequentialIdGenerator, UuidGenerator};
pub use investigation::Investigation;
pub use material::{Material, MaterialKind, QcSampleType, Sample, Source};
pub use ontology::{OntologyAnnotation, OntologySource};
pub use people::{Person, Publication};
pub use process::{Process, ProcessIo, plink, plink_at};
pub use protocol::{ParameterValue, Protocol, ProtocolParameter};
pub use store::{IoKind, LoaderStore};
pub use study::{ShuffleTarget, Study};
pub use value::Value;
