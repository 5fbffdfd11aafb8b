pub mod arm;
pub mod assay_graph;
pub mod cell;
pub mod codec;
pub mod declaration;
pub mod element;
pub mod external;
pub mod factory;
pub mod materialize;
pub mod plan;
pub mod quality_control;
pub mod study_design;

pub use arm::{ArmEntry, StudyArm};
pub use assay_graph::{AssayGraph, ProductNode, ProductType, ProtocolNode, QualityControl, SequenceNode};
pub use cell::StudyCell;
pub use codec::DesignJson;
pub use declaration::{AssayDeclaration, ProductDeclaration, TermDeclaration};
pub use element::{CellItem, Element, InterventionType, NonTreatment, NonTreatmentType, Treatment};
pub use external::ExternalStudyConfig;
pub use factory::{GroupSizes, NonTreatmentMaps, StudyDesignFactory, TreatmentFactory};
pub use materialize::{GeneratedAssay, MaterializeOptions, generate_assay};
pub use plan::SampleAndAssayPlan;
pub use study_design::StudyDesign;
