use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum IsaError {
    #[error("{class}.{attribute} must not be {value:?} ({value_type})")]
    #[diagnostic(code(isa::type_violation))]
    TypeViolation {
        class: String,
        attribute: String,
        value: String,
        value_type: String,
    },

    #[error("cell {cell}: {message}")]
    #[diagnostic(code(isa::cell_order))]
    CellOrderViolation { cell: String, message: String },

    #[error("arm {arm}: {message}")]
    #[diagnostic(code(isa::arm_order))]
    ArmOrderViolation { arm: String, message: String },

    #[error("{kind} with name {name} is already present")]
    #[diagnostic(code(isa::duplicate_name))]
    DuplicateName { kind: String, name: String },

    #[error("unresolved {kind} reference: {id}")]
    #[diagnostic(code(isa::missing_reference))]
    MissingReference { kind: String, id: String },

    #[error("assay graph {graph}: {message}")]
    #[diagnostic(code(isa::graph_topology))]
    GraphTopology { graph: String, message: String },

    #[error("parameter value {parameter} has unit {unit} but non-numeric value {value:?}")]
    #[diagnostic(code(isa::param_unit_mismatch))]
    ParamUnitMismatch {
        parameter: String,
        unit: String,
        value: String,
    },

    #[error("group sizes: expected {expected} entries, got {actual}")]
    #[diagnostic(code(isa::group_size_mismatch))]
    GroupSizeMismatch { expected: usize, actual: usize },

    #[error("failed to read config file at {0}")]
    #[diagnostic(code(isa::config_read))]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse config: {0}")]
    #[diagnostic(code(isa::config_parse))]
    ConfigParse(String),

    #[error("malformed ISA JSON: {0}")]
    #[diagnostic(code(isa::json))]
    Json(String),

    #[error("filesystem error: {0}")]
    #[diagnostic(code(isa::filesystem))]
    Filesystem(String),

    #[error("invalid value: {0}")]
    #[diagnostic(code(isa::invalid_value))]
    InvalidValue(String),
}

impl IsaError {
    pub fn code(&self) -> &'static str {
        match self {
            IsaError::TypeViolation { .. } => "isa::type_violation",
            IsaError::CellOrderViolation { .. } => "isa::cell_order",
            IsaError::ArmOrderViolation { .. } => "isa::arm_order",
            IsaError::DuplicateName { .. } => "isa::duplicate_name",
            IsaError::MissingReference { .. } => "isa::missing_reference",
            IsaError::GraphTopology { .. } => "isa::graph_topology",
            IsaError::ParamUnitMismatch { .. } => "isa::param_unit_mismatch",
            IsaError::GroupSizeMismatch { .. } => "isa::group_size_mismatch",
            IsaError::ConfigRead(_) => "isa::config_read",
            IsaError::ConfigParse(_) => "isa::config_parse",
            IsaError::Json(_) => "isa::json",
            IsaError::Filesystem(_) => "isa::filesystem",
            IsaError::InvalidValue(_) => "isa::invalid_value",
        }
    }

    pub fn type_violation(
        class: &str,
        attribute: &str,
        value: impl Into<String>,
        value_type: &str,
    ) -> Self {
        IsaError::TypeViolation {
            class: class.to_string(),
            attribute: attribute.to_string(),
            value: value.into(),
            value_type: value_type.to_string(),
        }
    }

    pub fn cell(cell: &str, message: impl Into<String>) -> Self {
        IsaError::CellOrderViolation {
            cell: cell.to_string(),
            message: message.into(),
        }
    }

    pub fn arm(arm: &str, message: impl Into<String>) -> Self {
        IsaError::ArmOrderViolation {
            arm: arm.to_string(),
            message: message.into(),
        }
    }

    pub fn missing(kind: &str, id: impl Into<String>) -> Self {
        IsaError::MissingReference {
            kind: kind.to_string(),
            id: id.into(),
        }
    }

    pub fn topology(graph: &str, message: impl Into<String>) -> Self {
        IsaError::GraphTopology {
            graph: graph.to_string(),
            message: message.into(),
        }
    }
}
