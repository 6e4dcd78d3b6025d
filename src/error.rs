//! Error types, one enum per concern.
//!
//! Library code returns these; the CLI wraps them in `anyhow` with context.

use thiserror::Error;

use crate::ir::PrimitiveKind;
use crate::path_de::PathError;
use crate::type_table::Target;

/// Violations caught while constructing IR nodes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// Contract and enumeration names must start with an upper-case letter.
    #[error("invalid name '{name}': must be non-empty and start with an upper-case letter")]
    InvalidName { name: String },

    #[error("contract '{contract}' declares field '{field}' more than once")]
    DuplicateField { contract: String, field: String },

    #[error("union field '{field}' in contract '{contract}' has no variants")]
    EmptyUnion { contract: String, field: String },

    #[error("enumeration '{name}' has no members")]
    EmptyEnum { name: String },

    #[error("enumeration '{name}' declares member '{member}' more than once")]
    DuplicateMember { name: String, member: String },
}

/// Failures while rendering text artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenError {
    /// The type table for `target` has no spelling for `kind`.
    #[error("unknown field type for '{field}': {kind} has no {target} spelling")]
    UnknownFieldType {
        field: String,
        kind: PrimitiveKind,
        target: Target,
    },
}

/// Failures converting between instances and wire data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    #[error("at {path}: expected {expected}, found {found}")]
    Conversion {
        path: String,
        expected: String,
        found: &'static str,
    },

    #[error("at {path}: value matches none of the {tried} union variants")]
    NoUnionVariant { path: String, tried: usize },

    /// A required field is absent from the input (validation pass only).
    #[error("missing required field '{field}' for contract '{contract}'")]
    MissingField { contract: String, field: String },

    #[error("no contract named '{name}' is registered")]
    UnknownContract { name: String },

    #[error("contract '{contract}' has no attribute '{attribute}'")]
    UnknownAttribute { contract: String, attribute: String },

    #[error("attribute '{attribute}' of contract '{contract}' expects {expected}")]
    TypeMismatch {
        contract: String,
        attribute: String,
        expected: String,
    },
}

/// Registry insertion failures. Raised at definition time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("contract '{name}' is already registered")]
    DuplicateContract { name: String },

    /// A contract reaches a dependency whose name is registered to a different definition.
    #[error("contract '{owner}' references a '{name}' that differs from the registered '{name}'")]
    InconsistentReference { owner: String, name: String },
}

/// Failures lowering external schema documents into contracts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    #[error("unknown field type '{tag}' for field '{field}'")]
    UnknownFieldType { field: String, tag: String },

    #[error("field '{field}' references contract '{name}', which is not defined yet")]
    UnresolvedContract { field: String, name: String },

    #[error("action '{action}' references contract '{name}', which is not defined")]
    UnresolvedAction { action: String, name: String },

    #[error("field '{field}' of type {tag} is missing its '{attribute}' attribute")]
    MissingAttribute {
        field: String,
        tag: String,
        attribute: &'static str,
    },

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Parse(#[from] PathError),
}

/// The external formatter rejected generated text.
///
/// `raw` always carries the unformatted source so callers can show it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("formatter `{program}` failed: {message}")]
    Failed {
        program: String,
        message: String,
        raw: String,
    },
}

impl FormatError {
    pub fn raw(&self) -> &str {
        match self {
            FormatError::Failed { raw, .. } => raw,
        }
    }
}
