//! Text generators for contracts.
//!
//! Both generators follow the same shape: `new(options)`, `emit` per
//! contract, then `into_string` for the whole batch. Rendering never
//! requires the external formatter; see [`crate::format`].
pub mod python;
pub mod typescript;

pub use python::{PythonCodegen, PythonOptions};
pub use typescript::{ActionBinding, TypeScriptCodegen, TypeScriptOptions};

use crate::error::GenError;
use crate::ir::Contract;

/// A contract that failed to render during an isolated batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub contract: String,
    pub error: GenError,
}

impl Failure {
    fn new(contract: &Contract, error: GenError) -> Self {
        Self { contract: contract.name().to_owned(), error }
    }
}
