//! Contract IR → slotted value objects, structural interfaces, and a
//! marshaller between typed instances and JSON.
pub mod cli;
pub mod codegen;
pub mod config;
pub mod error;
pub mod format;
pub mod ir;
pub mod jq_exec;
pub mod lower;
pub mod marshal;
pub mod path_de;
pub mod registry;
pub mod type_table;

pub use error::{ContractError, FormatError, GenError, LowerError, MarshalError, RegistryError};
pub use ir::{Contract, Enumeration, Field, FieldKind, PrimitiveKind};
pub use marshal::{Instance, Marshaller, Value};
pub use registry::Registry;
pub use type_table::{Target, TypeTable};
