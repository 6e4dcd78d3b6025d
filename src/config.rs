//! Generator settings loadable from a JSON file.
//!
//! ```json
//! {
//!   "python": { "base_class": "app.slots.Slot", "include_imports": true },
//!   "typescript": { "runtime_module": "./api", "types": { "DECIMAL": "string" } }
//! }
//! ```
//!
//! Every key is optional; missing keys keep the defaults.

use serde::Deserialize;

use crate::codegen::{PythonOptions, TypeScriptOptions};
use crate::path_de::{PathError, from_str_with_path};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub python: PythonOptions,
    pub typescript: TypeScriptOptions,
}

impl GeneratorConfig {
    pub fn from_json_str(src: &str) -> Result<Self, PathError> {
        from_str_with_path(src)
    }
}
