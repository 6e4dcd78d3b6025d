//! Slotted value-object classes.

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use super::Failure;
use crate::error::GenError;
use crate::ir::{Contract, PrimitiveKind};
use crate::type_table::TypeTable;

const STANDARD_IMPORTS: [&str; 3] = ["datetime", "decimal", "typing"];

/// Rendered for optional parameters that were not supplied.
const ABSENT: &str = "None";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PythonOptions {
    /// Emit the shared import block once at the top of the batch.
    pub include_imports: bool,
    /// Dotted path of a class every generated class inherits from.
    pub base_class: Option<String>,
    /// Spelling overrides merged onto the default table.
    pub types: IndexMap<PrimitiveKind, String>,
}

impl Default for PythonOptions {
    fn default() -> Self {
        Self { include_imports: true, base_class: None, types: IndexMap::new() }
    }
}

pub struct PythonCodegen {
    options: PythonOptions,
    table: TypeTable,
    classes: Vec<String>,
}

impl PythonCodegen {
    pub fn new(options: PythonOptions) -> Self {
        let table = TypeTable::python().with_overrides(&options.types);
        Self { options, table, classes: Vec::new() }
    }

    pub fn with_table(mut self, table: TypeTable) -> Self {
        self.table = table;
        self
    }

    /// Render one class. Pure; does not touch the batch.
    pub fn render_class(&self, contract: &Contract) -> Result<String, GenError> {
        let params = contract
            .fields()
            .iter()
            .map(|f| {
                let ty = f.render(&self.table)?;
                Ok(if f.required {
                    format!("{}: {}", f.name, ty)
                } else {
                    format!("{}: {} = {}", f.name, ty, ABSENT)
                })
            })
            .collect::<Result<Vec<_>, GenError>>()?;

        let mut out = String::new();
        match self.options.base_class.as_deref() {
            Some(base) if !base.is_empty() => out.push_str(&format!("class {}({}):\n", contract.name(), base)),
            _ => out.push_str(&format!("class {}:\n", contract.name())),
        }

        let slots = contract.slot_names().map(|n| format!("'{n}'")).collect::<Vec<_>>().join(", ");
        out.push_str(&format!("    __slots__ = [{slots}]\n\n"));

        if params.is_empty() {
            out.push_str("    def __init__(self) -> None:\n");
            out.push_str("        pass");
            return Ok(out);
        }

        out.push_str("    def __init__(\n        self,\n");
        for param in &params {
            out.push_str(&format!("        {param},\n"));
        }
        out.push_str("    ) -> None:");
        for name in contract.slot_names() {
            out.push_str(&format!("\n        self.{name} = {name}"));
        }
        Ok(out)
    }

    pub fn emit(&mut self, contract: &Contract) -> Result<(), GenError> {
        debug!(contract = contract.name(), "rendering value object");
        let class = self.render_class(contract)?;
        self.classes.push(class);
        Ok(())
    }

    /// Emit every contract, stopping at the first failure.
    pub fn emit_all<'a, I>(&mut self, contracts: I) -> Result<(), GenError>
    where
        I: IntoIterator<Item = &'a Contract>,
    {
        contracts.into_iter().try_for_each(|c| self.emit(c))
    }

    /// Emit every contract that renders; collect the ones that don't.
    pub fn emit_isolated<'a, I>(&mut self, contracts: I) -> Vec<Failure>
    where
        I: IntoIterator<Item = &'a Contract>,
    {
        contracts
            .into_iter()
            .filter_map(|c| self.emit(c).err().map(|error| Failure::new(c, error)))
            .collect()
    }

    pub fn preamble(&self) -> String {
        let mut modules: Vec<&str> = STANDARD_IMPORTS.to_vec();
        // `pkg.mod.Base` needs `import pkg.mod`
        if let Some((module, _)) = self.options.base_class.as_deref().and_then(|b| b.rsplit_once('.')) {
            if !modules.contains(&module) {
                modules.push(module);
            }
        }
        modules.iter().map(|m| format!("import {m}")).collect::<Vec<_>>().join("\n")
    }

    pub fn into_string(self) -> String {
        let mut blocks = Vec::with_capacity(self.classes.len() + 1);
        if self.options.include_imports {
            blocks.push(self.preamble());
        }
        blocks.extend(self.classes);
        let mut out = blocks.join("\n\n\n");
        out.push('\n');
        out
    }
}
