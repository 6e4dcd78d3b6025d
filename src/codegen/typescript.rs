//! Structural interfaces, enumerations and action bindings.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use super::Failure;
use crate::error::GenError;
use crate::ir::{Contract, Enumeration, PrimitiveKind};
use crate::type_table::TypeTable;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypeScriptOptions {
    /// Open the artifact with an import of the runtime helper when bindings exist.
    pub import_runtime: bool,
    pub runtime_module: String,
    pub runtime_alias: String,
    /// Name of the exported literal listing every bound action.
    pub registry_name: String,
    pub types: IndexMap<PrimitiveKind, String>,
}

impl Default for TypeScriptOptions {
    fn default() -> Self {
        Self {
            import_runtime: true,
            runtime_module: "./instructor".to_owned(),
            runtime_alias: "instructor".to_owned(),
            registry_name: "SLOTO_ACTION_CREATORS".to_owned(),
            types: IndexMap::new(),
        }
    }
}

/// A contract bound to a named remote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionBinding {
    pub name: String,
    pub contract: Arc<Contract>,
    /// Spliced in before the dispatch.
    pub pre_action: String,
    /// Passed as the endpoint callback argument.
    pub callback: String,
}

impl ActionBinding {
    pub fn new(name: impl Into<String>, contract: Arc<Contract>) -> Self {
        Self { name: name.into(), contract, pre_action: String::new(), callback: String::new() }
    }
}

pub struct TypeScriptCodegen {
    options: TypeScriptOptions,
    table: TypeTable,
    blocks: Vec<String>,
    actions: Vec<ActionBinding>,
}

impl TypeScriptCodegen {
    pub fn new(options: TypeScriptOptions) -> Self {
        let table = TypeTable::typescript().with_overrides(&options.types);
        Self { options, table, blocks: Vec::new(), actions: Vec::new() }
    }

    pub fn with_table(mut self, table: TypeTable) -> Self {
        self.table = table;
        self
    }

    pub fn render_interface(&self, contract: &Contract) -> Result<String, GenError> {
        let members = contract
            .fields()
            .iter()
            .map(|f| {
                let ty = f.render(&self.table)?;
                let mark = if f.required { "" } else { "?" };
                Ok(format!("  {}{}: {}", f.name, mark, ty))
            })
            .collect::<Result<Vec<_>, GenError>>()?;
        if members.is_empty() {
            return Ok(format!("export interface {} {{}}", contract.name()));
        }
        Ok(format!("export interface {} {{\n{}\n}}", contract.name(), members.join("\n")))
    }

    pub fn render_enum(&self, enumeration: &Enumeration) -> String {
        let members = enumeration
            .members()
            .iter()
            .map(|m| format!("  {m} = '{m}'"))
            .collect::<Vec<_>>()
            .join(",\n");
        format!("export enum {} {{\n{}\n}}", enumeration.name(), members)
    }

    pub fn render_binding(&self, action: &ActionBinding) -> String {
        format!(
            "export function {name}(requestBody: {ty}): any {{
    return (dispatch) => {{{pre}
        return dispatch(
            {alias}.callEndpoint(\"{name}\", requestBody, {callback})
        )
    }}
}}",
            name = action.name,
            ty = action.contract.name(),
            pre = action.pre_action,
            alias = self.options.runtime_alias,
            callback = action.callback,
        )
    }

    pub fn emit(&mut self, contract: &Contract) -> Result<(), GenError> {
        debug!(contract = contract.name(), "rendering interface");
        let block = self.render_interface(contract)?;
        self.blocks.push(block);
        Ok(())
    }

    pub fn emit_enum(&mut self, enumeration: &Enumeration) {
        let block = self.render_enum(enumeration);
        self.blocks.push(block);
    }

    pub fn bind(&mut self, action: ActionBinding) {
        self.actions.push(action);
    }

    pub fn emit_all<'a, I>(&mut self, contracts: I) -> Result<(), GenError>
    where
        I: IntoIterator<Item = &'a Contract>,
    {
        contracts.into_iter().try_for_each(|c| self.emit(c))
    }

    pub fn emit_isolated<'a, I>(&mut self, contracts: I) -> Vec<Failure>
    where
        I: IntoIterator<Item = &'a Contract>,
    {
        contracts
            .into_iter()
            .filter_map(|c| self.emit(c).err().map(|error| Failure::new(c, error)))
            .collect()
    }

    pub fn into_string(self) -> String {
        let mut out = Vec::with_capacity(self.blocks.len() + 3);
        if self.options.import_runtime && !self.actions.is_empty() {
            out.push(format!(
                "import * as {} from \"{}\"",
                self.options.runtime_alias, self.options.runtime_module
            ));
        }
        let bindings = self.actions.iter().map(|a| self.render_binding(a)).collect::<Vec<_>>();
        out.extend(self.blocks);
        if !bindings.is_empty() {
            out.push(bindings.join("\n\n"));
            let names = self.actions.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(",\n");
            out.push(format!("export const {} = {{ {} }}", self.options.registry_name, names));
        }
        out.join("\n\n")
    }
}
