//! Name → contract lookup owned by the driver.
//!
//! Filled once while schemas are loaded, then only read. Insertion fails on a
//! duplicate name, and on a contract whose dependency graph disagrees with what
//! is already registered, so lookups by name and the `Arc` graph the
//! generators walk always resolve to the same definitions.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::RegistryError;
use crate::ir::Contract;

#[derive(Debug, Clone, Default)]
pub struct Registry {
    contracts: IndexMap<String, Arc<Contract>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, contract: Arc<Contract>) -> Result<(), RegistryError> {
        if self.contracts.contains_key(contract.name()) {
            return Err(RegistryError::DuplicateContract { name: contract.name().to_owned() });
        }
        self.check_reachable(&contract)?;
        debug!(contract = contract.name(), fields = contract.fields().len(), "registered contract");
        self.contracts.insert(contract.name().to_owned(), contract);
        Ok(())
    }

    /// Wrap, register and hand back the shared contract.
    pub fn define(&mut self, contract: Contract) -> Result<Arc<Contract>, RegistryError> {
        let contract = Arc::new(contract);
        self.insert(contract.clone())?;
        Ok(contract)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Contract>> {
        self.contracts.get(name)
    }
    pub fn contains(&self, name: &str) -> bool {
        self.contracts.contains_key(name)
    }
    pub fn len(&self) -> usize {
        self.contracts.len()
    }
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
    /// Registered contracts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Contract>> {
        self.contracts.values()
    }

    /// Every registered contract plus everything it reaches, dependencies
    /// before dependents, otherwise in insertion order.
    pub fn dependency_order(&self) -> Vec<Arc<Contract>> {
        fn visit(contract: &Arc<Contract>, seen: &mut HashSet<String>, out: &mut Vec<Arc<Contract>>) {
            if !seen.insert(contract.name().to_owned()) {
                return;
            }
            for dep in contract.dependencies() {
                visit(dep, seen, out);
            }
            out.push(contract.clone());
        }

        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(self.contracts.len());
        for contract in self.contracts.values() {
            visit(contract, &mut seen, &mut out);
        }
        out
    }

    fn check_reachable(&self, root: &Arc<Contract>) -> Result<(), RegistryError> {
        let mut seen: HashSet<*const Contract> = HashSet::new();
        let mut stack: Vec<&Arc<Contract>> = root.dependencies();
        while let Some(dep) = stack.pop() {
            if !seen.insert(Arc::as_ptr(dep)) {
                continue;
            }
            if dep.name() == root.name() && **dep != **root {
                return Err(RegistryError::InconsistentReference {
                    owner: root.name().to_owned(),
                    name: dep.name().to_owned(),
                });
            }
            if let Some(known) = self.contracts.get(dep.name()) {
                if !Arc::ptr_eq(known, dep) && **known != **dep {
                    return Err(RegistryError::InconsistentReference {
                        owner: root.name().to_owned(),
                        name: dep.name().to_owned(),
                    });
                }
            }
            stack.extend(dep.dependencies());
        }
        Ok(())
    }
}
