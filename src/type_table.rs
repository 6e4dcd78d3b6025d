//! Primitive spellings per output target.

use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::ir::PrimitiveKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Slotted value-object classes.
    Python,
    /// Structural interfaces.
    TypeScript,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Python => f.write_str("python"),
            Target::TypeScript => f.write_str("typescript"),
        }
    }
}

static PYTHON: Lazy<TypeTable> = Lazy::new(|| {
    TypeTable::new(Target::Python, [
        (PrimitiveKind::String, "str"),
        (PrimitiveKind::Integer, "int"),
        (PrimitiveKind::Decimal, "decimal.Decimal"),
        (PrimitiveKind::Float, "float"),
        (PrimitiveKind::DateTime, "datetime.datetime"),
        (PrimitiveKind::Boolean, "bool"),
        (PrimitiveKind::Dict, "dict"),
    ])
});

static TYPESCRIPT: Lazy<TypeTable> = Lazy::new(|| {
    TypeTable::new(Target::TypeScript, [
        (PrimitiveKind::String, "string"),
        (PrimitiveKind::Integer, "number"),
        (PrimitiveKind::Decimal, "number"),
        (PrimitiveKind::Float, "number"),
        (PrimitiveKind::DateTime, "string"),
        (PrimitiveKind::Boolean, "boolean"),
        (PrimitiveKind::Dict, "{}"),
    ])
});

/// Lookup table from primitive kind to its textual spelling, plus the
/// target's collection and union syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTable {
    target: Target,
    spellings: IndexMap<PrimitiveKind, String>,
}

impl TypeTable {
    pub fn new<I, S>(target: Target, entries: I) -> Self
    where
        I: IntoIterator<Item = (PrimitiveKind, S)>,
        S: Into<String>,
    {
        let spellings = entries.into_iter().map(|(k, s)| (k, s.into())).collect();
        Self { target, spellings }
    }

    pub fn python() -> &'static TypeTable {
        &PYTHON
    }
    pub fn typescript() -> &'static TypeTable {
        &TYPESCRIPT
    }
    pub fn for_target(target: Target) -> &'static TypeTable {
        match target {
            Target::Python => Self::python(),
            Target::TypeScript => Self::typescript(),
        }
    }

    /// Copy of this table with some spellings replaced or added.
    pub fn with_overrides(&self, overrides: &IndexMap<PrimitiveKind, String>) -> TypeTable {
        let mut out = self.clone();
        for (kind, spelling) in overrides {
            out.spellings.insert(*kind, spelling.clone());
        }
        out
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn spell(&self, kind: PrimitiveKind) -> Option<&str> {
        self.spellings.get(&kind).map(String::as_str)
    }

    pub fn list(&self, item: &str) -> String {
        match self.target {
            Target::Python => format!("typing.List[{item}]"),
            Target::TypeScript => format!("Array<{item}>"),
        }
    }

    pub fn union(&self, arms: &[String]) -> String {
        match self.target {
            Target::Python => format!("typing.Union[{}]", arms.join(", ")),
            Target::TypeScript => arms.join("|"),
        }
    }
}
