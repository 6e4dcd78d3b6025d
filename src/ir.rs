//! Field-type IR shared by both generators and the marshaller.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ContractError, GenError};
use crate::type_table::TypeTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrimitiveKind {
    String,
    Integer,
    Decimal,
    Float,
    DateTime,
    Boolean,
    Dict,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 7] = [
        PrimitiveKind::String,
        PrimitiveKind::Integer,
        PrimitiveKind::Decimal,
        PrimitiveKind::Float,
        PrimitiveKind::DateTime,
        PrimitiveKind::Boolean,
        PrimitiveKind::Dict,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "STRING",
            PrimitiveKind::Integer => "INTEGER",
            PrimitiveKind::Decimal => "DECIMAL",
            PrimitiveKind::Float => "FLOAT",
            PrimitiveKind::DateTime => "DATETIME",
            PrimitiveKind::Boolean => "BOOLEAN",
            PrimitiveKind::Dict => "DICT",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The shape of one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Primitive(PrimitiveKind),
    /// Shared reference to an already-built contract.
    Nested(Arc<Contract>),
    List(Box<Field>),
    /// Variants in declared order.
    Union(Vec<Field>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Empty for anonymous union members.
    pub name: String,
    pub required: bool,
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), required: true, kind }
    }
    pub fn primitive(name: impl Into<String>, kind: PrimitiveKind) -> Self {
        Self::new(name, FieldKind::Primitive(kind))
    }
    pub fn nested(name: impl Into<String>, contract: Arc<Contract>) -> Self {
        Self::new(name, FieldKind::Nested(contract))
    }
    pub fn list(name: impl Into<String>, item: Field) -> Self {
        Self::new(name, FieldKind::List(Box::new(item)))
    }
    pub fn union(name: impl Into<String>, variants: Vec<Field>) -> Self {
        Self::new(name, FieldKind::Union(variants))
    }
    /// Marks the field as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Spell this field's type for the table's target.
    pub fn render(&self, table: &TypeTable) -> Result<String, GenError> {
        self.render_at(table, &self.name)
    }

    fn render_at(&self, table: &TypeTable, owner: &str) -> Result<String, GenError> {
        // anonymous members report errors under the nearest named ancestor
        let owner = if self.name.is_empty() { owner } else { self.name.as_str() };
        match &self.kind {
            FieldKind::Primitive(kind) => table
                .spell(*kind)
                .map(str::to_owned)
                .ok_or_else(|| GenError::UnknownFieldType {
                    field: owner.to_owned(),
                    kind: *kind,
                    target: table.target(),
                }),
            FieldKind::Nested(contract) => Ok(contract.name().to_owned()),
            FieldKind::List(item) => {
                let item = item.render_at(table, owner)?;
                Ok(table.list(&item))
            }
            FieldKind::Union(variants) => {
                let arms = variants
                    .iter()
                    .map(|v| v.render_at(table, owner))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(table.union(&arms))
            }
        }
    }

    /// Contracts referenced anywhere inside this field, in declaration order.
    fn collect_nested<'a>(&'a self, out: &mut Vec<&'a Arc<Contract>>) {
        match &self.kind {
            FieldKind::Primitive(_) => {}
            FieldKind::Nested(contract) => {
                if !out.iter().any(|c| Arc::ptr_eq(c, contract)) {
                    out.push(contract);
                }
            }
            FieldKind::List(item) => item.collect_nested(out),
            FieldKind::Union(variants) => {
                for v in variants {
                    v.collect_nested(out);
                }
            }
        }
    }

    fn check_unions(&self, contract: &str) -> Result<(), ContractError> {
        match &self.kind {
            FieldKind::Primitive(_) | FieldKind::Nested(_) => Ok(()),
            FieldKind::List(item) => item.check_unions(contract),
            FieldKind::Union(variants) if variants.is_empty() => Err(ContractError::EmptyUnion {
                contract: contract.to_owned(),
                field: self.name.clone(),
            }),
            FieldKind::Union(variants) => variants.iter().try_for_each(|v| v.check_unions(contract)),
        }
    }
}

/// A named aggregate of fields.
///
/// Fields are kept sorted by (required first, then name) and never reordered
/// after construction. Share it through `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    name: String,
    fields: Vec<Field>,
}

impl Contract {
    pub fn new(name: impl Into<String>, mut fields: Vec<Field>) -> Result<Self, ContractError> {
        let name = name.into();
        check_type_name(&name)?;
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(ContractError::DuplicateField {
                    contract: name,
                    field: field.name.clone(),
                });
            }
            field.check_unions(&name)?;
        }
        fields.sort_by(|a, b| b.required.cmp(&a.required).then_with(|| a.name.cmp(&b.name)));
        Ok(Self { name, fields })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
    pub fn required_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.required)
    }
    pub fn optional_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.required)
    }

    /// Directly referenced contracts (through nesting, lists or unions), deduplicated.
    pub fn dependencies(&self) -> Vec<&Arc<Contract>> {
        let mut out = Vec::new();
        for field in &self.fields {
            field.collect_nested(&mut out);
        }
        out
    }
}

/// A closed-choice type, rendered as a literal enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    name: String,
    members: Vec<String>,
}

impl Enumeration {
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Result<Self, ContractError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        check_type_name(&name)?;
        let mut out: Vec<String> = Vec::new();
        for member in members {
            let member = member.into();
            if out.contains(&member) {
                return Err(ContractError::DuplicateMember { name, member });
            }
            out.push(member);
        }
        if out.is_empty() {
            return Err(ContractError::EmptyEnum { name });
        }
        Ok(Self { name, members: out })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn members(&self) -> &[String] {
        &self.members
    }
}

fn check_type_name(name: &str) -> Result<(), ContractError> {
    if name.chars().next().is_some_and(char::is_uppercase) {
        Ok(())
    } else {
        Err(ContractError::InvalidName { name: name.to_owned() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eye() -> Arc<Contract> {
        Arc::new(Contract::new("Eye", vec![Field::primitive("color", PrimitiveKind::String)]).unwrap())
    }

    #[test]
    fn fields_sort_required_first_then_by_name() {
        let c = Contract::new(
            "Person",
            vec![
                Field::primitive("zeta", PrimitiveKind::String).optional(),
                Field::primitive("name", PrimitiveKind::String),
                Field::primitive("alpha", PrimitiveKind::Integer).optional(),
                Field::primitive("age", PrimitiveKind::Integer),
            ],
        )
        .unwrap();
        let order: Vec<_> = c.slot_names().collect();
        assert_eq!(order, ["age", "name", "alpha", "zeta"]);
        assert_eq!(c.required_fields().count(), 2);
        assert_eq!(c.optional_fields().count(), 2);
    }

    #[test]
    fn name_must_be_upper_case_led() {
        for bad in ["", "person", "_Person", "9Lives"] {
            let err = Contract::new(bad, vec![]).unwrap_err();
            assert_eq!(err, ContractError::InvalidName { name: bad.to_owned() });
        }
        assert!(Contract::new("Émile", vec![]).is_ok());
    }

    #[test]
    fn duplicate_fields_and_empty_unions_are_rejected() {
        let dup = Contract::new(
            "Dup",
            vec![
                Field::primitive("a", PrimitiveKind::String),
                Field::primitive("a", PrimitiveKind::Integer).optional(),
            ],
        );
        assert!(matches!(dup, Err(ContractError::DuplicateField { .. })));

        let empty = Contract::new("U", vec![Field::list("xs", Field::union("", vec![]))]);
        assert!(matches!(empty, Err(ContractError::EmptyUnion { .. })));
    }

    #[test]
    fn dependencies_are_deduplicated_in_field_order() {
        let eye = eye();
        let head = Arc::new(Contract::new("Head", vec![Field::primitive("hair", PrimitiveKind::String)]).unwrap());
        let body = Contract::new(
            "Body",
            vec![
                Field::list("eyes", Field::nested("", eye.clone())),
                Field::nested("head", head.clone()),
                Field::union("nose", vec![Field::nested("", eye.clone()), Field::primitive("", PrimitiveKind::Integer)]),
            ],
        )
        .unwrap();
        let deps: Vec<_> = body.dependencies().into_iter().map(|c| c.name().to_owned()).collect();
        assert_eq!(deps, ["Eye", "Head"]);
    }

    #[test]
    fn render_reports_nearest_named_field() {
        let table = TypeTable::new(crate::type_table::Target::TypeScript, [(PrimitiveKind::String, "string")]);
        let field = Field::union("nose", vec![Field::primitive("", PrimitiveKind::Integer)]);
        let err = field.render(&table).unwrap_err();
        assert!(matches!(err, GenError::UnknownFieldType { ref field, kind: PrimitiveKind::Integer, .. } if field == "nose"));
    }

    #[test]
    fn enumeration_rules() {
        let e = Enumeration::new("Gender", ["male", "female"]).unwrap();
        assert_eq!(e.members(), ["male", "female"]);
        assert!(matches!(Enumeration::new("Gender", Vec::<String>::new()), Err(ContractError::EmptyEnum { .. })));
        assert!(matches!(Enumeration::new("G", ["a", "a"]), Err(ContractError::DuplicateMember { .. })));
        assert!(matches!(Enumeration::new("gender", ["a"]), Err(ContractError::InvalidName { .. })));
    }

    #[test]
    fn deep_lists_render_without_a_limit() {
        let mut field = Field::primitive("", PrimitiveKind::Integer);
        for _ in 0..100 {
            field = Field::list("", field);
        }
        let rendered = Field::new("grid", field.kind).render(TypeTable::typescript()).unwrap();
        assert_eq!(rendered, format!("{}number{}", "Array<".repeat(100), ">".repeat(100)));
    }
}
