//! Lower external schema documents into contracts.
//!
//! The document format mirrors marshmallow-style schema declarations:
//!
//! ```json
//! {
//!   "schemas": [
//!     { "name": "Eye",  "fields": { "color": { "type": "String", "required": true } } },
//!     { "name": "Body", "fields": {
//!         "eyes": { "type": "List", "required": true,
//!                   "container": { "type": "Nested", "nested": "Eye" } } } }
//!   ],
//!   "enums":   [ { "name": "Gender", "members": ["male", "female"] } ],
//!   "actions": [ { "name": "CreateBody", "contract": "Body" } ]
//! }
//! ```
//!
//! Schemas are lowered in order and registered as they go, so a `Nested`
//! reference must name a schema declared earlier (in this or a previous
//! document).

use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::{debug, info};

use crate::codegen::ActionBinding;
use crate::error::LowerError;
use crate::ir::{Contract, Enumeration, Field, FieldKind, PrimitiveKind};
use crate::path_de::from_str_with_path;
use crate::registry::Registry;

// ————————————————————————————————————————————————————————————————————————————
// EXTERNAL FORMAT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    #[serde(default)]
    pub schemas: Vec<ExternalSchema>,
    #[serde(default)]
    pub enums: Vec<ExternalEnum>,
    #[serde(default)]
    pub actions: Vec<ExternalAction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalSchema {
    pub name: String,
    /// Declaration order is kept.
    #[serde(default)]
    pub fields: IndexMap<String, ExternalField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalField {
    #[serde(rename = "type")]
    pub tag: String,
    /// Absent means optional, as in marshmallow.
    #[serde(default)]
    pub required: bool,
    /// `Nested`: name of the referenced schema.
    #[serde(default)]
    pub nested: Option<String>,
    /// `List`: the item field.
    #[serde(default)]
    pub container: Option<Box<ExternalField>>,
    /// `Union`: member fields in order.
    #[serde(default)]
    pub variants: Vec<ExternalField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalEnum {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalAction {
    pub name: String,
    pub contract: String,
    #[serde(default)]
    pub pre_action: String,
    #[serde(default)]
    pub callback: String,
}

static PRIMITIVE_TAGS: Lazy<IndexMap<&'static str, PrimitiveKind>> = Lazy::new(|| {
    IndexMap::from([
        ("String", PrimitiveKind::String),
        ("Str", PrimitiveKind::String),
        ("Integer", PrimitiveKind::Integer),
        ("Int", PrimitiveKind::Integer),
        ("Decimal", PrimitiveKind::Decimal),
        ("Float", PrimitiveKind::Float),
        ("DateTime", PrimitiveKind::DateTime),
        ("Boolean", PrimitiveKind::Boolean),
        ("Bool", PrimitiveKind::Boolean),
        ("Dict", PrimitiveKind::Dict),
    ])
});

pub fn parse_document(src: &str) -> Result<SchemaDocument, LowerError> {
    Ok(from_str_with_path(src)?)
}

// ————————————————————————————————————————————————————————————————————————————
// LOWERING
// ————————————————————————————————————————————————————————————————————————————

pub fn lower_field(name: &str, field: &ExternalField, registry: &Registry) -> Result<Field, LowerError> {
    let kind = lower_kind(name, field, registry)?;
    Ok(Field::new(name, kind).with_required(field.required))
}

fn lower_kind(name: &str, field: &ExternalField, registry: &Registry) -> Result<FieldKind, LowerError> {
    if let Some(kind) = PRIMITIVE_TAGS.get(field.tag.as_str()) {
        return Ok(FieldKind::Primitive(*kind));
    }
    let missing = |attribute| LowerError::MissingAttribute {
        field: name.to_owned(),
        tag: field.tag.clone(),
        attribute,
    };
    match field.tag.as_str() {
        "Nested" => {
            let target = field.nested.as_deref().ok_or_else(|| missing("nested"))?;
            let contract = registry.get(target).ok_or_else(|| LowerError::UnresolvedContract {
                field: name.to_owned(),
                name: target.to_owned(),
            })?;
            Ok(FieldKind::Nested(contract.clone()))
        }
        "List" => {
            let container = field.container.as_deref().ok_or_else(|| missing("container"))?;
            // items are always present; only the list itself may be optional
            let item = Field::new(name, lower_kind(name, container, registry)?);
            Ok(FieldKind::List(Box::new(item)))
        }
        "Union" => {
            if field.variants.is_empty() {
                return Err(missing("variants"));
            }
            let variants = field
                .variants
                .iter()
                .map(|v| lower_kind(name, v, registry).map(|k| Field::new("", k)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(FieldKind::Union(variants))
        }
        other => Err(LowerError::UnknownFieldType { field: name.to_owned(), tag: other.to_owned() }),
    }
}

/// One pass over the declared fields; the contract then applies its own order.
pub fn lower_schema(schema: &ExternalSchema, registry: &Registry) -> Result<Contract, LowerError> {
    let fields = schema
        .fields
        .iter()
        .map(|(name, field)| lower_field(name, field, registry))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Contract::new(schema.name.clone(), fields)?)
}

/// Everything lowered from one or more documents.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    pub registry: Registry,
    /// In declaration order.
    pub contracts: Vec<Arc<Contract>>,
    pub enums: Vec<Enumeration>,
    pub actions: Vec<ActionBinding>,
}

impl Bundle {
    /// Lower `doc` on top of what is already in the bundle.
    pub fn absorb(&mut self, doc: &SchemaDocument) -> Result<(), LowerError> {
        for schema in &doc.schemas {
            let contract = lower_schema(schema, &self.registry)?;
            let contract = self.registry.define(contract)?;
            debug!(contract = contract.name(), "lowered schema");
            self.contracts.push(contract);
        }
        for e in &doc.enums {
            self.enums.push(Enumeration::new(e.name.clone(), e.members.iter().cloned())?);
        }
        for a in &doc.actions {
            let contract = self.registry.get(&a.contract).ok_or_else(|| LowerError::UnresolvedAction {
                action: a.name.clone(),
                name: a.contract.clone(),
            })?;
            self.actions.push(ActionBinding {
                name: a.name.clone(),
                contract: contract.clone(),
                pre_action: a.pre_action.clone(),
                callback: a.callback.clone(),
            });
        }
        info!(
            contracts = self.contracts.len(),
            enums = self.enums.len(),
            actions = self.actions.len(),
            "schema document lowered"
        );
        Ok(())
    }
}

pub fn lower_document(doc: &SchemaDocument) -> Result<Bundle, LowerError> {
    let mut bundle = Bundle::default();
    bundle.absorb(doc)?;
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{PythonCodegen, PythonOptions, TypeScriptCodegen, TypeScriptOptions};

    const BODY: &str = r#"{
        "schemas": [
            { "name": "Eye", "fields": { "color": { "type": "String", "required": true } } },
            { "name": "Head", "fields": { "hair": { "type": "String" } } },
            { "name": "Body", "fields": {
                "eyes": { "type": "List", "required": true,
                          "container": { "type": "Nested", "nested": "Eye" } },
                "mouth": { "type": "Decimal", "required": true },
                "poo": { "type": "Float", "required": true },
                "foot": { "type": "DateTime", "required": true },
                "head": { "type": "Nested", "nested": "Head", "required": true }
            } }
        ],
        "actions": [ { "name": "CreateBody", "contract": "Body" } ]
    }"#;

    #[test]
    fn body_schema_lowers_and_generates() {
        let bundle = lower_document(&parse_document(BODY).unwrap()).unwrap();
        let body = bundle.registry.get("Body").unwrap();
        assert_eq!(body.slot_names().collect::<Vec<_>>(), ["eyes", "foot", "head", "mouth", "poo"]);
        assert!(!bundle.registry.get("Head").unwrap().fields()[0].required);

        let mut py = PythonCodegen::new(PythonOptions { include_imports: false, ..Default::default() });
        py.emit(body).unwrap();
        assert!(py.into_string().contains("__slots__ = ['eyes', 'foot', 'head', 'mouth', 'poo']"));

        let ts = TypeScriptCodegen::new(TypeScriptOptions::default());
        assert_eq!(
            ts.render_interface(body).unwrap(),
            "export interface Body {\n  eyes: Array<Eye>\n  foot: string\n  head: Head\n  mouth: number\n  poo: number\n}"
        );
        assert_eq!(bundle.actions[0].contract.name(), "Body");
    }

    #[test]
    fn unknown_tags_and_forward_references_fail() {
        let doc = parse_document(r#"{"schemas": [{"name": "A", "fields": {"x": {"type": "Url"}}}]}"#).unwrap();
        assert_eq!(
            lower_document(&doc).unwrap_err(),
            LowerError::UnknownFieldType { field: "x".into(), tag: "Url".into() }
        );

        let doc = parse_document(r#"{"schemas": [{"name": "A", "fields": {"b": {"type": "Nested", "nested": "B"}}}]}"#)
            .unwrap();
        assert_eq!(
            lower_document(&doc).unwrap_err(),
            LowerError::UnresolvedContract { field: "b".into(), name: "B".into() }
        );

        let doc = parse_document(r#"{"schemas": [{"name": "A", "fields": {"xs": {"type": "List"}}}]}"#).unwrap();
        assert!(matches!(lower_document(&doc), Err(LowerError::MissingAttribute { attribute: "container", .. })));
    }

    #[test]
    fn union_and_cross_document_references() {
        let mut bundle = lower_document(&parse_document(BODY).unwrap()).unwrap();
        let doc = parse_document(
            r#"{"schemas": [{"name": "Face", "fields": {"nose": {"type": "Union", "required": true,
                "variants": [{"type": "Int"}, {"type": "Nested", "nested": "Eye"},
                             {"type": "List", "container": {"type": "Nested", "nested": "Head"}}]}}}],
               "enums": [{"name": "Gender", "members": ["male", "female"]}]}"#,
        )
        .unwrap();
        bundle.absorb(&doc).unwrap();
        let face = bundle.registry.get("Face").unwrap();
        let ts = crate::type_table::TypeTable::typescript();
        assert_eq!(face.fields()[0].render(ts).unwrap(), "number|Eye|Array<Head>");
        assert_eq!(bundle.enums[0].name(), "Gender");
    }

    #[test]
    fn duplicate_schema_names_are_rejected() {
        let doc = parse_document(r#"{"schemas": [{"name": "A"}, {"name": "A"}]}"#).unwrap();
        assert!(matches!(lower_document(&doc), Err(LowerError::Registry(_))));
        let doc = parse_document(r#"{"actions": [{"name": "Go", "contract": "Nope"}]}"#).unwrap();
        assert!(matches!(lower_document(&doc), Err(LowerError::UnresolvedAction { .. })));
        assert!(matches!(parse_document(r#"{"schemas": [{"fields": {}}]}"#), Err(LowerError::Parse(_))));
    }
}
