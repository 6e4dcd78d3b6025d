//! Instance ⇄ JSON conversion driven by the contract IR.
//!
//! Decoding walks the same [`Field`] tree the generators render, so the
//! shape the wire is checked against is the shape that was generated.
//!
//! Union fields try their variants in declared order and keep the first one
//! that converts; see DESIGN.md for why this differs from first-variant-only.
pub mod value;

use std::sync::Arc;

use serde_json::{Map, Value as Json};
use tracing::{debug, trace};

pub use value::{Decimal, Instance, Moment, Timestamp, Value};

use crate::error::MarshalError;
use crate::ir::{Contract, Field, FieldKind, PrimitiveKind};
use crate::registry::Registry;

/// Decoding entry points that look the target contract up by name.
pub struct Marshaller<'r> {
    registry: &'r Registry,
}

impl<'r> Marshaller<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    fn resolve(&self, name: &str) -> Result<&'r Arc<Contract>, MarshalError> {
        self.registry
            .get(name)
            .ok_or_else(|| MarshalError::UnknownContract { name: name.to_owned() })
    }

    pub fn decode(&self, name: &str, data: &Json) -> Result<Instance, MarshalError> {
        decode(self.resolve(name)?, data)
    }

    pub fn decode_validated(&self, name: &str, data: &Json) -> Result<Instance, MarshalError> {
        decode_validated(self.resolve(name)?, data)
    }

    pub fn validate(&self, name: &str, data: &Json) -> Result<(), MarshalError> {
        validate(self.resolve(name)?, data)
    }
}

/// Convert `data` into an instance of `contract` without checking that
/// required keys are present.
pub fn decode(contract: &Arc<Contract>, data: &Json) -> Result<Instance, MarshalError> {
    Decoder { validate: false }.object(contract, data, "$")
}

/// [`validate`] at every object level, then decode.
pub fn decode_validated(contract: &Arc<Contract>, data: &Json) -> Result<Instance, MarshalError> {
    Decoder { validate: true }.object(contract, data, "$")
}

/// Check that every required field of `contract` has a key in `data`.
pub fn validate(contract: &Contract, data: &Json) -> Result<(), MarshalError> {
    let map = expect_object(data, "$", contract.name())?;
    check_required(contract, map)
}

/// Expand an instance into plain JSON. Absent attributes are omitted.
pub fn encode(instance: &Instance) -> Json {
    let mut out = Map::new();
    for field in instance.contract().fields() {
        if let Some(value) = instance.get(&field.name) {
            out.insert(field.name.clone(), encode_value(value));
        }
    }
    Json::Object(out)
}

pub fn encode_value(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::String(s) => Json::String(s.clone()),
        Value::Integer(n) => Json::from(*n),
        Value::Decimal(d) => Json::String(d.as_str().to_owned()),
        Value::Float(n) => Json::Number(n.clone()),
        Value::DateTime(t) => Json::String(t.to_iso8601()),
        Value::Boolean(b) => Json::Bool(*b),
        Value::Dict(map) => Json::Object(map.clone()),
        Value::Object(inst) => encode(inst),
        Value::List(xs) => Json::Array(xs.iter().map(encode_value).collect()),
    }
}

struct Decoder {
    validate: bool,
}

impl Decoder {
    fn object(&self, contract: &Arc<Contract>, data: &Json, path: &str) -> Result<Instance, MarshalError> {
        let map = expect_object(data, path, contract.name())?;
        if self.validate {
            check_required(contract, map)?;
        }
        let mut instance = Instance::new(contract.clone());
        for (key, raw) in map {
            // keys that name no declared field are dropped
            let Some(field) = contract.field(key) else {
                trace!(contract = contract.name(), key = key.as_str(), "ignoring undeclared key");
                continue;
            };
            let value = self.field(field, raw, &format!("{path}.{key}"))?;
            instance.set_unchecked(key, value);
        }
        Ok(instance)
    }

    fn field(&self, field: &Field, raw: &Json, path: &str) -> Result<Value, MarshalError> {
        if raw.is_null() && !field.required {
            return Ok(Value::Null);
        }
        match &field.kind {
            FieldKind::Primitive(kind) => primitive(*kind, raw, path),
            FieldKind::Nested(contract) => self.object(contract, raw, path).map(Value::Object),
            FieldKind::List(item) => {
                let Json::Array(xs) = raw else {
                    return Err(mismatch(path, value::describe(&field.kind), raw));
                };
                xs.iter()
                    .enumerate()
                    .map(|(i, x)| self.field(item, x, &format!("{path}[{i}]")))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List)
            }
            FieldKind::Union(variants) => {
                for (i, variant) in variants.iter().enumerate() {
                    match self.field(variant, raw, path) {
                        Ok(v) => return Ok(v),
                        Err(err) => debug!(path, variant = i, %err, "union variant rejected"),
                    }
                }
                Err(MarshalError::NoUnionVariant { path: path.to_owned(), tried: variants.len() })
            }
        }
    }
}

fn primitive(kind: PrimitiveKind, raw: &Json, path: &str) -> Result<Value, MarshalError> {
    let converted = match (kind, raw) {
        (PrimitiveKind::String, Json::String(s)) => Some(Value::String(s.clone())),
        (PrimitiveKind::Integer, Json::Number(n)) => n.as_i64().map(Value::Integer),
        (PrimitiveKind::Decimal, Json::String(s)) => Decimal::parse(s).map(Value::Decimal),
        (PrimitiveKind::Decimal, Json::Number(n)) => Decimal::parse(&n.to_string()).map(Value::Decimal),
        (PrimitiveKind::Float, Json::Number(n)) => Some(Value::Float(n.clone())),
        (PrimitiveKind::DateTime, Json::String(s)) => Timestamp::parse(s).map(Value::DateTime),
        (PrimitiveKind::Boolean, Json::Bool(b)) => Some(Value::Boolean(*b)),
        (PrimitiveKind::Dict, Json::Object(m)) => Some(Value::Dict(m.clone())),
        _ => None,
    };
    converted.ok_or_else(|| mismatch(path, kind.to_string(), raw))
}

fn check_required(contract: &Contract, map: &Map<String, Json>) -> Result<(), MarshalError> {
    match contract.required_fields().find(|f| !map.contains_key(&f.name)) {
        Some(missing) => Err(MarshalError::MissingField {
            contract: contract.name().to_owned(),
            field: missing.name.clone(),
        }),
        None => Ok(()),
    }
}

fn expect_object<'a>(data: &'a Json, path: &str, contract: &str) -> Result<&'a Map<String, Json>, MarshalError> {
    data.as_object().ok_or_else(|| mismatch(path, contract.to_owned(), data))
}

fn mismatch(path: &str, expected: String, found: &Json) -> MarshalError {
    MarshalError::Conversion { path: path.to_owned(), expected, found: json_kind(found) }
}

fn json_kind(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ir::PrimitiveKind as PK;

    /// Person { name, wife: Wife, kids: [Kid] } with Wife { name, shoes: [str] }.
    fn family() -> Registry {
        let mut reg = Registry::new();
        let wife = reg
            .define(
                Contract::new(
                    "Wife",
                    vec![Field::primitive("name", PK::String), Field::list("shoes", Field::primitive("", PK::String))],
                )
                .unwrap(),
            )
            .unwrap();
        let kid = reg.define(Contract::new("Kid", vec![Field::primitive("name", PK::String)]).unwrap()).unwrap();
        reg.define(
            Contract::new(
                "Man",
                vec![
                    Field::primitive("name", PK::String),
                    Field::nested("wife", wife),
                    Field::list("kids", Field::nested("", kid)).optional(),
                ],
            )
            .unwrap(),
        )
        .unwrap();
        reg
    }

    #[test]
    fn nested_objects_and_lists_round_trip() {
        let reg = family();
        let data = json!({
            "name": "man",
            "wife": {"name": "w", "shoes": ["a", "b"]},
            "kids": [{"name": "x"}, {"name": "y"}],
        });
        let man = Marshaller::new(&reg).decode_validated("Man", &data).unwrap();

        let Some(Value::Object(wife)) = man.get("wife") else { panic!("wife is an object") };
        assert_eq!(wife.get("name"), Some(&Value::from("w")));
        assert_eq!(wife.get("shoes"), Some(&Value::from(vec!["a", "b"])));
        let Some(Value::List(kids)) = man.get("kids") else { panic!("kids is a list") };
        assert_eq!(kids.len(), 2);
        let Value::Object(second) = &kids[1] else { panic!("kid is an object") };
        assert_eq!(second.get("name"), Some(&Value::from("y")));

        assert_eq!(encode(&man), data);
    }

    #[test]
    fn missing_required_only_when_validating() {
        let reg = family();
        let m = Marshaller::new(&reg);
        let data = json!({"name": "man"});
        assert_eq!(
            m.decode_validated("Man", &data).unwrap_err(),
            MarshalError::MissingField { contract: "Man".into(), field: "wife".into() }
        );
        assert_eq!(m.validate("Man", &data).unwrap_err(), MarshalError::MissingField { contract: "Man".into(), field: "wife".into() });
        let partial = m.decode("Man", &data).unwrap();
        assert_eq!(partial.missing_required(), ["wife"]);

        // optional `kids` may be absent
        let ok = json!({"name": "man", "wife": {"name": "w", "shoes": []}});
        assert!(m.validate("Man", &ok).is_ok());
        assert_eq!(encode(&m.decode_validated("Man", &ok).unwrap()), ok);

        // validation reaches nested objects
        let nested = json!({"name": "man", "wife": {"name": "w"}});
        assert_eq!(
            m.decode_validated("Man", &nested).unwrap_err(),
            MarshalError::MissingField { contract: "Wife".into(), field: "shoes".into() }
        );
    }

    #[test]
    fn scalars_convert_and_encode_exactly() {
        let c = Arc::new(
            Contract::new(
                "Ledger",
                vec![
                    Field::primitive("amount", PK::Decimal),
                    Field::primitive("rate", PK::Float),
                    Field::primitive("count", PK::Integer),
                    Field::primitive("at", PK::DateTime),
                    Field::primitive("open", PK::Boolean),
                    Field::primitive("meta", PK::Dict),
                    Field::primitive("note", PK::String).optional(),
                ],
            )
            .unwrap(),
        );
        let data = json!({
            "amount": "1234.50",
            "rate": 0.25,
            "count": 3,
            "at": "2018-06-01T10:00:00+00:00",
            "open": true,
            "meta": {"k": [1, 2]},
            "note": null,
            "ignored": 1,
        });
        let inst = decode_validated(&c, &data).unwrap();
        assert_eq!(inst.get("amount"), Some(&Value::Decimal(Decimal::parse("1234.50").unwrap())));
        assert_eq!(inst.get("note"), Some(&Value::Null));
        assert!(!inst.is_present("ignored"));

        let mut expected = data.clone();
        expected.as_object_mut().unwrap().remove("ignored");
        assert_eq!(encode(&inst), expected);

        // a numeric decimal is accepted and re-encoded as text
        let numeric = json!({"amount": 2.5, "rate": 1.0, "count": 1, "at": "2018-06-01T10:00:00", "open": false, "meta": {}});
        let inst = decode(&c, &numeric).unwrap();
        assert_eq!(encode(&inst)["amount"], json!("2.5"));
    }

    #[test]
    fn whole_floats_and_timestamps_reencode_as_written() {
        let body = Arc::new(
            Contract::new("Body", vec![Field::primitive("poo", PK::Float), Field::primitive("foot", PK::DateTime)]).unwrap(),
        );
        for data in [
            json!({"poo": 1, "foot": "2018-06-01T10:00:00+00:00"}),
            json!({"poo": 1.0, "foot": "2018-06-01T10:00:00.000Z"}),
            json!({"poo": -3, "foot": "2018-06-01T10:00:00.5"}),
        ] {
            assert_eq!(encode(&decode_validated(&body, &data).unwrap()), data);
        }
    }

    #[test]
    fn deep_nesting_decodes() {
        let mut node = Arc::new(Contract::new("Leaf", vec![Field::primitive("n", PK::Integer)]).unwrap());
        let mut data = json!({"n": 0});
        for _ in 0..100 {
            node = Arc::new(Contract::new("Node", vec![Field::list("kids", Field::nested("", node))]).unwrap());
            data = json!({"kids": [data]});
        }
        assert_eq!(encode(&decode_validated(&node, &data).unwrap()), data);
    }

    #[test]
    fn shape_mismatches_name_the_path() {
        let reg = family();
        let err = Marshaller::new(&reg)
            .decode("Man", &json!({"name": "man", "wife": {"name": "w", "shoes": ["a", 7]}}))
            .unwrap_err();
        assert_eq!(
            err,
            MarshalError::Conversion { path: "$.wife.shoes[1]".into(), expected: "STRING".into(), found: "number" }
        );
        let err = Marshaller::new(&reg).decode("Man", &json!({"name": null})).unwrap_err();
        assert!(matches!(err, MarshalError::Conversion { found: "null", .. }));
        assert!(matches!(
            Marshaller::new(&reg).decode("Woman", &json!({})),
            Err(MarshalError::UnknownContract { .. })
        ));
    }

    #[test]
    fn union_takes_first_variant_that_converts() {
        let eye = Arc::new(Contract::new("Eye", vec![Field::primitive("color", PK::String)]).unwrap());
        let head = Arc::new(Contract::new("Head", vec![Field::primitive("hair", PK::String)]).unwrap());
        let face = Arc::new(
            Contract::new(
                "Face",
                vec![Field::union(
                    "nose",
                    vec![
                        Field::primitive("", PK::Integer),
                        Field::nested("", eye),
                        Field::list("", Field::nested("", head)),
                    ],
                )],
            )
            .unwrap(),
        );

        let as_int = decode(&face, &json!({"nose": 4})).unwrap();
        assert_eq!(as_int.get("nose"), Some(&Value::Integer(4)));

        let as_eye = json!({"nose": {"color": "blue"}});
        let inst = decode(&face, &as_eye).unwrap();
        assert!(matches!(inst.get("nose"), Some(Value::Object(i)) if i.contract().name() == "Eye"));
        assert_eq!(encode(&inst), as_eye);

        let as_heads = json!({"nose": [{"hair": "red"}]});
        assert_eq!(encode(&decode(&face, &as_heads).unwrap()), as_heads);

        assert_eq!(
            decode(&face, &json!({"nose": "long"})).unwrap_err(),
            MarshalError::NoUnionVariant { path: "$.nose".into(), tried: 3 }
        );
    }

    #[test]
    fn built_instances_encode() {
        let reg = family();
        let kid = Instance::new(reg.get("Kid").unwrap().clone()).with("name", "x").unwrap();
        let wife = Instance::new(reg.get("Wife").unwrap().clone())
            .with("name", "w")
            .and_then(|w| w.with("shoes", vec!["a"]))
            .unwrap();
        let man = Instance::new(reg.get("Man").unwrap().clone())
            .with("name", "man")
            .and_then(|m| m.with("wife", wife))
            .and_then(|m| m.with("kids", vec![kid]))
            .unwrap();
        let data = encode(&man);
        assert_eq!(data, json!({"name": "man", "wife": {"name": "w", "shoes": ["a"]}, "kids": [{"name": "x"}]}));
        assert_eq!(Marshaller::new(&reg).decode_validated("Man", &data).unwrap(), man);
    }
}
