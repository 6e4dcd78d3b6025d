//! Typed values held by contract instances.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::MarshalError;
use crate::ir::{Contract, FieldKind, PrimitiveKind};

static DECIMAL_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$").expect("valid decimal pattern")
});

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Exact fixed-point number, kept as its decimal text.
///
/// Never passes through `f64`, so `"0.10"` stays `"0.10"` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal(String);

impl Decimal {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        DECIMAL_LITERAL.is_match(text).then(|| Self(text.to_owned()))
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Decimal {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("'{s}' is not a decimal literal"))
    }
}

/// The instant a [`Timestamp`] denotes: with or without a UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Moment {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

/// A date-time together with the ISO-8601 text it was read from.
///
/// Decoded timestamps re-encode to their input text, so `Z` suffixes and
/// fractional-second precision survive a round trip. Equality compares the
/// moment only.
#[derive(Debug, Clone)]
pub struct Timestamp {
    moment: Moment,
    text: String,
}

impl Timestamp {
    /// Accepts RFC 3339 text or an offset-less `YYYY-MM-DDTHH:MM:SS[.fff]`.
    pub fn parse(text: &str) -> Option<Self> {
        let moment = match DateTime::parse_from_rfc3339(text) {
            Ok(zoned) => Moment::Zoned(zoned),
            Err(_) => Moment::Naive(NaiveDateTime::parse_from_str(text, NAIVE_FORMAT).ok()?),
        };
        Some(Self { moment, text: text.to_owned() })
    }

    pub fn moment(&self) -> Moment {
        self.moment
    }

    /// ISO-8601 text: the parsed input verbatim, otherwise `+HH:MM` offsets.
    pub fn to_iso8601(&self) -> String {
        self.text.clone()
    }
}

impl From<Moment> for Timestamp {
    fn from(moment: Moment) -> Self {
        let text = match moment {
            Moment::Zoned(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, false),
            Moment::Naive(dt) => dt.format(NAIVE_FORMAT).to_string(),
        };
        Self { moment, text }
    }
}
impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Moment::Zoned(dt.fixed_offset()).into()
    }
}
impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Moment::Zoned(dt).into()
    }
}
impl From<NaiveDateTime> for Timestamp {
    fn from(dt: NaiveDateTime) -> Self {
        Moment::Naive(dt).into()
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.moment == other.moment
    }
}
impl Eq for Timestamp {}
impl Hash for Timestamp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.moment.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null; only optional attributes accept it.
    Null,
    String(String),
    Integer(i64),
    Decimal(Decimal),
    /// Kept as the wire number, so `1` and `1.0` re-encode as written.
    Float(serde_json::Number),
    DateTime(Timestamp),
    Boolean(bool),
    Dict(serde_json::Map<String, serde_json::Value>),
    Object(Instance),
    List(Vec<Value>),
}

impl Value {
    /// Whether this value fits the declared shape.
    pub fn conforms_to(&self, kind: &FieldKind) -> bool {
        match (kind, self) {
            (FieldKind::Primitive(p), v) => matches!(
                (p, v),
                (PrimitiveKind::String, Value::String(_))
                    | (PrimitiveKind::Integer, Value::Integer(_))
                    | (PrimitiveKind::Decimal, Value::Decimal(_))
                    | (PrimitiveKind::Float, Value::Float(_))
                    | (PrimitiveKind::DateTime, Value::DateTime(_))
                    | (PrimitiveKind::Boolean, Value::Boolean(_))
                    | (PrimitiveKind::Dict, Value::Dict(_))
            ),
            (FieldKind::Nested(contract), Value::Object(inst)) => inst.contract().name() == contract.name(),
            (FieldKind::List(item), Value::List(xs)) => xs.iter().all(|x| x.conforms_to(&item.kind)),
            (FieldKind::Union(variants), v) => variants.iter().any(|f| v.conforms_to(&f.kind)),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}
/// Non-finite floats have no JSON form and become [`Value::Null`].
impl From<f64> for Value {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Float)
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}
impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}
impl From<Timestamp> for Value {
    fn from(t: Timestamp) -> Self {
        Value::DateTime(t)
    }
}
impl From<Instance> for Value {
    fn from(i: Instance) -> Self {
        Value::Object(i)
    }
}
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(xs: Vec<T>) -> Self {
        Value::List(xs.into_iter().map(Into::into).collect())
    }
}

/// An instance of a contract with a fixed set of attributes.
///
/// Attributes not yet set are absent; setting a name the contract does not
/// declare, or a value of the wrong shape, is an error.
#[derive(Debug, Clone)]
pub struct Instance {
    contract: Arc<Contract>,
    slots: IndexMap<String, Value>,
}

impl Instance {
    pub fn new(contract: Arc<Contract>) -> Self {
        Self { contract, slots: IndexMap::new() }
    }

    /// Builder form of [`Instance::set`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self, MarshalError> {
        self.set(name, value)?;
        Ok(self)
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), MarshalError> {
        let value = value.into();
        let field = self.contract.field(name).ok_or_else(|| MarshalError::UnknownAttribute {
            contract: self.contract.name().to_owned(),
            attribute: name.to_owned(),
        })?;
        let fits = match value {
            Value::Null => !field.required,
            ref v => v.conforms_to(&field.kind),
        };
        if !fits {
            return Err(MarshalError::TypeMismatch {
                contract: self.contract.name().to_owned(),
                attribute: name.to_owned(),
                expected: describe(&field.kind),
            });
        }
        self.slots.insert(name.to_owned(), value);
        Ok(())
    }

    /// Stores a value that the decoder already checked.
    pub(super) fn set_unchecked(&mut self, name: &str, value: Value) {
        self.slots.insert(name.to_owned(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.slots.get(name)
    }
    pub fn contract(&self) -> &Arc<Contract> {
        &self.contract
    }
    pub fn is_present(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Required attributes that have not been set.
    pub fn missing_required(&self) -> Vec<&str> {
        self.contract
            .required_fields()
            .filter(|f| !self.slots.contains_key(&f.name))
            .map(|f| f.name.as_str())
            .collect()
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.contract.name() == other.contract.name() && self.slots == other.slots
    }
}

/// Human-readable shape, used in error messages.
pub fn describe(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Primitive(p) => p.to_string(),
        FieldKind::Nested(c) => c.name().to_owned(),
        FieldKind::List(item) => format!("LIST[{}]", describe(&item.kind)),
        FieldKind::Union(vs) => {
            let arms = vs.iter().map(|v| describe(&v.kind)).collect::<Vec<_>>();
            format!("UNION[{}]", arms.join(", "))
        }
    }
}
