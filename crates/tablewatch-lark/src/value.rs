//! Typed record field values.
//!
//! # Purpose
//! Bitable records come back as loosely typed JSON. They are converted once,
//! here, into the closed [`FieldValue`] variant set so downstream code pattern
//! matches instead of probing JSON shapes.
//!
//! # Notes
//! A JSON object becomes [`FieldValue::User`] only when it has a string `id`
//! and a string `name` or `en_name`. Every other object stays a
//! [`FieldValue::Map`]; callers that want the looser "has an id" reading use
//! [`FieldValue::user_id`].
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Exclusive upper bound for millisecond timestamps (2073-01-01 UTC).
pub const TIMESTAMP_MILLIS_CEILING: i64 = 3_250_368_000_000;

/// Inclusive lower bound for millisecond timestamps (1973-03-03 UTC). Smaller
/// numbers are ordinary quantities, not dates.
pub const TIMESTAMP_MILLIS_FLOOR: i64 = 100_000_000_000;

pub type FieldMap = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<FieldValue>),
    User(UserRef),
    Map(BTreeMap<String, FieldValue>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserRef {
    pub id: String,
    pub name: Option<String>,
    pub en_name: Option<String>,
}

impl FieldValue {
    /// Blank values are the only ones that do not count as filled in.
    ///
    /// `0`, `false`, `[]` and `{}` are all considered present.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    /// Interpret the value as a millisecond Unix timestamp when it is a whole
    /// number in `[TIMESTAMP_MILLIS_FLOOR, TIMESTAMP_MILLIS_CEILING)`.
    pub fn as_timestamp_millis(&self) -> Option<i64> {
        match self {
            FieldValue::Number(number) if number.fract() == 0.0 => {
                let millis = *number as i64;
                (TIMESTAMP_MILLIS_FLOOR..TIMESTAMP_MILLIS_CEILING)
                    .contains(&millis)
                    .then_some(millis)
            }
            _ => None,
        }
    }

    /// The `id` of a user-shaped value: a user reference or any map with a string `id`.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            FieldValue::User(user) => Some(user.id.as_str()),
            FieldValue::Map(map) => match map.get("id") {
                Some(FieldValue::Text(id)) => Some(id.as_str()),
                _ => None,
            },
            _ => None,
        }
    }

    /// View the value as a user reference, reading the known keys out of a plain map.
    pub fn as_user(&self) -> Option<UserRef> {
        match self {
            FieldValue::User(user) => Some(user.clone()),
            FieldValue::Map(map) => Some(UserRef {
                id: text_entry(map, "id").unwrap_or_default(),
                name: text_entry(map, "name"),
                en_name: text_entry(map, "en_name"),
            }),
            _ => None,
        }
    }
}

impl UserRef {
    /// Compact rendering used in chat text: `en_name:<x> id:<y> name:<z>`.
    ///
    /// Absent or empty parts are skipped; the result may be empty.
    pub fn token(&self) -> String {
        let parts = [
            ("en_name", self.en_name.as_deref()),
            ("id", Some(self.id.as_str())),
            ("name", self.name.as_deref()),
        ];
        parts
            .iter()
            .filter_map(|(label, value)| match value {
                Some(value) if !value.is_empty() => Some(format!("{label}:{value}")),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn text_entry(map: &BTreeMap<String, FieldValue>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(FieldValue::Text(text)) => Some(text.clone()),
        _ => None,
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(flag) => FieldValue::Bool(flag),
            Value::Number(number) => FieldValue::Number(number.as_f64().unwrap_or_default()),
            Value::String(text) => FieldValue::Text(text),
            Value::Array(items) => FieldValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(object) => {
                let map: BTreeMap<String, FieldValue> = object
                    .into_iter()
                    .map(|(key, value)| (key, FieldValue::from(value)))
                    .collect();
                match (text_entry(&map, "id"), text_entry(&map, "name"), text_entry(&map, "en_name")) {
                    (Some(id), name, en_name) if name.is_some() || en_name.is_some() => {
                        FieldValue::User(UserRef { id, name, en_name })
                    }
                    _ => FieldValue::Map(map),
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(FieldValue::from)
    }
}
