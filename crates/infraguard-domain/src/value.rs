//! Strongly typed attribute tree for declared resource configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// One node of a resource's attribute tree.
///
/// Source dialects disagree on how a logical value is spelled (`true`, `"true"`, `[true]`),
/// so comparison helpers here normalize before comparing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "JsonValue", into = "JsonValue")]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<AttributeValue>),
    Map(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, AttributeValue>> {
        match self {
            AttributeValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            AttributeValue::Null => "null",
            AttributeValue::Bool(_) => "bool",
            AttributeValue::Number(_) => "number",
            AttributeValue::String(_) => "string",
            AttributeValue::List(_) => "list",
            AttributeValue::Map(_) => "map",
        }
    }

    /// Unwraps single-element lists (`[x]` -> `x`), recursively.
    pub fn scalar_view(&self) -> &AttributeValue {
        match self {
            AttributeValue::List(items) if items.len() == 1 => items[0].scalar_view(),
            other => other,
        }
    }

    /// Numeric view: numbers, and strings that parse as finite numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self.scalar_view() {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Boolean view: bools, and the strings `true`/`false` in any case.
    pub fn as_bool(&self) -> Option<bool> {
        match self.scalar_view() {
            AttributeValue::Bool(b) => Some(*b),
            AttributeValue::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            AttributeValue::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// Canonical string used when values are compared as strings.
    pub fn normalized_string(&self) -> String {
        match self.scalar_view() {
            AttributeValue::Null => "null".to_string(),
            AttributeValue::Bool(b) => b.to_string(),
            AttributeValue::Number(n) => format_number(*n),
            AttributeValue::String(s) => {
                if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") {
                    s.to_ascii_lowercase()
                } else {
                    s.clone()
                }
            }
            other => JsonValue::from(other.clone()).to_string(),
        }
    }

    /// Length of strings (chars), lists and maps.
    pub fn length(&self) -> Option<usize> {
        match self {
            AttributeValue::String(s) => Some(s.chars().count()),
            AttributeValue::List(items) => Some(items.len()),
            AttributeValue::Map(map) => Some(map.len()),
            _ => None,
        }
    }

    pub fn is_empty_value(&self) -> bool {
        match self {
            AttributeValue::Null => true,
            AttributeValue::String(s) => s.trim().is_empty(),
            AttributeValue::List(items) => items.is_empty(),
            AttributeValue::Map(map) => map.is_empty(),
            AttributeValue::Bool(_) | AttributeValue::Number(_) => false,
        }
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<JsonValue> for AttributeValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => AttributeValue::Null,
            JsonValue::Bool(b) => AttributeValue::Bool(b),
            JsonValue::Number(n) => n
                .as_f64()
                .map(AttributeValue::Number)
                .unwrap_or_else(|| AttributeValue::String(n.to_string())),
            JsonValue::String(s) => AttributeValue::String(s),
            JsonValue::Array(items) => {
                AttributeValue::List(items.into_iter().map(AttributeValue::from).collect())
            }
            JsonValue::Object(map) => AttributeValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, AttributeValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<AttributeValue> for JsonValue {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::Null => JsonValue::Null,
            AttributeValue::Bool(b) => JsonValue::Bool(b),
            AttributeValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    JsonValue::from(n as i64)
                } else {
                    serde_json::Number::from_f64(n)
                        .map(JsonValue::Number)
                        .unwrap_or(JsonValue::Null)
                }
            }
            AttributeValue::String(s) => JsonValue::String(s),
            AttributeValue::List(items) => {
                JsonValue::Array(items.into_iter().map(JsonValue::from).collect())
            }
            AttributeValue::Map(map) => JsonValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, JsonValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}
