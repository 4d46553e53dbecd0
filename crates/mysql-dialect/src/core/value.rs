//! SQL values and named statement parameters.
//!
//! Builders never interpolate data into SQL text. Every value ends up in a
//! [`Params`] set under a generated `:qpN` name and the SQL carries only the
//! placeholder.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of generated placeholder names.
pub const PARAM_PREFIX: &str = ":qp";

/// SQL value used for bound parameters, row fields and column defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Boolean value (sent to the server as 1/0).
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer (BIGINT UNSIGNED range).
    UInt(u64),
    /// Floating point.
    Double(f64),
    /// Text data.
    Text(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// JSON document, serialized on bind.
    Json(serde_json::Value),
}

impl SqlValue {
    /// Whether the value is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Borrow the value as text, decoding UTF-8 bytes when necessary.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            SqlValue::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Interpret the value as a signed integer.
    ///
    /// Text values are parsed, since the text protocol returns every column
    /// as a string.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            SqlValue::UInt(v) => i64::try_from(*v).ok(),
            SqlValue::Bool(v) => Some(i64::from(*v)),
            SqlValue::Double(v) if v.fract() == 0.0 => Some(*v as i64),
            other => other.as_str().and_then(|s| s.trim().parse().ok()),
        }
    }

    /// Interpret the value as an unsigned integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SqlValue::UInt(v) => Some(*v),
            SqlValue::Int(v) => u64::try_from(*v).ok(),
            other => other.as_str().and_then(|s| s.trim().parse().ok()),
        }
    }

    /// Interpret the value as a boolean flag (`1`/`0`, `YES`/`NO`).
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(v) => Some(*v),
            SqlValue::Null => None,
            other => match other.as_str() {
                Some(s) => match s.trim().to_ascii_uppercase().as_str() {
                    "1" | "YES" | "TRUE" => Some(true),
                    "0" | "NO" | "FALSE" => Some(false),
                    _ => None,
                },
                None => other.as_i64().map(|v| v != 0),
            },
        }
    }

    /// Owned text form of the value, `None` for NULL.
    pub fn to_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            SqlValue::Bool(v) => Some(if *v { "1" } else { "0" }.to_string()),
            SqlValue::Int(v) => Some(v.to_string()),
            SqlValue::UInt(v) => Some(v.to_string()),
            SqlValue::Double(v) => Some(v.to_string()),
            SqlValue::Json(v) => Some(v.to_string()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "NULL"),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(i64::from(v))
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        SqlValue::UInt(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Double(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        SqlValue::Json(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// Ordered set of named parameters for one statement.
///
/// Names are stored with their leading colon (`:qp0`, `:tableName`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, SqlValue)>,
}

impl Params {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value under the next free generated name and return that name.
    ///
    /// Generated names skip any `:qpN` already set explicitly.
    pub fn bind(&mut self, value: impl Into<SqlValue>) -> String {
        let mut index = self.entries.len();
        let name = loop {
            let candidate = format!("{}{}", PARAM_PREFIX, index);
            if !self.entries.iter().any(|(n, _)| *n == candidate) {
                break candidate;
            }
            index += 1;
        };
        self.entries.push((name.clone(), value.into()));
        name
    }

    /// Set a value under an explicit name, replacing any previous binding.
    pub fn set(&mut self, name: &str, value: impl Into<SqlValue>) {
        let name = normalize_name(name);
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style [`Params::set`].
    pub fn with(mut self, name: &str, value: impl Into<SqlValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Look up a value by name, with or without the leading colon.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        let name = normalize_name(name);
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// Number of bound values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no value is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

fn normalize_name(name: &str) -> String {
    if name.starts_with(':') {
        name.to_string()
    } else {
        format!(":{}", name)
    }
}
