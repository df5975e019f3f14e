//! SQL value types returned by preview and sampling queries.
//!
//! Values are fully owned: sampled rows outlive the connection that produced
//! them and are typically handed straight to a display layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single value read back from a live connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// SQL NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Any integer column, widened to 64 bits.
    Int(i64),

    /// Any floating point column.
    Float(f64),

    /// Text, or any value the driver could only render as text.
    Text(String),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Borrow the text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(v) => write!(f, "{}", v),
            SqlValue::Int(v) => write!(f, "{}", v),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<Option<&str>> for SqlValue {
    fn from(v: Option<&str>) -> Self {
        match v {
            Some(s) => SqlValue::Text(s.to_string()),
            None => SqlValue::Null,
        }
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

/// One row of sampled values, in projection order.
pub type Row = Vec<SqlValue>;
