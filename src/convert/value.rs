use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Field name to typed value, as extracted from one line or merged into a request
pub type Fields = BTreeMap<String, FieldValue>;

/// A typed value produced by a converter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    /// Duration in seconds
    Duration(f64),
    /// Canonical `YYYYMMDDHHMMSS` timestamp
    Timestamp(u64),
    String(String),
    /// Structured value produced by the `eval` converter
    Literal(Value),
}

impl FieldValue {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Float(v) | FieldValue::Duration(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<u64> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// Adds two numeric values of the same kind. Mixed integer/float sums become floats,
    /// durations only add up with durations.
    pub fn accumulate(&self, other: &FieldValue) -> Option<FieldValue> {
        match (self, other) {
            (FieldValue::Integer(a), FieldValue::Integer(b)) => {
                Some(FieldValue::Integer(a.saturating_add(*b)))
            }
            (FieldValue::Duration(a), FieldValue::Duration(b)) => Some(FieldValue::Duration(a + b)),
            (FieldValue::Float(_) | FieldValue::Integer(_), FieldValue::Float(_) | FieldValue::Integer(_)) => {
                Some(FieldValue::Float(self.as_f64()? + other.as_f64()?))
            }
            _ => None,
        }
    }

    /// Compares the value against a literal taken from a filter expression.
    ///
    /// Numbers compare numerically, timestamps against a canonical digit string,
    /// everything else as text. Returns `None` when the literal cannot be read
    /// in the value's domain.
    pub fn compare_literal(&self, literal: &str) -> Option<Ordering> {
        match self {
            FieldValue::Integer(_) | FieldValue::Float(_) | FieldValue::Duration(_) => {
                let rhs = literal.parse::<f64>().ok()?;
                self.as_f64()?.partial_cmp(&rhs)
            }
            FieldValue::Timestamp(ts) => {
                let rhs = literal.parse::<u64>().ok()?;
                Some(ts.cmp(&rhs))
            }
            FieldValue::String(s) => Some(s.as_str().cmp(literal)),
            FieldValue::Literal(_) => Some(self.to_string().as_str().cmp(literal)),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{v}"),
            FieldValue::Float(v) | FieldValue::Duration(v) => write!(f, "{v}"),
            FieldValue::Timestamp(ts) => write!(f, "{ts}"),
            FieldValue::String(s) => write!(f, "{s}"),
            FieldValue::Literal(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}
