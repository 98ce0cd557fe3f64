use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Time in milliseconds, as seen by timer services.
pub type EventTime = i64;

/// A single sample flowing into a window, or an aggregate produced by one.
///
/// Samples carry no identity beyond their value and arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
        }
    }

    /// Numeric view of the sample. Text has none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(_) => None,
        }
    }

    /// Natural ordering between two samples.
    ///
    /// Integers and floats compare numerically with each other, text compares
    /// lexicographically. Returns `None` when the pair has no ordering
    /// (text against a number, or a NaN on either side).
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Text(_), _) | (_, Value::Text(_)) => None,
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }

    /// Return true if the sample can take part in an ordering at all.
    pub fn is_ordered(&self) -> bool {
        !matches!(self, Value::Float(v) if v.is_nan())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
        }
    }
}

/// Parses integers first, then floats; anything else is kept as text.
impl FromStr for Value {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(v) = s.parse::<i64>() {
            return Ok(Value::Int(v));
        }
        if let Ok(v) = s.parse::<f64>() {
            return Ok(Value::Float(v));
        }
        Ok(Value::Text(s.to_string()))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// What a window reports after `add_sample` or `next_block`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emission {
    /// Aggregate over the window's current contents. `None` means "no result"
    /// (an average or extreme over zero samples).
    pub result: Option<Value>,
    /// True when a window boundary was reached.
    #[serde(rename = "report")]
    pub emit: bool,
}

impl Emission {
    /// A boundary result.
    pub fn boundary(result: Option<Value>) -> Self {
        Self { result, emit: true }
    }

    /// A running, non-boundary result.
    pub fn partial(result: Option<Value>) -> Self {
        Self {
            result,
            emit: false,
        }
    }
}

#[cfg(test)]
#[path = "tests/types_tests.rs"]
mod tests;
