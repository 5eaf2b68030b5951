//! Literal values carried by Kripke node variables
//!
//! A node snapshot maps variable names to values. Values are:
//! - Immutable: snapshots never mutate after construction
//! - Hashable: node identity is derived from variable values
//! - Comparable: ordering comparisons appear in atomic predicates
//!
//! The set of kinds is closed: a machine variable is a boolean, a signed
//! integer, or a string (state names and enumerated signals are strings).

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A literal value in a node's variable snapshot
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    /// Boolean signal
    Bool(bool),
    /// Signed integer register
    Int(i64),
    /// String-valued signal (state names, enumerations)
    Str(Arc<str>),
}

impl Value {
    /// Convenience constructor for string values
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// Kind name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
        }
    }

    /// Whether two values are of the same kind (required for ordering
    /// comparisons; equality across kinds is simply false).
    pub fn same_kind(&self, other: &Value) -> bool {
        matches!(
            (self, other),
            (Value::Bool(_), Value::Bool(_))
                | (Value::Int(_), Value::Int(_))
                | (Value::Str(_), Value::Str(_))
        )
    }

    /// Ordering comparison between same-kind, orderable values.
    ///
    /// Integers compare numerically and strings lexicographically.
    /// Booleans have no meaningful order and mismatched kinds cannot be
    /// compared; both return `None`.
    pub fn ordering(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}
