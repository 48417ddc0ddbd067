use core::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};
use serde::{Deserialize, Serialize};

/// Primitive category of a column as declared by the host type layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Signed integers of any width
    Integral,
    /// Floating point numbers
    Double,
    /// Booleans
    Boolean,
    /// UTF-8 strings
    Text,
    /// Raw byte buffers
    Binary,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Integral => "integral",
            Category::Double => "double",
            Category::Boolean => "boolean",
            Category::Text => "text",
            Category::Binary => "binary",
        };
        f.write_str(name)
    }
}

/// A primitive row value handed to an evaluator by the host
///
/// Absent (null) values are modelled as `None` in the row slice, never as a variant here.
///
/// `Value` is also the canonical form stored in a
/// [`MultisetTable`](crate::multiset::MultisetTable): equality and hashing treat `-0.0`
/// as `0.0` and every NaN as the same value, so doubles are usable as keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// An integral value
    Int(i64),
    /// A double value
    Double(f64),
    /// A boolean value
    Bool(bool),
    /// A text value
    Text(String),
    /// A binary value
    Binary(Vec<u8>),
}

impl Value {
    /// Returns the primitive category of this value
    pub fn category(&self) -> Category {
        match self {
            Value::Int(_) => Category::Integral,
            Value::Double(_) => Category::Double,
            Value::Bool(_) => Category::Boolean,
            Value::Text(_) => Category::Text,
            Value::Binary(_) => Category::Binary,
        }
    }

    /// Returns an owned copy that shares nothing with `self` and compares stably
    pub fn canonical(&self) -> Value {
        match self {
            Value::Double(d) => Value::Double(canonical_double(*d)),
            other => other.clone(),
        }
    }

    /// Returns the integral payload if this is an [`Value::Int`]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the byte payload if this is a [`Value::Binary`]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Int(_) => 1,
            Value::Double(_) => 2,
            Value::Text(_) => 3,
            Value::Binary(_) => 4,
        }
    }
}

#[inline]
pub(crate) fn canonical_double(d: f64) -> f64 {
    if d.is_nan() {
        f64::NAN
    } else if d == 0.0 {
        0.0
    } else {
        d
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Double(a), Value::Double(b)) => {
                canonical_double(*a).total_cmp(&canonical_double(*b))
            }
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Binary(a), Value::Binary(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Int(v) => v.hash(state),
            Value::Double(d) => canonical_double(*d).to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Text(s) => s.hash(state),
            Value::Binary(b) => b.hash(state),
        }
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
        Value::Double(v)
    }
}
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}
impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}
impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Binary(v.to_vec())
    }
}
