//! Property value types for graph nodes and relationships
//!
//! Values are a closed tagged union. There is no null: a missing key means a
//! missing property. Arrays are homogeneous by construction, one variant per
//! element type.
//!
//! Values are used as index keys, so they carry a total order and a hash.
//! Floats compare with `f64::total_cmp` and hash by bit pattern, which keeps
//! `Eq`, `Ord` and `Hash` consistent with each other (`NaN == NaN`,
//! `-0.0 != 0.0`).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Homogeneous array property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PropertyArray {
    String(Vec<String>),
    Integer(Vec<i64>),
    Float(Vec<f64>),
    Boolean(Vec<bool>),
}

impl PropertyArray {
    pub fn len(&self) -> usize {
        match self {
            PropertyArray::String(v) => v.len(),
            PropertyArray::Integer(v) => v.len(),
            PropertyArray::Float(v) => v.len(),
            PropertyArray::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type name
    pub fn element_type(&self) -> &'static str {
        match self {
            PropertyArray::String(_) => "String",
            PropertyArray::Integer(_) => "Integer",
            PropertyArray::Float(_) => "Float",
            PropertyArray::Boolean(_) => "Boolean",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            PropertyArray::String(_) => 0,
            PropertyArray::Integer(_) => 1,
            PropertyArray::Float(_) => 2,
            PropertyArray::Boolean(_) => 3,
        }
    }
}

impl PartialEq for PropertyArray {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PropertyArray {}

impl PartialOrd for PropertyArray {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PropertyArray {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PropertyArray::String(a), PropertyArray::String(b)) => a.cmp(b),
            (PropertyArray::Integer(a), PropertyArray::Integer(b)) => a.cmp(b),
            (PropertyArray::Boolean(a), PropertyArray::Boolean(b)) => a.cmp(b),
            (PropertyArray::Float(a), PropertyArray::Float(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.total_cmp(y) {
                        Ordering::Equal => continue,
                        ord => return ord,
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for PropertyArray {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            PropertyArray::String(v) => v.hash(state),
            PropertyArray::Integer(v) => v.hash(state),
            PropertyArray::Boolean(v) => v.hash(state),
            PropertyArray::Float(v) => {
                v.len().hash(state);
                for f in v {
                    f.to_bits().hash(state);
                }
            }
        }
    }
}

/// Property value type
///
/// Supports:
/// - String
/// - Integer (i64)
/// - Float (f64)
/// - Boolean
/// - Array (homogeneous, see [`PropertyArray`])
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Array(PropertyArray),
}

impl PropertyValue {
    /// Get string value if this is a string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get integer value if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get float value if this is a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get boolean value if this is a boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get array value if this is an array
    pub fn as_array(&self) -> Option<&PropertyArray> {
        match self {
            PropertyValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Get type name as string
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "String",
            PropertyValue::Integer(_) => "Integer",
            PropertyValue::Float(_) => "Float",
            PropertyValue::Boolean(_) => "Boolean",
            PropertyValue::Array(_) => "Array",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            PropertyValue::String(_) => 0,
            PropertyValue::Integer(_) => 1,
            PropertyValue::Float(_) => 2,
            PropertyValue::Boolean(_) => 3,
            PropertyValue::Array(_) => 4,
        }
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PropertyValue {}

impl PartialOrd for PropertyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PropertyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PropertyValue::String(a), PropertyValue::String(b)) => a.cmp(b),
            (PropertyValue::Integer(a), PropertyValue::Integer(b)) => a.cmp(b),
            (PropertyValue::Float(a), PropertyValue::Float(b)) => a.total_cmp(b),
            (PropertyValue::Boolean(a), PropertyValue::Boolean(b)) => a.cmp(b),
            (PropertyValue::Array(a), PropertyValue::Array(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for PropertyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            PropertyValue::String(s) => s.hash(state),
            PropertyValue::Integer(i) => i.hash(state),
            PropertyValue::Float(f) => f.to_bits().hash(state),
            PropertyValue::Boolean(b) => b.hash(state),
            PropertyValue::Array(a) => a.hash(state),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "\"{}\"", s),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Array(arr) => {
                write!(f, "[")?;
                match arr {
                    PropertyArray::String(v) => write_joined(f, v.iter().map(|s| format!("\"{}\"", s)))?,
                    PropertyArray::Integer(v) => write_joined(f, v.iter().map(|i| i.to_string()))?,
                    PropertyArray::Float(v) => write_joined(f, v.iter().map(|x| x.to_string()))?,
                    PropertyArray::Boolean(v) => write_joined(f, v.iter().map(|b| b.to_string()))?,
                }
                write!(f, "]")
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: impl Iterator<Item = String>) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

// Convenience conversions
impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(v: Vec<String>) -> Self {
        PropertyValue::Array(PropertyArray::String(v))
    }
}

impl From<Vec<&str>> for PropertyValue {
    fn from(v: Vec<&str>) -> Self {
        PropertyValue::Array(PropertyArray::String(v.into_iter().map(String::from).collect()))
    }
}

impl From<Vec<i64>> for PropertyValue {
    fn from(v: Vec<i64>) -> Self {
        PropertyValue::Array(PropertyArray::Integer(v))
    }
}

impl From<Vec<f64>> for PropertyValue {
    fn from(v: Vec<f64>) -> Self {
        PropertyValue::Array(PropertyArray::Float(v))
    }
}

impl From<Vec<bool>> for PropertyValue {
    fn from(v: Vec<bool>) -> Self {
        PropertyValue::Array(PropertyArray::Boolean(v))
    }
}

impl From<PropertyArray> for PropertyValue {
    fn from(arr: PropertyArray) -> Self {
        PropertyValue::Array(arr)
    }
}

/// Property map for storing node and relationship properties
pub type PropertyMap = HashMap<String, PropertyValue>;
