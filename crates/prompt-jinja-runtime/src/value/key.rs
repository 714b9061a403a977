//! Hashable object keys.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use ordered_float::OrderedFloat;
use prompt_jinja_core::{RenderError, RenderResult};

use super::Value;

/// A key of an object (dict).
///
/// Only scalars can be keys. Integral floats are stored as integers so that
/// `d[1]` and `d[1.0]` find the same entry, as in Python.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    None,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    String(Rc<str>),
}

impl Key {
    /// Convert a value into a key, failing for containers and callables.
    pub fn from_value(value: &Value) -> RenderResult<Key> {
        Ok(match value {
            Value::Undefined | Value::None => Key::None,
            Value::Bool(b) => Key::Bool(*b),
            Value::Int(i) => Key::Int(*i),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Key::Int(*f as i64),
            Value::Float(f) => Key::Float(OrderedFloat(*f)),
            Value::String(s) | Value::Safe(s) => Key::String(s.clone()),
            other => {
                return Err(RenderError::type_error(format!(
                    "unhashable type: '{}'",
                    other.type_name()
                )));
            }
        })
    }

    pub fn to_value(&self) -> Value {
        match self {
            Key::None => Value::None,
            Key::Bool(b) => Value::Bool(*b),
            Key::Int(i) => Value::Int(*i),
            Key::Float(f) => Value::Float(f.0),
            Key::String(s) => Value::String(s.clone()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::String(s) => Some(s),
            _ => None,
        }
    }

    /// The key as a JSON object member name: strings verbatim, other
    /// scalars as their JSON text.
    pub fn to_json_name(&self) -> String {
        match self {
            Key::None => "null".to_string(),
            Key::Bool(b) => b.to_string(),
            Key::Int(i) => i.to_string(),
            Key::Float(f) => super::display::format_float(f.0),
            Key::String(s) => s.to_string(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Key::None => 0,
            Key::Bool(_) | Key::Int(_) | Key::Float(_) => 1,
            Key::String(_) => 2,
        }
    }

    fn as_f64(&self) -> f64 {
        match self {
            Key::Bool(b) => f64::from(u8::from(*b)),
            Key::Int(i) => *i as f64,
            Key::Float(f) => f.0,
            _ => 0.0,
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(Rc::from(s))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(Rc::from(s))
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

/// Numbers sort numerically, strings lexicographically; `None` sorts first
/// and numbers before strings so that mixed keys still have a stable order.
impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::String(a), Key::String(b)) => a.cmp(b),
            (Key::Int(a), Key::Int(b)) => a.cmp(b),
            _ if self.rank() == 1 && other.rank() == 1 => OrderedFloat(self.as_f64()).cmp(&OrderedFloat(other.as_f64())),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Python `repr` of the key, as used when printing dicts.
impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.to_value().write_repr(&mut out);
        f.write_str(&out)
    }
}
