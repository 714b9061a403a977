//! The dynamic value model templates operate on.
//!
//! [`Value`] is a small tagged union. Scalars are stored inline; strings are
//! reference counted so cloning a value never copies text; arrays and
//! objects are shared, interior-mutable containers so that
//! `{% set b = a %}{{ b.append(1) }}` is visible through `a`, matching
//! the aliasing rules of Python lists and dicts.
//!
//! Values are `!Send`: every render builds its own graph of values and
//! drops it when the render ends.

mod display;
mod json;
mod key;
mod methods;
mod ops;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use prompt_jinja_core::{RenderError, RenderResult};
use prompt_jinja_parser::ast::MacroDef;
use rustc_hash::FxBuildHasher;

use crate::args::Args;
use crate::context::Context;
use crate::eval::State;

pub use display::{escape_html, format_float};
pub use json::JsonOptions;
pub use key::Key;
pub use methods::call_method;
pub use ops::binary_op;

/// Insertion-ordered map backing object values.
pub type Map = IndexMap<Key, Value, FxBuildHasher>;

/// Shared array storage.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Shared object storage.
pub type ObjectRef = Rc<RefCell<Map>>;

/// Signature of host functions callable from templates.
pub type NativeFn = dyn Fn(&mut State<'_>, Args) -> RenderResult<Value>;

/// A dynamically typed template value.
#[derive(Clone, Default)]
pub enum Value {
    /// The result of looking up something that does not exist.
    #[default]
    Undefined,
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Rc<str>),
    /// A string that has already been escaped and must be output verbatim.
    Safe(Rc<str>),
    Array(ArrayRef),
    Object(ObjectRef),
    Callable(Rc<Callable>),
}

/// Something that can be invoked with `(...)` from a template.
pub enum Callable {
    /// A host function, e.g. a global like `range` or `loop.cycle`.
    Native { name: String, func: Box<NativeFn> },
    /// A template macro together with the frame it was defined in.
    Macro { def: Arc<MacroDef>, closure: Rc<Context> },
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Native { name, .. } => name,
            Callable::Macro { def, .. } => &def.name.name,
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native { name, .. } => write!(f, "<function {name}>"),
            Callable::Macro { def, .. } => write!(f, "<macro {}>", def.name.name),
        }
    }
}

// ============================================================================
// Construction
// ============================================================================

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Value {
        Value::String(s.into())
    }

    pub fn safe(s: impl Into<Rc<str>>) -> Value {
        Value::Safe(s.into())
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(map: Map) -> Value {
        Value::Object(Rc::new(RefCell::new(map)))
    }

    /// An empty object.
    pub fn new_object() -> Value {
        Value::object(Map::default())
    }

    /// Build an object from string keys.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> Value {
        Value::object(pairs.into_iter().map(|(k, v)| (Key::from(k), v)).collect())
    }

    /// Wrap a host closure as a callable value.
    pub fn from_fn<F>(name: impl Into<String>, func: F) -> Value
    where
        F: Fn(&mut State<'_>, Args) -> RenderResult<Value> + 'static,
    {
        Value::Callable(Rc::new(Callable::Native {
            name: name.into(),
            func: Box::new(func),
        }))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        i64::try_from(i).map_or(Value::Float(i as f64), Value::Int)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::object(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::None, Into::into)
    }
}

// ============================================================================
// Queries
// ============================================================================

impl Value {
    /// The Python type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) | Value::Safe(_) => "str",
            Value::Array(_) => "list",
            Value::Object(_) => "dict",
            Value::Callable(_) => "function",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// `None` or `Undefined`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::None | Value::Undefined)
    }

    /// Ints and floats. A bool is an int here.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Bool(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_) | Value::Safe(_))
    }

    pub fn is_safe(&self) -> bool {
        matches!(self, Value::Safe(_))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Callable(_))
    }

    /// Python truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) | Value::Safe(s) => !s.is_empty(),
            Value::Array(items) => !items.borrow().is_empty(),
            Value::Object(map) => !map.borrow().is_empty(),
            Value::Callable(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Safe(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of ints and bools.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Float view of any number or bool.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Whether `other` is the same container (or the same callable).
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Callable(a), Value::Callable(b)) => Rc::ptr_eq(a, b),
            (Value::Undefined, Value::Undefined) | (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a) | Value::Safe(a), Value::String(b) | Value::Safe(b)) => a == b,
            _ => false,
        }
    }

    /// Number of items of a sized value.
    pub fn len(&self) -> RenderResult<usize> {
        match self {
            Value::Undefined => Ok(0),
            Value::String(s) | Value::Safe(s) => Ok(s.chars().count()),
            Value::Array(items) => Ok(items.borrow().len()),
            Value::Object(map) => Ok(map.borrow().len()),
            other => Err(RenderError::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            ))),
        }
    }

    /// Snapshot of the items iteration would visit: array elements, object
    /// keys, or string characters.
    pub fn try_iter(&self) -> RenderResult<Vec<Value>> {
        match self {
            Value::Undefined => Ok(Vec::new()),
            Value::Array(items) => Ok(items.borrow().clone()),
            Value::Object(map) => Ok(map.borrow().keys().map(Key::to_value).collect()),
            Value::String(s) | Value::Safe(s) => {
                Ok(s.chars().map(|c| Value::from(c.to_string())).collect())
            }
            other => Err(RenderError::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))),
        }
    }

    /// Look up a named attribute: object keys, or numeric names on arrays.
    pub fn get_attr(&self, name: &str) -> Option<Value> {
        match self {
            Value::Object(map) => map.borrow().get(&Key::from(name)).cloned(),
            Value::Array(_) => {
                let index = name.parse::<i64>().ok()?;
                self.get_item(&Value::Int(index)).ok().flatten()
            }
            _ => None,
        }
    }

    /// Whether appending to `self` would make it contain itself.
    pub(crate) fn reject_self_insert(&self, item: &Value) -> RenderResult<()> {
        if self.is_same(item) {
            return Err(RenderError::value("cannot insert a container into itself"));
        }
        Ok(())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Callable(c) => write!(f, "{c:?}"),
            Value::Safe(s) => write!(f, "Safe({s:?})"),
            other => f.write_str(&other.repr()),
        }
    }
}
