//! Variable scopes.
//!
//! A [`Context`] is one frame of bindings plus an optional parent. Frames are
//! reference counted: a macro keeps the frame it was defined in alive so
//! that its body can see the variables that were in scope at definition.

use std::cell::RefCell;
use std::rc::Rc;

use prompt_jinja_core::RenderResult;
use rustc_hash::FxHashMap;

use crate::value::Value;

/// One frame of variable bindings.
#[derive(Debug, Default)]
pub struct Context {
    vars: RefCell<FxHashMap<String, Value>>,
    parent: Option<Rc<Context>>,
}

impl Context {
    /// A root frame with no bindings.
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// A root frame holding the members of a JSON object.
    ///
    /// Any other JSON value yields an empty frame.
    pub fn from_json(bindings: &serde_json::Value) -> RenderResult<Rc<Self>> {
        let ctx = Self::default();
        if let serde_json::Value::Object(members) = bindings {
            let mut vars = ctx.vars.borrow_mut();
            for (name, value) in members {
                vars.insert(name.clone(), Value::from_json(value)?);
            }
        }
        Ok(Rc::new(ctx))
    }

    /// A new innermost frame on top of `parent`.
    pub fn child(parent: &Rc<Context>) -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::default(),
            parent: Some(parent.clone()),
        })
    }

    pub fn parent(&self) -> Option<&Rc<Context>> {
        self.parent.as_ref()
    }

    /// Look a name up from this frame outwards.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut frame = self;
        loop {
            if let Some(value) = frame.vars.borrow().get(name) {
                return Some(value.clone());
            }
            frame = frame.parent.as_deref()?;
        }
    }

    /// Bind a name in this frame, shadowing any outer binding.
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.vars.borrow_mut().insert(name.into(), value);
    }

    /// Whether the name is bound in any frame.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Drop every binding of this frame.
    ///
    /// Used once rendering is over to break the reference cycle between a
    /// frame and the macros defined in it.
    pub fn clear(&self) {
        self.vars.borrow_mut().clear();
    }
}
