//! Runtime for prompt-jinja templates.
//!
//! This crate turns a parsed template into text:
//! - [`Value`], the dynamic value model, with Python-compatible display,
//!   operators, built-in methods and JSON conversion
//! - [`Context`] scope frames
//! - [`Registry`] tables of filters, tests and global functions
//! - [`State`], the tree-walking evaluator
//!
//! The built-in filter catalog lives in `prompt-jinja-builtins`; an empty
//! [`Registry`] renders templates that use no filters or tests.

pub mod args;
pub mod context;
pub mod eval;
pub mod registry;
pub mod value;

pub use args::Args;
pub use context::Context;
pub use eval::State;
pub use registry::{FilterFn, GlobalFn, Registry, TestFn};
pub use value::{Callable, JsonOptions, Key, Map, Value};
