//! Registry - name tables for filters, tests and global functions.
//!
//! # Storage Model
//!
//! Three flat [`FxHashMap`]s keyed by the name templates use: filters
//! (`x | name`), tests (`x is name`) and globals (`name(...)`). Aliases such
//! as `d` for `default` or `==` for `equalto` are simply extra entries
//! pointing at the same function.
//!
//! # Lifecycle
//!
//! The registry is populated once, then only read while rendering. It holds
//! plain function pointers, so a fully built registry is `Send + Sync` and
//! can live in a `static`.
//!
//! # Example
//!
//! ```
//! use prompt_jinja_runtime::{Registry, Value};
//!
//! let mut registry = Registry::new();
//! registry.register_filter("double", |_, value, _| {
//!     Ok(Value::Int(value.as_i64().unwrap_or(0) * 2))
//! });
//! assert!(registry.filter("double").is_some());
//! assert!(registry.filter("triple").is_none());
//! ```

use rustc_hash::FxHashMap;

use prompt_jinja_core::RenderResult;

use crate::args::Args;
use crate::eval::State;
use crate::value::Value;

/// `value | name(args)`
pub type FilterFn = fn(&mut State<'_>, Value, Args) -> RenderResult<Value>;

/// `value is name(args)`
pub type TestFn = fn(&mut State<'_>, &Value, Args) -> RenderResult<bool>;

/// `name(args)` for names that are not bound in any frame.
pub type GlobalFn = fn(&mut State<'_>, Args) -> RenderResult<Value>;

/// Filter, test and global function tables.
#[derive(Default, Clone)]
pub struct Registry {
    filters: FxHashMap<&'static str, FilterFn>,
    tests: FxHashMap<&'static str, TestFn>,
    globals: FxHashMap<&'static str, GlobalFn>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register a filter, replacing any previous one of the same name.
    pub fn register_filter(&mut self, name: &'static str, filter: FilterFn) -> &mut Self {
        self.filters.insert(name, filter);
        self
    }

    /// Register a test, replacing any previous one of the same name.
    pub fn register_test(&mut self, name: &'static str, test: TestFn) -> &mut Self {
        self.tests.insert(name, test);
        self
    }

    /// Register a global function, replacing any previous one of the same name.
    pub fn register_global(&mut self, name: &'static str, global: GlobalFn) -> &mut Self {
        self.globals.insert(name, global);
        self
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    pub fn filter(&self, name: &str) -> Option<FilterFn> {
        self.filters.get(name).copied()
    }

    pub fn test(&self, name: &str) -> Option<TestFn> {
        self.tests.get(name).copied()
    }

    pub fn global(&self, name: &str) -> Option<GlobalFn> {
        self.globals.get(name).copied()
    }

    /// Registered filter names, in no particular order.
    pub fn filter_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.filters.keys().copied()
    }

    /// Registered test names, in no particular order.
    pub fn test_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tests.keys().copied()
    }

    /// Registered global names, in no particular order.
    pub fn global_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.globals.keys().copied()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("filters", &self.filters.len())
            .field("tests", &self.tests.len())
            .field("globals", &self.globals.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(_: &mut State<'_>, value: Value, _: Args) -> RenderResult<Value> {
        Ok(value)
    }

    fn always(_: &mut State<'_>, _: &Value, _: Args) -> RenderResult<bool> {
        Ok(true)
    }

    #[test]
    fn aliases_share_a_function() {
        let mut registry = Registry::new();
        registry
            .register_filter("identity", identity)
            .register_filter("id", identity)
            .register_test("anything", always);
        assert!(registry.filter("id").is_some());
        assert!(registry.test("anything").is_some());
        let mut names: Vec<_> = registry.filter_names().collect();
        names.sort_unstable();
        assert_eq!(names, ["id", "identity"]);
    }

    #[test]
    fn registry_is_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }
}
