//! Built-in filters, tests and global functions for prompt-jinja templates.
//!
//! This crate provides the standard catalog templates expect to find:
//!
//! - **filters** - `x | name(args)`: sequence, string, numeric and JSON filters
//! - **predicates** - `x is name(args)`: type, value and comparison tests
//! - **globals** - `range`, `namespace`, `joiner`, `cycler`, `dict`,
//!   `raise_exception`
//!
//! # Usage
//!
//! ```
//! use prompt_jinja_runtime::Registry;
//!
//! let mut registry = Registry::new();
//! prompt_jinja_builtins::register_all(&mut registry);
//! assert!(registry.filter("tojson").is_some());
//! assert!(registry.test("defined").is_some());
//! assert!(registry.global("range").is_some());
//! ```

pub mod filters;
pub mod globals;
pub mod predicates;

use prompt_jinja_runtime::Registry;
use tracing::debug;

/// Register every built-in filter, test and global into `registry`.
pub fn register_all(registry: &mut Registry) {
    filters::register(registry);
    predicates::register(registry);
    globals::register(registry);
    debug!(
        filters = registry.filter_names().count(),
        tests = registry.test_names().count(),
        globals = registry.global_names().count(),
        "registered builtins"
    );
}

/// A fresh registry holding the full built-in catalog.
pub fn registry() -> Registry {
    let mut registry = Registry::new();
    register_all(&mut registry);
    registry
}

#[cfg(test)]
pub(crate) mod test_support {
    use prompt_jinja_core::{Options, RenderOptions, RenderResult};
    use prompt_jinja_parser::Parser;
    use prompt_jinja_runtime::{Context, State};

    pub fn render_with(source: &str, bindings: serde_json::Value, options: RenderOptions) -> RenderResult<String> {
        let body = Parser::parse(source, &Options::default()).expect("template should parse");
        let ctx = Context::from_json(&bindings)?;
        let registry = super::registry();
        State::new(&registry, options).render(&body, &ctx)
    }

    /// Render with autoescaping switched on.
    pub fn render_escaped(source: &str) -> RenderResult<String> {
        let body = Parser::parse(source, &Options::default()).expect("template should parse");
        let registry = super::registry();
        State::new(&registry, RenderOptions::default())
            .with_autoescape(true)
            .render(&body, &Context::new())
    }

    pub fn render(source: &str) -> RenderResult<String> {
        render_with(source, serde_json::json!({}), RenderOptions::default())
    }

    /// Render `{{ source }}` and unwrap.
    pub fn eval(source: &str) -> String {
        render(&format!("{{{{ {source} }}}}")).unwrap()
    }
}
