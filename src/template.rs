//! Compiled templates.
//!
//! A [`Template`] owns its syntax tree behind an [`Arc`]: compile once,
//! share across threads, render concurrently. Every render builds its own
//! scope chain, so renders never observe each other.

use std::rc::Rc;
use std::sync::{Arc, LazyLock};

use prompt_jinja_core::{Options, RenderError, RenderOptions, SyntaxError};
use prompt_jinja_parser::{Parser, Sequence};
use prompt_jinja_runtime::{Context, Registry, State};
use tracing::debug;

static DEFAULT_REGISTRY: LazyLock<Registry> = LazyLock::new(prompt_jinja_builtins::registry);

/// The registry holding every built-in filter, test and global.
pub fn default_registry() -> &'static Registry {
    &DEFAULT_REGISTRY
}

/// A compiled template.
#[derive(Debug, Clone)]
pub struct Template {
    body: Arc<Sequence>,
    options: Options,
}

impl Template {
    /// Parse `source` into a reusable template.
    ///
    /// Every syntax error surfaces here; rendering a compiled template never
    /// raises one.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(source: &str, options: Options) -> Result<Template, SyntaxError> {
        let body = Parser::parse(source, &options).inspect_err(|e| {
            debug!(error = %e, "template failed to compile");
        })?;
        debug!(
            bytes = source.len(),
            statements = body.stmts.len(),
            "compiled template"
        );
        Ok(Template {
            body: Arc::new(body),
            options,
        })
    }

    /// The options the template was compiled with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Render with `bindings` as the root scope, lenient undefined handling
    /// and the built-in registry.
    ///
    /// Non-object bindings give an empty root scope.
    pub fn render(&self, bindings: &serde_json::Value) -> Result<String, RenderError> {
        self.render_with(Context::from_json(bindings)?, RenderOptions::default())
    }

    /// Render against a caller-built root scope, for hosts that bind native
    /// callables with [`Value::from_fn`](prompt_jinja_runtime::Value::from_fn).
    pub fn render_with(&self, root: Rc<Context>, options: RenderOptions) -> Result<String, RenderError> {
        self.render_with_registry(root, options, default_registry())
    }

    /// Render with a custom filter / test / global registry.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn render_with_registry(
        &self,
        root: Rc<Context>,
        options: RenderOptions,
        registry: &Registry,
    ) -> Result<String, RenderError> {
        let output = State::new(registry, options)
            .with_autoescape(self.options.autoescape)
            .render(&self.body, &root)?;
        debug!(bytes = output.len(), "rendered template");
        Ok(output)
    }
}
