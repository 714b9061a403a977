//! Tree-walking evaluator.
//!
//! [`State`] walks a parsed [`Sequence`] against a chain of [`Context`]
//! frames and appends output to a `String`. It handles:
//! - Expressions, including filter and test dispatch through the [`Registry`]
//! - Statements and block constructs
//! - `for` loops with loop metadata and `break` / `continue`
//! - Macro and native calls with a recursion-depth guard
//!
//! # Example
//!
//! ```
//! use prompt_jinja_core::{Options, RenderOptions};
//! use prompt_jinja_parser::Parser;
//! use prompt_jinja_runtime::{Context, Registry, State};
//!
//! let body = Parser::parse("{% for x in xs %}{{ x * 2 }},{% endfor %}", &Options::default()).unwrap();
//! let registry = Registry::new();
//! let ctx = Context::from_json(&serde_json::json!({"xs": [1, 2, 3]})).unwrap();
//! let out = State::new(&registry, RenderOptions::default()).render(&body, &ctx).unwrap();
//! assert_eq!(out, "2,4,6,");
//! ```

mod calls;
mod expr;
mod for_loop;
mod stmt;

use std::rc::Rc;

use prompt_jinja_core::{RenderError, RenderOptions, RenderResult, Span, UndefinedBehavior};
use prompt_jinja_parser::ast::Sequence;
use tracing::debug;

use crate::context::Context;
use crate::registry::Registry;

/// How a statement finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Normal,
    /// A `break` is unwinding to the innermost loop.
    Break(Span),
    /// A `continue` is unwinding to the innermost loop.
    Continue(Span),
}

impl Flow {
    /// Turn a loop-control flow that escaped its body into an error.
    fn outside_loop(self) -> RenderResult<()> {
        match self {
            Flow::Normal => Ok(()),
            Flow::Break(span) => {
                Err(RenderError::structural("break outside of a loop").with_span(span))
            }
            Flow::Continue(span) => {
                Err(RenderError::structural("continue outside of a loop").with_span(span))
            }
        }
    }
}

/// Per-render evaluator state.
///
/// Native functions receive the state so they can call back into the
/// engine: invoke a macro, apply a filter by name, or run a test.
pub struct State<'r> {
    registry: &'r Registry,
    options: RenderOptions,
    autoescape: bool,
    /// Current call depth.
    depth: usize,
    /// Current expression evaluation depth, across calls.
    expr_depth: usize,
    /// While positive, missing names evaluate to undefined even in strict mode.
    lenient: usize,
    /// Frames that had macros defined in them; cleared after rendering.
    macro_frames: Vec<Rc<Context>>,
}

impl<'r> State<'r> {
    pub fn new(registry: &'r Registry, options: RenderOptions) -> Self {
        Self {
            registry,
            options,
            autoescape: false,
            depth: 0,
            expr_depth: 0,
            lenient: 0,
            macro_frames: Vec::new(),
        }
    }

    /// Escape every non-safe output.
    pub fn with_autoescape(mut self, on: bool) -> Self {
        self.autoescape = on;
        self
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    pub fn autoescape(&self) -> bool {
        self.autoescape
    }

    /// Whether missing names and keys must raise right now.
    pub fn is_strict(&self) -> bool {
        self.options.undefined == UndefinedBehavior::Strict && self.lenient == 0
    }

    /// Render a template body in a fresh frame on top of `ctx`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn render(&mut self, body: &Sequence, ctx: &Rc<Context>) -> RenderResult<String> {
        let frame = Context::child(ctx);
        let mut out = String::new();
        let result = self
            .exec_seq(body, &frame, &mut out)
            .and_then(Flow::outside_loop);
        frame.clear();
        for frame in self.macro_frames.drain(..) {
            frame.clear();
        }
        match result {
            Ok(()) => Ok(out),
            Err(err) => {
                debug!(kind = %err.kind, message = %err.message, "render failed");
                Err(err)
            }
        }
    }

    /// Run `f` with strict undefined checks suspended.
    fn leniently<T>(&mut self, f: impl FnOnce(&mut Self) -> RenderResult<T>) -> RenderResult<T> {
        self.lenient += 1;
        let result = f(self);
        self.lenient -= 1;
        result
    }

    /// Run `f` one call level deeper.
    fn descend<T>(&mut self, f: impl FnOnce(&mut Self) -> RenderResult<T>) -> RenderResult<T> {
        if self.depth >= self.options.max_depth {
            return Err(RenderError::recursion(format!(
                "maximum call depth of {} exceeded",
                self.options.max_depth
            )));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use prompt_jinja_core::{Options, RenderOptions, RenderResult};
    use prompt_jinja_parser::Parser;

    use crate::context::Context;
    use crate::registry::Registry;

    use super::State;

    pub fn render_with(
        source: &str,
        bindings: serde_json::Value,
        registry: &Registry,
        options: RenderOptions,
    ) -> RenderResult<String> {
        let body = Parser::parse(source, &Options::default()).expect("template should parse");
        let ctx = Context::from_json(&bindings)?;
        State::new(registry, options).render(&body, &ctx)
    }

    pub fn render(source: &str, bindings: serde_json::Value) -> RenderResult<String> {
        render_with(source, bindings, &Registry::new(), RenderOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{render, render_with};
    use super::*;
    use serde_json::json;

    #[test]
    fn break_outside_loop_is_an_error() {
        let err = render("a{% break %}", json!({})).unwrap_err();
        assert_eq!(err.message, "break outside of a loop");
        assert_eq!(err.span.map(|s| s.line), Some(1));
        let err = render("{% if true %}{% continue %}{% endif %}", json!({})).unwrap_err();
        assert_eq!(err.message, "continue outside of a loop");
    }

    #[test]
    fn strict_mode_raises_on_missing_names() {
        let err = render_with("{{ missing }}", json!({}), &Registry::new(), RenderOptions::strict())
            .unwrap_err();
        assert_eq!(err.kind, prompt_jinja_core::RenderErrorKind::Name);
        assert_eq!(err.message, "'missing' is undefined");
        assert_eq!(render("[{{ missing }}]", json!({})).unwrap(), "[]");
    }

    #[test]
    fn recursion_guard_trips() {
        let source = "{% macro f(n) %}{{ f(n + 1) }}{% endmacro %}{{ f(0) }}";
        let options = RenderOptions::default().with_max_depth(10);
        let err = render_with(source, json!({}), &Registry::new(), options).unwrap_err();
        assert_eq!(err.kind, prompt_jinja_core::RenderErrorKind::Recursion);
    }

    #[test]
    fn macro_frames_are_released_after_render() {
        let registry = Registry::new();
        let body = prompt_jinja_parser::Parser::parse(
            "{% macro m() %}x{% endmacro %}{{ m() }}",
            &prompt_jinja_core::Options::default(),
        )
        .unwrap();
        let root = Context::new();
        let out = State::new(&registry, RenderOptions::default()).render(&body, &root).unwrap();
        assert_eq!(out, "x");
        assert_eq!(Rc::strong_count(&root), 1);
    }
}
