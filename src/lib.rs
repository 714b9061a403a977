//! prompt-jinja: a Jinja2-subset template engine for the chat templates of
//! language models.
//!
//! Templates are compiled once into an immutable syntax tree and rendered
//! many times against JSON bindings. Output matches the reference Python
//! implementation byte for byte: Python-style value display, Jinja2
//! whitespace control, and `json.dumps`-compatible `tojson`.
//!
//! # Example
//!
//! ```
//! use prompt_jinja::{Options, Template};
//! use serde_json::json;
//!
//! let template = Template::compile(
//!     "{% for m in messages %}<|{{ m.role }}|>{{ m.content | trim }}\n{% endfor %}",
//!     Options::default(),
//! )?;
//! let out = template.render(&json!({
//!     "messages": [{"role": "user", "content": " Hi! "}],
//! }))?;
//! assert_eq!(out, "<|user|>Hi!\n");
//! # Ok::<(), prompt_jinja::Error>(())
//! ```
//!
//! # Crates
//!
//! - `prompt-jinja-core` - spans, errors and options
//! - `prompt-jinja-parser` - lexer, parser and syntax tree
//! - `prompt-jinja-runtime` - value model, scopes and evaluator
//! - `prompt-jinja-builtins` - the built-in filters, tests and globals

mod template;

pub use template::{Template, default_registry};

pub use prompt_jinja_core::{
    DEFAULT_MAX_DEPTH, Error, Options, RenderError, RenderErrorKind, RenderOptions, Span, SyntaxError,
    SyntaxErrorKind, UndefinedBehavior,
};
pub use prompt_jinja_runtime::{Args, Context, JsonOptions, Registry, State, Value};

/// Lower-level building blocks for hosts that extend the engine.
pub mod runtime {
    pub use prompt_jinja_runtime::*;
}

pub use prompt_jinja_builtins as builtins;
