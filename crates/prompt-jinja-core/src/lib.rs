//! Shared building blocks for the prompt-jinja template engine.
//!
//! This crate holds what every other phase needs:
//! - [`Span`] source locations
//! - the error taxonomy ([`SyntaxError`], [`RenderError`], [`Error`])
//! - compile and render [`Options`]

pub mod error;
pub mod options;
mod span;

pub use error::{Error, RenderError, RenderErrorKind, RenderResult, SyntaxError, SyntaxErrorKind};
pub use options::{DEFAULT_MAX_DEPTH, Options, RenderOptions, UndefinedBehavior};
pub use span::Span;
