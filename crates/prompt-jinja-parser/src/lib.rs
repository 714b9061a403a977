//! Template front end: lexing and parsing.
//!
//! [`ast::Parser::parse`] turns template source into an immutable
//! [`ast::Sequence`] that owns all of its nodes. The tree is `Send + Sync`
//! and is meant to be built once and rendered many times.

pub mod ast;
pub mod lexer;

pub use ast::{Parser, Sequence};
