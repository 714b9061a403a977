//! Abstract Syntax Tree (AST) for templates.
//!
//! This module provides:
//! - Statement and expression node definitions
//! - Operator tables with Pratt binding powers
//! - The [`Parser`] turning template source into a [`Sequence`]
//!
//! # Example
//!
//! ```
//! use prompt_jinja_core::Options;
//! use prompt_jinja_parser::ast::{Parser, Stmt};
//!
//! let body = Parser::parse("Hi {{ user.name | title }}!", &Options::default()).unwrap();
//! assert!(matches!(body.stmts[1], Stmt::Output(_)));
//! ```

pub mod ops;

mod parser;

pub mod expr;
mod expr_parser;

pub mod stmt;
mod stmt_parser;

pub use expr::*;
pub use ops::*;
pub use parser::{MAX_NESTING, Parser};
pub use stmt::*;
