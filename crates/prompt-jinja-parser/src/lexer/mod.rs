//! Lexical analysis: template segments and tag-body tokens.
//!
//! Lexing happens in two stages. [`lex`] splits the template into text and
//! tags while applying whitespace control; the [`Tokenizer`] then scans the
//! body of each expression or statement tag.

mod cursor;
mod segments;
mod token;
mod tokenizer;

pub use segments::{Segment, TagKind, Trim, lex};
pub use token::{Token, TokenKind};
pub use tokenizer::Tokenizer;
