//! Statement AST nodes.
//!
//! Provides nodes for every tag-level construct:
//! - Literal text and `{{ }}` output
//! - Control flow (`if`, `for`, `break`, `continue`)
//! - Assignment (`set`, block `set`, namespace attribute `set`)
//! - Macro definitions
//! - `filter` and `generation` blocks

use std::sync::Arc;

use crate::ast::expr::{Expr, FilterCall, Ident};
use prompt_jinja_core::Span;

/// An ordered list of statements: a template body or the body of a block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sequence {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Sequence {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Literal text
    Text(TextStmt),
    /// `{{ expr }}`
    Output(OutputStmt),
    /// `{% if %}` with its `elif` / `else` branches
    If(IfStmt),
    /// `{% for %}` with optional filter condition and `else`
    For(ForStmt),
    /// `{% set a = expr %}` and `{% set a, b = expr %}`
    Set(SetStmt),
    /// `{% set ns.attr = expr %}`
    NamespaceSet(NamespaceSetStmt),
    /// `{% set name %}...{% endset %}`
    SetBlock(SetBlockStmt),
    /// `{% macro name(params) %}...{% endmacro %}`
    Macro(MacroStmt),
    /// `{% filter chain %}...{% endfilter %}`
    FilterBlock(FilterBlockStmt),
    /// `{% generation %}...{% endgeneration %}`, rendered as its body
    Generation(GenerationStmt),
    /// `{% break %}`
    Break(Span),
    /// `{% continue %}`
    Continue(Span),
}

impl Stmt {
    /// Get the span of this statement.
    pub fn span(&self) -> Span {
        match self {
            Self::Text(s) => s.span,
            Self::Output(s) => s.span,
            Self::If(s) => s.span,
            Self::For(s) => s.span,
            Self::Set(s) => s.span,
            Self::NamespaceSet(s) => s.span,
            Self::SetBlock(s) => s.span,
            Self::Macro(s) => s.span,
            Self::FilterBlock(s) => s.span,
            Self::Generation(s) => s.span,
            Self::Break(span) | Self::Continue(span) => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStmt {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputStmt {
    pub expr: Expr,
    pub span: Span,
}

/// One `if` / `elif` arm.
#[derive(Debug, Clone, PartialEq)]
pub struct IfBranch {
    pub condition: Expr,
    pub body: Sequence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub branches: Vec<IfBranch>,
    pub else_body: Option<Sequence>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    /// Loop variables; more than one means each item is unpacked.
    pub targets: Vec<Ident>,
    pub iterable: Expr,
    /// `for x in xs if cond`: items failing the condition are skipped
    /// before loop metadata is computed.
    pub condition: Option<Expr>,
    pub body: Sequence,
    /// Rendered when no item was iterated.
    pub else_body: Option<Sequence>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetStmt {
    pub targets: Vec<Ident>,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceSetStmt {
    pub namespace: Ident,
    pub attr: Ident,
    pub value: Expr,
    pub span: Span,
}

/// `{% set name | filters %}body{% endset %}`.
#[derive(Debug, Clone, PartialEq)]
pub struct SetBlockStmt {
    pub name: Ident,
    pub filters: Vec<FilterCall>,
    pub body: Sequence,
    pub span: Span,
}

/// A macro parameter with its optional default, evaluated on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroParam {
    pub name: Ident,
    pub default: Option<Expr>,
}

/// The definition shared by a macro statement and every macro value made from it.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDef {
    pub name: Ident,
    pub params: Vec<MacroParam>,
    pub body: Sequence,
    /// The body reads `varargs`, so surplus positional arguments are accepted.
    pub catch_varargs: bool,
    /// The body reads `kwargs`, so unknown named arguments are accepted.
    pub catch_kwargs: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacroStmt {
    pub def: Arc<MacroDef>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterBlockStmt {
    pub filters: Vec<FilterCall>,
    pub body: Sequence,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationStmt {
    pub body: Sequence,
    pub span: Span,
}
