//! Expression AST nodes.
//!
//! Provides nodes for every expression form of the template language:
//! - Literals and names
//! - Unary, binary and conditional operations
//! - Container displays (lists, tuples, dicts)
//! - Postfix access (index, slice, attribute, method and function calls)
//! - Filter applications and `is` tests
//!
//! Nodes own their children so a parsed template can be shared across
//! threads and rendered any number of times.

use crate::ast::{BinaryOp, UnaryOp};
use prompt_jinja_core::Span;

/// A name with its location: variables, attributes, filters, parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    Literal(LiteralExpr),
    /// Variable reference
    Ident(Ident),
    /// Unary prefix operation
    Unary(Box<UnaryExpr>),
    /// Binary operation
    Binary(Box<BinaryExpr>),
    /// Chained comparison `a < b < c`
    Compare(Box<CompareExpr>),
    /// Conditional `x if c else y`
    Ternary(Box<TernaryExpr>),
    /// List display `[a, b]`
    Array(ArrayExpr),
    /// Tuple display `(a, b)`
    Tuple(ArrayExpr),
    /// Dict display `{k: v}`
    Object(ObjectExpr),
    /// Subscript `x[i]`, also `x.0`
    Index(Box<IndexExpr>),
    /// Slice `x[a:b:c]`
    Slice(Box<SliceExpr>),
    /// Attribute access `x.name`
    Attribute(Box<AttributeExpr>),
    /// Method call `x.name(args)`
    MethodCall(Box<MethodCallExpr>),
    /// Call of any other callee `f(args)`
    Call(Box<CallExpr>),
    /// Filter application `x | name(args)`
    Filter(Box<FilterExpr>),
    /// Test `x is [not] name(args)`
    Test(Box<TestExpr>),
}

impl Expr {
    /// Get the span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Self::Literal(e) => e.span,
            Self::Ident(e) => e.span,
            Self::Unary(e) => e.span,
            Self::Binary(e) => e.span,
            Self::Compare(e) => e.span,
            Self::Ternary(e) => e.span,
            Self::Array(e) | Self::Tuple(e) => e.span,
            Self::Object(e) => e.span,
            Self::Index(e) => e.span,
            Self::Slice(e) => e.span,
            Self::Attribute(e) => e.span,
            Self::MethodCall(e) => e.span,
            Self::Call(e) => e.span,
            Self::Filter(e) => e.span,
            Self::Test(e) => e.span,
        }
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralExpr {
    /// The literal kind
    pub kind: LiteralKind,
    /// Source location
    pub span: Span,
}

/// The kind of literal.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralKind {
    /// `none` / `None`
    None,
    /// `true` / `True` / `false` / `False`
    Bool(bool),
    Int(i64),
    Float(f64),
    /// String with escapes already decoded.
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub left: Expr,
    pub op: BinaryOp,
    pub right: Expr,
    pub span: Span,
}

/// Two or more comparisons sharing their middle operands.
///
/// `a < b < c` means `a < b and b < c` with `b` evaluated once. A single
/// comparison stays a [`BinaryExpr`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompareExpr {
    pub left: Expr,
    pub links: Vec<(BinaryOp, Expr)>,
    pub span: Span,
}

/// A conditional expression.
///
/// Without an `else` the expression evaluates to undefined when the
/// condition is false.
#[derive(Debug, Clone, PartialEq)]
pub struct TernaryExpr {
    pub then: Expr,
    pub condition: Expr,
    pub otherwise: Option<Expr>,
    pub span: Span,
}

/// Items of a list or tuple display.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpr {
    pub items: Vec<Expr>,
    pub span: Span,
}

/// Key/value pairs of a dict display, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectExpr {
    pub entries: Vec<(Expr, Expr)>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
    pub object: Expr,
    pub index: Expr,
    pub span: Span,
}

/// A Python slice; omitted bounds are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceExpr {
    pub object: Expr,
    pub start: Option<Expr>,
    pub stop: Option<Expr>,
    pub step: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeExpr {
    pub object: Expr,
    pub name: Ident,
    pub span: Span,
}

/// `object.method(args)`.
///
/// Kept apart from [`CallExpr`] so that the evaluator can fall back to the
/// built-in method catalog when the object has no such key.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCallExpr {
    pub object: Expr,
    pub method: Ident,
    pub args: Vec<Argument>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Expr,
    pub args: Vec<Argument>,
    pub span: Span,
}

/// One argument in a call, filter or test argument list.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// `expr`
    Positional(Expr),
    /// `name=expr`
    Named(Ident, Expr),
    /// `*expr`, spreading a sequence into positional arguments
    Splat(Expr),
    /// `**expr`, spreading a mapping into named arguments
    KwSplat(Expr),
}

/// A filter name and its arguments, as written after `|` or in `{% filter %}`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: Ident,
    pub args: Vec<Argument>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr {
    pub input: Expr,
    pub filter: FilterCall,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestExpr {
    pub subject: Expr,
    pub name: Ident,
    pub negated: bool,
    pub args: Vec<Argument>,
    pub span: Span,
}
