//! Operator definitions for template expressions.
//!
//! Provides the binary and unary operator enums along with the binding
//! powers the Pratt parser uses. Precedence, lowest first:
//!
//! | level | operators                                 |
//! |-------|-------------------------------------------|
//! | 1     | `x if c else y` (handled outside Pratt)   |
//! | 2     | `or`                                      |
//! | 3     | `and`                                     |
//! | 4     | `not` (prefix)                            |
//! | 5     | `== != < <= > >= in not in`               |
//! | 6     | `+ -`                                     |
//! | 7     | `~`                                       |
//! | 8     | `* / // %`                                |
//! | 9     | `**`                                      |
//! | 10    | unary `- +`, postfix, filters and tests   |

use crate::lexer::{Token, TokenKind};
use std::fmt;

/// Binding power of the prefix `not` operator.
pub const NOT_BINDING_POWER: u8 = 7;

/// Binary operators, organized by precedence from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `or`
    Or,
    /// `and`
    And,

    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `in`
    In,
    /// `not in`
    NotIn,

    /// `+`
    Add,
    /// `-`
    Sub,

    /// `~`
    Concat,

    /// `*`
    Mul,
    /// `/`
    Div,
    /// `//`
    FloorDiv,
    /// `%`
    Mod,

    /// `**`
    Pow,
}

impl BinaryOp {
    /// Get the binding power (precedence) for this operator.
    ///
    /// Higher values bind more tightly. Returns (left_bp, right_bp). Every
    /// operator is left-associative, `**` included.
    pub fn binding_power(&self) -> (u8, u8) {
        use BinaryOp::*;
        match self {
            Or => (3, 4),
            And => (5, 6),
            Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual | In | NotIn => (9, 10),
            Add | Sub => (11, 12),
            Concat => (13, 14),
            Mul | Div | FloorDiv | Mod => (15, 16),
            Pow => (17, 18),
        }
    }

    /// Try to read a binary operator from the next tokens.
    ///
    /// Returns the operator and how many tokens it spans (`not in` is two).
    pub fn from_tokens(token: &Token, next: Option<&Token>) -> Option<(Self, usize)> {
        use TokenKind::*;

        let op = match token.kind {
            Ident => {
                return match token.text.as_str() {
                    "or" => Some((BinaryOp::Or, 1)),
                    "and" => Some((BinaryOp::And, 1)),
                    "in" => Some((BinaryOp::In, 1)),
                    "not" if next.is_some_and(|t| t.is_keyword("in")) => Some((BinaryOp::NotIn, 2)),
                    _ => None,
                };
            }
            EqualEqual => BinaryOp::Equal,
            BangEqual => BinaryOp::NotEqual,
            Less => BinaryOp::Less,
            LessEqual => BinaryOp::LessEqual,
            Greater => BinaryOp::Greater,
            GreaterEqual => BinaryOp::GreaterEqual,
            Plus => BinaryOp::Add,
            Minus => BinaryOp::Sub,
            TokenKind::Tilde => BinaryOp::Concat,
            Star => BinaryOp::Mul,
            Slash => BinaryOp::Div,
            SlashSlash => BinaryOp::FloorDiv,
            Percent => BinaryOp::Mod,
            StarStar => BinaryOp::Pow,
            _ => return None,
        };
        Some((op, 1))
    }

    /// Check if this operator is comparison-related.
    pub fn is_comparison(&self) -> bool {
        use BinaryOp::*;
        matches!(
            self,
            Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual | In | NotIn
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOp::*;
        let s = match self {
            Or => "or",
            And => "and",
            Equal => "==",
            NotEqual => "!=",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            In => "in",
            NotIn => "not in",
            Add => "+",
            Sub => "-",
            Concat => "~",
            Mul => "*",
            Div => "/",
            FloorDiv => "//",
            Mod => "%",
            Pow => "**",
        };
        f.write_str(s)
    }
}

/// Unary prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `not`
    Not,
    /// `-` negation
    Neg,
    /// `+` plus (unary)
    Plus,
}

impl UnaryOp {
    /// Try to convert a token to an arithmetic prefix operator.
    ///
    /// `not` is excluded: it sits at its own precedence level.
    pub fn from_token(token: TokenKind) -> Option<Self> {
        match token {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Plus),
            _ => None,
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Not => "not",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompt_jinja_core::Span;

    fn tok(kind: TokenKind, text: &str) -> Token {
        Token::new(kind, text, Span::default())
    }

    #[test]
    fn not_in_spans_two_tokens() {
        let not = tok(TokenKind::Ident, "not");
        let in_ = tok(TokenKind::Ident, "in");
        assert_eq!(BinaryOp::from_tokens(&not, Some(&in_)), Some((BinaryOp::NotIn, 2)));
        assert_eq!(BinaryOp::from_tokens(&not, None), None);
    }

    #[test]
    fn concat_binds_between_additive_and_multiplicative() {
        let (add, _) = BinaryOp::Add.binding_power();
        let (concat, _) = BinaryOp::Concat.binding_power();
        let (mul, _) = BinaryOp::Mul.binding_power();
        assert!(add < concat && concat < mul);
    }

    #[test]
    fn not_sits_between_and_and_comparisons() {
        assert!(BinaryOp::And.binding_power().1 < NOT_BINDING_POWER);
        assert!(NOT_BINDING_POWER < BinaryOp::Equal.binding_power().0);
    }

    #[test]
    fn comparisons() {
        assert!(BinaryOp::NotIn.is_comparison());
        assert!(!BinaryOp::Concat.is_comparison());
        assert_eq!(BinaryOp::NotIn.to_string(), "not in");
    }
}
