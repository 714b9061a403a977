//! Token types produced by the expression tokenizer.

use prompt_jinja_core::Span;
use std::fmt;

/// A token from the body of an expression or statement tag.
///
/// Keywords are not separate kinds: `and`, `in`, `endfor` and friends are
/// [`TokenKind::Ident`] tokens that the parser recognizes by context, so
/// they stay usable as attribute names (`loop.last`, `msg.if`).
#[derive(Clone, PartialEq)]
pub struct Token {
    /// The type of token.
    pub kind: TokenKind,
    /// Source text of the token; the decoded value for string literals.
    pub text: String,
    /// Location in the template.
    pub span: Span,
}

impl Token {
    /// Create a new token.
    #[inline]
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    /// Whether this token is the identifier `word`.
    #[inline]
    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == word
    }

    /// Human-readable description used in error messages.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of tag".to_string(),
            TokenKind::String => format!("string {:?}", self.text),
            _ => format!("'{}'", self.text),
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {:?})", self.kind, self.text, self.span)
    }
}

/// All token types of the expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // =========================================
    // Literals and names
    // =========================================
    /// Identifier or keyword: `name`, `loop`, `and`
    Ident,
    /// Integer literal: `42`, `1_000`
    Int,
    /// Float literal: `3.14`, `1e10`
    Float,
    /// String literal: `'a'`, `"b"`
    String,

    // =========================================
    // Operators
    // =========================================
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `**`
    StarStar,
    /// `/`
    Slash,
    /// `//`
    SlashSlash,
    /// `%`
    Percent,
    /// `~`
    Tilde,
    /// `|`
    Pipe,
    /// `=`
    Assign,
    /// `==`
    EqualEqual,
    /// `!=`
    BangEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,

    // =========================================
    // Delimiters
    // =========================================
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,

    /// End of the tag body.
    Eof,
}

impl TokenKind {
    /// The fixed spelling of punctuation tokens.
    pub fn as_str(&self) -> &'static str {
        use TokenKind::*;
        match self {
            Ident => "identifier",
            Int => "integer",
            Float => "float",
            String => "string",
            Plus => "+",
            Minus => "-",
            Star => "*",
            StarStar => "**",
            Slash => "/",
            SlashSlash => "//",
            Percent => "%",
            Tilde => "~",
            Pipe => "|",
            Assign => "=",
            EqualEqual => "==",
            BangEqual => "!=",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            Dot => ".",
            Comma => ",",
            Colon => ":",
            LeftParen => "(",
            RightParen => ")",
            LeftBracket => "[",
            RightBracket => "]",
            LeftBrace => "{",
            RightBrace => "}",
            Eof => "end of tag",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
