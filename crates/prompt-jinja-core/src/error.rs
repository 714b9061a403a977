//! Error types for every phase of template processing.
//!
//! ## Error Hierarchy
//!
//! ```text
//! Error (top-level wrapper)
//! ├── SyntaxError  - compile time: lexing and parsing
//! └── RenderError  - render time: name, type, key, index, value,
//!                    structural, recursion and user-raised failures
//! ```
//!
//! A template that compiled successfully never produces a [`SyntaxError`]
//! again; everything that goes wrong while rendering is a [`RenderError`].

use std::fmt;

use thiserror::Error;

use crate::Span;

// ============================================================================
// Syntax Errors
// ============================================================================

/// Categories of syntax errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxErrorKind {
    /// A tag, comment, string or block construct was never closed.
    Unterminated,
    /// A token or block keyword appeared where it is not allowed.
    Unexpected,
    /// A specific token or construct was required but not found.
    Expected,
    /// A literal could not be decoded.
    InvalidLiteral,
    /// A statement tag starts with an unknown keyword.
    UnknownStatement,
    /// Blocks or brackets are nested beyond the parser's limit.
    TooDeep,
}

impl SyntaxErrorKind {
    /// Returns a human-readable name for this error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyntaxErrorKind::Unterminated => "unterminated construct",
            SyntaxErrorKind::Unexpected => "unexpected token",
            SyntaxErrorKind::Expected => "expected token",
            SyntaxErrorKind::InvalidLiteral => "invalid literal",
            SyntaxErrorKind::UnknownStatement => "unknown statement",
            SyntaxErrorKind::TooDeep => "nesting too deep",
        }
    }
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A malformed template, reported with the location of the offending text.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at {span}")]
pub struct SyntaxError {
    /// The category of this error.
    pub kind: SyntaxErrorKind,
    /// Where in the template source the problem was found.
    pub span: Span,
    /// A detailed error message.
    pub message: String,
}

impl SyntaxError {
    /// Create a new syntax error.
    pub fn new(kind: SyntaxErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// A block or tag that was opened and never closed, e.g. `Unterminated if`.
    pub fn unterminated(span: Span, construct: &str) -> Self {
        Self::new(
            SyntaxErrorKind::Unterminated,
            span,
            format!("Unterminated {construct}"),
        )
    }

    /// A keyword or token that does not belong here, e.g. `Unexpected endif`.
    pub fn unexpected(span: Span, what: &str) -> Self {
        Self::new(SyntaxErrorKind::Unexpected, span, format!("Unexpected {what}"))
    }

    /// A required token was missing.
    pub fn expected(span: Span, expected: &str, found: &str) -> Self {
        Self::new(
            SyntaxErrorKind::Expected,
            span,
            format!("Expected {expected}, found {found}"),
        )
    }

    /// Format the error with source context for display.
    ///
    /// Shows the offending source line with a caret under the error location.
    pub fn display_with_source(&self, source: &str) -> String {
        let mut output = format!(
            "Error at {}:{}: {}\n  {}\n",
            self.span.line, self.span.col, self.kind, self.message
        );

        let Some(line_text) = source.lines().nth(self.span.line.saturating_sub(1) as usize) else {
            return output;
        };
        output.push_str("  |\n");
        output.push_str(&format!("{:>3} | {}\n", self.span.line, line_text));
        let indent = " ".repeat(self.span.col.saturating_sub(1) as usize);
        let pointer = if self.span.len <= 1 {
            "^".to_string()
        } else {
            format!("^{}", "~".repeat((self.span.len - 1) as usize))
        };
        output.push_str(&format!("  | {indent}{pointer}\n"));
        output
    }
}

// ============================================================================
// Render Errors
// ============================================================================

/// Categories of render-time failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderErrorKind {
    /// Unknown identifier in strict mode, unknown filter or test.
    Name,
    /// Illegal operand combination or value that cannot be output.
    Type,
    /// Missing key through a strict accessor.
    Key,
    /// Out-of-range index through a strict accessor.
    Index,
    /// Right type, wrong value: popping an empty list, zero slice step, ...
    Value,
    /// `break` / `continue` outside of a loop.
    Structural,
    /// The recursion-depth guard was exceeded.
    Recursion,
    /// Raised explicitly by the template through `raise_exception`.
    UserRaised,
}

impl RenderErrorKind {
    /// The Python-style exception name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderErrorKind::Name => "NameError",
            RenderErrorKind::Type => "TypeError",
            RenderErrorKind::Key => "KeyError",
            RenderErrorKind::Index => "IndexError",
            RenderErrorKind::Value => "ValueError",
            RenderErrorKind::Structural => "StructuralError",
            RenderErrorKind::Recursion => "RecursionError",
            RenderErrorKind::UserRaised => "TemplateError",
        }
    }
}

impl fmt::Display for RenderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure while rendering a compiled template.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderError {
    /// The category of this error.
    pub kind: RenderErrorKind,
    /// A detailed error message.
    pub message: String,
    /// The innermost template location known to have caused the error.
    pub span: Option<Span>,
}

impl RenderError {
    /// Create a new render error without a location.
    pub fn new(kind: RenderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
        }
    }

    pub fn name(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Name, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Type, message)
    }

    pub fn key(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Key, message)
    }

    pub fn index(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Index, message)
    }

    pub fn value(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Value, message)
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Structural, message)
    }

    pub fn recursion(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Recursion, message)
    }

    pub fn user(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::UserRaised, message)
    }

    /// Attach a location unless a more precise one is already recorded.
    pub fn with_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(span) = self.span {
            write!(f, " at {span}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RenderError {}

/// Convenience alias for render-time results.
pub type RenderResult<T> = Result<T, RenderError>;

// ============================================================================
// Unified Error
// ============================================================================

/// Any error the engine can produce, for callers that compile and render in one go.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl Error {
    /// The location of the error, if known.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Syntax(e) => Some(e.span),
            Error::Render(e) => e.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unterminated_message_names_construct() {
        let err = SyntaxError::unterminated(Span::new(1, 1, 10), "if");
        assert_eq!(err.kind, SyntaxErrorKind::Unterminated);
        assert_eq!(err.to_string(), "Unterminated if at line 1, column 1");
    }

    #[test]
    fn display_with_source_points_at_column() {
        let err = SyntaxError::unexpected(Span::new(2, 3, 10), "endfor");
        let rendered = err.display_with_source("ok\n  {% endfor %}\n");
        assert!(rendered.contains("Unexpected endfor"));
        assert!(rendered.contains("  2 |   {% endfor %}"));
        assert!(rendered.contains("  |   ^~~~~~~~~~"));
    }

    #[test]
    fn render_error_keeps_innermost_span() {
        let err = RenderError::value("pop from empty list")
            .with_span(Span::point(1, 9))
            .with_span(Span::point(1, 1));
        assert_eq!(err.span, Some(Span::point(1, 9)));
        assert_eq!(err.to_string(), "ValueError: pop from empty list at line 1, column 9");
    }

    #[test]
    fn unified_error_converts_from_both_phases() {
        let syntax: Error = SyntaxError::unexpected(Span::point(1, 1), "else").into();
        let render: Error = RenderError::structural("break outside of a loop").into();
        assert_eq!(syntax.span(), Some(Span::point(1, 1)));
        assert_eq!(render.span(), None);
        assert_eq!(render.to_string(), "StructuralError: break outside of a loop");
    }
}
