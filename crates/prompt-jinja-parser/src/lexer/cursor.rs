//! Low-level character cursor with position tracking.

use prompt_jinja_core::Span;

/// A cursor over source text that tracks position.
///
/// Provides peek/advance access to characters while keeping the byte
/// offset, the line and the character column up to date. A cursor can
/// start at an arbitrary origin so that the body of a tag is scanned with
/// positions relative to the whole template.
#[derive(Clone)]
pub struct Cursor<'src> {
    /// The text being scanned.
    source: &'src str,
    /// Current byte offset into `source`.
    offset: usize,
    /// Current line number (1-indexed).
    line: u32,
    /// Current column number (1-indexed, in characters).
    column: u32,
}

impl<'src> Cursor<'src> {
    /// Create a new cursor at the start of a template.
    pub fn new(source: &'src str) -> Self {
        Self::with_origin(source, 1, 1)
    }

    /// Create a cursor whose first character sits at `line:column`.
    pub fn with_origin(source: &'src str, line: u32, column: u32) -> Self {
        Self {
            source,
            offset: 0,
            line,
            column,
        }
    }

    /// Get the full text being scanned.
    #[inline]
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// The text not yet consumed.
    #[inline]
    pub fn rest(&self) -> &'src str {
        &self.source[self.offset..]
    }

    /// Current byte offset into the text.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Zero-length span at the current position.
    #[inline]
    pub fn position(&self) -> Span {
        Span::point(self.line, self.column)
    }

    /// Span from `start` (a previous [`position`](Self::position)) to here.
    ///
    /// Multi-line regions report their length in characters consumed.
    pub fn span_from(&self, start: Span, start_offset: usize) -> Span {
        let len = self.source[start_offset..self.offset].chars().count() as u32;
        Span::new(start.line, start.col, len)
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.offset >= self.source.len()
    }

    /// Peek at the current character without consuming it.
    #[inline]
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Peek at the nth character ahead (0 = current).
    #[inline]
    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    /// Check if the current character satisfies a predicate.
    #[inline]
    pub fn check(&self, f: impl Fn(char) -> bool) -> bool {
        self.peek().is_some_and(f)
    }

    /// Check if the upcoming text starts with `s`.
    #[inline]
    pub fn check_str(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    /// Consume the current character, updating line and column.
    pub fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Advance over the next `n` bytes, which must end on a character boundary.
    pub fn advance_bytes(&mut self, n: usize) {
        debug_assert!(self.rest().is_char_boundary(n));
        let end = self.offset + n;
        while self.offset < end {
            self.advance();
        }
    }

    /// Consume if the current character matches.
    #[inline]
    pub fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume characters while the predicate matches, returning the consumed slice.
    pub fn eat_while(&mut self, f: impl Fn(char) -> bool) -> &'src str {
        let start = self.offset;
        while self.check(&f) {
            self.advance();
        }
        &self.source[start..self.offset]
    }

    /// Slice of source from a starting offset to the current position.
    #[inline]
    pub fn slice_from(&self, start: usize) -> &'src str {
        &self.source[start..self.offset]
    }
}

/// Check if a character can start an identifier.
#[inline]
pub fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Check if a character can continue an identifier.
#[inline]
pub fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
