//! Source locations inside template text.
//!
//! Every segment, token and AST node carries a [`Span`] so that syntax and
//! render errors can point back at the template source.

use std::fmt;

/// A region of template source, identified by where it starts.
///
/// `line` and `col` are 1-indexed; `col` counts characters, not bytes, so
/// carets line up under non-ASCII text. `len` is the length in characters
/// and is only used for diagnostics.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, in characters).
    pub col: u32,
    /// Length in characters.
    pub len: u32,
}

impl Span {
    /// Create a new span from a line, column, and length.
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Create a zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    /// Whether this span is empty (zero length).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The length of this span in characters.
    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Extend `self` so that it also covers `other`.
    ///
    /// Only spans on the same line are merged precisely; a span that
    /// continues on a later line keeps its start and grows by the other length.
    #[inline]
    pub fn merge(self, other: Span) -> Span {
        if self.line != other.line {
            let (first, second) = if self.line < other.line { (self, other) } else { (other, self) };
            return Span {
                line: first.line,
                col: first.col,
                len: first.len + second.len,
            };
        }
        let start = self.col.min(other.col);
        let end = (self.col + self.len).max(other.col + other.len);
        Span {
            line: self.line,
            col: start,
            len: end - start,
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_is_empty() {
        assert!(Span::point(2, 7).is_empty());
        assert!(!Span::new(2, 7, 3).is_empty());
    }

    #[test]
    fn display_names_line_and_column() {
        assert_eq!(Span::new(3, 15, 5).to_string(), "line 3, column 15");
        assert_eq!(format!("{:?}", Span::new(3, 15, 5)), "3:15");
    }

    #[test]
    fn merge_on_one_line_covers_both() {
        let tag = Span::new(1, 4, 2);
        let expr = Span::new(1, 10, 6);
        let merged = tag.merge(expr);
        assert_eq!(merged, Span::new(1, 4, 12));
        assert_eq!(expr.merge(tag), merged);
    }

    #[test]
    fn merge_across_lines_keeps_earliest_start() {
        let open = Span::new(2, 3, 8);
        let close = Span::new(5, 1, 11);
        assert_eq!(close.merge(open), Span::new(2, 3, 19));
    }
}
