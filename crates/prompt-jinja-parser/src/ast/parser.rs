//! The parser state shared by expression and statement parsing.
//!
//! The [`Parser`] walks the lexer's segments one at a time. When it reaches
//! an expression or statement tag it tokenizes the tag body and parses it
//! with the token helpers below; the expression grammar lives in
//! `expr_parser.rs` and the block structure in `stmt_parser.rs`.

use prompt_jinja_core::{Options, Span, SyntaxError, SyntaxErrorKind};

use crate::ast::expr::{Expr, Ident};
use crate::ast::stmt::Sequence;
use crate::lexer::{self, Segment, Token, TokenKind, Tokenizer};

/// Maximum nesting of blocks and sub-expressions in one template.
pub const MAX_NESTING: usize = 64;

/// Recursive-descent parser over template segments.
pub struct Parser {
    /// Remaining segments of the template.
    segments: std::vec::IntoIter<Segment>,
    /// Tokens of the tag currently being parsed, always ending with `Eof`.
    tokens: Vec<Token>,
    /// Index of the next token in `tokens`.
    pos: usize,
    /// Current nesting of blocks and expressions.
    depth: usize,
    /// Implicit arguments read by each macro body being parsed, innermost last.
    macro_scopes: Vec<ImplicitArgs>,
}

/// Which of the implicit `varargs` / `kwargs` names a macro body reads.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ImplicitArgs {
    pub varargs: bool,
    pub kwargs: bool,
}

impl Parser {
    /// Parse a whole template into its root sequence.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn parse(source: &str, options: &Options) -> Result<Sequence, SyntaxError> {
        let segments = lexer::lex(source, options)?;
        let mut parser = Parser::new(segments);
        let (body, _) = parser.parse_sequence(&[], Span::point(1, 1))?;
        Ok(body)
    }

    /// Parse a standalone expression, as written inside `{{ }}`.
    pub fn parse_expression_source(source: &str) -> Result<Expr, SyntaxError> {
        let mut parser = Parser::new(Vec::new());
        parser.load_tokens(source, Span::point(1, 1))?;
        let expr = parser.parse_expression()?;
        parser.expect_end()?;
        Ok(expr)
    }

    pub(crate) fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments: segments.into_iter(),
            tokens: vec![Token::new(TokenKind::Eof, "", Span::point(1, 1))],
            pos: 0,
            depth: 0,
            macro_scopes: Vec::new(),
        }
    }

    pub(crate) fn next_segment(&mut self) -> Option<Segment> {
        self.segments.next()
    }

    /// Tokenize a tag body and make it the current token stream.
    pub(crate) fn load_tokens(&mut self, body: &str, start: Span) -> Result<(), SyntaxError> {
        self.tokens = Tokenizer::new(body, start).tokenize()?;
        self.pos = 0;
        Ok(())
    }

    // =========================================
    // Token helpers
    // =========================================

    /// The next token without consuming it.
    #[inline]
    pub(crate) fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    /// The token `n` positions ahead; the trailing `Eof` repeats forever.
    #[inline]
    pub(crate) fn peek_nth(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    /// The most recently consumed token.
    #[inline]
    pub(crate) fn peek_back(&self) -> &Token {
        &self.tokens[self.pos.saturating_sub(1)]
    }

    /// Consume and return the next token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    #[inline]
    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    #[inline]
    pub(crate) fn check_keyword(&self, word: &str) -> bool {
        self.peek().is_keyword(word)
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) { Some(self.advance()) } else { None }
    }

    pub(crate) fn eat_keyword(&mut self, word: &str) -> bool {
        if self.check_keyword(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a token of `kind` or fail with an `Expected` error.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_expected(&format!("'{kind}'")))
        }
    }

    pub(crate) fn expect_keyword(&mut self, word: &str) -> Result<(), SyntaxError> {
        if self.eat_keyword(word) {
            Ok(())
        } else {
            Err(self.error_expected(&format!("'{word}'")))
        }
    }

    /// Consume an identifier, described as `what` in the error message.
    pub(crate) fn expect_ident(&mut self, what: &str) -> Result<Ident, SyntaxError> {
        if self.check(TokenKind::Ident) {
            let token = self.advance();
            Ok(Ident::new(token.text, token.span))
        } else {
            Err(self.error_expected(what))
        }
    }

    /// Require that the whole tag body has been consumed.
    pub(crate) fn expect_end(&mut self) -> Result<(), SyntaxError> {
        if self.check(TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.error_expected("end of tag"))
        }
    }

    pub(crate) fn error_expected(&self, expected: &str) -> SyntaxError {
        let found = self.peek();
        SyntaxError::expected(found.span, expected, &found.describe())
    }

    // =========================================
    // Macro scopes
    // =========================================

    /// Run `f` over a macro body, reporting the implicit arguments it reads.
    pub(crate) fn in_macro_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<(T, ImplicitArgs), SyntaxError> {
        self.macro_scopes.push(ImplicitArgs::default());
        let result = f(self);
        let implicit = self.macro_scopes.pop().unwrap_or_default();
        Ok((result?, implicit))
    }

    /// Record a name read by an expression. Nested macros count for every
    /// enclosing macro too.
    pub(crate) fn note_name(&mut self, name: &str) {
        for scope in &mut self.macro_scopes {
            match name {
                "varargs" => scope.varargs = true,
                "kwargs" => scope.kwargs = true,
                _ => {}
            }
        }
    }

    // =========================================
    // Nesting guard
    // =========================================

    pub(crate) fn enter(&mut self, span: Span) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(SyntaxError::new(
                SyntaxErrorKind::TooDeep,
                span,
                "Template nesting too deep",
            ));
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Run `f` one nesting level deeper.
    pub(crate) fn nested<T>(
        &mut self,
        span: Span,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        self.enter(span)?;
        let result = f(self);
        self.leave();
        result
    }

    /// Run `f` over a left-to-right chain such as `a + b + c` or `x.a.b`.
    ///
    /// Each link `f` takes through [`Parser::link`] counts as one nesting
    /// level until the chain is finished, so the tree it builds stays within
    /// [`MAX_NESTING`].
    pub(crate) fn chained<T>(
        &mut self,
        f: impl FnOnce(&mut Self, &mut usize) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        let mut links = 0;
        let result = f(self, &mut links);
        self.depth -= links;
        result
    }

    pub(crate) fn link(&mut self, links: &mut usize, span: Span) -> Result<(), SyntaxError> {
        *links += 1;
        self.enter(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_past_end_stays_on_eof() {
        let mut parser = Parser::new(Vec::new());
        parser.load_tokens("a", Span::point(1, 1)).unwrap();
        assert_eq!(parser.advance().text, "a");
        assert_eq!(parser.advance().kind, TokenKind::Eof);
        assert_eq!(parser.peek_nth(5).kind, TokenKind::Eof);
    }

    #[test]
    fn expect_reports_what_was_found() {
        let mut parser = Parser::new(Vec::new());
        parser.load_tokens("a b", Span::point(1, 1)).unwrap();
        parser.advance();
        let err = parser.expect_end().unwrap_err();
        assert_eq!(err.message, "Expected end of tag, found 'b'");
        assert_eq!(err.span, Span::new(1, 3, 1));
    }

    #[test]
    fn nesting_limit() {
        let mut parser = Parser::new(Vec::new());
        for _ in 0..MAX_NESTING {
            parser.enter(Span::default()).unwrap();
        }
        let err = parser.enter(Span::default()).unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::TooDeep);
    }

    #[test]
    fn chain_links_are_released_when_the_chain_ends() {
        let mut parser = Parser::new(Vec::new());
        parser
            .chained(|p, links| {
                for _ in 0..MAX_NESTING {
                    p.link(links, Span::default())?;
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(parser.depth, 0);
        let err = parser
            .chained(|p, links| {
                for _ in 0..=MAX_NESTING {
                    p.link(links, Span::default())?;
                }
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::TooDeep);
        assert_eq!(parser.depth, 0);
    }
}
