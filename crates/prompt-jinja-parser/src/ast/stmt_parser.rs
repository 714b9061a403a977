//! Statement and block parsing.
//!
//! Blocks are parsed by [`Parser::parse_sequence`], which collects statements
//! until it meets one of the keywords the enclosing construct is waiting for
//! (`elif`, `else`, `endfor`, ...). Reaching the end of the template instead
//! makes the construct `Unterminated`; meeting a closing keyword that nobody
//! is waiting for makes it `Unexpected`.

use std::sync::Arc;

use super::parser::Parser;
use crate::ast::expr::{FilterCall, Ident};
use crate::ast::stmt::*;
use crate::lexer::{Segment, TagKind, TokenKind};
use prompt_jinja_core::{Span, SyntaxError, SyntaxErrorKind};

/// Keywords that only make sense inside a block opened earlier.
const CLOSING_KEYWORDS: &[&str] = &[
    "elif",
    "else",
    "endif",
    "endfor",
    "endset",
    "endmacro",
    "endfilter",
    "endgeneration",
];

/// The statement tag that ended a sequence.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StopTag {
    pub keyword: String,
    pub span: Span,
}

impl Parser {
    /// Parse statements until a tag starting with one of `stops`, or the end
    /// of the template.
    ///
    /// When a stop tag is found its keyword has been consumed and the rest of
    /// its tokens are still loaded for the caller.
    pub(crate) fn parse_sequence(
        &mut self,
        stops: &[&str],
        span: Span,
    ) -> Result<(Sequence, Option<StopTag>), SyntaxError> {
        let mut stmts = Vec::new();

        while let Some(segment) = self.next_segment() {
            match segment {
                Segment::Text { text, span: text_span } => {
                    stmts.push(Stmt::Text(TextStmt { text, span: text_span }))
                }
                Segment::Tag {
                    kind: TagKind::Statement,
                    body,
                    span: tag_span,
                    body_start,
                } => {
                    self.load_tokens(&body, body_start)?;
                    let keyword = self.expect_ident("statement keyword")?;
                    if stops.contains(&keyword.name.as_str()) {
                        let stop = StopTag {
                            keyword: keyword.name,
                            span: tag_span,
                        };
                        return Ok((Sequence::new(stmts, span), Some(stop)));
                    }
                    stmts.push(self.parse_statement(keyword, tag_span)?);
                }
                Segment::Tag {
                    body,
                    span: tag_span,
                    body_start,
                    ..
                } => {
                    self.load_tokens(&body, body_start)?;
                    let expr = self.parse_expression()?;
                    self.expect_end()?;
                    stmts.push(Stmt::Output(OutputStmt { expr, span: tag_span }));
                }
            }
        }

        Ok((Sequence::new(stmts, span), None))
    }

    /// Parse the statement introduced by `keyword`.
    fn parse_statement(&mut self, keyword: Ident, span: Span) -> Result<Stmt, SyntaxError> {
        match keyword.name.as_str() {
            "if" => self.nested(span, |p| p.parse_if(span)),
            "for" => self.nested(span, |p| p.parse_for(span)),
            "set" => self.nested(span, |p| p.parse_set(span)),
            "macro" => self.nested(span, |p| p.parse_macro(span)),
            "filter" => self.nested(span, |p| p.parse_filter_block(span)),
            "generation" => self.nested(span, |p| p.parse_generation(span)),
            "break" => {
                self.expect_end()?;
                Ok(Stmt::Break(span))
            }
            "continue" => {
                self.expect_end()?;
                Ok(Stmt::Continue(span))
            }
            word if CLOSING_KEYWORDS.contains(&word) => Err(SyntaxError::unexpected(span, word)),
            word => Err(SyntaxError::new(
                SyntaxErrorKind::UnknownStatement,
                keyword.span,
                format!("Unknown statement '{word}'"),
            )),
        }
    }

    /// Parse a block body that must end with `end`.
    fn parse_block_body(&mut self, end: &str, construct: &str, open: Span) -> Result<Sequence, SyntaxError> {
        match self.parse_sequence(&[end], open)? {
            (body, Some(_)) => {
                self.expect_end()?;
                Ok(body)
            }
            (_, None) => Err(SyntaxError::unterminated(open, construct)),
        }
    }

    // =========================================
    // Control flow
    // =========================================

    /// `if cond` ... `elif cond` ... `else` ... `endif`.
    fn parse_if(&mut self, span: Span) -> Result<Stmt, SyntaxError> {
        const STOPS: &[&str] = &["elif", "else", "endif"];

        let mut branches = Vec::new();
        let mut else_body = None;
        let mut condition = self.parse_expression()?;
        self.expect_end()?;

        loop {
            let (body, stop) = self.parse_sequence(STOPS, span)?;
            branches.push(IfBranch { condition, body });
            let Some(stop) = stop else {
                return Err(SyntaxError::unterminated(span, "if"));
            };
            match stop.keyword.as_str() {
                "elif" => {
                    condition = self.parse_expression()?;
                    self.expect_end()?;
                }
                "else" => {
                    self.expect_end()?;
                    let (body, stop) = self.parse_sequence(STOPS, stop.span)?;
                    // Anything but `endif` after `else` leaves the block open.
                    match stop {
                        Some(stop) if stop.keyword == "endif" => {
                            self.expect_end()?;
                            else_body = Some(body);
                            break;
                        }
                        _ => return Err(SyntaxError::unterminated(span, "if")),
                    }
                }
                _ => {
                    self.expect_end()?;
                    break;
                }
            }
        }

        Ok(Stmt::If(IfStmt {
            branches,
            else_body,
            span,
        }))
    }

    /// `for a[, b] in iterable [if cond]` ... [`else` ...] `endfor`.
    fn parse_for(&mut self, span: Span) -> Result<Stmt, SyntaxError> {
        let targets = self.parse_targets()?;
        self.expect_keyword("in")?;
        // No conditional expression here: a trailing `if` filters items.
        let iterable = self.parse_expr(0)?;
        let condition = if self.eat_keyword("if") {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect_end()?;

        let (body, stop) = self.parse_sequence(&["else", "endfor"], span)?;
        let else_body = match stop {
            None => return Err(SyntaxError::unterminated(span, "for")),
            Some(stop) if stop.keyword == "else" => {
                self.expect_end()?;
                Some(self.parse_block_body("endfor", "for", span)?)
            }
            Some(_) => {
                self.expect_end()?;
                None
            }
        };

        Ok(Stmt::For(ForStmt {
            targets,
            iterable,
            condition,
            body,
            else_body,
            span,
        }))
    }

    /// One or more comma-separated names, optionally parenthesized.
    fn parse_targets(&mut self) -> Result<Vec<Ident>, SyntaxError> {
        let parenthesized = self.eat(TokenKind::LeftParen).is_some();
        let mut targets = vec![self.expect_ident("variable name")?];
        while self.eat(TokenKind::Comma).is_some() {
            if !self.check(TokenKind::Ident) {
                break;
            }
            targets.push(self.expect_ident("variable name")?);
        }
        if parenthesized {
            self.expect(TokenKind::RightParen)?;
        }
        Ok(targets)
    }

    // =========================================
    // Assignment
    // =========================================

    /// `set x = v`, `set a, b = v`, `set ns.attr = v` or block `set x` ... `endset`.
    fn parse_set(&mut self, span: Span) -> Result<Stmt, SyntaxError> {
        if self.peek_nth(1).kind == TokenKind::Dot {
            let namespace = self.expect_ident("namespace name")?;
            self.expect(TokenKind::Dot)?;
            let attr = self.expect_ident("attribute name")?;
            self.expect(TokenKind::Assign)?;
            let value = self.parse_expression()?;
            self.expect_end()?;
            return Ok(Stmt::NamespaceSet(NamespaceSetStmt {
                namespace,
                attr,
                value,
                span,
            }));
        }

        let targets = self.parse_targets()?;
        if self.eat(TokenKind::Assign).is_some() {
            let value = self.parse_expression()?;
            self.expect_end()?;
            return Ok(Stmt::Set(SetStmt { targets, value, span }));
        }

        let [name] = <[Ident; 1]>::try_from(targets).map_err(|_| self.error_expected("'='"))?;
        let filters = if self.eat(TokenKind::Pipe).is_some() {
            self.parse_filter_block_chain()?
        } else {
            Vec::new()
        };
        self.expect_end()?;
        let body = self.parse_block_body("endset", "set", span)?;
        Ok(Stmt::SetBlock(SetBlockStmt {
            name,
            filters,
            body,
            span,
        }))
    }

    // =========================================
    // Macros and blocks
    // =========================================

    /// `macro name(a, b=default)` ... `endmacro`.
    fn parse_macro(&mut self, span: Span) -> Result<Stmt, SyntaxError> {
        let name = self.expect_ident("macro name")?;
        self.expect(TokenKind::LeftParen)?;
        let mut params = Vec::new();
        while !self.check(TokenKind::RightParen) {
            let param = self.expect_ident("parameter name")?;
            let default = if self.eat(TokenKind::Assign).is_some() {
                Some(self.parse_expression()?)
            } else {
                None
            };
            params.push(MacroParam { name: param, default });
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RightParen)?;
        self.expect_end()?;

        let (body, implicit) = self.in_macro_scope(|p| p.parse_block_body("endmacro", "macro", span))?;
        Ok(Stmt::Macro(MacroStmt {
            def: Arc::new(MacroDef {
                name,
                params,
                body,
                catch_varargs: implicit.varargs,
                catch_kwargs: implicit.kwargs,
            }),
            span,
        }))
    }

    /// `filter f1(args) | f2` ... `endfilter`.
    fn parse_filter_block(&mut self, span: Span) -> Result<Stmt, SyntaxError> {
        let filters = self.parse_filter_block_chain()?;
        self.expect_end()?;
        let body = self.parse_block_body("endfilter", "filter", span)?;
        Ok(Stmt::FilterBlock(FilterBlockStmt { filters, body, span }))
    }

    fn parse_filter_block_chain(&mut self) -> Result<Vec<FilterCall>, SyntaxError> {
        let mut filters = vec![self.parse_filter_call()?];
        while self.eat(TokenKind::Pipe).is_some() {
            filters.push(self.parse_filter_call()?);
        }
        Ok(filters)
    }

    /// `generation` ... `endgeneration`.
    fn parse_generation(&mut self, span: Span) -> Result<Stmt, SyntaxError> {
        self.expect_end()?;
        let body = self.parse_block_body("endgeneration", "generation", span)?;
        Ok(Stmt::Generation(GenerationStmt { body, span }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompt_jinja_core::Options;

    fn parse(source: &str) -> Sequence {
        Parser::parse(source, &Options::default()).unwrap()
    }

    fn parse_err(source: &str) -> SyntaxError {
        Parser::parse(source, &Options::default()).unwrap_err()
    }

    #[test]
    fn text_and_output() {
        let seq = parse("Hello {{ name }}!");
        assert_eq!(seq.stmts.len(), 3);
        assert!(matches!(&seq.stmts[0], Stmt::Text(t) if t.text == "Hello "));
        assert!(matches!(&seq.stmts[1], Stmt::Output(_)));
    }

    #[test]
    fn if_elif_else() {
        let seq = parse("{% if a %}1{% elif b %}2{% else %}3{% endif %}");
        let Stmt::If(stmt) = &seq.stmts[0] else {
            panic!("expected if");
        };
        assert_eq!(stmt.branches.len(), 2);
        assert_eq!(stmt.else_body.as_ref().map(|b| b.stmts.len()), Some(1));
    }

    #[test]
    fn for_with_unpacking_condition_and_else() {
        let seq = parse("{% for k, v in items if v %}{{ k }}{% else %}none{% endfor %}");
        let Stmt::For(stmt) = &seq.stmts[0] else {
            panic!("expected for");
        };
        let names: Vec<_> = stmt.targets.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["k", "v"]);
        assert!(stmt.condition.is_some());
        assert!(stmt.else_body.is_some());
    }

    #[test]
    fn set_forms() {
        let seq = parse("{% set a = 1 %}{% set x, y = [1, 2] %}{% set ns.n = 2 %}{% set b | upper %}t{% endset %}");
        assert!(matches!(&seq.stmts[0], Stmt::Set(s) if s.targets.len() == 1));
        assert!(matches!(&seq.stmts[1], Stmt::Set(s) if s.targets.len() == 2));
        assert!(matches!(&seq.stmts[2], Stmt::NamespaceSet(s) if s.attr.name == "n"));
        assert!(matches!(&seq.stmts[3], Stmt::SetBlock(s) if s.filters.len() == 1));
    }

    #[test]
    fn macro_params_with_defaults() {
        let seq = parse("{% macro greet(name, punct='!') %}Hi {{ name }}{{ punct }}{% endmacro %}");
        let Stmt::Macro(stmt) = &seq.stmts[0] else {
            panic!("expected macro");
        };
        assert_eq!(stmt.def.name.name, "greet");
        assert_eq!(stmt.def.params.len(), 2);
        assert!(stmt.def.params[0].default.is_none());
        assert!(stmt.def.params[1].default.is_some());
        assert!(!stmt.def.catch_varargs && !stmt.def.catch_kwargs);
    }

    #[test]
    fn macros_note_implicit_arguments() {
        let seq = parse(
            "{% macro outer() %}{% macro inner() %}{{ varargs }}{% endmacro %}{% endmacro %}\
             {% macro opts(a) %}{{ kwargs.x if kwargs }}{% endmacro %}{{ varargs }}",
        );
        let [Stmt::Macro(outer), Stmt::Macro(opts), ..] = seq.stmts.as_slice() else {
            panic!("expected two macros");
        };
        assert!(outer.def.catch_varargs && !outer.def.catch_kwargs);
        assert!(opts.def.catch_kwargs && !opts.def.catch_varargs);
    }

    #[test]
    fn filter_and_generation_blocks() {
        let seq = parse("{% filter trim | upper %} a {% endfilter %}{% generation %}x{% endgeneration %}");
        assert!(matches!(&seq.stmts[0], Stmt::FilterBlock(f) if f.filters.len() == 2));
        assert!(matches!(&seq.stmts[1], Stmt::Generation(_)));
    }

    #[test]
    fn break_and_continue_parse_anywhere() {
        let seq = parse("{% break %}{% continue %}");
        assert!(matches!(seq.stmts[0], Stmt::Break(_)));
        assert!(matches!(seq.stmts[1], Stmt::Continue(_)));
    }

    #[test]
    fn orphan_keywords_are_unexpected() {
        for (source, expected) in [
            ("{% else %}", "Unexpected else"),
            ("{% endif %}", "Unexpected endif"),
            ("{% elif 1 %}", "Unexpected elif"),
            ("{% endfor %}", "Unexpected endfor"),
            ("{% endfilter %}", "Unexpected endfilter"),
            ("{% for x in y %}{% endif %}{% endfor %}", "Unexpected endif"),
        ] {
            let err = parse_err(source);
            assert_eq!(err.kind, SyntaxErrorKind::Unexpected, "{source}");
            assert_eq!(err.message, expected);
        }
    }

    #[test]
    fn unclosed_blocks_are_unterminated() {
        for (source, expected) in [
            ("{% if 1 %}", "Unterminated if"),
            ("{% for x in 1 %}", "Unterminated for"),
            ("{% for x in 1 %}{% else %}", "Unterminated for"),
            ("{% generation %}", "Unterminated generation"),
            ("{% if 1 %}{% else %}", "Unterminated if"),
            ("{% if 1 %}{% else %}{% elif 1 %}{% endif %}", "Unterminated if"),
            ("{% filter trim %}", "Unterminated filter"),
            ("{% macro m() %}", "Unterminated macro"),
            ("{% set x %}", "Unterminated set"),
        ] {
            let err = parse_err(source);
            assert_eq!(err.kind, SyntaxErrorKind::Unterminated, "{source}");
            assert_eq!(err.message, expected);
        }
    }

    #[test]
    fn unterminated_points_at_opening_tag() {
        let err = parse_err("ab\n  {% if x %}");
        assert_eq!((err.span.line, err.span.col), (2, 3));
    }

    #[test]
    fn unknown_statement() {
        let err = parse_err("{% include 'x' %}");
        assert_eq!(err.kind, SyntaxErrorKind::UnknownStatement);
        assert_eq!(err.message, "Unknown statement 'include'");
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let err = parse_err("{% break now %}");
        assert_eq!(err.message, "Expected end of tag, found 'now'");
    }

    #[test]
    fn deep_block_nesting_is_rejected() {
        let source = "{% if x %}".repeat(100) + &"{% endif %}".repeat(100);
        assert_eq!(parse_err(&source).kind, SyntaxErrorKind::TooDeep);
    }
}
