//! Expression parsing using Pratt parsing (precedence climbing).
//!
//! Binary operators go through [`Parser::parse_expr`]. Unary operators,
//! primaries, postfix access, filters and tests are all handled at the unary
//! level, so `range(5) | length % 2` groups as `(range(5) | length) % 2` and
//! `not x is defined` as `not (x is defined)`.

use super::parser::Parser;
use crate::ast::expr::*;
use crate::ast::ops::NOT_BINDING_POWER;
use crate::ast::{BinaryOp, UnaryOp};
use crate::lexer::TokenKind;
use prompt_jinja_core::{Span, SyntaxError};

/// Words that end a bare test argument: `x is divisibleby 3 and y`.
const TEST_ARG_STOPWORDS: &[&str] = &["else", "or", "and", "if", "in", "not", "is"];

impl Parser {
    /// Parse a full expression, including a trailing conditional.
    pub fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        let then = self.parse_expr(0)?;
        if !self.check_keyword("if") {
            return Ok(then);
        }
        self.advance();
        let condition = self.parse_expr(0)?;
        let otherwise = if self.check_keyword("else") {
            let keyword = self.advance();
            Some(self.nested(keyword.span, Self::parse_expression)?)
        } else {
            None
        };
        let end = otherwise.as_ref().map_or(condition.span(), Expr::span);
        let span = then.span().merge(end);
        Ok(Expr::Ternary(Box::new(TernaryExpr {
            then,
            condition,
            otherwise,
            span,
        })))
    }

    /// Parse an expression with a minimum binding power.
    ///
    /// This is the core of the Pratt parser. It handles operator precedence
    /// by only consuming operators with sufficient binding power.
    pub fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, SyntaxError> {
        let span = self.peek().span;
        self.nested(span, |p| p.parse_expr_inner(min_bp))
    }

    fn parse_expr_inner(&mut self, min_bp: u8) -> Result<Expr, SyntaxError> {
        let lhs = if self.check_keyword("not") && !self.peek_nth(1).is_keyword("in") {
            if min_bp > NOT_BINDING_POWER {
                return Err(self.error_expected("expression"));
            }
            let not = self.advance();
            let operand = self.parse_expr(NOT_BINDING_POWER)?;
            let span = not.span.merge(operand.span());
            Expr::Unary(Box::new(UnaryExpr {
                op: UnaryOp::Not,
                operand,
                span,
            }))
        } else {
            self.parse_unary(true)?
        };

        self.chained(|p, links| p.parse_binary_chain(lhs, min_bp, links))
    }

    fn parse_binary_chain(&mut self, mut lhs: Expr, min_bp: u8, links: &mut usize) -> Result<Expr, SyntaxError> {
        while let Some((op, width)) = self.peek_binary_op() {
            let (l_bp, r_bp) = op.binding_power();
            if l_bp < min_bp {
                break;
            }
            self.link(links, self.peek().span)?;
            for _ in 0..width {
                self.advance();
            }
            let right = self.parse_expr(r_bp)?;
            lhs = if op.is_comparison() {
                self.parse_comparison(lhs, op, right, links)?
            } else {
                let span = lhs.span().merge(right.span());
                Expr::Binary(Box::new(BinaryExpr {
                    left: lhs,
                    op,
                    right,
                    span,
                }))
            };
        }

        Ok(lhs)
    }

    /// Collect `left op right [op next ...]` into one comparison chain.
    fn parse_comparison(
        &mut self,
        left: Expr,
        op: BinaryOp,
        right: Expr,
        links: &mut usize,
    ) -> Result<Expr, SyntaxError> {
        let mut chain = vec![(op, right)];
        while let Some((op, width)) = self.peek_binary_op().filter(|(op, _)| op.is_comparison()) {
            self.link(links, self.peek().span)?;
            for _ in 0..width {
                self.advance();
            }
            let (_, r_bp) = op.binding_power();
            chain.push((op, self.parse_expr(r_bp)?));
        }

        let end = chain.last().map_or(left.span(), |(_, last)| last.span());
        let span = left.span().merge(end);
        if chain.len() == 1 {
            let (op, right) = chain.swap_remove(0);
            return Ok(Expr::Binary(Box::new(BinaryExpr { left, op, right, span })));
        }
        Ok(Expr::Compare(Box::new(CompareExpr {
            left,
            links: chain,
            span,
        })))
    }

    fn peek_binary_op(&self) -> Option<(BinaryOp, usize)> {
        BinaryOp::from_tokens(self.peek(), Some(self.peek_nth(1)))
    }

    /// Parse a unary expression: prefix signs, a primary, postfix access and,
    /// when `with_filters` is set, any trailing filters and tests.
    fn parse_unary(&mut self, with_filters: bool) -> Result<Expr, SyntaxError> {
        let mut expr = if let Some(op) = UnaryOp::from_token(self.peek().kind) {
            let sign = self.advance();
            let operand = self.nested(sign.span, |p| p.parse_unary(false))?;
            let span = sign.span.merge(operand.span());
            Expr::Unary(Box::new(UnaryExpr { op, operand, span }))
        } else {
            let primary = self.parse_primary()?;
            self.parse_postfix(primary)?
        };

        if with_filters {
            expr = self.parse_filters_and_tests(expr)?;
        }
        Ok(expr)
    }

    /// Parse a literal, name or parenthesized/bracketed display.
    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.peek().clone();
        let literal = |kind| Ok(Expr::Literal(LiteralExpr { kind, span: token.span }));

        match token.kind {
            TokenKind::Int => {
                self.advance();
                let value = token.text.parse().map_err(|_| self.error_expected("integer"))?;
                literal(LiteralKind::Int(value))
            }
            TokenKind::Float => {
                self.advance();
                let value = token.text.parse().map_err(|_| self.error_expected("float"))?;
                literal(LiteralKind::Float(value))
            }
            TokenKind::String => {
                self.advance();
                // Adjacent string literals are joined: `'a' 'b'`.
                let mut text = token.text.clone();
                let mut span = token.span;
                while let Some(next) = self.eat(TokenKind::String) {
                    text.push_str(&next.text);
                    span = span.merge(next.span);
                }
                Ok(Expr::Literal(LiteralExpr {
                    kind: LiteralKind::String(text),
                    span,
                }))
            }
            TokenKind::Ident => {
                self.advance();
                match token.text.as_str() {
                    "true" | "True" => literal(LiteralKind::Bool(true)),
                    "false" | "False" => literal(LiteralKind::Bool(false)),
                    "none" | "None" => literal(LiteralKind::None),
                    _ => {
                        self.note_name(&token.text);
                        Ok(Expr::Ident(Ident::new(token.text.clone(), token.span)))
                    }
                }
            }
            TokenKind::LeftParen => self.nested(token.span, Self::parse_paren),
            TokenKind::LeftBracket => self.nested(token.span, Self::parse_array),
            TokenKind::LeftBrace => self.nested(token.span, Self::parse_object),
            _ => Err(self.error_expected("expression")),
        }
    }

    /// `()`, `(expr)` or a tuple `(a, b)` / `(a,)`.
    fn parse_paren(&mut self) -> Result<Expr, SyntaxError> {
        let open = self.expect(TokenKind::LeftParen)?;
        if let Some(close) = self.eat(TokenKind::RightParen) {
            return Ok(Expr::Tuple(ArrayExpr {
                items: Vec::new(),
                span: open.span.merge(close.span),
            }));
        }

        let first = self.parse_expression()?;
        if !self.check(TokenKind::Comma) {
            self.expect(TokenKind::RightParen)?;
            return Ok(first);
        }

        let mut items = vec![first];
        while self.eat(TokenKind::Comma).is_some() {
            if self.check(TokenKind::RightParen) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        let close = self.expect(TokenKind::RightParen)?;
        Ok(Expr::Tuple(ArrayExpr {
            items,
            span: open.span.merge(close.span),
        }))
    }

    fn parse_array(&mut self) -> Result<Expr, SyntaxError> {
        let open = self.expect(TokenKind::LeftBracket)?;
        let mut items = Vec::new();
        while !self.check(TokenKind::RightBracket) {
            items.push(self.parse_expression()?);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        let close = self.expect(TokenKind::RightBracket)?;
        Ok(Expr::Array(ArrayExpr {
            items,
            span: open.span.merge(close.span),
        }))
    }

    fn parse_object(&mut self) -> Result<Expr, SyntaxError> {
        let open = self.expect(TokenKind::LeftBrace)?;
        let mut entries = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            let key = self.parse_expression()?;
            self.expect(TokenKind::Colon)?;
            let value = self.parse_expression()?;
            entries.push((key, value));
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        let close = self.expect(TokenKind::RightBrace)?;
        Ok(Expr::Object(ObjectExpr {
            entries,
            span: open.span.merge(close.span),
        }))
    }

    // =========================================
    // Postfix: attribute, subscript, call
    // =========================================

    fn parse_postfix(&mut self, expr: Expr) -> Result<Expr, SyntaxError> {
        self.chained(|p, links| p.parse_postfix_chain(expr, links))
    }

    fn parse_postfix_chain(&mut self, mut expr: Expr, links: &mut usize) -> Result<Expr, SyntaxError> {
        loop {
            if matches!(self.peek().kind, TokenKind::Dot | TokenKind::LeftBracket | TokenKind::LeftParen) {
                self.link(links, self.peek().span)?;
            }
            expr = match self.peek().kind {
                TokenKind::Dot => self.parse_member_access(expr)?,
                TokenKind::LeftBracket => self.parse_subscript(expr)?,
                TokenKind::LeftParen => {
                    let args = self.parse_arguments()?;
                    let span = expr.span().merge(self.previous_span());
                    Expr::Call(Box::new(CallExpr {
                        callee: expr,
                        args,
                        span,
                    }))
                }
                _ => return Ok(expr),
            };
        }
    }

    /// `.name`, `.name(args)` or `.0`.
    fn parse_member_access(&mut self, object: Expr) -> Result<Expr, SyntaxError> {
        self.expect(TokenKind::Dot)?;

        if let Some(index) = self.eat(TokenKind::Int) {
            let value = index.text.parse().map_err(|_| self.error_expected("integer"))?;
            let span = object.span().merge(index.span);
            return Ok(Expr::Index(Box::new(IndexExpr {
                object,
                index: Expr::Literal(LiteralExpr {
                    kind: LiteralKind::Int(value),
                    span: index.span,
                }),
                span,
            })));
        }

        let name = self.expect_ident("attribute name")?;
        if self.check(TokenKind::LeftParen) {
            let args = self.parse_arguments()?;
            let span = object.span().merge(self.previous_span());
            return Ok(Expr::MethodCall(Box::new(MethodCallExpr {
                object,
                method: name,
                args,
                span,
            })));
        }

        let span = object.span().merge(name.span);
        Ok(Expr::Attribute(Box::new(AttributeExpr { object, name, span })))
    }

    /// `[index]` or `[start:stop:step]` with any part omitted.
    fn parse_subscript(&mut self, object: Expr) -> Result<Expr, SyntaxError> {
        let open = self.expect(TokenKind::LeftBracket)?;
        self.nested(open.span, |p| p.parse_subscript_body(object))
    }

    fn parse_subscript_body(&mut self, object: Expr) -> Result<Expr, SyntaxError> {
        let start = if self.check(TokenKind::Colon) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        if self.eat(TokenKind::Colon).is_none() {
            let index = start.ok_or_else(|| self.error_expected("index"))?;
            let close = self.expect(TokenKind::RightBracket)?;
            let span = object.span().merge(close.span);
            return Ok(Expr::Index(Box::new(IndexExpr { object, index, span })));
        }

        let stop = self.parse_slice_bound()?;
        let step = if self.eat(TokenKind::Colon).is_some() {
            self.parse_slice_bound()?
        } else {
            None
        };
        let close = self.expect(TokenKind::RightBracket)?;
        let span = object.span().merge(close.span);
        Ok(Expr::Slice(Box::new(SliceExpr {
            object,
            start,
            stop,
            step,
            span,
        })))
    }

    fn parse_slice_bound(&mut self) -> Result<Option<Expr>, SyntaxError> {
        if self.check(TokenKind::Colon) || self.check(TokenKind::RightBracket) {
            Ok(None)
        } else {
            self.parse_expression().map(Some)
        }
    }

    /// Parse a parenthesized argument list.
    pub(crate) fn parse_arguments(&mut self) -> Result<Vec<Argument>, SyntaxError> {
        let open = self.expect(TokenKind::LeftParen)?;
        self.nested(open.span, |p| {
            let mut args = Vec::new();
            while !p.check(TokenKind::RightParen) {
                args.push(p.parse_argument()?);
                if p.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            p.expect(TokenKind::RightParen)?;
            Ok(args)
        })
    }

    fn parse_argument(&mut self) -> Result<Argument, SyntaxError> {
        if self.eat(TokenKind::StarStar).is_some() {
            return Ok(Argument::KwSplat(self.parse_expression()?));
        }
        if self.eat(TokenKind::Star).is_some() {
            return Ok(Argument::Splat(self.parse_expression()?));
        }
        if self.check(TokenKind::Ident) && self.peek_nth(1).kind == TokenKind::Assign {
            let name = self.expect_ident("argument name")?;
            self.advance();
            return Ok(Argument::Named(name, self.parse_expression()?));
        }
        Ok(Argument::Positional(self.parse_expression()?))
    }

    // =========================================
    // Filters and tests
    // =========================================

    fn parse_filters_and_tests(&mut self, expr: Expr) -> Result<Expr, SyntaxError> {
        self.chained(|p, links| p.parse_filter_chain(expr, links))
    }

    fn parse_filter_chain(&mut self, mut expr: Expr, links: &mut usize) -> Result<Expr, SyntaxError> {
        loop {
            if self.check(TokenKind::Pipe) || self.check_keyword("is") {
                self.link(links, self.peek().span)?;
            }
            if self.eat(TokenKind::Pipe).is_some() {
                let filter = self.parse_filter_call()?;
                let span = expr.span().merge(filter.span);
                expr = Expr::Filter(Box::new(FilterExpr {
                    input: expr,
                    filter,
                    span,
                }));
            } else if self.eat_keyword("is") {
                expr = self.parse_test(expr)?;
            } else {
                return Ok(expr);
            }
        }
    }

    /// `name` or `name(args)`, as written after `|` or in a filter block.
    pub(crate) fn parse_filter_call(&mut self) -> Result<FilterCall, SyntaxError> {
        let name = self.expect_ident("filter name")?;
        let args = if self.check(TokenKind::LeftParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        let span = name.span.merge(self.previous_span());
        Ok(FilterCall { name, args, span })
    }

    /// The part of a test after `is`: `[not] name`, then `(args)` or one bare argument.
    fn parse_test(&mut self, subject: Expr) -> Result<Expr, SyntaxError> {
        let negated = self.eat_keyword("not");
        let name = self.expect_ident("test name")?;

        let args = if self.check(TokenKind::LeftParen) {
            self.parse_arguments()?
        } else if self.starts_bare_test_argument() {
            let primary = self.parse_primary()?;
            vec![Argument::Positional(self.parse_postfix(primary)?)]
        } else {
            Vec::new()
        };

        let span = subject.span().merge(self.previous_span());
        Ok(Expr::Test(Box::new(TestExpr {
            subject,
            name,
            negated,
            args,
            span,
        })))
    }

    fn starts_bare_test_argument(&self) -> bool {
        let token = self.peek();
        match token.kind {
            TokenKind::Int | TokenKind::Float | TokenKind::String | TokenKind::LeftBracket | TokenKind::LeftBrace => true,
            TokenKind::Ident => !TEST_ARG_STOPWORDS.contains(&token.text.as_str()),
            _ => false,
        }
    }

    /// Span of the most recently consumed token.
    fn previous_span(&self) -> Span {
        self.peek_back().span
    }
}
