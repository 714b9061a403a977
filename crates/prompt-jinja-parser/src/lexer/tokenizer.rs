//! Tokenizer for the bodies of expression and statement tags.
//!
//! The [`Tokenizer`] turns the text between `{{ }}` or `{% %}` into a flat
//! list of [`Token`]s ending with [`TokenKind::Eof`]. Dispatch is on the first
//! character of each token; positions stay relative to the whole template.

use prompt_jinja_core::{Span, SyntaxError, SyntaxErrorKind};

use super::cursor::{Cursor, is_ident_continue, is_ident_start};
use super::token::{Token, TokenKind};

/// Tokenizer for one tag body.
pub struct Tokenizer<'src> {
    /// Low-level character cursor.
    cursor: Cursor<'src>,
    /// Kind of the last token produced, used to keep `x.0.1` from lexing `0.1`.
    last: Option<TokenKind>,
}

impl<'src> Tokenizer<'src> {
    /// Create a tokenizer for `body`, whose first character sits at `start`.
    pub fn new(body: &'src str, start: Span) -> Self {
        Self {
            cursor: Cursor::with_origin(body, start.line, start.col),
            last: None,
        }
    }

    /// Scan the whole body.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan_token()?;
            let done = token.kind == TokenKind::Eof;
            self.last = Some(token.kind);
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    // =========================================
    // Internal: Token scanning
    // =========================================

    fn scan_token(&mut self) -> Result<Token, SyntaxError> {
        self.cursor.eat_while(char::is_whitespace);

        let start = self.cursor.position();
        let start_offset = self.cursor.offset();

        let Some(c) = self.cursor.peek() else {
            return Ok(Token::new(TokenKind::Eof, "", start));
        };

        match c {
            '\'' | '"' => self.scan_string(c, start, start_offset),
            c if c.is_ascii_digit() => self.scan_number(start, start_offset),
            c if is_ident_start(c) => {
                self.cursor.eat_while(is_ident_continue);
                Ok(self.make_token(TokenKind::Ident, start, start_offset))
            }
            _ => self.scan_operator(start, start_offset),
        }
    }

    fn make_token(&self, kind: TokenKind, start: Span, start_offset: usize) -> Token {
        Token::new(
            kind,
            self.cursor.slice_from(start_offset),
            self.cursor.span_from(start, start_offset),
        )
    }

    // =========================================
    // Scanning: Strings
    // =========================================

    /// Scan a quoted string, decoding escapes into the token text.
    fn scan_string(&mut self, quote: char, start: Span, start_offset: usize) -> Result<Token, SyntaxError> {
        self.cursor.advance();
        let mut value = String::new();

        loop {
            match self.cursor.advance() {
                None => {
                    return Err(SyntaxError::new(
                        SyntaxErrorKind::Unterminated,
                        self.cursor.span_from(start, start_offset),
                        "Unterminated string literal",
                    ));
                }
                Some(c) if c == quote => break,
                Some('\\') => self.scan_escape(&mut value, start, start_offset)?,
                Some(c) => value.push(c),
            }
        }

        Ok(Token::new(
            TokenKind::String,
            value,
            self.cursor.span_from(start, start_offset),
        ))
    }

    fn scan_escape(&mut self, value: &mut String, start: Span, start_offset: usize) -> Result<(), SyntaxError> {
        let Some(c) = self.cursor.advance() else {
            return Ok(());
        };
        match c {
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            'b' => value.push('\u{8}'),
            'f' => value.push('\u{c}'),
            '\\' | '\'' | '"' => value.push(c),
            'u' | 'x' => {
                let width = if c == 'u' { 4 } else { 2 };
                let digits: String = (0..width).filter_map(|_| self.cursor.advance()).collect();
                let decoded = u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32);
                match decoded {
                    Some(ch) if digits.len() == width => value.push(ch),
                    _ => {
                        return Err(SyntaxError::new(
                            SyntaxErrorKind::InvalidLiteral,
                            self.cursor.span_from(start, start_offset),
                            format!("Invalid escape sequence '\\{c}{digits}'"),
                        ));
                    }
                }
            }
            // Unknown escapes are kept verbatim.
            other => {
                value.push('\\');
                value.push(other);
            }
        }
        Ok(())
    }

    // =========================================
    // Scanning: Numbers
    // =========================================

    /// Scan an integer or float literal. Underscores separate digits.
    fn scan_number(&mut self, start: Span, start_offset: usize) -> Result<Token, SyntaxError> {
        self.consume_digits();
        let mut is_float = false;

        let after_dot = self.last == Some(TokenKind::Dot);
        if !after_dot && self.cursor.peek() == Some('.') && self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.cursor.advance();
            self.consume_digits();
            is_float = true;
        }

        if !after_dot && matches!(self.cursor.peek(), Some('e' | 'E')) {
            let signed = matches!(self.cursor.peek_nth(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.cursor.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                self.cursor.advance_bytes(digit_at);
                self.consume_digits();
                is_float = true;
            }
        }

        let token = self.make_token(if is_float { TokenKind::Float } else { TokenKind::Int }, start, start_offset);
        let digits = token.text.replace('_', "");
        let message = if is_float {
            digits.parse::<f64>().is_err().then_some("Invalid number literal")
        } else {
            digits.parse::<i64>().is_err().then_some("Integer literal does not fit in 64 bits")
        };
        if let Some(message) = message {
            return Err(SyntaxError::new(
                SyntaxErrorKind::InvalidLiteral,
                token.span,
                format!("{message}: '{}'", token.text),
            ));
        }
        Ok(Token::new(token.kind, digits, token.span))
    }

    fn consume_digits(&mut self) {
        self.cursor.eat_while(|c| c.is_ascii_digit() || c == '_');
    }

    // =========================================
    // Scanning: Operators
    // =========================================

    fn scan_operator(&mut self, start: Span, start_offset: usize) -> Result<Token, SyntaxError> {
        let Some(c) = self.cursor.advance() else {
            return Ok(Token::new(TokenKind::Eof, "", start));
        };
        let next = self.cursor.peek();

        let (kind, extra) = match (c, next) {
            ('(', _) => (TokenKind::LeftParen, false),
            (')', _) => (TokenKind::RightParen, false),
            ('[', _) => (TokenKind::LeftBracket, false),
            (']', _) => (TokenKind::RightBracket, false),
            ('{', _) => (TokenKind::LeftBrace, false),
            ('}', _) => (TokenKind::RightBrace, false),
            ('.', _) => (TokenKind::Dot, false),
            (',', _) => (TokenKind::Comma, false),
            (':', _) => (TokenKind::Colon, false),
            ('+', _) => (TokenKind::Plus, false),
            ('-', _) => (TokenKind::Minus, false),
            ('~', _) => (TokenKind::Tilde, false),
            ('|', _) => (TokenKind::Pipe, false),
            ('%', _) => (TokenKind::Percent, false),
            ('*', Some('*')) => (TokenKind::StarStar, true),
            ('*', _) => (TokenKind::Star, false),
            ('/', Some('/')) => (TokenKind::SlashSlash, true),
            ('/', _) => (TokenKind::Slash, false),
            ('=', Some('=')) => (TokenKind::EqualEqual, true),
            ('=', _) => (TokenKind::Assign, false),
            ('!', Some('=')) => (TokenKind::BangEqual, true),
            ('<', Some('=')) => (TokenKind::LessEqual, true),
            ('<', _) => (TokenKind::Less, false),
            ('>', Some('=')) => (TokenKind::GreaterEqual, true),
            ('>', _) => (TokenKind::Greater, false),
            _ => {
                return Err(SyntaxError::new(
                    SyntaxErrorKind::Unexpected,
                    self.cursor.span_from(start, start_offset),
                    format!("Unexpected character '{c}'"),
                ));
            }
        };
        if extra {
            self.cursor.advance();
        }

        Ok(self.make_token(kind, start, start_offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Vec<(TokenKind, String)> {
        Tokenizer::new(source, Span::point(1, 1))
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|(kind, _)| kind).collect()
    }

    #[test]
    fn empty_body() {
        assert_eq!(kinds("   "), [TokenKind::Eof]);
    }

    #[test]
    fn keywords_are_identifiers() {
        assert_eq!(
            tokenize("x is not none"),
            [
                (TokenKind::Ident, "x".to_string()),
                (TokenKind::Ident, "is".to_string()),
                (TokenKind::Ident, "not".to_string()),
                (TokenKind::Ident, "none".to_string()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(
            tokenize("42 3.5 1e3 1_000"),
            [
                (TokenKind::Int, "42".to_string()),
                (TokenKind::Float, "3.5".to_string()),
                (TokenKind::Float, "1e3".to_string()),
                (TokenKind::Int, "1000".to_string()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn numeric_attribute_after_dot_is_not_a_float() {
        assert_eq!(
            kinds("x.0.1"),
            [
                TokenKind::Ident,
                TokenKind::Dot,
                TokenKind::Int,
                TokenKind::Dot,
                TokenKind::Int,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn integer_overflow_is_rejected() {
        let err = Tokenizer::new("99999999999999999999", Span::point(1, 1))
            .tokenize()
            .unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::InvalidLiteral);
        assert_eq!(err.message, "Integer literal does not fit in 64 bits: '99999999999999999999'");
    }

    #[test]
    fn string_escapes_are_decoded() {
        assert_eq!(
            tokenize(r#"'a\n\'b' "é\"" '\d'"#),
            [
                (TokenKind::String, "a\n'b".to_string()),
                (TokenKind::String, "é\"".to_string()),
                (TokenKind::String, "\\d".to_string()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn unterminated_string() {
        let err = Tokenizer::new("'abc", Span::point(1, 4)).tokenize().unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::Unterminated);
        assert_eq!(err.span, Span::new(1, 4, 4));
    }

    #[test]
    fn operators() {
        assert_eq!(
            kinds("+ - * ** / // % ~ | = == != < <= > >="),
            [
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::StarStar,
                TokenKind::Slash,
                TokenKind::SlashSlash,
                TokenKind::Percent,
                TokenKind::Tilde,
                TokenKind::Pipe,
                TokenKind::Assign,
                TokenKind::EqualEqual,
                TokenKind::BangEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn positions_are_relative_to_template() {
        let tokens = Tokenizer::new(" a + b", Span::point(3, 7)).tokenize().unwrap();
        assert_eq!(tokens[0].span, Span::new(3, 8, 1));
        assert_eq!(tokens[2].span, Span::new(3, 12, 1));
    }

    #[test]
    fn unexpected_character() {
        let err = Tokenizer::new("a ? b", Span::point(1, 1)).tokenize().unwrap_err();
        assert_eq!(err.message, "Unexpected character '?'");
    }
}
