//! Splitting template text into literal text and tags.
//!
//! The segment lexer only finds tag boundaries; the body of an expression or
//! statement tag is handed to the [`Tokenizer`](super::Tokenizer) later. All
//! whitespace control happens here:
//!
//! | marker / option         | effect                                                     |
//! |-------------------------|------------------------------------------------------------|
//! | `{{-` `{%-` `{#-`       | strip all trailing whitespace of the preceding text        |
//! | `-}}` `-%}` `-#}`       | strip all leading whitespace of the following text         |
//! | `trim_blocks`           | drop one `\n` right after a statement or comment tag       |
//! | `lstrip_blocks`         | drop spaces and tabs between a line start and a statement  |
//! | `{%+` / `+%}`           | opt a single tag out of `lstrip_blocks` / `trim_blocks`    |
//! | `keep_trailing_newline` | when false, one trailing `\n` of the source is removed     |

use bitflags::bitflags;
use prompt_jinja_core::{Options, Span, SyntaxError, SyntaxErrorKind};

use super::cursor::Cursor;

bitflags! {
    /// Whitespace-control markers written inside a tag's delimiters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Trim: u8 {
        /// `-` after the opening delimiter.
        const STRIP_BEFORE = 1 << 0;
        /// `-` before the closing delimiter.
        const STRIP_AFTER = 1 << 1;
        /// `+` after the opening delimiter: never lstrip in front of this tag.
        const KEEP_BEFORE = 1 << 2;
        /// `+` before the closing delimiter: never trim the newline after this tag.
        const KEEP_AFTER = 1 << 3;
    }
}

/// The three kinds of tag delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// `{{ ... }}`
    Expression,
    /// `{% ... %}`
    Statement,
    /// `{# ... #}`
    Comment,
}

impl TagKind {
    fn from_opener(c: char) -> Option<Self> {
        match c {
            '{' => Some(TagKind::Expression),
            '%' => Some(TagKind::Statement),
            '#' => Some(TagKind::Comment),
            _ => None,
        }
    }

    fn closer(self) -> &'static str {
        match self {
            TagKind::Expression => "}}",
            TagKind::Statement => "%}",
            TagKind::Comment => "#}",
        }
    }

    fn missing_end(self) -> &'static str {
        match self {
            TagKind::Expression => "Missing end of expression tag",
            TagKind::Statement => "Missing end of statement tag",
            TagKind::Comment => "Missing end of comment tag",
        }
    }

    /// Whether `trim_blocks` / `lstrip_blocks` apply around this tag.
    fn is_block(self) -> bool {
        matches!(self, TagKind::Statement | TagKind::Comment)
    }
}

/// A piece of the template after whitespace control has been applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text copied to the output.
    Text { text: String, span: Span },
    /// An expression or statement tag. Comments never appear here.
    Tag {
        kind: TagKind,
        /// The text between the delimiters and their whitespace markers.
        body: String,
        /// The whole tag, delimiters included.
        span: Span,
        /// Position of the first character of `body`.
        body_start: Span,
    },
}

impl Segment {
    pub fn span(&self) -> Span {
        match self {
            Segment::Text { span, .. } | Segment::Tag { span, .. } => *span,
        }
    }
}

/// A scanned piece before whitespace control.
enum Raw<'src> {
    Text { text: &'src str, span: Span },
    Tag {
        kind: TagKind,
        body: &'src str,
        trim: Trim,
        span: Span,
        body_start: Span,
    },
}

/// Split `source` into segments according to `options`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn lex(source: &str, options: &Options) -> Result<Vec<Segment>, SyntaxError> {
    let mut normalized = source.replace("\r\n", "\n");
    if !options.keep_trailing_newline && normalized.ends_with('\n') {
        normalized.pop();
    }

    let raw = scan(&normalized)?;
    let mut segments = Vec::with_capacity(raw.len());

    for (i, piece) in raw.iter().enumerate() {
        match piece {
            Raw::Text { text, span } => {
                let prev = i.checked_sub(1).and_then(|p| tag_info(&raw[p]));
                let next = raw.get(i + 1).and_then(tag_info);
                let kept = apply_whitespace_control(text, i == 0, prev, next, options);
                if !kept.is_empty() {
                    segments.push(Segment::Text {
                        text: kept.to_string(),
                        span: *span,
                    });
                }
            }
            Raw::Tag {
                kind: TagKind::Comment,
                ..
            } => {}
            Raw::Tag {
                kind,
                body,
                span,
                body_start,
                ..
            } => segments.push(Segment::Tag {
                kind: *kind,
                body: body.to_string(),
                span: *span,
                body_start: *body_start,
            }),
        }
    }

    tracing::trace!(segments = segments.len(), "lexed template");
    Ok(segments)
}

fn tag_info(piece: &Raw<'_>) -> Option<(TagKind, Trim)> {
    match piece {
        Raw::Tag { kind, trim, .. } => Some((*kind, *trim)),
        Raw::Text { .. } => None,
    }
}

/// Trim a text run according to the tags on either side of it.
///
/// Both ends are computed against the untouched text so that `lstrip_blocks`
/// still sees the newline that `trim_blocks` is about to remove.
fn apply_whitespace_control<'a>(
    text: &'a str,
    at_template_start: bool,
    prev: Option<(TagKind, Trim)>,
    next: Option<(TagKind, Trim)>,
    options: &Options,
) -> &'a str {
    let mut end = text.len();
    if let Some((kind, trim)) = next {
        if trim.contains(Trim::STRIP_BEFORE) {
            end = text.trim_end().len();
        } else if options.lstrip_blocks && kind.is_block() && !trim.contains(Trim::KEEP_BEFORE) {
            let stripped = text.trim_end_matches([' ', '\t']);
            if stripped.ends_with('\n') || (stripped.is_empty() && at_template_start) {
                end = stripped.len();
            }
        }
    }

    let mut start = 0;
    if let Some((kind, trim)) = prev {
        if trim.contains(Trim::STRIP_AFTER) {
            start = text.len() - text.trim_start().len();
        } else if options.trim_blocks
            && kind.is_block()
            && !trim.contains(Trim::KEEP_AFTER)
            && text.starts_with('\n')
        {
            start = 1;
        }
    }

    if start >= end { "" } else { &text[start..end] }
}

/// Find every text run and tag in `source`.
fn scan(source: &str) -> Result<Vec<Raw<'_>>, SyntaxError> {
    let mut cursor = Cursor::new(source);
    let mut pieces = Vec::new();

    while !cursor.is_eof() {
        let text_start = cursor.offset();
        let text_pos = cursor.position();
        while !cursor.is_eof() && !at_tag_open(&cursor) {
            cursor.advance();
        }
        if cursor.offset() > text_start {
            pieces.push(Raw::Text {
                text: cursor.slice_from(text_start),
                span: cursor.span_from(text_pos, text_start),
            });
        }
        if cursor.is_eof() {
            break;
        }
        pieces.push(scan_tag(&mut cursor)?);
    }

    Ok(pieces)
}

fn at_tag_open(cursor: &Cursor<'_>) -> bool {
    cursor.peek() == Some('{') && cursor.peek_nth(1).and_then(TagKind::from_opener).is_some()
}

/// Scan one tag starting at its opening `{`.
fn scan_tag<'src>(cursor: &mut Cursor<'src>) -> Result<Raw<'src>, SyntaxError> {
    let tag_start = cursor.offset();
    let tag_pos = cursor.position();
    cursor.advance();
    let kind = cursor
        .advance()
        .and_then(TagKind::from_opener)
        .ok_or_else(|| SyntaxError::new(SyntaxErrorKind::Unexpected, tag_pos, "Expected tag"))?;

    let mut trim = Trim::empty();
    if cursor.eat('-') {
        trim |= Trim::STRIP_BEFORE;
    } else if cursor.eat('+') {
        trim |= Trim::KEEP_BEFORE;
    }

    let body_start = cursor.position();
    let body_offset = cursor.offset();
    let missing_end = || SyntaxError::new(SyntaxErrorKind::Unterminated, tag_pos, kind.missing_end());

    let body_end = match kind {
        TagKind::Comment => scan_comment_body(cursor).ok_or_else(missing_end)?,
        _ => scan_code_body(cursor, kind.closer()).ok_or_else(missing_end)?,
    };

    let mut body = &cursor.source()[body_offset..body_end];
    if let Some(stripped) = body.strip_suffix('-') {
        trim |= Trim::STRIP_AFTER;
        body = stripped;
    } else if let Some(stripped) = body.strip_suffix('+') {
        trim |= Trim::KEEP_AFTER;
        body = stripped;
    }
    cursor.advance_bytes(2);

    Ok(Raw::Tag {
        kind,
        body,
        trim,
        span: cursor.span_from(tag_pos, tag_start),
        body_start,
    })
}

/// Advance to the `#}` closing a comment, returning its offset.
fn scan_comment_body(cursor: &mut Cursor<'_>) -> Option<usize> {
    while !cursor.is_eof() {
        if cursor.check_str("#}") {
            return Some(cursor.offset());
        }
        cursor.advance();
    }
    None
}

/// Advance to the closing delimiter of an expression or statement tag.
///
/// String literals and bracket nesting are skipped over so that `}}` inside
/// `{{ '}}' }}` or `{{ {'a': {'b': 1}} }}` does not end the tag.
fn scan_code_body(cursor: &mut Cursor<'_>, closer: &str) -> Option<usize> {
    let mut depth = 0usize;
    loop {
        if depth == 0 && cursor.check_str(closer) {
            return Some(cursor.offset());
        }
        match cursor.peek()? {
            quote @ ('\'' | '"') => {
                cursor.advance();
                while let Some(c) = cursor.advance() {
                    if c == '\\' {
                        cursor.advance();
                    } else if c == quote {
                        break;
                    }
                }
            }
            '(' | '[' | '{' => {
                depth += 1;
                cursor.advance();
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                cursor.advance();
            }
            _ => {
                cursor.advance();
            }
        }
    }
}
