//! Text filters, the `default` fallback and the escape / safe pair.

use prompt_jinja_core::{RenderError, RenderResult};
use prompt_jinja_runtime::value::{call_method, escape_html};
use prompt_jinja_runtime::{Args, Registry, State, Value};

/// `truncate` keeps strings that overflow `length` by at most this much.
const TRUNCATE_LEEWAY: i64 = 5;

pub(super) fn register(registry: &mut Registry) {
    registry
        .register_filter("trim", trim)
        .register_filter("indent", indent)
        .register_filter("upper", |_, value, args| method(value, "upper", args))
        .register_filter("lower", |_, value, args| method(value, "lower", args))
        .register_filter("title", title)
        .register_filter("capitalize", |_, value, args| method(value, "capitalize", args))
        .register_filter("replace", |_, value, args| method(value, "replace", args))
        .register_filter("truncate", truncate)
        .register_filter("wordcount", wordcount)
        .register_filter("center", center)
        .register_filter("default", default)
        .register_filter("d", default)
        .register_filter("escape", escape)
        .register_filter("e", escape)
        .register_filter("safe", safe)
        .register_filter("string", string);
}

/// Result text keeps the safe marker of the input.
fn like(input: &Value, text: String) -> Value {
    if input.is_safe() {
        Value::safe(text)
    } else {
        Value::from(text)
    }
}

/// Run the string method `name` on the display text of `value`.
fn method(value: Value, name: &str, args: Args) -> RenderResult<Value> {
    let text = Value::from(value.to_string());
    let result = call_method(&text, name, args)?;
    Ok(like(&value, result.to_string()))
}

/// A word starts the text or follows whitespace or one of `- ( { [ <`.
fn title(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    args.expect_empty("title")?;
    let text = value.to_string();
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;
    for c in text.chars() {
        if word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        word_start = c.is_whitespace() || matches!(c, '-' | '(' | '{' | '[' | '<');
    }
    Ok(like(&value, out))
}

/// `trim(chars=None)`; `None` trims to the empty string.
fn trim(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    if value.is_null() {
        args.bind("trim", ["chars"])?;
        return Ok(Value::from(""));
    }
    method(value, "trim", args)
}

/// `indent(width=4, first=false, blank=false)`: indent every line but the
/// first. Blank lines stay empty unless `blank` is set.
fn indent(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    let [width, first, blank] = args.bind("indent", ["width", "first", "blank"])?;
    let indentation = match &width {
        Value::Undefined => "    ".to_string(),
        Value::String(s) | Value::Safe(s) => s.to_string(),
        other => match other.as_i64() {
            Some(n) => " ".repeat(usize::try_from(n).unwrap_or(0)),
            None => {
                return Err(RenderError::type_error(format!(
                    "indent() width must be int or str, not {}",
                    other.type_name()
                )));
            }
        },
    };

    let mut text = value.to_string();
    text.push('\n');
    let lines: Vec<&str> = text.lines().collect();
    let mut out = String::with_capacity(text.len());
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
            if blank.is_truthy() || !line.is_empty() {
                out.push_str(&indentation);
            }
        }
        out.push_str(line);
    }
    if first.is_truthy() {
        out.insert_str(0, &indentation);
    }
    Ok(like(&value, out))
}

/// `truncate(length=255, killwords=false, end='...', leeway=5)`.
fn truncate(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    let [length, killwords, end, leeway] = args.bind("truncate", ["length", "killwords", "end", "leeway"])?;
    let length = int_arg(&length, "truncate", 255)?;
    let leeway = int_arg(&leeway, "truncate", TRUNCATE_LEEWAY)?;
    let end = if end.is_undefined() { "...".to_string() } else { end.to_string() };

    let text = value.to_string();
    let chars: Vec<char> = text.chars().collect();
    if chars.len() as i64 <= length.saturating_add(leeway) {
        return Ok(like(&value, text));
    }
    let keep = usize::try_from(length - end.chars().count() as i64).unwrap_or(0);
    let head: String = chars.iter().take(keep).collect();
    let head = if killwords.is_truthy() {
        head.as_str()
    } else {
        head.rsplit_once(' ').map_or(head.as_str(), |(before, _)| before)
    };
    Ok(Value::from(format!("{head}{end}")))
}

fn int_arg(value: &Value, func: &str, default: i64) -> RenderResult<i64> {
    match value {
        Value::Undefined | Value::None => Ok(default),
        other => other.as_i64().ok_or_else(|| {
            RenderError::type_error(format!(
                "{func}() argument must be int, not {}",
                other.type_name()
            ))
        }),
    }
}

/// Number of words, a word being a run of alphanumerics or underscores.
fn wordcount(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    args.expect_empty("wordcount")?;
    let text = value.to_string();
    let count = text
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .count();
    Ok(Value::from(count))
}

/// `center(width=80)`, padding like Python's `str.center`.
fn center(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    let [width] = args.bind("center", ["width"])?;
    let width = int_arg(&width, "center", 80)?;
    let text = value.to_string();
    let margin = width - text.chars().count() as i64;
    if margin <= 0 {
        return Ok(like(&value, text));
    }
    let left = margin / 2 + (margin & width & 1);
    let right = margin - left;
    let padded = format!(
        "{}{text}{}",
        " ".repeat(left as usize),
        " ".repeat(right as usize)
    );
    Ok(like(&value, padded))
}

/// `default(default_value='', boolean=false)`: the fallback replaces an
/// undefined input, or any falsy one when `boolean` is set.
fn default(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    let [fallback, boolean] = args.bind("default", ["default_value", "boolean"])?;
    let missing = if boolean.is_truthy() {
        !value.is_truthy()
    } else {
        value.is_undefined()
    };
    if !missing {
        return Ok(value);
    }
    Ok(if fallback.is_undefined() { Value::from("") } else { fallback })
}

fn escape(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    args.expect_empty("escape")?;
    Ok(match value {
        Value::Safe(_) => value,
        other => Value::safe(escape_html(&other.to_string())),
    })
}

fn safe(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    args.expect_empty("safe")?;
    Ok(match value {
        Value::Safe(_) => value,
        other => Value::safe(other.to_string()),
    })
}

fn string(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    args.expect_empty("string")?;
    Ok(match value {
        Value::String(_) | Value::Safe(_) => value,
        other => Value::from(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use crate::test_support::{eval, render, render_escaped};
    use prompt_jinja_core::RenderErrorKind;
    use rstest::rstest;

    #[rstest]
    #[case("' a  ' | trim", "a")]
    #[case("'xxaxx' | trim('x')", "a")]
    #[case("None | trim", "")]
    #[case("'AbC' | lower", "abc")]
    #[case("'me' | upper", "ME")]
    #[case("'foo bar' | title", "Foo Bar")]
    #[case("\"they're bill's\" | title", "They're Bill's")]
    #[case("'a-b_c d' | title", "A-B_c D")]
    #[case("'hELLO (wORLD) [x]<y>' | title", "Hello (World) [X]<Y>")]
    #[case("'ok go' | capitalize", "Ok go")]
    #[case("'abcXYZabc' | replace('abc', 'ok')", "okXYZok")]
    #[case("'abcXYZabc' | replace('abc', 'ok', 1)", "okXYZabc")]
    #[case("42 | string ~ 'x'", "42x")]
    #[case("[1] | string", "[1]")]
    #[case("'hello world, it_s me' | wordcount", "4")]
    #[case("'abc' | center(8) ~ '|'", "  abc   |")]
    #[case("'abcdef' | center(3)", "abcdef")]
    fn text_filters(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(eval(source), expected);
    }

    #[rstest]
    #[case("'foo bar baz qux' | truncate(9)", "foo...")]
    #[case("'foo bar baz qux' | truncate(9, true)", "foo ba...")]
    #[case("'foo bar baz qux' | truncate(11)", "foo bar baz qux")]
    #[case("'foo bar baz qux' | truncate(11, false, '>>', 0)", "foo bar>>")]
    #[case("'short' | truncate", "short")]
    fn truncation(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(eval(source), expected);
    }

    #[test]
    fn indentation() {
        let source = "{% set txt = 'a\\nb\\n' %}{{ txt | indent(2) }}|{{ txt | indent(2, first=true) }}";
        assert_eq!(render(source).unwrap(), "a\n  b\n|  a\n  b\n");
        assert_eq!(eval("'a\\n\\nb' | indent"), "a\n\n    b");
        assert_eq!(eval("'a\\n\\nb' | indent(1, blank=true)"), "a\n \n b");
        assert_eq!(eval("'a\\nb' | indent('> ')"), "a\n> b");
    }

    #[rstest]
    #[case("foo | default('the default') ~ 1 | default('nope')", "the default1")]
    #[case("'' | default('the default', true) ~ 1 | default('nope', true)", "the default1")]
    #[case("none | default('x')", "None")]
    #[case("none | d('x', boolean=true)", "x")]
    #[case("missing | d", "")]
    fn defaults(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(eval(source), expected);
    }

    #[test]
    fn escape_and_safe() {
        assert_eq!(eval("'<a href=\"x\">' | escape"), "&lt;a href=&#34;x&#34;&gt;");
        assert_eq!(eval("'<b>' | e | e"), "&lt;b&gt;");
        assert_eq!(eval("1 | safe"), "1");
        assert_eq!(render_escaped("{{ '<b>' }}{{ '<b>' | safe }}{{ '<i>' | upper }}").unwrap(), "&lt;b&gt;<b>&lt;I&gt;");
        assert_eq!(render_escaped("{{ ('<b>' | safe) | upper }}").unwrap(), "<B>");
    }

    #[test]
    fn default_survives_strict_mode() {
        let out = crate::test_support::render_with(
            "{{ missing | default('fallback') }}",
            serde_json::json!({}),
            prompt_jinja_core::RenderOptions::strict(),
        )
        .unwrap();
        assert_eq!(out, "fallback");
    }

    #[test]
    fn bad_arguments_are_type_errors() {
        let err = render("{{ 'x' | indent([]) }}").unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::Type);
        let err = render("{{ 'x' | trim(bogus=1) }}").unwrap_err();
        assert_eq!(err.message, "trim() got an unexpected keyword argument 'bogus'");
    }
}
