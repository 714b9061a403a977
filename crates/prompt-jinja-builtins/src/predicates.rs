//! Tests: `value is name(args)`.
//!
//! Type tests take no arguments. Comparison tests take the right-hand
//! operand and are also registered under their operator spelling, so
//! `select('==', 2)` and `select('equalto', 2)` are the same.

use std::cmp::Ordering;

use prompt_jinja_core::{RenderError, RenderResult};
use prompt_jinja_runtime::args::required;
use prompt_jinja_runtime::{Args, Registry, State, Value};

pub(crate) fn register(registry: &mut Registry) {
    // Definedness and types
    registry
        .register_test("defined", |_, v, args| nullary(args, "defined", !v.is_undefined()))
        .register_test("undefined", |_, v, args| nullary(args, "undefined", v.is_undefined()))
        .register_test("none", |_, v, args| nullary(args, "none", v.is_none()))
        .register_test("boolean", |_, v, args| nullary(args, "boolean", matches!(v, Value::Bool(_))))
        .register_test("true", |_, v, args| nullary(args, "true", matches!(v, Value::Bool(true))))
        .register_test("false", |_, v, args| nullary(args, "false", matches!(v, Value::Bool(false))))
        .register_test("integer", |_, v, args| nullary(args, "integer", matches!(v, Value::Int(_))))
        .register_test("float", |_, v, args| nullary(args, "float", matches!(v, Value::Float(_))))
        .register_test("number", |_, v, args| nullary(args, "number", v.is_number()))
        .register_test("string", |_, v, args| nullary(args, "string", v.is_string()))
        .register_test("mapping", |_, v, args| nullary(args, "mapping", matches!(v, Value::Object(_))))
        .register_test("iterable", |_, v, args| nullary(args, "iterable", is_iterable(v)))
        .register_test("sequence", |_, v, args| nullary(args, "sequence", is_sequence(v)))
        .register_test("callable", |_, v, args| nullary(args, "callable", v.is_callable()))
        .register_test("escaped", |_, v, args| nullary(args, "escaped", v.is_safe()));

    // Values
    registry
        .register_test("odd", |_, v, args| parity(v, args, "odd", 1))
        .register_test("even", |_, v, args| parity(v, args, "even", 0))
        .register_test("divisibleby", divisibleby)
        .register_test("lower", |_, v, args| nullary(args, "lower", is_lower(&v.to_string())))
        .register_test("upper", |_, v, args| nullary(args, "upper", is_upper(&v.to_string())))
        .register_test("in", |_, v, args| {
            let container = operand(args, "in")?;
            container.contains(v)
        })
        .register_test("sameas", |_, v, args| Ok(v.is_same(&operand(args, "sameas")?)));

    // Comparisons
    for name in ["equalto", "eq", "=="] {
        registry.register_test(name, |_, v, args| Ok(v.equals(&operand(args, "equalto")?)));
    }
    for name in ["ne", "!="] {
        registry.register_test(name, |_, v, args| Ok(!v.equals(&operand(args, "ne")?)));
    }
    for name in ["lt", "<"] {
        registry.register_test(name, |_, v, args| compare(v, args, "lt", |o| o == Ordering::Less));
    }
    for name in ["le", "<="] {
        registry.register_test(name, |_, v, args| compare(v, args, "le", |o| o != Ordering::Greater));
    }
    for name in ["gt", ">"] {
        registry.register_test(name, |_, v, args| compare(v, args, "gt", |o| o == Ordering::Greater));
    }
    for name in ["ge", ">="] {
        registry.register_test(name, |_, v, args| compare(v, args, "ge", |o| o != Ordering::Less));
    }
}

fn nullary(args: Args, name: &str, result: bool) -> RenderResult<bool> {
    args.expect_empty(name)?;
    Ok(result)
}

/// The single required argument of a binary test.
fn operand(args: Args, name: &str) -> RenderResult<Value> {
    let [other] = args.bind(name, ["value"])?;
    required(other, name, "value")
}

fn compare(value: &Value, args: Args, name: &str, accept: fn(Ordering) -> bool) -> RenderResult<bool> {
    let other = operand(args, name)?;
    Ok(accept(value.compare(&other)?))
}

fn integer(value: &Value, name: &str) -> RenderResult<i64> {
    value.as_i64().ok_or_else(|| {
        RenderError::type_error(format!(
            "{name} test requires an integer, not '{}'",
            value.type_name()
        ))
    })
}

fn parity(value: &Value, args: Args, name: &str, remainder: i64) -> RenderResult<bool> {
    args.expect_empty(name)?;
    Ok(integer(value, name)?.rem_euclid(2) == remainder)
}

fn divisibleby(_: &mut State<'_>, value: &Value, args: Args) -> RenderResult<bool> {
    let divisor = integer(&operand(args, "divisibleby")?, "divisibleby")?;
    if divisor == 0 {
        return Err(RenderError::value("division by zero"));
    }
    Ok(integer(value, "divisibleby")?.rem_euclid(divisor) == 0)
}

fn is_iterable(value: &Value) -> bool {
    matches!(
        value,
        Value::Undefined | Value::Array(_) | Value::Object(_) | Value::String(_) | Value::Safe(_)
    )
}

fn is_sequence(value: &Value) -> bool {
    matches!(
        value,
        Value::Array(_) | Value::Object(_) | Value::String(_) | Value::Safe(_)
    )
}

/// Python `str.islower`: some cased character, and none upper-case.
fn is_lower(s: &str) -> bool {
    s.chars().any(char::is_lowercase) && !s.chars().any(char::is_uppercase)
}

/// Python `str.isupper`.
fn is_upper(s: &str) -> bool {
    s.chars().any(char::is_uppercase) && !s.chars().any(char::is_lowercase)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{eval, render, render_with};
    use prompt_jinja_core::{RenderErrorKind, RenderOptions};
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("{% set foo = true %}{{ foo is defined }}", "True")]
    #[case("{% set foo = true %}{{ not foo is defined }}", "False")]
    #[case("{% set foo = true %}{{ foo is true }}", "True")]
    #[case("{% set foo = true %}{{ foo is false }}", "False")]
    #[case("{% set foo = false %}{{ foo is not true }}", "True")]
    #[case("{% set foo = false %}{{ foo is not false }}", "False")]
    #[case("{{ foo is undefined }},{{ foo is none }}", "True,False")]
    #[case("{{ {} is mapping }},{{ '' is mapping }}", "True,False")]
    #[case("{{ {} is iterable }},{{ '' is iterable }}", "True,True")]
    #[case("{{ [] is iterable }},{{ 3 is iterable }}", "True,False")]
    #[case("{{ [] is not number }},{{ 1 is not string }}", "True,True")]
    #[case("{{ 1 is integer }},{{ 1.0 is integer }},{{ 1.0 is float }}", "True,False,True")]
    #[case("{{ true is boolean }},{{ 1 is boolean }},{{ true is number }}", "True,False,True")]
    #[case("{{ 'a' is sequence }},{{ 1 is sequence }}", "True,False")]
    #[case("{{ none is none }},{{ range is callable }}", "True,True")]
    fn type_tests(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(render(source).unwrap(), expected);
    }

    #[rstest]
    #[case("3 is odd", "True")]
    #[case("(-3) is odd", "True")]
    #[case("4 is even", "True")]
    #[case("9 is divisibleby 3", "True")]
    #[case("9 is divisibleby(4)", "False")]
    #[case("2 is equalto 2", "True")]
    #[case("2 is eq 2.0", "True")]
    #[case("2 is ne 3", "True")]
    #[case("2 is lt 3", "True")]
    #[case("3 is le 3", "True")]
    #[case("'b' is gt 'a'", "True")]
    #[case("3 is ge 4", "False")]
    #[case("'a' is in ['a', 'b']", "True")]
    #[case("'z' is in 'abc'", "False")]
    #[case("'abc' is lower", "True")]
    #[case("'aBc' is lower", "False")]
    #[case("'ABC' is upper", "True")]
    #[case("'' is upper", "False")]
    #[case("('<b>' | safe) is escaped", "True")]
    #[case("'<b>' is escaped", "False")]
    fn value_tests(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(eval(source), expected);
    }

    #[rstest]
    #[case("[1, 2, 3, 4] | select('>', 2) | list", "[3, 4]")]
    #[case("[1, 2, 3, 4] | reject('<=', 2) | list", "[3, 4]")]
    #[case("[1, 2, 3] | select('!=', 2) | list", "[1, 3]")]
    #[case("[1, 2, 3, 4] | select('odd') | list", "[1, 3]")]
    #[case("[{'role': 'user'}, {'role': 'tool'}] | selectattr('role', '==', 'tool') | list | length", "1")]
    fn operator_aliases_in_selections(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(eval(source), expected);
    }

    #[test]
    fn sameas_is_identity() {
        let out = render_with(
            "{% set a = [] %}{% set b = [] %}{{ a is sameas a }},{{ a is sameas b }},{{ a == b }}",
            json!({}),
            RenderOptions::default(),
        )
        .unwrap();
        assert_eq!(out, "True,False,True");
    }

    #[test]
    fn tests_see_undefined_in_strict_mode() {
        let out = render_with(
            "{{ missing is defined }},{{ missing.attr is undefined }}",
            json!({}),
            RenderOptions::strict(),
        )
        .unwrap();
        assert_eq!(out, "False,True");
    }

    #[test]
    fn argument_errors() {
        let err = render("{{ 1 is equalto }}").unwrap_err();
        assert_eq!(err.message, "equalto() missing required argument 'value'");
        let err = render("{{ 'a' is odd }}").unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::Type);
        let err = render("{{ 3 is divisibleby 0 }}").unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::Value);
        let err = render("{{ 1 is defined(2) }}").unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::Type);
    }
}
