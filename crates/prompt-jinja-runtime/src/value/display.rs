//! String conversion: Python `str` for output, Python `repr` inside containers.

use std::fmt;

use super::{Callable, Value};

/// Format a float the way Python's `repr` does.
///
/// Rust's shortest round-trip digits are kept; only the layout changes:
/// integral values get a trailing `.0` and very large or very small
/// magnitudes use a signed two-digit exponent (`1e+20`, `1.5e-07`).
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let sci = format!("{f:e}");
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((&sci, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if f == 0.0 || (-4..16).contains(&exponent) {
        let mut out = f.to_string();
        if !out.contains('.') {
            out.push_str(".0");
        }
        return out;
    }
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
}

/// Replace `& < > " '` with HTML entities.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn write_string_repr(s: &str, out: &mut String) {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

impl Value {
    /// Append the Python `repr` of this value.
    pub fn write_repr(&self, out: &mut String) {
        match self {
            Value::Undefined | Value::None => out.push_str("None"),
            Value::String(s) | Value::Safe(s) => write_string_repr(s, out),
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_repr(out);
                }
                out.push(']');
            }
            Value::Object(map) => {
                out.push('{');
                for (i, (key, value)) in map.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    key.to_value().write_repr(out);
                    out.push_str(": ");
                    value.write_repr(out);
                }
                out.push('}');
            }
            other => out.push_str(&other.to_string()),
        }
    }

    pub fn repr(&self) -> String {
        let mut out = String::new();
        self.write_repr(&mut out);
        out
    }
}

/// Python `str`: what `{{ value }}` prints.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => Ok(()),
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::String(s) | Value::Safe(s) => f.write_str(s),
            Value::Array(_) | Value::Object(_) => f.write_str(&self.repr()),
            Value::Callable(c) => match c.as_ref() {
                Callable::Native { name, .. } => write!(f, "<function {name}>"),
                Callable::Macro { def, .. } => write!(f, "<macro {}>", def.name.name),
            },
        }
    }
}
