//! Numeric conversion and rounding filters.

use prompt_jinja_core::{RenderError, RenderResult};
use prompt_jinja_runtime::{Args, Registry, State, Value};

pub(super) fn register(registry: &mut Registry) {
    registry
        .register_filter("int", int)
        .register_filter("float", float)
        .register_filter("round", round)
        .register_filter("abs", abs);
}

/// `int(default=0, base=10)`: anything that does not convert becomes `default`.
fn int(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    let [default, base] = args.bind("int", ["default", "base"])?;
    let default = if default.is_undefined() { Value::Int(0) } else { default };
    let base = match base.as_i64() {
        None => 10,
        Some(b) if (2..=36).contains(&b) => b as u32,
        Some(_) => return Err(RenderError::value("int() base must be >= 2 and <= 36")),
    };
    let converted = match &value {
        Value::Int(i) => Some(*i),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Float(f) => float_to_int(*f),
        Value::String(s) | Value::Safe(s) => parse_int(s, base),
        _ => None,
    };
    Ok(converted.map_or(default, Value::Int))
}

fn float_to_int(f: f64) -> Option<i64> {
    let truncated = f.trunc();
    (truncated.is_finite() && truncated.abs() < 9.2e18).then_some(truncated as i64)
}

fn parse_int(s: &str, base: u32) -> Option<i64> {
    let s = s.trim();
    let digits = match base {
        16 => strip_prefix_ci(s, "0x"),
        8 => strip_prefix_ci(s, "0o"),
        2 => strip_prefix_ci(s, "0b"),
        _ => s.to_string(),
    };
    if let Ok(i) = i64::from_str_radix(&digits.replace('_', ""), base) {
        return Some(i);
    }
    if base == 10 {
        return s.parse::<f64>().ok().and_then(float_to_int);
    }
    None
}

fn strip_prefix_ci(s: &str, prefix: &str) -> String {
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.strip_prefix('+').unwrap_or(s)),
    };
    let rest = match rest.get(..2) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &rest[2..],
        _ => rest,
    };
    format!("{sign}{rest}")
}

/// `float(default=0.0)`.
fn float(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    let [default] = args.bind("float", ["default"])?;
    let default = if default.is_undefined() { Value::Float(0.0) } else { default };
    let converted = match &value {
        Value::String(s) | Value::Safe(s) => s.trim().replace('_', "").parse::<f64>().ok(),
        other => other.as_f64(),
    };
    Ok(converted.map_or(default, Value::Float))
}

/// `round(precision=0, method='common')`; always a float.
fn round(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    let [precision, method] = args.bind("round", ["precision", "method"])?;
    let Some(x) = value.as_f64() else {
        return Err(RenderError::type_error(format!(
            "round() requires a number, not '{}'",
            value.type_name()
        )));
    };
    let precision = match &precision {
        Value::Undefined | Value::None => 0,
        other => other.as_i64().ok_or_else(|| {
            RenderError::type_error("round() precision must be an integer")
        })?,
    };
    let factor = 10f64.powi(precision.clamp(-308, 308) as i32);
    let rounded = match method.as_str() {
        None | Some("common") => round_half_even(x, precision),
        Some("ceil") => (x * factor).ceil() / factor,
        Some("floor") => (x * factor).floor() / factor,
        Some(_) => {
            return Err(RenderError::value("method must be common, ceil or floor"));
        }
    };
    Ok(Value::Float(rounded))
}

/// Round the exact binary value of `x` to `digits` decimal places, ties to even.
///
/// `2.675` is stored as `2.67499999...`, so it rounds down to `2.67`.
fn round_half_even(x: f64, digits: i64) -> f64 {
    if !x.is_finite() || x == 0.0 {
        return x;
    }
    if digits <= 0 {
        let factor = 10f64.powi(digits.unsigned_abs().min(308) as i32);
        return ((x / factor).round_ties_even() * factor).copysign(x);
    }
    if digits > 22 {
        let factor = 10f64.powi(digits.min(308) as i32);
        return (x * factor).round_ties_even() / factor;
    }
    if x.fract() == 0.0 {
        return x;
    }

    // |x| = mantissa * 2^-shift, and mantissa * 10^22 still fits in a u128.
    let bits = x.abs().to_bits();
    let biased = ((bits >> 52) & 0x7ff) as u32;
    let fraction = bits & ((1 << 52) - 1);
    let (mantissa, shift) = if biased == 0 {
        (fraction, 1074)
    } else {
        (fraction | (1 << 52), 1075 - biased)
    };
    let scaled = u128::from(mantissa) * 10u128.pow(digits as u32);
    let quotient = if shift >= 128 {
        0
    } else {
        let quotient = scaled >> shift;
        let remainder = scaled & ((1u128 << shift) - 1);
        let half = 1u128 << (shift - 1);
        if remainder > half || (remainder == half && quotient & 1 == 1) {
            quotient + 1
        } else {
            quotient
        }
    };
    format!("{quotient}e-{digits}")
        .parse::<f64>()
        .map_or(x, |rounded| rounded.copysign(x))
}

fn abs(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    args.expect_empty("abs")?;
    match &value {
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => match other.as_i64() {
            Some(i) => i
                .checked_abs()
                .map(Value::Int)
                .ok_or_else(|| RenderError::value("integer overflow in abs()")),
            None => Err(RenderError::type_error(format!(
                "bad operand type for abs(): '{}'",
                other.type_name()
            ))),
        },
    }
}
