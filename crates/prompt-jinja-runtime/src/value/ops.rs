//! Operators on values: equality, ordering, arithmetic, membership,
//! subscripts and slices.

use std::cmp::Ordering;
use std::rc::Rc;

use prompt_jinja_core::{RenderError, RenderResult};
use prompt_jinja_parser::ast::BinaryOp;

use super::{Key, Value};

// ============================================================================
// Equality and Ordering
// ============================================================================

impl Value {
    /// Structural equality with int/float/bool promotion.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::None, Value::None) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::String(a) | Value::Safe(a), Value::String(b) | Value::Safe(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v.equals(w)))
            }
            (Value::Callable(a), Value::Callable(b)) => Rc::ptr_eq(a, b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    /// Ordering for `<`-style comparisons and sorting.
    pub fn compare(&self, other: &Value) -> RenderResult<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::String(a) | Value::Safe(a), Value::String(b) | Value::Safe(b)) => Ok(a.cmp(b)),
            (Value::Array(a), Value::Array(b)) => {
                let (a, b) = (a.borrow().clone(), b.borrow().clone());
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        ord => return Ok(ord),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Ok(x.partial_cmp(&y).unwrap_or(Ordering::Equal)),
                _ => Err(RenderError::type_error(format!(
                    "'<' not supported between instances of '{}' and '{}'",
                    a.type_name(),
                    b.type_name()
                ))),
            },
        }
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

fn unsupported(op: BinaryOp, a: &Value, b: &Value) -> RenderError {
    RenderError::type_error(format!(
        "unsupported operand type(s) for {op}: '{}' and '{}'",
        a.type_name(),
        b.type_name()
    ))
}

fn overflow(op: BinaryOp) -> RenderError {
    RenderError::value(format!("integer overflow in '{op}'"))
}

fn division_by_zero() -> RenderError {
    RenderError::value("division by zero")
}

/// Longest string (in bytes) or list `*` may build.
pub const MAX_REPEAT_LEN: usize = 10_000_000;

/// `seq * times` for a string or list; a negative count gives an empty result.
fn repeat(seq: &Value, times: i64) -> RenderResult<Value> {
    let times = usize::try_from(times).unwrap_or(0);
    let checked_len = |len: usize| {
        len.checked_mul(times)
            .filter(|&total| total <= MAX_REPEAT_LEN)
            .ok_or_else(|| {
                RenderError::value(format!(
                    "repeated {} would be longer than {MAX_REPEAT_LEN}",
                    seq.type_name()
                ))
            })
    };
    match seq {
        Value::String(s) | Value::Safe(s) => {
            checked_len(s.len())?;
            Ok(Value::from(s.repeat(times)))
        }
        Value::Array(items) => {
            let items = items.borrow();
            let mut out = Vec::with_capacity(checked_len(items.len())?);
            for _ in 0..times {
                out.extend(items.iter().cloned());
            }
            Ok(Value::array(out))
        }
        other => Err(RenderError::type_error(format!(
            "can't multiply sequence of type '{}'",
            other.type_name()
        ))),
    }
}

/// Apply a non-short-circuiting binary operator.
///
/// `and` / `or` take both operands already evaluated; the evaluator
/// short-circuits them before getting here.
pub fn binary_op(op: BinaryOp, a: &Value, b: &Value) -> RenderResult<Value> {
    match op {
        BinaryOp::Equal => Ok(Value::Bool(a.equals(b))),
        BinaryOp::NotEqual => Ok(Value::Bool(!a.equals(b))),
        BinaryOp::Less => Ok(Value::Bool(a.compare(b)? == Ordering::Less)),
        BinaryOp::LessEqual => Ok(Value::Bool(a.compare(b)? != Ordering::Greater)),
        BinaryOp::Greater => Ok(Value::Bool(a.compare(b)? == Ordering::Greater)),
        BinaryOp::GreaterEqual => Ok(Value::Bool(a.compare(b)? != Ordering::Less)),
        BinaryOp::In => Ok(Value::Bool(b.contains(a)?)),
        BinaryOp::NotIn => Ok(Value::Bool(!b.contains(a)?)),
        BinaryOp::Concat => Ok(Value::from(format!("{a}{b}"))),
        BinaryOp::Add => add(a, b),
        BinaryOp::Sub => numeric(op, a, b, i64::checked_sub, |x, y| x - y),
        BinaryOp::Mul => match (a, b) {
            (seq @ (Value::String(_) | Value::Safe(_) | Value::Array(_)), count)
            | (count, seq @ (Value::String(_) | Value::Safe(_) | Value::Array(_))) => match count.as_i64() {
                Some(times) => repeat(seq, times),
                None => Err(unsupported(op, a, b)),
            },
            _ => numeric(op, a, b, i64::checked_mul, |x, y| x * y),
        },
        BinaryOp::Div => {
            let (x, y) = floats(op, a, b)?;
            if y == 0.0 {
                return Err(division_by_zero());
            }
            Ok(Value::Float(x / y))
        }
        BinaryOp::FloorDiv => match (a.as_i64(), b.as_i64()) {
            (Some(_), Some(0)) => Err(division_by_zero()),
            (Some(x), Some(y)) if !a.is_float() && !b.is_float() => {
                let q = x.checked_div(y).ok_or_else(|| overflow(op))?;
                Ok(Value::Int(if x % y != 0 && ((x < 0) != (y < 0)) { q - 1 } else { q }))
            }
            _ => {
                let (x, y) = floats(op, a, b)?;
                if y == 0.0 {
                    return Err(division_by_zero());
                }
                Ok(Value::Float((x / y).floor()))
            }
        },
        BinaryOp::Mod => match (a.as_i64(), b.as_i64()) {
            (Some(_), Some(0)) => Err(division_by_zero()),
            (Some(x), Some(y)) if !a.is_float() && !b.is_float() => {
                let r = x.checked_rem(y).ok_or_else(|| overflow(op))?;
                Ok(Value::Int(if r != 0 && ((r < 0) != (y < 0)) { r + y } else { r }))
            }
            _ => {
                let (x, y) = floats(op, a, b)?;
                if y == 0.0 {
                    return Err(division_by_zero());
                }
                let r = x % y;
                Ok(Value::Float(if r != 0.0 && ((r < 0.0) != (y < 0.0)) { r + y } else { r }))
            }
        },
        BinaryOp::Pow => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) if y >= 0 => {
                let exp = u32::try_from(y).map_err(|_| overflow(op))?;
                x.checked_pow(exp).map(Value::Int).ok_or_else(|| overflow(op))
            }
            _ => {
                let (x, y) = floats(op, a, b)?;
                Ok(Value::Float(x.powf(y)))
            }
        },
        BinaryOp::And | BinaryOp::Or => Ok(if (op == BinaryOp::And) == a.is_truthy() {
            b.clone()
        } else {
            a.clone()
        }),
    }
}

fn add(a: &Value, b: &Value) -> RenderResult<Value> {
    match (a, b) {
        (Value::Safe(x), Value::Safe(y)) => Ok(Value::safe(format!("{x}{y}"))),
        (Value::String(x) | Value::Safe(x), Value::String(y) | Value::Safe(y)) => {
            Ok(Value::from(format!("{x}{y}")))
        }
        (Value::Array(x), Value::Array(y)) => {
            let mut items = x.borrow().clone();
            items.extend(y.borrow().iter().cloned());
            Ok(Value::array(items))
        }
        _ => numeric(BinaryOp::Add, a, b, i64::checked_add, |x, y| x + y),
    }
}

fn numeric(
    op: BinaryOp,
    a: &Value,
    b: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> RenderResult<Value> {
    if !a.is_float() && !b.is_float() {
        if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
            return int_op(x, y).map(Value::Int).ok_or_else(|| overflow(op));
        }
    }
    let (x, y) = floats(op, a, b)?;
    Ok(Value::Float(float_op(x, y)))
}

fn floats(op: BinaryOp, a: &Value, b: &Value) -> RenderResult<(f64, f64)> {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(unsupported(op, a, b)),
    }
}

impl Value {
    fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    /// `self + other`.
    pub fn add(&self, other: &Value) -> RenderResult<Value> {
        add(self, other)
    }

    /// Unary minus.
    pub fn neg(&self) -> RenderResult<Value> {
        match self {
            Value::Float(f) => Ok(Value::Float(-f)),
            other => match other.as_i64() {
                Some(i) => i
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| RenderError::value("integer overflow in unary '-'")),
                None => Err(RenderError::type_error(format!(
                    "bad operand type for unary -: '{}'",
                    other.type_name()
                ))),
            },
        }
    }

    /// Unary plus.
    pub fn pos(&self) -> RenderResult<Value> {
        match self {
            Value::Int(_) | Value::Float(_) => Ok(self.clone()),
            Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
            other => Err(RenderError::type_error(format!(
                "bad operand type for unary +: '{}'",
                other.type_name()
            ))),
        }
    }

    /// `needle in self`.
    pub fn contains(&self, needle: &Value) -> RenderResult<bool> {
        match self {
            Value::Undefined => Ok(false),
            Value::Array(items) => Ok(items.borrow().iter().any(|item| item.equals(needle))),
            Value::Object(map) => Ok(match Key::from_value(needle) {
                Ok(key) => map.borrow().contains_key(&key),
                Err(_) => false,
            }),
            Value::String(s) | Value::Safe(s) => match needle.as_str() {
                Some(sub) => Ok(s.contains(sub)),
                None => Err(RenderError::type_error(format!(
                    "'in <string>' requires string as left operand, not {}",
                    needle.type_name()
                ))),
            },
            other => Err(RenderError::type_error(format!(
                "argument of type '{}' is not iterable",
                other.type_name()
            ))),
        }
    }
}

// ============================================================================
// Subscripts
// ============================================================================

/// Resolve a possibly negative index against a length.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

impl Value {
    /// `self[key]`.
    ///
    /// Returns `Ok(None)` when the key or index does not exist so the caller
    /// can decide between undefined and an error; unsupported subscripts are
    /// type errors.
    pub fn get_item(&self, key: &Value) -> RenderResult<Option<Value>> {
        match self {
            Value::Undefined => Ok(None),
            Value::Object(map) => Ok(map.borrow().get(&Key::from_value(key)?).cloned()),
            Value::Array(items) => match key.as_i64() {
                Some(i) => {
                    let items = items.borrow();
                    Ok(resolve_index(i, items.len()).map(|i| items[i].clone()))
                }
                None => Err(RenderError::type_error(format!(
                    "list indices must be integers, not {}",
                    key.type_name()
                ))),
            },
            Value::String(s) | Value::Safe(s) => match key.as_i64() {
                Some(i) => {
                    let len = s.chars().count();
                    Ok(resolve_index(i, len)
                        .and_then(|i| s.chars().nth(i))
                        .map(|c| Value::from(c.to_string())))
                }
                None => Err(RenderError::type_error(format!(
                    "string indices must be integers, not {}",
                    key.type_name()
                ))),
            },
            other => Err(RenderError::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }

    /// `self[start:stop:step]` on arrays and strings.
    pub fn slice(&self, start: &Value, stop: &Value, step: &Value) -> RenderResult<Value> {
        let step = match step {
            Value::Undefined | Value::None => 1,
            other => other.as_i64().ok_or_else(|| slice_index_error(other))?,
        };
        if step == 0 {
            return Err(RenderError::value("slice step cannot be zero"));
        }
        match self {
            Value::Array(items) => {
                let items = items.borrow();
                let indices = slice_indices(items.len(), start, stop, step)?;
                Ok(Value::array(indices.into_iter().map(|i| items[i].clone()).collect()))
            }
            Value::String(s) | Value::Safe(s) => {
                let chars: Vec<char> = s.chars().collect();
                let indices = slice_indices(chars.len(), start, stop, step)?;
                Ok(Value::from(indices.into_iter().map(|i| chars[i]).collect::<String>()))
            }
            Value::Undefined => Ok(Value::Undefined),
            other => Err(RenderError::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }
}

fn slice_index_error(value: &Value) -> RenderError {
    RenderError::type_error(format!(
        "slice indices must be integers or None, not {}",
        value.type_name()
    ))
}

/// The indices a Python slice visits, bounds clamped as `slice.indices` does.
fn slice_indices(len: usize, start: &Value, stop: &Value, step: i64) -> RenderResult<Vec<usize>> {
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };
    let clamp = |bound: &Value, default: i64| -> RenderResult<i64> {
        let value = match bound {
            Value::Undefined | Value::None => return Ok(default),
            other => other.as_i64().ok_or_else(|| slice_index_error(other))?,
        };
        Ok(if value < 0 {
            (value + len).max(lower)
        } else {
            value.min(upper)
        })
    };
    let start = clamp(start, if step > 0 { lower } else { upper })?;
    let stop = clamp(stop, if step > 0 { upper } else { lower })?;

    let mut out = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        out.push(i as usize);
        i += step;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompt_jinja_core::RenderErrorKind;

    fn list(items: &[i64]) -> Value {
        Value::array(items.iter().map(|i| Value::Int(*i)).collect())
    }

    fn op(op: BinaryOp, a: impl Into<Value>, b: impl Into<Value>) -> RenderResult<Value> {
        binary_op(op, &a.into(), &b.into())
    }

    #[test]
    fn equality_promotes_numbers() {
        assert!(Value::Int(1).equals(&Value::Float(1.0)));
        assert!(Value::Bool(true).equals(&Value::Int(1)));
        assert!(!Value::None.equals(&Value::Undefined));
        assert!(Value::from("a").equals(&Value::safe("a")));
        assert!(list(&[1, 2]).equals(&list(&[1, 2])));
        let a = Value::from_pairs([("x", Value::Int(1)), ("y", Value::Int(2))]);
        let b = Value::from_pairs([("y", Value::Int(2)), ("x", Value::Float(1.0))]);
        assert!(a.equals(&b));
    }

    #[test]
    fn ordering_rejects_mixed_types() {
        assert_eq!(op(BinaryOp::Less, 1, 1.5).unwrap(), Value::Bool(true));
        assert_eq!(op(BinaryOp::Less, "a", "b").unwrap(), Value::Bool(true));
        assert_eq!(op(BinaryOp::Greater, list(&[1, 2]), list(&[1])).unwrap(), Value::Bool(true));
        let err = op(BinaryOp::Less, "a", 1).unwrap_err();
        assert_eq!(err.message, "'<' not supported between instances of 'str' and 'int'");
    }

    #[test]
    fn python_floor_semantics() {
        assert_eq!(op(BinaryOp::FloorDiv, 7, 2).unwrap(), Value::Int(3));
        assert_eq!(op(BinaryOp::FloorDiv, -7, 2).unwrap(), Value::Int(-4));
        assert_eq!(op(BinaryOp::Mod, -7, 2).unwrap(), Value::Int(1));
        assert_eq!(op(BinaryOp::Mod, 7, -2).unwrap(), Value::Int(-1));
        assert_eq!(op(BinaryOp::Mod, 7.5, 2).unwrap(), Value::Float(1.5));
        assert_eq!(op(BinaryOp::FloorDiv, 7.0, 2).unwrap(), Value::Float(3.0));
        assert_eq!(op(BinaryOp::Div, 1, 2).unwrap(), Value::Float(0.5));
        assert_eq!(op(BinaryOp::Div, 4, 2).unwrap(), Value::Float(2.0));
        assert_eq!(op(BinaryOp::Div, 1, 0).unwrap_err().message, "division by zero");
    }

    #[test]
    fn arithmetic_on_sequences() {
        assert_eq!(op(BinaryOp::Add, "a", "b").unwrap(), Value::from("ab"));
        assert_eq!(op(BinaryOp::Add, list(&[1]), list(&[2])).unwrap(), list(&[1, 2]));
        assert_eq!(op(BinaryOp::Mul, "ab", 3).unwrap(), Value::from("ababab"));
        assert_eq!(op(BinaryOp::Mul, 2, list(&[1])).unwrap(), list(&[1, 1]));
        assert_eq!(op(BinaryOp::Mul, "x", -1).unwrap(), Value::from(""));
        assert_eq!(op(BinaryOp::Concat, 1, "a").unwrap(), Value::from("1a"));
        let err = op(BinaryOp::Add, "a", 1).unwrap_err();
        assert_eq!(err.message, "unsupported operand type(s) for +: 'str' and 'int'");
        assert!(op(BinaryOp::Mul, list(&[1]), 1.5).is_err());
    }

    #[test]
    fn repetition_is_capped() {
        let err = op(BinaryOp::Mul, "ab", 1_000_000_000_000i64).unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::Value);
        assert_eq!(err.message, "repeated str would be longer than 10000000");
        let err = op(BinaryOp::Mul, list(&[1, 2]), i64::MAX).unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::Value);
        assert_eq!(op(BinaryOp::Mul, "", i64::MAX).unwrap(), Value::from(""));
    }

    #[test]
    fn bools_are_ints() {
        let yes = Value::Bool(true);
        assert_eq!(op(BinaryOp::Pow, 2, yes.clone()).unwrap(), Value::Int(2));
        assert_eq!(op(BinaryOp::Pow, yes.clone(), 2).unwrap(), Value::Int(1));
        assert_eq!(op(BinaryOp::Mul, "a", yes.clone()).unwrap(), Value::from("a"));
        assert_eq!(op(BinaryOp::Mul, yes.clone(), list(&[1])).unwrap(), list(&[1]));
        assert_eq!(op(BinaryOp::Mul, "a", Value::Bool(false)).unwrap(), Value::from(""));
        assert_eq!(op(BinaryOp::Add, yes.clone(), yes).unwrap(), Value::Int(2));
    }

    #[test]
    fn pow_and_overflow() {
        assert_eq!(op(BinaryOp::Pow, 2, 10).unwrap(), Value::Int(1024));
        assert_eq!(op(BinaryOp::Pow, 2, -1).unwrap(), Value::Float(0.5));
        assert!(op(BinaryOp::Add, i64::MAX, 1).is_err());
    }

    #[test]
    fn membership() {
        assert!(list(&[1, 2]).contains(&Value::Float(2.0)).unwrap());
        assert!(Value::from("abc").contains(&Value::from("bc")).unwrap());
        let obj = Value::from_pairs([("a", Value::Int(1))]);
        assert!(obj.contains(&Value::from("a")).unwrap());
        assert!(!obj.contains(&list(&[])).unwrap());
        assert!(Value::Int(1).contains(&Value::Int(1)).is_err());
    }

    #[test]
    fn negative_indices() {
        let items = list(&[1, 2, 3]);
        assert_eq!(items.get_item(&Value::Int(-1)).unwrap(), Some(Value::Int(3)));
        assert_eq!(items.get_item(&Value::Int(3)).unwrap(), None);
        assert_eq!(Value::from("abc").get_item(&Value::Int(-2)).unwrap(), Some(Value::from("b")));
        assert!(Value::Int(1).get_item(&Value::Int(0)).is_err());
    }

    #[test]
    fn python_slices() {
        let items = list(&[0, 1, 2, 3]);
        let none = Value::None;
        assert_eq!(items.slice(&Value::Int(1), &Value::Int(-1), &none).unwrap(), list(&[1, 2]));
        assert_eq!(items.slice(&none, &none, &Value::Int(-1)).unwrap(), list(&[3, 2, 1, 0]));
        assert_eq!(items.slice(&Value::Int(-2), &none, &none).unwrap(), list(&[2, 3]));
        assert_eq!(items.slice(&none, &none, &Value::Int(2)).unwrap(), list(&[0, 2]));
        assert_eq!(items.slice(&Value::Int(10), &none, &none).unwrap(), list(&[]));
        assert_eq!(
            Value::from("abcdef").slice(&Value::Int(4), &Value::Int(1), &Value::Int(-2)).unwrap(),
            Value::from("ec")
        );
        let err = items.slice(&none, &none, &Value::Int(0)).unwrap_err();
        assert_eq!(err.message, "slice step cannot be zero");
    }
}
