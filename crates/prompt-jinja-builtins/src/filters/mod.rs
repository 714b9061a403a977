//! Built-in filters.
//!
//! - **sequence** - `join`, `map`, `select`, `sort`, `unique`, `batch`, ...
//! - **string** - `trim`, `indent`, `replace`, `truncate`, `escape`, ...
//! - **numeric** - `int`, `float`, `round`, `abs`
//! - **serial** - `tojson`

mod numeric;
mod sequence;
mod serial;
mod string;

use std::cmp::Ordering;

use prompt_jinja_core::{RenderError, RenderResult};
use prompt_jinja_runtime::{Registry, Value, value::escape_html};

pub(crate) fn register(registry: &mut Registry) {
    sequence::register(registry);
    string::register(registry);
    numeric::register(registry);
    serial::register(registry);
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Items of a filter input; `None` and undefined inputs are empty.
pub(crate) fn items_of(value: &Value) -> RenderResult<Vec<Value>> {
    match value {
        Value::None | Value::Undefined => Ok(Vec::new()),
        other => other.try_iter(),
    }
}

/// Follow a dotted attribute path such as `"function.name"` or `"0.a"`.
pub(crate) fn attribute_path(value: &Value, path: &str) -> Value {
    let mut current = value.clone();
    for part in path.split('.') {
        match current.get_attr(part) {
            Some(next) => current = next,
            None => return Value::Undefined,
        }
    }
    current
}

/// The `attribute=` argument as a path string.
pub(crate) fn attribute_name<'a>(value: &'a Value, func: &str) -> RenderResult<Option<&'a str>> {
    match value {
        Value::Undefined | Value::None => Ok(None),
        other => other.as_str().map(Some).ok_or_else(|| {
            RenderError::type_error(format!("{func}() attribute must be a string"))
        }),
    }
}

/// Lower-cases strings when comparisons ignore case.
pub(crate) fn fold_case(value: &Value, case_sensitive: bool) -> Value {
    match value.as_str() {
        Some(s) if !case_sensitive => Value::from(s.to_lowercase()),
        _ => value.clone(),
    }
}

/// Stable sort of `(key, item)` pairs by key, surfacing the first
/// comparison error.
pub(crate) fn sort_by_key(pairs: &mut [(Value, Value)], reverse: bool) -> RenderResult<()> {
    let mut error = None;
    pairs.sort_by(|(a, _), (b, _)| {
        let ordering = a.compare(b).unwrap_or_else(|e| {
            error.get_or_insert(e);
            Ordering::Equal
        });
        if reverse { ordering.reverse() } else { ordering }
    });
    error.map_or(Ok(()), Err)
}

/// Text of `value` as markup: safe strings verbatim, everything else escaped.
pub(crate) fn markup(value: &Value) -> String {
    match value {
        Value::Safe(s) => s.to_string(),
        other => escape_html(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompt_jinja_runtime::Map;

    #[test]
    fn attribute_paths_walk_objects_and_arrays() {
        let mut inner = Map::default();
        inner.insert("name".into(), Value::from("ipython"));
        let mut outer = Map::default();
        outer.insert("function".into(), Value::object(inner));
        let value = Value::array(vec![Value::object(outer)]);
        assert_eq!(attribute_path(&value, "0.function.name"), Value::from("ipython"));
        assert!(attribute_path(&value, "0.missing.name").is_undefined());
    }

    #[test]
    fn sort_surfaces_comparison_errors() {
        let mut pairs = vec![
            (Value::Int(1), Value::Int(1)),
            (Value::from("a"), Value::from("a")),
        ];
        let err = sort_by_key(&mut pairs, false).unwrap_err();
        assert!(err.message.contains("not supported between"));
    }
}
