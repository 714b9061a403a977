//! Filters over sequences and mappings.

use prompt_jinja_core::{RenderError, RenderResult};
use prompt_jinja_runtime::args::required;
use prompt_jinja_runtime::{Args, Key, Registry, State, Value};

use super::{attribute_name, attribute_path, fold_case, items_of, markup, sort_by_key};

pub(super) fn register(registry: &mut Registry) {
    registry
        .register_filter("join", join)
        .register_filter("map", map)
        .register_filter("select", select)
        .register_filter("reject", reject)
        .register_filter("selectattr", selectattr)
        .register_filter("rejectattr", rejectattr)
        .register_filter("sort", sort)
        .register_filter("dictsort", dictsort)
        .register_filter("unique", unique)
        .register_filter("reverse", reverse)
        .register_filter("list", list)
        .register_filter("items", items)
        .register_filter("length", length)
        .register_filter("count", length)
        .register_filter("first", first)
        .register_filter("last", last)
        .register_filter("sum", sum)
        .register_filter("min", min)
        .register_filter("max", max)
        .register_filter("batch", batch)
        .register_filter("attr", attr);
}

/// `join(d='', attribute=None)`; with autoescape on, unsafe parts are
/// escaped and the result is safe.
fn join(state: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    let [separator, attribute] = args.bind("join", ["d", "attribute"])?;
    let mut items = items_of(&value)?;
    if let Some(path) = attribute_name(&attribute, "join")? {
        items = items.iter().map(|item| attribute_path(item, path)).collect();
    }
    if state.autoescape() {
        let separator = markup(&separator);
        let parts: Vec<String> = items.iter().map(markup).collect();
        return Ok(Value::safe(parts.join(&separator)));
    }
    let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
    Ok(Value::from(parts.join(&separator.to_string())))
}

/// `map('filter', *args)` or `map(attribute='x', default=None)`.
fn map(state: &mut State<'_>, value: Value, mut args: Args) -> RenderResult<Value> {
    let items = items_of(&value)?;
    if let Some(attribute) = args.take_named("attribute") {
        let default = args.take_named("default").unwrap_or_default();
        args.expect_empty("map")?;
        let Some(path) = attribute_name(&attribute, "map")? else {
            return Err(RenderError::type_error("map() attribute must be a string"));
        };
        let mapped = items
            .iter()
            .map(|item| match attribute_path(item, path) {
                Value::Undefined => default.clone(),
                found => found,
            })
            .collect();
        return Ok(Value::array(mapped));
    }

    let name = take_name(&mut args, "map")?;
    let mut mapped = Vec::with_capacity(items.len());
    for item in items {
        mapped.push(state.apply_filter(&name, item, args.clone())?);
    }
    Ok(Value::array(mapped))
}

fn take_name(args: &mut Args, func: &str) -> RenderResult<String> {
    if args.positional.is_empty() {
        return Err(RenderError::type_error(format!(
            "{func}() missing required argument 'name'"
        )));
    }
    let name = args.positional.remove(0);
    name.as_str().map(str::to_string).ok_or_else(|| {
        RenderError::type_error(format!(
            "{func}() name must be a string, not {}",
            name.type_name()
        ))
    })
}

// ============================================================================
// select / reject
// ============================================================================

/// Keep (or drop) items for which a test passes. The test subject is the
/// item itself, or one of its attributes for the `*attr` variants. Without
/// a test name the subject's truthiness decides.
fn keep_if(
    state: &mut State<'_>,
    value: &Value,
    mut args: Args,
    func: &str,
    by_attribute: bool,
    keep: bool,
) -> RenderResult<Value> {
    let items = items_of(value)?;
    let path = if by_attribute { Some(take_name(&mut args, func)?) } else { None };
    let test = if args.positional.is_empty() {
        None
    } else {
        Some(take_name(&mut args, func)?)
    };

    let mut kept = Vec::new();
    for item in items {
        let subject = match &path {
            Some(path) => attribute_path(&item, path),
            None => item.clone(),
        };
        let passed = match &test {
            Some(test) => state.apply_test(test, &subject, args.clone())?,
            None => subject.is_truthy(),
        };
        if passed == keep {
            kept.push(item);
        }
    }
    Ok(Value::array(kept))
}

fn select(state: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    keep_if(state, &value, args, "select", false, true)
}

fn reject(state: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    keep_if(state, &value, args, "reject", false, false)
}

fn selectattr(state: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    keep_if(state, &value, args, "selectattr", true, true)
}

fn rejectattr(state: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    keep_if(state, &value, args, "rejectattr", true, false)
}

// ============================================================================
// Ordering
// ============================================================================

/// `sort(reverse=false, case_sensitive=false, attribute=None)`, stable.
fn sort(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    let [reverse, case_sensitive, attribute] =
        args.bind("sort", ["reverse", "case_sensitive", "attribute"])?;
    let path = attribute_name(&attribute, "sort")?;
    let mut pairs: Vec<(Value, Value)> = items_of(&value)?
        .into_iter()
        .map(|item| {
            let key = match path {
                Some(path) => attribute_path(&item, path),
                None => item.clone(),
            };
            (fold_case(&key, case_sensitive.is_truthy()), item)
        })
        .collect();
    sort_by_key(&mut pairs, reverse.is_truthy())?;
    Ok(Value::array(pairs.into_iter().map(|(_, item)| item).collect()))
}

/// `dictsort(case_sensitive=false, by='key', reverse=false)`: `[key, value]`
/// pairs sorted by key or value.
fn dictsort(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    let [case_sensitive, by, reverse] = args.bind("dictsort", ["case_sensitive", "by", "reverse"])?;
    let Some(map) = value.as_object() else {
        return Err(RenderError::type_error("dictsort filter requires a mapping"));
    };
    let by_value = match by.as_str() {
        None | Some("key") => false,
        Some("value") => true,
        Some(_) => {
            return Err(RenderError::value("You can only sort by either 'key' or 'value'"));
        }
    };
    let mut pairs: Vec<(Value, Value)> = map
        .borrow()
        .iter()
        .map(|(k, v)| {
            let key = if by_value { v.clone() } else { k.to_value() };
            let pair = Value::array(vec![k.to_value(), v.clone()]);
            (fold_case(&key, case_sensitive.is_truthy()), pair)
        })
        .collect();
    sort_by_key(&mut pairs, reverse.is_truthy())?;
    Ok(Value::array(pairs.into_iter().map(|(_, pair)| pair).collect()))
}

/// `unique(case_sensitive=false, attribute=None)`: first occurrences, in order.
fn unique(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    let [case_sensitive, attribute] = args.bind("unique", ["case_sensitive", "attribute"])?;
    let path = attribute_name(&attribute, "unique")?;
    let mut seen: Vec<Value> = Vec::new();
    let mut kept = Vec::new();
    for item in items_of(&value)? {
        let key = match path {
            Some(path) => attribute_path(&item, path),
            None => item.clone(),
        };
        let key = fold_case(&key, case_sensitive.is_truthy());
        if !seen.iter().any(|s| s.equals(&key)) {
            seen.push(key);
            kept.push(item);
        }
    }
    Ok(Value::array(kept))
}

fn reverse(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    args.expect_empty("reverse")?;
    if let Some(s) = value.as_str() {
        return Ok(Value::from(s.chars().rev().collect::<String>()));
    }
    let mut items = items_of(&value)?;
    items.reverse();
    Ok(Value::array(items))
}

fn min(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    extreme(value, args, "min", std::cmp::Ordering::Less)
}

fn max(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    extreme(value, args, "max", std::cmp::Ordering::Greater)
}

/// The first item whose key orders `wanted` against every other; undefined
/// for an empty input.
fn extreme(value: Value, args: Args, func: &str, wanted: std::cmp::Ordering) -> RenderResult<Value> {
    let [case_sensitive, attribute] = args.bind(func, ["case_sensitive", "attribute"])?;
    let path = attribute_name(&attribute, func)?;
    let mut best: Option<(Value, Value)> = None;
    for item in items_of(&value)? {
        let key = match path {
            Some(path) => attribute_path(&item, path),
            None => item.clone(),
        };
        let key = fold_case(&key, case_sensitive.is_truthy());
        let better = match &best {
            None => true,
            Some((best_key, _)) => key.compare(best_key)? == wanted,
        };
        if better {
            best = Some((key, item));
        }
    }
    Ok(best.map(|(_, item)| item).unwrap_or_default())
}

// ============================================================================
// Conversion and access
// ============================================================================

fn list(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    args.expect_empty("list")?;
    Ok(Value::array(value.try_iter()?))
}

/// `[key, value]` pairs of a mapping.
fn items(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    args.expect_empty("items")?;
    match &value {
        Value::Undefined => Ok(Value::array(Vec::new())),
        Value::Object(map) => Ok(Value::array(
            map.borrow()
                .iter()
                .map(|(k, v)| Value::array(vec![k.to_value(), v.clone()]))
                .collect(),
        )),
        _ => Err(RenderError::type_error("Can only get item pairs from a mapping")),
    }
}

fn length(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    args.expect_empty("length")?;
    Ok(Value::from(value.len()?))
}

fn first(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    args.expect_empty("first")?;
    Ok(items_of(&value)?.into_iter().next().unwrap_or_default())
}

fn last(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    args.expect_empty("last")?;
    Ok(items_of(&value)?.pop().unwrap_or_default())
}

/// `sum(attribute=None, start=0)`.
fn sum(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    let [attribute, start] = args.bind("sum", ["attribute", "start"])?;
    let path = attribute_name(&attribute, "sum")?;
    let mut total = if start.is_undefined() { Value::Int(0) } else { start };
    for item in items_of(&value)? {
        let term = match path {
            Some(path) => attribute_path(&item, path),
            None => item,
        };
        total = total.add(&term)?;
    }
    Ok(total)
}

/// `batch(linecount, fill_with=None)`: lists of `linecount` items; the last
/// one is padded with `fill_with` when given.
fn batch(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    let [linecount, fill_with] = args.bind("batch", ["linecount", "fill_with"])?;
    let size = required(linecount, "batch", "linecount")?
        .as_i64()
        .and_then(|n| usize::try_from(n).ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| RenderError::value("batch() linecount must be a positive integer"))?;
    let items = items_of(&value)?;
    let mut batches: Vec<Value> = Vec::with_capacity(items.len().div_ceil(size));
    for chunk in items.chunks(size) {
        let mut chunk = chunk.to_vec();
        if !fill_with.is_undefined() {
            chunk.resize(size, fill_with.clone());
        }
        batches.push(Value::array(chunk));
    }
    Ok(Value::array(batches))
}

/// `attr(name)`: attribute lookup without subscript fallback.
fn attr(_: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    let [name] = args.bind("attr", ["name"])?;
    let name = required(name, "attr", "name")?;
    let Some(name) = name.as_str() else {
        return Err(RenderError::type_error("attr() name must be a string"));
    };
    match &value {
        Value::Object(map) => Ok(map.borrow().get(&Key::from(name)).cloned().unwrap_or_default()),
        _ => Ok(Value::Undefined),
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{eval, render, render_escaped, render_with};
    use prompt_jinja_core::{RenderErrorKind, RenderOptions};
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("[1, 2, 3] | join(', ')", "1, 2, 3")]
    #[case("[1, 2, 3] | join", "123")]
    #[case("[{'n': 'a'}, {'n': 'b'}] | join('-', attribute='n')", "a-b")]
    #[case("'Tools: ' + [1, 2, 3] | reject('equalto', 2) | join(', ') + '...'", "Tools: 1, 3...")]
    #[case("'Tools: ' + [1, 2, 3] | select('equalto', 2) | join(', ') + '...'", "Tools: 2...")]
    #[case("['a', 'b', 'c', 'a'] | select('in', ['a']) | list", "['a', 'a']")]
    #[case("[0, 1, '', 'x'] | select | list", "[1, 'x']")]
    #[case("[0, 1, '', 'x'] | reject | list", "[0, '']")]
    #[case("[{'a': 1}, {'a': 2}, {}] | selectattr('a', 'equalto', 1) | list", "[{'a': 1}]")]
    #[case("[{'a': 1}, {'a': 2}, {}] | rejectattr('a', 'equalto', 1) | list", "[{'a': 2}, {}]")]
    #[case("[{'a': 1}, {'b': 2}] | selectattr('a') | list", "[{'a': 1}]")]
    #[case("none | selectattr('foo', 'equalto', 'bar') | list", "[]")]
    #[case("[{'a': 1}, {'a': 2}] | map(attribute='a') | list", "[1, 2]")]
    #[case("[{'a': 1}, {}] | map(attribute='a', default=0) | list", "[1, 0]")]
    #[case("['', 'a'] | map('length') | list", "[0, 1]")]
    #[case("{1: 2}.items() | map('list') | list", "[[1, 2]]")]
    #[case("['a', 'b'] | map('upper') | join", "AB")]
    fn joins_maps_and_selections(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(eval(source), expected);
    }

    #[rstest]
    #[case("[3, 1, 2] | sort", "[1, 2, 3]")]
    #[case("[3, 1, 2] | sort(reverse=true)", "[3, 2, 1]")]
    #[case("['b', 'A', 'c'] | sort", "['A', 'b', 'c']")]
    #[case("['b', 'A', 'c'] | sort(case_sensitive=true)", "['A', 'b', 'c']")]
    #[case("['b', 'a', 'B'] | sort", "['a', 'b', 'B']")]
    #[case("[{'n': 2}, {'n': 1}] | sort(attribute='n') | map(attribute='n') | list", "[1, 2]")]
    #[case("{1: 2, 3: 4, 5: 7} | dictsort | tojson", "[[1, 2], [3, 4], [5, 7]]")]
    #[case("{'b': 1, 'a': 2} | dictsort", "[['a', 2], ['b', 1]]")]
    #[case("{'b': 1, 'a': 2} | dictsort(by='value')", "[['b', 1], ['a', 2]]")]
    #[case("{'b': 1, 'a': 2} | dictsort(reverse=true)", "[['b', 1], ['a', 2]]")]
    #[case("[1, False, 2, '3', 1, '3', False] | unique | list", "[1, False, 2, '3']")]
    #[case("['a', 'A', 'b'] | unique | list", "['a', 'b']")]
    #[case("['a', 'A', 'b'] | unique(case_sensitive=true) | list", "['a', 'A', 'b']")]
    #[case("[1, 2, 3] | reverse | list", "[3, 2, 1]")]
    #[case("'abc' | reverse", "cba")]
    #[case("[4, 2, 8] | min ~ [4, 2, 8] | max", "28")]
    #[case("['b', 'A'] | min", "A")]
    #[case("[] | max", "")]
    #[case("[{'n': 2}, {'n': 5}] | max(attribute='n')", "{'n': 5}")]
    fn ordering(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(eval(source), expected);
    }

    #[rstest]
    #[case("'abc' | list", "['a', 'b', 'c']")]
    #[case("{'a': 1, 'b': 2} | list", "['a', 'b']")]
    #[case("{1: 2} | items | list | tojson", "[[1, 2]]")]
    #[case("missing | items", "[]")]
    #[case("'123456789' | length", "9")]
    #[case("{'a': 1} | count", "1")]
    #[case("'a' + [] | length | string + 'b'", "a0b")]
    #[case("range(5) | length % 2 == 1", "True")]
    #[case("range(3) | last", "2")]
    #[case("'xyz' | first", "x")]
    #[case("[] | first", "")]
    #[case("[1, 2, 3] | sum", "6")]
    #[case("[1, 2.5] | sum(start=10)", "13.5")]
    #[case("[{'n': 2}, {'n': 3}] | sum(attribute='n')", "5")]
    #[case("[1, 2, 3, 4, 5] | batch(2)", "[[1, 2], [3, 4], [5]]")]
    #[case("[1, 2, 3] | batch(2, fill_with=0)", "[[1, 2], [3, 0]]")]
    #[case("{'a': 1} | attr('a')", "1")]
    #[case("{'a': 1} | attr('b') is undefined", "True")]
    fn conversions_and_access(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(eval(source), expected);
    }

    #[rstest]
    #[case("{{ '' | items }}")]
    #[case("{{ [] | items }}")]
    #[case("{{ None | items }}")]
    fn items_requires_a_mapping(#[case] source: &str) {
        let err = render(source).unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::Type);
        assert!(err.message.contains("Can only get item pairs from a mapping"));
    }

    #[test]
    fn join_escapes_under_autoescape() {
        let source = "{{ ['<a>', '&'] | join(' | ') }}|{{ ['<b>' | safe, 'x'] | join }}";
        assert_eq!(render(source).unwrap(), "<a> | &|<b>x");
        assert_eq!(render_escaped(source).unwrap(), "&lt;a&gt; | &amp;|<b>x");
    }

    #[test]
    fn sort_rejects_mixed_types() {
        let err = render("{{ [1, 'a'] | sort }}").unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::Type);
    }

    #[test]
    fn dictsort_rejects_unknown_sort_target() {
        let err = render("{{ {'a': 1} | dictsort(by='nope') }}").unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::Value);
    }

    #[test]
    fn batch_rejects_non_positive_sizes() {
        let err = render("{{ [1] | batch(0) }}").unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::Value);
    }

    #[test]
    fn map_passes_extra_arguments_to_the_filter() {
        let out = render_with(
            "{{ names | map('replace', 'a', 'o') | join(',') }}",
            json!({"names": ["ab", "ca"]}),
            RenderOptions::default(),
        )
        .unwrap();
        assert_eq!(out, "ob,co");
    }
}
