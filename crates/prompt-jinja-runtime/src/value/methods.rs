//! Built-in methods of strings, lists and dicts (`x.upper()`, `x.append(1)`, ...).
//!
//! The evaluator only falls back to this catalog when the object has no
//! callable key of the same name.

use prompt_jinja_core::{RenderError, RenderResult};

use super::{Key, Value};
use crate::args::{Args, required};

/// Invoke the built-in method `name` on `object`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn call_method(object: &Value, name: &str, args: Args) -> RenderResult<Value> {
    match object {
        Value::String(s) | Value::Safe(s) => string_method(s, name, args),
        Value::Array(_) => array_method(object, name, args),
        Value::Object(_) => object_method(object, name, args),
        other => Err(no_method(other, name)),
    }
}

fn no_method(object: &Value, name: &str) -> RenderError {
    RenderError::type_error(format!(
        "'{}' object has no attribute '{name}'",
        object.type_name()
    ))
}

fn expect_str<'a>(value: &'a Value, func: &str) -> RenderResult<&'a str> {
    value.as_str().ok_or_else(|| {
        RenderError::type_error(format!(
            "{func}() argument must be str, not {}",
            value.type_name()
        ))
    })
}

fn optional_int(value: &Value, func: &str, default: i64) -> RenderResult<i64> {
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

// ============================================================================
// Strings
// ============================================================================

fn string_method(s: &str, name: &str, args: Args) -> RenderResult<Value> {
    match name {
        "strip" | "trim" | "lstrip" | "rstrip" => {
            let [chars] = args.bind(name, ["chars"])?;
            let trimmed = match &chars {
                Value::Undefined | Value::None => match name {
                    "lstrip" => s.trim_start(),
                    "rstrip" => s.trim_end(),
                    _ => s.trim(),
                },
                chars => {
                    let set: Vec<char> = expect_str(chars, name)?.chars().collect();
                    let pred = |c: char| set.contains(&c);
                    match name {
                        "lstrip" => s.trim_start_matches(pred),
                        "rstrip" => s.trim_end_matches(pred),
                        _ => s.trim_matches(pred),
                    }
                }
            };
            Ok(Value::from(trimmed))
        }
        "upper" => {
            args.expect_empty(name)?;
            Ok(Value::from(s.to_uppercase()))
        }
        "lower" => {
            args.expect_empty(name)?;
            Ok(Value::from(s.to_lowercase()))
        }
        "title" => {
            args.expect_empty(name)?;
            Ok(Value::from(title_case(s)))
        }
        "capitalize" => {
            args.expect_empty(name)?;
            Ok(Value::from(capitalize(s)))
        }
        "startswith" | "endswith" => {
            let [affix] = args.bind(name, ["prefix"])?;
            let affix = required(affix, name, "prefix")?;
            let candidates = match &affix {
                Value::Array(items) => items.borrow().clone(),
                single => vec![single.clone()],
            };
            for candidate in &candidates {
                let candidate = expect_str(candidate, name)?;
                let hit = if name == "startswith" {
                    s.starts_with(candidate)
                } else {
                    s.ends_with(candidate)
                };
                if hit {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        "split" => {
            let [sep, maxsplit] = args.bind(name, ["sep", "maxsplit"])?;
            let maxsplit = optional_int(&maxsplit, name, -1)?;
            let parts = split(s, &sep, maxsplit)?;
            Ok(Value::array(parts.into_iter().map(Value::from).collect()))
        }
        "replace" => {
            let [old, new, count] = args.bind(name, ["old", "new", "count"])?;
            let old = expect_str(&required(old, name, "old")?, name)?.to_string();
            let new = expect_str(&required(new, name, "new")?, name)?.to_string();
            let count = optional_int(&count, name, -1)?;
            Ok(Value::from(replace(s, &old, &new, count)))
        }
        "join" => {
            let [items] = args.bind(name, ["iterable"])?;
            let items = required(items, name, "iterable")?.try_iter()?;
            let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
            Ok(Value::from(parts.join(s)))
        }
        "count" => {
            let [sub] = args.bind(name, ["sub"])?;
            let sub = expect_str(&required(sub, name, "sub")?, name)?.to_string();
            let count = if sub.is_empty() {
                s.chars().count() + 1
            } else {
                s.matches(sub.as_str()).count()
            };
            Ok(Value::from(count))
        }
        "find" => {
            let [sub] = args.bind(name, ["sub"])?;
            let sub = expect_str(&required(sub, name, "sub")?, name)?.to_string();
            Ok(match s.find(sub.as_str()) {
                Some(byte) => Value::from(s[..byte].chars().count()),
                None => Value::Int(-1),
            })
        }
        "isdigit" | "isalpha" | "isspace" | "isupper" | "islower" => {
            args.expect_empty(name)?;
            let result = !s.is_empty()
                && match name {
                    "isdigit" => s.chars().all(|c| c.is_ascii_digit()),
                    "isalpha" => s.chars().all(char::is_alphabetic),
                    "isspace" => s.chars().all(char::is_whitespace),
                    "isupper" => s.chars().any(char::is_uppercase) && !s.chars().any(char::is_lowercase),
                    _ => s.chars().any(char::is_lowercase) && !s.chars().any(char::is_uppercase),
                };
            Ok(Value::Bool(result))
        }
        _ => Err(no_method(&Value::from(s), name)),
    }
}

/// Python `str.title`: a cased character after an uncased one starts a word.
pub(crate) fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_cased = false;
    for c in s.chars() {
        if prev_cased {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_cased = c.is_alphabetic();
    }
    out
}

pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn split(s: &str, sep: &Value, maxsplit: i64) -> RenderResult<Vec<String>> {
    let limit = usize::try_from(maxsplit).ok();
    match sep {
        Value::Undefined | Value::None => {
            let mut parts = Vec::new();
            let mut rest = s.trim_start();
            while !rest.is_empty() {
                if limit.is_some_and(|n| parts.len() == n) {
                    parts.push(rest.to_string());
                    break;
                }
                let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                parts.push(rest[..end].to_string());
                rest = rest[end..].trim_start();
            }
            Ok(parts)
        }
        sep => {
            let sep = expect_str(sep, "split")?;
            if sep.is_empty() {
                return Err(RenderError::value("empty separator"));
            }
            Ok(match limit {
                Some(n) => s.splitn(n + 1, sep).map(str::to_string).collect(),
                None => s.split(sep).map(str::to_string).collect(),
            })
        }
    }
}

fn replace(s: &str, old: &str, new: &str, count: i64) -> String {
    match usize::try_from(count) {
        Ok(n) => s.replacen(old, new, n),
        Err(_) => s.replace(old, new),
    }
}

// ============================================================================
// Lists
// ============================================================================

fn array_method(object: &Value, name: &str, args: Args) -> RenderResult<Value> {
    let Value::Array(items) = object else {
        return Err(no_method(object, name));
    };
    match name {
        "append" => {
            let [item] = args.bind(name, ["object"])?;
            object.reject_self_insert(&item)?;
            items.borrow_mut().push(item);
            Ok(Value::None)
        }
        "pop" => {
            let [index] = args.bind(name, ["index"])?;
            let mut items = items.borrow_mut();
            if items.is_empty() {
                return Err(RenderError::value("pop from empty list"));
            }
            let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
            let index = optional_int(&index, name, -1)?;
            let resolved = if index < 0 { index + len } else { index };
            if !(0..len).contains(&resolved) {
                return Err(RenderError::index("pop index out of range"));
            }
            Ok(items.remove(resolved as usize))
        }
        "insert" => {
            let [index, item] = args.bind(name, ["index", "object"])?;
            object.reject_self_insert(&item)?;
            let index = optional_int(&required(index, name, "index")?, name, 0)?;
            let mut items = items.borrow_mut();
            let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
            let at = if index < 0 { (index + len).max(0) } else { index.min(len) };
            items.insert(at as usize, item);
            Ok(Value::None)
        }
        "extend" => {
            let [other] = args.bind(name, ["iterable"])?;
            let extra = required(other, name, "iterable")?.try_iter()?;
            items.borrow_mut().extend(extra);
            Ok(Value::None)
        }
        "index" => {
            let [needle] = args.bind(name, ["value"])?;
            let position = items.borrow().iter().position(|item| item.equals(&needle));
            position
                .map(Value::from)
                .ok_or_else(|| RenderError::value(format!("{} is not in list", needle.repr())))
        }
        "count" => {
            let [needle] = args.bind(name, ["value"])?;
            let count = items.borrow().iter().filter(|item| item.equals(&needle)).count();
            Ok(Value::from(count))
        }
        _ => Err(no_method(object, name)),
    }
}

// ============================================================================
// Dicts
// ============================================================================

fn object_method(object: &Value, name: &str, mut args: Args) -> RenderResult<Value> {
    let Value::Object(map) = object else {
        return Err(no_method(object, name));
    };
    match name {
        "items" => {
            args.expect_empty(name)?;
            let pairs = map
                .borrow()
                .iter()
                .map(|(k, v)| Value::array(vec![k.to_value(), v.clone()]))
                .collect();
            Ok(Value::array(pairs))
        }
        "keys" => {
            args.expect_empty(name)?;
            Ok(Value::array(map.borrow().keys().map(Key::to_value).collect()))
        }
        "values" => {
            args.expect_empty(name)?;
            Ok(Value::array(map.borrow().values().cloned().collect()))
        }
        "get" => {
            let [key, default] = args.bind(name, ["key", "default"])?;
            let key = Key::from_value(&required(key, name, "key")?)?;
            let found = map.borrow().get(&key).cloned();
            Ok(found.unwrap_or(match default {
                Value::Undefined => Value::None,
                default => default,
            }))
        }
        "pop" => {
            if args.is_empty() {
                return Err(RenderError::type_error("pop expected at least 1 argument, got 0"));
            }
            let [key_value, default] = args.bind(name, ["key", "default"])?;
            let key = Key::from_value(&key_value)?;
            let removed = map.borrow_mut().shift_remove(&key);
            match (removed, default) {
                (Some(value), _) => Ok(value),
                (None, Value::Undefined) => Err(RenderError::key(key_value.repr())),
                (None, default) => Ok(default),
            }
        }
        "setdefault" => {
            let [key_value, default] = args.bind(name, ["key", "default"])?;
            let key = Key::from_value(&required(key_value, name, "key")?)?;
            let default = if default.is_undefined() { Value::None } else { default };
            object.reject_self_insert(&default)?;
            Ok(map.borrow_mut().entry(key).or_insert(default).clone())
        }
        "update" => {
            let other = if args.positional.is_empty() {
                None
            } else {
                Some(args.positional.remove(0))
            };
            let named = std::mem::take(&mut args.named);
            args.expect_empty(name)?;
            if let Some(other) = other {
                let entries: Vec<(Key, Value)> = match &other {
                    Value::Object(src) => {
                        src.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
                    }
                    Value::Array(pairs) => pairs
                        .borrow()
                        .iter()
                        .map(|pair| {
                            let kv = pair.try_iter()?;
                            match kv.as_slice() {
                                [k, v] => Ok((Key::from_value(k)?, v.clone())),
                                _ => Err(RenderError::value(
                                    "dictionary update sequence element has wrong length",
                                )),
                            }
                        })
                        .collect::<RenderResult<_>>()?,
                    other => {
                        return Err(RenderError::type_error(format!(
                            "'{}' object is not a mapping",
                            other.type_name()
                        )));
                    }
                };
                map.borrow_mut().extend(entries);
            }
            map.borrow_mut()
                .extend(named.into_iter().map(|(k, v)| (Key::from(k), v)));
            Ok(Value::None)
        }
        _ => Err(no_method(object, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(object: &Value, name: &str, args: &[Value]) -> RenderResult<Value> {
        call_method(object, name, Args::from_values(args.iter().cloned()))
    }

    fn s(text: &str) -> Value {
        Value::from(text)
    }

    #[test]
    fn strip_family() {
        assert_eq!(call(&s(" a "), "strip", &[]).unwrap(), s("a"));
        assert_eq!(call(&s(" a "), "lstrip", &[]).unwrap(), s("a "));
        assert_eq!(call(&s(" a "), "rstrip", &[]).unwrap(), s(" a"));
        assert_eq!(call(&s("abcXYZabc"), "strip", &[s("ac")]).unwrap(), s("bcXYZab"));
    }

    #[test]
    fn case_methods() {
        assert_eq!(call(&s("foo bar"), "title", &[]).unwrap(), s("Foo Bar"));
        assert_eq!(call(&s("ok"), "capitalize", &[]).unwrap(), s("Ok"));
        assert_eq!(call(&s("hELLO"), "capitalize", &[]).unwrap(), s("Hello"));
        assert_eq!(call(&s("they're"), "title", &[]).unwrap(), s("They'Re"));
        assert_eq!(call(&s("Ab"), "upper", &[]).unwrap(), s("AB"));
    }

    #[test]
    fn split_like_python() {
        let parts = call(&s("a b"), "split", &[s(" ")]).unwrap();
        assert_eq!(parts, Value::array(vec![s("a"), s("b")]));
        let parts = call(&s("  a  b c "), "split", &[]).unwrap();
        assert_eq!(parts, Value::array(vec![s("a"), s("b"), s("c")]));
        let parts = call(&s("a,b,c"), "split", &[s(","), Value::Int(1)]).unwrap();
        assert_eq!(parts, Value::array(vec![s("a"), s("b,c")]));
        let parts = call(&s("a  b c"), "split", &[Value::None, Value::Int(1)]).unwrap();
        assert_eq!(parts, Value::array(vec![s("a"), s("b c")]));
        assert!(call(&s("a"), "split", &[s("")]).is_err());
    }

    #[test]
    fn replace_with_count() {
        let out = call(&s("abcXYZabcXYZabc"), "replace", &[s("abc"), s("ok"), Value::Int(2)]).unwrap();
        assert_eq!(out, s("okXYZokXYZabc"));
    }

    #[test]
    fn affix_checks() {
        assert_eq!(call(&s(""), "startswith", &[s("a")]).unwrap(), Value::Bool(false));
        assert_eq!(call(&s("abc"), "endswith", &[s("bc")]).unwrap(), Value::Bool(true));
        let choices = Value::array(vec![s("x"), s("a")]);
        assert_eq!(call(&s("abc"), "startswith", &[choices]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn list_pop_and_errors() {
        let list = Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(call(&list, "pop", &[]).unwrap(), Value::Int(3));
        assert_eq!(call(&list, "pop", &[Value::Int(0)]).unwrap(), Value::Int(1));
        assert_eq!(call(&list, "pop", &[Value::Int(5)]).unwrap_err().message, "pop index out of range");
        call(&list, "pop", &[]).unwrap();
        assert_eq!(call(&list, "pop", &[]).unwrap_err().message, "pop from empty list");
    }

    #[test]
    fn list_mutation_is_shared() {
        let list = Value::array(vec![]);
        let alias = list.clone();
        call(&alias, "append", &[Value::Int(1)]).unwrap();
        call(&alias, "insert", &[Value::Int(0), Value::Int(0)]).unwrap();
        call(&alias, "extend", &[Value::array(vec![Value::Int(2)])]).unwrap();
        assert_eq!(list.to_string(), "[0, 1, 2]");
        assert_eq!(call(&list, "index", &[Value::Int(2)]).unwrap(), Value::Int(2));
        assert_eq!(call(&list, "count", &[Value::Int(5)]).unwrap(), Value::Int(0));
        assert!(call(&list, "append", &[list.clone()]).is_err());
    }

    #[test]
    fn dict_accessors() {
        let obj = Value::from_pairs([("a", Value::Int(1)), ("b", Value::Int(2))]);
        assert_eq!(call(&obj, "keys", &[]).unwrap().to_string(), "['a', 'b']");
        assert_eq!(call(&obj, "items", &[]).unwrap().to_string(), "[['a', 1], ['b', 2]]");
        assert_eq!(call(&obj, "get", &[s("a")]).unwrap(), Value::Int(1));
        assert_eq!(call(&obj, "get", &[s("z")]).unwrap(), Value::None);
        assert_eq!(call(&obj, "get", &[s("z"), Value::Int(0)]).unwrap(), Value::Int(0));
    }

    #[test]
    fn dict_pop() {
        let obj = Value::from_pairs([("x", Value::Int(1))]);
        assert_eq!(call(&obj, "pop", &[s("x")]).unwrap(), Value::Int(1));
        assert_eq!(call(&obj, "pop", &[s("x"), Value::None]).unwrap(), Value::None);
        assert!(call(&obj, "pop", &[s("foooo")]).unwrap_err().message.contains("foooo"));
        assert!(call(&obj, "pop", &[]).unwrap_err().message.contains("pop"));
    }

    #[test]
    fn dict_update_and_setdefault() {
        let obj = Value::new_object();
        let mut args = Args::from_values([Value::from_pairs([("a", Value::Int(1))])]);
        args.push_named("b", Value::Int(2));
        call_method(&obj, "update", args).unwrap();
        assert_eq!(obj.to_string(), "{'a': 1, 'b': 2}");
        assert_eq!(call(&obj, "setdefault", &[s("a"), Value::Int(9)]).unwrap(), Value::Int(1));
        assert_eq!(call(&obj, "setdefault", &[s("c")]).unwrap(), Value::None);
        assert_eq!(obj.len().unwrap(), 3);
    }

    #[test]
    fn unknown_method() {
        let err = call(&Value::Int(1), "foo", &[]).unwrap_err();
        assert_eq!(err.message, "'int' object has no attribute 'foo'");
    }
}
