//! JSON interop: conversion from and to `serde_json`, and `json.dumps`-style text.

use std::fmt::Write;

use prompt_jinja_core::{RenderError, RenderResult};

use super::display::format_float;
use super::{Key, Map, Value};

/// Containers nested deeper than this cannot be serialized.
const MAX_JSON_DEPTH: usize = 256;

/// Layout switches for [`Value::to_json_string`], mirroring `json.dumps`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonOptions {
    /// Newline plus this string per nesting level between items.
    pub indent: Option<String>,
    /// Escape every non-ASCII character as `\uXXXX`.
    pub ensure_ascii: bool,
    pub sort_keys: bool,
    pub item_separator: String,
    pub key_separator: String,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            indent: None,
            ensure_ascii: false,
            sort_keys: false,
            item_separator: ", ".to_string(),
            key_separator: ": ".to_string(),
        }
    }
}

impl JsonOptions {
    /// Indent by `width` spaces; the item separator loses its trailing space.
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = Some(indent.into());
        self.item_separator = ",".to_string();
        self
    }

    pub fn with_ensure_ascii(mut self, on: bool) -> Self {
        self.ensure_ascii = on;
        self
    }

    pub fn with_sort_keys(mut self, on: bool) -> Self {
        self.sort_keys = on;
        self
    }

    pub fn with_separators(mut self, item: impl Into<String>, key: impl Into<String>) -> Self {
        self.item_separator = item.into();
        self.key_separator = key.into();
        self
    }
}

fn from_json_number(n: &serde_json::Number) -> RenderResult<Value> {
    if let Some(i) = n.as_i64() {
        Ok(Value::Int(i))
    } else if n.is_u64() {
        Err(RenderError::value(format!("integer {n} does not fit in 64 bits")))
    } else {
        Ok(Value::Float(n.as_f64().unwrap_or(f64::NAN)))
    }
}

impl Value {
    /// Convert a `serde_json` value.
    ///
    /// Integers above `i64::MAX` are a `ValueError`, never a rounded float.
    pub fn from_json(json: &serde_json::Value) -> RenderResult<Value> {
        Ok(match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => from_json_number(n)?,
            serde_json::Value::String(s) => Value::from(s.as_str()),
            serde_json::Value::Array(items) => Value::array(
                items
                    .iter()
                    .map(Value::from_json)
                    .collect::<RenderResult<Vec<_>>>()?,
            ),
            serde_json::Value::Object(members) => Value::object(
                members
                    .iter()
                    .map(|(k, v)| Ok((Key::from(k.as_str()), Value::from_json(v)?)))
                    .collect::<RenderResult<Map>>()?,
            ),
        })
    }

    /// Convert into a `serde_json` value.
    ///
    /// Non-finite floats and callables become `null`; non-string keys
    /// become their JSON text.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::None | Value::Callable(_) => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) | Value::Safe(s) => serde_json::Value::String(s.to_string()),
            Value::Array(items) => {
                serde_json::Value::Array(items.borrow().iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.borrow()
                    .iter()
                    .map(|(k, v)| (k.to_json_name(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Serialize as JSON text with Python `json.dumps` layout.
    pub fn to_json_string(&self, options: &JsonOptions) -> RenderResult<String> {
        let mut out = String::new();
        write_json(self, options, 0, &mut out)?;
        Ok(out)
    }
}

fn write_json(value: &Value, options: &JsonOptions, level: usize, out: &mut String) -> RenderResult<()> {
    if level > MAX_JSON_DEPTH {
        return Err(RenderError::value("value nested too deeply to serialize"));
    }
    match value {
        Value::Undefined | Value::None => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(i) => {
            let _ = write!(out, "{i}");
        }
        Value::Float(f) if f.is_nan() => out.push_str("NaN"),
        Value::Float(f) if f.is_infinite() => {
            out.push_str(if *f > 0.0 { "Infinity" } else { "-Infinity" })
        }
        Value::Float(f) => out.push_str(&format_float(*f)),
        Value::String(s) | Value::Safe(s) => write_json_string(s, options.ensure_ascii, out),
        Value::Array(items) => {
            let items = items.borrow();
            if items.is_empty() {
                out.push_str("[]");
                return Ok(());
            }
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(&options.item_separator);
                }
                write_newline(options, level + 1, out);
                write_json(item, options, level + 1, out)?;
            }
            write_newline(options, level, out);
            out.push(']');
        }
        Value::Object(map) => {
            let map = map.borrow();
            if map.is_empty() {
                out.push_str("{}");
                return Ok(());
            }
            let mut entries: Vec<_> = map.iter().collect();
            if options.sort_keys {
                entries.sort_by(|a, b| a.0.cmp(b.0));
            }
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(&options.item_separator);
                }
                write_newline(options, level + 1, out);
                write_json_string(&key.to_json_name(), options.ensure_ascii, out);
                out.push_str(&options.key_separator);
                write_json(item, options, level + 1, out)?;
            }
            write_newline(options, level, out);
            out.push('}');
        }
        Value::Callable(_) => {
            return Err(RenderError::type_error(
                "Object of type function is not JSON serializable",
            ));
        }
    }
    Ok(())
}

fn write_newline(options: &JsonOptions, level: usize, out: &mut String) {
    if let Some(indent) = &options.indent {
        out.push('\n');
        for _ in 0..level {
            out.push_str(indent);
        }
    }
}

fn write_json_string(s: &str, ensure_ascii: bool, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c if ensure_ascii && !c.is_ascii() => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
