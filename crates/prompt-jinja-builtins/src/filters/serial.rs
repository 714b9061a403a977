//! `tojson`.

use prompt_jinja_core::{RenderError, RenderResult};
use prompt_jinja_runtime::{Args, JsonOptions, Registry, State, Value};

pub(super) fn register(registry: &mut Registry) {
    registry.register_filter("tojson", tojson);
}

/// `tojson(indent=None, ensure_ascii=false, sort_keys=false, separators=None)`,
/// laid out like Python's `json.dumps`.
#[cfg_attr(feature = "profiling", profiling::function)]
fn tojson(state: &mut State<'_>, value: Value, args: Args) -> RenderResult<Value> {
    let [indent, ensure_ascii, sort_keys, separators] =
        args.bind("tojson", ["indent", "ensure_ascii", "sort_keys", "separators"])?;

    let mut options = JsonOptions::default()
        .with_ensure_ascii(ensure_ascii.is_truthy())
        .with_sort_keys(sort_keys.is_truthy());
    match &indent {
        Value::Undefined | Value::None => {}
        Value::String(s) | Value::Safe(s) => options = options.with_indent(s.to_string()),
        other => match other.as_i64() {
            Some(n) => options = options.with_indent(" ".repeat(usize::try_from(n).unwrap_or(0))),
            None => {
                return Err(RenderError::type_error(format!(
                    "tojson() indent must be int or str, not {}",
                    other.type_name()
                )));
            }
        },
    }
    if !separators.is_null() {
        let pair = separators.try_iter()?;
        let [item, key] = pair.as_slice() else {
            return Err(RenderError::value("tojson() separators must be an (item, key) pair"));
        };
        options = options.with_separators(item.to_string(), key.to_string());
    }

    let text = value.to_json_string(&options)?;
    Ok(if state.autoescape() {
        Value::safe(text)
    } else {
        Value::from(text)
    })
}
