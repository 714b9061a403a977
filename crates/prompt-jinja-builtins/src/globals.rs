//! Global functions, callable from any template without being bound.
//!
//! `joiner` and `cycler` return stateful helpers; their state lives in
//! the returned value and dies with the render.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use prompt_jinja_core::{RenderError, RenderResult};
use prompt_jinja_runtime::value::{ObjectRef, call_method};
use prompt_jinja_runtime::{Args, Key, Map, Registry, State, Value};

/// Longest sequence `range` will materialize.
const MAX_RANGE: i128 = 1_000_000;

pub(crate) fn register(registry: &mut Registry) {
    registry
        .register_global("range", range)
        .register_global("namespace", namespace)
        .register_global("dict", dict)
        .register_global("joiner", joiner)
        .register_global("cycler", cycler)
        .register_global("raise_exception", raise_exception);
}

/// `range([start,] stop[, step])`.
fn range(_: &mut State<'_>, args: Args) -> RenderResult<Value> {
    if !args.named.is_empty() {
        return Err(RenderError::type_error("range() takes no keyword arguments"));
    }
    let bounds = args
        .positional
        .iter()
        .map(|v| {
            v.as_i64().ok_or_else(|| {
                RenderError::type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    v.type_name()
                ))
            })
        })
        .collect::<RenderResult<Vec<i64>>>()?;
    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => {
            return Err(RenderError::type_error(format!(
                "range expected 1 to 3 arguments, got {}",
                bounds.len()
            )));
        }
    };
    if step == 0 {
        return Err(RenderError::value("range() arg 3 must not be zero"));
    }

    let span = i128::from(stop) - i128::from(start);
    let step_wide = i128::from(step);
    let len = if (span > 0) == (step > 0) && span != 0 {
        (span.abs() + step_wide.abs() - 1) / step_wide.abs()
    } else {
        0
    };
    if len > MAX_RANGE {
        return Err(RenderError::value(format!(
            "range() would produce {len} items, more than the limit of {MAX_RANGE}"
        )));
    }
    let items = (0..len)
        .map(|i| Value::Int((i128::from(start) + i * step_wide) as i64))
        .collect();
    Ok(Value::array(items))
}

/// A fresh object filled like `dict.update(*args, **kwargs)`.
fn fill_object(args: Args) -> RenderResult<Value> {
    let object = Value::new_object();
    call_method(&object, "update", args)?;
    Ok(object)
}

/// `namespace(**attrs)`: a mutable object for `{% set ns.attr = ... %}`.
fn namespace(_: &mut State<'_>, args: Args) -> RenderResult<Value> {
    fill_object(args)
}

fn dict(_: &mut State<'_>, args: Args) -> RenderResult<Value> {
    fill_object(args)
}

/// `joiner(sep=', ')`: a callable returning `''` on its first call and `sep`
/// afterwards.
fn joiner(_: &mut State<'_>, args: Args) -> RenderResult<Value> {
    let [separator] = args.bind("joiner", ["sep"])?;
    let separator = if separator.is_undefined() {
        Value::from(", ")
    } else {
        separator
    };
    let used = Cell::new(false);
    Ok(Value::from_fn("joiner", move |_, args: Args| {
        args.expect_empty("joiner")?;
        if used.replace(true) {
            Ok(separator.clone())
        } else {
            Ok(Value::from(""))
        }
    }))
}

/// `cycler(*items)`: an object with `next()` and `reset()`; its `current`
/// attribute is the item the next call to `next()` returns.
fn cycler(_: &mut State<'_>, args: Args) -> RenderResult<Value> {
    if !args.named.is_empty() {
        return Err(RenderError::type_error("cycler() takes no keyword arguments"));
    }
    let items: Rc<[Value]> = args.positional.into();
    if items.is_empty() {
        return Err(RenderError::type_error("cycler() requires at least one item"));
    }

    let object: ObjectRef = Rc::new(RefCell::new(Map::default()));
    let position = Rc::new(Cell::new(0usize));
    let this = Rc::downgrade(&object);
    object.borrow_mut().insert(Key::from("current"), items[0].clone());

    let next = {
        let (items, position, this) = (items.clone(), position.clone(), this.clone());
        Value::from_fn("next", move |_, args: Args| {
            args.expect_empty("next")?;
            let index = position.get();
            let upcoming = (index + 1) % items.len();
            position.set(upcoming);
            set_current(&this, &items[upcoming]);
            Ok(items[index].clone())
        })
    };
    let reset = Value::from_fn("reset", move |_, args: Args| {
        args.expect_empty("reset")?;
        position.set(0);
        set_current(&this, &items[0]);
        Ok(Value::None)
    });

    {
        let mut map = object.borrow_mut();
        map.insert(Key::from("next"), next);
        map.insert(Key::from("reset"), reset);
    }
    Ok(Value::Object(object))
}

fn set_current(this: &Weak<RefCell<Map>>, item: &Value) {
    if let Some(object) = this.upgrade() {
        object.borrow_mut().insert(Key::from("current"), item.clone());
    }
}

/// `raise_exception(message)`: abort the render with a user error.
fn raise_exception(_: &mut State<'_>, args: Args) -> RenderResult<Value> {
    let [message] = args.bind("raise_exception", ["message"])?;
    Err(RenderError::user(message.to_string()))
}
