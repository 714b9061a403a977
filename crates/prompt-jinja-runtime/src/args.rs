//! Evaluated call arguments and parameter binding for native functions.

use prompt_jinja_core::{RenderError, RenderResult};

use crate::value::Value;

/// Arguments of one call: positional values in order, then named values in
/// the order they were written.
#[derive(Debug, Clone, Default)]
pub struct Args {
    pub positional: Vec<Value>,
    pub named: Vec<(String, Value)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments made only of positional values.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            named: Vec::new(),
        }
    }

    pub fn push(&mut self, value: Value) {
        self.positional.push(value);
    }

    pub fn push_named(&mut self, name: impl Into<String>, value: Value) {
        self.named.push((name.into(), value));
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    /// Remove and return a named argument.
    pub fn take_named(&mut self, name: &str) -> Option<Value> {
        let index = self.named.iter().position(|(n, _)| n == name)?;
        Some(self.named.remove(index).1)
    }

    /// Bind against a fixed parameter list.
    ///
    /// Every parameter may be given positionally or by name. Parameters that
    /// were not passed come back as [`Value::Undefined`].
    pub fn bind<const N: usize>(self, func: &str, params: [&str; N]) -> RenderResult<[Value; N]> {
        if self.positional.len() > N {
            return Err(RenderError::type_error(format!(
                "{func}() takes at most {N} argument{} ({} given)",
                if N == 1 { "" } else { "s" },
                self.positional.len()
            )));
        }
        let mut bound: [Value; N] = std::array::from_fn(|_| Value::Undefined);
        let given = self.positional.len();
        for (slot, value) in bound.iter_mut().zip(self.positional) {
            *slot = value;
        }
        for (name, value) in self.named {
            match params.iter().position(|p| *p == name) {
                Some(i) if i < given => {
                    return Err(RenderError::type_error(format!(
                        "{func}() got multiple values for argument '{name}'"
                    )));
                }
                Some(i) => bound[i] = value,
                None => {
                    return Err(RenderError::type_error(format!(
                        "{func}() got an unexpected keyword argument '{name}'"
                    )));
                }
            }
        }
        Ok(bound)
    }

    /// Fail unless no arguments were passed.
    pub fn expect_empty(self, func: &str) -> RenderResult<()> {
        self.bind(func, []).map(|_| ())
    }
}

/// Unwrap a bound parameter that must have been passed.
pub fn required(value: Value, func: &str, param: &str) -> RenderResult<Value> {
    if value.is_undefined() {
        return Err(RenderError::type_error(format!(
            "{func}() missing required argument '{param}'"
        )));
    }
    Ok(value)
}
