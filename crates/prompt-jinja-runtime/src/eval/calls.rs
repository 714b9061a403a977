//! Calls: argument evaluation, native and macro invocation, method calls,
//! and filter / test dispatch through the registry.

use std::rc::Rc;
use std::sync::Arc;

use prompt_jinja_core::{RenderError, RenderResult};
use prompt_jinja_parser::ast::{Argument, CallExpr, Expr, MacroDef, MethodCallExpr};
use tracing::trace;

use crate::args::Args;
use crate::context::Context;
use crate::value::{Callable, Key, Value, call_method};

use super::State;

impl State<'_> {
    // ==========================================================================
    // Public entry points for native functions
    // ==========================================================================

    /// Call a callable value.
    pub fn call(&mut self, callee: &Value, args: Args) -> RenderResult<Value> {
        match callee {
            Value::Callable(callable) => {
                let callable = callable.clone();
                self.descend(|state| state.invoke(&callable, args))
            }
            Value::Undefined => Err(RenderError::name("cannot call an undefined value")),
            other => Err(RenderError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    /// Apply the filter registered under `name`.
    pub fn apply_filter(&mut self, name: &str, value: Value, args: Args) -> RenderResult<Value> {
        let filter = self
            .registry
            .filter(name)
            .ok_or_else(|| RenderError::name(format!("Unknown filter '{name}'")))?;
        filter(self, value, args)
    }

    /// Run the test registered under `name`.
    pub fn apply_test(&mut self, name: &str, value: &Value, args: Args) -> RenderResult<bool> {
        let test = self
            .registry
            .test(name)
            .ok_or_else(|| RenderError::name(format!("Unknown test '{name}'")))?;
        test(self, value, args)
    }

    // ==========================================================================
    // Evaluation
    // ==========================================================================

    /// Evaluate call arguments, expanding `*` and `**` spreads.
    pub(crate) fn eval_args(&mut self, args: &[Argument], ctx: &Rc<Context>) -> RenderResult<Args> {
        let mut out = Args::new();
        for arg in args {
            match arg {
                Argument::Positional(expr) => {
                    let value = self.eval_expr(expr, ctx)?;
                    out.push(value);
                }
                Argument::Named(name, expr) => {
                    let value = self.eval_expr(expr, ctx)?;
                    out.push_named(name.name.clone(), value);
                }
                Argument::Splat(expr) => {
                    let value = self.eval_expr(expr, ctx)?;
                    let items = value.try_iter().map_err(|e| e.with_span(expr.span()))?;
                    out.positional.extend(items);
                }
                Argument::KwSplat(expr) => {
                    let value = self.eval_expr(expr, ctx)?;
                    spread_named(&value, &mut out).map_err(|e| e.with_span(expr.span()))?;
                }
            }
        }
        Ok(out)
    }

    pub(crate) fn eval_call(&mut self, call: &CallExpr, ctx: &Rc<Context>) -> RenderResult<Value> {
        let callee = self.eval_expr(&call.callee, ctx)?;
        let args = self.eval_args(&call.args, ctx)?;
        if let (Value::Undefined, Expr::Ident(ident)) = (&callee, &call.callee) {
            return Err(RenderError::name(format!("'{}' is undefined", ident.name)).with_span(ident.span));
        }
        self.call(&callee, args).map_err(|e| e.with_span(call.span))
    }

    /// `object.name(args)`: a callable stored under the key `name` wins over
    /// the built-in method of the same name.
    pub(crate) fn eval_method_call(&mut self, call: &MethodCallExpr, ctx: &Rc<Context>) -> RenderResult<Value> {
        let object = self.eval_expr(&call.object, ctx)?;
        let args = self.eval_args(&call.args, ctx)?;
        let name = call.method.name.as_str();
        let result = match object.get_attr(name) {
            Some(member @ Value::Callable(_)) => self.call(&member, args),
            _ if object.is_undefined() => Err(RenderError::name(format!(
                "cannot call method '{name}' of an undefined value"
            ))),
            _ => call_method(&object, name, args),
        };
        result.map_err(|e| e.with_span(call.span))
    }

    fn invoke(&mut self, callable: &Callable, args: Args) -> RenderResult<Value> {
        match callable {
            Callable::Native { func, .. } => func(self, args),
            Callable::Macro { def, closure } => self.call_macro(def, closure, args),
        }
    }

    /// Bind arguments and render a macro body.
    ///
    /// Parameters take positional arguments first, then named ones, then
    /// their defaults, evaluated on every call in the new frame so that
    /// `[]` or `{}` defaults are never shared between calls. Leftovers end
    /// up in `varargs` and `kwargs` when the body reads them and are a
    /// `TypeError` otherwise.
    fn call_macro(&mut self, def: &Arc<MacroDef>, closure: &Rc<Context>, args: Args) -> RenderResult<Value> {
        trace!(name = %def.name.name, args = args.len(), "calling macro");
        let frame = Context::child(closure);
        let Args { positional, mut named } = args;
        let mut positional = positional.into_iter();
        for param in &def.params {
            let value = if let Some(value) = positional.next() {
                value
            } else if let Some(i) = named.iter().position(|(n, _)| *n == param.name.name) {
                named.remove(i).1
            } else if let Some(default) = &param.default {
                self.eval_expr(default, &frame)?
            } else {
                Value::Undefined
            };
            frame.set(param.name.name.clone(), value);
        }

        let varargs: Vec<Value> = positional.collect();
        if let Some((name, _)) = named.first().filter(|_| !def.catch_kwargs) {
            return Err(RenderError::type_error(format!(
                "macro '{}' takes no keyword argument '{name}'",
                def.name.name
            )));
        }
        if !varargs.is_empty() && !def.catch_varargs {
            return Err(RenderError::type_error(format!(
                "macro '{}' takes not more than {} argument(s)",
                def.name.name,
                def.params.len()
            )));
        }
        frame.set("varargs", Value::array(varargs));
        frame.set(
            "kwargs",
            Value::object(named.into_iter().map(|(k, v)| (Key::from(k), v)).collect()),
        );

        let mut out = String::new();
        self.exec_seq(&def.body, &frame, &mut out)?.outside_loop()?;
        Ok(if self.autoescape {
            Value::safe(out)
        } else {
            Value::from(out)
        })
    }
}

fn spread_named(value: &Value, out: &mut Args) -> RenderResult<()> {
    match value {
        Value::Undefined => Ok(()),
        Value::Object(map) => {
            for (key, value) in map.borrow().iter() {
                let Some(name) = key.as_str() else {
                    return Err(RenderError::type_error("keywords must be strings"));
                };
                out.push_named(name, value.clone());
            }
            Ok(())
        }
        other => Err(RenderError::type_error(format!(
            "argument after ** must be a mapping, not {}",
            other.type_name()
        ))),
    }
}
