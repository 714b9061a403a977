//! Statement execution.
//!
//! Handles every tag-level construct except `for`, which lives in
//! `for_loop.rs`:
//! - Text and `{{ }}` output, with optional autoescaping
//! - `if` / `elif` / `else`
//! - `set` in its three forms
//! - Macro definition
//! - `filter` and `generation` blocks

use std::rc::Rc;

use prompt_jinja_core::{RenderError, RenderResult};
use prompt_jinja_parser::ast::{
    FilterCall, IfStmt, NamespaceSetStmt, Sequence, SetBlockStmt, SetStmt, Stmt,
};

use crate::context::Context;
use crate::value::{Callable, Key, Value, escape_html};

use super::{Flow, State};

impl State<'_> {
    /// Execute statements in order until one of them breaks or continues.
    pub(crate) fn exec_seq(&mut self, seq: &Sequence, ctx: &Rc<Context>, out: &mut String) -> RenderResult<Flow> {
        for stmt in &seq.stmts {
            match self.exec_stmt(stmt, ctx, out)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, ctx: &Rc<Context>, out: &mut String) -> RenderResult<Flow> {
        match stmt {
            Stmt::Text(text) => out.push_str(&text.text),
            Stmt::Output(output) => {
                let value = self.eval_expr(&output.expr, ctx)?;
                self.write_value(&value, out).map_err(|e| e.with_span(output.span))?;
            }
            Stmt::If(if_stmt) => return self.exec_if(if_stmt, ctx, out),
            Stmt::For(for_stmt) => return self.exec_for(for_stmt, ctx, out),
            Stmt::Set(set) => self.exec_set(set, ctx)?,
            Stmt::NamespaceSet(set) => self.exec_namespace_set(set, ctx)?,
            Stmt::SetBlock(set) => return self.exec_set_block(set, ctx),
            Stmt::Macro(def) => {
                let value = Value::Callable(Rc::new(Callable::Macro {
                    def: def.def.clone(),
                    closure: ctx.clone(),
                }));
                ctx.set(def.def.name.name.clone(), value);
                if !self.macro_frames.iter().any(|frame| Rc::ptr_eq(frame, ctx)) {
                    self.macro_frames.push(ctx.clone());
                }
            }
            Stmt::FilterBlock(block) => {
                let (body, flow) = self.capture(&block.body, ctx)?;
                let value = self.apply_filter_chain(&block.filters, body, ctx)?;
                self.write_value(&value, out).map_err(|e| e.with_span(block.span))?;
                return Ok(flow);
            }
            Stmt::Generation(block) => return self.exec_seq(&block.body, ctx, out),
            Stmt::Break(span) => return Ok(Flow::Break(*span)),
            Stmt::Continue(span) => return Ok(Flow::Continue(*span)),
        }
        Ok(Flow::Normal)
    }

    /// Append the display form of a value, escaping it when required.
    pub(crate) fn write_value(&self, value: &Value, out: &mut String) -> RenderResult<()> {
        match value {
            Value::Callable(callable) => Err(RenderError::type_error(format!(
                "cannot output callable '{}'; did you forget to call it?",
                callable.name()
            ))),
            Value::Undefined if self.is_strict() => {
                Err(RenderError::name("cannot output an undefined value"))
            }
            Value::Safe(s) => {
                out.push_str(s);
                Ok(())
            }
            value if self.autoescape => {
                out.push_str(&escape_html(&value.to_string()));
                Ok(())
            }
            value => {
                out.push_str(&value.to_string());
                Ok(())
            }
        }
    }

    /// Render a body into a string value: safe when autoescaping, since
    /// the body was already escaped while rendering.
    fn capture(&mut self, body: &Sequence, ctx: &Rc<Context>) -> RenderResult<(Value, Flow)> {
        let mut text = String::new();
        let flow = self.exec_seq(body, ctx, &mut text)?;
        let value = if self.autoescape {
            Value::safe(text)
        } else {
            Value::from(text)
        };
        Ok((value, flow))
    }

    fn apply_filter_chain(
        &mut self,
        filters: &[FilterCall],
        mut value: Value,
        ctx: &Rc<Context>,
    ) -> RenderResult<Value> {
        for filter in filters {
            let args = self.eval_args(&filter.args, ctx)?;
            value = self
                .apply_filter(&filter.name.name, value, args)
                .map_err(|e| e.with_span(filter.span))?;
        }
        Ok(value)
    }

    fn exec_if(&mut self, stmt: &IfStmt, ctx: &Rc<Context>, out: &mut String) -> RenderResult<Flow> {
        for branch in &stmt.branches {
            if self.eval_expr(&branch.condition, ctx)?.is_truthy() {
                return self.exec_seq(&branch.body, ctx, out);
            }
        }
        match &stmt.else_body {
            Some(body) => self.exec_seq(body, ctx, out),
            None => Ok(Flow::Normal),
        }
    }

    fn exec_set(&mut self, stmt: &SetStmt, ctx: &Rc<Context>) -> RenderResult<()> {
        let value = self.eval_expr(&stmt.value, ctx)?;
        match stmt.targets.as_slice() {
            [target] => ctx.set(target.name.clone(), value),
            targets => {
                let items = unpack(&value, targets.len()).map_err(|e| e.with_span(stmt.span))?;
                for (target, item) in targets.iter().zip(items) {
                    ctx.set(target.name.clone(), item);
                }
            }
        }
        Ok(())
    }

    fn exec_namespace_set(&mut self, stmt: &NamespaceSetStmt, ctx: &Rc<Context>) -> RenderResult<()> {
        let target = match ctx.get(&stmt.namespace.name) {
            Some(target) => target,
            None => {
                return Err(RenderError::name(format!("'{}' is undefined", stmt.namespace.name))
                    .with_span(stmt.namespace.span));
            }
        };
        let Value::Object(map) = &target else {
            return Err(RenderError::type_error(format!(
                "cannot assign attribute on '{}' object",
                target.type_name()
            ))
            .with_span(stmt.span));
        };
        let value = self.eval_expr(&stmt.value, ctx)?;
        target.reject_self_insert(&value).map_err(|e| e.with_span(stmt.span))?;
        map.borrow_mut().insert(Key::from(stmt.attr.name.as_str()), value);
        Ok(())
    }

    fn exec_set_block(&mut self, stmt: &SetBlockStmt, ctx: &Rc<Context>) -> RenderResult<Flow> {
        let (body, flow) = self.capture(&stmt.body, ctx)?;
        if flow != Flow::Normal {
            return Ok(flow);
        }
        let value = self.apply_filter_chain(&stmt.filters, body, ctx)?;
        ctx.set(stmt.name.name.clone(), value);
        Ok(Flow::Normal)
    }
}

/// Split a value into exactly `count` items for multi-target assignment.
pub(crate) fn unpack(value: &Value, count: usize) -> RenderResult<Vec<Value>> {
    let items = value.try_iter()?;
    if items.len() != count {
        let detail = if items.len() > count { "too many" } else { "not enough" };
        return Err(RenderError::value(format!(
            "{detail} values to unpack (expected {count}, got {})",
            items.len()
        )));
    }
    Ok(items)
}
