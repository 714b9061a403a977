//! `for` loop execution and the `loop` record.
//!
//! Handles:
//! - Unpacking into several targets: `for k, v in pairs`
//! - Filter conditions: `for x in xs if x` (skipped items are not counted)
//! - `else` bodies for empty iterations
//! - `break` / `continue`

use std::cell::Cell;
use std::rc::Rc;

use prompt_jinja_core::{RenderError, RenderResult, Span};
use prompt_jinja_parser::ast::{ForStmt, Ident};
use tracing::trace;

use crate::args::Args;
use crate::context::Context;
use crate::value::Value;

use super::stmt::unpack;
use super::{Flow, State};

impl State<'_> {
    pub(crate) fn exec_for(&mut self, stmt: &ForStmt, ctx: &Rc<Context>, out: &mut String) -> RenderResult<Flow> {
        let iterable = self.eval_expr(&stmt.iterable, ctx)?;
        let mut items = iterable
            .try_iter()
            .map_err(|e| e.with_span(stmt.iterable.span()))?;

        if let Some(condition) = &stmt.condition {
            let mut kept = Vec::with_capacity(items.len());
            for item in items {
                let frame = Context::child(ctx);
                bind_targets(&stmt.targets, item.clone(), &frame, stmt.span)?;
                if self.eval_expr(condition, &frame)?.is_truthy() {
                    kept.push(item);
                }
            }
            items = kept;
        }

        trace!(items = items.len(), "entering loop");
        if items.is_empty() {
            return match &stmt.else_body {
                Some(body) => self.exec_seq(body, ctx, out),
                None => Ok(Flow::Normal),
            };
        }

        let cycle = cycle_helper();
        for index in 0..items.len() {
            let frame = Context::child(ctx);
            bind_targets(&stmt.targets, items[index].clone(), &frame, stmt.span)?;
            frame.set("loop", loop_record(&items, index, &cycle));
            match self.exec_seq(&stmt.body, &frame, out)? {
                Flow::Break(_) => break,
                Flow::Normal | Flow::Continue(_) => {}
            }
        }
        Ok(Flow::Normal)
    }
}

fn bind_targets(targets: &[Ident], item: Value, frame: &Context, span: Span) -> RenderResult<()> {
    match targets {
        [target] => frame.set(target.name.clone(), item),
        targets => {
            let values = unpack(&item, targets.len()).map_err(|e| e.with_span(span))?;
            for (target, value) in targets.iter().zip(values) {
                frame.set(target.name.clone(), value);
            }
        }
    }
    Ok(())
}

/// `loop.cycle(a, b, ...)`: returns its arguments in turn, one per call,
/// counting calls across all iterations of one loop.
fn cycle_helper() -> Value {
    let calls = Rc::new(Cell::new(0usize));
    Value::from_fn("cycle", move |_, args: Args| {
        if !args.named.is_empty() {
            return Err(RenderError::type_error("cycle() takes no keyword arguments"));
        }
        if args.positional.is_empty() {
            return Err(RenderError::type_error("cycle() requires at least one argument"));
        }
        let n = calls.get();
        calls.set(n + 1);
        Ok(args.positional[n % args.positional.len()].clone())
    })
}

fn loop_record(items: &[Value], index: usize, cycle: &Value) -> Value {
    let length = items.len();
    let previous = index.checked_sub(1).map(|i| items[i].clone());
    let next = items.get(index + 1).cloned();
    Value::from_pairs([
        ("index", Value::from(index + 1)),
        ("index0", Value::from(index)),
        ("revindex", Value::from(length - index)),
        ("revindex0", Value::from(length - index - 1)),
        ("first", Value::Bool(index == 0)),
        ("last", Value::Bool(index + 1 == length)),
        ("length", Value::from(length)),
        ("previtem", previous.unwrap_or_default()),
        ("nextitem", next.unwrap_or_default()),
        ("depth", Value::Int(1)),
        ("depth0", Value::Int(0)),
        ("cycle", cycle.clone()),
    ])
}
