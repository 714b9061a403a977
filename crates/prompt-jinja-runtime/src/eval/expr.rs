//! Expression evaluation.
//!
//! Every expression evaluates to a [`Value`]. Errors raised by operators,
//! subscripts, filters and tests are annotated with the span of the
//! expression that raised them.

use std::rc::Rc;

use prompt_jinja_core::{RenderError, RenderResult};
use prompt_jinja_parser::ast::{BinaryExpr, BinaryOp, CompareExpr, Expr, Ident, LiteralKind, UnaryOp};

use crate::context::Context;
use crate::value::{Key, Map, Value, binary_op};

use super::State;

/// Filters whose input may be undefined even in strict mode.
const LENIENT_FILTERS: &[&str] = &["default", "d"];

/// Deepest expression tree the evaluator walks, counted across macro calls.
const MAX_EXPR_DEPTH: usize = 256;

impl State<'_> {
    /// Evaluate an expression in the given scope.
    pub(crate) fn eval_expr(&mut self, expr: &Expr, ctx: &Rc<Context>) -> RenderResult<Value> {
        if self.expr_depth >= MAX_EXPR_DEPTH {
            return Err(RenderError::recursion(format!(
                "maximum expression depth of {MAX_EXPR_DEPTH} exceeded"
            ))
            .with_span(expr.span()));
        }
        self.expr_depth += 1;
        let result = self.eval_node(expr, ctx);
        self.expr_depth -= 1;
        result
    }

    fn eval_node(&mut self, expr: &Expr, ctx: &Rc<Context>) -> RenderResult<Value> {
        match expr {
            Expr::Literal(lit) => Ok(literal(&lit.kind)),
            Expr::Ident(ident) => self.lookup(ident, ctx),
            Expr::Unary(unary) => {
                let operand = self.eval_expr(&unary.operand, ctx)?;
                match unary.op {
                    UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
                    UnaryOp::Neg => operand.neg(),
                    UnaryOp::Plus => operand.pos(),
                }
                .map_err(|e| e.with_span(unary.span))
            }
            Expr::Binary(binary) => self.eval_binary(binary, ctx),
            Expr::Compare(compare) => self.eval_compare(compare, ctx),
            Expr::Ternary(ternary) => {
                if self.eval_expr(&ternary.condition, ctx)?.is_truthy() {
                    self.eval_expr(&ternary.then, ctx)
                } else {
                    match &ternary.otherwise {
                        Some(otherwise) => self.eval_expr(otherwise, ctx),
                        None => Ok(Value::Undefined),
                    }
                }
            }
            Expr::Array(array) | Expr::Tuple(array) => {
                let items = array
                    .items
                    .iter()
                    .map(|item| self.eval_expr(item, ctx))
                    .collect::<RenderResult<Vec<_>>>()?;
                Ok(Value::array(items))
            }
            Expr::Object(object) => {
                let mut map = Map::default();
                for (key, value) in &object.entries {
                    let key_value = self.eval_expr(key, ctx)?;
                    let key = Key::from_value(&key_value).map_err(|e| e.with_span(key.span()))?;
                    let value = self.eval_expr(value, ctx)?;
                    map.insert(key, value);
                }
                Ok(Value::object(map))
            }
            Expr::Index(index) => {
                let object = self.eval_expr(&index.object, ctx)?;
                let key = self.eval_expr(&index.index, ctx)?;
                self.subscript(&object, &key).map_err(|e| e.with_span(index.span))
            }
            Expr::Slice(slice) => {
                let object = self.eval_expr(&slice.object, ctx)?;
                let start = self.eval_optional(slice.start.as_ref(), ctx)?;
                let stop = self.eval_optional(slice.stop.as_ref(), ctx)?;
                let step = self.eval_optional(slice.step.as_ref(), ctx)?;
                object
                    .slice(&start, &stop, &step)
                    .map_err(|e| e.with_span(slice.span))
            }
            Expr::Attribute(attr) => {
                let object = self.eval_expr(&attr.object, ctx)?;
                Ok(object.get_attr(&attr.name.name).unwrap_or_default())
            }
            Expr::MethodCall(call) => self.eval_method_call(call, ctx),
            Expr::Call(call) => self.eval_call(call, ctx),
            Expr::Filter(filter) => {
                let name = filter.filter.name.name.as_str();
                let input = if LENIENT_FILTERS.contains(&name) {
                    self.leniently(|state| state.eval_expr(&filter.input, ctx))?
                } else {
                    self.eval_expr(&filter.input, ctx)?
                };
                let args = self.eval_args(&filter.filter.args, ctx)?;
                self.apply_filter(name, input, args)
                    .map_err(|e| e.with_span(filter.filter.span))
            }
            Expr::Test(test) => {
                let subject = self.leniently(|state| state.eval_expr(&test.subject, ctx))?;
                let args = self.eval_args(&test.args, ctx)?;
                let passed = self
                    .apply_test(&test.name.name, &subject, args)
                    .map_err(|e| e.with_span(test.span))?;
                Ok(Value::Bool(passed != test.negated))
            }
        }
    }

    fn eval_optional(&mut self, expr: Option<&Expr>, ctx: &Rc<Context>) -> RenderResult<Value> {
        match expr {
            Some(expr) => self.eval_expr(expr, ctx),
            None => Ok(Value::None),
        }
    }

    /// Resolve a name: scope chain first, then registered globals.
    fn lookup(&mut self, ident: &Ident, ctx: &Rc<Context>) -> RenderResult<Value> {
        if let Some(value) = ctx.get(&ident.name) {
            return Ok(value);
        }
        if let Some(global) = self.registry.global(&ident.name) {
            return Ok(Value::from_fn(ident.name.clone(), move |state, args| {
                global(state, args)
            }));
        }
        if self.is_strict() {
            return Err(RenderError::name(format!("'{}' is undefined", ident.name)).with_span(ident.span));
        }
        Ok(Value::Undefined)
    }

    fn eval_binary(&mut self, binary: &BinaryExpr, ctx: &Rc<Context>) -> RenderResult<Value> {
        let left = self.eval_expr(&binary.left, ctx)?;
        match binary.op {
            BinaryOp::And if !left.is_truthy() => return Ok(left),
            BinaryOp::Or if left.is_truthy() => return Ok(left),
            BinaryOp::And | BinaryOp::Or => return self.eval_expr(&binary.right, ctx),
            _ => {}
        }
        let right = self.eval_expr(&binary.right, ctx)?;
        binary_op(binary.op, &left, &right).map_err(|e| e.with_span(binary.span))
    }

    /// `a < b < c`: stops at the first false link, each operand evaluated once.
    fn eval_compare(&mut self, compare: &CompareExpr, ctx: &Rc<Context>) -> RenderResult<Value> {
        let mut left = self.eval_expr(&compare.left, ctx)?;
        let mut result = Value::Bool(true);
        for (op, operand) in &compare.links {
            let right = self.eval_expr(operand, ctx)?;
            result = binary_op(*op, &left, &right).map_err(|e| e.with_span(compare.span))?;
            if !result.is_truthy() {
                break;
            }
            left = right;
        }
        Ok(result)
    }

    /// `object[key]`: missing entries are undefined unless strict.
    fn subscript(&self, object: &Value, key: &Value) -> RenderResult<Value> {
        match object.get_item(key)? {
            Some(value) => Ok(value),
            None if self.is_strict() => Err(match object {
                Value::Object(_) | Value::Undefined => RenderError::key(key.repr()),
                other => RenderError::index(format!("{} index out of range", other.type_name())),
            }),
            None => Ok(Value::Undefined),
        }
    }
}

fn literal(kind: &LiteralKind) -> Value {
    match kind {
        LiteralKind::None => Value::None,
        LiteralKind::Bool(b) => Value::Bool(*b),
        LiteralKind::Int(i) => Value::Int(*i),
        LiteralKind::Float(f) => Value::Float(*f),
        LiteralKind::String(s) => Value::from(s.as_str()),
    }
}
