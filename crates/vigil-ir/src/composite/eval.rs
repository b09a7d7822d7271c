use std::cmp::Ordering;

use crate::compiled::{CExpr, Value};
use crate::expr::BinOp;
use crate::state::{GlobalState, VarId};

use super::CompositeModel;

/// Evaluation context for compiled expressions.
///
/// Evaluation is total: builder-checked expressions never mix kinds, and
/// the fallbacks below only exist so that no input can panic.
pub(crate) struct EvalEnv<'a> {
    model: &'a CompositeModel,
    current: Option<&'a GlobalState>,
    next: Option<&'a GlobalState>,
}

impl<'a> EvalEnv<'a> {
    pub(crate) fn new(
        model: &'a CompositeModel,
        current: Option<&'a GlobalState>,
        next: Option<&'a GlobalState>,
    ) -> Self {
        Self {
            model,
            current,
            next,
        }
    }

    fn read(&self, state: Option<&GlobalState>, var: VarId) -> Value {
        let idx = state.map_or(0, |s| s.index(var));
        self.model.vars[var].codec.decode(idx)
    }

    pub(crate) fn eval(&self, expr: &CExpr) -> Value {
        match expr {
            CExpr::Const(v) => *v,
            CExpr::Var(v) => self.read(self.current, *v),
            CExpr::NextVar(v) => self.read(self.next.or(self.current), *v),
            CExpr::Define(d) => self.eval(&self.model.defines[*d].expr),
            CExpr::NextDefine(d) => match self.next {
                Some(next) => EvalEnv::new(self.model, Some(next), None)
                    .eval(&self.model.defines[*d].expr),
                None => self.eval(&self.model.defines[*d].expr),
            },
            CExpr::Not(inner) => Value::Bool(!self.eval(inner).is_true()),
            CExpr::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs),
            CExpr::Count(items) => {
                Value::Int(items.iter().filter(|e| self.eval(e).is_true()).count() as i64)
            }
            CExpr::Case(arms) => arms
                .iter()
                .find(|(guard, _)| self.eval(guard).is_true())
                .map_or(Value::Bool(false), |(_, result)| self.eval(result)),
            CExpr::Choice(items) => items
                .first()
                .map_or(Value::Bool(false), |item| self.eval(item)),
        }
    }

    fn binary(&self, op: BinOp, lhs: &CExpr, rhs: &CExpr) -> Value {
        match op {
            BinOp::And => Value::Bool(self.eval(lhs).is_true() && self.eval(rhs).is_true()),
            BinOp::Or => Value::Bool(self.eval(lhs).is_true() || self.eval(rhs).is_true()),
            BinOp::Implies => Value::Bool(!self.eval(lhs).is_true() || self.eval(rhs).is_true()),
            BinOp::Iff => Value::Bool(self.eval(lhs).is_true() == self.eval(rhs).is_true()),
            BinOp::Eq => Value::Bool(self.eval(lhs) == self.eval(rhs)),
            BinOp::Ne => Value::Bool(self.eval(lhs) != self.eval(rhs)),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let ordering = match (self.eval(lhs).as_int(), self.eval(rhs).as_int()) {
                    (Some(a), Some(b)) => a.cmp(&b),
                    _ => return Value::Bool(false),
                };
                Value::Bool(match op {
                    BinOp::Lt => ordering == Ordering::Less,
                    BinOp::Le => ordering != Ordering::Greater,
                    BinOp::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                })
            }
            BinOp::Add | BinOp::Sub => {
                let a = self.eval(lhs).as_int().unwrap_or(0);
                let b = self.eval(rhs).as_int().unwrap_or(0);
                Value::Int(if op == BinOp::Add {
                    a.saturating_add(b)
                } else {
                    a.saturating_sub(b)
                })
            }
        }
    }

    /// Append every value `expr` may produce. A `case` with no matching
    /// guard contributes nothing.
    pub(crate) fn candidates(&self, expr: &CExpr, out: &mut Vec<Value>) {
        match expr {
            CExpr::Choice(items) => {
                for item in items {
                    self.candidates(item, out);
                }
            }
            CExpr::Case(arms) => {
                if let Some((_, result)) = arms.iter().find(|(guard, _)| self.eval(guard).is_true())
                {
                    self.candidates(result, out);
                }
            }
            other => {
                let value = self.eval(other);
                if !out.contains(&value) {
                    out.push(value);
                }
            }
        }
    }
}
