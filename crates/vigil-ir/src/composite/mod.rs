//! The flat product automaton produced by the Composite Builder.
//!
//! A [`CompositeModel`] is immutable once built: the variable table is fixed,
//! every rule and constraint is compiled against it, and every candidate
//! value a rule can produce lies in the target variable's domain.

mod builder;
mod eval;
mod types;

use std::collections::HashMap;

use indexmap::IndexSet;

use crate::compiled::{CExpr, DefineId, SymbolId, Value};
use crate::domain::{Domain, Literal};
use crate::state::{GlobalState, StateSnapshot, VarId};

pub use builder::build;
pub(crate) use eval::EvalEnv;
pub use types::Ty;

/// Index of an instance in the expanded instance tree.
pub type InstanceId = usize;

/// Instance of the expanded tree.
#[derive(Debug, Clone)]
pub struct InstanceInfo {
    /// Qualified path; empty for the root.
    pub path: String,
    /// Name used in diagnostics (the root's declared name for the root).
    pub label: String,
    pub module: String,
    pub parent: Option<InstanceId>,
}

/// Maps domain indices to runtime values and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Codec {
    Boolean,
    Enum(Vec<SymbolId>),
    Range { min: i64 },
}

impl Codec {
    pub(crate) fn decode(&self, idx: u32) -> Value {
        match self {
            Codec::Boolean => Value::Bool(idx != 0),
            Codec::Enum(symbols) => Value::Symbol(symbols.get(idx as usize).copied().unwrap_or(0)),
            Codec::Range { min } => Value::Int(min.saturating_add(i64::from(idx))),
        }
    }

    pub(crate) fn encode(&self, value: Value, size: usize) -> Option<u32> {
        let idx = match (self, value) {
            (Codec::Boolean, Value::Bool(b)) => u32::from(b),
            (Codec::Enum(symbols), Value::Symbol(s)) => {
                symbols.iter().position(|x| *x == s)? as u32
            }
            (Codec::Range { min }, Value::Int(v)) => u32::try_from(v.checked_sub(*min)?).ok()?,
            _ => return None,
        };
        ((idx as usize) < size).then_some(idx)
    }
}

#[derive(Debug, Clone)]
pub struct VarInfo {
    pub path: String,
    pub instance: InstanceId,
    pub domain: Domain,
    pub(crate) codec: Codec,
}

#[derive(Debug, Clone)]
pub struct DefineInfo {
    pub path: String,
    pub instance: InstanceId,
    pub expr: CExpr,
    pub ty: Ty,
}

/// A global transition constraint, kept as written for reporting.
#[derive(Debug, Clone)]
pub struct ConstraintInfo {
    /// Label of the instance that declared the constraint.
    pub origin: String,
    pub text: String,
    pub expr: CExpr,
}

#[derive(Debug, Clone)]
pub struct PropertyInfo {
    pub name: String,
    pub text: String,
    pub formula: CExpr,
}

#[derive(Debug, Clone)]
pub struct CompositeModel {
    pub(crate) symbols: IndexSet<String>,
    pub(crate) instances: Vec<InstanceInfo>,
    pub(crate) vars: Vec<VarInfo>,
    pub(crate) defines: Vec<DefineInfo>,
    pub(crate) init_rules: Vec<Option<CExpr>>,
    pub(crate) next_rules: Vec<Option<CExpr>>,
    pub(crate) constraints: Vec<ConstraintInfo>,
    pub(crate) properties: Vec<PropertyInfo>,
    pub(crate) var_index: HashMap<String, VarId>,
    pub(crate) define_index: HashMap<String, DefineId>,
}

impl CompositeModel {
    pub fn vars(&self) -> &[VarInfo] {
        &self.vars
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn var_id(&self, path: &str) -> Option<VarId> {
        self.var_index.get(path).copied()
    }

    pub fn defines(&self) -> &[DefineInfo] {
        &self.defines
    }

    pub fn define_id(&self, path: &str) -> Option<DefineId> {
        self.define_index.get(path).copied()
    }

    pub fn instances(&self) -> &[InstanceInfo] {
        &self.instances
    }

    pub fn constraints(&self) -> &[ConstraintInfo] {
        &self.constraints
    }

    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    pub fn init_rule(&self, var: VarId) -> Option<&CExpr> {
        self.init_rules.get(var).and_then(Option::as_ref)
    }

    pub fn next_rule(&self, var: VarId) -> Option<&CExpr> {
        self.next_rules.get(var).and_then(Option::as_ref)
    }

    pub fn symbol_name(&self, id: SymbolId) -> Option<&str> {
        self.symbols.get_index(id as usize).map(String::as_str)
    }

    /// Convert a runtime value back into a model literal.
    pub fn literal(&self, value: Value) -> Literal {
        match value {
            Value::Bool(b) => Literal::Bool(b),
            Value::Int(v) => Literal::Int(v),
            Value::Symbol(id) => Literal::Symbol(self.symbol_name(id).unwrap_or("?").to_string()),
        }
    }

    /// Current value of `var` in `state`.
    pub fn value(&self, state: &GlobalState, var: VarId) -> Value {
        self.vars[var].codec.decode(state.index(var))
    }

    /// Ordered path -> value view of a state.
    pub fn decode(&self, state: &GlobalState) -> StateSnapshot {
        self.vars
            .iter()
            .enumerate()
            .map(|(id, var)| (var.path.clone(), self.literal(self.value(state, id))))
            .collect()
    }

    /// Inverse of [`CompositeModel::decode`]; `None` when a variable is
    /// missing or a value lies outside its domain.
    pub fn encode(&self, snapshot: &StateSnapshot) -> Option<GlobalState> {
        let indices = self
            .vars
            .iter()
            .map(|var| {
                let literal = snapshot.get(&var.path)?;
                var.domain.index_of(literal).map(|idx| idx as u32)
            })
            .collect::<Option<Vec<u32>>>()?;
        Some(GlobalState::from_indices(indices))
    }

    /// Evaluate a compiled expression against a state (and an optional
    /// next state for two-state expressions).
    pub fn eval(&self, expr: &CExpr, current: &GlobalState, next: Option<&GlobalState>) -> Value {
        EvalEnv::new(self, Some(current), next).eval(expr)
    }

    /// Evaluate define `id` at `state`.
    pub fn eval_define(&self, id: DefineId, state: &GlobalState) -> Value {
        EvalEnv::new(self, Some(state), None).eval(&self.defines[id].expr)
    }

    /// Evaluate the define at qualified `path`, if it exists.
    pub fn define_value(&self, path: &str, state: &GlobalState) -> Option<Literal> {
        let id = self.define_id(path)?;
        Some(self.literal(self.eval_define(id, state)))
    }

    /// Candidate domain indices for `var` in an initial state.
    pub fn init_candidates(&self, var: VarId) -> Vec<u32> {
        let env = EvalEnv::new(self, None, None);
        self.candidates(var, self.init_rule(var), &env)
    }

    /// Candidate domain indices for `var` in a successor of `state`.
    pub fn next_candidates(&self, var: VarId, state: &GlobalState) -> Vec<u32> {
        let env = EvalEnv::new(self, Some(state), None);
        self.candidates(var, self.next_rule(var), &env)
    }

    fn candidates(&self, var: VarId, rule: Option<&CExpr>, env: &EvalEnv<'_>) -> Vec<u32> {
        let info = &self.vars[var];
        let size = info.domain.size();
        match rule {
            None => (0..size as u32).collect(),
            Some(expr) => {
                let mut values = Vec::new();
                env.candidates(expr, &mut values);
                let mut out = Vec::with_capacity(values.len());
                for value in values {
                    if let Some(idx) = info.codec.encode(value, size) {
                        if !out.contains(&idx) {
                            out.push(idx);
                        }
                    }
                }
                out
            }
        }
    }

    /// Index of the first transition constraint violated by `current -> next`.
    pub fn violated_constraint(&self, current: &GlobalState, next: &GlobalState) -> Option<usize> {
        let env = EvalEnv::new(self, Some(current), Some(next));
        self.constraints
            .iter()
            .position(|c| !env.eval(&c.expr).is_true())
    }

    /// Conjunction of all transition constraints over `current -> next`.
    pub fn constraints_hold(&self, current: &GlobalState, next: &GlobalState) -> bool {
        self.violated_constraint(current, next).is_none()
    }

    /// Whether property `idx` holds at `state`.
    pub fn eval_property(&self, idx: usize, state: &GlobalState) -> bool {
        self.eval(&self.properties[idx].formula, state, None).is_true()
    }
}
