//! Resolved expressions produced by the Composite Builder.
//!
//! Paths are replaced by variable/define indices and parameter references
//! are substituted by the compiled binding expression, so evaluation needs
//! no scope lookups.

use crate::expr::BinOp;
use crate::state::VarId;

/// Index of a define in the composite's define table.
pub type DefineId = usize;
/// Index of an interned enum symbol.
pub type SymbolId = u32;

/// Runtime value of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Symbol(SymbolId),
}

impl Value {
    pub fn is_true(self) -> bool {
        matches!(self, Value::Bool(true))
    }

    pub fn as_int(self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CExpr {
    Const(Value),
    Var(VarId),
    NextVar(VarId),
    Define(DefineId),
    NextDefine(DefineId),
    Not(Box<CExpr>),
    Binary(BinOp, Box<CExpr>, Box<CExpr>),
    Count(Vec<CExpr>),
    Case(Vec<(CExpr, CExpr)>),
    Choice(Vec<CExpr>),
}

impl CExpr {
    pub fn is_true_literal(&self) -> bool {
        matches!(self, CExpr::Const(Value::Bool(true)))
    }

    /// Rewrite current-state reads into next-state reads.
    ///
    /// Used when a parameter is referenced under `next(..)`: the binding was
    /// compiled against the current state and is shifted as a whole.
    pub fn shifted_to_next(&self) -> CExpr {
        match self {
            CExpr::Const(v) => CExpr::Const(*v),
            CExpr::Var(v) | CExpr::NextVar(v) => CExpr::NextVar(*v),
            CExpr::Define(d) | CExpr::NextDefine(d) => CExpr::NextDefine(*d),
            CExpr::Not(inner) => CExpr::Not(Box::new(inner.shifted_to_next())),
            CExpr::Binary(op, lhs, rhs) => CExpr::Binary(
                *op,
                Box::new(lhs.shifted_to_next()),
                Box::new(rhs.shifted_to_next()),
            ),
            CExpr::Count(items) => CExpr::Count(items.iter().map(|e| e.shifted_to_next()).collect()),
            CExpr::Case(arms) => CExpr::Case(
                arms.iter()
                    .map(|(g, r)| (g.shifted_to_next(), r.shifted_to_next()))
                    .collect(),
            ),
            CExpr::Choice(items) => {
                CExpr::Choice(items.iter().map(|e| e.shifted_to_next()).collect())
            }
        }
    }

    /// Visit every direct variable and define reference.
    pub fn for_each_ref(&self, f: &mut impl FnMut(Reference)) {
        match self {
            CExpr::Const(_) => {}
            CExpr::Var(v) | CExpr::NextVar(v) => f(Reference::Var(*v)),
            CExpr::Define(d) | CExpr::NextDefine(d) => f(Reference::Define(*d)),
            CExpr::Not(inner) => inner.for_each_ref(f),
            CExpr::Binary(_, lhs, rhs) => {
                lhs.for_each_ref(f);
                rhs.for_each_ref(f);
            }
            CExpr::Count(items) | CExpr::Choice(items) => {
                for item in items {
                    item.for_each_ref(f);
                }
            }
            CExpr::Case(arms) => {
                for (g, r) in arms {
                    g.for_each_ref(f);
                    r.for_each_ref(f);
                }
            }
        }
    }
}

/// A direct reference found in a compiled expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    Var(VarId),
    Define(DefineId),
}
