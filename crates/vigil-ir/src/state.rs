//! Global states and counterexample traces.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::domain::Literal;

/// Index of a variable in the composite's variable table.
pub type VarId = usize;

/// Full assignment to every variable of a composite model.
///
/// Each slot holds the dense domain index of the variable's value, so a
/// stored state is domain-valid by construction. Equality and hashing are
/// by the full value vector; clones share the same allocation.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalState(Arc<[u32]>);

impl GlobalState {
    pub fn from_indices(indices: impl Into<Arc<[u32]>>) -> Self {
        GlobalState(indices.into())
    }

    /// Domain index of variable `var`.
    pub fn index(&self, var: VarId) -> u32 {
        self.0[var]
    }

    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for GlobalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobalState{:?}", &self.0[..])
    }
}

/// Decoded view of a global state: qualified variable path to value, in
/// variable declaration order.
pub type StateSnapshot = IndexMap<String, Literal>;

/// Sequence of global states connected by legal transitions, starting at an
/// initial state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    pub states: Vec<GlobalState>,
}

impl Trace {
    pub fn new(states: Vec<GlobalState>) -> Self {
        Self { states }
    }

    /// Number of transitions in the trace.
    pub fn steps(&self) -> usize {
        self.states.len().saturating_sub(1)
    }

    pub fn last(&self) -> Option<&GlobalState> {
        self.states.last()
    }
}
