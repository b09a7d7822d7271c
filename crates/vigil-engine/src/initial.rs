use tracing::debug;
use vigil_ir::state::GlobalState;
use vigil_ir::CompositeModel;

use crate::product::CandidateProduct;

/// Per-variable `init` candidate sets. Their product is the initial-state
/// set; exploration streams it through [`CandidateProduct`] instead of
/// materializing it.
pub fn initial_candidate_sets(model: &CompositeModel) -> Vec<Vec<u32>> {
    (0..model.num_vars())
        .map(|var| model.init_candidates(var))
        .collect()
}

/// Initial global states: the Cartesian product of every variable's `init`
/// candidates. Transition constraints do not apply to initial states.
pub fn initial_states(model: &CompositeModel) -> Vec<GlobalState> {
    let sets = initial_candidate_sets(model);
    let states: Vec<GlobalState> = CandidateProduct::new(&sets).collect();
    debug!(count = states.len(), "Initial states constructed");
    states
}
