use vigil_ir::state::GlobalState;
use vigil_ir::CompositeModel;

use crate::product::CandidateProduct;

/// Legal successors of one global state.
#[derive(Debug, Clone, Default)]
pub struct Successors {
    pub states: Vec<GlobalState>,
    /// Candidates produced by the product before constraint filtering.
    pub candidates: usize,
}

impl Successors {
    /// No legal successor: every candidate was pruned (or a rule produced
    /// no candidate at all).
    pub fn is_deadlock(&self) -> bool {
        self.states.is_empty()
    }
}

/// Computes the constrained successor relation of a composite model.
#[derive(Clone, Copy)]
pub struct TransitionEvaluator<'m> {
    model: &'m CompositeModel,
}

impl<'m> TransitionEvaluator<'m> {
    pub fn new(model: &'m CompositeModel) -> Self {
        Self { model }
    }

    /// Per-variable `next` candidate sets at `state`.
    pub fn candidate_sets(&self, state: &GlobalState) -> Vec<Vec<u32>> {
        (0..self.model.num_vars())
            .map(|var| self.model.next_candidates(var, state))
            .collect()
    }

    pub fn successors(&self, state: &GlobalState) -> Successors {
        let sets = self.candidate_sets(state);
        let mut candidates = 0;
        let states = CandidateProduct::new(&sets)
            .inspect(|_| candidates += 1)
            .filter(|next| self.model.constraints_hold(state, next))
            .collect();
        Successors { states, candidates }
    }

    /// Lazy form of [`Self::successors`] over precomputed `sets`: legal
    /// successors are produced one at a time, so callers can stop early.
    pub fn successor_stream<'a>(
        &self,
        state: &'a GlobalState,
        sets: &'a [Vec<u32>],
    ) -> impl Iterator<Item = GlobalState> + 'a
    where
        'm: 'a,
    {
        let model: &'a CompositeModel = self.model;
        CandidateProduct::new(sets).filter(move |next| model.constraints_hold(state, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initial::initial_states;
    use vigil_ir::domain::Domain;
    use vigil_ir::expr::Expr;
    use vigil_ir::module::{Model, ModuleDefinition, ModuleInstance};

    fn single(def: ModuleDefinition) -> CompositeModel {
        let model = Model::new(ModuleInstance::new("main", def.name.clone())).with_definition(def);
        vigil_ir::build(&model).expect("builds")
    }

    #[test]
    fn three_way_choice_yields_three_successors() {
        let composite = single(
            ModuleDefinition::new("Main")
                .with_var("v", Domain::enumeration(["a", "b", "c"]))
                .with_init("v", Expr::sym("a"))
                .with_next("v", Expr::choice([Expr::sym("a"), Expr::sym("b"), Expr::sym("c")])),
        );
        let init = initial_states(&composite);
        let succ = TransitionEvaluator::new(&composite).successors(&init[0]);
        assert_eq!(succ.states.len(), 3);
        assert_eq!(succ.candidates, 3);
    }

    #[test]
    fn constraints_see_current_and_next_values() {
        let composite = single(
            ModuleDefinition::new("Main")
                .with_var("n", Domain::Range { min: 0, max: 3 })
                .with_init("n", Expr::int(1))
                .with_constraint(Expr::next("n").greater_than(Expr::path("n"))),
        );
        let init = initial_states(&composite);
        let succ = TransitionEvaluator::new(&composite).successors(&init[0]);
        let values: Vec<u32> = succ.states.iter().map(|s| s.index(0)).collect();
        assert_eq!(values, vec![2, 3]);
        assert_eq!(succ.candidates, 4);
    }

    #[test]
    fn fully_pruned_state_is_a_deadlock() {
        let composite = single(
            ModuleDefinition::new("Main")
                .with_var("flag", Domain::Boolean)
                .with_init("flag", Expr::bool(false))
                .with_constraint(Expr::bool(false)),
        );
        let init = initial_states(&composite);
        let succ = TransitionEvaluator::new(&composite).successors(&init[0]);
        assert!(succ.is_deadlock());
        assert_eq!(succ.candidates, 2);
    }

    #[test]
    fn unmatched_case_gives_no_candidate() {
        let composite = single(
            ModuleDefinition::new("Main")
                .with_var("flag", Domain::Boolean)
                .with_init("flag", Expr::bool(true))
                .with_next("flag", Expr::case([(Expr::path("flag").negate(), Expr::bool(true))])),
        );
        let init = initial_states(&composite);
        let succ = TransitionEvaluator::new(&composite).successors(&init[0]);
        assert!(succ.is_deadlock());
        assert_eq!(succ.candidates, 0);
    }

    #[test]
    fn successor_stream_matches_collected_successors() {
        let composite = single(
            ModuleDefinition::new("Main")
                .with_var("n", Domain::Range { min: 0, max: 3 })
                .with_init("n", Expr::int(1))
                .with_constraint(Expr::next("n").differs(Expr::path("n"))),
        );
        let init = initial_states(&composite);
        let evaluator = TransitionEvaluator::new(&composite);
        let sets = evaluator.candidate_sets(&init[0]);
        let streamed: Vec<GlobalState> = evaluator.successor_stream(&init[0], &sets).collect();
        assert_eq!(streamed, evaluator.successors(&init[0]).states);
        assert_eq!(evaluator.successor_stream(&init[0], &sets).take(1).count(), 1);
    }
}
