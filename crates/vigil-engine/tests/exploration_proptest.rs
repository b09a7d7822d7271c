//! Randomized checks of exploration invariants over generated models.

mod common;

use common::*;
use proptest::prelude::*;
use vigil_engine::check::PropertyChecker;
use vigil_engine::explore::CheckOptions;
use vigil_engine::product::CandidateProduct;
use vigil_engine::simulate::{simulate, SimulationOutcome};
use vigil_engine::transition::TransitionEvaluator;
use vigil_engine::{verify_composite, VerificationResult};
use vigil_ir::proptest_generators::{arb_deterministic_model, arb_nondeterministic_model};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn deterministic_model_has_single_run(model in arb_deterministic_model()) {
        let composite = build(&model);
        let graph = explore(&composite, sequential());
        prop_assert_eq!(graph.initial().len(), 1);
        prop_assert_eq!(graph.edge_count(), graph.len());
        prop_assert!(graph.deadlocks().is_empty());

        let run = simulate(&composite, graph.len(), 7);
        let result = verify_composite(&composite, &CheckOptions::default());
        match &result.verdicts[0].result {
            VerificationResult::Violated { trace } => {
                let violated = matches!(run.outcome, SimulationOutcome::Violated { .. });
                prop_assert!(violated);
                prop_assert_eq!(&run.trace, trace);
            }
            VerificationResult::Verified => {
                prop_assert_eq!(&run.outcome, &SimulationOutcome::Completed);
                let visited: std::collections::HashSet<_> = run.trace.states.iter().cloned().collect();
                prop_assert_eq!(visited, state_set(&graph));
            }
            other => prop_assert!(false, "unexpected verdict {}", other),
        }
    }

    #[test]
    fn exploration_is_idempotent(model in arb_nondeterministic_model()) {
        let composite = build(&model);
        let first = explore(&composite, sequential());
        let second = explore(&composite, sequential());
        prop_assert_eq!(first.states(), second.states());
        prop_assert_eq!(first.deadlocks(), second.deadlocks());
    }

    #[test]
    fn parallel_matches_sequential(model in arb_nondeterministic_model(), workers in 2..5usize) {
        let composite = build(&model);
        let seq = explore(&composite, sequential());
        let par = explore(&composite, parallel(workers));
        prop_assert_eq!(state_set(&seq), state_set(&par));
        prop_assert_eq!(seq.edge_count(), par.edge_count());
        prop_assert_eq!(seq.deadlocks().len(), par.deadlocks().len());

        let seq_check = PropertyChecker::new(&composite, &seq);
        let par_check = PropertyChecker::new(&composite, &par);
        let depth = |graph: &vigil_engine::StateGraph, id: Option<usize>| id.map(|id| graph.depth(id));
        prop_assert_eq!(
            depth(&seq, seq_check.first_violation(0)),
            depth(&par, par_check.first_violation(0))
        );
    }

    #[test]
    fn successors_are_candidate_product_minus_constraints(model in arb_nondeterministic_model()) {
        let composite = build(&model);
        let graph = explore(&composite, sequential());
        let evaluator = TransitionEvaluator::new(&composite);
        for state in graph.states() {
            let sets = evaluator.candidate_sets(state);
            let successors = evaluator.successors(state);
            prop_assert_eq!(successors.candidates, CandidateProduct::size(&sets));
            prop_assert!(successors.states.len() <= successors.candidates);
            if composite.constraints().is_empty() {
                prop_assert_eq!(successors.states.len(), successors.candidates);
            }
            for next in &successors.states {
                prop_assert!(composite.constraints_hold(state, next));
                prop_assert!(graph.id_of(next).is_some());
            }
        }
    }

    #[test]
    fn violation_traces_are_shortest(model in arb_nondeterministic_model()) {
        let composite = build(&model);
        let graph = explore(&composite, sequential());
        let result = verify_composite(&composite, &CheckOptions::default());
        if let VerificationResult::Violated { trace } = &result.verdicts[0].result {
            let min_depth = (0..graph.len())
                .filter(|&id| !composite.eval_property(0, graph.state(id)))
                .map(|id| graph.depth(id))
                .min();
            prop_assert_eq!(Some(trace.steps()), min_depth);
            for pair in trace.states.windows(2) {
                let successors = TransitionEvaluator::new(&composite).successors(&pair[0]);
                prop_assert!(successors.states.contains(&pair[1]));
            }
        }
    }
}
