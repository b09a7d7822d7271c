//! Random single-path simulation.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;
use vigil_ir::state::{GlobalState, Trace};
use vigil_ir::CompositeModel;

use crate::initial::initial_states;
use crate::transition::TransitionEvaluator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationOutcome {
    /// Ran `max_steps` steps without incident.
    Completed,
    /// The last state of the trace violates the named property.
    Violated { property: String },
    /// The last state of the trace has no legal successor.
    Deadlocked,
    /// The model has no initial state.
    NoInitialState,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    pub trace: Trace,
    pub outcome: SimulationOutcome,
}

fn violated_property(model: &CompositeModel, state: &GlobalState) -> Option<String> {
    (0..model.properties().len())
        .find(|&idx| !model.eval_property(idx, state))
        .map(|idx| model.properties()[idx].name.clone())
}

/// Walk one random path of at most `max_steps` transitions, checking every
/// property along the way. The same seed always yields the same path; a
/// deterministic model yields its unique run regardless of seed.
pub fn simulate(model: &CompositeModel, max_steps: usize, seed: u64) -> Simulation {
    let mut rng = StdRng::seed_from_u64(seed);
    let evaluator = TransitionEvaluator::new(model);

    let Some(first) = initial_states(model).choose(&mut rng).cloned() else {
        return Simulation {
            trace: Trace::new(Vec::new()),
            outcome: SimulationOutcome::NoInitialState,
        };
    };
    let mut states = vec![first];
    let outcome = loop {
        let current = &states[states.len() - 1];
        if let Some(property) = violated_property(model, current) {
            break SimulationOutcome::Violated { property };
        }
        if states.len() > max_steps {
            break SimulationOutcome::Completed;
        }
        let successors = evaluator.successors(current);
        let Some(next) = successors.states.choose(&mut rng).cloned() else {
            break SimulationOutcome::Deadlocked;
        };
        states.push(next);
    };
    debug!(steps = states.len() - 1, ?outcome, "Simulation finished");
    Simulation {
        trace: Trace::new(states),
        outcome,
    }
}
