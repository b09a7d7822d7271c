//! Breadth-first reachability over the constrained product automaton.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use vigil_ir::state::{GlobalState, Trace};
use vigil_ir::CompositeModel;

use crate::budget::Budget;
use crate::initial::initial_candidate_sets;
use crate::product::CandidateProduct;
use crate::transition::TransitionEvaluator;

/// Index of a state in discovery order.
pub type StateId = usize;

/// Exploration configuration.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Maximum number of distinct states to record (0 = unlimited).
    pub max_states: usize,
    /// Worker threads: 1 explores sequentially, 0 uses every core.
    pub workers: usize,
    /// Wall-clock limit in seconds (0 = none).
    pub timeout_secs: u64,
    /// Report reachable states without legal successors.
    pub check_deadlock: bool,
    /// Raised externally to stop exploration at the next check.
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            max_states: 0,
            workers: 1,
            timeout_secs: 0,
            check_deadlock: true,
            stop_flag: None,
        }
    }
}

/// Why exploration stopped before the frontier emptied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExhaustionReason {
    NodeBudget { limit: usize },
    Deadline { timeout_secs: u64 },
    Cancelled,
}

impl fmt::Display for ExhaustionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExhaustionReason::NodeBudget { limit } => {
                write!(f, "node budget of {limit} states exceeded")
            }
            ExhaustionReason::Deadline { timeout_secs } => {
                write!(f, "deadline of {timeout_secs}s reached")
            }
            ExhaustionReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExploreError {
    /// Partial exploration proves nothing; the graph is discarded.
    #[error("state space exhausted after {explored} states: {reason}")]
    StateSpaceExhausted {
        explored: usize,
        reason: ExhaustionReason,
    },
}

/// Every reachable state with BFS predecessor links and successor edges.
#[derive(Debug, Clone, Default)]
pub struct StateGraph {
    states: Vec<GlobalState>,
    index: HashMap<GlobalState, StateId>,
    initial: Vec<StateId>,
    predecessor: Vec<Option<StateId>>,
    depth: Vec<usize>,
    successors: Vec<Vec<StateId>>,
    deadlocks: Vec<StateId>,
}

impl StateGraph {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, id: StateId) -> &GlobalState {
        &self.states[id]
    }

    pub fn states(&self) -> &[GlobalState] {
        &self.states
    }

    pub fn id_of(&self, state: &GlobalState) -> Option<StateId> {
        self.index.get(state).copied()
    }

    pub fn initial(&self) -> &[StateId] {
        &self.initial
    }

    pub fn predecessor(&self, id: StateId) -> Option<StateId> {
        self.predecessor[id]
    }

    /// BFS distance from the nearest initial state.
    pub fn depth(&self, id: StateId) -> usize {
        self.depth[id]
    }

    pub fn successors(&self, id: StateId) -> &[StateId] {
        &self.successors[id]
    }

    pub fn deadlocks(&self) -> &[StateId] {
        &self.deadlocks
    }

    pub fn edge_count(&self) -> usize {
        self.successors.iter().map(Vec::len).sum()
    }

    pub fn max_depth(&self) -> usize {
        self.depth.iter().copied().max().unwrap_or(0)
    }

    /// Shortest path from an initial state to `id`.
    pub fn trace_to(&self, id: StateId) -> Trace {
        let mut states = vec![self.states[id].clone()];
        let mut current = id;
        while let Some(prev) = self.predecessor[current] {
            states.push(self.states[prev].clone());
            current = prev;
        }
        states.reverse();
        Trace::new(states)
    }

    fn push(&mut self, state: GlobalState, predecessor: Option<StateId>, depth: usize) -> StateId {
        let id = self.states.len();
        self.index.insert(state.clone(), id);
        self.states.push(state);
        self.predecessor.push(predecessor);
        self.depth.push(depth);
        self.successors.push(Vec::new());
        id
    }

    /// Hash-consing insert; returns the id and whether the state is new.
    fn insert(
        &mut self,
        state: GlobalState,
        predecessor: Option<StateId>,
        depth: usize,
    ) -> (StateId, bool) {
        match self.index.get(&state) {
            Some(&id) => (id, false),
            None => (self.push(state, predecessor, depth), true),
        }
    }

    /// Insert the initial states one at a time, checking the budget after
    /// every new state.
    fn seed(&mut self, model: &CompositeModel, budget: &Budget) -> Result<(), ExploreError> {
        let sets = initial_candidate_sets(model);
        for state in CandidateProduct::new(&sets) {
            let (id, fresh) = self.insert(state, None, 0);
            if fresh {
                self.initial.push(id);
                ReachabilityEngine::exhausted(self, budget)?;
            }
        }
        debug!(count = self.initial.len(), "Initial states constructed");
        Ok(())
    }
}

/// Expansion of one frontier state in a parallel level.
struct Expansion {
    id: StateId,
    edges: Vec<StateId>,
    claimed: Vec<(StateId, GlobalState)>,
    deadlock: bool,
}

/// Exhaustive breadth-first exploration from the initial states.
pub struct ReachabilityEngine<'m> {
    model: &'m CompositeModel,
    options: CheckOptions,
}

impl<'m> ReachabilityEngine<'m> {
    pub fn new(model: &'m CompositeModel, options: CheckOptions) -> Self {
        Self { model, options }
    }

    pub fn explore(&self) -> Result<StateGraph, ExploreError> {
        let budget = Budget::start(&self.options);
        info!(
            variables = self.model.num_vars(),
            workers = self.options.workers,
            max_states = self.options.max_states,
            "Starting reachability analysis..."
        );
        let explored = if self.options.workers == 1 {
            self.explore_sequential(&budget)
        } else {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.options.workers)
                .build()
            {
                Ok(pool) => pool.install(|| self.explore_parallel(&budget)),
                Err(e) => {
                    warn!(error = %e, "Thread pool unavailable, exploring sequentially");
                    self.explore_sequential(&budget)
                }
            }
        };
        let graph = explored?;
        info!(
            states = graph.len(),
            edges = graph.edge_count(),
            max_depth = graph.max_depth(),
            deadlocks = graph.deadlocks.len(),
            "Reachable state space enumerated"
        );
        Ok(graph)
    }

    fn exhausted(graph: &StateGraph, budget: &Budget) -> Result<(), ExploreError> {
        match budget.exceeded(graph.len()) {
            Some(reason) => {
                warn!(explored = graph.len(), %reason, "Exploration stopped early");
                Err(ExploreError::StateSpaceExhausted {
                    explored: graph.len(),
                    reason,
                })
            }
            None => Ok(()),
        }
    }

    fn explore_sequential(&self, budget: &Budget) -> Result<StateGraph, ExploreError> {
        let evaluator = TransitionEvaluator::new(self.model);
        let mut graph = StateGraph::default();
        graph.seed(self.model, budget)?;

        let mut queue: VecDeque<StateId> = graph.initial.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            let state = graph.states[id].clone();
            let sets = evaluator.candidate_sets(&state);
            let depth = graph.depth[id] + 1;
            let mut edges = Vec::new();
            for next in evaluator.successor_stream(&state, &sets) {
                let (next_id, fresh) = graph.insert(next, Some(id), depth);
                edges.push(next_id);
                if fresh {
                    queue.push_back(next_id);
                    Self::exhausted(&graph, budget)?;
                }
            }
            if edges.is_empty() {
                debug!(state = id, "Deadlock reached");
                graph.deadlocks.push(id);
            }
            graph.successors[id] = edges;
            Self::exhausted(&graph, budget)?;
        }
        Ok(graph)
    }

    /// Level-synchronous BFS. Workers claim successors with an atomic
    /// test-and-insert into a shared map, so each state is enqueued once;
    /// claimed states are merged into the graph in id order between levels.
    /// Every claim checks the budget, and the first worker to trip it stops
    /// the others before their next claim.
    fn explore_parallel(&self, budget: &Budget) -> Result<StateGraph, ExploreError> {
        let evaluator = TransitionEvaluator::new(self.model);
        let mut graph = StateGraph::default();
        graph.seed(self.model, budget)?;

        let claimed: DashMap<GlobalState, StateId> = graph
            .states
            .iter()
            .enumerate()
            .map(|(id, state)| (state.clone(), id))
            .collect();
        let id_counter = AtomicUsize::new(graph.len());
        let halted: OnceLock<ExhaustionReason> = OnceLock::new();
        let mut frontier = graph.initial.clone();
        let mut level = 0usize;

        while !frontier.is_empty() {
            let states = &graph.states;
            let expansions: Vec<Option<Expansion>> = frontier
                .par_iter()
                .map(|&id| {
                    let sets = evaluator.candidate_sets(&states[id]);
                    let mut edges = Vec::new();
                    let mut fresh = Vec::new();
                    for next in evaluator.successor_stream(&states[id], &sets) {
                        if halted.get().is_some() {
                            return None;
                        }
                        let next_id = match claimed.entry(next) {
                            Entry::Occupied(entry) => *entry.get(),
                            Entry::Vacant(entry) => {
                                let next_id = id_counter.fetch_add(1, Ordering::Relaxed);
                                fresh.push((next_id, entry.key().clone()));
                                entry.insert(next_id);
                                if let Some(reason) = budget.exceeded(next_id + 1) {
                                    let _ = halted.set(reason);
                                    return None;
                                }
                                next_id
                            }
                        };
                        edges.push(next_id);
                    }
                    let deadlock = edges.is_empty();
                    Some(Expansion {
                        id,
                        edges,
                        claimed: fresh,
                        deadlock,
                    })
                })
                .collect();

            if let Some(&reason) = halted.get() {
                let explored = claimed.len();
                warn!(explored, %reason, "Exploration stopped early");
                return Err(ExploreError::StateSpaceExhausted { explored, reason });
            }

            let mut discovered: Vec<(StateId, StateId, GlobalState)> = Vec::new();
            for expansion in expansions.into_iter().flatten() {
                if expansion.deadlock {
                    graph.deadlocks.push(expansion.id);
                }
                discovered.extend(
                    expansion
                        .claimed
                        .into_iter()
                        .map(|(next_id, state)| (next_id, expansion.id, state)),
                );
                graph.successors[expansion.id] = expansion.edges;
            }
            discovered.sort_unstable_by_key(|(next_id, _, _)| *next_id);

            level += 1;
            frontier = Vec::with_capacity(discovered.len());
            for (next_id, parent, state) in discovered {
                let id = graph.push(state, Some(parent), level);
                debug_assert_eq!(id, next_id);
                frontier.push(id);
            }
            debug!(level, frontier = frontier.len(), states = graph.len(), "BFS level done");
            Self::exhausted(&graph, budget)?;
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_ir::domain::Domain;
    use vigil_ir::expr::Expr;
    use vigil_ir::module::{Model, ModuleDefinition, ModuleInstance};

    fn counter(max: i64) -> CompositeModel {
        let def = ModuleDefinition::new("Counter")
            .with_var("n", Domain::Range { min: 0, max })
            .with_init("n", Expr::int(0))
            .with_next(
                "n",
                Expr::case(
                    (0..max)
                        .map(|v| (Expr::path("n").equals(Expr::int(v)), Expr::int(v + 1)))
                        .chain(std::iter::once((Expr::bool(true), Expr::path("n")))),
                ),
            );
        let model = Model::new(ModuleInstance::new("main", "Counter")).with_definition(def);
        vigil_ir::build(&model).expect("builds")
    }

    #[test]
    fn chain_is_explored_in_depth_order() {
        let composite = counter(4);
        let graph = ReachabilityEngine::new(&composite, CheckOptions::default())
            .explore()
            .expect("explores");
        assert_eq!(graph.len(), 5);
        assert_eq!(graph.max_depth(), 4);
        assert_eq!(graph.trace_to(4).steps(), 4);
        assert_eq!(graph.successors(4), &[4]);
        assert!(graph.deadlocks().is_empty());
    }

    #[test]
    fn node_budget_exhausts() {
        let composite = counter(10);
        let options = CheckOptions {
            max_states: 3,
            ..CheckOptions::default()
        };
        let err = ReachabilityEngine::new(&composite, options)
            .explore()
            .unwrap_err();
        assert_eq!(
            err,
            ExploreError::StateSpaceExhausted {
                explored: 4,
                reason: ExhaustionReason::NodeBudget { limit: 3 }
            }
        );
    }

    /// `width` free booleans; when `seeded`, all start false and only the
    /// successor product is wide.
    fn free_flags(width: usize, seeded: bool) -> CompositeModel {
        let def = (0..width).fold(ModuleDefinition::new("Flags"), |def, i| {
            let name = format!("f{i}");
            let def = def.with_var(name.clone(), Domain::Boolean);
            if seeded {
                def.with_init(name, Expr::bool(false))
            } else {
                def
            }
        });
        let model = Model::new(ModuleInstance::new("main", "Flags")).with_definition(def);
        vigil_ir::build(&model).expect("builds")
    }

    #[test]
    fn node_budget_stops_inside_wide_initial_product() {
        let composite = free_flags(20, false);
        let options = CheckOptions {
            max_states: 100,
            ..CheckOptions::default()
        };
        let err = ReachabilityEngine::new(&composite, options)
            .explore()
            .unwrap_err();
        assert_eq!(
            err,
            ExploreError::StateSpaceExhausted {
                explored: 101,
                reason: ExhaustionReason::NodeBudget { limit: 100 }
            }
        );
    }

    #[test]
    fn node_budget_stops_inside_wide_successor_product() {
        let composite = free_flags(20, true);
        for workers in [1, 4] {
            let options = CheckOptions {
                max_states: 100,
                workers,
                ..CheckOptions::default()
            };
            let err = ReachabilityEngine::new(&composite, options)
                .explore()
                .unwrap_err();
            let ExploreError::StateSpaceExhausted { explored, reason } = err;
            assert_eq!(reason, ExhaustionReason::NodeBudget { limit: 100 });
            assert!(explored > 100, "workers={workers} explored={explored}");
            assert!(explored <= 100 + workers, "workers={workers} explored={explored}");
        }
    }

    #[test]
    fn parallel_matches_sequential() {
        let composite = counter(6);
        let sequential = ReachabilityEngine::new(&composite, CheckOptions::default())
            .explore()
            .expect("explores");
        let parallel = ReachabilityEngine::new(
            &composite,
            CheckOptions {
                workers: 4,
                ..CheckOptions::default()
            },
        )
        .explore()
        .expect("explores");
        assert_eq!(sequential.len(), parallel.len());
        for state in sequential.states() {
            let id = parallel.id_of(state).expect("state reached in parallel");
            assert_eq!(
                parallel.depth(id),
                sequential.depth(sequential.id_of(state).expect("known"))
            );
        }
    }

    #[test]
    fn cancelled_before_start() {
        let composite = counter(2);
        let options = CheckOptions {
            stop_flag: Some(Arc::new(AtomicBool::new(true))),
            ..CheckOptions::default()
        };
        let err = ReachabilityEngine::new(&composite, options)
            .explore()
            .unwrap_err();
        assert!(matches!(
            err,
            ExploreError::StateSpaceExhausted {
                reason: ExhaustionReason::Cancelled,
                ..
            }
        ));
    }
}
