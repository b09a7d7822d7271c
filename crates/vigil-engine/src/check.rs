use vigil_ir::CompositeModel;

use crate::explore::{StateGraph, StateId};
use crate::result::{PropertyVerdict, VerificationResult};

/// Evaluates safety properties over an explored state graph.
pub struct PropertyChecker<'a> {
    model: &'a CompositeModel,
    graph: &'a StateGraph,
}

impl<'a> PropertyChecker<'a> {
    pub fn new(model: &'a CompositeModel, graph: &'a StateGraph) -> Self {
        Self { model, graph }
    }

    /// Shallowest reachable state violating property `idx`, ties broken by
    /// discovery order.
    pub fn first_violation(&self, idx: usize) -> Option<StateId> {
        (0..self.graph.len())
            .filter(|&id| !self.model.eval_property(idx, self.graph.state(id)))
            .min_by_key(|&id| (self.graph.depth(id), id))
    }

    /// Shallowest deadlocked state.
    pub fn first_deadlock(&self) -> Option<StateId> {
        self.graph
            .deadlocks()
            .iter()
            .copied()
            .min_by_key(|&id| (self.graph.depth(id), id))
    }

    pub fn check(&self, idx: usize, check_deadlock: bool) -> VerificationResult {
        if let Some(id) = self.first_violation(idx) {
            return VerificationResult::Violated {
                trace: self.graph.trace_to(id),
            };
        }
        if check_deadlock {
            if let Some(id) = self.first_deadlock() {
                return VerificationResult::Deadlocked {
                    state: self.graph.state(id).clone(),
                    trace: self.graph.trace_to(id),
                };
            }
        }
        VerificationResult::Verified
    }

    /// Verdicts for every property, in declaration order.
    pub fn check_all(&self, check_deadlock: bool) -> Vec<PropertyVerdict> {
        self.model
            .properties()
            .iter()
            .enumerate()
            .map(|(idx, property)| PropertyVerdict {
                name: property.name.clone(),
                formula: property.text.clone(),
                result: self.check(idx, check_deadlock),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explore::{CheckOptions, ReachabilityEngine};
    use vigil_ir::domain::Domain;
    use vigil_ir::expr::Expr;
    use vigil_ir::module::{Model, ModuleDefinition, ModuleInstance};

    #[test]
    fn shortest_violation_is_reported() {
        // Two branches reach `n = 2`: directly and through `n = 1`.
        let def = ModuleDefinition::new("Main")
            .with_var("n", Domain::Range { min: 0, max: 2 })
            .with_init("n", Expr::int(0))
            .with_next(
                "n",
                Expr::case([
                    (
                        Expr::path("n").equals(Expr::int(0)),
                        Expr::choice([Expr::int(1), Expr::int(2)]),
                    ),
                    (Expr::bool(true), Expr::int(2)),
                ]),
            );
        let model = Model::new(ModuleInstance::new("main", "Main"))
            .with_definition(def)
            .with_property("below_two", Expr::path("n").differs(Expr::int(2)));
        let composite = vigil_ir::build(&model).expect("builds");
        let graph = ReachabilityEngine::new(&composite, CheckOptions::default())
            .explore()
            .expect("explores");
        let result = PropertyChecker::new(&composite, &graph).check(0, true);
        let VerificationResult::Violated { trace } = result else {
            panic!("expected violation, got {result:?}");
        };
        assert_eq!(trace.steps(), 1);
    }
}
