#![allow(dead_code)]

use std::collections::HashSet;

use vigil_engine::explore::{CheckOptions, ReachabilityEngine, StateGraph};
use vigil_ir::domain::{Domain, Literal};
use vigil_ir::expr::Expr;
use vigil_ir::module::{Model, ModuleDefinition, ModuleInstance};
use vigil_ir::state::GlobalState;
use vigil_ir::CompositeModel;

pub fn build(model: &Model) -> CompositeModel {
    vigil_ir::build(model).unwrap_or_else(|e| panic!("model failed to build: {e}"))
}

pub fn explore(model: &CompositeModel, options: CheckOptions) -> StateGraph {
    ReachabilityEngine::new(model, options)
        .explore()
        .unwrap_or_else(|e| panic!("exploration failed: {e}"))
}

pub fn sequential() -> CheckOptions {
    CheckOptions::default()
}

pub fn parallel(workers: usize) -> CheckOptions {
    CheckOptions {
        workers,
        ..CheckOptions::default()
    }
}

pub fn state_set(graph: &StateGraph) -> HashSet<GlobalState> {
    graph.states().iter().cloned().collect()
}

pub fn lookup(model: &CompositeModel, state: &GlobalState, path: &str) -> Literal {
    if let Some(var) = model.var_id(path) {
        return model.literal(model.value(state, var));
    }
    model
        .define_value(path, state)
        .unwrap_or_else(|| panic!("unknown path {path}"))
}

pub fn single_module(def: ModuleDefinition) -> Model {
    Model::new(ModuleInstance::new("main", def.name.clone())).with_definition(def)
}

/// Counter over `0..=2` whose step into 2 is forbidden by a constraint, so
/// the state `x = 1` has no legal successor.
pub fn blocked_counter() -> Model {
    let def = ModuleDefinition::new("Counter")
        .with_var("x", Domain::Range { min: 0, max: 2 })
        .with_init("x", Expr::int(0))
        .with_next(
            "x",
            Expr::case([
                (Expr::path("x").equals(Expr::int(0)), Expr::int(1)),
                (Expr::path("x").equals(Expr::int(1)), Expr::int(2)),
                (Expr::bool(true), Expr::path("x")),
            ]),
        )
        .with_constraint(Expr::next("x").differs(Expr::int(2)));
    single_module(def)
}
