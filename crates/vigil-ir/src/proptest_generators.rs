//! Proptest strategies for generating well-formed models.
//!
//! Every generated model builds without error: all variables share one
//! integer range `0..=max`, rule results are constants or copies of other
//! variables, and `case` expressions always end in a `TRUE` branch.

use proptest::prelude::*;

use crate::domain::Domain;
use crate::expr::Expr;
use crate::module::{Model, ModuleDefinition, ModuleInstance};

/// Shape of a deterministic `next` rule.
#[derive(Debug, Clone)]
enum StepRule {
    Constant(i64),
    Copy(usize),
    Conditional {
        on: usize,
        equals: i64,
        then: i64,
        otherwise: i64,
    },
    Rotate,
}

fn var_name(idx: usize) -> String {
    format!("x{idx}")
}

fn step_rule(idx: usize, max: i64, rule: &StepRule) -> Expr {
    let x = || Expr::path(var_name(idx));
    match rule {
        StepRule::Constant(c) => Expr::int(*c),
        StepRule::Copy(j) => Expr::path(var_name(*j)),
        StepRule::Conditional {
            on,
            equals,
            then,
            otherwise,
        } => Expr::case([
            (Expr::path(var_name(*on)).equals(Expr::int(*equals)), Expr::int(*then)),
            (Expr::bool(true), Expr::int(*otherwise)),
        ]),
        StepRule::Rotate => Expr::case(
            (0..max)
                .map(|v| (x().equals(Expr::int(v)), Expr::int(v + 1)))
                .chain(std::iter::once((Expr::bool(true), Expr::int(0)))),
        ),
    }
}

fn arb_step_rule(nvars: usize, max: i64) -> impl Strategy<Value = StepRule> {
    prop_oneof![
        (0..=max).prop_map(StepRule::Constant),
        (0..nvars).prop_map(StepRule::Copy),
        (0..nvars, 0..=max, 0..=max, 0..=max).prop_map(|(on, equals, then, otherwise)| {
            StepRule::Conditional {
                on,
                equals,
                then,
                otherwise,
            }
        }),
        Just(StepRule::Rotate),
    ]
}

fn single_module_model(def: ModuleDefinition, property: Expr) -> Model {
    Model::new(ModuleInstance::new("main", def.name.clone()))
        .with_definition(def)
        .with_property("never_target", property)
}

/// Strategy for a model whose `init` and `next` rules are all deterministic
/// and which has no transition constraints, so it has exactly one run.
///
/// Generated models have 1-4 variables over `0..=max` (`max` in 1..=3) and a
/// single property `x0 != target`.
pub fn arb_deterministic_model() -> impl Strategy<Value = Model> {
    (1..=4usize, 1..=3i64)
        .prop_flat_map(|(nvars, max)| {
            (
                Just(max),
                proptest::collection::vec(0..=max, nvars..=nvars),
                proptest::collection::vec(arb_step_rule(nvars, max), nvars..=nvars),
                0..=max,
            )
        })
        .prop_map(|(max, inits, rules, target)| {
            let mut def = ModuleDefinition::new("Main");
            for (idx, (init, rule)) in inits.iter().zip(&rules).enumerate() {
                let name = var_name(idx);
                def = def
                    .with_var(name.clone(), Domain::Range { min: 0, max })
                    .with_init(name.clone(), Expr::int(*init))
                    .with_next(name, step_rule(idx, max, rule));
            }
            single_module_model(def, Expr::path("x0").differs(Expr::int(target)))
        })
}

/// Strategy for a small nondeterministic model.
///
/// Each variable's `next` rule is either deterministic or a choice between
/// two constants. Half of the generated models also carry the transition
/// constraint `next(x0) = max -> next(x1) != max`, which prunes (and
/// sometimes deadlocks) the transition relation.
pub fn arb_nondeterministic_model() -> impl Strategy<Value = Model> {
    (2..=4usize, 1..=2i64)
        .prop_flat_map(|(nvars, max)| {
            (
                Just(max),
                proptest::collection::vec(0..=max, nvars..=nvars),
                proptest::collection::vec(
                    prop_oneof![
                        arb_step_rule(nvars, max).prop_map(Ok::<StepRule, (i64, i64)>),
                        (0..=max, 0..=max).prop_map(Err::<StepRule, (i64, i64)>),
                    ],
                    nvars..=nvars,
                ),
                any::<bool>(),
                0..=max,
            )
        })
        .prop_map(|(max, inits, rules, constrained, target)| {
            let mut def = ModuleDefinition::new("Main");
            for (idx, (init, rule)) in inits.iter().zip(&rules).enumerate() {
                let name = var_name(idx);
                let next = match rule {
                    Ok(step) => step_rule(idx, max, step),
                    Err((a, b)) => Expr::choice([Expr::int(*a), Expr::int(*b)]),
                };
                def = def
                    .with_var(name.clone(), Domain::Range { min: 0, max })
                    .with_init(name.clone(), Expr::int(*init))
                    .with_next(name, next);
            }
            if constrained {
                def = def.with_constraint(
                    Expr::next("x0")
                        .equals(Expr::int(max))
                        .implies(Expr::next("x1").differs(Expr::int(max))),
                );
            }
            single_module_model(def, Expr::path("x1").differs(Expr::int(target)))
        })
}
