//! Built-in reference models.
//!
//! The power grid has two generators feeding two buses through generator
//! breakers `GB1`/`GB2`; the bus tie breaker `BB1` couples the buses. A bus
//! fed by more than one source at once is broken. The controller picks
//! breaker and generator commands nondeterministically each step, and its
//! transition constraints forbid command combinations that would close all
//! three breakers together.

use crate::domain::Domain;
use crate::expr::Expr;
use crate::module::{Model, ModuleDefinition, ModuleInstance};

/// Names accepted by [`builtin`].
pub const BUILTIN_MODELS: &[&str] = &["power-grid", "power-grid-unconstrained"];

/// Look up a built-in model by name.
pub fn builtin(name: &str) -> Option<Model> {
    match name {
        "power-grid" => Some(power_grid()),
        "power-grid-unconstrained" => Some(power_grid_unconstrained()),
        _ => None,
    }
}

fn generator_commands() -> Domain {
    Domain::enumeration(["cmd_on", "cmd_off"])
}

fn breaker_commands() -> Domain {
    Domain::enumeration(["cmd_open", "cmd_closed"])
}

/// Two-position device whose state follows its command one step later.
fn follower(
    name: &str,
    commands: Domain,
    states: [&str; 2],
    commands_for: [&str; 2],
) -> ModuleDefinition {
    ModuleDefinition::new(name)
        .with_param("cmd", commands)
        .with_var("state", Domain::enumeration(states))
        .with_init("state", Expr::sym(states[1]))
        .with_next(
            "state",
            Expr::case([
                (Expr::path("cmd").equals(Expr::sym(commands_for[0])), Expr::sym(states[0])),
                (Expr::path("cmd").equals(Expr::sym(commands_for[1])), Expr::sym(states[1])),
                (Expr::bool(true), Expr::path("state")),
            ]),
        )
}

pub fn generator() -> ModuleDefinition {
    follower("Generator", generator_commands(), ["on", "off"], ["cmd_on", "cmd_off"])
        .with_define("is_on", Expr::path("state").equals(Expr::sym("on")))
}

pub fn breaker() -> ModuleDefinition {
    follower(
        "Breaker",
        breaker_commands(),
        ["closed", "open"],
        ["cmd_closed", "cmd_open"],
    )
    .with_define("is_closed", Expr::path("state").equals(Expr::sym("closed")))
}

/// A bus with a direct feed and a feed through the tie breaker.
pub fn bus() -> ModuleDefinition {
    let sources = || Expr::count([Expr::path("direct"), Expr::path("tie")]);
    ModuleDefinition::new("Bus")
        .with_param("direct", Domain::Boolean)
        .with_param("tie", Domain::Boolean)
        .with_define("is_powered", sources().at_least(Expr::int(1)))
        .with_define("is_broken", sources().greater_than(Expr::int(1)))
}

pub fn system() -> ModuleDefinition {
    let feeds = |generator: &str, breaker: &str| {
        Expr::path(format!("{generator}.is_on")).and(Expr::path(format!("{breaker}.is_closed")))
    };
    let instance = |name: &str, module: &str, cmd: &str| {
        ModuleInstance::new(name, module).bind(Expr::path(cmd))
    };
    ModuleDefinition::new("System")
        .with_param("cmd_g1", generator_commands())
        .with_param("cmd_g2", generator_commands())
        .with_param("cmd_gb1", breaker_commands())
        .with_param("cmd_gb2", breaker_commands())
        .with_param("cmd_bb1", breaker_commands())
        .with_instance(instance("G1", "Generator", "cmd_g1"))
        .with_instance(instance("G2", "Generator", "cmd_g2"))
        .with_instance(instance("GB1", "Breaker", "cmd_gb1"))
        .with_instance(instance("GB2", "Breaker", "cmd_gb2"))
        .with_instance(instance("BB1", "Breaker", "cmd_bb1"))
        .with_instance(
            ModuleInstance::new("B1", "Bus")
                .bind(feeds("G1", "GB1"))
                .bind(feeds("G2", "GB2").and(Expr::path("BB1.is_closed"))),
        )
        .with_instance(
            ModuleInstance::new("B2", "Bus")
                .bind(feeds("G2", "GB2"))
                .bind(feeds("G1", "GB1").and(Expr::path("BB1.is_closed"))),
        )
}

fn closing_all(first: &str, tie: &str, other: &str) -> Expr {
    let closed = |cmd: &str| Expr::next(cmd).equals(Expr::sym("cmd_closed"));
    closed(first)
        .and(closed(tie))
        .implies(Expr::next(other).equals(Expr::sym("cmd_open")))
}

fn controller(constrained: bool) -> ModuleDefinition {
    let mut def = ModuleDefinition::new("Controller");
    for cmd in ["g1_cmd", "g2_cmd"] {
        def = def
            .with_var(cmd, generator_commands())
            .with_init(cmd, Expr::sym("cmd_on"))
            .with_next(cmd, Expr::choice([Expr::sym("cmd_on"), Expr::sym("cmd_off")]));
    }
    for cmd in ["gb1_cmd", "gb2_cmd", "bb1_cmd"] {
        def = def
            .with_var(cmd, breaker_commands())
            .with_init(cmd, Expr::sym("cmd_open"))
            .with_next(cmd, Expr::choice([Expr::sym("cmd_open"), Expr::sym("cmd_closed")]));
    }
    def = def.with_instance(
        ModuleInstance::new("SC", "System")
            .bind(Expr::path("g1_cmd"))
            .bind(Expr::path("g2_cmd"))
            .bind(Expr::path("gb1_cmd"))
            .bind(Expr::path("gb2_cmd"))
            .bind(Expr::path("bb1_cmd")),
    );
    if constrained {
        def = def
            .with_constraint(closing_all("gb1_cmd", "bb1_cmd", "gb2_cmd"))
            .with_constraint(closing_all("gb2_cmd", "bb1_cmd", "gb1_cmd"));
    }
    def
}

fn power_grid_model(constrained: bool) -> Model {
    Model::new(ModuleInstance::new("main", "Controller"))
        .with_definition(generator())
        .with_definition(breaker())
        .with_definition(bus())
        .with_definition(system())
        .with_definition(controller(constrained))
        .with_property("bus_1_never_broken", Expr::path("SC.B1.is_broken").negate())
        .with_property("bus_2_never_broken", Expr::path("SC.B2.is_broken").negate())
}

/// The reference power grid with the controller's safety constraints.
pub fn power_grid() -> Model {
    power_grid_model(true)
}

/// The same grid without transition constraints; both bus properties fail.
pub fn power_grid_unconstrained() -> Model {
    power_grid_model(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::build;
    use crate::domain::Literal;
    use crate::state::GlobalState;

    #[test]
    fn power_grid_builds() {
        let composite = build(&power_grid()).expect("power grid builds");
        let paths: Vec<&str> = composite.vars().iter().map(|v| v.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "g1_cmd",
                "g2_cmd",
                "gb1_cmd",
                "gb2_cmd",
                "bb1_cmd",
                "SC.G1.state",
                "SC.G2.state",
                "SC.GB1.state",
                "SC.GB2.state",
                "SC.BB1.state",
            ]
        );
        assert_eq!(composite.constraints().len(), 2);
        assert_eq!(composite.properties().len(), 2);
        assert!(composite.define_id("SC.B2.is_broken").is_some());
    }

    #[test]
    fn bus_with_two_sources_is_broken() {
        let composite = build(&power_grid_unconstrained()).expect("builds");
        let mut snapshot = composite.decode(&GlobalState::from_indices(vec![0; 10]));
        for breaker in ["SC.GB1.state", "SC.GB2.state", "SC.BB1.state"] {
            snapshot.insert(breaker.to_string(), Literal::from("closed"));
        }
        for generator in ["SC.G1.state", "SC.G2.state"] {
            snapshot.insert(generator.to_string(), Literal::from("on"));
        }
        let state = composite.encode(&snapshot).expect("valid snapshot");
        assert_eq!(
            composite.define_value("SC.B1.is_broken", &state),
            Some(Literal::Bool(true))
        );
        assert!(!composite.eval_property(0, &state));
    }

    #[test]
    fn builtin_lookup_knows_every_name() {
        for name in BUILTIN_MODELS {
            assert!(builtin(name).is_some(), "{name}");
        }
        assert!(builtin("nope").is_none());
    }
}
