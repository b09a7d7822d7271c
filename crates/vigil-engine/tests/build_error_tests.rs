mod common;

use common::*;
use vigil_engine::explore::CheckOptions;
use vigil_engine::{verify, PipelineError};
use vigil_ir::domain::Domain;
use vigil_ir::expr::Expr;
use vigil_ir::module::{Model, ModuleDefinition, ModuleInstance};
use vigil_ir::BuildError;

fn latch() -> ModuleDefinition {
    ModuleDefinition::new("Latch")
        .with_param("set", Domain::Boolean)
        .with_var("held", Domain::Boolean)
        .with_define("out", Expr::path("held").or(Expr::path("set")))
        .with_init("held", Expr::bool(false))
        .with_next("held", Expr::path("held").or(Expr::path("set")))
}

fn with_main(main: ModuleDefinition) -> Model {
    Model::new(ModuleInstance::new("main", "Main"))
        .with_definition(latch())
        .with_definition(main)
}

fn build_error(model: &Model) -> BuildError {
    match verify(model, &CheckOptions::default()) {
        Err(PipelineError::Build(err)) => err,
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("model should not build"),
    }
}

#[test]
fn binding_through_own_output_is_cyclic() {
    let main = ModuleDefinition::new("Main")
        .with_instance(ModuleInstance::new("L", "Latch").bind(Expr::path("L.out")));
    let err = build_error(&with_main(main));
    assert_eq!(err.kind(), "cyclic_instantiation", "{err}");
}

#[test]
fn binding_through_descendant_define_is_cyclic() {
    let wrapper = ModuleDefinition::new("Wrapper")
        .with_param("enable", Domain::Boolean)
        .with_instance(ModuleInstance::new("inner", "Latch").bind(Expr::path("enable")));
    let main = ModuleDefinition::new("Main")
        .with_instance(ModuleInstance::new("A", "Wrapper").bind(Expr::path("A.inner.out")));
    let err = build_error(&with_main(main).with_definition(wrapper));
    assert!(
        matches!(err, BuildError::CyclicInstantiation { ref instance, .. } if instance == "A"),
        "{err}"
    );
}

#[test]
fn missing_module_is_unbound() {
    let main = ModuleDefinition::new("Main").with_instance(ModuleInstance::new("X", "Nowhere"));
    let err = build_error(&with_main(main));
    assert_eq!(
        err,
        BuildError::UnboundReference {
            scope: "main".into(),
            name: "Nowhere".into()
        }
    );
}

#[test]
fn wrong_binding_type_is_mismatch() {
    let main = ModuleDefinition::new("Main")
        .with_var("n", Domain::Range { min: 0, max: 3 })
        .with_init("n", Expr::int(0))
        .with_instance(ModuleInstance::new("L", "Latch").bind(Expr::path("n")));
    assert_eq!(build_error(&with_main(main)).kind(), "type_mismatch");
}

#[test]
fn rule_outside_domain_is_mismatch() {
    let def = ModuleDefinition::new("Main")
        .with_var("n", Domain::Range { min: 0, max: 3 })
        .with_init("n", Expr::int(0))
        .with_next("n", Expr::path("n").plus(Expr::int(1)));
    assert_eq!(build_error(&single_module(def)).kind(), "type_mismatch");
}

#[test]
fn chained_instances_build() {
    let main = ModuleDefinition::new("Main")
        .with_var("go", Domain::Boolean)
        .with_init("go", Expr::bool(true))
        .with_instance(ModuleInstance::new("A", "Latch").bind(Expr::path("go")))
        .with_instance(ModuleInstance::new("B", "Latch").bind(Expr::path("A.out")));
    let model = with_main(main).with_property("b_follows", Expr::path("B.held").implies(Expr::path("A.held")));
    let result = verify(&model, &CheckOptions::default()).expect("builds");
    assert!(result.all_verified(), "{}", result.verdicts[0].result);
}

#[test]
fn unmatched_init_case_is_rejected_instead_of_verified() {
    let stuck = ModuleDefinition::new("Stuck")
        .with_var("x", Domain::Boolean)
        .with_init("x", Expr::case([(Expr::bool(false), Expr::bool(true))]));
    let main = ModuleDefinition::new("Main").with_instance(ModuleInstance::new("S", "Stuck"));
    let model = with_main(main)
        .with_definition(stuck)
        .with_property("never", Expr::bool(false));
    let err = build_error(&model);
    assert!(
        matches!(
            err,
            BuildError::TypeMismatch { ref context, ref found, .. }
                if context == "init(S.x)" && found == "no initial value"
        ),
        "{err}"
    );
}
