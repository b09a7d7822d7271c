//! Rendering traces for people and for JSON consumers.

use std::fmt::Write;

use serde::Serialize;
use vigil_ir::state::{GlobalState, StateSnapshot, Trace};
use vigil_ir::CompositeModel;

/// One state of a trace as an ordered path -> value map.
pub type TraceSnapshot = StateSnapshot;

/// Serializable form of a trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceReport {
    pub steps: usize,
    pub states: Vec<TraceSnapshot>,
}

pub fn trace_snapshots(model: &CompositeModel, trace: &Trace) -> Vec<TraceSnapshot> {
    trace.states.iter().map(|s| model.decode(s)).collect()
}

pub fn trace_report(model: &CompositeModel, trace: &Trace) -> TraceReport {
    TraceReport {
        steps: trace.steps(),
        states: trace_snapshots(model, trace),
    }
}

/// Every variable of `state`, one `path = value` per line.
pub fn format_state(model: &CompositeModel, state: &GlobalState) -> String {
    let mut out = String::new();
    for (path, value) in model.decode(state) {
        let _ = writeln!(out, "  {path} = {value}");
    }
    out
}

/// Pretty-print a trace: the first state in full, then only the variables
/// that changed at each step.
pub fn format_trace(model: &CompositeModel, trace: &Trace) -> String {
    let snapshots = trace_snapshots(model, trace);
    let mut out = String::new();
    let mut previous: Option<&TraceSnapshot> = None;
    for (step, snapshot) in snapshots.iter().enumerate() {
        let _ = writeln!(out, "State {step}:");
        let mut changed = 0;
        for (path, value) in snapshot {
            if previous.and_then(|p| p.get(path)) == Some(value) {
                continue;
            }
            changed += 1;
            let _ = writeln!(out, "  {path} = {value}");
        }
        if changed == 0 {
            let _ = writeln!(out, "  (no change)");
        }
        previous = Some(snapshot);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_ir::domain::Domain;
    use vigil_ir::expr::Expr;
    use vigil_ir::module::{Model, ModuleDefinition, ModuleInstance};

    fn model() -> CompositeModel {
        let def = ModuleDefinition::new("Main")
            .with_var("a", Domain::Boolean)
            .with_var("b", Domain::enumeration(["x", "y"]));
        let model = Model::new(ModuleInstance::new("main", "Main")).with_definition(def);
        vigil_ir::build(&model).expect("builds")
    }

    #[test]
    fn only_changes_are_printed_after_the_first_state() {
        let composite = model();
        let trace = Trace::new(vec![
            GlobalState::from_indices(vec![0, 0]),
            GlobalState::from_indices(vec![1, 0]),
            GlobalState::from_indices(vec![1, 0]),
        ]);
        let text = format_trace(&composite, &trace);
        assert_eq!(
            text,
            "State 0:\n  a = FALSE\n  b = x\nState 1:\n  a = TRUE\nState 2:\n  (no change)\n"
        );
    }

    #[test]
    fn report_keeps_declaration_order() {
        let composite = model();
        let trace = Trace::new(vec![GlobalState::from_indices(vec![1, 1])]);
        let report = trace_report(&composite, &trace);
        assert_eq!(report.steps, 0);
        let keys: Vec<&String> = report.states[0].keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
