// Command handler for: Simulate

use std::path::PathBuf;

use miette::IntoDiagnostic;
use serde_json::{json, Value};
use vigil_engine::counterexample::{format_trace, trace_report};
use vigil_engine::simulate::{simulate, Simulation, SimulationOutcome};
use vigil_ir::CompositeModel;

use super::helpers::{build_or_exit, load_model, write_json_artifact};
use crate::cli::ModelSource;
use crate::types::OutputFormat;

pub(crate) fn outcome_kind(outcome: &SimulationOutcome) -> &'static str {
    match outcome {
        SimulationOutcome::Completed => "completed",
        SimulationOutcome::Violated { .. } => "violated",
        SimulationOutcome::Deadlocked => "deadlocked",
        SimulationOutcome::NoInitialState => "no_initial_state",
    }
}

fn simulation_json(composite: &CompositeModel, run: &Simulation, seed: u64) -> Value {
    let property = match &run.outcome {
        SimulationOutcome::Violated { property } => Some(property.clone()),
        _ => None,
    };
    json!({
        "seed": seed,
        "outcome": outcome_kind(&run.outcome),
        "violated_property": property,
        "trace": trace_report(composite, &run.trace),
    })
}

/// Returns whether the run ended without a property violation.
pub(crate) fn run_simulate_command(
    source: &ModelSource,
    steps: usize,
    seed: u64,
    trace_out: Option<PathBuf>,
    format: OutputFormat,
) -> miette::Result<bool> {
    let model = load_model(source)?;
    let composite = build_or_exit(&model);
    let run = simulate(&composite, steps, seed);
    let value = simulation_json(&composite, &run, seed);

    if let Some(path) = &trace_out {
        write_json_artifact(path, &value)?;
    }
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?);
        }
        OutputFormat::Text => {
            print!("{}", format_trace(&composite, &run.trace));
            match &run.outcome {
                SimulationOutcome::Violated { property } => {
                    println!("Property '{property}' violated after {} steps", run.trace.steps());
                }
                SimulationOutcome::Deadlocked => {
                    println!("Deadlock after {} steps", run.trace.steps());
                }
                SimulationOutcome::NoInitialState => println!("Model has no initial state"),
                SimulationOutcome::Completed => {
                    println!("Completed {} steps (seed {seed})", run.trace.steps());
                }
            }
        }
    }
    Ok(!matches!(run.outcome, SimulationOutcome::Violated { .. }))
}
