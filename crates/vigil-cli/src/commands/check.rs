// Command handler for: Check

use std::path::PathBuf;

use miette::IntoDiagnostic;
use vigil_engine::counterexample::{format_state, format_trace};
use vigil_engine::explore::CheckOptions;
use vigil_engine::pipeline::{model_fingerprint, verify_composite};
use vigil_engine::report::VerificationReport;
use vigil_engine::{MultiPropertyResult, VerificationResult};
use vigil_ir::CompositeModel;

use super::helpers::{build_or_exit, load_model, write_json_artifact};
use crate::cli::ModelSource;
use crate::types::OutputFormat;

/// Returns whether every property was verified without deadlock.
pub(crate) fn run_check_command(
    source: &ModelSource,
    trace_out: Option<PathBuf>,
    options: &CheckOptions,
    format: OutputFormat,
) -> miette::Result<bool> {
    let model = load_model(source)?;
    let fingerprint = model_fingerprint(&model).into_diagnostic()?;
    let composite = build_or_exit(&model);
    let result = verify_composite(&composite, options);
    let report = VerificationReport::new(&composite, &result, Some(fingerprint));

    if let Some(path) = &trace_out {
        write_json_artifact(path, &serde_json::to_value(&report).into_diagnostic()?)?;
    }
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
        OutputFormat::Text => print!("{}", render_text(&composite, &result)),
    }
    Ok(result.all_verified())
}

pub(crate) fn render_text(composite: &CompositeModel, result: &MultiPropertyResult) -> String {
    let mut out = String::new();
    for verdict in &result.verdicts {
        out.push_str(&format!("{}: {}\n", verdict.name, verdict.result));
        match &verdict.result {
            VerificationResult::Violated { trace } => {
                out.push_str(&format!("  formula: {}\n", verdict.formula));
                out.push_str(&format_trace(composite, trace));
            }
            VerificationResult::Deadlocked { state, .. } => {
                out.push_str("  deadlocked state:\n");
                out.push_str(&format_state(composite, state));
            }
            _ => {}
        }
    }
    if let Some(trace) = &result.deadlock {
        out.push_str(&format!(
            "Deadlock reachable in {} steps:\n{}",
            trace.steps(),
            format_trace(composite, trace)
        ));
    }
    let stats = &result.stats;
    out.push_str(&format!(
        "Overall: {} ({} states, {} transitions, depth {}, {} ms)\n",
        result.overall_verdict().to_uppercase(),
        stats.states,
        stats.edges,
        stats.max_depth,
        stats.elapsed_ms
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_ir::library::{power_grid, power_grid_unconstrained};

    #[test]
    fn text_report_lists_every_property() {
        let composite = vigil_ir::build(&power_grid()).unwrap();
        let result = verify_composite(&composite, &CheckOptions::default());
        let text = render_text(&composite, &result);
        assert!(text.contains("bus_1_never_broken: VERIFIED"), "{text}");
        assert!(text.contains("bus_2_never_broken: VERIFIED"), "{text}");
        assert!(text.contains("Overall: VERIFIED"), "{text}");
    }

    #[test]
    fn text_report_includes_counterexample() {
        let composite = vigil_ir::build(&power_grid_unconstrained()).unwrap();
        let result = verify_composite(&composite, &CheckOptions::default());
        let text = render_text(&composite, &result);
        assert!(text.contains("VIOLATED (counterexample of 2 steps)"), "{text}");
        assert!(text.contains("State 2:"), "{text}");
    }
}
