// Shared helpers for command handlers: model loading, option plumbing and
// artifact output.

use std::fs;
use std::path::Path;

use miette::IntoDiagnostic;
use serde_json::Value;
use tracing::info;
use vigil_engine::explore::CheckOptions;
use vigil_ir::library::{builtin, BUILTIN_MODELS};
use vigil_ir::module::Model;
use vigil_ir::CompositeModel;

use crate::cli::{Cli, ModelSource};
use crate::types::OutputFormat;

/// Exit code for models rejected by the composite builder.
pub(crate) const EXIT_BUILD_ERROR: i32 = 2;

pub(crate) fn parse_output_format(raw: &str) -> miette::Result<OutputFormat> {
    match raw {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        other => miette::bail!("Unknown output format: {other}. Use 'text' or 'json'."),
    }
}

pub(crate) fn check_options_from_cli(cli: &Cli) -> CheckOptions {
    CheckOptions {
        max_states: cli.max_states,
        workers: cli.workers,
        timeout_secs: cli.timeout,
        check_deadlock: !cli.no_deadlock_check,
        stop_flag: None,
    }
}

pub(crate) fn builtin_model(name: &str) -> miette::Result<Model> {
    builtin(name).ok_or_else(|| {
        miette::miette!(
            "Unknown built-in model '{name}'. Available: {}",
            BUILTIN_MODELS.join(", ")
        )
    })
}

pub(crate) fn load_model(source: &ModelSource) -> miette::Result<Model> {
    match (&source.model, &source.builtin) {
        (_, Some(name)) => builtin_model(name),
        (Some(path), None) => {
            let text = fs::read_to_string(path)
                .into_diagnostic()
                .map_err(|e| e.wrap_err(format!("Failed to read {}", path.display())))?;
            let model: Model = serde_json::from_str(&text)
                .into_diagnostic()
                .map_err(|e| e.wrap_err(format!("Invalid model file {}", path.display())))?;
            info!(file = %path.display(), "Model loaded");
            Ok(model)
        }
        (None, None) => miette::bail!("Provide a model file or --builtin NAME"),
    }
}

/// Build the composite, or print the diagnostic and exit with
/// [`EXIT_BUILD_ERROR`].
pub(crate) fn build_or_exit(model: &Model) -> CompositeModel {
    match vigil_ir::build(model) {
        Ok(composite) => composite,
        Err(err) => {
            eprintln!("{:?}", miette::Report::new(err));
            std::process::exit(EXIT_BUILD_ERROR);
        }
    }
}

pub(crate) fn write_json_artifact(path: &Path, value: &Value) -> miette::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    fs::write(path, serde_json::to_string_pretty(value).into_diagnostic()?).into_diagnostic()?;
    Ok(())
}
