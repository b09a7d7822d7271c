// Command handler for: ExportModel

use std::path::PathBuf;

use miette::IntoDiagnostic;

use super::helpers::{builtin_model, write_json_artifact};

pub(crate) fn run_export_command(builtin: &str, out: Option<PathBuf>) -> miette::Result<()> {
    let model = builtin_model(builtin)?;
    let value = serde_json::to_value(&model).into_diagnostic()?;
    match out {
        Some(path) => {
            write_json_artifact(&path, &value)?;
            eprintln!("Wrote {builtin} to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?),
    }
    Ok(())
}
