// Command handler for: Show

use miette::IntoDiagnostic;
use serde_json::{json, Value};
use vigil_ir::CompositeModel;

use super::helpers::{build_or_exit, load_model};
use crate::cli::ModelSource;
use crate::types::OutputFormat;

fn describe(composite: &CompositeModel) -> Value {
    let instances: Vec<Value> = composite
        .instances()
        .iter()
        .map(|inst| json!({"path": inst.path, "label": inst.label, "module": inst.module}))
        .collect();
    let variables: Vec<Value> = composite
        .vars()
        .iter()
        .map(|var| json!({"path": var.path, "domain": var.domain.to_string()}))
        .collect();
    let defines: Vec<Value> = composite
        .defines()
        .iter()
        .map(|def| json!({"path": def.path, "type": def.ty.to_string()}))
        .collect();
    let constraints: Vec<Value> = composite
        .constraints()
        .iter()
        .map(|c| json!({"origin": c.origin, "formula": c.text}))
        .collect();
    let properties: Vec<Value> = composite
        .properties()
        .iter()
        .map(|p| json!({"name": p.name, "formula": p.text}))
        .collect();
    json!({
        "instances": instances,
        "variables": variables,
        "defines": defines,
        "constraints": constraints,
        "properties": properties,
    })
}

pub(crate) fn run_show_command(
    source: &ModelSource,
    format: OutputFormat,
) -> miette::Result<()> {
    let model = load_model(source)?;
    let composite = build_or_exit(&model);
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&describe(&composite)).into_diagnostic()?);
        return Ok(());
    }

    println!("Instances:");
    for inst in composite.instances() {
        let path = if inst.path.is_empty() { &inst.label } else { &inst.path };
        println!("  {path}: {}", inst.module);
    }
    println!("Variables ({}):", composite.num_vars());
    for var in composite.vars() {
        println!("  {}: {}", var.path, var.domain);
    }
    println!("Defines ({}):", composite.defines().len());
    for def in composite.defines() {
        println!("  {}: {}", def.path, def.ty);
    }
    println!("Constraints ({}):", composite.constraints().len());
    for c in composite.constraints() {
        println!("  [{}] {}", c.origin, c.text);
    }
    println!("Properties ({}):", composite.properties().len());
    for p in composite.properties() {
        println!("  {}: {}", p.name, p.text);
    }
    Ok(())
}
