#![doc = include_str!("../README.md")]

mod cli;
mod commands;
mod types;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::helpers::{check_options_from_cli, parse_output_format};

fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = parse_output_format(&cli.format)?;
    let options = check_options_from_cli(&cli);

    let success = match cli.command {
        Commands::Check { source, trace_out } => {
            commands::check::run_check_command(&source, trace_out, &options, format)?
        }
        Commands::Simulate {
            source,
            steps,
            seed,
            trace_out,
        } => commands::simulate::run_simulate_command(&source, steps, seed, trace_out, format)?,
        Commands::ExportModel { builtin, out } => {
            commands::export::run_export_command(&builtin, out)?;
            true
        }
        Commands::Show { source } => {
            commands::show::run_show_command(&source, format)?;
            true
        }
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
