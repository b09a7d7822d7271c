//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Explicit-state safety checker for hierarchical finite-state models")]
#[command(version)]
pub(crate) struct Cli {
    /// Maximum number of distinct states to explore (0 = unlimited)
    #[arg(long, global = true, default_value_t = 0)]
    pub(crate) max_states: usize,

    /// Worker threads: 1 explores sequentially, 0 uses every core
    #[arg(long, global = true, default_value_t = 1)]
    pub(crate) workers: usize,

    /// Wall-clock timeout in seconds (0 = none)
    #[arg(long, global = true, default_value_t = 0)]
    pub(crate) timeout: u64,

    /// Do not report reachable states without legal successors
    #[arg(long, global = true, default_value_t = false)]
    pub(crate) no_deadlock_check: bool,

    /// Output format: text | json
    #[arg(long, global = true, default_value = "text")]
    pub(crate) format: String,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

/// Where to take the model from: a JSON file or a built-in name.
#[derive(Args, Clone, Debug)]
pub(crate) struct ModelSource {
    /// Path to a JSON model file
    pub(crate) model: Option<PathBuf>,

    /// Built-in model: power-grid | power-grid-unconstrained
    #[arg(long, conflicts_with = "model")]
    pub(crate) builtin: Option<String>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Verify every property of a model
    Check {
        #[command(flatten)]
        source: ModelSource,

        /// Write the machine-readable report (JSON) to this path
        #[arg(long)]
        trace_out: Option<PathBuf>,
    },

    /// Walk one random path through a model
    Simulate {
        #[command(flatten)]
        source: ModelSource,

        /// Maximum number of transitions
        #[arg(long, default_value_t = 20)]
        steps: usize,

        /// RNG seed; the same seed replays the same path
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Write the simulated trace (JSON) to this path
        #[arg(long)]
        trace_out: Option<PathBuf>,
    },

    /// Write a built-in model as JSON
    ExportModel {
        /// Built-in model name
        #[arg(long)]
        builtin: String,

        /// Output path (stdout if omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Describe the composite: instances, variables, defines, constraints, properties
    Show {
        #[command(flatten)]
        source: ModelSource,
    },
}
