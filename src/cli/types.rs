//! CLI type definitions — clap command structures for the `gastown-town` binary.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gastown-town")]
#[command(about = "Per-town orchestration engine for the Gastown agent control plane", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a YAML config file (defaults + env still apply)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP edge and scheduler ticker for this town
    Serve,

    /// Apply embedded schema migrations against the configured database
    Migrate,

    /// Inspect a single bead or agent
    Inspect {
        #[command(subcommand)]
        what: InspectTarget,
    },
}

#[derive(Subcommand)]
pub enum InspectTarget {
    /// Print a bead and its dependencies/events
    Bead { id: String },
    /// Print an agent and its current hook
    Agent { id: String },
}
