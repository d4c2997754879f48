use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "emix", author, version, about = "Energy-system planning and dispatch optimizer", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Solve a case: load assets, resolve a solver, run the dispatch model
    Run {
        /// Base directory containing the case folder
        #[arg(long)]
        dir: PathBuf,
        /// Case name (subfolder under --dir with a system.toml)
        #[arg(long)]
        case: String,
        /// Solver name (e.g. highs, cbc, gurobi)
        #[arg(long)]
        solver: Option<String>,
        /// ISO date/datetime stamped into the run record (defaults to now)
        #[arg(long)]
        date: Option<String>,
        /// Write raw results to <case>/results.json
        #[arg(long)]
        raw_results: bool,
        /// Permit alternate solver backends when the requested one is absent
        #[arg(long)]
        allow_fallback: bool,
        /// Attempt installation of the requested solver before selecting
        #[arg(long)]
        install: bool,
    },
    /// Solver availability and installation
    Solver {
        #[command(subcommand)]
        command: SolverCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum SolverCommands {
    /// List supported solvers and their availability
    List,
    /// Ensure solvers are present, installing them if necessary
    Ensure {
        /// Solver names to ensure
        solvers: Vec<String>,
        /// Suppress per-solver warnings
        #[arg(long)]
        quiet: bool,
    },
    /// Resolve invocation parameters for one solver
    Pick {
        /// Solver name (defaults to the configured default)
        solver: Option<String>,
        /// Permit alternate backends when the requested one is absent
        #[arg(long)]
        allow_fallback: bool,
    },
    /// Show solver configuration and registry state
    Status,
}
