//! Solver discovery, installation and selection for emix.
//!
//! The optimization layer delegates solving entirely to external engines.
//! Before a model is dispatched, this crate answers two questions:
//!
//! 1. "Are these solvers available?" — bulk, best-effort, never fails the
//!    caller ([`SolverResolver::ensure_all`]).
//! 2. "Give me invocation parameters for this one solver" — single, strict,
//!    fails loudly when unmet ([`SolverResolver::pick_solver`]).
//!
//! Solvers live in an external module registry (the AMPL module store),
//! abstracted behind [`ModuleRegistry`] so tests can substitute a fake.
//! Missing modules are installed in two stages: the registry's own installer
//! if it has one, then a static external command. Selection never installs;
//! the two responsibilities are deliberately separate so a caller can
//! pre-warm availability with `ensure_all` and then select strictly.
//!
//! # Supported solvers
//!
//! | Solver  | Problem Type | Invocation |
//! |---------|--------------|------------|
//! | HiGHS   | LP/MIP       | NL file    |
//! | CBC     | MIP          | NL file    |
//! | SCIP    | MIP/MINLP    | NL file    |
//! | Couenne | MINLP        | NL file    |
//! | Gurobi  | LP/MIP       | NL file    |
//!
//! The pure-Rust Clarabel backend in `emix-model` is always available and is
//! offered as an opt-in fallback when the requested module is absent.

pub mod command;
pub mod error;
pub mod registry;
pub mod resolver;

pub use command::{CommandOutcome, InstallCommand};
pub use error::{RegistryError, SolverError, SolverResult};
pub use registry::{AmplModuleRegistry, ModuleRegistry, MODULES_DIR_ENV};
pub use resolver::{Fallback, InstallRunner, ResolverConfig, SolverResolver, SystemInstallRunner};

use std::path::PathBuf;

/// Default solver when the caller expresses no preference.
pub const DEFAULT_SOLVER: SolverName = SolverName::Highs;

/// The fixed allow-list of supported solver backends.
///
/// Any name outside this set is rejected before any filesystem or network
/// action is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverName {
    /// HiGHS - high-performance LP/MIP solver.
    Highs,
    /// CBC - COIN-OR Branch and Cut for MIP.
    Cbc,
    /// SCIP - constraint-integer programming solver.
    Scip,
    /// Couenne - global optimizer for non-convex MINLP.
    Couenne,
    /// Gurobi - commercial LP/MIP solver (requires a license).
    Gurobi,
}

impl SolverName {
    /// Normalized identifier used in registries and command tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            SolverName::Highs => "highs",
            SolverName::Cbc => "cbc",
            SolverName::Scip => "scip",
            SolverName::Couenne => "couenne",
            SolverName::Gurobi => "gurobi",
        }
    }

    /// Executable name inside the module store and on PATH.
    pub fn executable_name(&self) -> &'static str {
        self.as_str()
    }

    /// Display name for user-facing output.
    pub fn display_name(&self) -> &'static str {
        match self {
            SolverName::Highs => "HiGHS",
            SolverName::Cbc => "CBC",
            SolverName::Scip => "SCIP",
            SolverName::Couenne => "Couenne",
            SolverName::Gurobi => "Gurobi",
        }
    }

    /// One-line description of what this solver does.
    pub fn description(&self) -> &'static str {
        match self {
            SolverName::Highs => "LP/MIP high-performance",
            SolverName::Cbc => "MIP branch-and-cut",
            SolverName::Scip => "MIP/MINLP constraint-integer",
            SolverName::Couenne => "Global MINLP optimization",
            SolverName::Gurobi => "Commercial LP/MIP",
        }
    }

    /// All supported solvers.
    pub fn all() -> &'static [SolverName] {
        &[
            SolverName::Highs,
            SolverName::Cbc,
            SolverName::Scip,
            SolverName::Couenne,
            SolverName::Gurobi,
        ]
    }

    /// Normalized names of the allow-list, for error messages.
    pub fn allowed() -> &'static [&'static str] {
        &["highs", "cbc", "scip", "couenne", "gurobi"]
    }
}

impl std::fmt::Display for SolverName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SolverName {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "highs" => Ok(SolverName::Highs),
            "cbc" => Ok(SolverName::Cbc),
            "scip" => Ok(SolverName::Scip),
            "couenne" => Ok(SolverName::Couenne),
            "gurobi" => Ok(SolverName::Gurobi),
            other => Err(SolverError::Unsupported {
                name: other.to_string(),
                allowed: SolverName::allowed().to_vec(),
            }),
        }
    }
}

/// Whether a solver is invoked through a text-based intermediate file or a
/// native in-process API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveIo {
    /// Text interchange: the model is written to an NL file and the solver
    /// executable is invoked on it.
    NlFile,
    /// Native in-process call, no executable involved.
    InProcess,
}

impl std::fmt::Display for SolveIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveIo::NlFile => write!(f, "nl"),
            SolveIo::InProcess => write!(f, "in-process"),
        }
    }
}

/// Connection parameters for invoking a chosen solver.
///
/// Constructed fresh on every successful [`SolverResolver::pick_solver`]
/// call; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Identifier the modeling layer uses to instantiate the solver
    /// interface (e.g. `highsnl` for NL-file invocation of HiGHS).
    pub factory: String,
    /// Interface mode for the chosen solver.
    pub solve_io: SolveIo,
    /// Path to the resolved executable; present for NL-file invocation.
    pub executable: Option<PathBuf>,
    /// Human-readable record of what was resolved and where it came from.
    pub resolved: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!("HiGHS".parse::<SolverName>().unwrap(), SolverName::Highs);
        assert_eq!(" cbc ".parse::<SolverName>().unwrap(), SolverName::Cbc);
        assert!(matches!(
            "bogus".parse::<SolverName>(),
            Err(SolverError::Unsupported { .. })
        ));
    }

    #[test]
    fn allow_list_matches_enum() {
        let allowed = SolverName::allowed();
        assert_eq!(allowed.len(), SolverName::all().len());
        for &name in SolverName::all() {
            assert!(allowed.contains(&name.as_str()));
        }
    }

    #[test]
    fn solve_io_display() {
        assert_eq!(SolveIo::NlFile.to_string(), "nl");
        assert_eq!(SolveIo::InProcess.to_string(), "in-process");
    }
}
