//! Error types for solver resolution.

use crate::SolverName;
use thiserror::Error;

/// Errors that cross the resolver boundary.
///
/// Only [`SolverError::Unsupported`] and [`SolverError::Unavailable`] are
/// surfaced from the resolver's public operations; transient registry and
/// subprocess failures are folded into boolean results with a logged warning.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Requested name is outside the fixed allow-list. Precondition
    /// violation; never retried.
    #[error("Unsupported solver '{name}'. Supported solvers: {}", .allowed.join(", "))]
    Unsupported {
        name: String,
        allowed: Vec<&'static str>,
    },

    /// Named solver not found and no fallback was permitted (or every
    /// fallback strategy was exhausted). Carries the manual remediation
    /// command so the message is actionable on its own.
    #[error("Solver '{solver}' is not available. Install it with: {install_hint}")]
    Unavailable {
        solver: SolverName,
        install_hint: String,
    },

    /// The external install command exceeded its bounded wait.
    #[error("Install command timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The external install command could not be spawned.
    #[error("Failed to start install command: {0}")]
    ProcessStart(#[source] std::io::Error),

    /// Generic IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for resolver operations.
pub type SolverResult<T> = Result<T, SolverError>;

/// Errors internal to module-registry adapters.
///
/// These never escape the resolver; they are converted to boolean
/// availability results at the component boundary.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The module is not present in the registry.
    #[error("module '{name}' not found in registry")]
    NotFound { name: String },

    /// This registry has no in-process install capability.
    #[error("registry does not support in-process installation")]
    InstallUnsupported,

    /// An in-process install attempt failed.
    #[error("in-process install failed: {0}")]
    InstallFailed(String),

    /// Registry lookup failed at the filesystem level.
    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_message_lists_allowed_names() {
        let err = SolverError::Unsupported {
            name: "bogus".into(),
            allowed: SolverName::allowed().to_vec(),
        };
        let msg = err.to_string();
        assert!(msg.contains("bogus"));
        assert!(msg.contains("highs"));
        assert!(msg.contains("cbc"));
    }

    #[test]
    fn unavailable_message_carries_remediation() {
        let err = SolverError::Unavailable {
            solver: SolverName::Cbc,
            install_hint: "python3 -m amplpy.modules install cbc".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("cbc"));
        assert!(msg.contains("python3 -m amplpy.modules install cbc"));
    }
}
