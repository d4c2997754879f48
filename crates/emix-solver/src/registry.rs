//! Module-registry abstraction.
//!
//! The module registry is the external store of installable solver backends
//! (the AMPL module distribution). It is modeled as an injected capability
//! rather than ambient global state so tests can substitute a fake, and it is
//! always queried live: lookups are cheap directory probes and correctness
//! requires freshness, so nothing is cached here.

use crate::error::RegistryError;
use crate::SolverName;
use std::path::{Path, PathBuf};

/// Environment variable overriding the module search path.
/// Colon-separated list of directories, checked in order.
pub const MODULES_DIR_ENV: &str = "AMPL_MODULES_DIR";

/// External package-style store of solver backends, queryable by name.
///
/// `find` fails if the module is absent. `install` is capability-detected:
/// registries without an in-process installer keep the default body, which
/// reports [`RegistryError::InstallUnsupported`], and the resolver falls back
/// to the external install command.
pub trait ModuleRegistry {
    /// Locate the executable for an installed module.
    fn find(&self, name: SolverName) -> Result<PathBuf, RegistryError>;

    /// Install a module in-process, if this registry supports it.
    fn install(&self, name: SolverName) -> Result<(), RegistryError> {
        let _ = name;
        Err(RegistryError::InstallUnsupported)
    }
}

/// Registry over the AMPL module store on the local filesystem.
///
/// Search order:
/// 1. Directories listed in `AMPL_MODULES_DIR` (colon-separated)
/// 2. `~/.ampl/modules/bin`
///
/// Deliberately does NOT scan the system PATH: a solver found on PATH is a
/// fallback resolution strategy, not a registry hit, and the two are reported
/// differently to the caller.
#[derive(Debug, Clone)]
pub struct AmplModuleRegistry {
    search_dirs: Vec<PathBuf>,
}

impl AmplModuleRegistry {
    /// Build a registry from the environment and the default module home.
    pub fn from_env() -> Self {
        let mut search_dirs = Vec::new();
        if let Ok(paths) = std::env::var(MODULES_DIR_ENV) {
            for entry in std::env::split_paths(&paths) {
                if !entry.as_os_str().is_empty() {
                    search_dirs.push(entry);
                }
            }
        }
        if let Some(home) = dirs::home_dir() {
            search_dirs.push(home.join(".ampl").join("modules").join("bin"));
        }
        Self { search_dirs }
    }

    /// Build a registry over explicit directories (used by tests and tools
    /// that manage their own module store).
    pub fn with_dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    /// The directories this registry probes, in order.
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    fn candidate(dir: &Path, name: SolverName) -> PathBuf {
        dir.join(name.executable_name())
    }
}

impl ModuleRegistry for AmplModuleRegistry {
    fn find(&self, name: SolverName) -> Result<PathBuf, RegistryError> {
        for dir in &self.search_dirs {
            let candidate = Self::candidate(dir, name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(RegistryError::NotFound {
            name: name.as_str().to_string(),
        })
    }
}
