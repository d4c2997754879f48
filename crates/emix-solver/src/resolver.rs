//! Solver resolution: availability probing, installation, and selection.
//!
//! The resolver answers the caller's two questions with different failure
//! contracts. Availability and installation are best-effort: transient
//! registry and subprocess failures fold into `false`, never into errors, so
//! a single absent solver cannot abort a batch check. Selection is strict:
//! it returns complete invocation parameters or a descriptive error, and by
//! default refuses to substitute a different solver than requested, because
//! silent substitution can silently change numerical results.

use crate::command::{CommandOutcome, InstallCommand};
use crate::error::{RegistryError, SolverError, SolverResult};
use crate::registry::ModuleRegistry;
use crate::{Resolution, SolveIo, SolverName, DEFAULT_SOLVER};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// An alternate resolution strategy, attempted only when the primary
/// registry lookup fails and the caller has explicitly permitted
/// substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Scan the system PATH for the requested solver's executable.
    PathScanPreferred,
    /// Use the in-process pure-Rust Clarabel backend (always available).
    PureRust,
    /// Scan the system PATH for a specific alternate solver.
    PathScan(SolverName),
}

/// Resolver policy knobs.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Permit alternate resolution strategies when
    /// [`SolverResolver::pick_solver`] is called without a per-call override.
    /// Off by default.
    pub allow_fallback: bool,
    /// Bounded wait for the external install command.
    pub install_timeout: Duration,
    /// Fallback strategies, attempted in order.
    pub fallbacks: Vec<Fallback>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            allow_fallback: false,
            install_timeout: Duration::from_secs(300),
            fallbacks: vec![
                Fallback::PathScanPreferred,
                Fallback::PureRust,
                Fallback::PathScan(SolverName::Cbc),
            ],
        }
    }
}

/// Executes the external install command for a solver.
///
/// A seam so tests can observe or suppress subprocess invocation; production
/// code uses [`SystemInstallRunner`].
pub trait InstallRunner {
    fn run(&self, name: SolverName, timeout: Duration) -> SolverResult<CommandOutcome>;
}

/// Runs the real install command from the static table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInstallRunner;

impl InstallRunner for SystemInstallRunner {
    fn run(&self, name: SolverName, timeout: Duration) -> SolverResult<CommandOutcome> {
        InstallCommand::for_solver(name).run(timeout)
    }
}

/// Discovers, installs if necessary, and selects a solver backend.
pub struct SolverResolver<R, C = SystemInstallRunner> {
    registry: R,
    runner: C,
    config: ResolverConfig,
}

impl<R: ModuleRegistry> SolverResolver<R> {
    /// Resolver over the given registry with default policy.
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            runner: SystemInstallRunner,
            config: ResolverConfig::default(),
        }
    }

    /// Resolver with explicit policy.
    pub fn with_config(registry: R, config: ResolverConfig) -> Self {
        Self {
            registry,
            runner: SystemInstallRunner,
            config,
        }
    }
}

impl<R: ModuleRegistry, C: InstallRunner> SolverResolver<R, C> {
    /// Resolver with an injected install runner (tests).
    pub fn with_runner(registry: R, runner: C, config: ResolverConfig) -> Self {
        Self {
            registry,
            runner,
            config,
        }
    }

    /// The active policy.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The underlying module registry.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// The install-command runner.
    pub fn runner(&self) -> &C {
        &self.runner
    }

    /// Read-only probe: is this solver present in the module registry?
    ///
    /// Any lookup failure is treated as "not available", never raised.
    pub fn is_available(&self, name: SolverName) -> bool {
        match self.registry.find(name) {
            Ok(_) => true,
            Err(err) => {
                debug!(solver = %name, "registry lookup failed: {err}");
                false
            }
        }
    }

    /// Install a solver by raw name.
    ///
    /// The only error is [`SolverError::Unsupported`] for names outside the
    /// allow-list; ordinary unavailability is a `false` result.
    pub fn install(&self, name: &str) -> SolverResult<bool> {
        let solver: SolverName = name.parse()?;
        Ok(self.install_solver(solver))
    }

    /// Install a supported solver, returning final verified availability.
    ///
    /// Strategy, stopping at first success:
    /// 1. The registry's in-process installer, if it has one. Failures here
    ///    are swallowed; older registries without an installer are expected.
    /// 2. The static external install command, with combined output captured
    ///    and a bounded wait.
    ///
    /// Either way the result is re-verified through [`Self::is_available`]:
    /// an install can succeed at the process level yet leave the module
    /// unregistered.
    pub fn install_solver(&self, name: SolverName) -> bool {
        match self.registry.install(name) {
            Ok(()) => {
                if self.is_available(name) {
                    debug!(solver = %name, "installed via registry");
                    return true;
                }
                debug!(solver = %name, "registry install did not register the module");
            }
            Err(RegistryError::InstallUnsupported) => {
                debug!(solver = %name, "registry has no in-process installer");
            }
            Err(err) => {
                debug!(solver = %name, "in-process install failed: {err}");
            }
        }

        match self.runner.run(name, self.config.install_timeout) {
            Ok(outcome) if outcome.success => {
                let available = self.is_available(name);
                if !available {
                    warn!(
                        solver = %name,
                        "install command succeeded but module is still unregistered"
                    );
                }
                available
            }
            Ok(outcome) => {
                warn!(solver = %name, "install command failed:\n{}", outcome.output.trim_end());
                false
            }
            Err(err) => {
                warn!(solver = %name, "install command error: {err}");
                false
            }
        }
    }

    /// Ensure every requested solver is present or installed.
    ///
    /// Always returns a complete mapping over the case-normalized input
    /// names. Unsupported names become `false` entries with an optional
    /// warning; one bad name never aborts the batch. When not quiet, one
    /// warning line is emitted per solver that remains unavailable,
    /// including the exact command to install it manually.
    pub fn ensure_all<I, S>(&self, names: I, quiet: bool) -> BTreeMap<String, bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut results = BTreeMap::new();
        for raw in names {
            let key = raw.as_ref().trim().to_ascii_lowercase();
            match key.parse::<SolverName>() {
                Err(err) => {
                    if !quiet {
                        warn!("{err}");
                    }
                    results.insert(key, false);
                }
                Ok(solver) => {
                    let available = self.is_available(solver) || self.install_solver(solver);
                    if !available && !quiet {
                        warn!(
                            "solver '{}' is not available and could not be installed; \
                             install manually with: {}",
                            solver,
                            InstallCommand::for_solver(solver).display()
                        );
                    }
                    results.insert(key, available);
                }
            }
        }
        results
    }

    /// Select one solver and return its invocation parameters.
    ///
    /// Strict-first policy:
    /// 1. Registry hit: NL-file invocation of the registry-reported binary.
    /// 2. Miss with fallback disallowed: [`SolverError::Unavailable`] with
    ///    the manual install command. The strict path never substitutes.
    /// 3. Miss with fallback allowed: the configured [`Fallback`] strategies
    ///    in order, else [`SolverError::Unavailable`].
    ///
    /// `allow_fallback` overrides [`ResolverConfig::allow_fallback`] for this
    /// call; `None` defers to the configured policy.
    ///
    /// Selection performs no installation; pre-warm with
    /// [`Self::ensure_all`] before selecting in a strict context.
    pub fn pick_solver(
        &self,
        preferred: Option<&str>,
        allow_fallback: Option<bool>,
    ) -> SolverResult<Resolution> {
        let name: SolverName = match preferred {
            Some(raw) => raw.parse()?,
            None => DEFAULT_SOLVER,
        };
        let allow_fallback = allow_fallback.unwrap_or(self.config.allow_fallback);

        if let Ok(path) = self.registry.find(name) {
            return Ok(Resolution {
                factory: format!("{}nl", name.as_str()),
                solve_io: SolveIo::NlFile,
                executable: Some(path),
                resolved: format!("{} (AMPL module)", name.as_str()),
            });
        }

        let install_hint = InstallCommand::for_solver(name).display();
        if !allow_fallback {
            return Err(SolverError::Unavailable {
                solver: name,
                install_hint,
            });
        }

        for fallback in &self.config.fallbacks {
            if let Some(resolution) = self.try_fallback(*fallback, name) {
                debug!(resolved = %resolution.resolved, "fallback resolution");
                return Ok(resolution);
            }
        }

        Err(SolverError::Unavailable {
            solver: name,
            install_hint,
        })
    }

    fn try_fallback(&self, fallback: Fallback, preferred: SolverName) -> Option<Resolution> {
        match fallback {
            Fallback::PathScanPreferred => scan_path(preferred),
            Fallback::PathScan(alternate) => scan_path(alternate),
            Fallback::PureRust => Some(Resolution {
                factory: "clarabel".to_string(),
                solve_io: SolveIo::InProcess,
                executable: None,
                resolved: "clarabel (pure Rust)".to_string(),
            }),
        }
    }
}

/// Look for a solver executable of the same name on the search path.
fn scan_path(name: SolverName) -> Option<Resolution> {
    let path = which::which(name.executable_name()).ok()?;
    Some(Resolution {
        factory: format!("{}nl", name.as_str()),
        solve_io: SolveIo::NlFile,
        executable: Some(path),
        resolved: format!("{} (PATH)", name.as_str()),
    })
}
