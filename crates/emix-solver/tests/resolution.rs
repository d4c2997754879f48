//! Integration tests for solver resolution.
//!
//! Exercises the resolver against scripted registries and install runners:
//! batch availability, install ordering, strict selection, and fallback
//! behavior.

use emix_solver::{
    CommandOutcome, Fallback, InstallRunner, ModuleRegistry, RegistryError, ResolverConfig,
    Resolution, SolveIo, SolverError, SolverName, SolverResolver, SolverResult,
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

/// Shared "installed modules" store visible to both registry and runner.
type Store = Rc<RefCell<HashSet<SolverName>>>;

/// Registry fake over a shared store, with scripted installer behavior.
struct FakeRegistry {
    store: Store,
    installer: InstallerBehavior,
    install_calls: RefCell<usize>,
}

enum InstallerBehavior {
    /// No in-process installer (default-body trait impl).
    Unsupported,
    /// Installer works and registers the module.
    Works,
    /// Installer raises; the resolver must swallow it.
    Fails,
}

impl FakeRegistry {
    fn new(store: Store, installer: InstallerBehavior) -> Self {
        Self {
            store,
            installer,
            install_calls: RefCell::new(0),
        }
    }
}

impl ModuleRegistry for FakeRegistry {
    fn find(&self, name: SolverName) -> Result<PathBuf, RegistryError> {
        if self.store.borrow().contains(&name) {
            Ok(PathBuf::from(format!("/fake/modules/{}", name.as_str())))
        } else {
            Err(RegistryError::NotFound {
                name: name.as_str().to_string(),
            })
        }
    }

    fn install(&self, name: SolverName) -> Result<(), RegistryError> {
        *self.install_calls.borrow_mut() += 1;
        match self.installer {
            InstallerBehavior::Unsupported => Err(RegistryError::InstallUnsupported),
            InstallerBehavior::Works => {
                self.store.borrow_mut().insert(name);
                Ok(())
            }
            InstallerBehavior::Fails => {
                Err(RegistryError::InstallFailed("registry exploded".into()))
            }
        }
    }
}

/// Install runner fake that records invocations and optionally registers
/// the module in the shared store.
struct FakeRunner {
    store: Store,
    succeeds: bool,
    registers: bool,
    calls: RefCell<usize>,
}

impl FakeRunner {
    fn new(store: Store, succeeds: bool, registers: bool) -> Self {
        Self {
            store,
            succeeds,
            registers,
            calls: RefCell::new(0),
        }
    }
}

impl InstallRunner for FakeRunner {
    fn run(&self, name: SolverName, _timeout: Duration) -> SolverResult<CommandOutcome> {
        *self.calls.borrow_mut() += 1;
        if self.registers {
            self.store.borrow_mut().insert(name);
        }
        Ok(CommandOutcome {
            success: self.succeeds,
            output: String::from("fake installer output"),
        })
    }
}

/// Runner that simulates the bounded wait expiring.
struct TimeoutRunner;

impl InstallRunner for TimeoutRunner {
    fn run(&self, _name: SolverName, timeout: Duration) -> SolverResult<CommandOutcome> {
        Err(SolverError::Timeout {
            seconds: timeout.as_secs(),
        })
    }
}

fn store_with(present: &[SolverName]) -> Store {
    Rc::new(RefCell::new(present.iter().copied().collect()))
}

fn resolver_with(
    registry: FakeRegistry,
    runner: FakeRunner,
) -> SolverResolver<FakeRegistry, FakeRunner> {
    SolverResolver::with_runner(registry, runner, ResolverConfig::default())
}

#[test]
fn ensure_all_mixed_batch_is_complete_and_quiet() {
    let store = store_with(&[SolverName::Highs]);
    let registry = FakeRegistry::new(store.clone(), InstallerBehavior::Unsupported);
    let runner = FakeRunner::new(store, false, false);
    let resolver = resolver_with(registry, runner);

    let results = resolver.ensure_all(["highs", "bogus"], true);
    assert_eq!(results.len(), 2);
    assert_eq!(results.get("highs"), Some(&true));
    assert_eq!(results.get("bogus"), Some(&false));
}

#[test]
fn ensure_all_normalizes_names_and_covers_every_input() {
    let store = store_with(&[]);
    let registry = FakeRegistry::new(store.clone(), InstallerBehavior::Unsupported);
    let runner = FakeRunner::new(store, false, false);
    let resolver = resolver_with(registry, runner);

    let results = resolver.ensure_all(["HiGHS", " CBC ", "unknown"], true);
    let keys: Vec<&str> = results.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["cbc", "highs", "unknown"]);
    assert!(results.values().all(|&ok| !ok));
}

#[test]
fn install_skips_external_command_when_registry_install_verifies() {
    let store = store_with(&[]);
    let registry = FakeRegistry::new(store.clone(), InstallerBehavior::Works);
    let runner = FakeRunner::new(store, true, true);
    let resolver = resolver_with(registry, runner);

    assert!(resolver.install("highs").unwrap());
    // The in-process install registered and verified, so the external
    // command must never have been launched.
    assert_eq!(*resolver_runner_calls(&resolver), 0);
}

#[test]
fn install_falls_back_to_command_when_registry_install_fails() {
    let store = store_with(&[]);
    let registry = FakeRegistry::new(store.clone(), InstallerBehavior::Fails);
    let runner = FakeRunner::new(store, true, true);
    let resolver = resolver_with(registry, runner);

    // Registry installer raises; external command succeeds and registers;
    // post-verification confirms presence.
    assert!(resolver.install("highs").unwrap());
    assert_eq!(*resolver_runner_calls(&resolver), 1);
}

#[test]
fn install_requires_post_verification_after_command_success() {
    let store = store_with(&[]);
    let registry = FakeRegistry::new(store.clone(), InstallerBehavior::Unsupported);
    // Command exits zero but never registers the module.
    let runner = FakeRunner::new(store, true, false);
    let resolver = resolver_with(registry, runner);

    assert!(!resolver.install("cbc").unwrap());
}

#[test]
fn install_treats_nonzero_exit_as_failure() {
    let store = store_with(&[]);
    let registry = FakeRegistry::new(store.clone(), InstallerBehavior::Unsupported);
    let runner = FakeRunner::new(store, false, false);
    let resolver = resolver_with(registry, runner);

    assert!(!resolver.install("scip").unwrap());
    assert_eq!(*resolver_runner_calls(&resolver), 1);
}

#[test]
fn install_absorbs_command_timeout() {
    let store = store_with(&[]);
    let registry = FakeRegistry::new(store, InstallerBehavior::Unsupported);
    let resolver =
        SolverResolver::with_runner(registry, TimeoutRunner, ResolverConfig::default());

    // Timeout is a transient failure at this level: false, not an error.
    assert!(!resolver.install("couenne").unwrap());
}

#[test]
fn pick_solver_strict_miss_names_the_remediation_command() {
    let store = store_with(&[]);
    let registry = FakeRegistry::new(store.clone(), InstallerBehavior::Unsupported);
    let runner = FakeRunner::new(store, false, false);
    let resolver = resolver_with(registry, runner);

    let err = resolver.pick_solver(Some("cbc"), Some(false)).unwrap_err();
    match &err {
        SolverError::Unavailable { solver, install_hint } => {
            assert_eq!(*solver, SolverName::Cbc);
            assert_eq!(install_hint, "python3 -m amplpy.modules install cbc");
        }
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

#[test]
fn pick_solver_registry_hit_has_executable_and_nl_mode() {
    let store = store_with(&[SolverName::Cbc]);
    let registry = FakeRegistry::new(store.clone(), InstallerBehavior::Unsupported);
    let runner = FakeRunner::new(store, false, false);
    let resolver = resolver_with(registry, runner);

    let resolution: Resolution = resolver.pick_solver(Some("cbc"), Some(false)).unwrap();
    assert_eq!(resolution.solve_io, SolveIo::NlFile);
    assert_eq!(
        resolution.executable,
        Some(PathBuf::from("/fake/modules/cbc"))
    );
    assert_eq!(resolution.factory, "cbcnl");
}

#[test]
fn pick_solver_never_installs() {
    let store = store_with(&[]);
    let registry = FakeRegistry::new(store.clone(), InstallerBehavior::Works);
    let runner = FakeRunner::new(store, true, true);
    let resolver = resolver_with(registry, runner);

    let _ = resolver.pick_solver(Some("highs"), Some(false));
    let _ = resolver.pick_solver(Some("highs"), Some(true));
    let _ = resolver.pick_solver(Some("highs"), None);
    assert_eq!(*resolver_registry_installs(&resolver), 0);
    assert_eq!(*resolver_runner_calls(&resolver), 0);
}

#[cfg(unix)]
#[test]
fn path_scan_fallback_finds_executable_on_path() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let exe = dir.path().join("couenne");
    std::fs::write(&exe, b"#!/bin/sh\nexit 0\n").unwrap();
    std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

    let old_path = std::env::var_os("PATH").unwrap_or_default();
    let mut paths = vec![dir.path().to_path_buf()];
    paths.extend(std::env::split_paths(&old_path));
    std::env::set_var("PATH", std::env::join_paths(paths).unwrap());

    let store = store_with(&[]);
    let registry = FakeRegistry::new(store.clone(), InstallerBehavior::Unsupported);
    let runner = FakeRunner::new(store, false, false);
    let config = ResolverConfig {
        fallbacks: vec![Fallback::PathScanPreferred],
        ..ResolverConfig::default()
    };
    let resolver = SolverResolver::with_runner(registry, runner, config);

    let resolution = resolver.pick_solver(Some("couenne"), Some(true)).unwrap();
    std::env::set_var("PATH", &old_path);

    assert_eq!(resolution.solve_io, SolveIo::NlFile);
    assert_eq!(resolution.executable, Some(exe));
    assert_eq!(resolution.resolved, "couenne (PATH)");
}

fn resolver_runner_calls<'a>(
    resolver: &'a SolverResolver<FakeRegistry, FakeRunner>,
) -> std::cell::Ref<'a, usize> {
    resolver.runner().calls.borrow()
}

fn resolver_registry_installs<'a>(
    resolver: &'a SolverResolver<FakeRegistry, FakeRunner>,
) -> std::cell::Ref<'a, usize> {
    resolver.registry().install_calls.borrow()
}
