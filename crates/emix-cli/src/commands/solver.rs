//! Solver management commands.
//!
//! Lists, ensures, and resolves solver backends through the resolver in
//! `emix-solver`.

use anyhow::Result;
use emix_cli::config;
use emix_cli::SolverCommands;
use emix_solver::{
    AmplModuleRegistry, InstallCommand, ResolverConfig, SolverName, SolverResolver,
};
use std::time::Duration;

/// Handle solver subcommands.
pub fn handle(command: &SolverCommands) -> Result<()> {
    match command {
        SolverCommands::List => list_solvers(),
        SolverCommands::Ensure { solvers, quiet } => ensure_solvers(solvers, *quiet),
        SolverCommands::Pick {
            solver,
            allow_fallback,
        } => pick_solver(solver.as_deref(), *allow_fallback),
        SolverCommands::Status => show_status(),
    }
}

/// Build the resolver over the real module registry, applying file config.
pub fn build_resolver() -> Result<SolverResolver<AmplModuleRegistry>> {
    let file_config = config::load_config()?;
    let resolver_config = ResolverConfig {
        allow_fallback: file_config.solvers.allow_fallback,
        install_timeout: Duration::from_secs(file_config.solvers.install_timeout_seconds),
        ..ResolverConfig::default()
    };
    Ok(SolverResolver::with_config(
        AmplModuleRegistry::from_env(),
        resolver_config,
    ))
}

fn list_solvers() -> Result<()> {
    let resolver = build_resolver()?;

    println!("Supported solvers:");
    println!();
    for &name in SolverName::all() {
        let status = if resolver.is_available(name) {
            "[installed]"
        } else {
            "[not installed]"
        };
        println!(
            "  {:<10} {:<30} {}",
            name.as_str(),
            name.description(),
            status
        );
    }
    println!();
    println!("The in-process clarabel backend is always available (relaxed solves).");
    println!("Install a solver module with: emix solver ensure <name>");
    Ok(())
}

fn ensure_solvers(solvers: &[String], quiet: bool) -> Result<()> {
    if solvers.is_empty() {
        println!("No solvers requested. Supported: {}", SolverName::allowed().join(", "));
        return Ok(());
    }

    let resolver = build_resolver()?;
    let results = resolver.ensure_all(solvers.iter().map(String::as_str), quiet);

    for (name, available) in &results {
        let status = if *available { "ok" } else { "unavailable" };
        println!("  {:<10} {}", name, status);
    }
    if results.values().any(|ok| !ok) {
        println!();
        println!("Unavailable solvers can be installed manually, e.g.:");
        for (name, _) in results.iter().filter(|(_, ok)| !**ok) {
            if let Ok(solver) = name.parse::<SolverName>() {
                println!("  {}", InstallCommand::for_solver(solver).display());
            }
        }
    }
    Ok(())
}

fn pick_solver(solver: Option<&str>, allow_fallback: bool) -> Result<()> {
    let file_config = config::load_config()?;
    let resolver = build_resolver()?;
    let preferred = solver.or(Some(file_config.solvers.default.as_str()));

    let resolution = resolver.pick_solver(preferred, allow_fallback.then_some(true))?;
    println!("Resolved:   {}", resolution.resolved);
    println!("Factory:    {}", resolution.factory);
    println!("Solve IO:   {}", resolution.solve_io);
    match &resolution.executable {
        Some(path) => println!("Executable: {}", path.display()),
        None => println!("Executable: (in-process)"),
    }
    Ok(())
}

fn show_status() -> Result<()> {
    let config_file = config::ensure_config()?;
    let file_config = config::load_config()?;
    let resolver = build_resolver()?;

    println!("Solver configuration ({}):", config_file.display());
    println!();
    println!("  Default solver:  {}", file_config.solvers.default);
    println!(
        "  Allow fallback:  {}",
        if file_config.solvers.allow_fallback {
            "yes"
        } else {
            "no"
        }
    );
    println!(
        "  Install timeout: {} seconds",
        file_config.solvers.install_timeout_seconds
    );
    println!();

    println!("Module registry search directories:");
    for dir in resolver.registry().search_dirs() {
        println!("  {}", dir.display());
    }
    println!();

    let installed: Vec<&str> = SolverName::all()
        .iter()
        .filter(|&&name| resolver.is_available(name))
        .map(|name| name.as_str())
        .collect();
    if installed.is_empty() {
        println!("No solver modules installed.");
    } else {
        println!("Installed modules: {}", installed.join(", "));
    }
    Ok(())
}
