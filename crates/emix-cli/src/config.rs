//! Configuration management for emix.
//! All configuration is centralized in ~/.emix/config/

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main emix configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmixConfig {
    /// Solver configuration
    #[serde(default)]
    pub solvers: SolverSection,
}

/// Solver policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverSection {
    /// Default solver when a run specifies none
    #[serde(default = "default_solver")]
    pub default: String,
    /// Permit alternate backends when the requested solver is absent
    #[serde(default)]
    pub allow_fallback: bool,
    /// Bounded wait for external install commands, in seconds
    #[serde(default = "default_install_timeout")]
    pub install_timeout_seconds: u64,
}

impl Default for SolverSection {
    fn default() -> Self {
        Self {
            default: default_solver(),
            allow_fallback: false,
            install_timeout_seconds: default_install_timeout(),
        }
    }
}

fn default_solver() -> String {
    "highs".to_string()
}

fn default_install_timeout() -> u64 {
    300
}

/// Get the emix home directory (defaults to ~/.emix)
pub fn emix_home() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| anyhow!("Cannot determine home directory"))
        .map(|h| h.join(".emix"))
}

/// Get the path to the config file: ~/.emix/config/emix.toml
pub fn config_path() -> Result<PathBuf> {
    Ok(emix_home()?.join("config").join("emix.toml"))
}

/// Load the configuration, falling back to defaults if no file exists.
pub fn load_config() -> Result<EmixConfig> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(EmixConfig::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    let config: EmixConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Write the default configuration file if none exists yet.
pub fn ensure_config() -> Result<PathBuf> {
    let path = config_path()?;
    if !path.exists() {
        let dir = path
            .parent()
            .ok_or_else(|| anyhow!("config path has no parent"))?;
        std::fs::create_dir_all(dir)?;
        let contents = toml::to_string_pretty(&EmixConfig::default())?;
        std::fs::write(&path, contents)?;
    }
    Ok(path)
}
