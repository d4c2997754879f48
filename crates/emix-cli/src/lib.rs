pub mod cli;
pub mod config;

pub use cli::{Cli, Commands, SolverCommands};
pub use config::{config_path, emix_home, ensure_config, load_config, EmixConfig};
