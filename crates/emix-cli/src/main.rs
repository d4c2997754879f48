use clap::Parser;
use emix_cli::{Cli, Commands};
use tracing::error;
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: failed to initialize logging");
    }

    let result = match &cli.command {
        Commands::Run {
            dir,
            case,
            solver,
            date,
            raw_results,
            allow_fallback,
            install,
        } => commands::run::handle(
            dir,
            case,
            solver.as_deref(),
            date.as_deref(),
            *raw_results,
            *allow_fallback,
            *install,
        ),
        Commands::Solver { command } => commands::solver::handle(command),
    };

    if let Err(err) = result {
        error!("{err:#}");
        std::process::exit(1);
    }
}
