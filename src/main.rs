//! Depot - artifact repository storage core
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use depot::cli::{Cli, Commands, Depot};
use depot::config::ConfigManager;
use depot::error::DepotResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> DepotResult<()> {
    let cli = Cli::parse();

    let manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = manager.load().await?;

    // 0 = warn, 1 = info, 2+ = debug; `general.verbose` counts as one level
    let level = cli.verbose.saturating_add(u8::from(config.general.verbose));
    let filter = match level {
        0 => EnvFilter::new("depot=warn"),
        1 => EnvFilter::new("depot=info"),
        _ => EnvFilter::new("depot=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.without_time().init();
    }

    debug!("Config: {}", manager.path().display());

    if let Commands::Config(args) = cli.command {
        return depot::cli::commands::config(args, &manager, &config).await;
    }

    let mut depot = Depot::new(manager, config)?;

    match cli.command {
        Commands::Config(_) => unreachable!("Config handled above"),
        Commands::Promote(args) => depot::cli::commands::promote(args, &depot).await,
        Commands::Resume(args) => depot::cli::commands::resume(args, &depot).await,
        Commands::Rollback(args) => depot::cli::commands::rollback(args, &depot).await,
        Commands::Group(args) => depot::cli::commands::group(args, &mut depot).await,
        Commands::Members(args) => depot::cli::commands::members(args, &depot).await,
        Commands::Merge(args) => depot::cli::commands::merge(args, &depot).await,
        Commands::Track(args) => depot::cli::commands::track(args, &depot).await,
    }
}
