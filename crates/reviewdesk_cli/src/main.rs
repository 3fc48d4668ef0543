//! `reviewdesk` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration and start file logging when a log dir is set.
//! - Dispatch subcommands against the configured SQLite database.

mod cli;
mod commands;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use config::Overrides;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::load(
        cli.config.as_deref(),
        Overrides {
            database_path: cli.db,
            log_dir: cli.log_dir,
            log_level: cli.log_level,
        },
    )?;

    if let Some(log_dir) = &settings.log_dir {
        reviewdesk_core::init_logging(&settings.log_level, log_dir)
            .context("failed to initialize logging")?;
    }

    commands::run(cli.command, &settings.database_path)
}
