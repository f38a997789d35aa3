use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vt_cli::commands::{events, ingest, intervals, report, status};
use vt_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(vt_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = vt_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut stdout = std::io::stdout().lock();
    match &cli.command {
        Some(Commands::Ingest {
            participant,
            name,
            from,
            to,
            at,
        }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            ingest::run(
                db,
                config.timezone_offset_hours,
                participant,
                name.as_deref(),
                from.as_deref(),
                to.as_deref(),
                at.as_deref(),
            )?;
        }
        Some(Commands::Intervals { channel, json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            intervals::run(&mut stdout, &db, channel.as_deref(), *json)?;
        }
        Some(Commands::Events { channel }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            events::run(&db, channel.as_deref())?;
        }
        Some(Commands::Report { channel, json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            report::run(&mut stdout, &db, channel.as_deref(), *json)?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut stdout, &db, &config.database_path)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}
