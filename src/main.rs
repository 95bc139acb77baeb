// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//
//! Semtable CLI - academic-context service for school timetable clients

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use semtable::config;

#[derive(Parser)]
#[command(name = "semtable")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "SEMTABLE_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Data directory override
    #[arg(long, env = "SEMTABLE_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the context from the backend and show the result
    Init,

    /// Show the current context, selectors included
    Status,

    /// Switch the active context to a year/semester pair
    Switch {
        /// Academic year (Buddhist era, e.g. 2567)
        year: i32,

        /// Semester id within that year
        semester_id: i64,
    },

    /// Re-load availability and the active pair from the backend
    Refresh,

    /// Validate a year/semester pair without switching
    Validate {
        /// Academic year to check
        year: i32,

        /// Semester id to check
        semester_id: i64,
    },

    /// Run the context integrity sweep and report issues
    Integrity,

    /// Clear the selection and the stored snapshot
    Reset,

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 if cli.quiet => tracing::Level::ERROR,
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = config::load(cli.config.as_deref())?;
    let data_dir = commands::resolve_data_dir(cli.data_dir, &config);

    // Execute command
    match cli.command {
        Commands::Init => commands::init::run(&data_dir, &config).await,
        Commands::Status => commands::status::run(&data_dir, &config).await,
        Commands::Switch { year, semester_id } => {
            commands::switch::run(&data_dir, &config, year, semester_id).await
        }
        Commands::Refresh => commands::refresh::run(&data_dir, &config).await,
        Commands::Validate { year, semester_id } => {
            commands::validate::run(&data_dir, &config, year, semester_id).await
        }
        Commands::Integrity => commands::integrity::run(&data_dir, &config).await,
        Commands::Reset => commands::reset::run(&data_dir, &config).await,
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}
