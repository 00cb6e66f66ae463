//! Retrace CLI - restore photo capture dates and merge duplicates.
//!
//! Every command prints a plan and changes nothing on disk.
//!
//! # Usage
//!
//! ```bash
//! # Estimate dates for scanned photos from a dated library
//! retrace restore ./scans --reference ./library
//!
//! # Group duplicates and decide which copy to keep
//! retrace dedupe ./photos --strategy timeline
//!
//! # Propose dates from folder names like "2019-08-17 Lake"
//! retrace folder-dates ./albums
//!
//! # View configuration
//! retrace config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Retrace - restore photo capture dates and merge duplicates.
#[derive(Parser, Debug)]
#[command(name = "retrace")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Estimate capture dates and GPS from similar reference photos
    Restore(cli::restore::RestoreArgs),

    /// Group duplicate photos and decide which copy to keep
    Dedupe(cli::dedupe::DedupeArgs),

    /// Propose capture dates from dated folder and file names
    FolderDates(cli::folder::FolderDatesArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match retrace_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `retrace config path`."
            );
            retrace_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Retrace v{}", retrace_core::VERSION);

    match cli.command {
        Commands::Restore(args) => cli::restore::execute(args, config),
        Commands::Dedupe(args) => cli::dedupe::execute(args, config),
        Commands::FolderDates(args) => cli::folder::execute(args, config),
        Commands::Config(args) => cli::config::execute(args),
    }
}
