//! The `retrace config` command.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use retrace_core::Config;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Print where the config file is read from
    Path,

    /// Write a config file holding the defaults
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Parse and validate a config file, then print the settings that matter most
    Check {
        /// File to check (defaults to the standard location)
        path: Option<PathBuf>,
    },
}

pub fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => print!("{}", Config::load()?.to_toml()?),
        ConfigCommand::Path => println!("{}", Config::default_path().display()),
        ConfigCommand::Init { force } => {
            let path = Config::default_path();
            init(&path, force)?;
            eprintln!("Wrote default configuration to {}", path.display());
        }
        ConfigCommand::Check { path } => {
            let path = path.unwrap_or_else(Config::default_path);
            let config = Config::load_from(&path)?;
            println!("{}: ok", path.display());
            for line in highlights(&config) {
                println!("  {line}");
            }
        }
    }
    Ok(())
}

fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (pass --force to replace it)",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, Config::default().to_toml()?)?;
    tracing::info!("Config written to {:?}", path);
    Ok(())
}

fn highlights(config: &Config) -> Vec<String> {
    let inference = &config.inference;
    vec![
        format!(
            "inference: {:?}, threshold {:.2}, top {}",
            inference.mode, inference.threshold, inference.top_k
        ),
        format!(
            "duplicates: distance <= {}, checksum over {:?}",
            config.duplicates.max_hamming_distance, config.duplicates.checksum_basis
        ),
        format!("merge: {:?}", config.merge.strategy),
        format!("recovery dir: {}", config.general.recovery_dir),
    ]
}
