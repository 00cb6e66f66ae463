//! The `retrace folder-dates` command.

use std::path::PathBuf;

use clap::Args;
use retrace_core::inference::{FolderDatePlanner, PlannedAction};
use retrace_core::pipeline::FileDiscovery;
use retrace_core::{Config, KamadakExifReader};

use super::common::{run_root, OutputArgs};

/// Arguments for the `folder-dates` command.
#[derive(Args, Debug)]
pub struct FolderDatesArgs {
    /// Root directory of dated folders
    #[arg(required = true)]
    pub input: PathBuf,

    /// Minutes between consecutive photos of a folder
    #[arg(short, long)]
    pub interval: Option<i64>,

    /// Propose dates for photos that already have a valid one
    #[arg(long)]
    pub force: bool,

    /// Only emit photos whose date would change
    #[arg(long)]
    pub changes_only: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl FolderDatesArgs {
    fn apply(&self, mut config: Config) -> anyhow::Result<Config> {
        if let Some(interval) = self.interval {
            config.folder_dates.interval_minutes = interval;
        }
        if self.force {
            config.folder_dates.overwrite_existing = true;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Execute the folder-dates command.
pub fn execute(args: FolderDatesArgs, config: Config) -> anyhow::Result<()> {
    let config = args.apply(config)?;
    let now = chrono::Local::now().naive_local();
    let planner = FolderDatePlanner::new(
        config.folder_dates.clone(),
        config.dates.clone(),
        now,
    );
    let discovery = FileDiscovery::new(config.processing.clone());

    let mut plans = planner.plan_tree(&run_root(&args.input), &discovery, &KamadakExifReader::new());
    if args.changes_only {
        for plan in &mut plans {
            plan.entries
                .retain(|e| matches!(e.action, PlannedAction::Rewrite { .. }));
        }
        plans.retain(|p| !p.entries.is_empty());
    }

    let mut writer = args.output.open(&config)?;
    writer.write_all(&plans)?;
    let written = writer.records_written();
    writer.finish()?;
    args.output.report(written);

    let rewrites: usize = plans.iter().map(|p| p.rewrites().count()).sum();
    eprintln!(
        "\n    {} dated folders, {rewrites} photos would be redated\n",
        plans.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_to_config() {
        let args = FolderDatesArgs {
            input: PathBuf::from("albums"),
            interval: Some(5),
            force: true,
            changes_only: false,
            output: OutputArgs::default(),
        };
        let config = args.apply(Config::default()).unwrap();
        assert_eq!(config.folder_dates.interval_minutes, 5);
        assert!(config.folder_dates.overwrite_existing);
    }
}
