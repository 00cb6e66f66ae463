//! The `retrace restore` command.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use retrace_core::inference::EstimationMode;
use retrace_core::{Config, KamadakExifReader, Retrace};

use super::common::{cancel_on_interrupt, extract, print_summary, OutputArgs};

/// How qualifying references are combined.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    /// Date of the single most similar reference
    MostSimilar,
    /// Similarity-weighted mean of all qualifying references
    WeightedAverage,
    /// Weighted point between the two most similar references
    Interpolated,
}

impl From<ModeArg> for EstimationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::MostSimilar => EstimationMode::MostSimilar,
            ModeArg::WeightedAverage => EstimationMode::WeightedAverage,
            ModeArg::Interpolated => EstimationMode::Interpolated,
        }
    }
}

/// Arguments for the `restore` command.
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Photos (files or directories) that need a date
    #[arg(required = true)]
    pub targets: Vec<PathBuf>,

    /// Directory of photos with trusted dates (repeatable)
    #[arg(short, long = "reference", required = true)]
    pub references: Vec<PathBuf>,

    /// Estimation mode
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Minimum similarity for a reference to count (0-1)
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Number of best references considered per target (0 = all)
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Do not copy GPS from references
    #[arg(long)]
    pub no_gps: bool,

    /// Only emit targets that currently have no capture date
    #[arg(long)]
    pub missing_only: bool,

    /// Number of parallel workers
    #[arg(short, long)]
    pub parallel: Option<usize>,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl RestoreArgs {
    /// Apply command-line overrides on top of the loaded config.
    fn apply(&self, mut config: Config) -> anyhow::Result<Config> {
        if let Some(mode) = self.mode {
            config.inference.mode = mode.into();
        }
        if let Some(threshold) = self.threshold {
            config.inference.threshold = threshold;
        }
        if let Some(top_k) = self.top_k {
            config.inference.top_k = top_k;
        }
        if self.no_gps {
            config.inference.include_gps = false;
        }
        if let Some(parallel) = self.parallel {
            config.processing.parallel_workers = parallel;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Execute the restore command.
pub fn execute(args: RestoreArgs, config: Config) -> anyhow::Result<()> {
    let config = args.apply(config)?;
    let retrace = Retrace::new(config);
    let reader = KamadakExifReader::new();
    let cancel = cancel_on_interrupt();

    let (target_files, targets) = extract(&retrace, &args.targets, "target", &cancel);
    if targets.records.is_empty() {
        print_summary("Targets", &target_files, &targets);
        return Ok(());
    }
    let (reference_files, references) = extract(&retrace, &args.references, "reference", &cancel);

    let records = retrace.restore(&targets, &references, &reader);
    let found = records.iter().filter(|r| r.estimate.found().is_some()).count();

    let mut writer = args.output.open(retrace.config())?;
    for record in records
        .iter()
        .filter(|r| !args.missing_only || r.existing_date.is_none())
    {
        writer.write(record)?;
    }
    let written = writer.records_written();
    writer.finish()?;
    args.output.report(written);

    print_summary("Targets", &target_files, &targets);
    print_summary("References", &reference_files, &references);
    eprintln!(
        "    Estimated {found} of {} targets\n",
        records.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: RestoreArgs,
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let harness = Harness::parse_from([
            "retrace",
            "scans",
            "--reference",
            "library",
            "--mode",
            "weighted-average",
            "--threshold",
            "0.8",
            "--no-gps",
        ]);
        let config = harness.args.apply(Config::default()).unwrap();
        assert_eq!(config.inference.mode, EstimationMode::WeightedAverage);
        assert_eq!(config.inference.threshold, 0.8);
        assert!(!config.inference.include_gps);
        assert_eq!(harness.args.references, vec![PathBuf::from("library")]);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let harness =
            Harness::parse_from(["retrace", "scans", "-r", "library", "--threshold", "1.5"]);
        assert!(harness.args.apply(Config::default()).is_err());
    }
}
