//! The `retrace dedupe` command.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use retrace_core::duplicates::ChecksumBasis;
use retrace_core::{
    Config, KamadakExifReader, MergeDecision, MergeStrategy, Retrace, StrategySelection,
};

use super::common::{cancel_on_interrupt, extract, print_summary, run_root, OutputArgs};

/// Merge strategy choices.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StrategyArg {
    /// Designate nothing
    KeepAll,
    /// Keep the highest-resolution copy
    BestQuality,
    /// Keep the copy with the earliest valid date
    Timeline,
    /// Keep the best copy and fill its missing date/GPS from the others
    SmartMerge,
    /// Leave every group for manual review
    Review,
    /// Use each group's recommended strategy
    Auto,
}

impl StrategyArg {
    fn selection(self) -> StrategySelection {
        let fixed = match self {
            StrategyArg::KeepAll => MergeStrategy::KeepAll,
            StrategyArg::BestQuality => MergeStrategy::BestQuality,
            StrategyArg::Timeline => MergeStrategy::Timeline,
            StrategyArg::SmartMerge => MergeStrategy::SmartMerge,
            StrategyArg::Review => MergeStrategy::Review,
            StrategyArg::Auto => return StrategySelection::Recommended,
        };
        StrategySelection::Fixed(fixed)
    }
}

/// Arguments for the `dedupe` command.
#[derive(Args, Debug)]
pub struct DedupeArgs {
    /// Directory to scan
    #[arg(required = true)]
    pub input: PathBuf,

    /// Merge strategy (defaults to `[merge] strategy` in the config)
    #[arg(short, long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Maximum perceptual-hash distance for near duplicates
    #[arg(short = 'd', long)]
    pub max_distance: Option<u32>,

    /// Compare decoded pixels instead of file bytes for exact duplicates
    #[arg(long)]
    pub pixels: bool,

    /// Number of parallel workers
    #[arg(short, long)]
    pub parallel: Option<usize>,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl DedupeArgs {
    fn apply(&self, mut config: Config) -> anyhow::Result<Config> {
        if let Some(distance) = self.max_distance {
            config.duplicates.max_hamming_distance = distance;
        }
        if self.pixels {
            config.duplicates.checksum_basis = ChecksumBasis::DecodedPixels;
        }
        if let Some(parallel) = self.parallel {
            config.processing.parallel_workers = parallel;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Execute the dedupe command.
pub fn execute(args: DedupeArgs, config: Config) -> anyhow::Result<()> {
    let config = args.apply(config)?;
    let retrace = Retrace::new(config);
    let reader = KamadakExifReader::new();
    let cancel = cancel_on_interrupt();
    let now = chrono::Local::now().naive_local();
    let root = run_root(&args.input);

    let (files, photos) = extract(&retrace, std::slice::from_ref(&args.input), "photo", &cancel);

    let selection = args
        .strategy
        .map(StrategyArg::selection)
        .unwrap_or_default();
    let records = retrace.dedupe(&photos, &reader, selection, &root, now);

    let mut writer = args.output.open(retrace.config())?;
    writer.write_all(&records)?;
    let written = writer.records_written();
    writer.finish()?;
    args.output.report(written);

    print_summary("Duplicates", &files, &photos);
    let superseded: usize = records.iter().map(|r| r.decision.supersede().len()).sum();
    let unresolved = records
        .iter()
        .filter(|r| matches!(r.decision, MergeDecision::Unresolved { .. }))
        .count();
    eprintln!(
        "    {} groups, {superseded} copies superseded, {unresolved} need review\n",
        records.len()
    );
    Ok(())
}
