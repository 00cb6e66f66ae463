//! Pieces shared by the commands: output selection, progress, summary.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use retrace_core::pipeline::{DiscoveredFile, FileDiscovery};
use retrace_core::{
    BatchOutcome, CancellationToken, Config, OutputFormat as CoreOutputFormat, PlanWriter,
    Retrace,
};

/// Supported output formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// One JSON array
    Json,
    /// One JSON object per line
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Where and how plan records are written.
#[derive(Args, Debug, Default)]
pub struct OutputArgs {
    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (defaults to `[output] format` in the config)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

impl OutputArgs {
    /// Open the plan writer, falling back to the configured format.
    pub fn open(&self, config: &Config) -> anyhow::Result<PlanWriter<Box<dyn Write>>> {
        let format = match self.format {
            Some(format) => format.into(),
            None => config
                .output
                .format
                .parse::<CoreOutputFormat>()
                .map_err(anyhow::Error::msg)?,
        };
        let sink: Box<dyn Write> = match &self.output {
            Some(path) => Box::new(BufWriter::new(File::create(path)?)),
            None => Box::new(BufWriter::new(io::stdout().lock())),
        };
        Ok(PlanWriter::new(
            sink,
            format,
            self.pretty || config.output.pretty,
        ))
    }

    /// Log where the plan went.
    pub fn report(&self, records: usize) {
        match &self.output {
            Some(path) => tracing::info!("{} records written to {:?}", records, path),
            None => tracing::debug!("{} records written to stdout", records),
        }
    }
}

/// Discover images under `roots` and fingerprint them with a progress bar.
pub fn extract(
    retrace: &Retrace,
    roots: &[PathBuf],
    label: &str,
    cancel: &CancellationToken,
) -> (Vec<DiscoveredFile>, BatchOutcome) {
    let discovery = FileDiscovery::new(retrace.config().processing.clone());
    let files = discovery.discover_all(roots);
    if files.is_empty() {
        tracing::warn!("No supported image files found in {:?}", roots);
    } else {
        tracing::info!("Found {} {} image(s)", files.len(), label);
    }

    let paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
    let progress = create_progress_bar(paths.len() as u64, label);
    let outcome = retrace
        .extractor()
        .run_with_progress(&paths, cancel, |_| progress.inc(1));
    progress.finish_and_clear();
    (files, outcome)
}

/// Token cancelled by the first Ctrl-C. Photos already fingerprinted are
/// kept and the plan is still written.
pub fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let handler = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if !handler.is_cancelled() {
            eprintln!("\nInterrupted, finishing images in flight...");
        }
        handler.cancel();
    }) {
        tracing::debug!("Ctrl-C handler not installed: {e}");
    }
    cancel
}

/// Create a progress bar for fingerprint extraction.
fn create_progress_bar(total: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    match ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        Ok(style) => pb.set_style(style.progress_chars("##-")),
        Err(e) => tracing::debug!("Progress template rejected: {e}"),
    }
    pb.set_message(label.to_string());
    pb
}

/// Print a summary table of one extraction run to stderr.
pub fn print_summary(label: &str, files: &[DiscoveredFile], outcome: &BatchOutcome) {
    let summary = Retrace::summarize(outcome);
    let stats = &summary.stats;
    let elapsed = Duration::from_secs_f64(stats.total_seconds.max(0.0));
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        stats.succeeded as f64 / secs
    } else {
        0.0
    };
    let mb = FileDiscovery::total_size(files) as f64 / 1_000_000.0;

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("    {label:^32}");
    eprintln!("  ====================================");
    eprintln!("    Fingerprinted:{:>8}", stats.succeeded);
    if stats.cached > 0 {
        eprintln!("    From cache:   {:>8}", stats.cached);
    }
    if stats.failed > 0 {
        eprintln!("    Failed:       {:>8}", stats.failed);
    }
    if stats.skipped > 0 {
        eprintln!("    Not reached:  {:>8}", stats.skipped);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Input:        {:>7.1} MB", mb);
    eprintln!("    Duration:     {:>7.1}s", secs);
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("  ====================================");

    if summary.cancelled {
        tracing::warn!("{label}: run was cancelled before every image was reached");
    }
    for failure in &summary.failures {
        tracing::warn!("Unprocessable {:?}: {}", failure.path, failure.error);
    }
}

/// Directory a dedupe/folder run is rooted at: the path itself, or the parent
/// of a single file.
pub fn run_root(path: &Path) -> PathBuf {
    if path.is_file() {
        path.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_maps_to_core() {
        assert_eq!(
            CoreOutputFormat::from(OutputFormat::Jsonl),
            CoreOutputFormat::JsonLines
        );
        assert_eq!(
            CoreOutputFormat::from(OutputFormat::Json),
            CoreOutputFormat::Json
        );
    }

    #[test]
    fn test_open_writes_to_file_in_configured_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        let args = OutputArgs {
            output: Some(path.clone()),
            format: None,
            pretty: false,
        };
        let mut config = Config::default();
        config.output.format = "json".to_string();

        let mut writer = args.open(&config).unwrap();
        writer.write(&serde_json::json!({"a": 1})).unwrap();
        writer.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), r#"[{"a":1}]"#);
    }

    #[test]
    fn test_interrupt_token_starts_uncancelled() {
        let cancel = cancel_on_interrupt();
        assert!(!cancel.is_cancelled());
        // A second install fails quietly and still yields a token
        assert!(!cancel_on_interrupt().is_cancelled());
    }

    #[test]
    fn test_run_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.jpg");
        std::fs::write(&file, b"x").unwrap();
        assert_eq!(run_root(&file), dir.path());
        assert_eq!(run_root(dir.path()), dir.path());
    }
}
