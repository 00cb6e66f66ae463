//! Retrace Core - photo capture-date restoration and duplicate merging.
//!
//! Retrace fingerprints photos by their pixels, then uses the fingerprints two
//! ways: to estimate a missing capture date (and GPS) from visually similar
//! reference photos, and to group exact and near-duplicate copies and decide
//! which copy to keep.
//!
//! # Architecture
//!
//! ```text
//! Discover → Decode → Fingerprint ─┬→ Rank references → Estimate → RestoreRecord
//!                                  └→ Detect duplicates → Resolve → DedupeRecord
//! ```
//!
//! The library only plans. Writing EXIF tags and moving superseded files are
//! left to the caller through [`metadata::ExifWriter`] and the recovery paths
//! in [`output::DedupeRecord`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use retrace_core::{CancellationToken, Config, KamadakExifReader, Retrace};
//!
//! let retrace = Retrace::new(Config::load()?);
//! let cancel = CancellationToken::new();
//! let targets = retrace.extractor().run(&target_paths, &cancel);
//! let references = retrace.extractor().run(&reference_paths, &cancel);
//! for record in retrace.restore(&targets, &references, &KamadakExifReader::new()) {
//!     println!("{}: {:?}", record.target, record.estimate.found());
//! }
//! ```

pub mod config;
pub mod duplicates;
pub mod error;
pub mod fingerprint;
pub mod inference;
pub mod math;
pub mod merge;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod scoring;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDateTime;

pub use config::Config;
pub use duplicates::{DuplicateCandidate, DuplicateDetector, DuplicateGroup, MatchKind};
pub use error::{ConfigError, PipelineError, PipelineResult, Result, RetraceError};
pub use fingerprint::{FeatureExtractor, ImageFingerprint};
pub use inference::{Estimate, InferenceEngine, MetadataEstimate, ReferenceLibrary};
pub use merge::{MemberMetadata, MergeDecision, MergeResolver, MergeStrategy, StrategySelection};
pub use metadata::{ExifReader, ExifWriter, KamadakExifReader};
pub use output::{DedupeRecord, OutputFormat, PlanWriter, RestoreRecord, RunSummary};
pub use pipeline::{BatchExtractor, BatchOutcome, CancellationToken, ImageSource};
pub use scoring::SimilarityScorer;
pub use types::{GpsCoordinate, PhotoId, ProcessingStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runs the restore and dedupe workflows with one configuration.
pub struct Retrace {
    config: Config,
    extractor: BatchExtractor,
    scorer: SimilarityScorer,
    engine: InferenceEngine,
    detector: DuplicateDetector,
}

impl Retrace {
    /// Reads images from disk with the configured limits.
    pub fn new(config: Config) -> Self {
        let extractor = BatchExtractor::new(&config);
        Self::with_extractor(config, extractor)
    }

    /// Reads images through `source` instead of the filesystem.
    pub fn with_source(config: Config, source: Arc<dyn ImageSource>) -> Self {
        let extractor = BatchExtractor::with_source(source, config.processing.parallel_workers);
        Self::with_extractor(config, extractor)
    }

    fn with_extractor(config: Config, extractor: BatchExtractor) -> Self {
        tracing::debug!("Initializing retrace v{}", VERSION);
        Self {
            scorer: SimilarityScorer::new(config.scoring),
            engine: InferenceEngine::new(config.inference.clone()),
            detector: DuplicateDetector::new(&config.duplicates),
            extractor,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn extractor(&self) -> &BatchExtractor {
        &self.extractor
    }

    /// Estimate metadata for every extracted target from the dated references.
    ///
    /// A reference with no valid capture date cannot vote and is left out. A
    /// photo present in both sets is never its own reference.
    pub fn restore(
        &self,
        targets: &BatchOutcome,
        references: &BatchOutcome,
        reader: &dyn ExifReader,
    ) -> Vec<RestoreRecord> {
        let now = chrono::Local::now().naive_local();
        let mut library = ReferenceLibrary::new();
        for (id, record) in &references.records {
            let captured_at = reader
                .read_date(&record.path)
                .filter(|ts| self.config.dates.is_plausible(ts, &now));
            library.insert(
                id.clone(),
                record.fingerprint().clone(),
                captured_at,
                reader.read_gps(&record.path),
            );
        }
        tracing::info!(
            "Restoring {} targets from {} dated references",
            targets.records.len(),
            library.len()
        );

        targets
            .records
            .iter()
            .map(|(id, record)| {
                let estimate = self.engine.infer_excluding(
                    record.fingerprint(),
                    Some(id),
                    &library,
                    &self.scorer,
                );
                RestoreRecord {
                    target: id.clone(),
                    existing_date: reader.read_date(&record.path),
                    estimate,
                }
            })
            .collect()
    }

    /// Group duplicates among the extracted photos and decide each group.
    ///
    /// `recovery_root` is the scanned directory the configured recovery dir
    /// is resolved against.
    pub fn dedupe(
        &self,
        photos: &BatchOutcome,
        reader: &dyn ExifReader,
        selection: StrategySelection,
        recovery_root: &Path,
        now: NaiveDateTime,
    ) -> Vec<DedupeRecord> {
        let basis = self.config.duplicates.checksum_basis;
        let candidates: Vec<DuplicateCandidate> = photos
            .records
            .values()
            .map(|r| DuplicateCandidate::from_record(r, basis))
            .collect();
        let groups = self.detector.detect(&candidates);

        let resolver = MergeResolver::new(self.config.dates.clone(), now);
        let recovery_dir = self.config.recovery_dir(recovery_root);

        groups
            .into_iter()
            .map(|group| {
                let metadata: Vec<MemberMetadata> = group
                    .members
                    .iter()
                    .filter_map(|id| photos.records.get(id))
                    .map(|r| MemberMetadata::from_record(r, reader))
                    .collect();
                let recommendation = merge::recommend_strategy(&metadata);
                let strategy = match selection {
                    StrategySelection::Configured => self.config.merge.strategy,
                    StrategySelection::Fixed(strategy) => strategy,
                    StrategySelection::Recommended => recommendation.strategy,
                };
                let decision = resolver.resolve(&group, strategy, &metadata);
                DedupeRecord::new(group, &recovery_dir, recommendation, decision)
            })
            .collect()
    }

    /// Summary record for an extraction run.
    pub fn summarize(outcome: &BatchOutcome) -> RunSummary {
        RunSummary {
            stats: outcome.stats.clone(),
            failures: outcome.failures.iter().map(Into::into).collect(),
            cancelled: outcome.cancelled,
        }
    }
}
