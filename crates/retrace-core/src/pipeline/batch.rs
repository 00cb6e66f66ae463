//! Parallel fingerprint extraction over a batch of files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::duplicates::{ChecksumBasis, ContentChecksum};
use crate::error::{PipelineError, PipelineResult};
use crate::fingerprint::{FeatureExtractor, ImageFingerprint};
use crate::types::{PhotoId, ProcessingStats};

use super::cache::ExtractionCache;
use super::decode::{format_to_string, FileImageSource, ImageSource};

/// Cooperative cancellation flag shared between a batch and its caller.
///
/// Checked before each image starts. Images already in flight finish, and
/// everything computed so far is returned.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything derived from an image's pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedImage {
    pub fingerprint: ImageFingerprint,
    pub width: u32,
    pub height: u32,
    /// Detected format (e.g. "jpeg")
    pub format: String,
    /// Checksum of the decoded pixels
    pub pixel_checksum: ContentChecksum,
}

/// One successfully fingerprinted photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: PhotoId,
    pub path: PathBuf,
    pub file_size: u64,
    /// Checksum of the file as stored
    pub file_checksum: ContentChecksum,
    pub image: ExtractedImage,
}

impl PhotoRecord {
    pub fn fingerprint(&self) -> &ImageFingerprint {
        &self.image.fingerprint
    }

    /// The exact-duplicate checksum under `basis`.
    pub fn checksum(&self, basis: ChecksumBasis) -> &ContentChecksum {
        match basis {
            ChecksumBasis::FileBytes => &self.file_checksum,
            ChecksumBasis::DecodedPixels => &self.image.pixel_checksum,
        }
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.image.width) * u64::from(self.image.height)
    }
}

/// An image that could not be fingerprinted.
#[derive(Debug)]
pub struct ExtractionFailure {
    pub path: PathBuf,
    pub error: PipelineError,
}

/// Result of a batch run.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: BTreeMap<PhotoId, PhotoRecord>,
    pub failures: Vec<ExtractionFailure>,
    /// Paths never started because the batch was cancelled
    pub skipped: Vec<PathBuf>,
    pub cancelled: bool,
    pub stats: ProcessingStats,
}

impl BatchOutcome {
    /// Fingerprints by photo id.
    pub fn fingerprints(&self) -> impl Iterator<Item = (&PhotoId, &ImageFingerprint)> {
        self.records.iter().map(|(id, r)| (id, r.fingerprint()))
    }
}

enum Step {
    Done(Box<PhotoRecord>, bool),
    Failed(ExtractionFailure),
    Skipped(PathBuf),
}

/// Fingerprints many files on a dedicated rayon pool.
pub struct BatchExtractor {
    source: Arc<dyn ImageSource>,
    cache: Arc<ExtractionCache>,
    pool: Option<rayon::ThreadPool>,
}

impl BatchExtractor {
    /// Extractor reading from disk with the configured limits and worker count.
    pub fn new(config: &Config) -> Self {
        Self::with_source(
            Arc::new(FileImageSource::new(config.limits.clone())),
            config.processing.parallel_workers,
        )
    }

    pub fn with_source(source: Arc<dyn ImageSource>, workers: usize) -> Self {
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("retrace-extract-{i}"))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                tracing::warn!("Failed to build extraction pool, using global pool: {e}");
                None
            }
        };
        Self {
            source,
            cache: Arc::new(ExtractionCache::new()),
            pool,
        }
    }

    /// Share an existing cache, e.g. across a retry.
    pub fn with_cache(mut self, cache: Arc<ExtractionCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<ExtractionCache> {
        &self.cache
    }

    pub fn run(&self, paths: &[PathBuf], cancel: &CancellationToken) -> BatchOutcome {
        self.run_with_progress(paths, cancel, |_| {})
    }

    /// Run the batch, calling `progress` after each image that was started.
    pub fn run_with_progress<F>(
        &self,
        paths: &[PathBuf],
        cancel: &CancellationToken,
        progress: F,
    ) -> BatchOutcome
    where
        F: Fn(&Path) + Send + Sync,
    {
        let start = Instant::now();
        tracing::info!("Extracting fingerprints for {} images", paths.len());

        let work = || {
            paths
                .par_iter()
                .map_init(FeatureExtractor::new, |extractor, path| {
                    let step = match self.process(extractor, path, cancel) {
                        Ok((record, cached)) => Step::Done(Box::new(record), cached),
                        Err(PipelineError::Cancelled(path)) => return Step::Skipped(path),
                        Err(error) => Step::Failed(ExtractionFailure {
                            path: path.clone(),
                            error,
                        }),
                    };
                    progress(path);
                    step
                })
                .collect::<Vec<_>>()
        };
        let steps = match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        };

        let mut outcome = BatchOutcome {
            cancelled: cancel.is_cancelled(),
            ..BatchOutcome::default()
        };
        for step in steps {
            match step {
                Step::Done(record, cached) => {
                    if cached {
                        outcome.stats.cached += 1;
                    }
                    outcome.records.insert(record.id.clone(), *record);
                }
                Step::Failed(failure) => {
                    tracing::warn!("Skipping {}: {}", failure.path.display(), failure.error);
                    outcome.failures.push(failure);
                }
                Step::Skipped(path) => outcome.skipped.push(path),
            }
        }

        outcome.stats.succeeded = outcome.records.len();
        outcome.stats.failed = outcome.failures.len();
        outcome.stats.skipped = outcome.skipped.len();
        outcome.stats.total_seconds = start.elapsed().as_secs_f64();

        tracing::info!(
            "Extracted {} images ({} cached, {} failed, {} skipped) in {:.2}s",
            outcome.stats.succeeded,
            outcome.stats.cached,
            outcome.stats.failed,
            outcome.stats.skipped,
            outcome.stats.total_seconds
        );
        outcome
    }

    /// Fingerprint one file. The bool is true when served from the cache.
    fn process(
        &self,
        extractor: &FeatureExtractor,
        path: &Path,
        cancel: &CancellationToken,
    ) -> PipelineResult<(PhotoRecord, bool)> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled(path.to_path_buf()));
        }

        let bytes = self.source.read(path)?;
        let file_checksum = ContentChecksum::of_bytes(&bytes);

        let (image, cached) = match self.cache.get(&file_checksum) {
            Some(hit) => (hit, true),
            None => {
                let decoded = self.source.decode_bytes(&bytes, path)?;
                let image = ExtractedImage {
                    fingerprint: extractor.extract(&decoded.image),
                    width: decoded.width,
                    height: decoded.height,
                    format: format_to_string(decoded.format),
                    pixel_checksum: ContentChecksum::of_pixels(&decoded.image),
                };
                self.cache.insert(file_checksum.clone(), image.clone());
                (image, false)
            }
        };
        tracing::debug!(
            "Fingerprinted {:?} ({}x{}, cached: {})",
            path,
            image.width,
            image.height,
            cached
        );

        Ok((
            PhotoRecord {
                id: PhotoId::from_path(path),
                path: path.to_path_buf(),
                file_size: bytes.len() as u64,
                file_checksum,
                image,
            },
            cached,
        ))
    }
}
