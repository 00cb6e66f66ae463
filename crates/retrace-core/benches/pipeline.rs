//! Benchmarks for fingerprinting, ranking and duplicate detection.
//!
//! Run with: cargo bench -p retrace-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, Rgb, RgbImage};
use retrace_core::config::ScoringConfig;
use retrace_core::duplicates::{ContentChecksum, DuplicateCandidate, DuplicateDetector};
use retrace_core::fingerprint::{BitHash, FeatureExtractor, ImageFingerprint, HASH_BYTES};
use retrace_core::inference::ReferenceLibrary;
use retrace_core::{PhotoId, SimilarityScorer};

/// Deterministic pseudo-random bytes (64-bit LCG).
fn lcg_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 56) as u8
        })
        .collect()
}

fn gradient_image(width: u32, height: u32, seed: u8) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width) as u8 ^ seed,
            (y * 255 / height) as u8,
            ((x + y) % 256) as u8,
        ])
    });
    DynamicImage::ImageRgb8(img)
}

fn fingerprints(count: usize) -> Vec<ImageFingerprint> {
    let extractor = FeatureExtractor::new();
    (0..count)
        .map(|i| extractor.extract(&gradient_image(128, 96, i as u8)))
        .collect()
}

fn benchmark_extract(c: &mut Criterion) {
    let extractor = FeatureExtractor::new();
    let img = gradient_image(1920, 1080, 7);

    c.bench_function("extract_fingerprint_1080p", |b| {
        b.iter(|| extractor.extract(black_box(&img)))
    });
}

fn benchmark_score(c: &mut Criterion) {
    let prints = fingerprints(2);
    let scorer = SimilarityScorer::new(ScoringConfig::default());

    c.bench_function("similarity_score", |b| {
        b.iter(|| scorer.score(black_box(&prints[0]), black_box(&prints[1])))
    });
}

fn benchmark_rank(c: &mut Criterion) {
    let prints = fingerprints(64);
    let scorer = SimilarityScorer::new(ScoringConfig::default());
    let date = chrono::NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0));
    let mut library = ReferenceLibrary::new();
    for i in 0..1000 {
        library.insert(
            PhotoId::new(format!("ref_{i:04}.jpg")),
            prints[i % prints.len()].clone(),
            date,
            None,
        );
    }

    c.bench_function("rank_1000_references", |b| {
        b.iter(|| library.rank(black_box(&prints[0]), &scorer, 5))
    });
}

fn benchmark_detect(c: &mut Criterion) {
    let candidates: Vec<DuplicateCandidate> = (0..2000u64)
        .map(|i| {
            let mut bytes = [0u8; HASH_BYTES];
            bytes.copy_from_slice(&lcg_bytes(i / 2, HASH_BYTES));
            // Every pair shares a hash apart from one bit
            bytes[0] ^= (i % 2) as u8;
            DuplicateCandidate {
                id: PhotoId::new(format!("photo_{i:05}.jpg")),
                checksum: ContentChecksum::of_bytes(&i.to_le_bytes()),
                perceptual_hash: BitHash::from_array(bytes),
            }
        })
        .collect();
    let detector = DuplicateDetector::with_max_distance(5);

    c.bench_function("detect_2000_photos", |b| {
        b.iter(|| detector.detect(black_box(&candidates)))
    });
}

criterion_group!(
    benches,
    benchmark_extract,
    benchmark_score,
    benchmark_rank,
    benchmark_detect,
);
criterion_main!(benches);
