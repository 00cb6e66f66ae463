//! Fingerprint extraction from decoded pixels.

use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};

use crate::error::PipelineResult;
use crate::pipeline::ImageSource;

use super::edges::edge_density;
use super::{BitHash, ColorHistogram, ImageFingerprint, HASH_GRID, HISTOGRAM_BINS};

/// Side of the square the histogram and edge detector work on.
const ANALYSIS_SIZE: u32 = 256;

/// Computes [`ImageFingerprint`]s.
///
/// The three hashers are configured once and reused. An extractor is cheap to
/// build; parallel callers create one per worker thread.
pub struct FeatureExtractor {
    phash: image_hasher::Hasher,
    dhash: image_hasher::Hasher,
    ahash: image_hasher::Hasher,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    pub fn new() -> Self {
        let phash = HasherConfig::new()
            .hash_alg(HashAlg::Mean)
            .hash_size(HASH_GRID, HASH_GRID)
            .preproc_dct()
            .to_hasher();
        let dhash = HasherConfig::new()
            .hash_alg(HashAlg::Gradient)
            .hash_size(HASH_GRID, HASH_GRID)
            .to_hasher();
        let ahash = HasherConfig::new()
            .hash_alg(HashAlg::Mean)
            .hash_size(HASH_GRID, HASH_GRID)
            .to_hasher();
        Self {
            phash,
            dhash,
            ahash,
        }
    }

    /// Extract a fingerprint from decoded pixels. Pure and deterministic.
    pub fn extract(&self, image: &DynamicImage) -> ImageFingerprint {
        let perceptual_hash = BitHash::from_slice(self.phash.hash_image(image).as_bytes());
        let difference_hash = BitHash::from_slice(self.dhash.hash_image(image).as_bytes());
        let average_hash = BitHash::from_slice(self.ahash.hash_image(image).as_bytes());

        let analysis = image.resize_exact(ANALYSIS_SIZE, ANALYSIS_SIZE, FilterType::Triangle);
        let color_histogram = color_histogram(&analysis);
        let edge_density = edge_density(&analysis.to_luma8());

        ImageFingerprint {
            perceptual_hash,
            difference_hash,
            average_hash,
            color_histogram,
            edge_density,
        }
    }

    /// Decode `path` through `source` and extract its fingerprint.
    ///
    /// Decode failures are returned to the caller, which records the image as
    /// unprocessable and moves on.
    pub fn extract_path(
        &self,
        source: &dyn ImageSource,
        path: &Path,
    ) -> PipelineResult<ImageFingerprint> {
        let decoded = source.decode(path)?;
        Ok(self.extract(&decoded.image))
    }
}

/// Per-channel histogram normalized by pixel count.
fn color_histogram(image: &DynamicImage) -> ColorHistogram {
    let rgb = image.to_rgb8();
    let mut counts = [[0u64; HISTOGRAM_BINS]; 3];
    for pixel in rgb.pixels() {
        for (channel, &value) in pixel.0.iter().enumerate() {
            counts[channel][usize::from(value) * HISTOGRAM_BINS / 256] += 1;
        }
    }

    let total = (u64::from(rgb.width()) * u64::from(rgb.height())).max(1) as f64;
    let mut channels = [[0f32; HISTOGRAM_BINS]; 3];
    for (out, counted) in channels.iter_mut().zip(counts.iter()) {
        for (bin, &count) in out.iter_mut().zip(counted.iter()) {
            *bin = (count as f64 / total) as f32;
        }
    }
    ColorHistogram { channels }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::error::PipelineError;
    use crate::pipeline::FileImageSource;
    use image::{Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
            ])
        }))
    }

    fn blocks(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            if (x * 4 / width + y * 4 / height) % 2 == 0 {
                Rgb([250, 30, 30])
            } else {
                Rgb([20, 20, 200])
            }
        }))
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = FeatureExtractor::new();
        let img = gradient(320, 240);
        let a = extractor.extract(&img);
        let b = FeatureExtractor::new().extract(&img);
        assert_eq!(a, b);
    }

    #[test]
    fn test_hashes_are_resolution_insensitive() {
        let extractor = FeatureExtractor::new();
        let small = extractor.extract(&blocks(200, 150));
        let large = extractor.extract(&blocks(1600, 1200));
        assert!(small.perceptual_hash.hamming(&large.perceptual_hash) <= 16);
        assert!(small.average_hash.hamming(&large.average_hash) <= 16);
    }

    #[test]
    fn test_different_layouts_have_distant_hashes() {
        let extractor = FeatureExtractor::new();
        let a = extractor.extract(&gradient(256, 256));
        let b = extractor.extract(&blocks(256, 256));
        assert!(a.perceptual_hash.hamming(&b.perceptual_hash) > 20);
    }

    #[test]
    fn test_histogram_channels_are_normalized() {
        let fp = FeatureExtractor::new().extract(&gradient(300, 100));
        for channel in &fp.color_histogram.channels {
            let sum: f32 = channel.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_solid_image_histogram_and_edges() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([255, 0, 0])));
        let fp = FeatureExtractor::new().extract(&img);
        assert!((fp.color_histogram.channels[0][HISTOGRAM_BINS - 1] - 1.0).abs() < 1e-6);
        assert!((fp.color_histogram.channels[1][0] - 1.0).abs() < 1e-6);
        assert_eq!(fp.edge_density, 0.0);
    }

    #[test]
    fn test_edge_density_in_unit_range() {
        let fp = FeatureExtractor::new().extract(&blocks(500, 500));
        assert!(fp.edge_density > 0.0 && fp.edge_density <= 1.0);
    }

    #[test]
    fn test_extract_path_reports_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.jpg");
        std::fs::write(&path, b"\xFF\xD8\xFF\xE0 definitely not a jpeg").unwrap();

        let source = FileImageSource::new(LimitsConfig::default());
        let err = FeatureExtractor::new()
            .extract_path(&source, &path)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Decode { .. }));
        assert_eq!(err.path(), path.as_path());
    }

    #[test]
    fn test_extract_path_from_disk_matches_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gradient.png");
        let img = gradient(120, 80);
        img.save(&path).unwrap();

        let extractor = FeatureExtractor::new();
        let source = FileImageSource::new(LimitsConfig::default());
        let from_disk = extractor.extract_path(&source, &path).unwrap();
        assert_eq!(from_disk, extractor.extract(&img));
    }
}
