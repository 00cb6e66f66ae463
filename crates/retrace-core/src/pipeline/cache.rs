//! Content-addressed extraction cache.
//!
//! Everything derived from pixels depends only on the file's bytes, so an
//! entry computed for one file checksum is valid for any file with the same
//! checksum. A cancelled or interrupted batch keeps its cache and a retry only
//! extracts what is missing.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::duplicates::ContentChecksum;

use super::batch::ExtractedImage;

/// Thread-safe map from file checksum to extraction result.
#[derive(Default)]
pub struct ExtractionCache {
    entries: RwLock<HashMap<ContentChecksum, ExtractedImage>>,
}

impl ExtractionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, checksum: &ContentChecksum) -> Option<ExtractedImage> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(checksum).cloned())
    }

    pub fn insert(&self, checksum: ContentChecksum, image: ExtractedImage) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(checksum, image);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::FeatureExtractor;
    use image::DynamicImage;

    fn extracted(width: u32, height: u32) -> ExtractedImage {
        let img = DynamicImage::new_rgb8(width, height);
        ExtractedImage {
            fingerprint: FeatureExtractor::new().extract(&img),
            width,
            height,
            format: "png".to_string(),
            pixel_checksum: ContentChecksum::of_pixels(&img),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let cache = ExtractionCache::new();
        let checksum = ContentChecksum::of_bytes(b"photo bytes");
        assert!(cache.get(&checksum).is_none());

        let entry = extracted(32, 32);
        cache.insert(checksum.clone(), entry.clone());
        assert_eq!(cache.get(&checksum), Some(entry));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_checksums_do_not_collide() {
        let cache = ExtractionCache::new();
        cache.insert(ContentChecksum::of_bytes(b"a"), extracted(8, 8));
        assert!(cache.get(&ContentChecksum::of_bytes(b"b")).is_none());
        assert!(!cache.is_empty());
    }
}
