//! Per-group strategy suggestions.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::{MemberMetadata, MergeStrategy};

/// Common screen resolutions, landscape and portrait.
const SCREEN_RESOLUTIONS: &[(u32, u32)] = &[
    (1920, 1080),
    (2560, 1440),
    (3840, 2160),
    (1080, 1920),
    (1440, 2560),
    (2160, 3840),
    (2048, 2732),
    (2732, 2048),
    (1170, 2532),
    (1179, 2556),
];

const RESOLUTION_TOLERANCE: u32 = 10;

/// The largest file must exceed the runner-up by this factor to be preferred
/// outright.
const DOMINANT_SIZE_RATIO: f64 = 1.5;

static SCREENSHOT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = [
        r"screenshot",
        r"screen shot",
        r"screencap",
        r"capture",
        r"snapchat",
        r"截圖",
        r"截图",
        r"截屏",
        r"屏幕截图",
        r"屏幕快照",
        r"IMG_\d{4}\s*\(\d+\)",
        r"Screenshot_\d{4}-\d{2}-\d{2}",
        r"Screen\s+Shot\s+\d{4}-\d{2}-\d{2}",
    ]
    .join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .expect("valid regex")
});

/// Whether `width` x `height` is within a few pixels of a common screen size,
/// in either orientation.
pub fn is_likely_screenshot(width: u32, height: u32) -> bool {
    SCREEN_RESOLUTIONS.iter().any(|&(w, h)| {
        (width.abs_diff(w) <= RESOLUTION_TOLERANCE && height.abs_diff(h) <= RESOLUTION_TOLERANCE)
            || (width.abs_diff(h) <= RESOLUTION_TOLERANCE
                && height.abs_diff(w) <= RESOLUTION_TOLERANCE)
    })
}

/// Whether a file name looks like a screen capture or a numbered copy.
pub fn is_screenshot_name(file_name: &str) -> bool {
    SCREENSHOT_NAME.is_match(file_name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationReason {
    /// Every member looks like a screenshot
    AllScreenshots,
    /// One file is much larger than the rest
    DominantFile,
    /// Nothing stands out
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub strategy: MergeStrategy,
    pub reason: RecommendationReason,
}

/// Suggest a strategy for one group.
pub fn recommend_strategy(members: &[MemberMetadata]) -> Recommendation {
    let all_screenshots = !members.is_empty()
        && members.iter().all(|m| {
            is_likely_screenshot(m.width, m.height) || is_screenshot_name(&m.file_name)
        });
    if all_screenshots {
        return Recommendation {
            strategy: MergeStrategy::BestQuality,
            reason: RecommendationReason::AllScreenshots,
        };
    }

    let mut sizes: Vec<u64> = members.iter().map(|m| m.file_size).collect();
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    if let [largest, runner_up, ..] = sizes[..] {
        if largest as f64 > runner_up as f64 * DOMINANT_SIZE_RATIO {
            return Recommendation {
                strategy: MergeStrategy::BestQuality,
                reason: RecommendationReason::DominantFile,
            };
        }
    }

    Recommendation {
        strategy: MergeStrategy::SmartMerge,
        reason: RecommendationReason::Mixed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PhotoId;

    fn member(name: &str, width: u32, height: u32, size: u64) -> MemberMetadata {
        MemberMetadata {
            id: PhotoId::new(name),
            file_name: name.to_string(),
            width,
            height,
            file_size: size,
            captured_at: None,
            gps: None,
        }
    }

    #[test]
    fn test_screen_resolutions() {
        assert!(is_likely_screenshot(1920, 1080));
        assert!(is_likely_screenshot(1080, 1920));
        assert!(is_likely_screenshot(1925, 1075));
        assert!(is_likely_screenshot(2556, 1179));
        assert!(!is_likely_screenshot(4032, 3024));
        assert!(!is_likely_screenshot(1931, 1080));
    }

    #[test]
    fn test_screenshot_names() {
        assert!(is_screenshot_name("Screenshot_2024-01-05-10-11-12.png"));
        assert!(is_screenshot_name("Screen Shot 2019-03-01 at 10.00.00.png"));
        assert!(is_screenshot_name("IMG_1234 (2).jpg"));
        assert!(is_screenshot_name("屏幕截图 001.png"));
        assert!(is_screenshot_name("SCREENCAP.PNG"));
        assert!(!is_screenshot_name("IMG_1234.jpg"));
        assert!(!is_screenshot_name("holiday.jpg"));
    }

    #[test]
    fn test_all_screenshots_prefers_best_quality() {
        let members = [
            member("a.png", 1920, 1080, 100),
            member("Screenshot_2024-01-01.png", 800, 600, 100),
        ];
        assert_eq!(
            recommend_strategy(&members),
            Recommendation {
                strategy: MergeStrategy::BestQuality,
                reason: RecommendationReason::AllScreenshots,
            }
        );
    }

    #[test]
    fn test_dominant_file() {
        let members = [
            member("a.jpg", 4000, 3000, 3_100_000),
            member("b.jpg", 4000, 3000, 2_000_000),
            member("c.jpg", 4000, 3000, 400_000),
        ];
        assert_eq!(
            recommend_strategy(&members).reason,
            RecommendationReason::DominantFile
        );
    }

    #[test]
    fn test_similar_sizes_use_smart_merge() {
        let members = [
            member("a.jpg", 4000, 3000, 2_900_000),
            member("b.jpg", 4000, 3000, 2_000_000),
        ];
        assert_eq!(
            recommend_strategy(&members),
            Recommendation {
                strategy: MergeStrategy::SmartMerge,
                reason: RecommendationReason::Mixed,
            }
        );
        assert_eq!(recommend_strategy(&[]).strategy, MergeStrategy::SmartMerge);
    }
}
