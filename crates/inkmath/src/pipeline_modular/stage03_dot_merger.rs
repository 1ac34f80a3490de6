/// Stage 3: Dot Merger
///
/// Second, narrower merge pass over the ordered layout. Catches detached dots
/// (on "i", "j", "!") that Stage 1 left apart because their overlap group had the
/// reserved fraction size.
///
/// Algorithm:
/// 1. Walk adjacent pairs in reading order
/// 2. A pair merges when both have the same stack role, the smaller box is almost
///    fully covered horizontally, the boxes barely overlap vertically, and the
///    merged box stays under the height cap
/// 3. Apply merges back to front so earlier indices stay valid; the merged box
///    keeps the first member's level and role
use crate::geometry::{overlap, Axis, OverlapBasis};
use crate::pipeline_modular::types::PlacedBox;
use serde::{Deserialize, Serialize};

/// Configuration for Stage 3 (Dot Merger)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage03Config {
    pub enabled: bool,
    /// Minimum horizontal overlap relative to the smaller box
    pub min_x_overlap: f64,
    /// Maximum vertical overlap relative to the union span
    pub max_y_overlap: f64,
    /// Merged height cap, as a fraction of the image height
    pub max_merged_height: f64,
}

impl Default for Stage03Config {
    #[inline]
    fn default() -> Self {
        Self {
            enabled: true,
            min_x_overlap: 0.75,
            max_y_overlap: 0.2,
            max_merged_height: 0.18,
        }
    }
}

/// Stage 3: Dot Merger
///
/// Input: placed boxes from Stage 2, image height
/// Output: placed boxes with adjacent dot/stem pairs fused
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stage03DotMerger {
    config: Stage03Config,
}

impl Stage03DotMerger {
    /// Create a new `Stage03DotMerger` with default configuration
    #[inline]
    #[must_use = "dot merger stage is created but not used"]
    pub fn new() -> Self {
        Self {
            config: Stage03Config::default(),
        }
    }

    /// Create a new `Stage03DotMerger` with custom configuration
    #[inline]
    #[must_use = "dot merger stage is created but not used"]
    pub const fn with_config(config: Stage03Config) -> Self {
        Self { config }
    }

    #[must_use = "merged boxes are returned but not used"]
    pub fn process(&self, mut placed: Vec<PlacedBox>, image_height: u32) -> Vec<PlacedBox> {
        if !self.config.enabled || placed.len() < 2 {
            return placed;
        }

        let height_cap = self.config.max_merged_height * f64::from(image_height);
        let pairs: Vec<usize> = placed
            .windows(2)
            .enumerate()
            .filter(|(_, w)| {
                let (a, b) = (&w[0].bbox, &w[1].bbox);
                w[0].role == w[1].role
                    && overlap(a, b, Axis::X, OverlapBasis::Smaller) > self.config.min_x_overlap
                    && overlap(a, b, Axis::Y, OverlapBasis::Union) < self.config.max_y_overlap
                    && f64::from(a.merge(b).height()) <= height_cap
            })
            .map(|(i, _)| i)
            .collect();

        for &i in pairs.iter().rev() {
            let absorbed = placed.remove(i + 1);
            placed[i].bbox = placed[i].bbox.merge(&absorbed.bbox);
        }

        if !pairs.is_empty() {
            log::debug!("Stage 3: merged {} dot pairs", pairs.len());
        }
        placed
    }
}
