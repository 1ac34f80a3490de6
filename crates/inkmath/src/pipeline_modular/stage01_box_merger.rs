/// Stage 1: Box Merger
///
/// Fuses raw regions that are fragments of one symbol: the two bars of "=", the
/// dot and stem of "i", the stroke and point of "!".
///
/// Algorithm:
/// 1. For every box, collect the other boxes whose horizontal overlap (relative to
///    the union span) exceeds `min_x_overlap`; the box itself leads its group
/// 2. For each group with more than one member, pick the vertically nearest box
///    above and below the leader and test whether either is a plausible fragment
/// 3. Remove every box that took part in a merge, add the merged boxes, drop duplicates
/// 4. Repeat until a pass stops shrinking the box list
///
/// Groups of exactly `reserved_group_size` members are never merged: that shape is
/// a simple fraction (numerator, bar, denominator).
use crate::geometry::{contains, is_bigger, overlap, vertical_distance, Axis, BBox, OverlapBasis};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Configuration for Stage 1 (Box Merger)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage01Config {
    /// Minimum horizontal overlap (union basis) for two boxes to share a group
    pub min_x_overlap: f64,
    /// Fragments may not differ in width by this factor or more
    pub max_width_ratio: f64,
    /// Fragments may not differ in height by this factor or more
    pub max_height_ratio: f64,
    /// Vertical center distance must stay below `gap_factor` times the smaller height
    pub gap_factor: f64,
    /// Merged height cap, as a fraction of the image height
    pub max_merged_height: f64,
    /// Group size that is never merged
    pub reserved_group_size: usize,
}

impl Default for Stage01Config {
    #[inline]
    fn default() -> Self {
        Self {
            min_x_overlap: 0.25,
            max_width_ratio: 1.7,
            max_height_ratio: 5.0,
            gap_factor: 5.0,
            max_merged_height: 0.18,
            reserved_group_size: 3,
        }
    }
}

/// Stage 1: Box Merger
///
/// Input: raw region boxes and the image height
/// Output: boxes with fragment pairs replaced by their merged rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stage01BoxMerger {
    config: Stage01Config,
}

impl Stage01BoxMerger {
    /// Create a new `Stage01BoxMerger` with default configuration
    #[inline]
    #[must_use = "box merger stage is created but not used"]
    pub fn new() -> Self {
        Self {
            config: Stage01Config::default(),
        }
    }

    /// Create a new `Stage01BoxMerger` with custom configuration
    #[inline]
    #[must_use = "box merger stage is created but not used"]
    pub const fn with_config(config: Stage01Config) -> Self {
        Self { config }
    }

    /// Merge fragment boxes
    ///
    /// Merge passes repeat until a pass no longer shrinks the box list, so the
    /// output is a fixed point: processing it again returns it unchanged.
    ///
    /// # Arguments
    ///
    /// * `boxes` - raw region boxes (any order)
    /// * `image_height` - height of the source raster in pixels
    ///
    /// # Returns
    ///
    /// Unmerged boxes in their input order followed by the merged boxes, without duplicates
    #[must_use = "merged boxes are returned but not used"]
    pub fn process(&self, boxes: Vec<BBox>, image_height: u32) -> Vec<BBox> {
        let input_len = boxes.len();
        let mut seen = FxHashSet::default();
        let mut current: Vec<BBox> = boxes.into_iter().filter(|b| seen.insert(*b)).collect();

        let mut passes = 0;
        loop {
            passes += 1;
            let (next, merges) = self.merge_pass(&current, image_height);
            if merges == 0 || next.len() >= current.len() {
                break;
            }
            current = next;
        }

        log::debug!(
            "Stage 1: {} -> {} boxes in {} passes",
            input_len,
            current.len(),
            passes
        );
        current
    }

    /// One grouping and merging pass over duplicate-free boxes
    ///
    /// Returns the new box list and the number of merges performed.
    fn merge_pass(&self, boxes: &[BBox], image_height: u32) -> (Vec<BBox>, usize) {
        let groups: Vec<Vec<BBox>> = boxes
            .iter()
            .map(|leader| {
                let mut group = vec![*leader];
                group.extend(boxes.iter().copied().filter(|other| {
                    other != leader
                        && overlap(leader, other, Axis::X, OverlapBasis::Union)
                            > self.config.min_x_overlap
                }));
                group
            })
            .collect();

        let mut merged = Vec::new();
        let mut consumed = Vec::new();
        for group in groups.iter().filter(|g| g.len() > 1) {
            if let Some(partner) = self.find_partner(group, image_height) {
                merged.push(group[0].merge(&partner));
                consumed.push(group[0]);
                consumed.push(partner);
            }
        }

        let merge_count = merged.len();
        let mut remaining = boxes.to_vec();
        for gone in &consumed {
            if let Some(pos) = remaining.iter().position(|b| b == gone) {
                remaining.remove(pos);
            }
        }

        remaining.extend(merged);
        let mut seen = FxHashSet::default();
        remaining.retain(|b| seen.insert(*b));
        (remaining, merge_count)
    }

    /// Nearest box above, then nearest box below the group leader, if either can be fused with it
    ///
    /// Above wins when both qualify.
    fn find_partner(&self, group: &[BBox], image_height: u32) -> Option<BBox> {
        let leader = group[0];
        let mut upper: Option<(f64, BBox)> = None;
        let mut lower: Option<(f64, BBox)> = None;

        for candidate in &group[1..] {
            let dist = vertical_distance(&leader, candidate);
            let slot = if dist < 0.0 { &mut upper } else { &mut lower };
            if slot.map_or(true, |(best, _)| dist.abs() < best) {
                *slot = Some((dist.abs(), *candidate));
            }
        }

        [upper, lower]
            .into_iter()
            .flatten()
            .find(|&(dist, candidate)| {
                self.is_fragment_pair(&leader, &candidate, dist, group.len(), image_height)
            })
            .map(|(_, candidate)| candidate)
    }

    fn is_fragment_pair(
        &self,
        a: &BBox,
        b: &BBox,
        dist: f64,
        group_len: usize,
        image_height: u32,
    ) -> bool {
        let cfg = &self.config;
        let min_height = f64::from(a.height().min(b.height()));
        let merged_height = f64::from(a.merge(b).height());

        !is_bigger(a, b, cfg.max_width_ratio, Axis::X)
            && !is_bigger(a, b, cfg.max_height_ratio, Axis::Y)
            && cfg.gap_factor * min_height > dist
            && a != b
            && !contains(a, b)
            && !contains(b, a)
            && group_len != cfg.reserved_group_size
            && merged_height <= cfg.max_merged_height * f64::from(image_height)
    }
}
