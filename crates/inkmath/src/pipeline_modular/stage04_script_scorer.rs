/// Stage 4: Script-Level Scorer
///
/// For each adjacent pair in reading order, decides whether the second box is a
/// superscript or subscript of the first and accumulates a signed script depth.
///
/// Score of a same-level pair (a, b):
///
/// ```text
/// score = size_weight * (1 - h_b / h_a) + overshoot_weight * max(0, overshoot(a, b))
/// ```
///
/// where `overshoot` is how far `b` pokes out above or below `a`, in units of
/// `b`'s height. A score above `threshold` steps the depth by +1 when `b` sits
/// higher than `a` and by -1 when it sits lower. The first box of every level
/// starts at depth 0.
use crate::geometry::{vertical_overshoot, BBox};
use crate::pipeline_modular::types::{PlacedBox, ScriptedBox};
use serde::{Deserialize, Serialize};

/// Configuration for Stage 4 (Script-Level Scorer)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage04Config {
    /// Weight of the height-ratio term
    pub size_weight: f64,
    /// Weight of the vertical overshoot term
    pub overshoot_weight: f64,
    /// Scores above this value count as a script transition
    pub threshold: f64,
}

impl Default for Stage04Config {
    #[inline]
    fn default() -> Self {
        Self {
            size_weight: 0.8,
            overshoot_weight: 3.2,
            threshold: 1.0,
        }
    }
}

/// Scored relation between two neighbouring boxes on one level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptStep {
    /// +1 superscript, -1 subscript, 0 same baseline
    pub delta: i32,
    pub score: f64,
}

/// Stage 4: Script-Level Scorer
///
/// Input: placed boxes in final reading order
/// Output: the same boxes with their script depth
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stage04ScriptScorer {
    config: Stage04Config,
}

impl Stage04ScriptScorer {
    /// Create a new `Stage04ScriptScorer` with default configuration
    #[inline]
    #[must_use = "script scorer stage is created but not used"]
    pub fn new() -> Self {
        Self {
            config: Stage04Config::default(),
        }
    }

    /// Create a new `Stage04ScriptScorer` with custom configuration
    #[inline]
    #[must_use = "script scorer stage is created but not used"]
    pub const fn with_config(config: Stage04Config) -> Self {
        Self { config }
    }

    /// Score `next` against `prev` (both assumed on the same level)
    #[must_use]
    pub fn score_pair(&self, prev: &BBox, next: &BBox) -> ScriptStep {
        let prev_height = f64::from(prev.height());
        let size_term = if prev_height > 0.0 {
            1.0 - f64::from(next.height()) / prev_height
        } else {
            0.0
        };
        let overshoot_term = vertical_overshoot(prev, next).max(0.0);
        let score =
            self.config.size_weight * size_term + self.config.overshoot_weight * overshoot_term;

        let delta = if score > self.config.threshold {
            let (yc_prev, yc_next) = (prev.y_center(), next.y_center());
            if yc_prev > yc_next {
                1
            } else if yc_prev < yc_next {
                -1
            } else {
                0
            }
        } else {
            0
        };
        ScriptStep { delta, score }
    }

    #[must_use = "scored boxes are returned but not used"]
    pub fn process(&self, placed: Vec<PlacedBox>) -> Vec<ScriptedBox> {
        let mut depth = 0;
        let mut out: Vec<ScriptedBox> = Vec::with_capacity(placed.len());

        for (i, p) in placed.iter().enumerate() {
            if i > 0 {
                let prev = &placed[i - 1];
                depth = if prev.level == p.level {
                    depth + self.score_pair(&prev.bbox, &p.bbox).delta
                } else {
                    0
                };
            }
            out.push(ScriptedBox {
                bbox: p.bbox,
                level: p.level,
                role: p.role,
                script_level: depth,
            });
        }

        log::debug!(
            "Stage 4: {} of {} boxes off the baseline",
            out.iter().filter(|s| s.script_level != 0).count(),
            out.len()
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline_modular::types::StackRole;

    fn flat(bbox: BBox, level: u32) -> PlacedBox {
        PlacedBox::new(bbox, level, StackRole::None)
    }

    #[test]
    fn test_superscript_pair() {
        // b is 40% of a's height and its top is 20px above a's top (b height 16)
        let a = BBox::new(0, 40, 30, 80);
        let b = BBox::new(32, 20, 44, 36);
        let step = Stage04ScriptScorer::new().score_pair(&a, &b);
        assert_eq!(step.delta, 1);
        assert!(step.score > 1.0);
    }

    #[test]
    fn test_subscript_pair() {
        let a = BBox::new(0, 40, 30, 80);
        let b = BBox::new(32, 70, 44, 90);
        let step = Stage04ScriptScorer::new().score_pair(&a, &b);
        assert_eq!(step.delta, -1);
    }

    #[test]
    fn test_same_size_neighbour_stays_on_baseline() {
        let a = BBox::new(0, 40, 30, 80);
        let b = BBox::new(40, 42, 70, 82);
        let step = Stage04ScriptScorer::new().score_pair(&a, &b);
        assert_eq!(step.delta, 0);
        assert!(step.score < 1.0);
    }

    #[test]
    fn test_depth_accumulates_and_resets_on_level_change() {
        let input = vec![
            flat(BBox::new(0, 40, 30, 80), 0),
            flat(BBox::new(32, 20, 44, 36), 0),
            flat(BBox::new(46, 8, 52, 16), 0),
            flat(BBox::new(80, 40, 110, 80), 1),
        ];
        let out = Stage04ScriptScorer::new().process(input);
        let depths: Vec<i32> = out.iter().map(|s| s.script_level).collect();
        assert_eq!(depths, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_empty_input() {
        assert!(Stage04ScriptScorer::new().process(Vec::new()).is_empty());
    }
}
