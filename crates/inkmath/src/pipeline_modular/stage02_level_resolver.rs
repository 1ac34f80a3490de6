/// Stage 2: Level Resolver
///
/// Orders boxes into reading sequence and assigns each a level (a left-to-right
/// readable row) and a stack role.
///
/// Algorithm:
/// 1. Sort boxes by left edge
/// 2. For each box, find its stacking partners: boxes that cover more than
///    `partner_x_overlap` of the smaller box horizontally while overlapping less than
///    `partner_y_overlap` vertically. A box whose only partner has it as its only
///    partner is a plain pair (e.g. a superscript), not a stack
/// 3. Scan the horizontal extent for uncovered columns; a stacked box separated
///    from the previous box by such a gap starts a new stack
/// 4. Walk the boxes left to right with a [`LevelWalk`] accumulator
/// 5. Stable-sort by level
///
/// Level numbering: entering a stack from flat content adds 1, leaving a stack
/// (or starting an adjacent one) adds 3, so a stack owns three consecutive level
/// numbers (top, middle, bottom).
use crate::geometry::{overlap, Axis, BBox, OverlapBasis};
use crate::pipeline_modular::types::{PlacedBox, StackRole};
use serde::{Deserialize, Serialize};

/// Configuration for Stage 2 (Level Resolver)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage02Config {
    /// Minimum horizontal overlap relative to the smaller box
    pub partner_x_overlap: f64,
    /// Maximum vertical overlap relative to the union span
    pub partner_y_overlap: f64,
    /// Column step of the coverage gap scan, in pixels
    pub gap_scan_step: u32,
}

impl Default for Stage02Config {
    #[inline]
    fn default() -> Self {
        Self {
            partner_x_overlap: 0.3,
            partner_y_overlap: 0.3,
            gap_scan_step: 5,
        }
    }
}

/// Running state of the left-to-right level walk
///
/// Each call to [`LevelWalk::flat`] or [`LevelWalk::stacked`] consumes one box and
/// returns its level and role.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LevelWalk {
    level: u32,
    in_stack: bool,
    enter_stack: bool,
    middle_count: u32,
    middle_center: f64,
}

impl LevelWalk {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current base level of the walk
    #[inline]
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// A box without stacking partners
    pub fn flat(&mut self) -> (u32, StackRole) {
        if self.in_stack {
            self.middle_count = 0;
            self.level += 3;
        }
        self.in_stack = false;
        self.enter_stack = true;
        (self.level, StackRole::None)
    }

    /// A box with stacking partners
    ///
    /// * `partner_side` - role implied by where the partners lie
    /// * `crossed_gap` - an uncovered column separates this box from the previous one
    /// * `y_center` - vertical center of the box
    pub fn stacked(
        &mut self,
        partner_side: StackRole,
        crossed_gap: bool,
        y_center: f64,
    ) -> (u32, StackRole) {
        if self.in_stack && crossed_gap {
            self.level += 3;
            self.middle_count = 0;
        }
        if self.enter_stack {
            self.level += 1;
            self.enter_stack = false;
        }

        let mut role = partner_side;
        if role == StackRole::Middle {
            if self.middle_count == 0 {
                self.middle_center = y_center;
            }
            self.middle_count += 1;
            // only one connective per stack; later candidates join the nearer level
            if self.middle_count > 1 {
                role = if y_center > self.middle_center {
                    StackRole::Bottom
                } else {
                    StackRole::Top
                };
            }
        }

        self.in_stack = true;
        (self.level + role.level_offset(), role)
    }
}

/// Stage 2: Level Resolver
///
/// Input: final (merged) boxes
/// Output: boxes sorted by level, then left to right, with level and stack role
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stage02LevelResolver {
    config: Stage02Config,
}

impl Stage02LevelResolver {
    /// Create a new `Stage02LevelResolver` with default configuration
    #[inline]
    #[must_use = "level resolver stage is created but not used"]
    pub fn new() -> Self {
        Self {
            config: Stage02Config::default(),
        }
    }

    /// Create a new `Stage02LevelResolver` with custom configuration
    #[inline]
    #[must_use = "level resolver stage is created but not used"]
    pub const fn with_config(config: Stage02Config) -> Self {
        Self { config }
    }

    /// Resolve reading order, levels and stack roles
    #[must_use = "placed boxes are returned but not used"]
    pub fn process(&self, mut boxes: Vec<BBox>) -> Vec<PlacedBox> {
        if boxes.len() <= 1 {
            return boxes
                .into_iter()
                .map(|b| PlacedBox::new(b, 0, StackRole::None))
                .collect();
        }

        boxes.sort_unstable();
        let partners = self.stacking_partners(&boxes);
        let gaps = self.coverage_gaps(&boxes);

        let mut walk = LevelWalk::new();
        let mut placed = Vec::with_capacity(boxes.len());
        for (i, bbox) in boxes.iter().enumerate() {
            let mine = &partners[i];
            let single_pair = mine.len() == 1 && partners[mine[0]].len() == 1;

            let (level, role) = if mine.is_empty() || single_pair {
                walk.flat()
            } else {
                let crossed_gap = i > 0 && {
                    let prev_end = boxes[i - 1].x2;
                    gaps.iter().any(|&g| prev_end < g && g < bbox.x1)
                };
                let side = partner_side(bbox, mine.iter().map(|&j| &boxes[j]));
                walk.stacked(side, crossed_gap, bbox.y_center())
            };
            placed.push(PlacedBox::new(*bbox, level, role));
        }

        placed.sort_by_key(|p| p.level);

        log::debug!(
            "Stage 2: {} boxes placed on {} levels",
            placed.len(),
            placed.last().map_or(0, |p| p.level + 1)
        );
        placed
    }

    /// Indices of each box's stacking partners
    fn stacking_partners(&self, boxes: &[BBox]) -> Vec<Vec<usize>> {
        boxes
            .iter()
            .map(|bbox| {
                boxes
                    .iter()
                    .enumerate()
                    .filter(|(_, other)| {
                        *other != bbox
                            && overlap(bbox, other, Axis::X, OverlapBasis::Smaller)
                                > self.config.partner_x_overlap
                            && overlap(bbox, other, Axis::Y, OverlapBasis::Union)
                                < self.config.partner_y_overlap
                    })
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect()
    }

    /// Sampled x columns that no box covers (edges inclusive)
    fn coverage_gaps(&self, boxes: &[BBox]) -> Vec<i32> {
        let (Some(start), Some(end)) = (
            boxes.iter().map(|b| b.x1).min(),
            boxes.iter().map(|b| b.x2).max(),
        ) else {
            return Vec::new();
        };
        let step = self.config.gap_scan_step.max(1) as usize;

        (start..end)
            .step_by(step)
            .filter(|&x| !boxes.iter().any(|b| b.x1 <= x && x <= b.x2))
            .collect()
    }
}

/// Role implied by the partners' top edges: partners only below means this box is
/// the top level, only above means bottom, both means middle
fn partner_side<'a>(bbox: &BBox, partners: impl Iterator<Item = &'a BBox>) -> StackRole {
    let mut has_above = false;
    let mut has_below = false;
    for p in partners {
        has_below |= p.y1 > bbox.y1;
        has_above |= p.y1 < bbox.y1;
    }
    match (has_above, has_below) {
        (true, true) => StackRole::Middle,
        (true, false) => StackRole::Bottom,
        _ => StackRole::Top,
    }
}
