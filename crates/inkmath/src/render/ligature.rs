/// Ligature Combiner
///
/// Handwritten function names are detected glyph by glyph ("s", "i", "n"), and a
/// few letters are routinely split into two glyphs ("x" as ")(", "k" as "1c").
/// This pass rewrites each [`LevelRow`] in place:
///
/// 1. Function names: an ordered table of (start, middle, end) label sets, one
///    replacement token per rule. The start label matches exactly; middle and end
///    labels match case-insensitively.
/// 2. "x" at the row edges: ")(", "7(", "2c", "]c" and the like, only at the first
///    or last pair of the row.
/// 3. "x" inside the row: ")(" or "]c" whose following symbol changes script depth.
/// 4. "k": "1" followed by "c" or "(".
///
/// Rows shorter than three symbols are left alone.
use super::levels::LevelRow;

/// Three-glyph rewrite rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LigatureRule {
    pub start: &'static [&'static str],
    pub middle: &'static [&'static str],
    pub end: &'static [&'static str],
    pub replacement: &'static str,
}

impl LigatureRule {
    /// Does the triple starting at `index` match this rule?
    #[must_use]
    pub fn matches_at(&self, labels: &[String], index: usize) -> bool {
        let (Some(first), Some(second), Some(third)) =
            (labels.get(index), labels.get(index + 1), labels.get(index + 2))
        else {
            return false;
        };
        self.start.contains(&first.as_str())
            && self.middle.contains(&second.to_lowercase().as_str())
            && self.end.contains(&third.to_lowercase().as_str())
    }
}

/// Function-name rules, applied in this order
pub const FUNCTION_LIGATURES: [LigatureRule; 5] = [
    LigatureRule {
        start: &["s", "S", "5", "\\lt"],
        middle: &["i", "1", "t", "!"],
        end: &["n"],
        replacement: "\\sin",
    },
    LigatureRule {
        start: &["c", "C", "("],
        middle: &["o", "0"],
        end: &["s"],
        replacement: "\\cos",
    },
    LigatureRule {
        start: &["t", "T", "+", "1"],
        middle: &["a"],
        end: &["n"],
        replacement: "\\tan",
    },
    LigatureRule {
        start: &["l", "L", "1"],
        middle: &["o", "0", "a"],
        end: &["g", ",", ")", "\\gamma", "y"],
        replacement: "\\log",
    },
    LigatureRule {
        start: &["l", "L"],
        middle: &["i", "1"],
        end: &["m"],
        replacement: "\\lim",
    },
];

const EDGE_X_START: [&str; 4] = [")", "7", "2", "]"];
const EDGE_X_END: [&str; 2] = ["(", "c"];
const INNER_X_START: [&str; 2] = [")", "]"];
const K_START: &str = "1";
const K_END: [&str; 2] = ["c", "("];

/// Rewrites label rows according to a table of [`LigatureRule`]s plus the fixed
/// "x"/"k" corrections
#[derive(Debug, Clone, Copy)]
pub struct LigatureCombiner {
    rules: &'static [LigatureRule],
}

impl Default for LigatureCombiner {
    #[inline]
    fn default() -> Self {
        Self {
            rules: &FUNCTION_LIGATURES,
        }
    }
}

impl LigatureCombiner {
    #[inline]
    #[must_use = "combiner is created but not used"]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use = "combiner is created but not used"]
    pub const fn with_rules(rules: &'static [LigatureRule]) -> Self {
        Self { rules }
    }

    /// Apply every rewrite to `row`; returns the number of rewrites
    pub fn combine(&self, row: &mut LevelRow) -> usize {
        if row.len() < 3 {
            return 0;
        }
        let mut rewrites = 0;
        for rule in self.rules {
            rewrites += apply_rule(rule, row);
        }
        rewrites += combine_edge_x(row);
        rewrites += combine_inner_x(row);
        rewrites += combine_k(row);

        if rewrites > 0 {
            log::debug!(
                "Ligatures: {rewrites} rewrites on level {} -> {:?}",
                row.level,
                row.labels
            );
        }
        rewrites
    }
}

fn apply_rule(rule: &LigatureRule, row: &mut LevelRow) -> usize {
    let mut rewrites = 0;
    let mut index = 0;
    while index + 2 < row.len() {
        if rule.matches_at(&row.labels, index) {
            row.collapse(index, 2, rule.replacement);
            rewrites += 1;
        }
        index += 1;
    }
    rewrites
}

fn is_edge_x(row: &LevelRow, index: usize) -> bool {
    matches!(
        (row.labels.get(index), row.labels.get(index + 1)),
        (Some(a), Some(b)) if EDGE_X_START.contains(&a.as_str()) && EDGE_X_END.contains(&b.as_str())
    )
}

fn combine_edge_x(row: &mut LevelRow) -> usize {
    let mut rewrites = 0;
    if is_edge_x(row, 0) {
        row.collapse(0, 1, "x");
        rewrites += 1;
    }
    if let Some(last_pair) = row.len().checked_sub(2) {
        if last_pair > 0 && is_edge_x(row, last_pair) {
            row.collapse(last_pair, 1, "x");
            rewrites += 1;
        }
    }
    rewrites
}

fn combine_inner_x(row: &mut LevelRow) -> usize {
    let mut rewrites = 0;
    let mut index = 0;
    while index + 2 < row.len() {
        let bracket_pair = INNER_X_START.contains(&row.labels[index].as_str())
            && EDGE_X_END.contains(&row.labels[index + 1].to_lowercase().as_str());
        if bracket_pair && row.scripts[index + 2] != row.scripts[index] {
            row.collapse(index, 1, "x");
            rewrites += 1;
        }
        index += 1;
    }
    rewrites
}

fn combine_k(row: &mut LevelRow) -> usize {
    let mut rewrites = 0;
    let mut index = 0;
    while index + 1 < row.len() {
        if row.labels[index] == K_START
            && K_END.contains(&row.labels[index + 1].to_lowercase().as_str())
        {
            row.collapse(index, 1, "k");
            rewrites += 1;
        }
        index += 1;
    }
    rewrites
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline_modular::types::StackRole;

    fn row(labels: &[&str]) -> LevelRow {
        let mut row = LevelRow::new(0, StackRole::None);
        for label in labels {
            row.push(*label, 0, 0);
        }
        row
    }

    fn combined(labels: &[&str]) -> Vec<String> {
        let mut r = row(labels);
        LigatureCombiner::new().combine(&mut r);
        r.labels
    }

    #[test]
    fn test_sin_collapses_with_parallel_lists() {
        let mut r = row(&["s", "i", "n"]);
        assert_eq!(LigatureCombiner::new().combine(&mut r), 1);
        assert_eq!(r.labels, vec!["\\sin"]);
        assert_eq!(r.scripts.len(), 1);
        assert_eq!(r.extends.len(), 1);
    }

    #[test]
    fn test_function_names_tolerate_variants() {
        assert_eq!(combined(&["5", "I", "n", "x"]), vec!["\\sin", "x"]);
        assert_eq!(combined(&["(", "0", "s", "y"]), vec!["\\cos", "y"]);
        assert_eq!(combined(&["2", "+", "a", "n"]), vec!["2", "\\tan"]);
        assert_eq!(combined(&["1", "o", "\\gamma", "8"]), vec!["\\log", "8"]);
        assert_eq!(combined(&["L", "1", "m", "x"]), vec!["\\lim", "x"]);
    }

    #[test]
    fn test_middle_and_end_ignore_case() {
        assert_eq!(combined(&["C", "O", "S"]), vec!["\\cos"]);
        assert_eq!(combined(&["N", "i", "n"]), vec!["N", "i", "n"]);
    }

    #[test]
    fn test_short_rows_are_untouched() {
        assert_eq!(combined(&[")", "("]), vec![")", "("]);
        assert_eq!(combined(&["1", "c"]), vec!["1", "c"]);
    }

    #[test]
    fn test_edge_x_at_start_and_end() {
        assert_eq!(combined(&[")", "(", "+", "y"]), vec!["x", "+", "y"]);
        assert_eq!(combined(&["y", "+", "]", "c"]), vec!["y", "+", "x"]);
    }

    #[test]
    fn test_inner_x_needs_script_change() {
        let mut r = row(&["a", ")", "(", "2", "b"]);
        r.scripts = vec![0, 0, 0, 1, 0];
        LigatureCombiner::new().combine(&mut r);
        assert_eq!(r.labels, vec!["a", "x", "2", "b"]);
        assert_eq!(r.scripts, vec![0, 0, 1, 0]);

        assert_eq!(combined(&["a", ")", "(", "2", "b"]), vec!["a", ")", "(", "2", "b"]);
    }

    #[test]
    fn test_k_from_one_and_c() {
        assert_eq!(combined(&["2", "1", "C", "+"]), vec!["2", "k", "+"]);
    }

    #[test]
    fn test_multiple_matches_in_one_row() {
        assert_eq!(
            combined(&["s", "i", "n", "+", "c", "o", "s"]),
            vec!["\\sin", "+", "\\cos"]
        );
    }

    #[test]
    fn test_custom_rule_table() {
        const RULES: [LigatureRule; 1] = [LigatureRule {
            start: &["e"],
            middle: &["x"],
            end: &["p"],
            replacement: "\\exp",
        }];
        let mut r = row(&["e", "x", "p"]);
        LigatureCombiner::with_rules(&RULES).combine(&mut r);
        assert_eq!(r.labels, vec!["\\exp"]);
    }
}
