/// Per-level grouping of the symbol stream
///
/// The renderer works one reading level at a time. A [`LevelRow`] holds the labels
/// of one level together with their parallel script-depth and extend-count lists;
/// every edit keeps the three lists the same length.
use super::RenderSymbol;
use crate::pipeline_modular::types::StackRole;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LevelRow {
    pub level: u32,
    /// Role of the level's first symbol
    pub role: StackRole,
    pub labels: Vec<String>,
    pub scripts: Vec<i32>,
    pub extends: Vec<usize>,
}

impl LevelRow {
    #[must_use]
    pub fn new(level: u32, role: StackRole) -> Self {
        Self {
            level,
            role,
            ..Self::default()
        }
    }

    pub fn push(&mut self, label: impl Into<String>, script_level: i32, extend_count: usize) {
        self.labels.push(label.into());
        self.scripts.push(script_level);
        self.extends.push(extend_count);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn first_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    /// Replace the entry at `index` by `label` and drop the `consumed` entries after it
    ///
    /// The entry at `index` keeps its script depth and extend count.
    pub fn collapse(&mut self, index: usize, consumed: usize, label: &str) {
        let end = (index + 1 + consumed).min(self.len());
        if index >= end {
            return;
        }
        self.labels.drain(index + 1..end);
        self.scripts.drain(index + 1..end);
        self.extends.drain(index + 1..end);
        self.labels[index] = label.to_string();
    }

    /// Add `delta` to the script depth of every entry from `start` on
    pub fn shift_scripts(&mut self, start: usize, delta: i32) {
        for script in self.scripts.iter_mut().skip(start) {
            *script += delta;
        }
    }
}

/// Group symbols into rows of equal level, ordered by level
///
/// Symbols keep their relative order within a level. Levels without symbols
/// produce no row.
#[must_use]
pub fn group_levels(symbols: &[RenderSymbol]) -> Vec<LevelRow> {
    let mut ordered: Vec<&RenderSymbol> = symbols.iter().collect();
    ordered.sort_by_key(|s| s.level);

    let mut rows: Vec<LevelRow> = Vec::new();
    for symbol in ordered {
        match rows.last_mut() {
            Some(row) if row.level == symbol.level => {
                row.push(symbol.label.as_str(), symbol.script_level, symbol.extend_count);
            }
            _ => {
                let mut row = LevelRow::new(symbol.level, symbol.role);
                row.push(symbol.label.as_str(), symbol.script_level, symbol.extend_count);
                rows.push(row);
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_levels_keeps_order_within_level() {
        let symbols = vec![
            RenderSymbol::new("9", 0, StackRole::Top, 0, 0),
            RenderSymbol::new("-", 1, StackRole::Middle, 0, 0),
            RenderSymbol::new("x", 0, StackRole::Top, 0, 0),
            RenderSymbol::new("4", 2, StackRole::Bottom, 0, 0),
        ];
        let rows = group_levels(&symbols);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].labels, vec!["9", "x"]);
        assert_eq!(rows[0].role, StackRole::Top);
        assert_eq!(rows[1].first_label(), Some("-"));
        assert_eq!(rows[2].role, StackRole::Bottom);
    }

    #[test]
    fn test_level_gaps_are_skipped() {
        let symbols = vec![RenderSymbol::baseline("a", 0), RenderSymbol::baseline("b", 3)];
        let rows = group_levels(&symbols);
        assert_eq!(rows.iter().map(|r| r.level).collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn test_collapse_keeps_parallel_lists_aligned() {
        let mut row = LevelRow::new(0, StackRole::None);
        row.push("s", 1, 0);
        row.push("i", 2, 3);
        row.push("n", 0, 0);
        row.push("x", 0, 0);
        row.collapse(0, 2, "\\sin");
        assert_eq!(row.labels, vec!["\\sin", "x"]);
        assert_eq!(row.scripts, vec![1, 0]);
        assert_eq!(row.extends, vec![0, 0]);
    }

    #[test]
    fn test_shift_scripts_from_index() {
        let mut row = LevelRow::new(0, StackRole::None);
        for _ in 0..3 {
            row.push("a", 0, 0);
        }
        row.shift_scripts(1, -1);
        assert_eq!(row.scripts, vec![0, -1, -1]);
    }
}
