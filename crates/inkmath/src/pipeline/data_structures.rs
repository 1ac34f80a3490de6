use crate::classifier::Prediction;
use crate::error::{InkmathError, Result};
use crate::pipeline_modular::types::{IsolatedSymbol, StackRole, SymbolLayout};
use crate::render::RenderSymbol;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Output of segmentation: isolated symbols in final reading order
///
/// The accessor lists (`glyphs`, `levels`, `stack_roles`, `script_levels`,
/// `extend_counts`) are positionally aligned, one entry per symbol.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SegmentedEquation {
    pub symbols: Vec<IsolatedSymbol>,
}

impl SegmentedEquation {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn layouts(&self) -> impl Iterator<Item = &SymbolLayout> + '_ {
        self.symbols.iter().map(|s| &s.layout)
    }

    #[must_use]
    pub fn glyphs(&self) -> Vec<&GrayImage> {
        self.symbols.iter().map(|s| &s.glyph).collect()
    }

    #[must_use]
    pub fn levels(&self) -> Vec<u32> {
        self.layouts().map(|l| l.level).collect()
    }

    #[must_use]
    pub fn stack_roles(&self) -> Vec<StackRole> {
        self.layouts().map(|l| l.role).collect()
    }

    #[must_use]
    pub fn script_levels(&self) -> Vec<i32> {
        self.layouts().map(|l| l.script_level).collect()
    }

    #[must_use]
    pub fn extend_counts(&self) -> Vec<usize> {
        self.layouts().map(|l| l.extend_count).collect()
    }

    /// Pair each symbol with its label, in order
    ///
    /// # Errors
    ///
    /// [`InkmathError::InvalidInput`] when the label count differs from the symbol count
    pub fn label<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<RenderSymbol>> {
        if labels.len() != self.len() {
            return Err(InkmathError::InvalidInput {
                reason: format!(
                    "{} labels for {} segmented symbols",
                    labels.len(),
                    self.len()
                ),
            });
        }
        Ok(self
            .layouts()
            .zip(labels)
            .map(|(layout, label)| RenderSymbol::from_layout(label.as_ref(), layout))
            .collect())
    }
}

/// Output of full recognition: per-symbol predictions and the rendered markup
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Recognition {
    /// Balanced, `$`-delimited markup string
    pub markup: String,
    /// Labelled symbols as handed to the renderer
    pub symbols: Vec<RenderSymbol>,
    /// Classifier output per symbol, after the radical fallback
    pub predictions: Vec<Prediction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BBox;

    fn symbol(x: i32, level: u32, script_level: i32) -> IsolatedSymbol {
        IsolatedSymbol {
            layout: SymbolLayout {
                bbox: BBox::new(x, 0, x + 10, 10),
                level,
                role: StackRole::None,
                script_level,
                extend_count: 0,
            },
            glyph: GrayImage::new(12, 12),
        }
    }

    #[test]
    fn test_parallel_lists_are_aligned() {
        let seg = SegmentedEquation {
            symbols: vec![symbol(0, 0, 0), symbol(20, 0, 1), symbol(40, 1, 0)],
        };
        assert_eq!(seg.len(), 3);
        assert_eq!(seg.glyphs().len(), 3);
        assert_eq!(seg.levels(), vec![0, 0, 1]);
        assert_eq!(seg.script_levels(), vec![0, 1, 0]);
        assert_eq!(seg.stack_roles(), vec![StackRole::None; 3]);
        assert_eq!(seg.extend_counts(), vec![0, 0, 0]);
    }

    #[test]
    fn test_label_requires_one_label_per_symbol() {
        let seg = SegmentedEquation {
            symbols: vec![symbol(0, 0, 0), symbol(20, 0, 1)],
        };
        let labelled = seg.label(&["x", "2"]).unwrap();
        assert_eq!(labelled[1].label, "2");
        assert_eq!(labelled[1].script_level, 1);
        assert!(matches!(
            seg.label(&["x"]),
            Err(InkmathError::InvalidInput { .. })
        ));
    }
}
