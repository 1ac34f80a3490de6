//! Markup rendering
//!
//! Turns a classified symbol stream plus its layout metadata into a balanced
//! math-mode markup string:
//!
//! 1. [`group_levels`] splits the stream into [`LevelRow`]s, one per reading level
//! 2. [`LigatureCombiner`] collapses multi-glyph function names and letter confusions per row
//! 3. [`EquationRenderer`] walks the rows and emits script, stack and radical groups
//!
//! ```rust
//! use inkmath::render::{EquationRenderer, RenderSymbol};
//!
//! let symbols = vec![
//!     RenderSymbol::baseline("1", 0),
//!     RenderSymbol::baseline("+", 0),
//!     RenderSymbol::baseline("5", 0),
//! ];
//! assert_eq!(EquationRenderer::new().render(&symbols), "$1 + 5$");
//! ```

pub mod equation;
pub mod levels;
pub mod ligature;

pub use equation::{balance_groups, EquationRenderer, RenderOptions};
pub use levels::{group_levels, LevelRow};
pub use ligature::{LigatureCombiner, LigatureRule, FUNCTION_LIGATURES};

use crate::pipeline_modular::types::{StackRole, SymbolLayout};
use serde::{Deserialize, Serialize};

/// One classified symbol with the layout metadata the renderer needs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderSymbol {
    /// Markup token from the label vocabulary
    pub label: String,
    pub level: u32,
    #[serde(default)]
    pub role: StackRole,
    #[serde(default)]
    pub script_level: i32,
    #[serde(default)]
    pub extend_count: usize,
}

impl RenderSymbol {
    #[inline]
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        level: u32,
        role: StackRole,
        script_level: i32,
        extend_count: usize,
    ) -> Self {
        Self {
            label: label.into(),
            level,
            role,
            script_level,
            extend_count,
        }
    }

    /// Unstacked baseline symbol
    #[inline]
    #[must_use]
    pub fn baseline(label: impl Into<String>, level: u32) -> Self {
        Self::new(label, level, StackRole::None, 0, 0)
    }

    /// Attach a label to the layout of an isolated symbol
    #[inline]
    #[must_use]
    pub fn from_layout(label: impl Into<String>, layout: &SymbolLayout) -> Self {
        Self::new(
            label,
            layout.level,
            layout.role,
            layout.script_level,
            layout.extend_count,
        )
    }
}
