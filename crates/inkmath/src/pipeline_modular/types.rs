/// Shared types for the layout stages
///
/// Everything except the glyph bitmap is serde-serializable so that intermediate
/// stage outputs can be dumped as JSON and fed back into the renderer.
use crate::geometry::BBox;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Position of a box inside a vertical stack (fraction, bounded sum, limit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackRole {
    /// Plain left-to-right content, not part of a stack
    #[default]
    None,
    /// Upper level of a stack (numerator, upper bound, limit operator)
    Top,
    /// The single connective between top and bottom (fraction bar, `\sum`)
    Middle,
    /// Lower level of a stack (denominator, lower bound)
    Bottom,
}

impl StackRole {
    /// Level offset of this role relative to the stack's first level
    #[inline]
    #[must_use]
    pub const fn level_offset(self) -> u32 {
        match self {
            Self::None | Self::Top => 0,
            Self::Middle => 1,
            Self::Bottom => 2,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_stacked(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// A box with its reading level and stack role (Stage 2 output)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacedBox {
    pub bbox: BBox,
    pub level: u32,
    pub role: StackRole,
}

impl PlacedBox {
    #[inline]
    #[must_use = "returns a new PlacedBox instance"]
    pub const fn new(bbox: BBox, level: u32, role: StackRole) -> Self {
        Self { bbox, level, role }
    }
}

/// A placed box with its accumulated sub/superscript depth (Stage 4 output)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptedBox {
    pub bbox: BBox,
    pub level: u32,
    pub role: StackRole,
    /// 0 = baseline, positive = superscript depth, negative = subscript depth
    pub script_level: i32,
}

/// Structural metadata of one resolved symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolLayout {
    pub bbox: BBox,
    pub level: u32,
    pub role: StackRole,
    pub script_level: i32,
    /// Number of following same-level symbols this symbol visually spans
    pub extend_count: usize,
}

/// One isolated symbol: its normalized glyph plus layout metadata (Stage 5 output)
#[derive(Debug, Clone, PartialEq)]
pub struct IsolatedSymbol {
    pub layout: SymbolLayout,
    /// Square, padded, smoothed glyph; black ink on white
    pub glyph: GrayImage,
}
