//! # inkmath - Handwritten Equation Layout and Markup Rendering
//!
//! Turns a raster image of a handwritten mathematical expression into
//! (a) an ordered list of isolated, normalized glyphs tagged with their reading
//! level, stack role, script depth and extend count, and (b) a balanced
//! math-mode markup string once every glyph has been classified.
//!
//! Layout is inferred from geometry alone: fragment merging, reading order,
//! stacks (fractions, bounded sums, limits) and sub/superscripts. Classification
//! is delegated to an external model behind the [`SymbolClassifier`] trait.
//!
//! ## Quick Start
//!
//! ```no_run
//! use inkmath::{Pipeline, Result};
//!
//! # fn main() -> Result<()> {
//! let image = image::open("equation.png")?.to_luma8();
//! let pipeline = Pipeline::with_defaults();
//!
//! let segmented = pipeline.segment(&image)?;
//! for (glyph, layout) in segmented.glyphs().iter().zip(segmented.layouts()) {
//!     println!(
//!         "{}x{} glyph at level {} ({:?}, script {})",
//!         glyph.width(),
//!         glyph.height(),
//!         layout.level,
//!         layout.role,
//!         layout.script_level
//!     );
//! }
//!
//! // Once labels are known (normally from `Pipeline::recognize`)
//! # let labels = vec!["x"; segmented.len()];
//! let symbols = segmented.label(&labels)?;
//! println!("{}", pipeline.render(&symbols));
//! # Ok(())
//! # }
//! ```
//!
//! ## Rendering Only
//!
//! ```
//! use inkmath::render::{EquationRenderer, RenderSymbol};
//! use inkmath::StackRole;
//!
//! let symbols = vec![
//!     RenderSymbol::new("1", 0, StackRole::Top, 0, 0),
//!     RenderSymbol::new("-", 1, StackRole::Middle, 0, 0),
//!     RenderSymbol::new("x", 2, StackRole::Bottom, 0, 0),
//! ];
//! assert_eq!(EquationRenderer::new().render(&symbols), "$\\frac{ 1}{ x}$");
//! ```
//!
//! ## Configuration
//!
//! Use [`PipelineConfigBuilder`] for custom configuration:
//!
//! - **`new()`**: defaults for every stage
//! - **`strict()`**: no dot merging after layout resolution
//! - **`lenient()`**: raised merged-height cap for tall or loosely written symbols
//!
//! ## Thread Safety
//!
//! [`Pipeline`] holds configuration only and is `Send + Sync`; share one instance
//! across threads. Classifiers must be `Send + Sync` and are called in parallel,
//! one call per glyph.

// Error types (public API)
pub mod error;

pub mod classifier;
pub mod geometry;
pub mod pipeline;
pub mod pipeline_modular; // Layout stages 1-5 (public for stage-by-stage testing)
pub mod preprocessing;
pub mod render;
pub mod visualization;

// ============================================================================
// Public API Exports
// ============================================================================

pub use error::{InkmathError, Result};

pub use pipeline::{
    Pipeline, PipelineConfig, PipelineConfigBuilder, Recognition, SegmentedEquation,
};

pub use classifier::{
    GlyphScorer, LabelVocabulary, Prediction, SymbolClassifier, VocabularyClassifier,
};
pub use geometry::{Axis, BBox, Direction, OverlapBasis};
pub use pipeline_modular::types::{IsolatedSymbol, StackRole, SymbolLayout};
pub use render::{EquationRenderer, RenderOptions, RenderSymbol};
