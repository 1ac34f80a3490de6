//! # Modular Pipeline - Layout Stages (Stages 1-5)
//!
//! Fine-grained, independently testable stages that turn raw glyph regions into
//! ordered, structurally tagged, normalized symbols. Each stage is a small struct
//! holding a `Copy` config with a `process` method; the stages share the types in
//! [`types`] and are chained by [`ModularPipeline`].
//!
//! ## Pipeline Stages
//!
//! ### Stage 1: Box Merger ([`Stage01BoxMerger`])
//! - **Input:** raw region boxes, image height
//! - **Process:** fuses vertically separated fragments of one symbol ("=", "i", "!")
//! - **Output:** deduplicated boxes
//!
//! ### Stage 2: Level Resolver ([`Stage02LevelResolver`])
//! - **Input:** merged boxes
//! - **Process:** reading order, level numbers and stack roles from geometry alone
//! - **Output:** [`PlacedBox`] list sorted by level, then left to right
//!
//! ### Stage 3: Dot Merger ([`Stage03DotMerger`])
//! - **Input:** placed boxes
//! - **Process:** fuses adjacent same-role pairs stacked tightly on top of each other
//! - **Output:** placed boxes
//!
//! ### Stage 4: Script-Level Scorer ([`Stage04ScriptScorer`])
//! - **Input:** placed boxes
//! - **Process:** running superscript/subscript depth per level
//! - **Output:** [`ScriptedBox`] list
//!
//! ### Stage 5: Symbol Isolator ([`Stage05SymbolIsolator`])
//! - **Input:** binarized raster, scripted boxes
//! - **Process:** crop, outline redraw for enclosing glyphs, extend counts, square padding and blur
//! - **Output:** [`IsolatedSymbol`] list, positionally aligned with the input
//!
//! ## Usage
//!
//! Library consumers normally go through [`crate::pipeline::Pipeline`]. The stages
//! are public for stage-by-stage testing and debugging
//! ([`ModularPipeline::with_debug_output`] dumps every intermediate as JSON).

pub mod orchestrator;
pub mod stage01_box_merger;
pub mod stage02_level_resolver;
pub mod stage03_dot_merger;
pub mod stage04_script_scorer;
pub mod stage05_symbol_isolator;
pub mod types;

pub use orchestrator::ModularPipeline;
pub use stage01_box_merger::{Stage01BoxMerger, Stage01Config};
pub use stage02_level_resolver::{LevelWalk, Stage02Config, Stage02LevelResolver};
pub use stage03_dot_merger::{Stage03Config, Stage03DotMerger};
pub use stage04_script_scorer::{ScriptStep, Stage04Config, Stage04ScriptScorer};
pub use stage05_symbol_isolator::{extend_counts, Stage05Config, Stage05SymbolIsolator};
pub use types::*;
