//! # Main Pipeline - End-to-End Equation Recognition
//!
//! This module provides the primary public API via the [`Pipeline`] struct.
//!
//! ## Pipeline Stages
//!
//! ### Stage 0: Preprocessing
//! - **Implementation:** [`crate::preprocessing`]
//! - **Output:** binarized raster and raw region boxes (noise below the area floor dropped)
//!
//! ### Stages 1-5: Layout (delegated to pipeline_modular)
//! - **Implementation:** [`crate::pipeline_modular::ModularPipeline`]
//! - **Output:** [`SegmentedEquation`], isolated glyphs with level, stack role,
//!   script depth and extend count
//!
//! ### Stage 6: Classification
//! - **Implementation:** [`crate::classifier::classify_symbols`], behind the
//!   [`crate::classifier::SymbolClassifier`] seam
//! - **Output:** one label per symbol
//!
//! ### Stage 7: Rendering
//! - **Implementation:** [`crate::render::EquationRenderer`]
//! - **Output:** balanced `$`-delimited markup string ([`Recognition`])
//!
//! ## Module Organization
//!
//! - `executor`: `Pipeline`, `PipelineConfig`, `PipelineConfigBuilder`
//! - `data_structures`: `SegmentedEquation`, `Recognition`

pub(crate) mod data_structures;
pub(crate) mod executor;

pub use data_structures::{Recognition, SegmentedEquation};
pub use executor::{Pipeline, PipelineConfig, PipelineConfigBuilder, LENIENT_MAX_MERGED_HEIGHT};
