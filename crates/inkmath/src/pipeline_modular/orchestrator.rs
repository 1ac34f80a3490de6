/// Modular Pipeline Orchestrator
///
/// Chains the layout stages in their fixed order: each stage's output is the
/// mandatory input of the next.
///
///   regions -> Stage 1 (merge) -> Stage 2 (levels) -> Stage 3 (dots)
///           -> Stage 4 (script depth) -> Stage 5 (isolation)
use crate::error::Result;
use crate::geometry::BBox;
use crate::pipeline::PipelineConfig;
use crate::pipeline_modular::{
    types::{IsolatedSymbol, ScriptedBox},
    Stage01BoxMerger, Stage02LevelResolver, Stage03DotMerger, Stage04ScriptScorer,
    Stage05SymbolIsolator,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Modular pipeline orchestrator that coordinates stages 01-05
#[derive(Debug, Clone, Default)]
pub struct ModularPipeline {
    stage01: Stage01BoxMerger,
    stage02: Stage02LevelResolver,
    stage03: Stage03DotMerger,
    stage04: Stage04ScriptScorer,
    stage05: Stage05SymbolIsolator,
    /// Debug output directory for saving intermediate stage outputs
    debug_output_dir: Option<PathBuf>,
}

impl ModularPipeline {
    /// Create a new pipeline with default configurations
    #[inline]
    #[must_use = "pipeline is created but not used"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline from the per-stage settings of a [`PipelineConfig`]
    #[inline]
    #[must_use = "pipeline is created but not used"]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            stage01: Stage01BoxMerger::with_config(config.merger),
            stage02: Stage02LevelResolver::with_config(config.levels),
            stage03: Stage03DotMerger::with_config(config.dots),
            stage04: Stage04ScriptScorer::with_config(config.scripts),
            stage05: Stage05SymbolIsolator::with_config(config.isolator),
            debug_output_dir: config.debug_output_dir.clone(),
        }
    }

    /// Enable JSON dumps of every intermediate stage output
    #[inline]
    #[must_use = "pipeline is created but not used"]
    pub fn with_debug_output(mut self, debug_dir: PathBuf) -> Self {
        self.debug_output_dir = Some(debug_dir);
        self
    }

    /// Run stages 1-4: merge fragments, resolve levels, merge dots, score scripts
    ///
    /// Returns boxes in final reading order with level, stack role and script depth.
    #[must_use = "layout is returned but not used"]
    pub fn layout(&self, regions: Vec<BBox>, image_height: u32) -> Vec<ScriptedBox> {
        let merged = self.stage01.process(regions, image_height);
        self.save_debug("stage01_merged", &merged);

        let placed = self.stage02.process(merged);
        self.save_debug("stage02_levels", &placed);

        let placed = self.stage03.process(placed, image_height);
        self.save_debug("stage03_dots", &placed);

        let scripted = self.stage04.process(placed);
        self.save_debug("stage04_scripts", &scripted);
        scripted
    }

    /// Run all stages on detected regions of a binarized raster
    ///
    /// # Errors
    ///
    /// Propagates Stage 5 failures (a box outside the raster)
    pub fn process(&self, binary: &image::GrayImage, regions: Vec<BBox>) -> Result<Vec<IsolatedSymbol>> {
        let region_count = regions.len();
        let scripted = self.layout(regions, binary.height());
        let symbols = self.stage05.process(binary, &scripted)?;

        if let Some(dir) = &self.debug_output_dir {
            let layouts: Vec<_> = symbols.iter().map(|s| &s.layout).collect();
            write_json(dir, "stage05_symbols", &layouts);
        }

        log::debug!(
            "Modular pipeline: {region_count} regions -> {} symbols",
            symbols.len()
        );
        Ok(symbols)
    }

    fn save_debug<T: Serialize>(&self, name: &str, value: &T) {
        if let Some(dir) = &self.debug_output_dir {
            write_json(dir, name, value);
        }
    }
}

/// Debug dumps are best effort; failures are logged and otherwise ignored
fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) {
    let path = dir.join(format!("{name}.json"));
    let result = std::fs::create_dir_all(dir)
        .map_err(|e| e.to_string())
        .and_then(|()| serde_json::to_string_pretty(value).map_err(|e| e.to_string()))
        .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
    if let Err(e) = result {
        log::warn!("Failed to write debug output {}: {e}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline_modular::types::StackRole;

    #[test]
    fn test_layout_equals_sign_then_digit() {
        let pipeline = ModularPipeline::new();
        let regions = vec![
            BBox::new(60, 80, 90, 130),
            BBox::new(10, 95, 50, 101),
            BBox::new(10, 110, 50, 116),
        ];
        let out = pipeline.layout(regions, 300);
        let boxes: Vec<BBox> = out.iter().map(|s| s.bbox).collect();
        assert_eq!(boxes, vec![BBox::new(10, 95, 50, 116), BBox::new(60, 80, 90, 130)]);
        assert!(out
            .iter()
            .all(|s| s.level == 0 && s.role == StackRole::None && s.script_level == 0));
    }

    #[test]
    fn test_debug_output_written() {
        let dir = std::env::temp_dir().join(format!("inkmath-debug-{}", std::process::id()));
        let pipeline = ModularPipeline::new().with_debug_output(dir.clone());
        let _ = pipeline.layout(vec![BBox::new(0, 0, 10, 10)], 100);
        assert!(dir.join("stage01_merged.json").exists());
        assert!(dir.join("stage04_scripts.json").exists());
        let _ = std::fs::remove_dir_all(dir);
    }
}
