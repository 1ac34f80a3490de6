// Pipeline executor - raster in, symbols and markup out

use super::data_structures::{Recognition, SegmentedEquation};
use crate::classifier::{classify_symbols, SymbolClassifier};
use crate::error::{InkmathError, Result};
use crate::geometry::BBox;
use crate::pipeline_modular::{
    ModularPipeline, Stage01Config, Stage02Config, Stage03Config, Stage04Config, Stage05Config,
};
use crate::preprocessing::{binarize, detect_regions, ensure_non_empty, gray_from_array, PreprocessConfig};
use crate::render::{EquationRenderer, RenderOptions, RenderSymbol};
use image::GrayImage;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

/// Merged-height cap used by [`PipelineConfigBuilder::lenient`]
pub const LENIENT_MAX_MERGED_HEIGHT: f64 = 0.35;

/// Configuration for every stage of the pipeline
///
/// Usually produced by [`PipelineConfigBuilder`]; deserializable from the
/// `[pipeline]` table of a config file, with every missing field at its default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Binarization and region detection
    pub preprocess: PreprocessConfig,
    /// Stage 1: fragment merging
    pub merger: Stage01Config,
    /// Stage 2: level resolution
    pub levels: Stage02Config,
    /// Stage 3: dot merging
    pub dots: Stage03Config,
    /// Stage 4: script scoring
    pub scripts: Stage04Config,
    /// Stage 5: symbol isolation
    pub isolator: Stage05Config,
    /// Markup rendering
    pub render: RenderOptions,
    /// Dump every intermediate stage output as JSON into this directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_output_dir: Option<PathBuf>,
}

impl PipelineConfig {
    /// Check every threshold and ratio
    ///
    /// # Errors
    ///
    /// [`InkmathError::ConfigError`] naming the first invalid setting
    pub fn validate(&self) -> Result<()> {
        let fractions = [
            ("preprocess.clean_ratio", self.preprocess.clean_ratio),
            ("preprocess.min_area_fraction", self.preprocess.min_area_fraction),
            ("merger.min_x_overlap", self.merger.min_x_overlap),
            ("merger.max_merged_height", self.merger.max_merged_height),
            ("levels.partner_x_overlap", self.levels.partner_x_overlap),
            ("levels.partner_y_overlap", self.levels.partner_y_overlap),
            ("dots.min_x_overlap", self.dots.min_x_overlap),
            ("dots.max_y_overlap", self.dots.max_y_overlap),
            ("dots.max_merged_height", self.dots.max_merged_height),
        ];
        for (name, value) in fractions {
            if !(value > 0.0 && value <= 1.0) {
                return Err(config_error(format!("{name} must be in (0, 1], got {value}")));
            }
        }

        let ratios = [
            ("merger.max_width_ratio", self.merger.max_width_ratio),
            ("merger.max_height_ratio", self.merger.max_height_ratio),
            ("merger.gap_factor", self.merger.gap_factor),
            ("scripts.size_weight", self.scripts.size_weight),
            ("scripts.overshoot_weight", self.scripts.overshoot_weight),
            ("scripts.threshold", self.scripts.threshold),
        ];
        for (name, value) in ratios {
            if !(value.is_finite() && value > 0.0) {
                return Err(config_error(format!("{name} must be positive, got {value}")));
            }
        }

        if self.levels.gap_scan_step == 0 {
            return Err(config_error("levels.gap_scan_step must be at least 1".to_string()));
        }
        if self.isolator.margin_divisor == 0 {
            return Err(config_error("isolator.margin_divisor must be at least 1".to_string()));
        }
        for (name, size) in [
            ("preprocess.adaptive_block", self.preprocess.adaptive_block),
            ("preprocess.smoothing_kernel", self.preprocess.smoothing_kernel),
        ] {
            if size < 3 || size % 2 == 0 {
                return Err(config_error(format!("{name} must be an odd size of at least 3, got {size}")));
            }
        }
        Ok(())
    }
}

fn config_error(reason: String) -> InkmathError {
    InkmathError::ConfigError { reason }
}

/// Builder for `PipelineConfig`
///
/// # Examples
///
/// ```
/// use inkmath::PipelineConfigBuilder;
///
/// # fn main() -> inkmath::Result<()> {
/// // Defaults
/// let config = PipelineConfigBuilder::new().build()?;
/// assert!(config.dots.enabled);
///
/// // No dot merging, custom noise floor
/// let config = PipelineConfigBuilder::strict()
///     .min_area_fraction(5e-4)
///     .build()?;
/// assert!(!config.dots.enabled);
///
/// // Out-of-range values are rejected
/// assert!(PipelineConfigBuilder::new().max_merged_height(1.5).build().is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Create a new config builder with defaults
    #[inline]
    #[must_use = "returns a new builder with default settings"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    #[inline]
    #[must_use = "returns a builder seeded with the given configuration"]
    pub const fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Preset that keeps every detected region apart after layout resolution
    ///
    /// Disables dot merging; use for clean input where "i" and "j" dots are
    /// already joined by the fragment merger.
    #[must_use = "returns a builder with dot merging disabled"]
    pub fn strict() -> Self {
        Self::new().dot_merging(false)
    }

    /// Preset for tall or loosely written symbols
    ///
    /// Raises the merged-height cap of both mergers to
    /// [`LENIENT_MAX_MERGED_HEIGHT`] of the image height.
    #[must_use = "returns a builder with a raised merged-height cap"]
    pub fn lenient() -> Self {
        Self::new().max_merged_height(LENIENT_MAX_MERGED_HEIGHT)
    }

    #[inline]
    #[must_use = "returns the builder with preprocessing configured"]
    pub fn preprocess(mut self, config: PreprocessConfig) -> Self {
        self.config.preprocess = config;
        self
    }

    #[inline]
    #[must_use = "returns the builder with the fragment merger configured"]
    pub fn merger(mut self, config: Stage01Config) -> Self {
        self.config.merger = config;
        self
    }

    #[inline]
    #[must_use = "returns the builder with the level resolver configured"]
    pub fn levels(mut self, config: Stage02Config) -> Self {
        self.config.levels = config;
        self
    }

    #[inline]
    #[must_use = "returns the builder with the dot merger configured"]
    pub fn dots(mut self, config: Stage03Config) -> Self {
        self.config.dots = config;
        self
    }

    #[inline]
    #[must_use = "returns the builder with the script scorer configured"]
    pub fn scripts(mut self, config: Stage04Config) -> Self {
        self.config.scripts = config;
        self
    }

    #[inline]
    #[must_use = "returns the builder with the symbol isolator configured"]
    pub fn isolator(mut self, config: Stage05Config) -> Self {
        self.config.isolator = config;
        self
    }

    #[inline]
    #[must_use = "returns the builder with rendering configured"]
    pub fn render(mut self, options: RenderOptions) -> Self {
        self.config.render = options;
        self
    }

    /// Regions not larger than this fraction of the image area are noise
    #[inline]
    #[must_use = "returns the builder with the noise floor configured"]
    pub fn min_area_fraction(mut self, fraction: f64) -> Self {
        self.config.preprocess.min_area_fraction = fraction;
        self
    }

    /// Merged-height cap of both the fragment merger and the dot merger
    #[inline]
    #[must_use = "returns the builder with the merged-height cap configured"]
    pub fn max_merged_height(mut self, fraction: f64) -> Self {
        self.config.merger.max_merged_height = fraction;
        self.config.dots.max_merged_height = fraction;
        self
    }

    #[inline]
    #[must_use = "returns the builder with dot merging configured"]
    pub fn dot_merging(mut self, enabled: bool) -> Self {
        self.config.dots.enabled = enabled;
        self
    }

    /// Score above which a neighbour counts as a sub/superscript
    #[inline]
    #[must_use = "returns the builder with the script threshold configured"]
    pub fn script_threshold(mut self, threshold: f64) -> Self {
        self.config.scripts.threshold = threshold;
        self
    }

    #[inline]
    #[must_use = "returns the builder with ligature combining configured"]
    pub fn ligatures(mut self, enabled: bool) -> Self {
        self.config.render.ligatures = enabled;
        self
    }

    #[inline]
    #[must_use = "returns the builder with debug output configured"]
    pub fn debug_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.debug_output_dir = Some(dir);
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `InkmathError::ConfigError` if configuration is invalid.
    #[must_use = "this returns a Result that should be handled"]
    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// End-to-end recognition pipeline
///
/// Stateless between calls and `Sync`: one instance can serve many images,
/// from many threads.
///
/// # Examples
///
/// ```no_run
/// use inkmath::Pipeline;
///
/// # fn main() -> inkmath::Result<()> {
/// let image = image::open("equation.png")?.to_luma8();
/// let pipeline = Pipeline::with_defaults();
/// let segmented = pipeline.segment(&image)?;
/// println!("{} symbols on {:?} levels", segmented.len(), segmented.levels());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    stages: ModularPipeline,
    renderer: EquationRenderer,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Pipeline {
    /// Create a pipeline from a configuration
    ///
    /// # Errors
    ///
    /// Returns `InkmathError::ConfigError` if configuration is invalid
    #[must_use = "pipeline creation returns a Result that should be handled"]
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    /// Create a pipeline with default configuration
    #[must_use = "pipeline is created but not used"]
    pub fn with_defaults() -> Self {
        Self::from_valid(PipelineConfig::default())
    }

    fn from_valid(config: PipelineConfig) -> Self {
        Self {
            stages: ModularPipeline::from_config(&config),
            renderer: EquationRenderer::with_options(config.render),
            config,
        }
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Binarize a grayscale raster and detect raw glyph regions
    ///
    /// # Errors
    ///
    /// [`InkmathError::InvalidInput`] for a zero-sized raster
    pub fn detect(&self, image: &GrayImage) -> Result<(GrayImage, Vec<BBox>)> {
        ensure_non_empty(image)?;
        let binary = binarize(image, &self.config.preprocess);
        let regions = detect_regions(&binary, self.config.preprocess.min_area_fraction);
        Ok((binary, regions))
    }

    /// Segment a grayscale raster into isolated, normalized, tagged symbols
    ///
    /// # Errors
    ///
    /// [`InkmathError::InvalidInput`] for a zero-sized raster
    pub fn segment(&self, image: &GrayImage) -> Result<SegmentedEquation> {
        let start = Instant::now();
        let (binary, regions) = self.detect(image)?;
        let symbols = self.stages.process(&binary, regions)?;

        log::info!(
            "Segmented {}x{} raster into {} symbols in {:.1}ms",
            image.width(),
            image.height(),
            symbols.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(SegmentedEquation { symbols })
    }

    /// Segment a (rows x columns) intensity array
    ///
    /// # Errors
    ///
    /// [`InkmathError::InvalidInput`] for a zero-sized array
    pub fn segment_array(&self, array: ArrayView2<'_, u8>) -> Result<SegmentedEquation> {
        self.segment(&gray_from_array(array)?)
    }

    /// Segment, classify every symbol and render the markup string
    ///
    /// # Errors
    ///
    /// Invalid input, or any classifier failure (fatal, not retried)
    pub fn recognize(&self, image: &GrayImage, classifier: &dyn SymbolClassifier) -> Result<Recognition> {
        let segmented = self.segment(image)?;
        let predictions = classify_symbols(&segmented.symbols, classifier)?;
        let labels: Vec<&str> = predictions.iter().map(|p| p.label.as_str()).collect();
        let symbols = segmented.label(&labels)?;
        let markup = self.render(&symbols);

        log::info!("Recognized {} symbols: {markup}", symbols.len());
        Ok(Recognition {
            markup,
            symbols,
            predictions,
        })
    }

    /// [`Pipeline::recognize`] on a (rows x columns) intensity array
    ///
    /// # Errors
    ///
    /// Invalid input, or any classifier failure
    pub fn recognize_array(
        &self,
        array: ArrayView2<'_, u8>,
        classifier: &dyn SymbolClassifier,
    ) -> Result<Recognition> {
        self.recognize(&gray_from_array(array)?, classifier)
    }

    /// Render already classified symbols
    #[must_use]
    pub fn render(&self, symbols: &[RenderSymbol]) -> String {
        self.renderer.render(symbols)
    }
}
