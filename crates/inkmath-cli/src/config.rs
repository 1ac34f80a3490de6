//! `.inkmath.toml` discovery and layering
//!
//! Configuration files can be placed in:
//! - User home directory: `~/.inkmath.toml` (user defaults)
//! - Project directory: `./.inkmath.toml` (project defaults)
//! - Custom location via `--config` (overrides both)
//!
//! Precedence order (highest to lowest):
//! 1. Command-line flags (`--preset`, `--no-ligatures`, ...)
//! 2. Explicit config (`--config <PATH>`)
//! 3. Project config
//! 4. User config
//! 5. Built-in defaults

use anyhow::{Context, Result};
use colored::Colorize;
use inkmath::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".inkmath.toml";

/// Configuration file structure
///
/// The `pipeline` table is kept as raw TOML so that partial files layer key by
/// key; it is only turned into a [`PipelineConfig`] once all layers are merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Per-stage pipeline settings, same layout as `PipelineConfig`
    #[serde(skip_serializing_if = "toml::Table::is_empty")]
    pub pipeline: toml::Table,

    /// Default settings for the segment command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<SegmentSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentSettings {
    /// Pretty-print the JSON layout report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretty: Option<bool>,

    /// Box border thickness of the overlay image, in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_thickness: Option<u32>,
}

impl Config {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load the user, project and explicit configs and merge them
    ///
    /// A broken user or project file is skipped with a warning; a broken explicit
    /// file is an error.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let mut merged = Self::default();
        for path in [user_config_path(), Some(PathBuf::from(CONFIG_FILE_NAME))]
            .into_iter()
            .flatten()
        {
            if let Some(config) = Self::load_optional(&path) {
                merged = merged.merge(config);
            }
        }
        if let Some(path) = explicit {
            merged = merged.merge(Self::load_from_file(path)?);
        }
        Ok(merged)
    }

    fn load_optional(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!(
                    "{} Ignoring config {}: {e:#}",
                    "Warning:".yellow().bold(),
                    path.display()
                );
                None
            }
        }
    }

    /// Layer `overlay` on top of `self`; keys set in `overlay` win
    #[must_use]
    pub fn merge(mut self, overlay: Self) -> Self {
        merge_tables(&mut self.pipeline, overlay.pipeline);
        self.segment = match (self.segment, overlay.segment) {
            (Some(base), Some(top)) => Some(SegmentSettings {
                pretty: top.pretty.or(base.pretty),
                overlay_thickness: top.overlay_thickness.or(base.overlay_thickness),
            }),
            (base, top) => top.or(base),
        };
        self
    }

    /// Pipeline configuration described by the merged `pipeline` table
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        toml::Value::Table(self.pipeline.clone())
            .try_into()
            .context("Invalid [pipeline] configuration")
    }

    #[must_use]
    pub fn segment(&self) -> SegmentSettings {
        self.segment.unwrap_or_default()
    }
}

/// Recursive key-by-key merge; non-table values in `overlay` replace those in `base`
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(top) = value {
            if let Some(toml::Value::Table(inner)) = base.get_mut(&key) {
                merge_tables(inner, top);
                continue;
            }
            base.insert(key, toml::Value::Table(top));
        } else {
            base.insert(key, value);
        }
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

pub const DEFAULT_CONFIG: &str = r#"# inkmath configuration file
#
# Loaded from ~/.inkmath.toml, then ./.inkmath.toml, then --config <PATH>.
# Later files override earlier ones key by key; command-line flags win.

# Default settings for the segment command
[segment]
# Pretty-print the JSON layout report
# pretty = true

# Overlay box border thickness in pixels
# overlay_thickness = 2

# Raster preprocessing
[pipeline.preprocess]
# Fraction of pure black/white pixels above which a plain threshold is used
# clean_ratio = 0.9
# Regions smaller than this fraction of the image area are dropped
# min_area_fraction = 0.00022

# Stage 1: fragment merging
[pipeline.merger]
# Merged height cap, as a fraction of the image height
# max_merged_height = 0.18

# Stage 2: levels and stacks
[pipeline.levels]
# partner_x_overlap = 0.3
# partner_y_overlap = 0.3

# Stage 3: dot merging
[pipeline.dots]
# enabled = true

# Stage 4: sub/superscript scoring
[pipeline.scripts]
# size_weight = 0.8
# overshoot_weight = 3.2
# threshold = 1.0

# Rendering
[pipeline.render]
# ligatures = true
# substitute_comparisons = true
"#;
