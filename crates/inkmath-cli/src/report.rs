//! JSON layout report written by `segment` and read by `render`

use anyhow::{bail, Context, Result};
use inkmath::classifier::apply_radical_fallback;
use inkmath::{BBox, Prediction, RenderSymbol, SegmentedEquation, StackRole, SymbolLayout};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutReport {
    /// Source image path, as given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub width: u32,
    pub height: u32,
    pub symbols: Vec<SymbolRecord>,
}

/// One symbol of the report, in final reading order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub bbox: BBox,
    pub level: u32,
    pub stack_role: StackRole,
    pub script_level: i32,
    pub extend_count: usize,
    /// File name of the normalized glyph PNG, relative to the glyph directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glyph: Option<String>,
    /// Classifier label, filled in by an external classification step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Top-k scores accompanying `label`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub confidences: BTreeMap<String, f32>,
}

impl SymbolRecord {
    fn layout(&self) -> SymbolLayout {
        SymbolLayout {
            bbox: self.bbox,
            level: self.level,
            role: self.stack_role,
            script_level: self.script_level,
            extend_count: self.extend_count,
        }
    }
}

impl From<&SymbolLayout> for SymbolRecord {
    fn from(layout: &SymbolLayout) -> Self {
        Self {
            bbox: layout.bbox,
            level: layout.level,
            stack_role: layout.role,
            script_level: layout.script_level,
            extend_count: layout.extend_count,
            glyph: None,
            label: None,
            confidences: BTreeMap::new(),
        }
    }
}

impl LayoutReport {
    #[must_use]
    pub fn from_segmented(
        segmented: &SegmentedEquation,
        source: Option<String>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            source,
            width,
            height,
            symbols: segmented.layouts().map(SymbolRecord::from).collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read layout report: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse layout report: {}", path.display()))
    }

    /// Labelled render input, from `labels` when given, else from the report itself
    ///
    /// Symbols carrying confidences get the radical fallback applied to their label.
    pub fn render_symbols(&self, labels: Option<&[String]>) -> Result<Vec<RenderSymbol>> {
        if let Some(labels) = labels {
            if labels.len() != self.symbols.len() {
                bail!(
                    "{} labels for {} symbols in the layout report",
                    labels.len(),
                    self.symbols.len()
                );
            }
        }

        self.symbols
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let label = match labels {
                    Some(labels) => labels[i].clone(),
                    None => record
                        .label
                        .clone()
                        .with_context(|| format!("Symbol {i} has no label"))?,
                };
                let layout = record.layout();
                let mut prediction = Prediction {
                    label,
                    confidences: record.confidences.clone(),
                };
                apply_radical_fallback(&layout, &mut prediction);
                Ok(RenderSymbol::from_layout(prediction.label, &layout))
            })
            .collect()
    }
}

/// One label per non-empty line, surrounding whitespace trimmed
#[must_use]
pub fn parse_labels(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
