//! Symbol classification seam
//!
//! The trained glyph model lives outside this crate. The pipeline only needs
//! something implementing [`SymbolClassifier`]; [`VocabularyClassifier`] adapts a raw
//! score producer ([`GlyphScorer`]) plus a [`LabelVocabulary`] into one.
//!
//! Classification is the only stage allowed to fail: any classifier error, or a
//! vocabulary that does not line up with the model output, aborts the whole call.

use crate::error::{InkmathError, Result};
use crate::pipeline_modular::types::{IsolatedSymbol, SymbolLayout};
use image::GrayImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Label of the radical sign
pub const SQRT_LABEL: &str = "\\sqrt";

/// Classifier output for one glyph
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Prediction {
    /// Most likely label
    pub label: String,
    /// Top-k labels with their scores
    #[serde(default)]
    pub confidences: BTreeMap<String, f32>,
}

impl Prediction {
    /// Prediction with only a label and no confidence map
    #[inline]
    #[must_use]
    pub fn from_label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            confidences: BTreeMap::new(),
        }
    }
}

/// Maps a normalized glyph to a label
///
/// Implementations are shared read-only across threads.
pub trait SymbolClassifier: Send + Sync {
    /// Classify one normalized glyph (black ink on white, square)
    ///
    /// # Errors
    ///
    /// Any failure of the underlying model
    fn classify(&self, glyph: &GrayImage) -> Result<Prediction>;
}

/// Produces one raw score per vocabulary entry for a glyph
pub trait GlyphScorer: Send + Sync {
    /// # Errors
    ///
    /// Any failure of the underlying model
    fn scores(&self, glyph: &GrayImage) -> Result<Vec<f32>>;
}

/// Index-to-token table of the classifier's output layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVocabulary {
    labels: Vec<String>,
}

impl LabelVocabulary {
    /// Width of the fixed prefix carried by every token in label files
    pub const DEFAULT_PREFIX_WIDTH: usize = 6;

    /// Parse a newline-delimited label file with the default prefix width
    ///
    /// # Errors
    ///
    /// [`InkmathError::EmptyVocabulary`] if no line yields a token
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with_prefix(text, Self::DEFAULT_PREFIX_WIDTH)
    }

    /// Parse a label file: the last whitespace-separated field of each line is the
    /// token, minus its first `prefix_width` characters
    ///
    /// # Errors
    ///
    /// [`InkmathError::EmptyVocabulary`] if no line yields a token
    pub fn parse_with_prefix(text: &str, prefix_width: usize) -> Result<Self> {
        let labels = text
            .lines()
            .filter_map(|line| line.split_whitespace().last())
            .map(|token| token.chars().skip(prefix_width).collect::<String>())
            .filter(|label| !label.is_empty())
            .collect();
        Self::from_labels(labels)
    }

    /// Read and parse a label file
    ///
    /// # Errors
    ///
    /// I/O failures and [`InkmathError::EmptyVocabulary`]
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// # Errors
    ///
    /// [`InkmathError::EmptyVocabulary`] for an empty list
    pub fn from_labels(labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(InkmathError::EmptyVocabulary);
        }
        Ok(Self { labels })
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// [`SymbolClassifier`] built from a score producer and its vocabulary
#[derive(Debug, Clone)]
pub struct VocabularyClassifier<S> {
    scorer: S,
    vocabulary: LabelVocabulary,
    top_k: usize,
}

impl<S: GlyphScorer> VocabularyClassifier<S> {
    /// Top-k size used for confidence maps
    pub const DEFAULT_TOP_K: usize = 4;

    #[must_use]
    pub fn new(scorer: S, vocabulary: LabelVocabulary) -> Self {
        Self {
            scorer,
            vocabulary,
            top_k: Self::DEFAULT_TOP_K,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    #[must_use]
    pub fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }
}

impl<S: GlyphScorer> SymbolClassifier for VocabularyClassifier<S> {
    fn classify(&self, glyph: &GrayImage) -> Result<Prediction> {
        let scores = self.scorer.scores(glyph)?;
        if scores.len() != self.vocabulary.len() {
            return Err(InkmathError::VocabularyMismatch {
                expected: self.vocabulary.len(),
                actual: scores.len(),
            });
        }

        let mut ranked: Vec<usize> = (0..scores.len()).collect();
        ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
        ranked.truncate(self.top_k);

        let label = ranked
            .first()
            .and_then(|&i| self.vocabulary.get(i))
            .ok_or(InkmathError::EmptyVocabulary)?
            .to_string();
        let confidences = ranked
            .iter()
            .filter_map(|&i| self.vocabulary.get(i).map(|l| (l.to_string(), scores[i])))
            .collect();

        Ok(Prediction { label, confidences })
    }
}

/// Relabel a wide glyph as a radical when the model only ranked `\sqrt` as a runner-up
///
/// Applies when the symbol spans more than one following symbol. Returns true when
/// the label was changed.
pub fn apply_radical_fallback(layout: &SymbolLayout, prediction: &mut Prediction) -> bool {
    if layout.extend_count > 1
        && prediction.label != SQRT_LABEL
        && prediction.confidences.contains_key(SQRT_LABEL)
    {
        log::warn!(
            "Relabelling '{}' as {SQRT_LABEL}: spans {} symbols",
            prediction.label,
            layout.extend_count
        );
        prediction.label = SQRT_LABEL.to_string();
        return true;
    }
    false
}

/// Classify every isolated symbol, in order, then apply the radical fallback
///
/// Glyphs are classified in parallel; the first error aborts the call.
///
/// # Errors
///
/// Any classifier error
pub fn classify_symbols(
    symbols: &[IsolatedSymbol],
    classifier: &dyn SymbolClassifier,
) -> Result<Vec<Prediction>> {
    let mut predictions = symbols
        .par_iter()
        .map(|s| classifier.classify(&s.glyph))
        .collect::<Result<Vec<_>>>()?;

    for (symbol, prediction) in symbols.iter().zip(predictions.iter_mut()) {
        apply_radical_fallback(&symbol.layout, prediction);
    }
    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BBox;
    use crate::pipeline_modular::types::StackRole;

    struct FixedScores(Vec<f32>);

    impl GlyphScorer for FixedScores {
        fn scores(&self, _glyph: &GrayImage) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    fn layout(extend_count: usize) -> SymbolLayout {
        SymbolLayout {
            bbox: BBox::new(0, 0, 10, 10),
            level: 0,
            role: StackRole::None,
            script_level: 0,
            extend_count,
        }
    }

    #[test]
    fn test_vocabulary_strips_prefix_of_last_field() {
        let text = "0 label_1\n1 label_\\sqrt\n\n2  label_capital_A  \n";
        let vocab = LabelVocabulary::parse(text).unwrap();
        assert_eq!(vocab.labels(), &["1", "\\sqrt", "capital_A"]);
    }

    #[test]
    fn test_empty_vocabulary_is_error() {
        assert!(matches!(
            LabelVocabulary::parse("\n  \n"),
            Err(InkmathError::EmptyVocabulary)
        ));
        assert!(LabelVocabulary::from_labels(Vec::new()).is_err());
    }

    #[test]
    fn test_vocabulary_classifier_top_k() {
        let vocab = LabelVocabulary::from_labels(
            ["1", "7", "\\sqrt", "x", "+"].iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();
        let classifier = VocabularyClassifier::new(FixedScores(vec![0.1, 0.6, 0.2, 0.05, 0.05]), vocab);
        let pred = classifier.classify(&GrayImage::new(4, 4)).unwrap();
        assert_eq!(pred.label, "7");
        assert_eq!(pred.confidences.len(), 4);
        assert!(pred.confidences.contains_key("\\sqrt"));
    }

    #[test]
    fn test_vocabulary_mismatch() {
        let vocab = LabelVocabulary::from_labels(vec!["a".to_string(), "b".to_string()]).unwrap();
        let classifier = VocabularyClassifier::new(FixedScores(vec![1.0]), vocab);
        let err = classifier.classify(&GrayImage::new(2, 2)).unwrap_err();
        assert!(matches!(
            err,
            InkmathError::VocabularyMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_radical_fallback() {
        let mut pred = Prediction {
            label: "7".to_string(),
            confidences: [("7".to_string(), 0.6), (SQRT_LABEL.to_string(), 0.3)]
                .into_iter()
                .collect(),
        };
        assert!(!apply_radical_fallback(&layout(1), &mut pred));
        assert_eq!(pred.label, "7");
        assert!(apply_radical_fallback(&layout(2), &mut pred));
        assert_eq!(pred.label, SQRT_LABEL);

        let mut plain = Prediction::from_label("7");
        assert!(!apply_radical_fallback(&layout(3), &mut plain));
    }
}
