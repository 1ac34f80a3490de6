//! Error types for the inkmath recognition pipeline
//!
//! Geometry ambiguities and unbalanced markup never surface here: every layout
//! heuristic has a deterministic default and the renderer repairs nesting on its
//! own. What remains are failures of the collaborators around the core (image
//! decoding, the symbol classifier, the label vocabulary) and invalid caller input.
//!
//! # Examples
//!
//! ```no_run
//! use inkmath::{InkmathError, Pipeline};
//!
//! # fn example(image: &image::GrayImage) -> inkmath::Result<()> {
//! let pipeline = Pipeline::with_defaults();
//! match pipeline.segment(image) {
//!     Ok(segmented) => log::debug!("{} symbols", segmented.len()),
//!     Err(InkmathError::InvalidInput { reason }) => log::warn!("bad raster: {reason}"),
//!     Err(e) => log::warn!("other error: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

/// Errors that can occur while segmenting, classifying or rendering an equation
///
/// # Error Categories
///
/// - **Configuration** ([`ConfigError`]): a threshold or ratio outside its valid range
/// - **Classification** ([`ClassifierError`], [`EmptyVocabulary`], [`VocabularyMismatch`]):
///   fatal to the whole recognition call, never retried
/// - **Input** ([`InvalidInput`], [`ImageError`], [`Io`]): unusable raster or files
///
/// [`ConfigError`]: InkmathError::ConfigError
/// [`ClassifierError`]: InkmathError::ClassifierError
/// [`EmptyVocabulary`]: InkmathError::EmptyVocabulary
/// [`VocabularyMismatch`]: InkmathError::VocabularyMismatch
/// [`InvalidInput`]: InkmathError::InvalidInput
/// [`ImageError`]: InkmathError::ImageError
/// [`Io`]: InkmathError::Io
#[derive(Error, Debug)]
pub enum InkmathError {
    /// Image decoding or encoding failed
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    /// IO error (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {reason}")]
    ConfigError {
        /// Which knob is out of range and why
        reason: String,
    },

    /// The label vocabulary contained no usable entries
    #[error("Label vocabulary is empty")]
    EmptyVocabulary,

    /// A glyph scorer returned a score vector that does not line up with the vocabulary
    #[error("Score vector has {actual} entries but the vocabulary has {expected}")]
    VocabularyMismatch {
        /// Vocabulary length
        expected: usize,
        /// Length of the score vector actually produced
        actual: usize,
    },

    /// The symbol classifier failed on a glyph
    #[error("Symbol classification failed: {reason}")]
    ClassifierError {
        /// Collaborator-provided description
        reason: String,
    },

    /// Caller input cannot be processed (zero-sized raster, misaligned lists)
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Description of the problem
        reason: String,
    },
}

impl InkmathError {
    /// Returns true if this error is a configuration error (user-fixable)
    ///
    /// ```
    /// use inkmath::InkmathError;
    ///
    /// let err = InkmathError::ConfigError { reason: "x overlap must be in (0, 1]".to_string() };
    /// assert!(err.is_config_error());
    /// ```
    #[inline]
    #[must_use = "this method returns a boolean, not modifying the error"]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigError { .. })
    }

    /// Returns true if this error came from classification or the label vocabulary
    #[inline]
    #[must_use = "this method returns a boolean, not modifying the error"]
    pub const fn is_classifier_error(&self) -> bool {
        matches!(
            self,
            Self::ClassifierError { .. } | Self::EmptyVocabulary | Self::VocabularyMismatch { .. }
        )
    }

    /// Returns true if this is an I/O or image codec error
    #[inline]
    #[must_use = "this method returns a boolean, not modifying the error"]
    pub const fn is_io_error(&self) -> bool {
        matches!(self, Self::Io(_) | Self::ImageError(_))
    }
}

/// Type alias for Result with [`InkmathError`]
pub type Result<T> = std::result::Result<T, InkmathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let config = InkmathError::ConfigError {
            reason: "bad".to_string(),
        };
        assert!(config.is_config_error());
        assert!(!config.is_classifier_error());

        assert!(InkmathError::EmptyVocabulary.is_classifier_error());
        assert!(InkmathError::VocabularyMismatch {
            expected: 3,
            actual: 2
        }
        .is_classifier_error());

        let io: InkmathError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(io.is_io_error());
    }

    #[test]
    fn test_error_display() {
        let err = InkmathError::VocabularyMismatch {
            expected: 82,
            actual: 80,
        };
        assert_eq!(
            err.to_string(),
            "Score vector has 80 entries but the vocabulary has 82"
        );

        let err = InkmathError::InvalidInput {
            reason: "raster has zero width".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid input: raster has zero width");
    }
}
