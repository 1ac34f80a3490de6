//! Raster preprocessing: binarization and raw region detection
//!
//! These steps sit in front of the layout stages: a decoded grayscale raster is
//! binarized to black ink on white, then every outer ink border becomes a raw
//! region box for [`crate::pipeline_modular::Stage01BoxMerger`].

pub mod binarize;
pub mod regions;

pub use binarize::{binarize, threshold_binary};
pub use regions::detect_regions;

use crate::error::{InkmathError, Result};
use image::GrayImage;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Configuration for binarization and region detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Above this fraction of exactly black/white pixels the plain threshold is used
    pub clean_ratio: f64,
    /// Plain binary threshold
    pub plain_threshold: u8,
    /// Adaptive threshold neighbourhood size (odd, pixels)
    pub adaptive_block: u32,
    /// Constant subtracted from the adaptive neighbourhood mean
    pub adaptive_offset: u8,
    /// Smoothing kernel size applied after the adaptive threshold (odd, pixels)
    pub smoothing_kernel: u32,
    /// Cut applied to the smoothed raster
    pub smoothing_cut: u8,
    /// Regions not larger than this fraction of the image area are discarded
    pub min_area_fraction: f64,
}

impl Default for PreprocessConfig {
    #[inline]
    fn default() -> Self {
        Self {
            clean_ratio: 0.9,
            plain_threshold: 230,
            adaptive_block: 11,
            adaptive_offset: 2,
            smoothing_kernel: 13,
            smoothing_cut: 140,
            min_area_fraction: 2.2e-4,
        }
    }
}

/// Convert a (rows x columns) intensity array into a [`GrayImage`]
///
/// # Errors
///
/// [`InkmathError::InvalidInput`] when the array has a zero dimension or does not fit
/// in `u32` image dimensions
pub fn gray_from_array(array: ArrayView2<'_, u8>) -> Result<GrayImage> {
    let (rows, cols) = array.dim();
    let invalid = || InkmathError::InvalidInput {
        reason: format!("raster of {rows}x{cols} pixels cannot be processed"),
    };
    if rows == 0 || cols == 0 {
        return Err(invalid());
    }
    let height = u32::try_from(rows).map_err(|_| invalid())?;
    let width = u32::try_from(cols).map_err(|_| invalid())?;
    GrayImage::from_raw(width, height, array.iter().copied().collect()).ok_or_else(invalid)
}

/// Reject rasters with a zero dimension
///
/// # Errors
///
/// [`InkmathError::InvalidInput`] when width or height is zero
pub fn ensure_non_empty(image: &GrayImage) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(InkmathError::InvalidInput {
            reason: format!(
                "raster of {}x{} pixels cannot be processed",
                image.width(),
                image.height()
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_gray_from_array_row_major() {
        let array = Array2::from_shape_vec((2, 3), vec![1, 2, 3, 4, 5, 6]).unwrap();
        let img = gray_from_array(array.view()).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 0).0[0], 3);
        assert_eq!(img.get_pixel(0, 1).0[0], 4);
    }

    #[test]
    fn test_gray_from_transposed_view() {
        let array = Array2::from_shape_vec((2, 3), vec![1, 2, 3, 4, 5, 6]).unwrap();
        let img = gray_from_array(array.t()).unwrap();
        assert_eq!(img.dimensions(), (2, 3));
        assert_eq!(img.get_pixel(1, 0).0[0], 4);
    }

    #[test]
    fn test_zero_sized_input_rejected() {
        let array = Array2::<u8>::zeros((0, 5));
        assert!(matches!(
            gray_from_array(array.view()),
            Err(InkmathError::InvalidInput { .. })
        ));
        assert!(ensure_non_empty(&GrayImage::new(0, 4)).is_err());
        assert!(ensure_non_empty(&GrayImage::new(1, 1)).is_ok());
    }
}
