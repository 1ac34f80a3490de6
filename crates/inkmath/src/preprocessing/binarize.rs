//! Raster binarization
//!
//! Produces a clean black-ink-on-white raster from a grayscale photo or scan:
//! - Already (almost) black and white input gets a plain binary threshold
//! - Anything else gets a Gaussian adaptive threshold, then a Gaussian smoothing
//!   and a hard cut that removes speckle and thin shadow lines

// Pixel math on u8 rasters
#![allow(clippy::cast_precision_loss)]

use super::PreprocessConfig;
use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;

/// Apply binary threshold to grayscale image
///
/// All pixels > threshold become 255, others become 0
#[inline]
#[must_use = "returns a new GrayImage; the input is not modified"]
pub fn threshold_binary(image: &GrayImage, thresh: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([if image.get_pixel(x, y).0[0] > thresh { 255 } else { 0 }])
    })
}

/// Gaussian sigma that `OpenCV` derives for a kernel size when sigma is left at 0
#[inline]
#[must_use]
pub fn kernel_sigma(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Fraction of pixels that are exactly black or exactly white
#[must_use]
pub fn clean_fraction(image: &GrayImage) -> f64 {
    let total = image.as_raw().len();
    if total == 0 {
        return 0.0;
    }
    let clean = image.as_raw().iter().filter(|&&v| v == 0 || v == 255).count();
    clean as f64 / total as f64
}

/// Gaussian adaptive threshold: a pixel is white when brighter than its weighted
/// neighbourhood mean minus `offset`
#[must_use = "returns a new GrayImage; the input is not modified"]
pub fn adaptive_threshold_gaussian(image: &GrayImage, block_size: u32, offset: u8) -> GrayImage {
    let local = gaussian_blur_f32(image, kernel_sigma(block_size));
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let v = i16::from(image.get_pixel(x, y).0[0]);
        let mean = i16::from(local.get_pixel(x, y).0[0]);
        Luma([if v > mean - i16::from(offset) { 255 } else { 0 }])
    })
}

/// Binarize a grayscale raster to black ink (0) on white (255)
#[must_use = "returns the binarized raster; the input is not modified"]
pub fn binarize(image: &GrayImage, config: &PreprocessConfig) -> GrayImage {
    let clean = clean_fraction(image);
    if clean > config.clean_ratio {
        log::debug!("Binarize: {:.1}% clean pixels, plain threshold", clean * 100.0);
        return threshold_binary(image, config.plain_threshold);
    }

    log::debug!("Binarize: {:.1}% clean pixels, adaptive threshold", clean * 100.0);
    let adaptive = adaptive_threshold_gaussian(image, config.adaptive_block, config.adaptive_offset);
    let smoothed = gaussian_blur_f32(&adaptive, kernel_sigma(config.smoothing_kernel));
    threshold_binary(&smoothed, config.smoothing_cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_binary() {
        let img = GrayImage::from_raw(3, 1, vec![10, 230, 231]).unwrap();
        let out = threshold_binary(&img, 230);
        assert_eq!(out.as_raw(), &vec![0, 0, 255]);
    }

    #[test]
    fn test_kernel_sigma_matches_opencv_defaults() {
        assert!((kernel_sigma(11) - 2.0).abs() < 1e-6);
        assert!((kernel_sigma(13) - 2.3).abs() < 1e-6);
        assert!((kernel_sigma(3) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_clean_input_uses_plain_threshold() {
        let mut img = GrayImage::from_pixel(20, 20, Luma([255]));
        img.put_pixel(5, 5, Luma([0]));
        img.put_pixel(6, 5, Luma([240]));
        let out = binarize(&img, &PreprocessConfig::default());
        assert_eq!(out.get_pixel(5, 5).0[0], 0);
        assert_eq!(out.get_pixel(6, 5).0[0], 255);
    }

    #[test]
    fn test_gray_input_keeps_pen_stroke() {
        let mut img = GrayImage::from_pixel(80, 80, Luma([200]));
        for y in 20..60 {
            for x in 38..42 {
                img.put_pixel(x, y, Luma([40]));
            }
        }
        assert!(clean_fraction(&img) < 0.9);
        let out = binarize(&img, &PreprocessConfig::default());
        assert_eq!(out.get_pixel(39, 40).0[0], 0);
        assert_eq!(out.get_pixel(40, 40).0[0], 0);
        assert_eq!(out.get_pixel(5, 5).0[0], 255);
        assert_eq!(out.get_pixel(70, 40).0[0], 255);
    }
}
