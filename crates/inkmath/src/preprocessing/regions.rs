//! Raw glyph region detection
//!
//! Traces the outer border of every ink component in a binarized raster and
//! returns its bounding rectangle. Hole borders (the inside of "0", "8", "o") are
//! skipped, and regions too small relative to the image are dropped as noise.

// Image dimensions fit comfortably in f64 and i32
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]

use crate::geometry::BBox;
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};

/// Ink mask of a binarized raster: ink (dark) pixels become 255, background 0
#[must_use = "returns a new mask; the input is not modified"]
pub fn ink_mask(binary: &GrayImage) -> GrayImage {
    GrayImage::from_fn(binary.width(), binary.height(), |x, y| {
        Luma([if binary.get_pixel(x, y).0[0] < 128 { 255 } else { 0 }])
    })
}

/// Bounding boxes of all outer ink borders larger than `min_area_fraction` of the image
///
/// Boxes are returned in (x1 + y1) order, ties broken by coordinates.
#[must_use]
pub fn detect_regions(binary: &GrayImage, min_area_fraction: f64) -> Vec<BBox> {
    let (width, height) = binary.dimensions();
    let min_area = min_area_fraction * f64::from(width) * f64::from(height);

    let contours: Vec<Contour<u32>> = find_contours(&ink_mask(binary));
    let total = contours.len();

    let mut boxes: Vec<BBox> = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .filter_map(contour_bounds)
        .filter(|b| b.area() as f64 > min_area)
        .collect();
    boxes.sort_by_key(|b| (b.x1 + b.y1, *b));

    log::debug!(
        "Region detection: {total} contours, {} regions above {min_area:.1}px",
        boxes.len()
    );
    boxes
}

/// Exclusive-end bounding box of a contour's points
fn contour_bounds(contour: &Contour<u32>) -> Option<BBox> {
    let first = contour.points.first()?;
    let (mut x_min, mut y_min, mut x_max, mut y_max) = (first.x, first.y, first.x, first.y);
    for p in &contour.points {
        x_min = x_min.min(p.x);
        y_min = y_min.min(p.y);
        x_max = x_max.max(p.x);
        y_max = y_max.max(p.y);
    }
    Some(BBox::new(
        x_min as i32,
        y_min as i32,
        x_max as i32 + 1,
        y_max as i32 + 1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_rect(img: &mut GrayImage, x1: u32, y1: u32, x2: u32, y2: u32) {
        for y in y1..y2 {
            for x in x1..x2 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
    }

    #[test]
    fn test_detects_separate_components() {
        let mut img = GrayImage::from_pixel(100, 60, Luma([255]));
        draw_rect(&mut img, 10, 10, 30, 40);
        draw_rect(&mut img, 50, 20, 70, 30);
        let boxes = detect_regions(&img, 2.2e-4);
        assert_eq!(boxes, vec![BBox::new(10, 10, 30, 40), BBox::new(50, 20, 70, 30)]);
    }

    #[test]
    fn test_hole_border_is_ignored() {
        let mut img = GrayImage::from_pixel(60, 60, Luma([255]));
        draw_rect(&mut img, 10, 10, 50, 50);
        // punch a hole: the ring should give a single region
        for y in 20..40 {
            for x in 20..40 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let boxes = detect_regions(&img, 2.2e-4);
        assert_eq!(boxes, vec![BBox::new(10, 10, 50, 50)]);
    }

    #[test]
    fn test_component_inside_hole_is_kept() {
        let mut img = GrayImage::from_pixel(60, 60, Luma([255]));
        draw_rect(&mut img, 5, 5, 55, 55);
        for y in 10..50 {
            for x in 10..50 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        draw_rect(&mut img, 25, 25, 35, 35);
        let boxes = detect_regions(&img, 2.2e-4);
        assert_eq!(boxes, vec![BBox::new(5, 5, 55, 55), BBox::new(25, 25, 35, 35)]);
    }

    #[test]
    fn test_small_specks_are_dropped() {
        let mut img = GrayImage::from_pixel(200, 200, Luma([255]));
        draw_rect(&mut img, 10, 10, 40, 40);
        // 2x2 speck: area 4 is below 2.2e-4 * 40000 = 8.8
        draw_rect(&mut img, 100, 100, 102, 102);
        let boxes = detect_regions(&img, 2.2e-4);
        assert_eq!(boxes, vec![BBox::new(10, 10, 40, 40)]);
    }

    #[test]
    fn test_blank_image_has_no_regions() {
        let img = GrayImage::from_pixel(30, 30, Luma([255]));
        assert!(detect_regions(&img, 2.2e-4).is_empty());
    }
}
