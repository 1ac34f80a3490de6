//! Box overlay rendering
//!
//! Draws every resolved symbol's box over the source raster, colored by its
//! structural role, for visual checks of the layout stages.

// Box coordinates are clamped to the raster before conversion
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use crate::geometry::BBox;
use crate::pipeline_modular::types::{StackRole, SymbolLayout};
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

/// Stacked symbols (fraction, sum, limit parts)
pub const COLOR_STACKED: Rgb<u8> = Rgb([66, 135, 245]); // Blue
/// Baseline symbols
pub const COLOR_BASELINE: Rgb<u8> = Rgb([244, 67, 54]); // Red
/// Sub/superscripts, regardless of stack role
pub const COLOR_SCRIPT: Rgb<u8> = Rgb([76, 175, 80]); // Green

/// What the overlay needs to know about one symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolAnnotation {
    pub bbox: BBox,
    pub role: StackRole,
    pub script_level: i32,
}

impl From<&SymbolLayout> for SymbolAnnotation {
    fn from(layout: &SymbolLayout) -> Self {
        Self {
            bbox: layout.bbox,
            role: layout.role,
            script_level: layout.script_level,
        }
    }
}

/// Overlay rendering options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayOptions {
    /// Box border thickness in pixels (default: 2)
    pub line_thickness: u32,
}

impl Default for OverlayOptions {
    #[inline]
    fn default() -> Self {
        Self { line_thickness: 2 }
    }
}

/// Color for one annotation; script depth wins over stack role
#[inline]
#[must_use]
pub const fn annotation_color(annotation: &SymbolAnnotation) -> Rgb<u8> {
    if annotation.script_level != 0 {
        COLOR_SCRIPT
    } else if annotation.role.is_stacked() {
        COLOR_STACKED
    } else {
        COLOR_BASELINE
    }
}

/// Draw all annotations over `image` with default options
#[must_use = "returns the overlay image; the input is not modified"]
pub fn draw_overlay(image: &GrayImage, annotations: &[SymbolAnnotation]) -> RgbImage {
    draw_overlay_with_options(image, annotations, &OverlayOptions::default())
}

/// Draw all annotations over `image`
#[must_use = "returns the overlay image; the input is not modified"]
pub fn draw_overlay_with_options(
    image: &GrayImage,
    annotations: &[SymbolAnnotation],
    options: &OverlayOptions,
) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut canvas = RgbImage::from_fn(width, height, |x, y| {
        let v = image.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    });

    for annotation in annotations {
        let color = annotation_color(annotation);
        let bbox = annotation.bbox;

        // Clamp to image bounds
        let x = bbox.x1.max(0) as u32;
        let y = bbox.y1.max(0) as u32;
        let w = (bbox.x2.max(0) as u32).min(width).saturating_sub(x);
        let h = (bbox.y2.max(0) as u32).min(height).saturating_sub(y);

        for t in 0..options.line_thickness {
            let inner_w = w.saturating_sub(2 * t);
            let inner_h = h.saturating_sub(2 * t);
            if inner_w > 0 && inner_h > 0 {
                let rect = Rect::at((x + t) as i32, (y + t) as i32).of_size(inner_w, inner_h);
                draw_hollow_rect_mut(&mut canvas, rect, color);
            }
        }
    }
    canvas
}
