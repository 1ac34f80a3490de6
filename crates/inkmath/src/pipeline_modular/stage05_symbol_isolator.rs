/// Stage 5: Symbol Isolator
///
/// Cuts every box out of the binarized raster and turns it into a classifier-ready
/// glyph, and computes each symbol's extend count.
///
/// Algorithm (per box, in reading order):
/// 1. Count later boxes nested inside it. A box with nested boxes is usually a
///    radical whose rectangle also covers its argument; its glyph is redrawn from
///    the filled outline of its largest ink component so the argument disappears
/// 2. Extend count: number of later boxes on the same level (stopping at the first
///    box of another level) that touch or overlap it
/// 3. Pad the crop into a white square (about 10% margin, side parity-adjusted),
///    centre it, and smooth it with a 3x3 box blur
use crate::error::{InkmathError, Result};
use crate::geometry::{contains, part_inside, BBox};
use crate::pipeline_modular::types::{IsolatedSymbol, ScriptedBox, SymbolLayout};
use image::{imageops, GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::drawing::draw_polygon_mut;
use imageproc::filter::box_filter;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

const WHITE: Luma<u8> = Luma([255]);
const BLACK: Luma<u8> = Luma([0]);

/// Configuration for Stage 5 (Symbol Isolator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage05Config {
    /// Margin is the longer glyph side divided by this
    pub margin_divisor: u32,
    /// Lower bound for the margin, in pixels
    pub min_margin: u32,
    /// Box blur radius (1 = 3x3)
    pub blur_radius: u32,
    /// Pixels at or below this value count as ink when redrawing outlines
    pub ink_threshold: u8,
    /// Redraw boxes that enclose other boxes from their outline
    pub redraw_nested: bool,
}

impl Default for Stage05Config {
    #[inline]
    fn default() -> Self {
        Self {
            margin_divisor: 10,
            min_margin: 2,
            blur_radius: 1,
            ink_threshold: 200,
            redraw_nested: true,
        }
    }
}

/// Stage 5: Symbol Isolator
///
/// Input: binarized raster (black ink on white) and scored boxes
/// Output: one [`IsolatedSymbol`] per box, same order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Stage05SymbolIsolator {
    config: Stage05Config,
}

impl Stage05SymbolIsolator {
    /// Create a new `Stage05SymbolIsolator` with default configuration
    #[inline]
    #[must_use = "symbol isolator stage is created but not used"]
    pub fn new() -> Self {
        Self {
            config: Stage05Config::default(),
        }
    }

    /// Create a new `Stage05SymbolIsolator` with custom configuration
    #[inline]
    #[must_use = "symbol isolator stage is created but not used"]
    pub const fn with_config(config: Stage05Config) -> Self {
        Self { config }
    }

    /// Isolate and normalize every symbol
    ///
    /// # Errors
    ///
    /// [`InkmathError::InvalidInput`] if a box does not intersect the raster
    pub fn process(&self, binary: &GrayImage, boxes: &[ScriptedBox]) -> Result<Vec<IsolatedSymbol>> {
        let extends = extend_counts(boxes);
        let mut symbols = Vec::with_capacity(boxes.len());

        for (i, sb) in boxes.iter().enumerate() {
            let nested = boxes[i + 1..]
                .iter()
                .filter(|later| contains(&sb.bbox, &later.bbox))
                .count();

            let mut glyph = crop(binary, &sb.bbox)?;
            if nested > 0 && self.config.redraw_nested {
                log::debug!("Stage 5: redrawing box {i} around {nested} nested boxes");
                glyph = redraw_outline(&glyph, self.config.ink_threshold);
            }

            symbols.push(IsolatedSymbol {
                layout: SymbolLayout {
                    bbox: sb.bbox,
                    level: sb.level,
                    role: sb.role,
                    script_level: sb.script_level,
                    extend_count: extends[i],
                },
                glyph: self.normalize(&glyph),
            });
        }

        log::debug!("Stage 5: isolated {} symbols", symbols.len());
        Ok(symbols)
    }

    /// Center a glyph on a white square canvas and smooth it
    #[must_use = "returns the normalized glyph; the input is not modified"]
    pub fn normalize(&self, glyph: &GrayImage) -> GrayImage {
        let (width, height) = glyph.dimensions();
        let longest = width.max(height);
        let margin = (longest / self.config.margin_divisor.max(1)).max(self.config.min_margin);
        let side = longest + margin + longest % 2;

        let mut canvas = GrayImage::from_pixel(side, side, WHITE);
        let x = (side - width) / 2;
        let y = (side - height) / 2;
        imageops::replace(&mut canvas, glyph, i64::from(x), i64::from(y));

        if self.config.blur_radius == 0 {
            return canvas;
        }
        box_filter(&canvas, self.config.blur_radius, self.config.blur_radius)
    }
}

/// Extend count of every box: later same-level boxes it touches
#[must_use]
pub fn extend_counts(boxes: &[ScriptedBox]) -> Vec<usize> {
    boxes
        .iter()
        .enumerate()
        .map(|(i, sb)| {
            boxes[i + 1..]
                .iter()
                .take_while(|later| later.level == sb.level)
                .filter(|later| part_inside(&sb.bbox, &later.bbox))
                .count()
        })
        .collect()
}

/// Crop `bbox` out of the raster, clamped to its bounds
fn crop(binary: &GrayImage, bbox: &BBox) -> Result<GrayImage> {
    let (img_w, img_h) = binary.dimensions();
    let clamp = |v: i32, max: u32| u32::try_from(v.max(0)).map_or(0, |v| v.min(max));
    let (x1, x2) = (clamp(bbox.x1, img_w), clamp(bbox.x2, img_w));
    let (y1, y2) = (clamp(bbox.y1, img_h), clamp(bbox.y2, img_h));

    if x2 <= x1 || y2 <= y1 {
        return Err(InkmathError::InvalidInput {
            reason: format!(
                "box ({}, {}, {}, {}) lies outside the {img_w}x{img_h} raster",
                bbox.x1, bbox.y1, bbox.x2, bbox.y2
            ),
        });
    }
    Ok(imageops::crop_imm(binary, x1, y1, x2 - x1, y2 - y1).to_image())
}

/// Redraw a glyph as the filled outline of its largest ink component
///
/// Smaller components (the radical's argument, stray dots) are dropped.
/// Falls back to the input when no usable outline is found.
pub(crate) fn redraw_outline(glyph: &GrayImage, ink_threshold: u8) -> GrayImage {
    let (width, height) = glyph.dimensions();
    let mut mask = GrayImage::new(width, height);
    for (x, y, px) in glyph.enumerate_pixels() {
        if px.0[0] <= ink_threshold {
            mask.put_pixel(x, y, WHITE);
        }
    }

    let contours: Vec<Contour<i32>> = find_contours(&mask);
    let Some(outline) = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && !c.points.is_empty())
        .max_by_key(|c| outline_extent(&c.points))
    else {
        return glyph.clone();
    };

    let mut points: Vec<Point<i32>> = Vec::with_capacity(outline.points.len());
    for p in &outline.points {
        if points.last() != Some(p) {
            points.push(*p);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    let mut canvas = GrayImage::from_pixel(width, height, WHITE);
    match points.as_slice() {
        [] => return glyph.clone(),
        [only] => {
            if let (Ok(x), Ok(y)) = (u32::try_from(only.x), u32::try_from(only.y)) {
                canvas.put_pixel(x, y, BLACK);
            }
        }
        _ => draw_polygon_mut(&mut canvas, &points, BLACK),
    }
    canvas
}

/// Bounding-box area of a point set
fn outline_extent(points: &[Point<i32>]) -> i64 {
    let xs = points.iter().map(|p| p.x);
    let ys = points.iter().map(|p| p.y);
    let (Some(x_min), Some(x_max)) = (xs.clone().min(), xs.max()) else {
        return 0;
    };
    let (Some(y_min), Some(y_max)) = (ys.clone().min(), ys.max()) else {
        return 0;
    };
    i64::from(x_max - x_min + 1) * i64::from(y_max - y_min + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline_modular::types::StackRole;

    fn scripted(bbox: BBox, level: u32) -> ScriptedBox {
        ScriptedBox {
            bbox,
            level,
            role: StackRole::None,
            script_level: 0,
        }
    }

    fn fill(img: &mut GrayImage, bbox: BBox) {
        for y in bbox.y1..bbox.y2 {
            for x in bbox.x1..bbox.x2 {
                img.put_pixel(x as u32, y as u32, BLACK);
            }
        }
    }

    #[test]
    fn test_normalize_even_side() {
        let stage = Stage05SymbolIsolator::new();
        let glyph = GrayImage::from_pixel(30, 20, BLACK);
        let out = stage.normalize(&glyph);
        // 30 + 30/10 margin
        assert_eq!(out.dimensions(), (33, 33));
        // corners stay white after blur
        assert_eq!(out.get_pixel(0, 0).0[0], 255);
        // centre stays black
        assert_eq!(out.get_pixel(16, 16).0[0], 0);
    }

    #[test]
    fn test_normalize_odd_side_and_min_margin() {
        let stage = Stage05SymbolIsolator::new();
        let glyph = GrayImage::from_pixel(10, 7, BLACK);
        // 7 -> 10 longest, margin max(1, 2) = 2, even
        assert_eq!(stage.normalize(&glyph).dimensions(), (12, 12));
        let glyph = GrayImage::from_pixel(21, 10, BLACK);
        // margin 2, odd longest adds one
        assert_eq!(stage.normalize(&glyph).dimensions(), (24, 24));
    }

    #[test]
    fn test_extend_counts_stop_at_level_change() {
        let boxes = vec![
            scripted(BBox::new(0, 0, 100, 50), 0),
            scripted(BBox::new(20, 10, 40, 40), 0),
            scripted(BBox::new(50, 10, 70, 40), 0),
            scripted(BBox::new(120, 10, 140, 40), 0),
            scripted(BBox::new(10, 5, 30, 45), 1),
        ];
        assert_eq!(extend_counts(&boxes), vec![2, 0, 0, 0, 0]);
    }

    #[test]
    fn test_redraw_drops_nested_component() {
        let mut img = GrayImage::from_pixel(70, 70, WHITE);
        // hook: top bar plus left stroke
        fill(&mut img, BBox::new(0, 0, 70, 4));
        fill(&mut img, BBox::new(0, 0, 4, 70));
        // argument inside the hook
        fill(&mut img, BBox::new(30, 30, 40, 40));

        let out = redraw_outline(&img, 200);
        assert_eq!(out.get_pixel(35, 35).0[0], 255);
        assert_eq!(out.get_pixel(2, 50).0[0], 0);
        assert_eq!(out.get_pixel(50, 2).0[0], 0);
        assert_eq!(out.get_pixel(50, 50).0[0], 255);
    }

    #[test]
    fn test_process_keeps_order_and_metadata() {
        let mut img = GrayImage::from_pixel(200, 100, WHITE);
        fill(&mut img, BBox::new(10, 20, 40, 60));
        fill(&mut img, BBox::new(60, 20, 90, 60));
        let boxes = vec![
            scripted(BBox::new(10, 20, 40, 60), 0),
            ScriptedBox {
                script_level: 1,
                ..scripted(BBox::new(60, 20, 90, 60), 0)
            },
        ];

        let out = Stage05SymbolIsolator::new().process(&img, &boxes).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].layout.script_level, 1);
        assert_eq!(out[0].layout.extend_count, 0);
        let (w, h) = out[0].glyph.dimensions();
        assert_eq!(w, h);
    }

    #[test]
    fn test_box_outside_raster_is_rejected() {
        let img = GrayImage::from_pixel(50, 50, WHITE);
        let boxes = vec![scripted(BBox::new(60, 60, 80, 80), 0)];
        let err = Stage05SymbolIsolator::new()
            .process(&img, &boxes)
            .unwrap_err();
        assert!(matches!(err, InkmathError::InvalidInput { .. }));
    }
}
