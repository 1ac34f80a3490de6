//! End-to-end layout scenarios
//!
//! Hand-placed glyph boxes run through the layout stages and the renderer, and
//! synthetic rasters run through the full `Pipeline` with stub classifiers.

use image::{GrayImage, Luma};
use inkmath::pipeline_modular::{extend_counts, ModularPipeline, ScriptedBox, Stage04ScriptScorer};
use inkmath::render::RenderSymbol;
use inkmath::{
    BBox, EquationRenderer, InkmathError, Pipeline, Prediction, Result, StackRole,
    SymbolClassifier,
};
use rstest::rstest;

const HEIGHT: u32 = 100;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Lay out `boxes` and pair each resulting box with the label of the input box it came from
fn layout_and_label(boxes: &[(BBox, &str)]) -> (Vec<ScriptedBox>, Vec<RenderSymbol>) {
    let regions: Vec<BBox> = boxes.iter().map(|(b, _)| *b).collect();
    let scripted = ModularPipeline::new().layout(regions, HEIGHT);
    let extends = extend_counts(&scripted);

    let symbols = scripted
        .iter()
        .zip(&extends)
        .map(|(sb, &extend)| {
            let label = boxes
                .iter()
                .find(|(b, _)| *b == sb.bbox)
                .map(|(_, l)| *l)
                .unwrap();
            RenderSymbol::new(label, sb.level, sb.role, sb.script_level, extend)
        })
        .collect();
    (scripted, symbols)
}

/// (9 - x^2) / (4 + x), written with a long fraction bar
fn fraction_boxes() -> Vec<(BBox, &'static str)> {
    vec![
        (BBox::new(20, 10, 35, 40), "9"),
        (BBox::new(45, 22, 60, 27), "-"),
        (BBox::new(70, 15, 85, 40), "x"),
        (BBox::new(88, 5, 96, 16), "2"),
        (BBox::new(10, 50, 110, 54), "-"),
        (BBox::new(25, 60, 40, 90), "4"),
        (BBox::new(50, 68, 65, 82), "+"),
        (BBox::new(75, 65, 90, 90), "x"),
    ]
}

fn raster_with(boxes: &[BBox], width: u32, height: u32) -> GrayImage {
    let mut img = GrayImage::from_pixel(width, height, Luma([255]));
    for b in boxes {
        for y in b.y1..b.y2 {
            for x in b.x1..b.x2 {
                img.put_pixel(x as u32, y as u32, Luma([0]));
            }
        }
    }
    img
}

// ============================================================================
// Layout + Rendering
// ============================================================================

#[test]
fn test_inline_sum_of_digits() {
    let (scripted, symbols) = layout_and_label(&[
        (BBox::new(10, 20, 20, 60), "1"),
        (BBox::new(30, 30, 50, 50), "+"),
        (BBox::new(60, 20, 80, 60), "5"),
    ]);

    assert!(scripted.iter().all(|s| s.level == 0));
    assert!(scripted.iter().all(|s| s.role == StackRole::None));
    assert!(scripted.iter().all(|s| s.script_level == 0));
    assert_eq!(EquationRenderer::new().render(&symbols), "$1 + 5$");
}

#[test]
fn test_fraction_with_superscript_in_numerator() {
    let (scripted, symbols) = layout_and_label(&fraction_boxes());

    let levels: Vec<u32> = scripted.iter().map(|s| s.level).collect();
    assert_eq!(levels, vec![0, 0, 0, 0, 1, 2, 2, 2]);

    let roles: Vec<StackRole> = scripted.iter().map(|s| s.role).collect();
    assert_eq!(
        roles,
        vec![
            StackRole::Top,
            StackRole::Top,
            StackRole::Top,
            StackRole::Top,
            StackRole::Middle,
            StackRole::Bottom,
            StackRole::Bottom,
            StackRole::Bottom,
        ]
    );

    let scripts: Vec<i32> = scripted.iter().map(|s| s.script_level).collect();
    assert_eq!(scripts, vec![0, 0, 0, 1, 0, 0, 0, 0]);

    assert_eq!(
        EquationRenderer::new().render(&symbols),
        "$\\frac{ 9 - x^{ 2}}{ 4 + x}$"
    );
}

#[test]
fn test_stack_levels_are_contiguous() {
    let (scripted, _) = layout_and_label(&fraction_boxes());
    let level_of = |role: StackRole| {
        scripted
            .iter()
            .find(|s| s.role == role)
            .map(|s| s.level)
            .unwrap()
    };
    let top = level_of(StackRole::Top);
    assert_eq!(level_of(StackRole::Middle), top + 1);
    assert_eq!(level_of(StackRole::Bottom), top + 2);
}

#[test]
fn test_radical_spans_its_argument() {
    let (scripted, symbols) = layout_and_label(&[
        (BBox::new(10, 10, 60, 50), "\\sqrt"),
        (BBox::new(25, 20, 40, 45), "x"),
        (BBox::new(45, 20, 58, 45), "y"),
        (BBox::new(65, 28, 75, 38), "+"),
        (BBox::new(80, 15, 92, 45), "1"),
    ]);

    assert!(scripted.iter().all(|s| s.level == 0 && s.script_level == 0));
    assert_eq!(extend_counts(&scripted), vec![2, 0, 0, 0, 0]);
    assert_eq!(
        EquationRenderer::new().render(&symbols),
        "$\\sqrt{ x y} + 1$"
    );
}

#[test]
fn test_small_raised_box_is_superscript() {
    let base = BBox::new(10, 40, 40, 90);
    let raised = BBox::new(45, 10, 60, 30);

    let step = Stage04ScriptScorer::new().score_pair(&base, &raised);
    assert_eq!(step.delta, 1);
    assert!(step.score > 1.0);

    let (scripted, symbols) = layout_and_label(&[(base, "x"), (raised, "2")]);
    assert_eq!(scripted[1].script_level, 1);
    assert_eq!(EquationRenderer::new().render(&symbols), "$x^{ 2}$");
}

#[test]
fn test_small_lowered_box_is_subscript() {
    let base = BBox::new(10, 10, 40, 60);
    let lowered = BBox::new(45, 50, 60, 70);

    let step = Stage04ScriptScorer::new().score_pair(&base, &lowered);
    assert_eq!(step.delta, -1);

    let (_, symbols) = layout_and_label(&[(base, "a"), (lowered, "i")]);
    assert_eq!(EquationRenderer::new().render(&symbols), "$a_{ i}$");
}

#[test]
fn test_equals_sign_merges_once() {
    let pipeline = ModularPipeline::new();
    let bars = vec![BBox::new(30, 40, 60, 45), BBox::new(31, 52, 60, 57)];
    let once = pipeline.layout(bars, 200);
    assert_eq!(once.len(), 1);
    assert_eq!(once[0].bbox, BBox::new(30, 40, 60, 57));

    let again = pipeline.layout(vec![once[0].bbox], 200);
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].bbox, once[0].bbox);
}

#[rstest]
#[case(&["s", "i", "n", "x"], "$\\sin x$")]
#[case(&["c", "o", "s", "y"], "$\\cos y$")]
#[case(&["t", "a", "n", "a"], "$\\tan a$")]
#[case(&["l", "i", "m", "x"], "$\\lim x$")]
#[case(&["1", "c", "+", "2"], "$k + 2$")]
#[case(&[")", "(", "+", "1"], "$x + 1$")]
fn test_baseline_ligatures(#[case] labels: &[&str], #[case] expected: &str) {
    let symbols: Vec<RenderSymbol> = labels
        .iter()
        .map(|l| RenderSymbol::baseline(*l, 0))
        .collect();
    assert_eq!(EquationRenderer::new().render(&symbols), expected);
}

// ============================================================================
// Full Pipeline on Synthetic Rasters
// ============================================================================

/// Labels every glyph the same
struct ConstantClassifier(&'static str);

impl SymbolClassifier for ConstantClassifier {
    fn classify(&self, _glyph: &GrayImage) -> Result<Prediction> {
        Ok(Prediction::from_label(self.0))
    }
}

/// "-" for glyphs whose ink is at least four times wider than tall, "x" otherwise
struct AspectClassifier;

impl SymbolClassifier for AspectClassifier {
    fn classify(&self, glyph: &GrayImage) -> Result<Prediction> {
        let ink: Vec<(u32, u32)> = glyph
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] < 128)
            .map(|(x, y, _)| (x, y))
            .collect();
        let span = |values: Vec<u32>| {
            let min = values.iter().min().copied().unwrap_or(0);
            let max = values.iter().max().copied().unwrap_or(0);
            max - min + 1
        };
        let width = span(ink.iter().map(|p| p.0).collect());
        let height = span(ink.iter().map(|p| p.1).collect());
        Ok(Prediction::from_label(if width >= 4 * height { "-" } else { "x" }))
    }
}

/// Fails on every glyph
struct BrokenClassifier;

impl SymbolClassifier for BrokenClassifier {
    fn classify(&self, _glyph: &GrayImage) -> Result<Prediction> {
        Err(InkmathError::ClassifierError {
            reason: "model not loaded".to_string(),
        })
    }
}

#[test]
fn test_segment_fraction_raster() {
    init_logging();
    let boxes: Vec<BBox> = fraction_boxes().into_iter().map(|(b, _)| b).collect();
    let image = raster_with(&boxes, 120, HEIGHT);

    let segmented = Pipeline::with_defaults().segment(&image).unwrap();
    assert_eq!(segmented.len(), 8);
    assert_eq!(segmented.levels(), vec![0, 0, 0, 0, 1, 2, 2, 2]);
    assert_eq!(segmented.script_levels(), vec![0, 0, 0, 1, 0, 0, 0, 0]);
    assert_eq!(segmented.extend_counts(), vec![0; 8]);
    assert_eq!(segmented.stack_roles()[4], StackRole::Middle);

    let bboxes: Vec<BBox> = segmented.layouts().map(|l| l.bbox).collect();
    assert_eq!(bboxes[0], BBox::new(20, 10, 35, 40));
    assert_eq!(bboxes[4], BBox::new(10, 50, 110, 54));

    // Glyphs are square after normalization
    for glyph in segmented.glyphs() {
        assert_eq!(glyph.width(), glyph.height());
    }

    let labels = ["9", "-", "x", "2", "-", "4", "+", "x"];
    let symbols = segmented.label(&labels).unwrap();
    assert_eq!(
        Pipeline::with_defaults().render(&symbols),
        "$\\frac{ 9 - x^{ 2}}{ 4 + x}$"
    );
}

#[test]
fn test_recognize_with_stub_classifier() {
    init_logging();
    let boxes: Vec<BBox> = fraction_boxes().into_iter().map(|(b, _)| b).collect();
    let image = raster_with(&boxes, 120, HEIGHT);

    let recognition = Pipeline::with_defaults()
        .recognize(&image, &AspectClassifier)
        .unwrap();
    assert_eq!(recognition.predictions.len(), 8);
    assert_eq!(recognition.predictions[4].label, "-");
    assert_eq!(recognition.symbols.len(), 8);
    assert_eq!(recognition.markup, "$\\frac{ x x x^{ x}}{ x x x}$");
}

#[test]
fn test_classifier_failure_is_fatal() {
    init_logging();
    let image = raster_with(&[BBox::new(10, 10, 30, 40)], 60, 60);
    let err = Pipeline::with_defaults()
        .recognize(&image, &BrokenClassifier)
        .unwrap_err();
    assert!(err.is_classifier_error());
}

#[test]
fn test_blank_raster_renders_empty_markup() {
    let image = GrayImage::from_pixel(50, 50, Luma([255]));
    let recognition = Pipeline::with_defaults()
        .recognize(&image, &ConstantClassifier("x"))
        .unwrap();
    assert!(recognition.symbols.is_empty());
    assert_eq!(recognition.markup, "$$");
}
