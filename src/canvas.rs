//! The draw interpreter.
//!
//! [`ExtCanvas`] owns a [`DrawTarget`], an [`ImageLoader`] and the two
//! caches. Every `draw` clears the target and replays the instruction list
//! in order, isolating each instruction between `save` and `restore`.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{
    CanvasDrawImage, CanvasFillStrokeStyles, CanvasImageData, CanvasImageSource, CanvasPaths, CanvasRectangles,
    CanvasState, CanvasText, FillRule, ImageData, Paint, TextAlign,
};
use crate::config::CanvasConfig;
use crate::error::Result;
use crate::geometry::{Bounds, Point, Size};
use crate::image_mode;
use crate::images::{ImageCache, ImageLoader};
use crate::instruction::{DrawInstruction, ImageOptions, TextOptions};
use crate::shapes;
use crate::surface::DrawTarget;
use crate::text::{self, FontSpec, TextHeightOptions, TextMeasure, WrapLayout};
use crate::units::{Length, UnitConverter, Viewport};

pub struct ExtCanvas<T: DrawTarget, L: ImageLoader> {
    target: T,
    loader: L,
    units: UnitConverter,
    images: ImageCache,
    config: CanvasConfig,
    last_draw: Bounds,
}

impl<T: DrawTarget, L: ImageLoader> ExtCanvas<T, L> {
    pub fn new(target: T, loader: L, viewport: Viewport, config: CanvasConfig) -> Self {
        let units = UnitConverter::new(
            config.design_width,
            viewport,
            target.natural_size(),
            config.unit_cache_capacity,
        );
        let images = ImageCache::new(config.image_cache_capacity);
        Self {
            target,
            loader,
            units,
            images,
            config,
            last_draw: Bounds::ZERO,
        }
    }

    /// Bounds of the most recently drawn instruction; zero after [`clean`](Self::clean).
    pub fn last_draw_position(&self) -> Bounds {
        self.last_draw
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn to_px(&mut self, value: &Length) -> Result<f64> {
        self.units.to_px(value)
    }

    /// Resizes the target. Content is discarded and every cached length
    /// resolution is dropped.
    pub fn resize(&mut self, size: Size, viewport: Viewport) -> Result<()> {
        self.target.resize(size, viewport)?;
        self.units.update(viewport, self.target.natural_size());
        debug!(
            width = size.width,
            height = size.height,
            pixel_ratio = viewport.pixel_ratio,
            "canvas resized"
        );
        Ok(())
    }

    /// Clears the whole surface and resets the last drawn bounds.
    pub fn clean(&mut self) -> Result<()> {
        let size = self.target.natural_size();
        self.target.context().clear_rect(0.0, 0.0, size.width, size.height)?;
        self.last_draw = Bounds::ZERO;
        Ok(())
    }

    /// Clears the surface, then renders `instructions` in order.
    ///
    /// An image that fails to load is logged and skipped unless it sets
    /// `throw_error`. Any other failure stops the run and is returned.
    pub async fn draw(&mut self, instructions: &[DrawInstruction]) -> Result<()> {
        if instructions.is_empty() {
            warn!("draw called with an empty instruction list");
            return Ok(());
        }
        self.clean()?;

        for (index, instruction) in instructions.iter().enumerate() {
            debug!(index, kind = instruction.kind(), "drawing instruction");
            self.target.context().save()?;
            let drawn = self.render(instruction).await;
            self.target.context().restore()?;
            if let Some(bounds) = drawn? {
                self.last_draw = bounds;
            }
        }
        Ok(())
    }

    /// Like [`draw`](Self::draw), for a JSON array of instructions. Elements
    /// that do not parse are logged and skipped.
    pub async fn draw_json(&mut self, value: &Value) -> Result<()> {
        let items = match value.as_array() {
            Some(items) if !items.is_empty() => items,
            _ => {
                warn!("draw_json expects a non-empty array of instructions");
                return Ok(());
            }
        };

        let mut instructions = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match DrawInstruction::deserialize(item) {
                Ok(instruction) => instructions.push(instruction),
                Err(err) => {
                    let kind = item.get("type").and_then(Value::as_str).unwrap_or("<missing>");
                    warn!(index, kind, error = %err, "skipping malformed instruction");
                }
            }
        }
        self.draw(&instructions).await
    }

    /// Height of a text block once wrapped, measured with this canvas's fonts.
    pub fn measure_text_height(&mut self, opts: &TextHeightOptions) -> Result<f64> {
        text::measure_text_height(self.target.context(), opts)
    }

    pub fn to_data_url(&self, mime: &str, quality: f64) -> Result<String> {
        self.target.to_data_url(mime, quality)
    }

    /// Reads back pixels in backing-store coordinates.
    pub fn get_image_data(&self, x: u32, y: u32, w: u32, h: u32) -> Result<ImageData> {
        self.target.context_ref().get_image_data(x, y, w, h)
    }

    async fn render(&mut self, instruction: &DrawInstruction) -> Result<Option<Bounds>> {
        let ctx = self.target.context();
        let units = &mut self.units;
        let bounds = match instruction {
            DrawInstruction::Image(opts) => return self.draw_image(opts).await,
            DrawInstruction::Text(opts) => return self.draw_text(opts, false).map(Some),
            DrawInstruction::WrapText(opts) => return self.draw_text(opts, true).map(Some),
            DrawInstruction::Triangle(opts) => shapes::draw_triangle(ctx, units, opts)?,
            DrawInstruction::Rectangle(opts) => shapes::draw_rectangle(ctx, units, opts)?,
            DrawInstruction::Circle(opts) => shapes::draw_circle(ctx, units, opts)?,
        };
        Ok(Some(bounds))
    }

    async fn draw_image(&mut self, opts: &ImageOptions) -> Result<Option<Bounds>> {
        let x = self.units.to_px(&opts.x)?;
        let y = self.units.to_px(&opts.y)?;
        let w = self.units.to_px(&opts.w)?;
        let h = self.units.to_px(&opts.h)?;
        let radius = self.units.to_px_or(opts.radius.as_ref(), 0.0)?;
        if !Bounds::new(x, y, w, h).is_drawable() {
            warn!(url = %opts.url, w, h, "skipping image with empty box");
            return Ok(None);
        }

        let ctx = self.target.context();
        if radius > 0.0 {
            ctx.begin_path()?;
            shapes::rounded_rect_path(ctx, x, y, w, h, radius)?;
            ctx.clip(FillRule::NonZero)?;
            ctx.begin_path()?;
        }
        if let Some(opacity) = opts.opacity {
            ctx.set_global_alpha(opacity)?;
        }

        let image = match self.images.load(&self.loader, &opts.url).await {
            Ok(image) => image,
            Err(err) if opts.throw_error => return Err(err),
            Err(err) => {
                warn!(url = %opts.url, error = %err, "skipping image");
                return Ok(None);
            }
        };
        let (img_w, img_h) = (image.width(), image.height());
        if img_w == 0 || img_h == 0 {
            warn!(url = %opts.url, "skipping empty image");
            return Ok(None);
        }

        let geometry = image_mode::resolve(opts.mode, img_w as f64, img_h as f64, w, h);
        let dest = geometry.draw.translate(x, y);
        let src = geometry.source;
        if !dest.is_drawable() || (opts.mode.is_crop() && !src.is_drawable()) {
            warn!(url = %opts.url, ?dest, ?src, "skipping image with empty geometry");
            return Ok(None);
        }
        let ctx = self.target.context();
        if opts.mode.is_crop() {
            ctx.draw_image_subrect(&*image, src.x, src.y, src.w, src.h, dest.x, dest.y, dest.w, dest.h)?;
        } else {
            ctx.draw_image_scaled(&*image, dest.x, dest.y, dest.w, dest.h)?;
        }
        Ok(Some(dest))
    }

    fn draw_text(&mut self, opts: &TextOptions, paragraphs: bool) -> Result<Bounds> {
        let defaults = &self.config.text;
        let units = &mut self.units;

        let x = units.to_px(&opts.x)?;
        let y = units.to_px(&opts.y)?;
        let size = px_or(units, opts.font_size.as_ref(), defaults.font_size)?;
        let max_width = px_or(units, opts.max_line_width.as_ref(), defaults.max_line_width)?;
        let line_height = px_or(units, opts.line_height.as_ref(), size * defaults.line_height_factor)?;
        let indent = px_or(units, opts.indent.as_ref(), 0.0)?;

        let font = FontSpec::new(
            size,
            opts.font_family.as_deref().unwrap_or(&defaults.font_family),
            opts.font_weight.as_deref().unwrap_or(&defaults.font_weight),
        );
        let layout = WrapLayout {
            max_width,
            max_lines: opts.max_num.unwrap_or(defaults.max_lines),
            overflow: opts.overflow.clone().unwrap_or_default(),
            indent,
            origin: Point::new(x, y),
            line_height,
        };
        let color = opts.color.as_deref().unwrap_or(&defaults.color);

        let ctx = self.target.context();
        if let Some(opacity) = opts.opacity {
            ctx.set_global_alpha(opacity)?;
        }
        ctx.set_font(font.to_css())?;
        ctx.set_fill_style(Paint::from(color))?;
        let align = opts.text_align.unwrap_or_default();
        ctx.set_text_align(align)?;
        ctx.set_text_baseline(opts.text_baseline.unwrap_or_default())?;

        let lines = if paragraphs {
            text::wrap_paragraphs(ctx, &font, &opts.value, &layout)?
        } else {
            text::wrap_text(ctx, &font, &opts.value, &layout)?
        };

        // Horizontal extent of the painted ink, which depends on the anchor.
        let mut extent: Option<(f64, f64)> = None;
        for line in &lines {
            ctx.fill_text(&line.text, line.x, line.y)?;
            let lw = ctx.measure(&font, &line.text)?;
            let left = match align {
                TextAlign::Left | TextAlign::Start => line.x,
                TextAlign::Center => line.x - lw / 2.0,
                TextAlign::Right | TextAlign::End => line.x - lw,
            };
            extent = Some(match extent {
                Some((lo, hi)) => (lo.min(left), hi.max(left + lw)),
                None => (left, left + lw),
            });
        }
        let (left, right) = extent.unwrap_or((x, x));
        Ok(Bounds::new(left, y, right - left, lines.len() as f64 * line_height))
    }
}

// Text defaults are plain pixels, not design units.
fn px_or(units: &mut UnitConverter, value: Option<&Length>, default: f64) -> Result<f64> {
    match value {
        Some(v) => units.to_px(v),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backends::recording::DrawOp;
    use crate::error::CanvasError;
    use crate::image_mode::ImageMode;
    use crate::images::{DecodedImage, MemoryLoader};
    use crate::instruction::{CircleOptions, RectangleOptions, ShapeStyle};
    use crate::surface::RecordingSurface;
    use crate::text::OverflowPolicy;

    type TestCanvas = ExtCanvas<RecordingSurface, MemoryLoader>;

    fn assert_almost_eq(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    // 750-wide viewport on a 750 design grid: one design unit is one pixel.
    fn canvas_with(loader: MemoryLoader) -> TestCanvas {
        ExtCanvas::new(
            RecordingSurface::new(Size::new(300.0, 200.0)),
            loader,
            Viewport::new(750.0, 1.0),
            CanvasConfig::default(),
        )
    }

    fn canvas() -> TestCanvas {
        canvas_with(MemoryLoader::new())
    }

    fn ops(canvas: &TestCanvas) -> &[DrawOp] {
        canvas.target().canvas().ops()
    }

    fn rect(x: i32, y: i32, w: i32, h: i32) -> DrawInstruction {
        DrawInstruction::Rectangle(RectangleOptions {
            x: x.into(),
            y: y.into(),
            w: w.into(),
            h: h.into(),
            radius: None,
            style: ShapeStyle::default(),
        })
    }

    fn circle(x: i32, y: i32, r: i32) -> DrawInstruction {
        DrawInstruction::Circle(CircleOptions {
            x: x.into(),
            y: y.into(),
            radius: r.into(),
            start_angle: None,
            end_angle: None,
            anticlockwise: false,
            style: ShapeStyle::default(),
        })
    }

    fn image(url: &str, mode: ImageMode) -> ImageOptions {
        ImageOptions {
            x: 10.into(),
            y: 20.into(),
            url: url.to_string(),
            w: 100.into(),
            h: 100.into(),
            mode,
            radius: None,
            opacity: None,
            throw_error: false,
        }
    }

    fn text(value: &str) -> TextOptions {
        TextOptions {
            x: 5.into(),
            y: 7.into(),
            value: value.to_string(),
            font_size: Some("10px".into()),
            max_line_width: Some("60px".into()),
            ..TextOptions::default()
        }
    }

    #[test]
    fn empty_list_is_a_no_op() {
        let mut c = canvas();
        pollster::block_on(c.draw(&[])).unwrap();
        assert!(ops(&c).is_empty());
    }

    #[test]
    fn draw_clears_then_renders_in_order() {
        let mut c = canvas();
        pollster::block_on(c.draw(&[rect(0, 0, 10, 10), circle(50, 50, 5)])).unwrap();

        match ops(&c) {
            [DrawOp::ClearRect { w, h, .. }, DrawOp::FillPath { .. }, DrawOp::FillPath { .. }] => {
                assert_eq!((*w, *h), (300.0, 200.0));
            }
            other => panic!("unexpected ops {other:?}"),
        }
        assert_eq!(c.last_draw_position(), Bounds::new(45.0, 45.0, 10.0, 10.0));
        assert_eq!(c.target().canvas().save_depth(), 0);
    }

    #[test]
    fn state_does_not_leak_between_instructions() {
        let mut c = canvas();
        let faded = DrawInstruction::Rectangle(RectangleOptions {
            x: 0.into(),
            y: 0.into(),
            w: 10.into(),
            h: 10.into(),
            radius: None,
            style: ShapeStyle {
                opacity: Some(0.3),
                line_dash: Some(vec![2.into()]),
                ..ShapeStyle::default()
            },
        });
        pollster::block_on(c.draw(&[faded, circle(5, 5, 5)])).unwrap();

        let second = ops(&c)[2].state().unwrap();
        assert_eq!(second.global_alpha, 1.0);
        assert!(second.line_dash.is_empty());
    }

    #[test]
    fn failed_image_is_skipped() {
        let mut c = canvas();
        let list = [
            rect(0, 0, 10, 10),
            DrawInstruction::Image(image("missing.png", ImageMode::ScaleToFill)),
            circle(50, 50, 5),
        ];
        pollster::block_on(c.draw(&list)).unwrap();

        assert_eq!(ops(&c).len(), 3);
        assert!(matches!(ops(&c)[2], DrawOp::FillPath { .. }));
        assert_eq!(c.last_draw_position(), Bounds::new(45.0, 45.0, 10.0, 10.0));
        assert_eq!(c.target().canvas().save_depth(), 0);
    }

    #[test]
    fn failed_image_propagates_when_asked() {
        let mut c = canvas();
        let mut opts = image("missing.png", ImageMode::ScaleToFill);
        opts.throw_error = true;
        let err = pollster::block_on(c.draw(&[DrawInstruction::Image(opts), rect(0, 0, 1, 1)])).unwrap_err();
        assert!(matches!(err, CanvasError::ImageLoad { ref url, .. } if url == "missing.png"));
        assert_eq!(c.target().canvas().save_depth(), 0);
    }

    #[test]
    fn aspect_fill_draws_a_source_subrect() {
        let loader = MemoryLoader::new().with("wide.png", DecodedImage::solid(200, 100, [255, 0, 0, 255]));
        let mut c = canvas_with(loader);
        pollster::block_on(c.draw(&[DrawInstruction::Image(image("wide.png", ImageMode::AspectFill))])).unwrap();

        match &ops(&c)[1] {
            DrawOp::DrawImageSubrect {
                sx,
                sy,
                sw,
                sh,
                dx,
                dy,
                dw,
                dh,
                ..
            } => {
                assert_eq!((*sx, *sy, *sw, *sh), (50.0, 0.0, 100.0, 100.0));
                assert_eq!((*dx, *dy, *dw, *dh), (10.0, 20.0, 100.0, 100.0));
            }
            other => panic!("unexpected op {other:?}"),
        }
        assert_eq!(c.last_draw_position(), Bounds::new(10.0, 20.0, 100.0, 100.0));
        assert!(c.images().contains("wide.png"));
    }

    #[test]
    fn aspect_fit_scales_and_offsets() {
        let loader = MemoryLoader::new().with("wide.png", DecodedImage::solid(200, 100, [0, 0, 255, 255]));
        let mut c = canvas_with(loader);
        let mut opts = image("wide.png", ImageMode::AspectFit);
        opts.radius = Some(8.into());
        opts.opacity = Some(0.5);
        pollster::block_on(c.draw(&[DrawInstruction::Image(opts)])).unwrap();

        match ops(&c) {
            [
                DrawOp::ClearRect { .. },
                DrawOp::Clip { .. },
                DrawOp::DrawImageScaled {
                    dx, dy, dw, dh, state, ..
                },
            ] => {
                assert_eq!((*dx, *dy, *dw, *dh), (10.0, 45.0, 100.0, 50.0));
                assert_eq!(state.global_alpha, 0.5);
                assert!(state.clip.is_some());
            }
            other => panic!("unexpected ops {other:?}"),
        }
    }

    #[test]
    fn text_truncates_with_ellipsis_and_reports_block_bounds() {
        let mut c = canvas();
        pollster::block_on(c.draw(&[DrawInstruction::Text(text("abcdefghij"))])).unwrap();

        assert_eq!(c.target().canvas().texts(), ["abc..."]);
        let state = ops(&c)[1].state().unwrap();
        assert_eq!(state.font, "normal 10px sans-serif");
        assert_eq!(state.fill_style, Paint::from("#000000"));

        let bounds = c.last_draw_position();
        assert_eq!((bounds.x, bounds.y, bounds.w), (5.0, 7.0, 60.0));
        assert_almost_eq(bounds.h, 10.0 * 1.2);
    }

    #[test]
    fn text_bounds_follow_alignment() {
        let mut c = canvas();
        let mut centered = text("abcd");
        centered.text_align = Some(TextAlign::Center);
        pollster::block_on(c.draw(&[DrawInstruction::Text(centered)])).unwrap();
        let bounds = c.last_draw_position();
        assert_eq!((bounds.x, bounds.y, bounds.w), (-15.0, 7.0, 40.0));

        let mut right = text("abcd");
        right.text_align = Some(TextAlign::Right);
        pollster::block_on(c.draw(&[DrawInstruction::Text(right)])).unwrap();
        let bounds = c.last_draw_position();
        assert_eq!((bounds.x, bounds.w), (-35.0, 40.0));

        let mut end = text("abcdefgh");
        end.text_align = Some(TextAlign::End);
        end.max_num = Some(2);
        pollster::block_on(c.draw(&[DrawInstruction::Text(end)])).unwrap();
        let bounds = c.last_draw_position();
        assert_eq!((bounds.x, bounds.w), (-55.0, 60.0));
    }

    #[test]
    fn empty_image_box_is_skipped() {
        let loader = MemoryLoader::new().with("dot.png", DecodedImage::solid(4, 4, [0, 255, 0, 255]));
        let mut c = canvas_with(loader);
        let mut flat = image("dot.png", ImageMode::ScaleToFill);
        flat.w = 0.into();
        let mut cropped = image("dot.png", ImageMode::AspectFill);
        cropped.h = (-10).into();
        let list = [DrawInstruction::Image(flat), DrawInstruction::Image(cropped), rect(1, 2, 3, 4)];
        pollster::block_on(c.draw(&list)).unwrap();

        match ops(&c) {
            [DrawOp::ClearRect { .. }, DrawOp::FillPath { .. }] => {}
            other => panic!("unexpected ops {other:?}"),
        }
        assert_eq!(c.last_draw_position(), Bounds::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(c.target().canvas().save_depth(), 0);
    }

    #[test]
    fn text_wraps_up_to_max_num() {
        let mut c = canvas();
        let opts = TextOptions {
            max_num: Some(2),
            line_height: Some("14px".into()),
            overflow: Some(OverflowPolicy::Clip),
            ..text("abcdefghijklmno")
        };
        pollster::block_on(c.draw(&[DrawInstruction::Text(opts)])).unwrap();

        assert_eq!(c.target().canvas().texts(), ["abcdef", "ghijkl"]);
        match &ops(&c)[2] {
            DrawOp::FillText { y, .. } => assert_eq!(*y, 21.0),
            other => panic!("unexpected op {other:?}"),
        }
        assert_eq!(c.last_draw_position(), Bounds::new(5.0, 7.0, 60.0, 28.0));
    }

    #[test]
    fn wrap_text_honors_line_breaks() {
        let mut c = canvas();
        let opts = TextOptions {
            max_num: Some(3),
            ..text("ab\ncd")
        };
        pollster::block_on(c.draw(&[DrawInstruction::WrapText(opts)])).unwrap();
        assert_eq!(c.target().canvas().texts(), ["ab", "cd"]);
    }

    #[test]
    fn bad_unit_stops_the_run() {
        let mut c = canvas();
        let bad = DrawInstruction::Rectangle(RectangleOptions {
            x: "1em".into(),
            y: 0.into(),
            w: 1.into(),
            h: 1.into(),
            radius: None,
            style: ShapeStyle::default(),
        });
        let err = pollster::block_on(c.draw(&[bad, rect(0, 0, 1, 1)])).unwrap_err();
        assert!(matches!(err, CanvasError::UnsupportedUnit(_)));
        assert_eq!(ops(&c).len(), 1);
        assert_eq!(c.target().canvas().save_depth(), 0);
    }

    #[test]
    fn draw_json_skips_unknown_and_ignores_non_arrays() {
        let mut c = canvas();
        pollster::block_on(c.draw_json(&json!({"type": "RECTANGLE"}))).unwrap();
        pollster::block_on(c.draw_json(&json!([]))).unwrap();
        assert!(ops(&c).is_empty());

        let list = json!([
            {"type": "HEXAGON", "x": 0},
            {"type": "RECTANGLE", "x": 1, "y": 2, "w": 3, "h": 4},
        ]);
        pollster::block_on(c.draw_json(&list)).unwrap();
        assert_eq!(ops(&c).len(), 2);
        assert_eq!(c.last_draw_position(), Bounds::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn clean_resets_bounds() {
        let mut c = canvas();
        pollster::block_on(c.draw(&[rect(1, 2, 3, 4)])).unwrap();
        c.clean().unwrap();
        assert_eq!(c.last_draw_position(), Bounds::ZERO);
        assert!(matches!(ops(&c).last(), Some(DrawOp::ClearRect { .. })));
    }

    #[test]
    fn resize_invalidates_viewport_units() {
        let mut c = canvas();
        assert_eq!(c.to_px(&"50vw".into()).unwrap(), 150.0);
        c.resize(Size::new(100.0, 100.0), Viewport::new(375.0, 2.0)).unwrap();
        assert_eq!(c.to_px(&"50vw".into()).unwrap(), 50.0);
        assert_eq!(c.to_px(&Length::Design(100.0)).unwrap(), 50.0);
    }

    #[test]
    fn text_height_uses_canvas_measurement() {
        let mut c = canvas();
        let opts = TextHeightOptions {
            text: "abcdefghij".to_string(),
            max_width: 30.0,
            max_lines: None,
            has_break: false,
            font: FontSpec::new(10.0, "sans-serif", "normal"),
            line_height: Some(15.0),
        };
        assert_eq!(c.measure_text_height(&opts).unwrap(), 60.0);
    }

    #[test]
    fn recording_target_cannot_export() {
        let c = canvas();
        assert!(matches!(c.to_data_url("image/png", 1.0), Err(CanvasError::Unsupported(_))));
        assert_eq!(c.get_image_data(0, 0, 2, 2).unwrap().data.len(), 16);
    }
}
