//! Cairo backend implementing the CanvasRenderingContext2D-like traits behind
//! the optional `cairo` crate feature.
//!
//! Cairo has no notion of fill/stroke styles, global alpha or shadows, so
//! those live in a state stack kept in step with `cairo_save`/`cairo_restore`.
//! Shadows are drawn hard-edged: the offset is honored, the blur radius is not.

use cairo::{Context, Extend, Filter, FillRule as CairoFillRule, Format, ImageSurface, Operator, SurfacePattern};

use crate::api::*;
use crate::error::{CanvasError, Result};
use crate::geometry::Bounds;
use crate::text::FontSpec;

#[derive(Clone, Debug)]
struct PaintState {
    fill_style: Paint,
    stroke_style: Paint,
    global_alpha: f64,
    shadow_offset_x: f64,
    shadow_offset_y: f64,
    shadow_blur: f64,
    shadow_color: String,
    font: String,
    text_align: TextAlign,
    text_baseline: TextBaseline,
}

impl Default for PaintState {
    fn default() -> Self {
        Self {
            fill_style: Paint::Color("#000000".into()),
            stroke_style: Paint::Color("#000000".into()),
            global_alpha: 1.0,
            shadow_offset_x: 0.0,
            shadow_offset_y: 0.0,
            shadow_blur: 0.0,
            shadow_color: "rgba(0,0,0,0)".into(),
            font: FontSpec::default().to_css(),
            text_align: TextAlign::Left,
            text_baseline: TextBaseline::Alphabetic,
        }
    }
}

#[derive(Clone, Copy)]
enum PaintOp {
    Fill,
    Stroke,
}

/// Adapter that translates CanvasRenderingContext2D calls into Cairo
/// operations on an ARGB32 image surface.
pub struct CairoCanvas {
    ctx: Context,
    surface: ImageSurface,
    state: PaintState,
    stack: Vec<PaintState>,
}

impl CairoCanvas {
    pub fn new(surface: &ImageSurface) -> Result<Self> {
        let ctx = Context::new(surface)?;
        Ok(Self {
            ctx,
            surface: surface.clone(),
            state: PaintState::default(),
            stack: Vec::new(),
        })
    }

    /// A canvas on a fresh, fully transparent surface of `width` x `height` pixels.
    pub fn with_size(width: u32, height: u32) -> Result<Self> {
        let surface = ImageSurface::create(Format::ARgb32, width.max(1) as i32, height.max(1) as i32)?;
        Self::new(&surface)
    }

    pub fn surface(&self) -> &ImageSurface {
        &self.surface
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (self.surface.width() as u32, self.surface.height() as u32)
    }

    /// Encodes the whole surface as a PNG data URL.
    #[cfg(feature = "png")]
    pub fn to_png_data_url(&self) -> Result<String> {
        let (w, h) = self.pixel_size();
        let data = self.get_image_data(0, 0, w, h)?;
        crate::images::encode_png_data_url(w, h, &data.data)
    }

    /// Runs `setup` on a fresh path inside a cairo save/restore, then paints
    /// the source with the global alpha. The current path survives; restore
    /// runs even when `setup` fails.
    fn paint_isolated(&self, setup: impl FnOnce(&Context) -> Result<()>) -> Result<()> {
        let path = self.ctx.copy_path()?;
        self.ctx.save()?;
        self.ctx.new_path();
        let painted = setup(&self.ctx).and_then(|()| Ok(self.ctx.paint_with_alpha(self.state.global_alpha)?));
        self.ctx.restore()?;
        self.ctx.append_path(&path);
        painted
    }

    fn apply_paint(&self, paint: &Paint) -> Result<()> {
        match paint {
            Paint::Color(s) => {
                let (r, g, b, a) = parse_color(s);
                self.ctx.set_source_rgba(r, g, b, a * self.state.global_alpha);
            }
            Paint::Gradient(grad) => match &grad.kind {
                GradientKind::Linear { x0, y0, x1, y1 } => {
                    let pattern = cairo::LinearGradient::new(*x0, *y0, *x1, *y1);
                    for stop in &grad.stops {
                        let (r, g, b, a) = parse_color(&stop.color);
                        pattern.add_color_stop_rgba(stop.offset, r, g, b, a * self.state.global_alpha);
                    }
                    self.ctx.set_source(&pattern)?;
                }
                GradientKind::Radial {
                    x0,
                    y0,
                    r0,
                    x1,
                    y1,
                    r1,
                } => {
                    let pattern = cairo::RadialGradient::new(*x0, *y0, *r0, *x1, *y1, *r1);
                    for stop in &grad.stops {
                        let (r, g, b, a) = parse_color(&stop.color);
                        pattern.add_color_stop_rgba(stop.offset, r, g, b, a * self.state.global_alpha);
                    }
                    self.ctx.set_source(&pattern)?;
                }
            },
        }

        Ok(())
    }

    fn apply_font(&self) {
        let font = FontSpec::parse(&self.state.font);
        let weight = if font.is_bold() {
            cairo::FontWeight::Bold
        } else {
            cairo::FontWeight::Normal
        };
        self.ctx
            .select_font_face(&font.family, cairo::FontSlant::Normal, weight);
        self.ctx.set_font_size(font.size);
    }

    fn has_shadow(&self) -> bool {
        let s = &self.state;
        let visible = parse_color(&s.shadow_color).3 > 0.0;
        visible && (s.shadow_offset_x != 0.0 || s.shadow_offset_y != 0.0 || s.shadow_blur > 0.0)
    }

    /// Paints the current path offset by the shadow offset, then puts the
    /// path back so the caller can paint it normally.
    fn paint_shadow(&self, op: PaintOp) -> Result<()> {
        if !self.has_shadow() {
            return Ok(());
        }
        let path = self.ctx.copy_path()?;
        let (r, g, b, a) = parse_color(&self.state.shadow_color);

        self.ctx.save()?;
        self.ctx.new_path();
        self.ctx
            .translate(self.state.shadow_offset_x, self.state.shadow_offset_y);
        self.ctx.append_path(&path);
        self.ctx.set_source_rgba(r, g, b, a * self.state.global_alpha);
        match op {
            PaintOp::Fill => self.ctx.fill()?,
            PaintOp::Stroke => self.ctx.stroke()?,
        }
        self.ctx.restore()?;

        self.ctx.new_path();
        self.ctx.append_path(&path);
        Ok(())
    }
}

impl CanvasState for CairoCanvas {
    fn save(&mut self) -> Result<()> {
        self.ctx.save()?;
        self.stack.push(self.state.clone());
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        if let Some(state) = self.stack.pop() {
            self.state = state;
            self.ctx.restore()?;
        }
        Ok(())
    }

    fn set_global_alpha(&mut self, value: f64) -> Result<()> {
        self.state.global_alpha = value.clamp(0.0, 1.0);
        Ok(())
    }

    fn global_alpha(&self) -> Result<f64> {
        Ok(self.state.global_alpha)
    }
}

impl CanvasTransforms for CairoCanvas {
    fn scale(&mut self, x: f64, y: f64) -> Result<()> {
        self.ctx.scale(x, y);
        Ok(())
    }
}

fn image_surface_from_rgba(image: &dyn CanvasImageSource) -> Result<ImageSurface> {
    let width = image.width();
    let height = image.height();
    let data = image
        .data_rgba()
        .ok_or_else(|| CanvasError::invalid_input("CanvasImageSource missing RGBA data"))?;

    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| CanvasError::invalid_input("image dimensions overflow"))?;

    if data.len() != expected {
        return Err(CanvasError::invalid_input(
            "RGBA buffer length does not match width*height*4",
        ));
    }

    let mut buf = vec![0u8; expected];
    for (src, dst) in data.chunks_exact(4).zip(buf.chunks_exact_mut(4)) {
        let a = src[3] as u32;
        let premul = |c: u8| ((c as u32 * a + 127) / 255) as u8;
        let px = (a << 24) | ((premul(src[0]) as u32) << 16) | ((premul(src[1]) as u32) << 8) | premul(src[2]) as u32;
        // Cairo ARgb32 is a premultiplied native-endian u32 per pixel.
        dst.copy_from_slice(&px.to_ne_bytes());
    }

    let stride = (width * 4) as i32;
    let surface = ImageSurface::create_for_data(buf, Format::ARgb32, width as i32, height as i32, stride)?;
    Ok(surface)
}

fn make_image_pattern(surface: &ImageSurface) -> SurfacePattern {
    let pattern = SurfacePattern::create(surface);
    pattern.set_filter(Filter::Good);
    pattern.set_extend(Extend::None);
    pattern
}

impl CanvasCompositing for CairoCanvas {
    fn set_shadow_offset_x(&mut self, value: f64) -> Result<()> {
        self.state.shadow_offset_x = value;
        Ok(())
    }

    fn set_shadow_offset_y(&mut self, value: f64) -> Result<()> {
        self.state.shadow_offset_y = value;
        Ok(())
    }

    fn set_shadow_blur(&mut self, value: f64) -> Result<()> {
        self.state.shadow_blur = value;
        Ok(())
    }

    fn set_shadow_color(&mut self, value: String) -> Result<()> {
        self.state.shadow_color = value;
        Ok(())
    }

    fn shadow_color(&self) -> Result<String> {
        Ok(self.state.shadow_color.clone())
    }
}

impl CanvasLineStyles for CairoCanvas {
    fn set_line_width(&mut self, value: f64) -> Result<()> {
        self.ctx.set_line_width(value);
        Ok(())
    }

    fn line_width(&self) -> Result<f64> {
        Ok(self.ctx.line_width())
    }

    fn set_line_dash(&mut self, segments: Vec<f64>) -> Result<()> {
        self.ctx.set_dash(&segments, 0.0);
        Ok(())
    }

    fn line_dash(&self) -> Result<Vec<f64>> {
        Ok(self.ctx.dash().0)
    }
}

impl CanvasFillStrokeStyles for CairoCanvas {
    fn set_fill_style(&mut self, style: Paint) -> Result<()> {
        self.state.fill_style = style;
        Ok(())
    }

    fn fill_style(&self) -> Result<Paint> {
        Ok(self.state.fill_style.clone())
    }

    fn set_stroke_style(&mut self, style: Paint) -> Result<()> {
        self.state.stroke_style = style;
        Ok(())
    }

    fn stroke_style(&self) -> Result<Paint> {
        Ok(self.state.stroke_style.clone())
    }
}

impl CanvasRectangles for CairoCanvas {
    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        let path = self.ctx.copy_path()?;
        self.ctx.save()?;
        self.ctx.new_path();
        self.ctx.rectangle(x, y, w, h);
        self.ctx.set_operator(Operator::Clear);
        self.ctx.fill()?;
        self.ctx.restore()?;
        self.ctx.append_path(&path);
        Ok(())
    }
}

impl CanvasPaths for CairoCanvas {
    fn begin_path(&mut self) -> Result<()> {
        self.ctx.new_path();
        Ok(())
    }

    fn close_path(&mut self) -> Result<()> {
        self.ctx.close_path();
        Ok(())
    }

    fn move_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.ctx.move_to(x, y);
        Ok(())
    }

    fn line_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.ctx.line_to(x, y);
        Ok(())
    }

    fn arc(
        &mut self,
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        ccw: bool,
    ) -> Result<()> {
        if ccw {
            self.ctx.arc_negative(x, y, radius, start_angle, end_angle);
        } else {
            self.ctx.arc(x, y, radius, start_angle, end_angle);
        }
        Ok(())
    }

    fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) -> Result<()> {
        if !self.ctx.has_current_point()? {
            self.ctx.move_to(x1, y1);
        }
        let (x0, y0) = self.ctx.current_point()?;
        let r = radius;

        // Degenerate cases: treat as straight segments.
        if r == 0.0
            || ((x0 - x1).abs() < 1e-9 && (y0 - y1).abs() < 1e-9)
            || ((x1 - x2).abs() < 1e-9 && (y1 - y2).abs() < 1e-9)
        {
            self.line_to(x1, y1)?;
            return Ok(());
        }

        let v1 = (x0 - x1, y0 - y1);
        let v2 = (x2 - x1, y2 - y1);
        let len1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
        let len2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
        let v1n = (v1.0 / len1, v1.1 / len1);
        let v2n = (v2.0 / len2, v2.1 / len2);
        let dot = (v1n.0 * v2n.0 + v1n.1 * v2n.1).clamp(-1.0, 1.0);

        // Collinear: draw straight.
        if (1.0 - dot).abs() < 1e-6 || (1.0 + dot).abs() < 1e-6 {
            self.line_to(x1, y1)?;
            return Ok(());
        }

        let angle = dot.acos();
        let tan_half = (angle / 2.0).tan();
        if tan_half.abs() < 1e-9 {
            self.line_to(x1, y1)?;
            return Ok(());
        }
        let dist = r / tan_half;

        let tp1 = (x1 + v1n.0 * dist, y1 + v1n.1 * dist);
        let tp2 = (x1 + v2n.0 * dist, y1 + v2n.1 * dist);

        let cross = v1n.0 * v2n.1 - v1n.1 * v2n.0;
        let n1 = if cross < 0.0 {
            (v1n.1, -v1n.0)
        } else {
            (-v1n.1, v1n.0)
        };
        let center = (tp1.0 + n1.0 * r, tp1.1 + n1.1 * r);
        let start_ang = (tp1.1 - center.1).atan2(tp1.0 - center.0);
        let end_ang = (tp2.1 - center.1).atan2(tp2.0 - center.0);

        self.line_to(tp1.0, tp1.1)?;
        if cross > 0.0 {
            self.ctx.arc(center.0, center.1, r, start_ang, end_ang);
        } else {
            self.ctx.arc_negative(center.0, center.1, r, start_ang, end_ang);
        }
        Ok(())
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.ctx.rectangle(x, y, w, h);
        Ok(())
    }

    fn fill(&mut self, fill_rule: FillRule) -> Result<()> {
        self.ctx.set_fill_rule(map_fill_rule(fill_rule));
        self.paint_shadow(PaintOp::Fill)?;
        self.apply_paint(&self.state.fill_style)?;
        self.ctx.fill_preserve()?;
        Ok(())
    }

    fn stroke(&mut self) -> Result<()> {
        self.paint_shadow(PaintOp::Stroke)?;
        self.apply_paint(&self.state.stroke_style)?;
        self.ctx.stroke_preserve()?;
        Ok(())
    }

    fn clip(&mut self, fill_rule: FillRule) -> Result<()> {
        self.ctx.set_fill_rule(map_fill_rule(fill_rule));
        self.ctx.clip_preserve();
        Ok(())
    }
}

impl CanvasText for CairoCanvas {
    fn set_font(&mut self, value: String) -> Result<()> {
        self.state.font = value;
        Ok(())
    }

    fn font(&self) -> Result<String> {
        Ok(self.state.font.clone())
    }

    fn set_text_align(&mut self, value: TextAlign) -> Result<()> {
        self.state.text_align = value;
        Ok(())
    }

    fn text_align(&self) -> Result<TextAlign> {
        Ok(self.state.text_align)
    }

    fn set_text_baseline(&mut self, value: TextBaseline) -> Result<()> {
        self.state.text_baseline = value;
        Ok(())
    }

    fn text_baseline(&self) -> Result<TextBaseline> {
        Ok(self.state.text_baseline)
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<()> {
        self.apply_font();
        self.apply_paint(&self.state.fill_style)?;
        let (tx, ty) = adjust_text_position(
            &self.ctx,
            text,
            x,
            y,
            self.state.text_align,
            self.state.text_baseline,
        )?;
        self.ctx.new_path();
        self.ctx.move_to(tx, ty);
        self.ctx.show_text(text)?;
        self.ctx.new_path();
        Ok(())
    }

    fn measure_text(&self, text: &str) -> Result<TextMetrics> {
        self.apply_font();
        let extents = self.ctx.text_extents(text)?;
        Ok(TextMetrics {
            width: extents.x_advance(),
        })
    }
}

impl CanvasImageData for CairoCanvas {
    /// Reads back straight-alpha RGBA in surface pixels; the area outside the
    /// surface reads as transparent.
    fn get_image_data(&self, sx: u32, sy: u32, sw: u32, sh: u32) -> Result<ImageData> {
        let (width, height) = self.pixel_size();
        let stride = self.surface.stride() as usize;
        let mut out = vec![0u8; sw as usize * sh as usize * 4];

        self.surface.flush();
        self.surface.with_data(|data| {
            for row in 0..sh {
                let y = sy + row;
                if y >= height {
                    break;
                }
                for col in 0..sw {
                    let x = sx + col;
                    if x >= width {
                        break;
                    }
                    let src = y as usize * stride + x as usize * 4;
                    let px = u32::from_ne_bytes([data[src], data[src + 1], data[src + 2], data[src + 3]]);
                    let dst = (row as usize * sw as usize + col as usize) * 4;
                    out[dst..dst + 4].copy_from_slice(&unpremultiply(px));
                }
            }
        })?;

        Ok(ImageData {
            width: sw,
            height: sh,
            data: out,
        })
    }
}

fn unpremultiply(px: u32) -> [u8; 4] {
    let a = px >> 24;
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let channel = |shift: u32| (((px >> shift) & 0xff) * 255 + a / 2) / a;
    [
        channel(16).min(255) as u8,
        channel(8).min(255) as u8,
        channel(0).min(255) as u8,
        a as u8,
    ]
}

impl CanvasDrawImage for CairoCanvas {
    fn draw_image_scaled(
        &mut self,
        image: &dyn CanvasImageSource,
        dx: f64,
        dy: f64,
        dw: f64,
        dh: f64,
    ) -> Result<()> {
        let (iw, ih) = (image.width() as f64, image.height() as f64);
        if !Bounds::new(dx, dy, dw, dh).is_drawable() || iw == 0.0 || ih == 0.0 {
            return Ok(());
        }
        let surface = image_surface_from_rgba(image)?;
        let pattern = make_image_pattern(&surface);

        self.paint_isolated(|ctx| {
            ctx.translate(dx, dy);
            ctx.scale(dw / iw, dh / ih);
            ctx.set_source(&pattern)?;
            ctx.rectangle(0.0, 0.0, iw, ih);
            ctx.clip();
            Ok(())
        })
    }

    fn draw_image_subrect(
        &mut self,
        image: &dyn CanvasImageSource,
        sx: f64,
        sy: f64,
        sw: f64,
        sh: f64,
        dx: f64,
        dy: f64,
        dw: f64,
        dh: f64,
    ) -> Result<()> {
        if !Bounds::new(sx, sy, sw, sh).is_drawable() || !Bounds::new(dx, dy, dw, dh).is_drawable() {
            return Ok(());
        }
        let surface = image_surface_from_rgba(image)?;
        let pattern = make_image_pattern(&surface);

        self.paint_isolated(|ctx| {
            ctx.rectangle(dx, dy, dw, dh);
            ctx.clip();
            ctx.translate(dx, dy);
            ctx.scale(dw / sw, dh / sh);
            ctx.translate(-sx, -sy);
            ctx.set_source(&pattern)?;
            Ok(())
        })
    }
}

fn map_fill_rule(rule: FillRule) -> CairoFillRule {
    match rule {
        FillRule::NonZero => CairoFillRule::Winding,
        FillRule::EvenOdd => CairoFillRule::EvenOdd,
    }
}

/// Parses the CSS colors instructions use in practice: `#rgb`, `#rrggbb`,
/// `#rrggbbaa`, `rgb()`, `rgba()` and a handful of names. Anything else is
/// opaque black.
fn parse_color(color: &str) -> (f64, f64, f64, f64) {
    const BLACK: (f64, f64, f64, f64) = (0.0, 0.0, 0.0, 1.0);
    let c = color.trim();
    let byte = |hex: &str| u8::from_str_radix(hex, 16).ok().map(|v| v as f64 / 255.0);

    if let Some(hex) = c.strip_prefix('#') {
        if !hex.is_ascii() {
            return BLACK;
        }
        let parsed = match hex.len() {
            3 => {
                let digit = |i: usize| {
                    let d = &hex[i..i + 1];
                    byte(format!("{d}{d}").as_str())
                };
                digit(0).zip(digit(1)).zip(digit(2)).map(|((r, g), b)| (r, g, b, 1.0))
            }
            6 => byte(&hex[0..2])
                .zip(byte(&hex[2..4]))
                .zip(byte(&hex[4..6]))
                .map(|((r, g), b)| (r, g, b, 1.0)),
            8 => byte(&hex[0..2])
                .zip(byte(&hex[2..4]))
                .zip(byte(&hex[4..6]))
                .zip(byte(&hex[6..8]))
                .map(|(((r, g), b), a)| (r, g, b, a)),
            _ => None,
        };
        return parsed.unwrap_or(BLACK);
    }

    let functional = c
        .strip_prefix("rgba(")
        .or_else(|| c.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'));
    if let Some(args) = functional {
        let parts: Vec<f64> = args
            .split(',')
            .filter_map(|p| p.trim().parse::<f64>().ok())
            .collect();
        return match parts.as_slice() {
            [r, g, b] => (r / 255.0, g / 255.0, b / 255.0, 1.0),
            [r, g, b, a] => (r / 255.0, g / 255.0, b / 255.0, a.clamp(0.0, 1.0)),
            _ => BLACK,
        };
    }

    match c.to_ascii_lowercase().as_str() {
        "white" => (1.0, 1.0, 1.0, 1.0),
        "red" => (1.0, 0.0, 0.0, 1.0),
        "green" => (0.0, 128.0 / 255.0, 0.0, 1.0),
        "blue" => (0.0, 0.0, 1.0, 1.0),
        "gray" | "grey" => (128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0, 1.0),
        "transparent" => (0.0, 0.0, 0.0, 0.0),
        _ => BLACK,
    }
}

fn adjust_text_position(
    ctx: &Context,
    text: &str,
    x: f64,
    y: f64,
    align: TextAlign,
    baseline: TextBaseline,
) -> Result<(f64, f64)> {
    let extents = ctx.text_extents(text)?;
    let font = ctx.font_extents()?;
    let mut tx = x;
    let mut ty = y;

    tx -= match align {
        TextAlign::Left | TextAlign::Start => 0.0,
        TextAlign::Center => extents.x_advance() / 2.0,
        TextAlign::Right | TextAlign::End => extents.x_advance(),
    };

    ty += match baseline {
        TextBaseline::Top => font.ascent(),
        TextBaseline::Hanging => font.ascent() * 0.8,
        TextBaseline::Middle => (font.ascent() - font.descent()) / 2.0,
        TextBaseline::Alphabetic => 0.0,
        TextBaseline::Ideographic => -font.descent() * 0.5,
        TextBaseline::Bottom => -font.descent(),
    };

    Ok((tx, ty))
}

impl CanvasRenderingContext2D for CairoCanvas {}
