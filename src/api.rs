//! Traits and supporting types mirroring the subset of the HTML Canvas 2D
//! context that the draw interpreter needs. Backends (recording, cairo, or a
//! host webview bridge) implement these; everything above this module talks
//! only to these traits.

use serde::Deserialize;

use crate::error::Result;

/// Represents a color or gradient that can be used for fill/stroke.
///
/// Deserializes from either a CSS color string or a gradient object.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Paint {
    Color(String),
    Gradient(CanvasGradient),
}

impl From<&str> for Paint {
    fn from(color: &str) -> Self {
        Paint::Color(color.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GradientStop {
    pub offset: f64,
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GradientKind {
    Linear {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
    },
    Radial {
        x0: f64,
        y0: f64,
        r0: f64,
        x1: f64,
        y1: f64,
        r1: f64,
    },
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CanvasGradient {
    #[serde(flatten)]
    pub kind: GradientKind,
    #[serde(default)]
    pub stops: Vec<GradientStop>,
}

impl CanvasGradient {
    pub fn linear(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            kind: GradientKind::Linear { x0, y0, x1, y1 },
            stops: Vec::new(),
        }
    }

    /// Mirrors CanvasGradient.addColorStop.
    pub fn add_color_stop(&mut self, offset: f64, color: impl Into<String>) {
        self.stops.push(GradientStop {
            offset,
            color: color.into(),
        });
    }
}

/// Straight-alpha RGBA8 pixels, row-major, as returned by `getImageData`.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl ImageData {
    /// RGBA of the pixel at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        let px = self.data.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextMetrics {
    pub width: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Right,
    Center,
    Start,
    End,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextBaseline {
    Top,
    Hanging,
    #[default]
    Middle,
    Alphabetic,
    Ideographic,
    Bottom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

pub trait CanvasState {
    /// Pushes the current drawing state (styles, alpha, shadow, clip, transform). Mirrors save().
    fn save(&mut self) -> Result<()>;
    /// Pops the last saved state. A restore without a matching save is a no-op. Mirrors restore().
    fn restore(&mut self) -> Result<()>;

    /// Sets the global alpha multiplier applied to all drawing ops. Mirrors globalAlpha.
    fn set_global_alpha(&mut self, value: f64) -> Result<()>;
    fn global_alpha(&self) -> Result<f64>;
}

pub trait CanvasTransforms {
    /// Multiplies the current transform by a scaling matrix. Mirrors scale().
    fn scale(&mut self, x: f64, y: f64) -> Result<()>;
}

pub trait CanvasCompositing {
    fn set_shadow_offset_x(&mut self, value: f64) -> Result<()>;
    fn set_shadow_offset_y(&mut self, value: f64) -> Result<()>;
    fn set_shadow_blur(&mut self, value: f64) -> Result<()>;
    fn set_shadow_color(&mut self, value: String) -> Result<()>;
    fn shadow_color(&self) -> Result<String>;
}

pub trait CanvasLineStyles {
    /// Sets stroke thickness in user units. Mirrors lineWidth.
    fn set_line_width(&mut self, value: f64) -> Result<()>;
    fn line_width(&self) -> Result<f64>;

    /// Sets the line dash pattern segments. Mirrors setLineDash().
    fn set_line_dash(&mut self, segments: Vec<f64>) -> Result<()>;
    fn line_dash(&self) -> Result<Vec<f64>>;
}

pub trait CanvasFillStrokeStyles {
    fn set_fill_style(&mut self, style: Paint) -> Result<()>;
    fn fill_style(&self) -> Result<Paint>;

    fn set_stroke_style(&mut self, style: Paint) -> Result<()>;
    fn stroke_style(&self) -> Result<Paint>;
}

pub trait CanvasRectangles {
    /// Clears the specified rectangle to full transparency. Mirrors clearRect().
    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()>;
}

/// Path construction and painting. As in the browser, `fill`, `stroke` and
/// `clip` leave the current path intact; only `begin_path` discards it.
pub trait CanvasPaths {
    fn begin_path(&mut self) -> Result<()>;
    fn close_path(&mut self) -> Result<()>;
    fn move_to(&mut self, x: f64, y: f64) -> Result<()>;
    fn line_to(&mut self, x: f64, y: f64) -> Result<()>;
    /// Adds an arc centered at (x, y). Mirrors arc().
    fn arc(&mut self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64, ccw: bool) -> Result<()>;
    /// Adds an arc tangent to the lines (current point → p1) and (p1 → p2). Mirrors arcTo().
    fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) -> Result<()>;
    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()>;

    fn fill(&mut self, fill_rule: FillRule) -> Result<()>;
    fn stroke(&mut self) -> Result<()>;
    /// Intersects the clipping region with the current path. Mirrors clip().
    fn clip(&mut self, fill_rule: FillRule) -> Result<()>;
}

pub trait CanvasText {
    /// Sets the CSS font shorthand (e.g. `"bold 12px sans-serif"`). Mirrors font.
    fn set_font(&mut self, value: String) -> Result<()>;
    fn font(&self) -> Result<String>;

    fn set_text_align(&mut self, value: TextAlign) -> Result<()>;
    fn text_align(&self) -> Result<TextAlign>;

    fn set_text_baseline(&mut self, value: TextBaseline) -> Result<()>;
    fn text_baseline(&self) -> Result<TextBaseline>;

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<()>;
    /// Measures the advance width of `text` in the current font. Mirrors measureText().
    fn measure_text(&self, text: &str) -> Result<TextMetrics>;
}

pub trait CanvasImageData {
    /// Returns the pixels of the given rectangle in backing-store pixels. Mirrors getImageData().
    fn get_image_data(&self, sx: u32, sy: u32, sw: u32, sh: u32) -> Result<ImageData>;
}

pub trait CanvasDrawImage {
    /// Draws and scales the source image to the destination rectangle. Mirrors drawImage(image, dx, dy, dw, dh).
    fn draw_image_scaled(
        &mut self,
        image: &dyn CanvasImageSource,
        dx: f64,
        dy: f64,
        dw: f64,
        dh: f64,
    ) -> Result<()>;
    /// Draws a source sub-rectangle into a destination rectangle. Mirrors drawImage(image, sx, sy, sw, sh, dx, dy, dw, dh).
    #[allow(clippy::too_many_arguments)]
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
    ) -> Result<()>;
}

pub trait CanvasImageSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Straight-alpha RGBA pixels; length must be width * height * 4.
    fn data_rgba(&self) -> Option<&[u8]>;
}

impl CanvasImageSource for ImageData {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn data_rgba(&self) -> Option<&[u8]> {
        Some(self.data.as_slice())
    }
}

pub trait CanvasRenderingContext2D:
    CanvasState
    + CanvasTransforms
    + CanvasCompositing
    + CanvasRectangles
    + CanvasPaths
    + CanvasLineStyles
    + CanvasFillStrokeStyles
    + CanvasText
    + CanvasImageData
    + CanvasDrawImage
{
}
