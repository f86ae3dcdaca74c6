//! The draw instruction wire format.
//!
//! Instructions are JSON objects tagged by `type` with camelCase fields.
//! Lengths accept a bare number (design units) or a suffixed string.

use std::f64::consts::PI;

use serde::Deserialize;

use crate::api::{Paint, TextAlign, TextBaseline};
use crate::image_mode::ImageMode;
use crate::text::OverflowPolicy;
use crate::triangle::TrianglePointSpec;
use crate::units::Length;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrawInstruction {
    Image(ImageOptions),
    Text(TextOptions),
    /// Text with explicit `\n` breaks; each paragraph is wrapped on its own.
    WrapText(TextOptions),
    Triangle(TriangleOptions),
    Rectangle(RectangleOptions),
    Circle(CircleOptions),
}

impl DrawInstruction {
    /// The wire tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            DrawInstruction::Image(_) => "IMAGE",
            DrawInstruction::Text(_) => "TEXT",
            DrawInstruction::WrapText(_) => "WRAP_TEXT",
            DrawInstruction::Triangle(_) => "TRIANGLE",
            DrawInstruction::Rectangle(_) => "RECTANGLE",
            DrawInstruction::Circle(_) => "CIRCLE",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOptions {
    pub x: Length,
    pub y: Length,
    pub url: String,
    pub w: Length,
    pub h: Length,
    #[serde(default)]
    pub mode: ImageMode,
    /// Corner radius of a rounded clip around the box.
    #[serde(default)]
    pub radius: Option<Length>,
    #[serde(default)]
    pub opacity: Option<f64>,
    /// Propagate a load failure out of `draw` instead of skipping.
    #[serde(default)]
    pub throw_error: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOptions {
    pub x: Length,
    pub y: Length,
    pub value: String,
    #[serde(default)]
    pub max_num: Option<usize>,
    #[serde(default)]
    pub max_line_width: Option<Length>,
    #[serde(default)]
    pub line_height: Option<Length>,
    #[serde(default)]
    pub font_size: Option<Length>,
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub font_weight: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub indent: Option<Length>,
    #[serde(default)]
    pub overflow: Option<OverflowPolicy>,
    #[serde(default)]
    pub text_align: Option<TextAlign>,
    #[serde(default)]
    pub text_baseline: Option<TextBaseline>,
    #[serde(default)]
    pub opacity: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shadow {
    pub color: String,
    #[serde(default)]
    pub blur: Length,
    #[serde(default)]
    pub offset_x: Length,
    #[serde(default)]
    pub offset_y: Length,
}

/// Fill, stroke and effect fields shared by the path shapes.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeStyle {
    #[serde(default)]
    pub fill: Option<bool>,
    #[serde(default)]
    pub fill_style: Option<Paint>,
    #[serde(default)]
    pub stroke: Option<bool>,
    #[serde(default)]
    pub stroke_style: Option<Paint>,
    #[serde(default)]
    pub line_width: Option<Length>,
    #[serde(default)]
    pub line_dash: Option<Vec<Length>>,
    #[serde(default)]
    pub shadow: Option<Shadow>,
    #[serde(default)]
    pub opacity: Option<f64>,
}

impl ShapeStyle {
    /// Filling is on unless turned off, or unless only a stroke was asked for.
    pub fn fills(&self) -> bool {
        self.fill.unwrap_or(self.stroke != Some(true))
    }

    pub fn strokes(&self) -> bool {
        self.stroke.unwrap_or(false)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriangleOptions {
    pub points: TrianglePointSpec,
    #[serde(flatten)]
    pub style: ShapeStyle,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectangleOptions {
    pub x: Length,
    pub y: Length,
    pub w: Length,
    pub h: Length,
    /// Rounds every corner; `0` or absent draws a sharp rectangle.
    #[serde(default)]
    pub radius: Option<Length>,
    #[serde(flatten)]
    pub style: ShapeStyle,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleOptions {
    pub x: Length,
    pub y: Length,
    pub radius: Length,
    #[serde(default)]
    pub start_angle: Option<f64>,
    #[serde(default)]
    pub end_angle: Option<f64>,
    #[serde(default)]
    pub anticlockwise: bool,
    #[serde(flatten)]
    pub style: ShapeStyle,
}

impl CircleOptions {
    /// Start and end angles in radians, a full turn by default.
    pub fn angles(&self) -> (f64, f64) {
        (self.start_angle.unwrap_or(0.0), self.end_angle.unwrap_or(2.0 * PI))
    }
}
