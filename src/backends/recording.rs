//! A context that renders nothing and records every paint operation along
//! with the drawing state in effect at the time.
//!
//! Text measurement is synthetic: every `char` advances by the current font
//! size, so layout results are exact and predictable.

use crate::api::*;
use crate::error::Result;
use crate::text::FontSpec;

#[derive(Debug, Clone, PartialEq)]
pub enum PathCommand {
    MoveTo {
        x: f64,
        y: f64,
    },
    LineTo {
        x: f64,
        y: f64,
    },
    Arc {
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        ccw: bool,
    },
    ArcTo {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        radius: f64,
    },
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    },
    ClosePath,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPath {
    pub commands: Vec<PathCommand>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipState {
    pub path: RecordedPath,
    pub rule: FillRule,
}

/// Drawing state captured with each op.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub global_alpha: f64,
    pub shadow_offset_x: f64,
    pub shadow_offset_y: f64,
    pub shadow_blur: f64,
    pub shadow_color: String,
    pub line_width: f64,
    pub line_dash: Vec<f64>,
    pub fill_style: Paint,
    pub stroke_style: Paint,
    pub font: String,
    pub text_align: TextAlign,
    pub text_baseline: TextBaseline,
    pub transform: [f64; 6],
    pub clip: Option<ClipState>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            global_alpha: 1.0,
            shadow_offset_x: 0.0,
            shadow_offset_y: 0.0,
            shadow_blur: 0.0,
            shadow_color: "rgba(0,0,0,0)".to_string(),
            line_width: 1.0,
            line_dash: Vec::new(),
            fill_style: Paint::Color("#000".to_string()),
            stroke_style: Paint::Color("#000".to_string()),
            font: FontSpec::default().to_css(),
            text_align: TextAlign::Left,
            text_baseline: TextBaseline::Alphabetic,
            transform: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            clip: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    FillPath {
        path: RecordedPath,
        state: Snapshot,
        rule: FillRule,
    },
    StrokePath {
        path: RecordedPath,
        state: Snapshot,
    },
    Clip {
        path: RecordedPath,
        state: Snapshot,
        rule: FillRule,
    },
    FillText {
        text: String,
        x: f64,
        y: f64,
        state: Snapshot,
    },
    DrawImageScaled {
        source_width: u32,
        source_height: u32,
        dx: f64,
        dy: f64,
        dw: f64,
        dh: f64,
        state: Snapshot,
    },
    DrawImageSubrect {
        source_width: u32,
        source_height: u32,
        sx: f64,
        sy: f64,
        sw: f64,
        sh: f64,
        dx: f64,
        dy: f64,
        dw: f64,
        dh: f64,
        state: Snapshot,
    },
    ClearRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    },
}

impl DrawOp {
    /// State in effect when the op was recorded; `None` for `ClearRect`.
    pub fn state(&self) -> Option<&Snapshot> {
        match self {
            DrawOp::FillPath { state, .. }
            | DrawOp::StrokePath { state, .. }
            | DrawOp::Clip { state, .. }
            | DrawOp::FillText { state, .. }
            | DrawOp::DrawImageScaled { state, .. }
            | DrawOp::DrawImageSubrect { state, .. } => Some(state),
            DrawOp::ClearRect { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingCanvas {
    ops: Vec<DrawOp>,
    state: Snapshot,
    stack: Vec<Snapshot>,
    current_path: Vec<PathCommand>,
    current_point: Option<(f64, f64)>,
    subpath_start: Option<(f64, f64)>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<DrawOp> {
        self.ops
    }

    /// Depth of the save stack; zero when every save has been restored.
    pub fn save_depth(&self) -> usize {
        self.stack.len()
    }

    /// Texts of every `FillText` op, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn snapshot(&self) -> Snapshot {
        self.state.clone()
    }

    fn set_current_point(&mut self, x: f64, y: f64) {
        self.current_point = Some((x, y));
    }

    fn multiply_transform(&mut self, m: [f64; 6]) {
        let [a, b, c, d, e, f] = self.state.transform;
        let [na, nb, nc, nd, ne, nf] = m;
        self.state.transform = [
            a * na + c * nb,
            b * na + d * nb,
            a * nc + c * nd,
            b * nc + d * nd,
            a * ne + c * nf + e,
            b * ne + d * nf + f,
        ];
    }

    fn current(&self) -> RecordedPath {
        RecordedPath {
            commands: self.current_path.clone(),
        }
    }
}

impl CanvasState for RecordingCanvas {
    fn save(&mut self) -> Result<()> {
        self.stack.push(self.state.clone());
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
        Ok(())
    }

    fn set_global_alpha(&mut self, value: f64) -> Result<()> {
        self.state.global_alpha = value;
        Ok(())
    }

    fn global_alpha(&self) -> Result<f64> {
        Ok(self.state.global_alpha)
    }
}

impl CanvasTransforms for RecordingCanvas {
    fn scale(&mut self, x: f64, y: f64) -> Result<()> {
        self.multiply_transform([x, 0.0, 0.0, y, 0.0, 0.0]);
        Ok(())
    }
}

impl CanvasCompositing for RecordingCanvas {
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

impl CanvasLineStyles for RecordingCanvas {
    fn set_line_width(&mut self, value: f64) -> Result<()> {
        self.state.line_width = value;
        Ok(())
    }

    fn line_width(&self) -> Result<f64> {
        Ok(self.state.line_width)
    }

    fn set_line_dash(&mut self, segments: Vec<f64>) -> Result<()> {
        self.state.line_dash = segments;
        Ok(())
    }

    fn line_dash(&self) -> Result<Vec<f64>> {
        Ok(self.state.line_dash.clone())
    }
}

impl CanvasFillStrokeStyles for RecordingCanvas {
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

impl CanvasRectangles for RecordingCanvas {
    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.ops.push(DrawOp::ClearRect { x, y, w, h });
        Ok(())
    }
}

impl CanvasPaths for RecordingCanvas {
    fn begin_path(&mut self) -> Result<()> {
        self.current_path.clear();
        self.current_point = None;
        self.subpath_start = None;
        Ok(())
    }

    fn close_path(&mut self) -> Result<()> {
        self.current_path.push(PathCommand::ClosePath);
        if let Some((x, y)) = self.subpath_start {
            self.set_current_point(x, y);
        }
        Ok(())
    }

    fn move_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.current_path.push(PathCommand::MoveTo { x, y });
        self.subpath_start = Some((x, y));
        self.set_current_point(x, y);
        Ok(())
    }

    fn line_to(&mut self, x: f64, y: f64) -> Result<()> {
        if self.current_point.is_none() {
            self.move_to(x, y)?;
        }
        self.current_path.push(PathCommand::LineTo { x, y });
        self.set_current_point(x, y);
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
        self.current_path.push(PathCommand::Arc {
            x,
            y,
            radius,
            start_angle,
            end_angle,
            ccw,
        });
        self.set_current_point(x + radius * end_angle.cos(), y + radius * end_angle.sin());
        Ok(())
    }

    fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) -> Result<()> {
        if self.current_point.is_none() {
            self.move_to(x1, y1)?;
        }
        self.current_path.push(PathCommand::ArcTo {
            x1,
            y1,
            x2,
            y2,
            radius,
        });
        self.set_current_point(x2, y2);
        Ok(())
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.current_path.push(PathCommand::Rect { x, y, w, h });
        self.subpath_start = Some((x, y));
        self.set_current_point(x, y);
        Ok(())
    }

    fn fill(&mut self, fill_rule: FillRule) -> Result<()> {
        if self.current_path.is_empty() {
            return Ok(());
        }
        let op = DrawOp::FillPath {
            path: self.current(),
            state: self.snapshot(),
            rule: fill_rule,
        };
        self.ops.push(op);
        Ok(())
    }

    fn stroke(&mut self) -> Result<()> {
        if self.current_path.is_empty() {
            return Ok(());
        }
        let op = DrawOp::StrokePath {
            path: self.current(),
            state: self.snapshot(),
        };
        self.ops.push(op);
        Ok(())
    }

    fn clip(&mut self, fill_rule: FillRule) -> Result<()> {
        if self.current_path.is_empty() {
            return Ok(());
        }
        let path = self.current();
        self.state.clip = Some(ClipState {
            path: path.clone(),
            rule: fill_rule,
        });
        let op = DrawOp::Clip {
            path,
            state: self.snapshot(),
            rule: fill_rule,
        };
        self.ops.push(op);
        Ok(())
    }
}

impl CanvasText for RecordingCanvas {
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
        let op = DrawOp::FillText {
            text: text.to_string(),
            x,
            y,
            state: self.snapshot(),
        };
        self.ops.push(op);
        Ok(())
    }

    fn measure_text(&self, text: &str) -> Result<TextMetrics> {
        let size = FontSpec::parse(&self.state.font).size;
        Ok(TextMetrics {
            width: text.chars().count() as f64 * size,
        })
    }
}

impl CanvasImageData for RecordingCanvas {
    fn get_image_data(&self, _sx: u32, _sy: u32, sw: u32, sh: u32) -> Result<ImageData> {
        Ok(ImageData {
            width: sw,
            height: sh,
            data: vec![0; sw as usize * sh as usize * 4],
        })
    }
}

impl CanvasDrawImage for RecordingCanvas {
    fn draw_image_scaled(
        &mut self,
        image: &dyn CanvasImageSource,
        dx: f64,
        dy: f64,
        dw: f64,
        dh: f64,
    ) -> Result<()> {
        let op = DrawOp::DrawImageScaled {
            source_width: image.width(),
            source_height: image.height(),
            dx,
            dy,
            dw,
            dh,
            state: self.snapshot(),
        };
        self.ops.push(op);
        Ok(())
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
        let op = DrawOp::DrawImageSubrect {
            source_width: image.width(),
            source_height: image.height(),
            sx,
            sy,
            sw,
            sh,
            dx,
            dy,
            dw,
            dh,
            state: self.snapshot(),
        };
        self.ops.push(op);
        Ok(())
    }
}

impl CanvasRenderingContext2D for RecordingCanvas {}
