//! Path shapes: rectangle, circle, triangle.
//!
//! Each renderer configures the context, builds one path, paints it and
//! returns the shape's bounds. Callers own save/restore.

use crate::api::{CanvasRenderingContext2D, FillRule};
use crate::error::Result;
use crate::geometry::Bounds;
use crate::instruction::{CircleOptions, RectangleOptions, ShapeStyle, TriangleOptions};
use crate::triangle;
use crate::units::UnitConverter;

/// Applies opacity, stroke geometry, shadow and paints from `style`.
pub fn apply_style<C: CanvasRenderingContext2D + ?Sized>(
    ctx: &mut C,
    units: &mut UnitConverter,
    style: &ShapeStyle,
) -> Result<()> {
    if let Some(opacity) = style.opacity {
        ctx.set_global_alpha(opacity)?;
    }
    if let Some(width) = &style.line_width {
        ctx.set_line_width(units.to_px(width)?)?;
    }
    if let Some(dash) = &style.line_dash {
        let segments = dash
            .iter()
            .map(|seg| units.to_px(seg))
            .collect::<Result<Vec<_>>>()?;
        ctx.set_line_dash(segments)?;
    }
    if let Some(shadow) = &style.shadow {
        ctx.set_shadow_color(shadow.color.clone())?;
        ctx.set_shadow_blur(units.to_px(&shadow.blur)?)?;
        ctx.set_shadow_offset_x(units.to_px(&shadow.offset_x)?)?;
        ctx.set_shadow_offset_y(units.to_px(&shadow.offset_y)?)?;
    }
    if let Some(paint) = &style.fill_style {
        ctx.set_fill_style(paint.clone())?;
    }
    if let Some(paint) = &style.stroke_style {
        ctx.set_stroke_style(paint.clone())?;
    }
    Ok(())
}

fn paint<C: CanvasRenderingContext2D + ?Sized>(ctx: &mut C, style: &ShapeStyle) -> Result<()> {
    if style.fills() {
        ctx.fill(FillRule::NonZero)?;
    }
    if style.strokes() {
        ctx.stroke()?;
    }
    Ok(())
}

/// Adds a rounded rectangle subpath built from four `arc_to` corners.
/// The radius is clamped to half the shorter side.
pub fn rounded_rect_path<C: CanvasRenderingContext2D + ?Sized>(
    ctx: &mut C,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    radius: f64,
) -> Result<()> {
    let r = radius.min(w.abs() / 2.0).min(h.abs() / 2.0).max(0.0);
    ctx.move_to(x + r, y)?;
    ctx.arc_to(x + w, y, x + w, y + h, r)?;
    ctx.arc_to(x + w, y + h, x, y + h, r)?;
    ctx.arc_to(x, y + h, x, y, r)?;
    ctx.arc_to(x, y, x + w, y, r)?;
    ctx.close_path()
}

pub fn draw_rectangle<C: CanvasRenderingContext2D + ?Sized>(
    ctx: &mut C,
    units: &mut UnitConverter,
    opts: &RectangleOptions,
) -> Result<Bounds> {
    let x = units.to_px(&opts.x)?;
    let y = units.to_px(&opts.y)?;
    let w = units.to_px(&opts.w)?;
    let h = units.to_px(&opts.h)?;
    let radius = match &opts.radius {
        Some(r) => units.to_px(r)?,
        None => 0.0,
    };

    apply_style(ctx, units, &opts.style)?;
    ctx.begin_path()?;
    if radius > 0.0 {
        rounded_rect_path(ctx, x, y, w, h, radius)?;
    } else {
        ctx.rect(x, y, w, h)?;
    }
    paint(ctx, &opts.style)?;

    Ok(Bounds::new(x, y, w, h))
}

pub fn draw_circle<C: CanvasRenderingContext2D + ?Sized>(
    ctx: &mut C,
    units: &mut UnitConverter,
    opts: &CircleOptions,
) -> Result<Bounds> {
    let x = units.to_px(&opts.x)?;
    let y = units.to_px(&opts.y)?;
    let r = units.to_px(&opts.radius)?;
    let (start, end) = opts.angles();

    apply_style(ctx, units, &opts.style)?;
    ctx.begin_path()?;
    ctx.arc(x, y, r, start, end, opts.anticlockwise)?;
    paint(ctx, &opts.style)?;

    Ok(Bounds::new(x - r, y - r, 2.0 * r, 2.0 * r))
}

pub fn draw_triangle<C: CanvasRenderingContext2D + ?Sized>(
    ctx: &mut C,
    units: &mut UnitConverter,
    opts: &TriangleOptions,
) -> Result<Bounds> {
    let [a, b, c] = triangle::vertices(&opts.points, units)?;

    apply_style(ctx, units, &opts.style)?;
    ctx.begin_path()?;
    ctx.move_to(a.x, a.y)?;
    ctx.line_to(b.x, b.y)?;
    ctx.line_to(c.x, c.y)?;
    ctx.close_path()?;
    paint(ctx, &opts.style)?;

    Ok(triangle::bounds(&[a, b, c]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CanvasPaths, Paint};
    use crate::backends::recording::{DrawOp, PathCommand, RecordingCanvas};
    use crate::error::CanvasError;
    use crate::geometry::Size;
    use crate::instruction::Shadow;
    use crate::triangle::{PointSpec, TrianglePointSpec};
    use crate::units::{Length, Viewport};

    fn units() -> UnitConverter {
        UnitConverter::new(750.0, Viewport::new(375.0, 2.0), Size::new(300.0, 300.0), 64)
    }

    fn rect(radius: Option<Length>, style: ShapeStyle) -> RectangleOptions {
        RectangleOptions {
            x: "10px".into(),
            y: "20px".into(),
            w: 100.into(),
            h: "40px".into(),
            radius,
            style,
        }
    }

    #[test]
    fn sharp_rectangle_fills_by_default() {
        let mut c = RecordingCanvas::new();
        let bounds = draw_rectangle(&mut c, &mut units(), &rect(None, ShapeStyle::default())).unwrap();
        assert_eq!(bounds, Bounds::new(10.0, 20.0, 50.0, 40.0));

        match c.ops() {
            [DrawOp::FillPath { path, .. }] => {
                assert_eq!(
                    path.commands,
                    vec![PathCommand::Rect {
                        x: 10.0,
                        y: 20.0,
                        w: 50.0,
                        h: 40.0
                    }]
                );
            }
            other => panic!("unexpected ops {other:?}"),
        }
    }

    #[test]
    fn rounded_rectangle_uses_arc_to_corners() {
        let mut c = RecordingCanvas::new();
        draw_rectangle(&mut c, &mut units(), &rect(Some("8px".into()), ShapeStyle::default())).unwrap();
        let DrawOp::FillPath { path, .. } = &c.ops()[0] else {
            panic!("expected a fill");
        };
        let arcs = path
            .commands
            .iter()
            .filter(|cmd| matches!(cmd, PathCommand::ArcTo { radius, .. } if *radius == 8.0))
            .count();
        assert_eq!(arcs, 4);
        assert_eq!(path.commands[0], PathCommand::MoveTo { x: 18.0, y: 20.0 });
        assert_eq!(path.commands.last(), Some(&PathCommand::ClosePath));
    }

    #[test]
    fn rounded_radius_is_clamped() {
        let mut c = RecordingCanvas::new();
        rounded_rect_path(&mut c, 0.0, 0.0, 10.0, 4.0, 50.0).unwrap();
        c.fill(FillRule::NonZero).unwrap();
        let DrawOp::FillPath { path, .. } = &c.ops()[0] else {
            panic!("expected a fill");
        };
        assert_eq!(path.commands[0], PathCommand::MoveTo { x: 2.0, y: 0.0 });
    }

    #[test]
    fn stroke_only_and_both() {
        let mut c = RecordingCanvas::new();
        let style = ShapeStyle {
            stroke: Some(true),
            stroke_style: Some(Paint::from("#00f")),
            line_width: Some("3px".into()),
            line_dash: Some(vec![4.into(), "2px".into()]),
            ..ShapeStyle::default()
        };
        draw_rectangle(&mut c, &mut units(), &rect(None, style.clone())).unwrap();
        match c.ops() {
            [DrawOp::StrokePath { state, .. }] => {
                assert_eq!(state.line_width, 3.0);
                assert_eq!(state.line_dash, vec![2.0, 2.0]);
                assert_eq!(state.stroke_style, Paint::from("#00f"));
            }
            other => panic!("unexpected ops {other:?}"),
        }

        let mut c = RecordingCanvas::new();
        let both = ShapeStyle {
            fill: Some(true),
            ..style
        };
        draw_rectangle(&mut c, &mut units(), &rect(None, both)).unwrap();
        assert!(matches!(
            c.ops(),
            [DrawOp::FillPath { .. }, DrawOp::StrokePath { .. }]
        ));
    }

    #[test]
    fn shadow_and_opacity_are_applied() {
        let mut c = RecordingCanvas::new();
        let style = ShapeStyle {
            opacity: Some(0.4),
            shadow: Some(Shadow {
                color: "#333".into(),
                blur: "6px".into(),
                offset_x: 4.into(),
                offset_y: "1px".into(),
            }),
            ..ShapeStyle::default()
        };
        let circle = CircleOptions {
            x: "50px".into(),
            y: "60px".into(),
            radius: "10px".into(),
            start_angle: None,
            end_angle: None,
            anticlockwise: false,
            style,
        };
        let bounds = draw_circle(&mut c, &mut units(), &circle).unwrap();
        assert_eq!(bounds, Bounds::new(40.0, 50.0, 20.0, 20.0));

        let state = c.ops()[0].state().unwrap();
        assert_eq!(state.global_alpha, 0.4);
        assert_eq!(state.shadow_color, "#333");
        assert_eq!(state.shadow_blur, 6.0);
        assert_eq!(state.shadow_offset_x, 2.0);
        assert_eq!(state.shadow_offset_y, 1.0);
    }

    #[test]
    fn triangle_path_is_closed_and_bounded() {
        let mut c = RecordingCanvas::new();
        let opts = TriangleOptions {
            points: TrianglePointSpec::Points([
                PointSpec::new("0px", "0px"),
                PointSpec::new("30px", "0px"),
                PointSpec::new("15px", "20px"),
            ]),
            style: ShapeStyle::default(),
        };
        let bounds = draw_triangle(&mut c, &mut units(), &opts).unwrap();
        assert_eq!(bounds, Bounds::new(0.0, 0.0, 30.0, 20.0));
        let DrawOp::FillPath { path, .. } = &c.ops()[0] else {
            panic!("expected a fill");
        };
        assert_eq!(path.commands.len(), 4);
        assert_eq!(path.commands[3], PathCommand::ClosePath);
    }

    #[test]
    fn bad_unit_aborts_before_painting() {
        let mut c = RecordingCanvas::new();
        let mut opts = rect(None, ShapeStyle::default());
        opts.w = "10em".into();
        assert!(matches!(
            draw_rectangle(&mut c, &mut units(), &opts),
            Err(CanvasError::UnsupportedUnit(_))
        ));
        assert!(c.ops().is_empty());
    }
}
