//! Destination and source rectangles for the mini-program image display modes.

use serde::Deserialize;

use crate::geometry::Bounds;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageMode {
    /// Stretch to fill the box, ignoring aspect ratio.
    #[default]
    ScaleToFill,
    /// Scale so the whole image is visible, centered on the slack axis.
    AspectFit,
    /// Scale so the box is covered; the overflowing axis is cropped evenly.
    AspectFill,
    /// Keep the box width; height follows the image ratio.
    WidthFix,
    /// Keep the box height; width follows the image ratio.
    HeightFix,
    Top,
    Bottom,
    Center,
    Left,
    Right,
}

impl ImageMode {
    /// Crop modes sample a sub-rectangle of the source instead of the whole image.
    pub fn is_crop(self) -> bool {
        matches!(
            self,
            ImageMode::AspectFill
                | ImageMode::Top
                | ImageMode::Bottom
                | ImageMode::Center
                | ImageMode::Left
                | ImageMode::Right
        )
    }
}

/// Output of [`resolve`]: `draw` is relative to the box origin, `source` is in
/// image pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageGeometry {
    pub draw: Bounds,
    pub source: Bounds,
}

pub fn resolve(mode: ImageMode, img_w: f64, img_h: f64, box_w: f64, box_h: f64) -> ImageGeometry {
    let ratio = img_w / img_h;
    let box_ratio = box_w / box_h;

    let mut draw = Bounds::new(0.0, 0.0, box_w, box_h);
    let mut source = Bounds::new(0.0, 0.0, img_w, img_h);

    // Box-shaped bands through the source: one spanning the full image width,
    // one spanning the full image height. Clamped to the image.
    let band_h = (img_w / box_ratio).min(img_h);
    let band_w = (img_h * box_ratio).min(img_w);

    match mode {
        ImageMode::ScaleToFill => {}
        ImageMode::AspectFit => {
            if box_ratio > ratio {
                draw.w = box_h * ratio;
                draw.x = (box_w - draw.w) / 2.0;
            } else {
                draw.h = box_w / ratio;
                draw.y = (box_h - draw.h) / 2.0;
            }
        }
        ImageMode::AspectFill | ImageMode::Center => {
            if box_ratio > ratio {
                source.h = band_h;
                source.y = (img_h - band_h) / 2.0;
            } else {
                source.w = band_w;
                source.x = (img_w - band_w) / 2.0;
            }
        }
        ImageMode::WidthFix => draw.h = box_w / ratio,
        ImageMode::HeightFix => draw.w = box_h * ratio,
        ImageMode::Top => source.h = band_h,
        ImageMode::Bottom => {
            source.y = img_h - band_h;
            source.h = band_h;
        }
        ImageMode::Left => source.w = band_w,
        ImageMode::Right => {
            source.x = img_w - band_w;
            source.w = band_w;
        }
    }

    ImageGeometry { draw, source }
}
