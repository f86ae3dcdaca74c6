//! Drawing targets: a context plus the size bookkeeping around it.
//!
//! The interpreter is generic over [`DrawTarget`]. On-screen targets scale
//! their backing store by the device pixel ratio so callers always draw in
//! logical pixels; off-screen targets draw 1:1.

use crate::api::CanvasRenderingContext2D;
use crate::backends::recording::RecordingCanvas;
use crate::error::{CanvasError, Result};
use crate::geometry::Size;
use crate::units::Viewport;

pub trait DrawTarget {
    type Context: CanvasRenderingContext2D;

    fn context(&mut self) -> &mut Self::Context;

    fn context_ref(&self) -> &Self::Context;

    /// Logical size, the basis for `vw`/`vh`.
    fn natural_size(&self) -> Size;

    /// Replaces the backing store. Existing content is discarded.
    fn resize(&mut self, size: Size, viewport: Viewport) -> Result<()>;

    /// Encodes the current content. Targets that cannot encode return
    /// [`CanvasError::Unsupported`].
    fn to_data_url(&self, mime: &str, quality: f64) -> Result<String>;
}

/// A target that records instead of rasterizing.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    canvas: RecordingCanvas,
    size: Size,
}

impl RecordingSurface {
    pub fn new(size: Size) -> Self {
        Self {
            canvas: RecordingCanvas::new(),
            size,
        }
    }

    pub fn canvas(&self) -> &RecordingCanvas {
        &self.canvas
    }
}

impl DrawTarget for RecordingSurface {
    type Context = RecordingCanvas;

    fn context(&mut self) -> &mut RecordingCanvas {
        &mut self.canvas
    }

    fn context_ref(&self) -> &RecordingCanvas {
        &self.canvas
    }

    fn natural_size(&self) -> Size {
        self.size
    }

    fn resize(&mut self, size: Size, _viewport: Viewport) -> Result<()> {
        self.canvas = RecordingCanvas::new();
        self.size = size;
        Ok(())
    }

    fn to_data_url(&self, _mime: &str, _quality: f64) -> Result<String> {
        Err(CanvasError::Unsupported("data URL export from a recording surface"))
    }
}

#[cfg(feature = "cairo")]
pub use self::raster::{OffscreenSurface, OnscreenSurface};

#[cfg(feature = "cairo")]
mod raster {
    use super::DrawTarget;
    use crate::api::CanvasTransforms;
    use crate::backends::cairo::CairoCanvas;
    use crate::error::Result;
    use crate::geometry::Size;
    use crate::units::Viewport;

    fn backing_pixels(logical: f64, ratio: f64) -> u32 {
        (logical * ratio).ceil().max(1.0) as u32
    }

    #[cfg(feature = "png")]
    fn encode(canvas: &CairoCanvas, mime: &str, _quality: f64) -> Result<String> {
        if mime != "image/png" {
            tracing::debug!(mime, "only PNG export is available; encoding PNG");
        }
        canvas.to_png_data_url()
    }

    #[cfg(not(feature = "png"))]
    fn encode(_canvas: &CairoCanvas, _mime: &str, _quality: f64) -> Result<String> {
        Err(crate::error::CanvasError::Unsupported(
            "data URL export without the `png` feature",
        ))
    }

    /// A display canvas: backing store is `logical × pixel_ratio`, and the
    /// context is pre-scaled so drawing happens in logical pixels.
    pub struct OnscreenSurface {
        canvas: CairoCanvas,
        logical: Size,
        pixel_ratio: f64,
    }

    impl OnscreenSurface {
        pub fn new(logical: Size, viewport: Viewport) -> Result<Self> {
            let pixel_ratio = if viewport.pixel_ratio > 0.0 {
                viewport.pixel_ratio
            } else {
                1.0
            };
            let mut canvas = CairoCanvas::with_size(
                backing_pixels(logical.width, pixel_ratio),
                backing_pixels(logical.height, pixel_ratio),
            )?;
            canvas.scale(pixel_ratio, pixel_ratio)?;
            Ok(Self {
                canvas,
                logical,
                pixel_ratio,
            })
        }

        pub fn pixel_ratio(&self) -> f64 {
            self.pixel_ratio
        }
    }

    impl DrawTarget for OnscreenSurface {
        type Context = CairoCanvas;

        fn context(&mut self) -> &mut CairoCanvas {
            &mut self.canvas
        }

        fn context_ref(&self) -> &CairoCanvas {
            &self.canvas
        }

        fn natural_size(&self) -> Size {
            self.logical
        }

        fn resize(&mut self, size: Size, viewport: Viewport) -> Result<()> {
            *self = OnscreenSurface::new(size, viewport)?;
            Ok(())
        }

        fn to_data_url(&self, mime: &str, quality: f64) -> Result<String> {
            encode(&self.canvas, mime, quality)
        }
    }

    /// An off-screen canvas drawn 1:1 in backing pixels.
    pub struct OffscreenSurface {
        canvas: CairoCanvas,
        size: Size,
    }

    impl OffscreenSurface {
        pub fn new(size: Size) -> Result<Self> {
            let canvas = CairoCanvas::with_size(backing_pixels(size.width, 1.0), backing_pixels(size.height, 1.0))?;
            Ok(Self { canvas, size })
        }
    }

    impl DrawTarget for OffscreenSurface {
        type Context = CairoCanvas;

        fn context(&mut self) -> &mut CairoCanvas {
            &mut self.canvas
        }

        fn context_ref(&self) -> &CairoCanvas {
            &self.canvas
        }

        fn natural_size(&self) -> Size {
            self.size
        }

        fn resize(&mut self, size: Size, _viewport: Viewport) -> Result<()> {
            *self = OffscreenSurface::new(size)?;
            Ok(())
        }

        fn to_data_url(&self, mime: &str, quality: f64) -> Result<String> {
            encode(&self.canvas, mime, quality)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn onscreen_backing_store_is_scaled_by_pixel_ratio() {
            let surface = OnscreenSurface::new(Size::new(100.0, 50.0), Viewport::new(375.0, 2.0)).unwrap();
            assert_eq!(surface.context_ref().pixel_size(), (200, 100));
            assert_eq!(surface.natural_size(), Size::new(100.0, 50.0));
        }

        #[test]
        fn offscreen_is_one_to_one() {
            let mut surface = OffscreenSurface::new(Size::new(30.0, 20.0)).unwrap();
            assert_eq!(surface.context_ref().pixel_size(), (30, 20));
            surface.resize(Size::new(60.5, 10.0), Viewport::new(375.0, 3.0)).unwrap();
            assert_eq!(surface.context_ref().pixel_size(), (61, 10));
        }
    }
}
