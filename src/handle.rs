//! Lifecycle glue for hosts that mount the drawing surface after the
//! component that owns it is created.

use serde_json::Value;
use tracing::debug;

use crate::api::ImageData;
use crate::canvas::ExtCanvas;
use crate::error::{CanvasError, Result};
use crate::geometry::{Bounds, Size};
use crate::images::ImageLoader;
use crate::instruction::DrawInstruction;
use crate::surface::DrawTarget;
use crate::text::TextHeightOptions;
use crate::units::Viewport;

/// Holds a canvas once one is bound. Every operation on an unbound handle
/// fails with [`CanvasError::NotInitialized`].
pub struct CanvasHandle<T: DrawTarget, L: ImageLoader> {
    canvas: Option<ExtCanvas<T, L>>,
}

impl<T: DrawTarget, L: ImageLoader> Default for CanvasHandle<T, L> {
    fn default() -> Self {
        Self { canvas: None }
    }
}

impl<T: DrawTarget, L: ImageLoader> CanvasHandle<T, L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `canvas`, returning the one it replaces.
    pub fn bind(&mut self, canvas: ExtCanvas<T, L>) -> Option<ExtCanvas<T, L>> {
        debug!(rebind = self.canvas.is_some(), "binding canvas");
        self.canvas.replace(canvas)
    }

    pub fn unbind(&mut self) -> Option<ExtCanvas<T, L>> {
        self.canvas.take()
    }

    pub fn is_bound(&self) -> bool {
        self.canvas.is_some()
    }

    pub fn canvas(&self) -> Result<&ExtCanvas<T, L>> {
        self.canvas.as_ref().ok_or(CanvasError::NotInitialized)
    }

    pub fn canvas_mut(&mut self) -> Result<&mut ExtCanvas<T, L>> {
        self.canvas.as_mut().ok_or(CanvasError::NotInitialized)
    }

    pub async fn draw(&mut self, instructions: &[DrawInstruction]) -> Result<()> {
        self.canvas_mut()?.draw(instructions).await
    }

    pub async fn draw_json(&mut self, value: &Value) -> Result<()> {
        self.canvas_mut()?.draw_json(value).await
    }

    pub fn clean(&mut self) -> Result<()> {
        self.canvas_mut()?.clean()
    }

    /// Forwards a host resize notification.
    pub fn resize(&mut self, size: Size, viewport: Viewport) -> Result<()> {
        self.canvas_mut()?.resize(size, viewport)
    }

    pub fn last_draw_position(&self) -> Result<Bounds> {
        Ok(self.canvas()?.last_draw_position())
    }

    pub fn measure_text_height(&mut self, opts: &TextHeightOptions) -> Result<f64> {
        self.canvas_mut()?.measure_text_height(opts)
    }

    pub fn to_data_url(&self, mime: &str, quality: f64) -> Result<String> {
        self.canvas()?.to_data_url(mime, quality)
    }

    pub fn get_image_data(&self, x: u32, y: u32, w: u32, h: u32) -> Result<ImageData> {
        self.canvas()?.get_image_data(x, y, w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CanvasConfig;
    use crate::images::MemoryLoader;
    use crate::surface::RecordingSurface;
    use crate::text::FontSpec;
    use serde_json::json;

    type Handle = CanvasHandle<RecordingSurface, MemoryLoader>;

    fn bound() -> Handle {
        let mut handle = Handle::new();
        let canvas = ExtCanvas::new(
            RecordingSurface::new(Size::new(100.0, 100.0)),
            MemoryLoader::new(),
            Viewport::new(750.0, 1.0),
            CanvasConfig::default(),
        );
        assert!(handle.bind(canvas).is_none());
        handle
    }

    #[test]
    fn unbound_handle_rejects_everything() {
        let mut handle = Handle::new();
        assert!(!handle.is_bound());
        assert!(matches!(pollster::block_on(handle.draw(&[])), Err(CanvasError::NotInitialized)));
        assert!(matches!(
            pollster::block_on(handle.draw_json(&json!([]))),
            Err(CanvasError::NotInitialized)
        ));
        assert!(matches!(handle.clean(), Err(CanvasError::NotInitialized)));
        assert!(matches!(
            handle.resize(Size::new(1.0, 1.0), Viewport::new(375.0, 2.0)),
            Err(CanvasError::NotInitialized)
        ));
        assert!(matches!(handle.last_draw_position(), Err(CanvasError::NotInitialized)));
        assert!(matches!(handle.to_data_url("image/png", 1.0), Err(CanvasError::NotInitialized)));
        assert!(matches!(handle.get_image_data(0, 0, 1, 1), Err(CanvasError::NotInitialized)));
        let opts = TextHeightOptions {
            text: "a".to_string(),
            max_width: 10.0,
            max_lines: None,
            has_break: false,
            font: FontSpec::default(),
            line_height: None,
        };
        assert!(matches!(handle.measure_text_height(&opts), Err(CanvasError::NotInitialized)));
    }

    #[test]
    fn bound_handle_forwards() {
        let mut handle = bound();
        let list = json!([{"type": "CIRCLE", "x": 10, "y": 10, "radius": 5}]);
        pollster::block_on(handle.draw_json(&list)).unwrap();
        assert_eq!(handle.last_draw_position().unwrap(), Bounds::new(5.0, 5.0, 10.0, 10.0));

        handle.clean().unwrap();
        assert_eq!(handle.last_draw_position().unwrap(), Bounds::ZERO);
    }

    #[test]
    fn unbind_returns_the_canvas() {
        let mut handle = bound();
        assert!(handle.unbind().is_some());
        assert!(!handle.is_bound());
        assert!(matches!(handle.clean(), Err(CanvasError::NotInitialized)));
    }
}
