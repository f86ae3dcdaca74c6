//! A declarative 2D draw layer over a Canvas-2D-like context.
//!
//! Hosts hand [`ExtCanvas::draw`] an ordered list of [`DrawInstruction`]s
//! (images, text, wrapped text, triangles, rectangles, circles). The canvas
//! resolves lengths written in design units, `rpx`, `px`, `vw` or `vh`,
//! computes image display-mode geometry, lays out text with truncation and
//! paints everything in order with per-instruction state isolation.
//!
//! The drawing context is abstracted by the traits in [`api`]. Two backends
//! ship with the crate: [`backends::recording`], always available, and
//! [`backends::cairo`] behind the `cairo` feature. The `png` feature adds a
//! PNG image loader and PNG data-URL export.

pub mod api;
pub mod cache;
pub mod canvas;
pub mod config;
pub mod error;
pub mod geometry;
pub mod handle;
pub mod image_mode;
pub mod images;
pub mod instruction;
pub mod shapes;
pub mod surface;
pub mod text;
pub mod triangle;
pub mod units;

pub mod backends {
    pub mod recording;

    #[cfg(feature = "cairo")]
    pub mod cairo;
}

pub use canvas::ExtCanvas;
pub use config::{CanvasConfig, TextDefaults};
pub use error::{CanvasError, Result};
pub use geometry::{Bounds, Point, Size};
pub use handle::CanvasHandle;
pub use image_mode::ImageMode;
pub use images::{DecodedImage, ImageCache, ImageLoader, MemoryLoader};
pub use instruction::DrawInstruction;
pub use surface::{DrawTarget, RecordingSurface};
pub use text::{FontSpec, OverflowPolicy};
pub use units::{Length, UnitConverter, Viewport};

#[cfg(feature = "cairo")]
pub use surface::{OffscreenSurface, OnscreenSurface};

#[cfg(feature = "png")]
pub use images::PngLoader;
