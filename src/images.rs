//! Image loading and the per-canvas URL cache.
//!
//! Loading is asynchronous through [`ImageLoader`]; the host decides how a
//! URL becomes pixels. Successful loads are cached by URL, failures are not.

use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use tracing::debug;

use crate::api::CanvasImageSource;
use crate::cache::BoundedCache;
use crate::error::{CanvasError, Result};

/// A decoded image in straight-alpha RGBA8, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl DecodedImage {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| CanvasError::invalid_input("image dimensions overflow"))?;
        if rgba.len() != expected {
            return Err(CanvasError::invalid_input(format!(
                "RGBA buffer is {} bytes, expected {expected} for {width}x{height}",
                rgba.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// A single-color image.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            rgba: rgba.repeat(pixels),
        }
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}

impl CanvasImageSource for DecodedImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn data_rgba(&self) -> Option<&[u8]> {
        Some(&self.rgba)
    }
}

/// Turns a URL into pixels.
///
/// Implementations may be written with `async fn`.
pub trait ImageLoader {
    fn load(&self, url: &str) -> impl Future<Output = Result<DecodedImage>>;
}

/// Serves images registered up front; anything else fails to load.
#[derive(Clone, Debug, Default)]
pub struct MemoryLoader {
    images: HashMap<String, DecodedImage>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, image: DecodedImage) {
        self.images.insert(url.into(), image);
    }

    pub fn with(mut self, url: impl Into<String>, image: DecodedImage) -> Self {
        self.insert(url, image);
        self
    }
}

impl ImageLoader for MemoryLoader {
    async fn load(&self, url: &str) -> Result<DecodedImage> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| CanvasError::image_load(url, "no such image"))
    }
}

/// Loaded images keyed by URL, least recently used evicted first.
#[derive(Debug)]
pub struct ImageCache {
    entries: BoundedCache<String, Rc<DecodedImage>>,
}

impl ImageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: BoundedCache::new(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the cached image for `url`, loading it on a miss.
    ///
    /// Every failure surfaces as [`CanvasError::ImageLoad`] naming the URL.
    pub async fn load<L: ImageLoader>(&mut self, loader: &L, url: &str) -> Result<Rc<DecodedImage>> {
        if url.is_empty() {
            return Err(CanvasError::image_load(url, "empty url"));
        }
        if let Some(image) = self.entries.get(url) {
            debug!(url, "image cache hit");
            return Ok(Rc::clone(image));
        }

        let image = match loader.load(url).await {
            Ok(image) => Rc::new(image),
            Err(err @ CanvasError::ImageLoad { .. }) => return Err(err),
            Err(err) => return Err(CanvasError::image_load(url, err)),
        };
        debug!(url, width = image.width, height = image.height, "image loaded");
        self.entries.insert(url.to_string(), Rc::clone(&image));
        Ok(image)
    }
}

#[cfg(feature = "png")]
pub use self::png_loader::{PngLoader, decode_png, encode_png_data_url};

#[cfg(feature = "png")]
mod png_loader {
    use std::io::Cursor;
    use std::path::{Path, PathBuf};

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
    use png::{ColorType, Encoder as PngEncoder};

    use super::{DecodedImage, ImageLoader};
    use crate::error::{CanvasError, Result};

    const DATA_URL_PREFIX: &str = "data:image/png;base64,";

    /// Loads PNGs from `data:` URLs or from the filesystem.
    ///
    /// Relative paths resolve against `root` when one is set.
    #[derive(Clone, Debug, Default)]
    pub struct PngLoader {
        root: Option<PathBuf>,
    }

    impl PngLoader {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_root(root: impl Into<PathBuf>) -> Self {
            Self {
                root: Some(root.into()),
            }
        }

        fn read_bytes(&self, url: &str) -> Result<Vec<u8>> {
            if let Some(rest) = url.strip_prefix("data:") {
                let (header, payload) = rest
                    .split_once(',')
                    .ok_or_else(|| CanvasError::invalid_input("malformed data url"))?;
                if !header.ends_with(";base64") {
                    return Err(CanvasError::invalid_input("data url is not base64 encoded"));
                }
                return Ok(BASE64_STANDARD.decode(payload.trim())?);
            }

            let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
            let path = match &self.root {
                Some(root) if path.is_relative() => root.join(path),
                _ => path.to_path_buf(),
            };
            Ok(std::fs::read(path)?)
        }
    }

    impl ImageLoader for PngLoader {
        async fn load(&self, url: &str) -> Result<DecodedImage> {
            let bytes = self
                .read_bytes(url)
                .map_err(|err| CanvasError::image_load(url, err))?;
            decode_png(&bytes).map_err(|err| CanvasError::image_load(url, err))
        }
    }

    /// Decodes any 8-bit-normalizable PNG to straight RGBA.
    pub fn decode_png(bytes: &[u8]) -> Result<DecodedImage> {
        let mut decoder = png::Decoder::new(Cursor::new(bytes));
        decoder.set_transformations(png::Transformations::normalize_to_color8());
        let mut reader = decoder.read_info()?;

        let (width, height) = {
            let info = reader.info();
            (info.width, info.height)
        };
        let (color, _) = reader.output_color_type();
        let mut buf = vec![0u8; width as usize * height as usize * color.samples()];
        let frame = reader.next_frame(&mut buf)?;
        buf.truncate(frame.buffer_size());

        let rgba = match frame.color_type {
            ColorType::Rgba => buf,
            ColorType::Rgb => buf
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            ColorType::Grayscale => buf.iter().flat_map(|&g| [g, g, g, 255]).collect(),
            ColorType::GrayscaleAlpha => buf
                .chunks_exact(2)
                .flat_map(|p| [p[0], p[0], p[0], p[1]])
                .collect(),
            other => {
                return Err(CanvasError::invalid_input(format!(
                    "unsupported PNG color type {other:?}"
                )));
            }
        };
        DecodedImage::from_rgba(width, height, rgba)
    }

    /// Encodes straight RGBA pixels as a `data:image/png;base64,` URL.
    pub fn encode_png_data_url(width: u32, height: u32, rgba: &[u8]) -> Result<String> {
        let mut png_bytes = Vec::new();
        let mut encoder = PngEncoder::new(&mut png_bytes, width, height);
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(rgba)?;
        writer.finish()?;

        Ok(format!("{DATA_URL_PREFIX}{}", BASE64_STANDARD.encode(png_bytes)))
    }
}
