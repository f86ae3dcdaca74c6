//! Length resolution: design units, `rpx`, `px`, `vw`, `vh`.

use std::fmt;

use serde::Deserialize;
use tracing::trace;

use crate::cache::BoundedCache;
use crate::error::{CanvasError, Result};
use crate::geometry::Size;

/// Width of the design grid that plain numbers and `rpx` are authored against.
pub const DEFAULT_DESIGN_WIDTH: f64 = 750.0;

/// A declared length: a bare number in design units, or a suffixed string.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Length {
    Design(f64),
    Suffixed(String),
}

impl Default for Length {
    fn default() -> Self {
        Length::Design(0.0)
    }
}

impl From<f64> for Length {
    fn from(value: f64) -> Self {
        Length::Design(value)
    }
}

impl From<i32> for Length {
    fn from(value: i32) -> Self {
        Length::Design(value as f64)
    }
}

impl From<&str> for Length {
    fn from(value: &str) -> Self {
        Length::Suffixed(value.to_string())
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Length::Design(n) => write!(f, "{n}"),
            Length::Suffixed(s) => f.write_str(s),
        }
    }
}

/// Host viewport metrics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Logical window width.
    pub width: f64,
    /// Device pixels per logical pixel.
    pub pixel_ratio: f64,
}

impl Viewport {
    pub const fn new(width: f64, pixel_ratio: f64) -> Self {
        Self { width, pixel_ratio }
    }
}

// Numbers and strings never share a key: `12` and `"12px"` resolve differently.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum UnitKey {
    Design(u64),
    Suffixed(String),
}

impl UnitKey {
    fn of(value: &Length) -> Self {
        match value {
            Length::Design(n) => UnitKey::Design(n.to_bits()),
            Length::Suffixed(s) => UnitKey::Suffixed(s.clone()),
        }
    }
}

/// Converts [`Length`]s to absolute pixels, memoizing every resolution until
/// the viewport ratio or the canvas natural size changes.
#[derive(Debug)]
pub struct UnitConverter {
    design_width: f64,
    rpx_ratio: f64,
    natural: Size,
    cache: BoundedCache<UnitKey, f64>,
    misses: u64,
}

impl UnitConverter {
    pub fn new(design_width: f64, viewport: Viewport, natural: Size, capacity: usize) -> Self {
        Self {
            design_width,
            rpx_ratio: viewport.width / design_width,
            natural,
            cache: BoundedCache::new(capacity),
            misses: 0,
        }
    }

    pub fn rpx_ratio(&self) -> f64 {
        self.rpx_ratio
    }

    pub fn natural_size(&self) -> Size {
        self.natural
    }

    /// Number of resolutions that had to be parsed rather than served from cache.
    pub fn cache_misses(&self) -> u64 {
        self.misses
    }

    /// Takes new viewport metrics and natural size; drops every cached value.
    pub fn update(&mut self, viewport: Viewport, natural: Size) {
        self.rpx_ratio = viewport.width / self.design_width;
        self.natural = natural;
        self.cache.clear();
    }

    pub fn to_px(&mut self, value: &Length) -> Result<f64> {
        let key = UnitKey::of(value);
        if let Some(px) = self.cache.get(&key) {
            return Ok(*px);
        }

        let px = self.resolve(value)?;
        self.misses += 1;
        trace!(%value, px, "resolved length");
        self.cache.insert(key, px);
        Ok(px)
    }

    /// Converts an optional length, falling back to `default` (itself a length).
    pub fn to_px_or(&mut self, value: Option<&Length>, default: f64) -> Result<f64> {
        match value {
            Some(v) => self.to_px(v),
            None => self.to_px(&Length::Design(default)),
        }
    }

    fn resolve(&self, value: &Length) -> Result<f64> {
        let s = match value {
            Length::Design(n) if n.is_finite() => return Ok(n * self.rpx_ratio),
            Length::Design(n) => return Err(CanvasError::UnsupportedUnit(n.to_string())),
            Length::Suffixed(s) => s.trim(),
        };

        let unsupported = || CanvasError::UnsupportedUnit(s.to_string());
        // `parse` accepts "NaN" and "inf", which no unit should resolve from.
        let number = |digits: &str| {
            digits
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(unsupported)
        };

        let px = if let Some(n) = s.strip_suffix("rpx") {
            number(n)? * self.rpx_ratio
        } else if let Some(n) = s.strip_suffix("px") {
            number(n)?
        } else if let Some(n) = s.strip_suffix("vw") {
            number(n)? / 100.0 * self.natural.width
        } else if let Some(n) = s.strip_suffix("vh") {
            number(n)? / 100.0 * self.natural.height
        } else {
            return Err(unsupported());
        };
        if px.is_finite() {
            Ok(px)
        } else {
            Err(unsupported())
        }
    }
}
