//! Canvas-wide settings.

use serde::Deserialize;

use crate::error::Result;
use crate::text::FontSpec;
use crate::units::DEFAULT_DESIGN_WIDTH;

/// Fallbacks for text instructions that leave a field out. Sizes are pixels.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextDefaults {
    pub font_size: f64,
    pub font_family: String,
    pub font_weight: String,
    pub color: String,
    pub max_line_width: f64,
    pub max_lines: usize,
    /// Line height as a multiple of the font size.
    pub line_height_factor: f64,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            font_family: "sans-serif".to_string(),
            font_weight: "normal".to_string(),
            color: "#000000".to_string(),
            max_line_width: 200.0,
            max_lines: 1,
            line_height_factor: 1.2,
        }
    }
}

impl TextDefaults {
    pub fn font(&self) -> FontSpec {
        FontSpec::new(self.font_size, self.font_family.clone(), self.font_weight.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Width of the design grid bare numbers are authored against.
    pub design_width: f64,
    pub unit_cache_capacity: usize,
    pub image_cache_capacity: usize,
    pub text: TextDefaults,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            design_width: DEFAULT_DESIGN_WIDTH,
            unit_cache_capacity: 512,
            image_cache_capacity: 64,
            text: TextDefaults::default(),
        }
    }
}

impl CanvasConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
