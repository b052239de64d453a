//! Core types for conversion settings and results.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::utils::{format_bytes, ConverterError, OutputFormat, ValidationError};

/// Maximum number of entries the queue ever holds.
pub const MAX_QUEUE_ENTRIES: usize = 100;

/// Delay between the reveal of consecutive admitted entries.
pub const STAGGER_DELAY: Duration = Duration::from_millis(100);

/// How long a removed `Done` entry can still be restored.
pub const UNDO_GRACE_WINDOW: Duration = Duration::from_millis(5000);

/// Memory ceiling applied to decoded images before any user resize.
pub const MAX_DIMENSION: u32 = 4096;

/// Configuration read once at the start of every batch run.
///
/// Deserializes from the flat settings shape used by front ends
/// (`quality`, `resize`, `width`, `height`, `lockAspect`, `watermark`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchSettings {
    /// Encoder quality factor in [0, 1]
    pub quality: f32,
    /// Whether the user-requested resize applies
    pub resize: bool,
    /// Target width in pixels
    pub width: Option<u32>,
    /// Target height in pixels
    pub height: Option<u32>,
    /// Derive the missing dimension from the current aspect ratio
    pub lock_aspect: bool,
    /// Whether the text watermark is drawn
    pub watermark: bool,
    pub watermark_text: String,
    pub watermark_position: WatermarkPosition,
    pub watermark_color: HexColor,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            quality: 0.8,
            resize: false,
            width: None,
            height: None,
            lock_aspect: true,
            watermark: false,
            watermark_text: String::new(),
            watermark_position: WatermarkPosition::BottomLeft,
            watermark_color: HexColor::WHITE,
        }
    }
}

impl BatchSettings {
    /// Quality as the whole percentage shown next to the slider.
    pub fn quality_percent(&self) -> u32 {
        (self.quality * 100.0).round() as u32
    }

    /// Whether a user resize was requested with at least one dimension.
    pub fn wants_resize(&self) -> bool {
        self.resize && (self.width.is_some() || self.height.is_some())
    }

    /// Whether a non-empty watermark was requested.
    pub fn wants_watermark(&self) -> bool {
        self.watermark && !self.watermark_text.is_empty()
    }
}

/// Where the watermark text is anchored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    #[default]
    BottomLeft,
    BottomRight,
    Center,
}

impl FromStr for WatermarkPosition {
    type Err = ConverterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bottom-left" | "bl" => Ok(Self::BottomLeft),
            "bottom-right" | "br" => Ok(Self::BottomRight),
            "center" | "c" => Ok(Self::Center),
            other => Err(ValidationError::settings(format!("Unknown watermark position: {other}")).into()),
        }
    }
}

/// An RGBA colour parsed from `#rgb`, `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(pub [u8; 4]);

impl HexColor {
    pub const WHITE: Self = Self([255, 255, 255, 255]);
}

impl FromStr for HexColor {
    type Err = ConverterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConverterError::settings(format!("Invalid colour: {s}"));
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |range: &str| u8::from_str_radix(range, 16).map_err(|_| invalid());

        match hex.len() {
            3 => {
                let mut rgba = [255u8; 4];
                for (i, c) in hex.chars().enumerate() {
                    let v = channel(&c.to_string())?;
                    rgba[i] = v * 17;
                }
                Ok(Self(rgba))
            }
            6 | 8 => {
                let mut rgba = [255u8; 4];
                for i in 0..hex.len() / 2 {
                    rgba[i] = channel(&hex[i * 2..i * 2 + 2])?;
                }
                Ok(Self(rgba))
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for HexColor {
    type Error = ConverterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        if a == 255 {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

/// Size statistics for one conversion. Computed once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionStats {
    pub original_size: u64,
    pub new_size: u64,
    pub original_size_label: String,
    pub new_size_label: String,
    /// Rounded percentage saved, never negative
    pub saved_percent: u8,
}

impl ConversionStats {
    pub fn new(original_size: u64, new_size: u64) -> Self {
        let saved_percent = if original_size == 0 {
            0
        } else {
            let saved = (original_size as f64 - new_size as f64) / original_size as f64 * 100.0;
            saved.round().clamp(0.0, 100.0) as u8
        };

        Self {
            original_size,
            new_size,
            original_size_label: format_bytes(original_size),
            new_size_label: format_bytes(new_size),
            saved_percent,
        }
    }
}

/// Encoded output of one successful conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub payload: Arc<[u8]>,
    pub format: OutputFormat,
    pub stats: ConversionStats,
    /// Final pixel dimensions of the encoded image
    pub dimensions: (u32, u32),
}

impl ConversionOutput {
    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }
}
