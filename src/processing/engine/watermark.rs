// src/processing/engine/watermark.rs

//! Text watermark rendering with a soft drop shadow.

use std::path::{Path, PathBuf};
use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use image::{imageops, GrayImage, Luma};
use tracing::{debug, warn};
use crate::core::{BatchSettings, WatermarkPosition};
use crate::utils::{ConverterError, ConverterResult};
use super::surface::Surface;

/// Distance of the text from the surface edges.
const EDGE_MARGIN: f32 = 20.0;
const MIN_FONT_PX: f32 = 12.0;
const FONT_WIDTH_FACTOR: f32 = 0.05;

/// Canvas `shadowBlur = 5` corresponds to a Gaussian sigma of 2.5.
const SHADOW_SIGMA: f32 = 2.5;
const SHADOW_COLOR: [u8; 4] = [0, 0, 0, 128];

/// Fonts tried, in order, when no font path is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Font used to render watermark text.
pub struct WatermarkFont {
    font: FontVec,
    source: PathBuf,
}

impl std::fmt::Debug for WatermarkFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkFont").field("source", &self.source).finish()
    }
}

impl WatermarkFont {
    /// Loads a TrueType/OpenType font file.
    pub fn load(path: impl AsRef<Path>) -> ConverterResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let font = FontVec::try_from_vec(data)
            .map_err(|e| ConverterError::settings(format!("Invalid font {}: {e}", path.display())))?;
        Ok(Self { font, source: path.to_path_buf() })
    }

    /// Loads `explicit` when given, otherwise the first usable system font.
    pub fn discover(explicit: Option<&Path>) -> Option<Self> {
        if let Some(path) = explicit {
            return match Self::load(path) {
                Ok(font) => Some(font),
                Err(e) => {
                    warn!("Watermark font unavailable: {}", e);
                    None
                }
            };
        }

        let found = SYSTEM_FONT_CANDIDATES
            .iter()
            .map(Path::new)
            .filter(|p| p.is_file())
            .find_map(|p| Self::load(p).ok());
        match &found {
            Some(font) => debug!("Using watermark font {}", font.source.display()),
            None => warn!("No system font found; watermarks will be skipped"),
        }
        found
    }

    /// Advance width of `text` at `px` pixels, kerning included.
    pub fn measure(&self, text: &str, px: f32) -> f32 {
        let scaled = self.font.as_scaled(PxScale::from(px));
        let mut width = 0.0;
        let mut previous = None;
        for c in text.chars() {
            let id = self.font.glyph_id(c);
            if let Some(prev) = previous {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            previous = Some(id);
        }
        width
    }
}

/// Watermark font size for a surface of the given width.
pub fn font_size_for(surface_width: u32) -> f32 {
    f32::max(MIN_FONT_PX, surface_width as f32 * FONT_WIDTH_FACTOR)
}

/// Baseline origin of the text for a position.
pub fn anchor(position: WatermarkPosition, width: u32, height: u32, text_width: f32) -> (f32, f32) {
    let (w, h) = (width as f32, height as f32);
    match position {
        WatermarkPosition::BottomRight => (w - text_width - EDGE_MARGIN, h - EDGE_MARGIN),
        WatermarkPosition::Center => ((w - text_width) / 2.0, h / 2.0),
        WatermarkPosition::BottomLeft => (EDGE_MARGIN, h - EDGE_MARGIN),
    }
}

/// Draws the watermark text from `settings` onto `surface`: first a blurred
/// 50 % black shadow, then the text in the configured colour.
pub fn draw_watermark(surface: &mut Surface, font: &WatermarkFont, settings: &BatchSettings) {
    let text = settings.watermark_text.as_str();
    let px = font_size_for(surface.width());
    let scale = PxScale::from(px);
    let scaled = font.font.as_scaled(scale);

    let text_width = font.measure(text, px);
    let (x, y) = anchor(settings.watermark_position, surface.width(), surface.height(), text_width);

    // Glyphs further than `pad` outside the surface cannot reach it, even blurred.
    let pad = (SHADOW_SIGMA * 3.0).ceil();
    let (limit_w, limit_h) = (surface.width() as f32 + pad, surface.height() as f32 + pad);

    let mut outlines = Vec::new();
    let mut caret = x;
    let mut previous = None;
    for c in text.chars() {
        let id = font.font.glyph_id(c);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        let advance = scaled.h_advance(id);
        let glyph = id.with_scale_and_position(scale, point(caret, y));
        let on_surface = caret + advance >= -pad && caret <= limit_w;
        caret += advance;
        previous = Some(id);
        if !on_surface {
            continue;
        }
        if let Some(outlined) = font.font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            if bounds.max.x >= -pad && bounds.min.x <= limit_w && bounds.max.y >= -pad && bounds.min.y <= limit_h {
                outlines.push(outlined);
            }
        }
    }
    if outlines.is_empty() {
        return;
    }

    // Coverage mask around the glyphs, padded so the blur has room to spread.
    let text_bounds = (
        outlines.iter().map(|o| o.px_bounds().min.x).fold(f32::MAX, f32::min).floor() - pad,
        outlines.iter().map(|o| o.px_bounds().min.y).fold(f32::MAX, f32::min).floor() - pad,
        outlines.iter().map(|o| o.px_bounds().max.x).fold(f32::MIN, f32::max).ceil() + pad,
        outlines.iter().map(|o| o.px_bounds().max.y).fold(f32::MIN, f32::max).ceil() + pad,
    );
    let Some((min_x, min_y, max_x, max_y)) = clip_to_surface(text_bounds, surface.width(), surface.height(), pad)
    else {
        return;
    };
    let mask_w = (max_x - min_x).max(1.0) as u32;
    let mask_h = (max_y - min_y).max(1.0) as u32;

    let mut mask = GrayImage::new(mask_w, mask_h);
    for outlined in &outlines {
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let mx = (bounds.min.x - min_x).floor() as i64 + gx as i64;
            let my = (bounds.min.y - min_y).floor() as i64 + gy as i64;
            if mx < 0 || my < 0 || mx >= mask_w as i64 || my >= mask_h as i64 {
                return;
            }
            let cell = mask.get_pixel_mut(mx as u32, my as u32);
            let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
            *cell = Luma([cell[0].max(value)]);
        });
    }

    let shadow = imageops::blur(&mask, SHADOW_SIGMA);
    let color = settings.watermark_color.0;
    let (origin_x, origin_y) = (min_x as i64, min_y as i64);

    for (mx, my, value) in shadow.enumerate_pixels() {
        if value[0] > 0 {
            surface.blend_pixel(origin_x + mx as i64, origin_y + my as i64, SHADOW_COLOR, value[0] as f32 / 255.0);
        }
    }
    for (mx, my, value) in mask.enumerate_pixels() {
        if value[0] > 0 {
            surface.blend_pixel(origin_x + mx as i64, origin_y + my as i64, color, value[0] as f32 / 255.0);
        }
    }

    debug!("Watermark '{}' drawn at ({:.0}, {:.0}) size {:.0}px", text, x, y, px);
}

/// Intersects `(min_x, min_y, max_x, max_y)` with the surface widened by
/// `pad` on every side. `None` when nothing of it is left.
fn clip_to_surface(bounds: (f32, f32, f32, f32), width: u32, height: u32, pad: f32) -> Option<(f32, f32, f32, f32)> {
    let (min_x, min_y, max_x, max_y) = bounds;
    let min_x = min_x.max(-pad);
    let min_y = min_y.max(-pad);
    let max_x = max_x.min(width as f32 + pad);
    let max_y = max_y.min(height as f32 + pad);
    (min_x < max_x && min_y < max_y).then_some((min_x, min_y, max_x, max_y))
}
