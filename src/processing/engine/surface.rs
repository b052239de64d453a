// src/processing/engine/surface.rs

//! Owned RGBA pixel surface that conversions render into.

use image::{imageops, DynamicImage, Rgba, RgbaImage};
use crate::utils::{ConverterError, ConverterResult};

/// Largest side a surface may have.
pub const MAX_SURFACE_SIDE: u32 = 16_384;

/// Largest pixel area a surface may have.
pub const MAX_SURFACE_AREA: u64 = 268_435_456;

#[derive(Debug, Clone)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    /// Allocates a transparent surface, failing with `SurfaceUnavailable`
    /// when the size is empty, over the limits, or cannot be allocated.
    pub fn new(width: u32, height: u32) -> ConverterResult<Self> {
        if width == 0 || height == 0 {
            return Err(ConverterError::surface(format!("Empty surface requested: {width}×{height}")));
        }
        if width > MAX_SURFACE_SIDE || height > MAX_SURFACE_SIDE {
            return Err(ConverterError::surface(format!(
                "Surface {width}×{height} exceeds the {MAX_SURFACE_SIDE}px side limit"
            )));
        }
        let area = width as u64 * height as u64;
        if area > MAX_SURFACE_AREA {
            return Err(ConverterError::surface(format!("Surface area {area}px is over the limit")));
        }

        let len = area as usize * 4;
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|e| ConverterError::surface(format!("Cannot allocate {len} bytes: {e}")))?;
        buffer.resize(len, 0);

        let pixels = RgbaImage::from_raw(width, height, buffer)
            .ok_or_else(|| ConverterError::surface("Surface buffer size mismatch"))?;
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Draws `source` stretched over the whole surface.
    pub fn draw_image(&mut self, source: &DynamicImage) {
        let (w, h) = self.dimensions();
        let rgba = if source.width() == w && source.height() == h {
            source.to_rgba8()
        } else {
            imageops::resize(&source.to_rgba8(), w, h, imageops::FilterType::Triangle)
        };
        imageops::overlay(&mut self.pixels, &rgba, 0, 0);
    }

    /// Composites `color` with `coverage` (0..=1) over the pixel at `x`,`y`.
    /// Out-of-bounds coordinates are ignored.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: [u8; 4], coverage: f32) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        let src_a = (color[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
        if src_a <= 0.0 {
            return;
        }

        let dst = self.pixels.get_pixel_mut(x as u32, y as u32);
        let dst_a = dst[3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        if out_a <= f32::EPSILON {
            return;
        }

        let mut out = [0u8; 4];
        for c in 0..3 {
            let s = color[c] as f32;
            let d = dst[c] as f32;
            out[c] = ((s * src_a + d * dst_a * (1.0 - src_a)) / out_a).round().clamp(0.0, 255.0) as u8;
        }
        out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
        *dst = Rgba(out);
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unusable_sizes() {
        assert!(matches!(Surface::new(0, 10), Err(ConverterError::SurfaceUnavailable(_))));
        assert!(Surface::new(MAX_SURFACE_SIDE + 1, 1).is_err());
        assert!(Surface::new(1, 1).is_ok());
    }

    #[test]
    fn draws_sources_scaled_to_fit() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 4, Rgba([200, 10, 10, 255])));
        let mut surface = Surface::new(4, 2).unwrap();
        surface.draw_image(&source);
        assert_eq!(surface.dimensions(), (4, 2));
        assert_eq!(surface.pixel(1, 1), [200, 10, 10, 255]);
    }

    #[test]
    fn blending_is_source_over() {
        let mut surface = Surface::new(1, 1).unwrap();
        surface.draw_image(&DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]))));
        surface.blend_pixel(0, 0, [0, 0, 0, 255], 0.5);
        let [r, g, b, a] = surface.pixel(0, 0);
        assert_eq!(a, 255);
        assert!((127..=128).contains(&r) && r == g && g == b);

        surface.blend_pixel(-1, 5, [0, 0, 0, 255], 1.0);
    }
}
