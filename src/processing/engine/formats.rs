// src/processing/engine/formats.rs

//! Encoding a surface into the negotiated output format.
//!
//! Two export strategies sit behind [`SurfaceExporter`]: a direct binary
//! export and a textual data-URL export. [`encode_surface`] tries the first
//! and falls back to the second, so platforms without a working binary path
//! still produce output.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{ExtendedColorType, ImageEncoder};
use image::codecs::png::PngEncoder;
use tracing::{debug, warn};
use crate::utils::{ConverterError, ConverterResult, OutputFormat};
use super::surface::Surface;

/// Data URLs shorter than this cannot hold a real image.
const MIN_DATA_URL_LEN: usize = 100;

/// Export strategies of a rendering platform.
pub trait SurfaceExporter: Send + Sync {
    /// Primary path: encoded bytes, or `None` when the platform produced nothing.
    fn export_binary(&self, surface: &Surface, format: OutputFormat, quality: f32) -> ConverterResult<Option<Vec<u8>>>;

    /// Secondary path: a `data:<mime>;base64,<payload>` URL.
    fn export_data_url(&self, surface: &Surface, format: OutputFormat, quality: f32) -> ConverterResult<String>;
}

/// Encoder backed by libwebp (lossy WebP) and the `image` PNG encoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeExporter;

impl NativeExporter {
    fn encode(&self, surface: &Surface, format: OutputFormat, quality: f32) -> ConverterResult<Vec<u8>> {
        let (width, height) = surface.dimensions();
        let raw = surface.as_rgba().as_raw();

        match format {
            OutputFormat::WebP => {
                let encoder = webp::Encoder::from_rgba(raw, width, height);
                let memory = encoder
                    .encode_simple(false, quality.clamp(0.0, 1.0) * 100.0)
                    .map_err(|e| ConverterError::encode(format!("WebP encoding failed: {e:?}")))?;
                Ok(memory.to_vec())
            }
            // PNG is lossless; the quality factor does not apply.
            OutputFormat::PNG => {
                let mut out = Vec::new();
                PngEncoder::new(&mut out)
                    .write_image(raw, width, height, ExtendedColorType::Rgba8)
                    .map_err(|e| ConverterError::encode(format!("PNG encoding failed: {e}")))?;
                Ok(out)
            }
        }
    }
}

impl SurfaceExporter for NativeExporter {
    fn export_binary(&self, surface: &Surface, format: OutputFormat, quality: f32) -> ConverterResult<Option<Vec<u8>>> {
        self.encode(surface, format, quality).map(Some)
    }

    fn export_data_url(&self, surface: &Surface, format: OutputFormat, quality: f32) -> ConverterResult<String> {
        let bytes = self.encode(surface, format, quality)?;
        Ok(format!("data:{};base64,{}", format.mime_type(), STANDARD.encode(bytes)))
    }
}

/// Encodes `surface`, trying the binary export first and the data URL second.
pub fn encode_surface(
    exporter: &dyn SurfaceExporter,
    surface: &Surface,
    format: OutputFormat,
    quality: f32,
) -> ConverterResult<Vec<u8>> {
    match exporter.export_binary(surface, format, quality) {
        Ok(Some(bytes)) if !bytes.is_empty() => return Ok(bytes),
        Ok(_) => warn!("Binary export returned no data, falling back to data URL"),
        Err(e) => warn!("Binary export failed ({}), falling back to data URL", e),
    }

    let data_url = exporter
        .export_data_url(surface, format, quality)
        .map_err(|e| ConverterError::encode(format!("Fallback export failed: {e}")))?;
    let (mime, bytes) = decode_data_url(&data_url)?;
    if mime != format.mime_type() {
        warn!("Data URL export produced {} instead of {}", mime, format.mime_type());
    }
    debug!("Data URL fallback produced {} bytes", bytes.len());
    Ok(bytes)
}

/// Splits a data URL into its media type and decoded payload.
pub fn decode_data_url(data_url: &str) -> ConverterResult<(String, Vec<u8>)> {
    if data_url.len() < MIN_DATA_URL_LEN || data_url == "data:," {
        return Err(ConverterError::encode("Canvas extraction failed"));
    }

    let (header, payload) = data_url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| ConverterError::encode("Malformed data URL"))?;

    let mut parts = header.split(';');
    let mime = parts.next().unwrap_or_default().to_string();
    let is_base64 = parts.any(|p| p.eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        STANDARD
            .decode(payload.trim())
            .map_err(|e| ConverterError::encode(format!("Invalid data URL payload: {e}")))?
    } else {
        payload.as_bytes().to_vec()
    };

    if bytes.is_empty() {
        return Err(ConverterError::encode("Data URL carried no payload"));
    }
    Ok((mime, bytes))
}
