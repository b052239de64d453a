// src/processing/engine/executor.rs

//! Conversion engine: decode, constrain, resize, watermark, encode.
//!
//! One call converts exactly one source. The engine keeps no per-call
//! mutable state, so concurrent calls would be safe even though the batch
//! orchestrator drives it strictly one entry at a time.

use std::io::Cursor;
use std::sync::Arc;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, ImageResult};
use tracing::{debug, warn};

use crate::core::{BatchSettings, ConversionOutput, ConversionStats, HandleRegistry};
use crate::utils::{ConverterError, ConverterResult, OutputFormat};

use super::formats::{encode_surface, NativeExporter, SurfaceExporter};
use super::resize::target_dimensions;
use super::surface::Surface;
use super::watermark::{draw_watermark, WatermarkFont};

/// Converts single images. Cheap to clone; shares exporter, font and registry.
#[derive(Clone)]
pub struct ConversionEngine {
    exporter: Arc<dyn SurfaceExporter>,
    font: Option<Arc<WatermarkFont>>,
    handles: HandleRegistry,
}

impl std::fmt::Debug for ConversionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionEngine")
            .field("font", &self.font)
            .finish_non_exhaustive()
    }
}

impl ConversionEngine {
    pub fn new(exporter: Arc<dyn SurfaceExporter>, font: Option<WatermarkFont>, handles: HandleRegistry) -> Self {
        Self {
            exporter,
            font: font.map(Arc::new),
            handles,
        }
    }

    /// Engine with the native encoders and no watermark font.
    pub fn native(handles: HandleRegistry) -> Self {
        Self::new(Arc::new(NativeExporter), None, handles)
    }

    pub fn exporter(&self) -> Arc<dyn SurfaceExporter> {
        Arc::clone(&self.exporter)
    }

    pub fn handles(&self) -> &HandleRegistry {
        &self.handles
    }

    /// Converts one source synchronously.
    ///
    /// `supports_webp` is the cached capability probe result; it decides
    /// between WebP and PNG output.
    pub fn convert(
        &self,
        name: &str,
        mime_type: &str,
        source: &[u8],
        settings: &BatchSettings,
        supports_webp: bool,
    ) -> ConverterResult<ConversionOutput> {
        // Released on every return path below.
        let _source_handle = self.handles.scoped(mime_type, source.len());

        let decoded = decode_oriented(source)
            .map_err(|e| ConverterError::decode(format!("Failed to load '{name}': {e}")))?;
        debug!("Loaded '{}': {}×{}", name, decoded.width(), decoded.height());

        let (width, height) = target_dimensions(decoded.width(), decoded.height(), settings);
        let mut surface = Surface::new(width, height)?;
        surface.draw_image(&decoded);
        drop(decoded);

        if settings.wants_watermark() {
            match &self.font {
                Some(font) => draw_watermark(&mut surface, font, settings),
                None => warn!("Watermark requested for '{}' but no font is loaded; skipping", name),
            }
        }

        let format = OutputFormat::negotiate(supports_webp);
        let payload = encode_surface(self.exporter.as_ref(), &surface, format, settings.quality)?;
        let stats = ConversionStats::new(source.len() as u64, payload.len() as u64);

        debug!(
            "'{}' → {} ({} → {}, {}% saved)",
            name,
            format.extension(),
            stats.original_size_label,
            stats.new_size_label,
            stats.saved_percent
        );

        Ok(ConversionOutput {
            payload: payload.into(),
            format,
            stats,
            dimensions: (width, height),
        })
    }

    /// Converts one source on the blocking thread pool so the async runtime
    /// is never blocked.
    pub async fn convert_async(
        &self,
        name: String,
        mime_type: String,
        source: Arc<[u8]>,
        settings: BatchSettings,
        supports_webp: bool,
    ) -> ConverterResult<ConversionOutput> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || {
            engine.convert(&name, &mime_type, &source, &settings, supports_webp)
        })
        .await
        .map_err(|e| ConverterError::processing(format!("Conversion task panicked: {e}")))?
    }
}

/// Decodes `source` and turns it upright according to its EXIF orientation.
fn decode_oriented(source: &[u8]) -> ImageResult<DynamicImage> {
    let mut decoder = ImageReader::new(Cursor::new(source))
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);
    Ok(image)
}
