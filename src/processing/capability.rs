//! One-shot probe for compressed (WebP) encoder support.

use std::sync::Arc;
use tracing::{debug, warn};
use crate::utils::OutputFormat;
use super::engine::{Surface, SurfaceExporter};

const PROBE_QUALITY: f32 = 0.8;

/// Whether `exporter` can really produce WebP.
///
/// Encodes a 1×1 surface and checks the output is WebP rather than a
/// silently substituted format. Never fails: any error means "unsupported".
pub fn probe_webp_support(exporter: &dyn SurfaceExporter) -> bool {
    let surface = match Surface::new(1, 1) {
        Ok(surface) => surface,
        Err(e) => {
            warn!("WebP support check failed: {}", e);
            return false;
        }
    };

    match exporter.export_binary(&surface, OutputFormat::WebP, PROBE_QUALITY) {
        Ok(Some(bytes)) => {
            let supported = matches!(image::guess_format(&bytes), Ok(image::ImageFormat::WebP));
            if !supported {
                debug!("Encoder substituted another format for WebP");
            }
            supported
        }
        Ok(None) => false,
        Err(e) => {
            warn!("WebP support check failed: {}", e);
            false
        }
    }
}

/// Runs [`probe_webp_support`] on the blocking pool.
pub async fn detect(exporter: Arc<dyn SurfaceExporter>) -> bool {
    tokio::task::spawn_blocking(move || probe_webp_support(exporter.as_ref()))
        .await
        .unwrap_or_else(|e| {
            warn!("WebP support check panicked: {}", e);
            false
        })
}
