// src/processing/engine/mod.rs

//! Single-image conversion pipeline.
//!
//! # Architecture
//!
//! - [`ConversionEngine`]: Drives one conversion from source bytes to encoded output.
//! - [`resize`]: Memory ceiling and user resize dimension math.
//! - [`surface`]: The RGBA surface images are rendered into.
//! - [`watermark`]: Text watermark with drop shadow.
//! - [`formats`]: Binary and data-URL export strategies with fallback.

mod executor;
pub mod formats;
pub mod resize;
pub mod surface;
pub mod watermark;

pub use executor::ConversionEngine;
pub use formats::{encode_surface, NativeExporter, SurfaceExporter};
pub use surface::Surface;
pub use watermark::WatermarkFont;
