//! Everything between a picked file and a converted download.
//!
//! - [`capability`]: One-shot WebP encoder probe
//! - [`engine`]: Single-image conversion pipeline
//! - [`intake`]: Admission into the queue with the staggered reveal
//! - [`batch`]: Sequential batch orchestration
//! - [`archive`]: Individual downloads and the bulk ZIP

pub mod archive;
pub mod batch;
pub mod capability;
pub mod engine;
pub mod intake;

pub use archive::{DownloadArtifact, ARCHIVE_NAME};
pub use batch::{BatchProcessor, BatchSummary};
pub use engine::{ConversionEngine, NativeExporter, SurfaceExporter, WatermarkFont};
pub use intake::IntakeReport;
