// Module declarations in dependency order
pub mod commands;
pub mod core;
pub mod processing;
pub mod utils;

// Public exports for external consumers
pub use core::{AppState, BatchSettings, CoreEvent, EventSink, SourceFile};
pub use processing::{BatchSummary, ConversionEngine, DownloadArtifact, IntakeReport};
pub use utils::{ConverterError, ConverterResult};

// The command-line entry point lives in main.rs and uses this crate like any
// other consumer.
