//! Core application types and state management.
//!
//! This module contains the fundamental types used throughout the application:
//! - [`AppState`]: Shared queue, engine and event sink
//! - [`QueueEntry`]: One tracked image and its [`EntryState`]
//! - [`BatchSettings`]: Settings read once per batch run
//! - [`ConversionOutput`]: Encoded result with its [`ConversionStats`]
//! - [`CoreEvent`]: Everything a front end is told, delivered to an [`EventSink`]
//! - [`HandleRegistry`]: Live resource handles for previews and results

mod entry;
mod handles;
mod lifecycle;
mod progress;
mod state;
mod types;

pub use entry::{
    ConvertedResult, EntryId, EntryState, EntryStatus, PendingRemoval, Queue, QueueEntry, SourceFile,
};
pub use handles::{HandleGuard, HandleRegistry, ResourceHandle};
pub use progress::{
    ActionMode, ChannelSink, CoreEvent, EventSink, Notice, Progress, ProgressType, QueueSummary,
    TracingSink, LONG_NOTICE_DURATION, NOTICE_DURATION,
};
pub use state::{AppState, EntryView};
pub use types::{
    BatchSettings, ConversionOutput, ConversionStats, HexColor, WatermarkPosition, MAX_DIMENSION,
    MAX_QUEUE_ENTRIES, STAGGER_DELAY, UNDO_GRACE_WINDOW,
};
