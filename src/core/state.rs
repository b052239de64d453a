//! Application state shared by intake, batch processing and lifecycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use crate::core::entry::{EntryId, EntryStatus, Queue};
use crate::core::handles::HandleRegistry;
use crate::core::progress::{CoreEvent, EventSink, Notice, QueueSummary, LONG_NOTICE_DURATION};
use crate::core::types::ConversionStats;
use crate::processing::capability;
use crate::processing::engine::ConversionEngine;

pub(crate) struct StateInner {
    pub(crate) queue: Mutex<Queue>,
    pub(crate) engine: ConversionEngine,
    pub(crate) handles: HandleRegistry,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) supports_webp: AtomicBool,
    pub(crate) capability_checked: AtomicBool,
    pub(crate) processing: AtomicBool,
    pub(crate) removal_generation: AtomicU64,
}

/// Application state.
///
/// Cheap to clone; every clone refers to the same queue. The queue is only
/// mutated while its lock is held, and entries are always looked up again
/// after any suspension point.
#[derive(Clone)]
pub struct AppState {
    pub(crate) inner: Arc<StateInner>,
}

/// Read-only view of one entry.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub id: EntryId,
    pub name: String,
    pub status: EntryStatus,
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ConversionStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AppState {
    /// Creates a new application state around `engine`, reporting to `events`.
    ///
    /// WebP support starts out unknown (treated as unsupported) until
    /// [`AppState::detect_capabilities`] runs.
    pub fn new(engine: ConversionEngine, events: Arc<dyn EventSink>) -> Self {
        let handles = engine.handles().clone();
        Self {
            inner: Arc::new(StateInner {
                queue: Mutex::new(Queue::default()),
                engine,
                handles,
                events,
                supports_webp: AtomicBool::new(false),
                capability_checked: AtomicBool::new(false),
                processing: AtomicBool::new(false),
                removal_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Runs the encoder capability probe once and caches the answer.
    ///
    /// When WebP is unavailable a one-time notice announces the PNG fallback.
    /// Later calls return the cached result.
    pub async fn detect_capabilities(&self) -> bool {
        if self.inner.capability_checked.swap(true, Ordering::SeqCst) {
            return self.supports_webp();
        }

        let supported = capability::detect(self.inner.engine.exporter()).await;
        self.inner.supports_webp.store(supported, Ordering::SeqCst);
        info!("WebP encoding {}", if supported { "supported" } else { "unsupported, using PNG" });

        if !supported {
            self.notify(
                Notice::new("This platform cannot encode WebP. Images will be converted to PNG instead.")
                    .with_duration(LONG_NOTICE_DURATION),
            );
        }
        supported
    }

    pub fn supports_webp(&self) -> bool {
        self.inner.supports_webp.load(Ordering::SeqCst)
    }

    pub fn is_processing(&self) -> bool {
        self.inner.processing.load(Ordering::SeqCst)
    }

    pub fn handles(&self) -> &HandleRegistry {
        &self.inner.handles
    }

    pub fn engine(&self) -> &ConversionEngine {
        &self.inner.engine
    }

    pub(crate) async fn queue(&self) -> MutexGuard<'_, Queue> {
        self.inner.queue.lock().await
    }

    pub(crate) fn emit(&self, event: CoreEvent) {
        self.inner.events.emit(event);
    }

    pub(crate) fn notify(&self, notice: Notice) {
        debug!("Notice: {}", notice.message);
        self.emit(CoreEvent::Notice(notice));
    }

    pub(crate) fn summarize(&self, queue: &Queue) -> QueueSummary {
        QueueSummary::from_statuses(
            queue.iter().filter(|e| e.revealed).map(|e| e.status()),
            self.is_processing(),
        )
    }

    /// Emits the aggregate queue state computed from `queue`.
    pub(crate) fn emit_queue_state(&self, queue: &Queue) {
        self.emit(CoreEvent::QueueState(self.summarize(queue)));
    }

    /// Current aggregate queue state.
    pub async fn summary(&self) -> QueueSummary {
        let queue = self.queue().await;
        self.summarize(&queue)
    }

    /// Number of entries held, including ones not yet revealed or waiting
    /// out an undo window.
    pub async fn len(&self) -> usize {
        self.queue().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queue().await.is_empty()
    }

    pub async fn status_of(&self, id: &EntryId) -> Option<EntryStatus> {
        self.queue().await.get(id).map(|e| e.status())
    }

    /// Views of all entries in queue order.
    pub async fn entries(&self) -> Vec<EntryView> {
        let queue = self.queue().await;
        queue
            .iter()
            .map(|entry| {
                let result = entry.result();
                EntryView {
                    id: entry.id.clone(),
                    name: entry.source.name.clone(),
                    status: entry.status(),
                    visible: entry.is_visible(),
                    extension: result.map(|r| r.output.extension().to_string()),
                    stats: result.map(|r| r.output.stats.clone()),
                    error: match &entry.state {
                        crate::core::EntryState::Failed { reason } => Some(reason.clone()),
                        _ => None,
                    },
                }
            })
            .collect()
    }
}
