//! Events emitted by the core for whatever front end renders the queue.

use std::time::Duration;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};
use crate::core::entry::{EntryId, EntryStatus};
use crate::core::handles::ResourceHandle;
use crate::core::types::ConversionStats;

/// Default display time of a notice.
pub const NOTICE_DURATION: Duration = Duration::from_millis(3000);

/// Display time of notices that carry an action (undo) or a session-wide warning.
pub const LONG_NOTICE_DURATION: Duration = Duration::from_millis(5000);

/// Progress message type
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ProgressType {
    Start,
    Progress,
    Complete,
    Error,
}

/// Batch progress, emitted after every processed entry
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Progress type (start, progress, complete, error)
    pub progress_type: ProgressType,
    /// Number of completed tasks
    pub completed_tasks: usize,
    /// Total number of tasks
    pub total_tasks: usize,
    /// Progress percentage (0-100)
    pub progress_percentage: usize,
    /// Current status message
    pub status: String,
    /// Entry this update is about, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<EntryId>,
    /// Optional error message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Progress {
    /// Create a new Progress instance with basic information
    pub fn new(
        progress_type: ProgressType,
        completed_tasks: usize,
        total_tasks: usize,
        status: &str,
    ) -> Self {
        let progress_percentage = if total_tasks > 0 {
            (completed_tasks * 100) / total_tasks
        } else {
            0
        };

        Self {
            progress_type,
            completed_tasks,
            total_tasks,
            progress_percentage,
            status: status.to_string(),
            task_id: None,
            error: None,
        }
    }

    pub fn with_task(mut self, id: EntryId) -> Self {
        self.task_id = Some(id);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Completed fraction in [0, 1]
    pub fn fraction(&self) -> f64 {
        if self.total_tasks == 0 {
            0.0
        } else {
            self.completed_tasks as f64 / self.total_tasks as f64
        }
    }
}

/// A single auto-dismissing message for the user.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub message: String,
    #[serde(rename = "durationMs", serialize_with = "serialize_millis")]
    pub duration: Duration,
    /// Entry the notice offers an undo for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undo: Option<EntryId>,
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(duration.as_millis() as u64)
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            duration: NOTICE_DURATION,
            undo: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_undo(mut self, id: EntryId) -> Self {
        self.undo = Some(id);
        self
    }
}

/// What the main action of a front end should offer.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ActionMode {
    /// Nothing queued
    Hidden,
    /// Pending entries can be converted
    Ready { pending: usize },
    /// A batch is running
    Processing,
    /// Everything is converted; offer the archive
    Download { done: usize },
}

/// Aggregate queue counts, recomputed after every queue change.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueueSummary {
    pub total: usize,
    pub pending: usize,
    pub done: usize,
    pub failed: usize,
    pub processing: bool,
    pub action: ActionMode,
}

impl QueueSummary {
    /// Counts visible statuses and derives the action mode.
    pub fn from_statuses(statuses: impl IntoIterator<Item = EntryStatus>, processing: bool) -> Self {
        let (mut total, mut pending, mut done, mut failed) = (0, 0, 0, 0);
        for status in statuses {
            total += 1;
            match status {
                EntryStatus::Pending => pending += 1,
                EntryStatus::Done => done += 1,
                EntryStatus::Failed => failed += 1,
                EntryStatus::RemovedPending => total -= 1,
            }
        }

        let action = if total == 0 {
            ActionMode::Hidden
        } else if pending > 0 && !processing {
            ActionMode::Ready { pending }
        } else if pending == 0 && done > 0 && !processing {
            ActionMode::Download { done }
        } else {
            ActionMode::Processing
        };

        Self { total, pending, done, failed, processing, action }
    }
}

/// Everything the core tells a front end.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CoreEvent {
    #[serde(rename_all = "camelCase")]
    EntryAdded {
        id: EntryId,
        name: String,
        preview_handle: ResourceHandle,
    },
    #[serde(rename_all = "camelCase")]
    EntryUpdated {
        id: EntryId,
        status: EntryStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        extension: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stats: Option<ConversionStats>,
        #[serde(skip_serializing_if = "Option::is_none")]
        result_handle: Option<ResourceHandle>,
    },
    EntryHidden { id: EntryId },
    EntryRestored { id: EntryId },
    EntryRemoved { id: EntryId },
    BatchProgress(Progress),
    QueueState(QueueSummary),
    Notice(Notice),
}

/// Receives core events. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: CoreEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: CoreEvent) {
        match &event {
            CoreEvent::Notice(notice) => info!("{}", notice.message),
            CoreEvent::BatchProgress(progress) => debug!(
                "Progress {}/{} ({}%): {}",
                progress.completed_tasks, progress.total_tasks, progress.progress_percentage, progress.status
            ),
            other => debug!("{other:?}"),
        }
    }
}

/// Forwards events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<CoreEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CoreEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: CoreEvent) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_is_integer_fraction() {
        let progress = Progress::new(ProgressType::Progress, 1, 3, "processing");
        assert_eq!(progress.progress_percentage, 33);
        assert!((progress.fraction() - 1.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(Progress::new(ProgressType::Start, 0, 0, "idle").progress_percentage, 0);
    }

    #[test]
    fn summary_derives_action_mode() {
        use EntryStatus::*;
        assert_eq!(QueueSummary::from_statuses([], false).action, ActionMode::Hidden);
        assert_eq!(
            QueueSummary::from_statuses([Pending, Done], false).action,
            ActionMode::Ready { pending: 1 }
        );
        assert_eq!(QueueSummary::from_statuses([Pending, Done], true).action, ActionMode::Processing);
        assert_eq!(
            QueueSummary::from_statuses([Done, Failed, Done], false).action,
            ActionMode::Download { done: 2 }
        );
        let hidden_only = QueueSummary::from_statuses([RemovedPending], false);
        assert_eq!(hidden_only.total, 0);
        assert_eq!(hidden_only.action, ActionMode::Hidden);
    }

    #[test]
    fn events_serialize_for_front_ends() {
        let event = CoreEvent::Notice(Notice::new("hi").with_duration(LONG_NOTICE_DURATION));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "notice");
        assert_eq!(json["durationMs"], 5000);

        let progress = CoreEvent::BatchProgress(Progress::new(ProgressType::Complete, 2, 2, "complete"));
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["type"], "batchProgress");
        assert_eq!(json["progressPercentage"], 100);
    }

    #[tokio::test]
    async fn channel_sink_forwards() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit(CoreEvent::EntryRemoved { id: EntryId::from("abc") });
        assert_eq!(rx.recv().await, Some(CoreEvent::EntryRemoved { id: EntryId::from("abc") }));
    }
}
