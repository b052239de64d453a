//! Removal, undo and cancellation of queue entries.
//!
//! Pending and failed entries are removed at once. Converted entries are
//! hidden first and only released after [`UNDO_GRACE_WINDOW`], unless
//! [`AppState::undo`] restores them in time.

use std::sync::atomic::Ordering;
use tokio::time::sleep;
use tracing::{debug, info};
use crate::core::entry::{EntryId, EntryState, PendingRemoval, QueueEntry};
use crate::core::progress::{CoreEvent, Notice, LONG_NOTICE_DURATION};
use crate::core::state::AppState;
use crate::core::types::UNDO_GRACE_WINDOW;

impl AppState {
    /// Removes an entry.
    ///
    /// Returns `false` when no entry with `id` exists. Removing an entry that
    /// already waits out its undo window restarts the window.
    pub async fn remove(&self, id: &EntryId) -> bool {
        let mut queue = self.queue().await;
        let Some(entry) = queue.get_mut(id) else {
            debug!("Remove requested for unknown entry {}", id);
            return false;
        };

        let result = match std::mem::replace(&mut entry.state, EntryState::Pending) {
            EntryState::Done(result) => {
                self.emit(CoreEvent::EntryHidden { id: id.clone() });
                result
            }
            EntryState::RemovalScheduled { result, removal } => {
                removal.timer.abort();
                debug!("Restarting undo window of entry {}", id);
                result
            }
            other => {
                entry.state = other;
                if let Some(entry) = queue.take(id) {
                    self.release(&entry);
                }
                self.emit_queue_state(&queue);
                self.notify(Notice::new("Image removed from the list."));
                return true;
            }
        };

        let generation = self.inner.removal_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let state = self.clone();
        let target = id.clone();
        let timer = tokio::spawn(async move {
            sleep(UNDO_GRACE_WINDOW).await;
            state.finalize_removal(&target, generation).await;
        })
        .abort_handle();

        entry.state = EntryState::RemovalScheduled {
            result,
            removal: PendingRemoval { timer, generation },
        };
        self.emit_queue_state(&queue);
        self.notify(
            Notice::new("Image deleted.")
                .with_duration(LONG_NOTICE_DURATION)
                .with_undo(id.clone()),
        );
        true
    }

    /// Cancels a scheduled removal and shows the entry again.
    ///
    /// Does nothing (and returns `false`) unless the entry is inside its
    /// undo window.
    pub async fn undo(&self, id: &EntryId) -> bool {
        let mut queue = self.queue().await;
        let Some(entry) = queue.get_mut(id) else {
            debug!("Undo for entry {} came too late", id);
            return false;
        };
        if !matches!(entry.state, EntryState::RemovalScheduled { .. }) {
            return false;
        }

        if let EntryState::RemovalScheduled { result, removal } =
            std::mem::replace(&mut entry.state, EntryState::Pending)
        {
            removal.timer.abort();
            entry.state = EntryState::Done(result);
        }

        self.emit(CoreEvent::EntryRestored { id: id.clone() });
        self.emit_queue_state(&queue);
        self.notify(Notice::new("Image restored."));
        true
    }

    /// Drops every pending entry. Returns how many were removed.
    pub async fn cancel_selection(&self) -> usize {
        let mut queue = self.queue().await;
        let pending = queue.pending_ids();
        for id in &pending {
            if let Some(entry) = queue.take(id) {
                self.release(&entry);
            }
        }
        info!("Cancelled {} pending image(s)", pending.len());

        self.emit_queue_state(&queue);
        self.notify(Notice::new("Selection cleared."));
        pending.len()
    }

    /// Called by the grace timer of removal cycle `generation`.
    async fn finalize_removal(&self, id: &EntryId, generation: u64) {
        let mut queue = self.queue().await;
        let current = matches!(
            queue.get(id).map(|e| &e.state),
            Some(EntryState::RemovalScheduled { removal, .. }) if removal.generation == generation
        );
        if !current {
            return;
        }

        if let Some(entry) = queue.take(id) {
            debug!("Undo window of entry {} elapsed", id);
            self.release(&entry);
        }
        self.emit_queue_state(&queue);
    }

    /// Revokes every handle of an entry already taken out of the queue.
    fn release(&self, entry: &QueueEntry) {
        self.handles().revoke(&entry.preview);
        if let Some(result) = entry.result() {
            self.handles().revoke(&result.handle);
        }
        self.emit(CoreEvent::EntryRemoved { id: entry.id.clone() });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use crate::core::entry::{ConvertedResult, EntryStatus, SourceFile};
    use crate::core::handles::HandleRegistry;
    use crate::core::progress::ChannelSink;
    use crate::core::types::{ConversionOutput, ConversionStats};
    use crate::processing::engine::ConversionEngine;
    use crate::utils::OutputFormat;
    use super::*;

    fn state() -> AppState {
        let (sink, _rx) = ChannelSink::new();
        AppState::new(ConversionEngine::native(HandleRegistry::new()), Arc::new(sink))
    }

    /// Admits one entry and marks it converted without running the engine.
    async fn done_entry(state: &AppState) -> EntryId {
        let ids = state
            .add_files(vec![SourceFile::new("photo.jpg", "image/jpeg", vec![0u8; 64])])
            .await
            .staged()
            .await;
        let id = ids[0].clone();
        let mut queue = state.queue().await;
        let handle = state.handles().create("image/webp", 16);
        if let Some(entry) = queue.get_mut(&id) {
            entry.state = EntryState::Done(ConvertedResult {
                output: ConversionOutput {
                    payload: vec![0u8; 16].into(),
                    format: OutputFormat::WebP,
                    stats: ConversionStats::new(64, 16),
                    dimensions: (4, 4),
                },
                handle,
            });
        }
        id
    }

    #[tokio::test(start_paused = true)]
    async fn pending_removal_is_immediate_and_final() {
        let state = state();
        let ids = state
            .add_files(vec![SourceFile::new("a.png", "image/png", vec![1u8; 4])])
            .await
            .staged()
            .await;

        assert!(state.remove(&ids[0]).await);
        assert!(state.is_empty().await);
        assert!(!state.undo(&ids[0]).await);
        assert_eq!(state.handles().live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn undo_within_window_restores() {
        let state = state();
        let id = done_entry(&state).await;

        assert!(state.remove(&id).await);
        assert_eq!(state.status_of(&id).await, Some(EntryStatus::RemovedPending));
        assert_eq!(state.summary().await.total, 0);

        tokio::time::sleep(Duration::from_millis(4000)).await;
        assert!(state.undo(&id).await);
        assert_eq!(state.status_of(&id).await, Some(EntryStatus::Done));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(state.status_of(&id).await, Some(EntryStatus::Done));
        assert_eq!(state.handles().live_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn window_expiry_releases_everything() {
        let state = state();
        let id = done_entry(&state).await;

        state.remove(&id).await;
        tokio::time::sleep(UNDO_GRACE_WINDOW + Duration::from_millis(1)).await;

        assert!(state.is_empty().await);
        assert!(!state.undo(&id).await);
        assert_eq!(state.handles().live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_removal_restarts_the_window() {
        let state = state();
        let id = done_entry(&state).await;

        state.remove(&id).await;
        tokio::time::sleep(Duration::from_millis(3000)).await;
        state.remove(&id).await;

        // The first timer would have fired here.
        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(state.status_of(&id).await, Some(EntryStatus::RemovedPending));
        let hidden = state.entries().await.into_iter().filter(|e| !e.visible).count();
        assert_eq!(hidden, 1);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(state.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn undo_outside_a_window_changes_nothing() {
        let state = state();
        let id = done_entry(&state).await;

        assert!(!state.undo(&id).await);
        assert!(!state.undo(&id).await);
        assert_eq!(state.status_of(&id).await, Some(EntryStatus::Done));
        assert!(!state.undo(&EntryId::from("missing")).await);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_selection_keeps_converted_entries() {
        let state = state();
        let done = done_entry(&state).await;
        state
            .add_files(vec![
                SourceFile::new("b.png", "image/png", vec![1u8; 4]),
                SourceFile::new("c.png", "image/png", vec![1u8; 4]),
            ])
            .await
            .staged()
            .await;

        assert_eq!(state.cancel_selection().await, 2);
        assert_eq!(state.len().await, 1);
        assert_eq!(state.status_of(&done).await, Some(EntryStatus::Done));
    }
}
