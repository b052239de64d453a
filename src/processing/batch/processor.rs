use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};
use crate::core::{
    AppState, BatchSettings, ConvertedResult, CoreEvent, EntryId, EntryState, EntryStatus, Notice,
    Progress, ProgressType,
};
use crate::utils::{validate_settings, ConverterError, ConverterResult};

/// Outcome of one batch run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    /// Entries in the snapshot taken when the run started
    pub total: usize,
    pub converted: Vec<EntryId>,
    /// (file name, error message)
    pub failed: Vec<(String, String)>,
    /// Entries removed before their turn came
    pub skipped: usize,
}

/// What happened to one entry of the snapshot.
enum EntryOutcome {
    /// Removed before its turn; not counted
    Skipped,
    /// Removed while converting; counted, result dropped
    Discarded,
    Converted,
    Failed(String),
}

/// Clears the processing flag however the run ends.
struct ProcessingGuard<'a>(&'a AppState);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.inner.processing.store(false, Ordering::SeqCst);
    }
}

/// Converts the pending entries of a queue one at a time.
pub struct BatchProcessor {
    state: AppState,
    settings: BatchSettings,
}

impl BatchProcessor {
    /// `settings` stay fixed for the whole run.
    pub fn new(state: AppState, settings: BatchSettings) -> Self {
        Self { state, settings }
    }

    /// Processes a snapshot of the pending entries in queue order.
    ///
    /// Each entry is fully converted before the next one starts. A failed
    /// entry is marked `Failed` and the run moves on; entries removed
    /// mid-run are skipped and not counted towards progress.
    pub async fn process_batch(self) -> ConverterResult<BatchSummary> {
        validate_settings(&self.settings)?;

        let state = &self.state;
        if state
            .inner
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ConverterError::BatchInProgress);
        }
        let guard = ProcessingGuard(state);

        let snapshot = {
            let queue = state.queue().await;
            state.emit_queue_state(&queue);
            queue.pending_ids()
        };
        let total = snapshot.len();
        let mut summary = BatchSummary { total, ..BatchSummary::default() };

        if total == 0 {
            debug!("No pending entries to convert");
        } else {
            let supports_webp = state.supports_webp();
            info!(
                "Converting {} image(s) to {} at quality {}%",
                total,
                if supports_webp { "WebP" } else { "PNG" },
                self.settings.quality_percent()
            );
            state.emit(CoreEvent::BatchProgress(Progress::new(
                ProgressType::Start,
                0,
                total,
                &format!("Converting {total} images"),
            )));

            let mut completed = 0;
            for id in snapshot {
                let outcome = self.process_entry(&id, supports_webp, &mut summary).await;
                if matches!(outcome, EntryOutcome::Skipped) {
                    continue;
                }
                completed += 1;

                let update = match outcome {
                    EntryOutcome::Failed(error) => {
                        Progress::new(ProgressType::Error, completed, total, "Conversion failed").with_error(error)
                    }
                    _ => Progress::new(ProgressType::Progress, completed, total, "Converting"),
                };
                state.emit(CoreEvent::BatchProgress(update.with_task(id.clone())));
            }

            state.emit(CoreEvent::BatchProgress(Progress::new(
                ProgressType::Complete,
                completed,
                total,
                "Conversion finished",
            )));

            if summary.failed.is_empty() {
                info!("Batch completed successfully: {} image(s) converted", summary.converted.len());
            } else {
                warn!(
                    "Batch completed with {} failed image(s) out of {}",
                    summary.failed.len(),
                    total
                );
            }
        }

        drop(guard);
        state.emit_queue_state(&*state.queue().await);
        Ok(summary)
    }

    /// Converts one entry and records the result on it.
    async fn process_entry(&self, id: &EntryId, supports_webp: bool, summary: &mut BatchSummary) -> EntryOutcome {
        let state = &self.state;

        let source = {
            let queue = state.queue().await;
            match queue.get(id) {
                Some(entry) if entry.status() == EntryStatus::Pending => entry.source.clone(),
                _ => {
                    debug!("Entry {} was removed before conversion, skipping", id);
                    summary.skipped += 1;
                    return EntryOutcome::Skipped;
                }
            }
        };

        let result = state
            .engine()
            .convert_async(
                source.name.clone(),
                source.mime_type.clone(),
                source.bytes.clone(),
                self.settings.clone(),
                supports_webp,
            )
            .await;

        let mut queue = state.queue().await;
        let Some(entry) = queue.get_mut(id) else {
            debug!("Entry {} was removed during conversion, discarding result", id);
            return EntryOutcome::Discarded;
        };

        match result {
            Ok(output) => {
                let handle = state.handles().create(output.format.mime_type(), output.payload.len());
                let event = CoreEvent::EntryUpdated {
                    id: id.clone(),
                    status: EntryStatus::Done,
                    extension: Some(output.extension().to_string()),
                    stats: Some(output.stats.clone()),
                    result_handle: Some(handle.clone()),
                };
                entry.state = EntryState::Done(ConvertedResult { output, handle });
                state.emit(event);
                summary.converted.push(id.clone());
                EntryOutcome::Converted
            }
            Err(e) => {
                warn!("Failed to convert '{}': {}", source.name, e);
                let reason = e.to_string();
                entry.state = EntryState::Failed { reason: reason.clone() };
                state.emit(CoreEvent::EntryUpdated {
                    id: id.clone(),
                    status: EntryStatus::Failed,
                    extension: None,
                    stats: None,
                    result_handle: None,
                });
                state.notify(Notice::new(format!("Failed to convert image: {}", source.name)));
                summary.failed.push((source.name, reason.clone()));
                EntryOutcome::Failed(reason)
            }
        }
    }
}

impl AppState {
    /// Runs one batch over the currently pending entries with `settings`.
    ///
    /// Fails only for invalid settings or when a batch is already running;
    /// per-entry failures are reported in the summary.
    pub async fn run_batch(&self, settings: BatchSettings) -> ConverterResult<BatchSummary> {
        BatchProcessor::new(self.clone(), settings).process_batch().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use crate::core::{ChannelSink, HandleRegistry, SourceFile};
    use crate::processing::engine::ConversionEngine;
    use super::*;

    fn state() -> AppState {
        let (sink, _rx) = ChannelSink::new();
        AppState::new(ConversionEngine::native(HandleRegistry::new()), Arc::new(sink))
    }

    #[tokio::test]
    async fn empty_queue_runs_trivially() {
        let summary = state().run_batch(BatchSettings::default()).await.unwrap();
        assert_eq!(summary, BatchSummary::default());
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected_before_anything_runs() {
        let state = state();
        let settings = BatchSettings { quality: 1.5, ..BatchSettings::default() };
        let err = state.run_batch(settings).await.unwrap_err();
        assert!(matches!(err, ConverterError::Validation(_)));
        assert!(!state.is_processing());
    }

    #[tokio::test]
    async fn second_run_while_processing_is_refused() {
        let state = state();
        state.inner.processing.store(true, Ordering::SeqCst);
        let err = state.run_batch(BatchSettings::default()).await.unwrap_err();
        assert_eq!(err, ConverterError::BatchInProgress);
        // The refused run must not clear the running batch's flag.
        assert!(state.is_processing());
    }

    #[tokio::test(start_paused = true)]
    async fn corrupt_entry_is_marked_failed_and_not_retried() {
        let state = state();
        let ids = state
            .add_files(vec![SourceFile::new("broken.png", "image/png", b"not a png".to_vec())])
            .await
            .staged()
            .await;

        let first = state.run_batch(BatchSettings::default()).await.unwrap();
        assert_eq!(first.failed.len(), 1);
        assert_eq!(first.failed[0].0, "broken.png");
        assert_eq!(state.status_of(&ids[0]).await, Some(EntryStatus::Failed));

        let second = state.run_batch(BatchSettings::default()).await.unwrap();
        assert_eq!(second.total, 0);
        assert!(!state.is_processing());
    }
}
