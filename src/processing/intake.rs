//! File intake: filtering, capacity enforcement and the staggered reveal.
//!
//! Admission is decided synchronously against the whole incoming list. Only
//! the reveal (the moment an entry is announced to the front end) is spread
//! out over time, one [`STAGGER_DELAY`] per admitted entry.

use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};
use crate::core::{
    AppState, CoreEvent, EntryId, Notice, QueueEntry, SourceFile, MAX_QUEUE_ENTRIES, STAGGER_DELAY,
};
use crate::utils::is_raster_image_type;

/// Outcome of one [`AppState::add_files`] call.
#[derive(Debug)]
pub struct IntakeReport {
    /// Ids of admitted entries, in arrival order
    pub admitted: Vec<EntryId>,
    /// Items dropped because they were not raster images
    pub dropped_non_image: usize,
    /// Images refused because the queue was full
    pub refused: usize,
    staging: Option<JoinHandle<()>>,
}

impl IntakeReport {
    pub fn capacity_exceeded(&self) -> bool {
        self.refused > 0
    }

    /// Waits until every admitted entry has been revealed.
    pub async fn staged(mut self) -> Vec<EntryId> {
        if let Some(staging) = self.staging.take() {
            if let Err(e) = staging.await {
                warn!("Staging task ended abnormally: {}", e);
            }
        }
        self.admitted
    }
}

impl AppState {
    /// Admits `files` into the queue.
    ///
    /// Non-images are dropped silently. When the queue cannot hold every
    /// image, the tail of the list is refused and a notice says so. Admitted
    /// entries count towards capacity immediately; entry `n` is revealed
    /// `n × 100 ms` after this call.
    pub async fn add_files(&self, files: Vec<SourceFile>) -> IntakeReport {
        let total = files.len();
        let mut images: Vec<SourceFile> = files
            .into_iter()
            .filter(|f| is_raster_image_type(&f.mime_type))
            .collect();
        let dropped_non_image = total - images.len();
        if dropped_non_image > 0 {
            debug!("Dropped {} non-image item(s)", dropped_non_image);
        }

        let mut queue = self.queue().await;
        let room = queue.remaining_capacity(MAX_QUEUE_ENTRIES);
        let mut refused = 0;

        if !images.is_empty() && room == 0 {
            refused = images.len();
            images.clear();
            warn!("Queue is full, refusing {} image(s)", refused);
            self.notify(Notice::new(format!("Sorry, the maximum is {MAX_QUEUE_ENTRIES} images.")));
        } else if images.len() > room {
            refused = images.len() - room;
            images.truncate(room);
            warn!("Queue capacity reached, refusing {} image(s)", refused);
            self.notify(Notice::new(format!("Only {room} images added (limit reached).")));
        }

        let mut admitted = Vec::with_capacity(images.len());
        for source in images {
            let preview = self.handles().create(&source.mime_type, source.bytes.len());
            let entry = QueueEntry::new(source, preview);
            admitted.push(entry.id.clone());
            queue.push(entry);
        }
        drop(queue);

        if !admitted.is_empty() {
            info!("Admitted {} image(s)", admitted.len());
        }

        let start = Instant::now();
        let staging = (!admitted.is_empty()).then(|| {
            let state = self.clone();
            let ids = admitted.clone();
            tokio::spawn(async move { state.reveal_staggered(ids, start).await })
        });

        IntakeReport {
            admitted,
            dropped_non_image,
            refused,
            staging,
        }
    }

    async fn reveal_staggered(&self, ids: Vec<EntryId>, start: Instant) {
        for (n, id) in ids.into_iter().enumerate() {
            sleep_until(start + STAGGER_DELAY * n as u32).await;

            let mut queue = self.queue().await;
            // The entry may have been removed before its turn came.
            let Some(entry) = queue.get_mut(&id) else {
                continue;
            };
            entry.revealed = true;
            let event = CoreEvent::EntryAdded {
                id: entry.id.clone(),
                name: entry.source.name.clone(),
                preview_handle: entry.preview.clone(),
            };
            self.emit(event);
            self.emit_queue_state(&queue);
        }
    }
}
