//! Queue entries and the queue they live in.

use std::fmt;
use std::sync::Arc;
use serde::Serialize;
use tokio::task::AbortHandle;
use uuid::Uuid;
use crate::core::handles::ResourceHandle;
use crate::core::types::ConversionOutput;

/// An input item as supplied by a picker or drop target.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    /// Declared media type (e.g. `image/png`)
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Stable identifier of an entry, generated at intake.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(simple[..12].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Status as reported to front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryStatus {
    Pending,
    Done,
    Failed,
    RemovedPending,
}

/// Converted output together with the handle a front end renders it from.
#[derive(Debug, Clone)]
pub struct ConvertedResult {
    pub output: ConversionOutput,
    pub handle: ResourceHandle,
}

/// The scheduled finalization of a soft-removed entry.
#[derive(Debug)]
pub struct PendingRemoval {
    pub(crate) timer: AbortHandle,
    /// Distinguishes successive removal cycles of the same entry
    pub(crate) generation: u64,
}

/// Lifecycle state of an entry. A result exists exactly when the entry is
/// done (or done and waiting out its undo window).
#[derive(Debug)]
pub enum EntryState {
    Pending,
    Failed { reason: String },
    Done(ConvertedResult),
    RemovalScheduled {
        result: ConvertedResult,
        removal: PendingRemoval,
    },
}

/// One tracked image.
#[derive(Debug)]
pub struct QueueEntry {
    pub id: EntryId,
    pub source: SourceFile,
    pub preview: ResourceHandle,
    pub state: EntryState,
    /// Set once the staggered reveal has shown the entry
    pub revealed: bool,
}

impl QueueEntry {
    pub fn new(source: SourceFile, preview: ResourceHandle) -> Self {
        Self {
            id: EntryId::generate(),
            source,
            preview,
            state: EntryState::Pending,
            revealed: false,
        }
    }

    pub fn status(&self) -> EntryStatus {
        match self.state {
            EntryState::Pending => EntryStatus::Pending,
            EntryState::Failed { .. } => EntryStatus::Failed,
            EntryState::Done(_) => EntryStatus::Done,
            EntryState::RemovalScheduled { .. } => EntryStatus::RemovedPending,
        }
    }

    /// The converted result, if any (including during the undo window).
    pub fn result(&self) -> Option<&ConvertedResult> {
        match &self.state {
            EntryState::Done(result) | EntryState::RemovalScheduled { result, .. } => Some(result),
            _ => None,
        }
    }

    /// Whether the entry is currently shown to the user.
    pub fn is_visible(&self) -> bool {
        self.revealed && !matches!(self.state, EntryState::RemovalScheduled { .. })
    }
}

/// Ordered collection of entries, in arrival order.
#[derive(Debug, Default)]
pub struct Queue {
    entries: Vec<QueueEntry>,
}

impl Queue {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Slots left before the queue reaches capacity.
    pub fn remaining_capacity(&self, capacity: usize) -> usize {
        capacity.saturating_sub(self.entries.len())
    }

    pub fn push(&mut self, entry: QueueEntry) {
        self.entries.push(entry);
    }

    pub fn get(&self, id: &EntryId) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn get_mut(&mut self, id: &EntryId) -> Option<&mut QueueEntry> {
        self.entries.iter_mut().find(|e| &e.id == id)
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.get(id).is_some()
    }

    /// Removes and returns an entry.
    pub fn take(&mut self, id: &EntryId) -> Option<QueueEntry> {
        let idx = self.entries.iter().position(|e| &e.id == id)?;
        Some(self.entries.remove(idx))
    }

    /// Ids of pending entries, in queue order.
    pub fn pending_ids(&self) -> Vec<EntryId> {
        self.entries
            .iter()
            .filter(|e| e.status() == EntryStatus::Pending)
            .map(|e| e.id.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }
}
