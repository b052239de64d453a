//! Revocable handles to renderable views of in-memory payloads.
//!
//! A [`ResourceHandle`] plays the role an object URL plays in a browser: a
//! front end can render from it until it is revoked. The registry tracks
//! which handles are live so every owner can release its handle exactly once.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use serde::Serialize;
use tracing::trace;

/// Opaque reference to a registered payload view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceHandle(String);

impl ResourceHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
struct HandleRecord {
    mime_type: String,
    byte_len: usize,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: AtomicU64,
    live: Mutex<HashMap<ResourceHandle, HandleRecord>>,
}

/// Shared registry of live handles. Cloning shares the same registry.
#[derive(Debug, Clone, Default)]
pub struct HandleRegistry {
    inner: Arc<RegistryInner>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self) -> MutexGuard<'_, HashMap<ResourceHandle, HandleRecord>> {
        self.inner.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a view of a payload and returns its handle.
    pub fn create(&self, mime_type: &str, byte_len: usize) -> ResourceHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = ResourceHandle(format!("blob:image-converter/{id}"));
        self.live().insert(handle.clone(), HandleRecord {
            mime_type: mime_type.to_string(),
            byte_len,
        });
        trace!("Created handle {} ({}, {} bytes)", handle, mime_type, byte_len);
        handle
    }

    /// Releases a handle. Returns `false` when it was already released.
    pub fn revoke(&self, handle: &ResourceHandle) -> bool {
        let removed = self.live().remove(handle);
        match removed {
            Some(record) => {
                trace!("Revoked handle {} ({}, {} bytes)", handle, record.mime_type, record.byte_len);
                true
            }
            None => false,
        }
    }

    pub fn is_live(&self, handle: &ResourceHandle) -> bool {
        self.live().contains_key(handle)
    }

    /// Number of handles not yet revoked.
    pub fn live_count(&self) -> usize {
        self.live().len()
    }

    /// Creates a handle that is revoked when the guard goes out of scope.
    pub fn scoped(&self, mime_type: &str, byte_len: usize) -> HandleGuard {
        HandleGuard {
            handle: self.create(mime_type, byte_len),
            registry: self.clone(),
        }
    }
}

/// Revokes its handle on drop, on every exit path.
#[derive(Debug)]
pub struct HandleGuard {
    handle: ResourceHandle,
    registry: HandleRegistry,
}

impl HandleGuard {
    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.registry.revoke(&self.handle);
    }
}
