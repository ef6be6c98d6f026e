//! In-memory content handles for uploaded files
//!
//! Every accepted upload is parked here and referenced by a [`ContentHandle`].
//! Handles are used for previews and when building comparison requests, and
//! must be released exactly once when the owning file set is discarded.
//! Reading a released handle and releasing twice are both reported as errors.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Opaque identifier for a stored upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HandleId(u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "content#{}", self.0)
    }
}

/// Revocable reference to one file's bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContentHandle {
    id: HandleId,
}

impl ContentHandle {
    pub fn id(&self) -> HandleId {
        self.id
    }
}

/// Content handle misuse
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    #[error("{0} was already released")]
    Released(HandleId),

    #[error("{0} released twice")]
    DoubleRelease(HandleId),

    #[error("{0} is not known to this store")]
    Unknown(HandleId),
}

/// Ids are issued in increasing order, so an issued id that is no longer
/// live has been released; no per-handle record outlives its bytes.
#[derive(Default)]
struct StoreInner {
    last_issued: u64,
    live: HashMap<HandleId, Arc<[u8]>>,
}

impl StoreInner {
    fn was_issued(&self, id: HandleId) -> bool {
        id.0 != 0 && id.0 <= self.last_issued
    }
}

/// Shared store of uploaded content
///
/// Cloning yields another reference to the same store.
#[derive(Clone, Default)]
pub struct ContentStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // A panic while holding the lock cannot leave the maps half-updated
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Park `bytes` and return a fresh handle to them
    pub fn acquire(&self, bytes: Vec<u8>) -> ContentHandle {
        let mut inner = self.lock();
        inner.last_issued += 1;
        let id = HandleId(inner.last_issued);
        inner.live.insert(id, Arc::from(bytes));
        ContentHandle { id }
    }

    /// Borrow the bytes behind a live handle
    pub fn read(&self, handle: &ContentHandle) -> Result<Arc<[u8]>, HandleError> {
        let inner = self.lock();
        match inner.live.get(&handle.id) {
            Some(bytes) => Ok(Arc::clone(bytes)),
            None if inner.was_issued(handle.id) => Err(HandleError::Released(handle.id)),
            None => Err(HandleError::Unknown(handle.id)),
        }
    }

    /// Drop the bytes behind a handle
    pub fn release(&self, handle: &ContentHandle) -> Result<(), HandleError> {
        let mut inner = self.lock();
        if inner.live.remove(&handle.id).is_some() {
            tracing::trace!(handle = %handle.id, "Released content handle");
            Ok(())
        } else if inner.was_issued(handle.id) {
            Err(HandleError::DoubleRelease(handle.id))
        } else {
            Err(HandleError::Unknown(handle.id))
        }
    }

    pub fn is_live(&self, handle: &ContentHandle) -> bool {
        self.lock().live.contains_key(&handle.id)
    }

    /// Number of handles acquired and not yet released
    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    /// Total bytes currently held
    pub fn live_bytes(&self) -> usize {
        self.lock().live.values().map(|b| b.len()).sum()
    }
}
