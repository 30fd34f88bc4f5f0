//! Worksheet snapshot codec and write strategies.

use crate::kv::KeyValueStore;
use crate::PersistError;
use plan_core::WorksheetState;
use tracing::{debug, warn};

/// Serialize the whole worksheet as a JSON document.
pub fn encode_snapshot(state: &WorksheetState) -> Result<String, PersistError> {
    Ok(serde_json::to_string(state)?)
}

/// Parse a JSON snapshot. Keys missing from the document take defaults.
pub fn decode_snapshot(text: &str) -> Result<WorksheetState, PersistError> {
    Ok(serde_json::from_str(text)?)
}

/// Where the worksheet is loaded from and saved to.
///
/// `save` always receives the complete record; implementations decide when
/// it reaches durable storage.
pub trait SnapshotStore {
    fn load(&self) -> Result<Option<WorksheetState>, PersistError>;
    fn save(&mut self, state: &WorksheetState) -> Result<(), PersistError>;
    /// Push any buffered snapshot to storage.
    fn flush(&mut self) -> Result<(), PersistError> {
        Ok(())
    }
}

/// Writes every snapshot straight to a key-value store under a fixed key.
#[derive(Debug)]
pub struct KvSnapshotStore<K> {
    kv: K,
    key: String,
}

impl<K: KeyValueStore> KvSnapshotStore<K> {
    pub fn new(kv: K, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    pub fn into_inner(self) -> K {
        self.kv
    }
}

impl<K: KeyValueStore> SnapshotStore for KvSnapshotStore<K> {
    fn load(&self) -> Result<Option<WorksheetState>, PersistError> {
        match self.kv.get(&self.key)? {
            Some(text) => decode_snapshot(&text).map(Some),
            None => Ok(None),
        }
    }

    fn save(&mut self, state: &WorksheetState) -> Result<(), PersistError> {
        let text = encode_snapshot(state)?;
        self.kv.set(&self.key, &text)?;
        debug!(key = %self.key, "snapshot saved");
        Ok(())
    }
}

/// Buffers snapshots and writes only the latest one every `batch_size`
/// saves, on `flush`, and on drop.
#[derive(Debug)]
pub struct BatchedSnapshotStore<S: SnapshotStore> {
    inner: S,
    pending: Option<WorksheetState>,
    pending_saves: usize,
    batch_size: usize,
}

impl<S: SnapshotStore> BatchedSnapshotStore<S> {
    /// `batch_size` of 0 is treated as 1.
    pub fn new(inner: S, batch_size: usize) -> Self {
        Self {
            inner,
            pending: None,
            pending_saves: 0,
            batch_size: batch_size.max(1),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl<S: SnapshotStore> SnapshotStore for BatchedSnapshotStore<S> {
    fn load(&self) -> Result<Option<WorksheetState>, PersistError> {
        match &self.pending {
            Some(state) => Ok(Some(state.clone())),
            None => self.inner.load(),
        }
    }

    fn save(&mut self, state: &WorksheetState) -> Result<(), PersistError> {
        self.pending = Some(state.clone());
        self.pending_saves += 1;
        if self.pending_saves >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), PersistError> {
        if let Some(state) = self.pending.take() {
            self.pending_saves = 0;
            if let Err(e) = self.inner.save(&state) {
                // Keep it so a later flush can retry.
                self.pending = Some(state);
                return Err(e);
            }
        }
        self.inner.flush()
    }
}

impl<S: SnapshotStore> Drop for BatchedSnapshotStore<S> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "dropping unsaved worksheet snapshot");
        }
    }
}
