#![deny(warnings)]

//! Persistence layer: key-value backends and worksheet snapshots.

pub mod kv;
pub mod snapshot;

use std::path::PathBuf;
use thiserror::Error;

pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use snapshot::{
    decode_snapshot, encode_snapshot, BatchedSnapshotStore, KvSnapshotStore, SnapshotStore,
};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Returns the default directory used for local saves.
pub fn default_data_dir() -> PathBuf {
    PathBuf::from("./saves")
}

/// Snapshot store over a [`FileStore`] rooted at `dir`.
pub fn file_snapshot_store(
    dir: impl Into<PathBuf>,
    key: impl Into<String>,
) -> KvSnapshotStore<FileStore> {
    KvSnapshotStore::new(FileStore::new(dir.into()), key)
}
