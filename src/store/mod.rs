//! One-JSON-file-per-key record storage.

pub mod key_lock;
pub mod record_store;

use std::path::PathBuf;

use thiserror::Error;

use crate::models::StorageKey;

pub use key_lock::KeyLocks;
pub use record_store::RecordStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt record {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Record serialization failed for {key}: {source}")]
    Serialize {
        key: StorageKey,
        #[source]
        source: serde_json::Error,
    },

    #[error("Record not found: {0}")]
    NotFound(StorageKey),
}
