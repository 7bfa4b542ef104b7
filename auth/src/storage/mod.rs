//! # Storage Module
//!
//! Durable key/value storage for everything that has to survive the OAuth
//! redirect: ephemeral key material before the callback, the session record
//! after it. The pipeline writes; nobody else does.
//!
//! ## Architecture
//!
//! ```text
//! keys.rs    — Well-known record keys (one place, no typos)
//! db.rs      — sled-backed durable store
//! memory.rs  — In-process store for tests and ephemeral tooling
//! ```
//!
//! ## Design Decisions
//!
//! 1. **Values are JSON.** The proof object is whatever the prover returns,
//!    and JSON is the one format every record here round-trips through
//!    without ceremony.
//!
//! 2. **Removal is batched.** Logout and expiry purge a fixed set of keys
//!    in one atomic batch. Either all of the session disappears or none of
//!    it does.

pub mod db;
pub mod keys;
pub mod memory;

pub use db::SledStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error for key '{key}': {reason}")]
    Serialization { key: String, reason: String },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A durable string-keyed byte store.
///
/// Implementations must make [`remove_many`](Self::remove_many) atomic.
pub trait KeyValueStore: Send + Sync {
    fn get_raw(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    fn put_raw(&self, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Remove every listed key in a single atomic step.
    fn remove_many(&self, keys: &[&str]) -> StorageResult<()>;

    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get_raw(key)?.is_some())
    }
}

/// Typed helpers over any [`KeyValueStore`].
pub trait KeyValueStoreExt: KeyValueStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get_raw(key)? {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                StorageError::Serialization {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            }),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| StorageError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.put_raw(key, bytes)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}
