//! # SledStore — Durable Session Storage
//!
//! The persistence layer for the session manager, built on sled's embedded
//! key-value store. One named tree ([`STORAGE_TREE`]) holds every record;
//! keys are UTF-8 strings from [`super::keys`].
//!
//! ## Atomicity
//!
//! Purges go through a single sled `Batch`, so a crash mid-logout can't
//! leave behind a session record without its ephemeral key or the other
//! way around.
//!
//! ## Durability
//!
//! Every write is followed by a flush. The whole point of this store is to
//! outlive the process that wrote it (the CLI exits between `login` and
//! `callback`), and sled's background flush is not a promise.

use sled::{Batch, Db, Tree};
use std::path::Path;

use super::{KeyValueStore, StorageResult};
use crate::config::STORAGE_TREE;

/// sled-backed [`KeyValueStore`].
///
/// sled is internally synchronized, so a `SledStore` can be shared via
/// `Arc` without external locking.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
    tree: Tree,
}

impl SledStore {
    /// Open or create a store at the given directory.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A store that lives in a temporary directory and is removed on drop.
    /// Ideal for tests.
    pub fn open_temporary() -> StorageResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StorageResult<Self> {
        let tree = db.open_tree(STORAGE_TREE)?;
        Ok(Self { db, tree })
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Flush outstanding writes to disk.
    pub fn flush(&self) -> StorageResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl KeyValueStore for SledStore {
    fn get_raw(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.tree.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    fn put_raw(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.tree.insert(key.as_bytes(), value)?;
        self.flush()
    }

    fn remove_many(&self, keys: &[&str]) -> StorageResult<()> {
        let mut batch = Batch::default();
        for key in keys {
            batch.remove(key.as_bytes());
        }
        self.tree.apply_batch(batch)?;
        self.flush()
    }
}
