//! In-process [`KeyValueStore`].
//!
//! Not durable. Useful in tests and in hosts that bring their own
//! persistence and only want the pipeline logic.

use parking_lot::RwLock;
use std::collections::HashMap;

use super::{KeyValueStore, StorageResult};

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.records.read().get(key).cloned())
    }

    fn put_raw(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.records.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> StorageResult<()> {
        // Single write guard for the whole set.
        let mut records = self.records.write();
        for key in keys {
            records.remove(*key);
        }
        Ok(())
    }
}
