//! In-memory storage for tests and ephemeral runs.
//!
//! Uses `HashMap` / `BTreeMap` behind locks for thread safety. Nothing
//! survives the process.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError, RwLock};

use anyhow::Result;
use serde_json::Value;

use crate::models::SentenceBatchData;

use super::{BatchBackend, KeyValueStore};

/// In-memory [`BatchBackend`].
pub struct MemoryBackend {
    batches: RwLock<HashMap<String, SentenceBatchData>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            batches: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchBackend for MemoryBackend {
    fn load_all(&self) -> Result<Vec<SentenceBatchData>> {
        let batches = self.batches.read().unwrap_or_else(PoisonError::into_inner);
        Ok(batches.values().cloned().collect())
    }

    fn write(&self, batch: &SentenceBatchData) -> Result<()> {
        let mut batches = self.batches.write().unwrap_or_else(PoisonError::into_inner);
        batches.insert(batch.info.batch_id.clone(), batch.clone());
        Ok(())
    }

    fn remove(&self, batch_id: &str) -> Result<bool> {
        let mut batches = self.batches.write().unwrap_or_else(PoisonError::into_inner);
        Ok(batches.remove(batch_id).is_some())
    }

    fn remove_all(&self) -> Result<()> {
        let mut batches = self.batches.write().unwrap_or_else(PoisonError::into_inner);
        batches.clear();
        Ok(())
    }
}

/// In-memory [`KeyValueStore`].
pub struct MemoryKvStore {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Option<Value> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set_many(&self, entries: &[(&str, Value)]) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in entries {
            values.insert(key.to_string(), value.clone());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}
