//! Filesystem-backed storage.
//!
//! Batches live one per file as `batch_<uuid>.json` in a directory; the
//! key/value store is a single flat JSON object. Every write goes to a
//! sibling temp file first and is renamed into place, so readers see either
//! the old file or the new one.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::models::SentenceBatchData;

use super::{BatchBackend, KeyValueStore};

/// Replace `path` with `bytes` via write-to-temp and rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, bytes).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

// ============ Batch directory ============

/// One JSON file per batch in a directory.
pub struct DirBackend {
    dir: PathBuf,
}

impl DirBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn batch_path(&self, batch_id: &str) -> PathBuf {
        self.dir.join(format!("batch_{}.json", batch_id))
    }
}

impl BatchBackend for DirBackend {
    fn load_all(&self) -> Result<Vec<SentenceBatchData>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut batches = Vec::new();
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read batch directory: {}", self.dir.display()))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let decoded = fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|text| {
                    serde_json::from_str::<SentenceBatchData>(&text).map_err(anyhow::Error::from)
                });
            match decoded {
                Ok(batch) => batches.push(batch),
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "skipping unreadable batch file");
                }
            }
        }

        Ok(batches)
    }

    fn write(&self, batch: &SentenceBatchData) -> Result<()> {
        let bytes = serde_json::to_vec(batch)?;
        write_atomic(&self.batch_path(&batch.info.batch_id), &bytes)
    }

    fn remove(&self, batch_id: &str) -> Result<bool> {
        let path = self.batch_path(batch_id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("Failed to delete {}", path.display()))?;
        Ok(true)
    }

    fn remove_all(&self) -> Result<()> {
        remove_dir_contents(&self.dir)
    }
}

/// Delete every file directly inside `dir`. A missing directory is fine.
pub(crate) fn remove_dir_contents(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete {}", path.display()))?;
        }
    }
    Ok(())
}

// ============ Key/value file ============

/// A flat JSON object on disk, cached in memory.
pub struct JsonFileKvStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
}

impl JsonFileKvStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn persist(&self, values: &BTreeMap<String, Value>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(values)?;
        write_atomic(&self.path, &bytes)
    }
}

impl KeyValueStore for JsonFileKvStore {
    fn get(&self, key: &str) -> Option<Value> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set_many(&self, entries: &[(&str, Value)]) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        let mut updated = values.clone();
        for (key, value) in entries {
            updated.insert(key.to_string(), value.clone());
        }
        self.persist(&updated)?;
        *values = updated;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        if !values.contains_key(key) {
            return Ok(());
        }
        let mut updated = values.clone();
        updated.remove(key);
        self.persist(&updated)?;
        *values = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SentenceBatchInfo;
    use tempfile::TempDir;

    fn batch(id: &str) -> SentenceBatchData {
        SentenceBatchData {
            info: SentenceBatchInfo {
                batch_id: id.to_string(),
                batch_number: 1,
                sentence_count: 0,
                word_count: 0,
                used_words: vec![],
                created_at: 0,
                unknown_word_count: 0,
            },
            sentences: vec![],
            unknown_words: None,
        }
    }

    #[test]
    fn test_kv_persists_across_open() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("prefs.json");
        {
            let kv = JsonFileKvStore::open(&path).unwrap();
            kv.set_many(&[("a", Value::from(1)), ("b", Value::from("two"))])
                .unwrap();
            kv.remove("missing").unwrap();
        }
        let kv = JsonFileKvStore::open(&path).unwrap();
        assert_eq!(kv.get_i64("a"), Some(1));
        assert_eq!(kv.get_string("b").as_deref(), Some("two"));
        kv.remove("a").unwrap();
        assert_eq!(JsonFileKvStore::open(&path).unwrap().get("a"), None);
    }

    #[test]
    fn test_dir_backend_write_load_remove() {
        let tmp = TempDir::new().unwrap();
        let backend = DirBackend::new(tmp.path().join("batches"));
        assert!(backend.load_all().unwrap().is_empty());

        backend.write(&batch("one")).unwrap();
        backend.write(&batch("two")).unwrap();
        assert!(backend.dir().join("batch_one.json").exists());
        assert!(!backend.dir().join("batch_one.json.tmp").exists());
        assert_eq!(backend.load_all().unwrap().len(), 2);

        assert!(backend.remove("one").unwrap());
        assert!(!backend.remove("one").unwrap());
        assert_eq!(backend.load_all().unwrap().len(), 1);

        backend.remove_all().unwrap();
        assert!(backend.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_dir_backend_skips_corrupt_files() {
        let tmp = TempDir::new().unwrap();
        let backend = DirBackend::new(tmp.path());
        backend.write(&batch("good")).unwrap();
        fs::write(tmp.path().join("batch_bad.json"), "{ not json").unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let loaded = backend.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].info.batch_id, "good");
    }
}
