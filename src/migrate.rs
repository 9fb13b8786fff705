//! One-time migration from the legacy storage layout.
//!
//! Older versions kept every generated sentence in a single
//! `generated_sentences.json` file plus a `sentence_batches.json` preference
//! file, with per-batch sentence ids that collided across batches. That data
//! cannot be mapped onto global ids, so the migration discards it, empties
//! the batch directory, and starts the sentence id counter over. A persisted
//! flag makes the hook a no-op on every later start.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::store::file::remove_dir_contents;
use crate::store::{KeyValueStore, NEXT_SENTENCE_ID_KEY, SENTENCE_ID_START};

/// Flag recording that the migration has run.
pub const MIGRATION_FLAG_KEY: &str = "sentence_migration_v2_done";

/// Legacy single-file sentence store.
pub const LEGACY_SENTENCES_FILE: &str = "generated_sentences.json";

/// Legacy batch preferences.
pub const LEGACY_PREFS_FILE: &str = "sentence_batches.json";

/// Run the legacy migration if it has not run yet.
///
/// Returns `true` when the migration ran during this call.
pub fn migrate_legacy_layout(
    root: &Path,
    batch_dir: &Path,
    prefs: &dyn KeyValueStore,
) -> Result<bool> {
    if prefs.get_bool(MIGRATION_FLAG_KEY).unwrap_or(false) {
        return Ok(false);
    }

    tracing::info!(root = %root.display(), "running sentence storage migration v2");

    for name in [LEGACY_PREFS_FILE, LEGACY_SENTENCES_FILE] {
        let path = root.join(name);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to delete legacy file {}", path.display()))?;
            tracing::info!(file = %path.display(), "deleted legacy file");
        }
    }

    remove_dir_contents(batch_dir)?;

    prefs.set_many(&[
        (NEXT_SENTENCE_ID_KEY, Value::from(SENTENCE_ID_START)),
        (MIGRATION_FLAG_KEY, Value::from(true)),
    ])?;

    tracing::info!("sentence storage migration v2 complete");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKvStore;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_migration_removes_legacy_data_once() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let batch_dir = root.join("sentence_batches");
        fs::create_dir_all(&batch_dir).unwrap();
        fs::write(root.join(LEGACY_SENTENCES_FILE), "[]").unwrap();
        fs::write(root.join(LEGACY_PREFS_FILE), "{}").unwrap();
        fs::write(batch_dir.join("batch_old.json"), "{}").unwrap();

        let prefs = MemoryKvStore::new();
        prefs.set(NEXT_SENTENCE_ID_KEY, Value::from(7)).unwrap();

        assert!(migrate_legacy_layout(root, &batch_dir, &prefs).unwrap());
        assert!(!root.join(LEGACY_SENTENCES_FILE).exists());
        assert!(!root.join(LEGACY_PREFS_FILE).exists());
        assert!(!batch_dir.join("batch_old.json").exists());
        assert_eq!(prefs.get_i64(NEXT_SENTENCE_ID_KEY), Some(SENTENCE_ID_START));
        assert_eq!(prefs.get_bool(MIGRATION_FLAG_KEY), Some(true));

        // later starts leave new data alone
        fs::write(batch_dir.join("batch_new.json"), "{}").unwrap();
        prefs.set(NEXT_SENTENCE_ID_KEY, Value::from(20_050)).unwrap();
        assert!(!migrate_legacy_layout(root, &batch_dir, &prefs).unwrap());
        assert!(batch_dir.join("batch_new.json").exists());
        assert_eq!(prefs.get_i64(NEXT_SENTENCE_ID_KEY), Some(20_050));
    }

    #[test]
    fn test_migration_on_fresh_install() {
        let tmp = TempDir::new().unwrap();
        let prefs = MemoryKvStore::new();
        let batch_dir = tmp.path().join("sentence_batches");

        assert!(migrate_legacy_layout(tmp.path(), &batch_dir, &prefs).unwrap());
        assert_eq!(prefs.get_bool(MIGRATION_FLAG_KEY), Some(true));
    }
}
