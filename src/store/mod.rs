//! Persistence for generated sentence batches.
//!
//! Two storage seams are defined here so the store can run against disk or
//! entirely in memory:
//!
//! - [`KeyValueStore`]: flat key/value scalars (API key, usage counters, the
//!   global sentence id counter, migration flags).
//! - [`BatchBackend`]: whole-batch records, one per batch.
//!
//! [`BatchStore`] owns the batch semantics on top of them: global sentence id
//! allocation, gapless display numbering, and deletion bookkeeping.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`save_batch`](BatchStore::save_batch) | Persist a new batch, assigning sentence ids |
//! | [`all_batches`](BatchStore::all_batches) | Batch summaries by display number |
//! | [`sentences_by_batch_id`](BatchStore::sentences_by_batch_id) | Sentences of one batch |
//! | [`unknown_words_by_batch_id`](BatchStore::unknown_words_by_batch_id) | Unknown words of one batch |
//! | [`delete_batch`](BatchStore::delete_batch) | Remove a batch and renumber the rest |
//! | [`renumber_batches`](BatchStore::renumber_batches) | Reassign display numbers by creation time |
//! | [`clear_all_batches`](BatchStore::clear_all_batches) | Delete everything and reset the id counter |

pub mod file;
pub mod memory;

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::config::StorageConfig;
use crate::models::{NewSentence, Sentence, SentenceBatchData, SentenceBatchInfo, UnknownWord};

pub use file::{DirBackend, JsonFileKvStore};
pub use memory::{MemoryBackend, MemoryKvStore};

/// First id handed out by the global sentence counter.
///
/// Word ids occupy 0–9999 and song vocabulary 10000–19999, so sentence ids
/// never collide with either.
pub const SENTENCE_ID_START: i64 = 20000;

/// Key of the global sentence id counter in the [`KeyValueStore`].
pub const NEXT_SENTENCE_ID_KEY: &str = "next_sentence_id";

/// Directory under the storage root that holds batch files.
pub const BATCH_DIR_NAME: &str = "sentence_batches";

/// File under the storage root that backs the key/value store.
pub const PREFS_FILE_NAME: &str = "prefs.json";

/// Flat key/value storage for scalars.
///
/// Implementations must apply [`set_many`](KeyValueStore::set_many) as one
/// update: either every entry is stored or none is.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set_many(&self, entries: &[(&str, Value)]) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.set_many(&[(key, value)])
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.as_u64())
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_f64())
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }
}

/// Storage for whole batch records.
///
/// Every write replaces the full record; a failed write must leave the
/// previous record intact.
pub trait BatchBackend: Send + Sync {
    /// Load every readable batch. Unreadable records are skipped.
    fn load_all(&self) -> Result<Vec<SentenceBatchData>>;

    /// Create or replace the record for `batch.info.batch_id`.
    fn write(&self, batch: &SentenceBatchData) -> Result<()>;

    /// Remove one record. Returns `false` when it did not exist.
    fn remove(&self, batch_id: &str) -> Result<bool>;

    /// Remove every record.
    fn remove_all(&self) -> Result<()>;
}

/// Batch repository with an in-memory cache over a [`BatchBackend`].
///
/// Construct one per process and share it by reference; all mutation goes
/// through a single lock, which serialises id allocation.
pub struct BatchStore {
    backend: Box<dyn BatchBackend>,
    prefs: Arc<dyn KeyValueStore>,
    /// Sorted by `batch_number`.
    batches: RwLock<Vec<SentenceBatchData>>,
}

impl BatchStore {
    /// Open a store over an existing backend and load its batches.
    pub fn open(backend: Box<dyn BatchBackend>, prefs: Arc<dyn KeyValueStore>) -> Result<Self> {
        let mut batches = backend.load_all()?;
        batches.sort_by_key(|b| b.info.batch_number);
        tracing::debug!(batches = batches.len(), "loaded sentence batches");

        Ok(Self {
            backend,
            prefs,
            batches: RwLock::new(batches),
        })
    }

    /// Open the on-disk store under `root`, running the one-time legacy
    /// migration first.
    pub fn open_dir(root: &Path, prefs: Arc<dyn KeyValueStore>) -> Result<Self> {
        let batch_dir = root.join(BATCH_DIR_NAME);
        crate::migrate::migrate_legacy_layout(root, &batch_dir, prefs.as_ref())?;
        Self::open(Box::new(DirBackend::new(batch_dir)), prefs)
    }

    /// A store that keeps everything in memory.
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::new()),
            prefs: Arc::new(MemoryKvStore::new()),
            batches: RwLock::new(Vec::new()),
        }
    }

    fn cache(&self) -> std::sync::RwLockReadGuard<'_, Vec<SentenceBatchData>> {
        self.batches.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn cache_mut(&self) -> std::sync::RwLockWriteGuard<'_, Vec<SentenceBatchData>> {
        self.batches.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The id the next saved sentence will receive.
    pub fn next_sentence_id(&self) -> i64 {
        self.prefs
            .get_i64(NEXT_SENTENCE_ID_KEY)
            .unwrap_or(SENTENCE_ID_START)
    }

    /// Persist a new batch.
    ///
    /// Every sentence receives the next global sentence id, in order. The
    /// counter is advanced before the batch record is written, so a failed
    /// write can skip ids but never reuse them.
    pub fn save_batch(
        &self,
        sentences: &[NewSentence],
        used_words: &[String],
        unknown_words: &[UnknownWord],
    ) -> Result<SentenceBatchInfo> {
        let mut batches = self.cache_mut();

        let batch_number = next_number(&batches);
        let first_id = self.next_sentence_id();
        let next_id = first_id + sentences.len() as i64;
        self.prefs
            .set(NEXT_SENTENCE_ID_KEY, Value::from(next_id))?;

        // Keep creation order strict when saves land in the same millisecond.
        let now = chrono::Utc::now().timestamp_millis();
        let created_at = batches
            .iter()
            .map(|b| b.info.created_at + 1)
            .max()
            .map_or(now, |floor| now.max(floor));

        let info = SentenceBatchInfo {
            batch_id: uuid::Uuid::new_v4().to_string(),
            batch_number,
            sentence_count: sentences.len(),
            word_count: used_words.len(),
            used_words: used_words.to_vec(),
            created_at,
            unknown_word_count: unknown_words.len(),
        };

        let data = SentenceBatchData {
            info: info.clone(),
            sentences: sentences
                .iter()
                .zip(first_id..)
                .map(|(s, id)| Sentence {
                    id,
                    kanji: s.kanji.clone(),
                    meaning: s.meaning.clone(),
                    hiragana: s.hiragana.clone(),
                })
                .collect(),
            unknown_words: Some(unknown_words.to_vec()),
        };

        self.backend.write(&data)?;
        batches.push(data);
        batches.sort_by_key(|b| b.info.batch_number);

        tracing::info!(
            batch_id = %info.batch_id,
            batch_number,
            sentences = info.sentence_count,
            unknown_words = info.unknown_word_count,
            first_sentence_id = first_id,
            "saved sentence batch"
        );

        Ok(info)
    }

    /// Summaries of every batch, by ascending display number.
    pub fn all_batches(&self) -> Vec<SentenceBatchInfo> {
        self.cache().iter().map(|b| b.info.clone()).collect()
    }

    pub fn next_batch_number(&self) -> u32 {
        next_number(&self.cache())
    }

    pub fn batch(&self, batch_id: &str) -> Option<SentenceBatchData> {
        self.cache()
            .iter()
            .find(|b| b.info.batch_id == batch_id)
            .cloned()
    }

    /// Sentences of one batch; empty when the batch is unknown.
    pub fn sentences_by_batch_id(&self, batch_id: &str) -> Vec<Sentence> {
        self.batch(batch_id).map(|b| b.sentences).unwrap_or_default()
    }

    /// Unknown words of one batch; empty when the batch is unknown.
    pub fn unknown_words_by_batch_id(&self, batch_id: &str) -> Vec<UnknownWord> {
        self.batch(batch_id)
            .map(|b| b.unknown_words().to_vec())
            .unwrap_or_default()
    }

    /// Every `word` and `reading` of every stored unknown word.
    pub fn all_unknown_word_keys(&self) -> HashSet<String> {
        self.cache()
            .iter()
            .flat_map(|b| b.unknown_words().iter())
            .flat_map(|w| [w.word.clone(), w.reading.clone()])
            .collect()
    }

    pub fn all_sentences(&self) -> Vec<Sentence> {
        self.cache()
            .iter()
            .flat_map(|b| b.sentences.iter().cloned())
            .collect()
    }

    pub fn sentence_by_id(&self, id: i64) -> Option<Sentence> {
        self.cache()
            .iter()
            .flat_map(|b| b.sentences.iter())
            .find(|s| s.id == id)
            .cloned()
    }

    pub fn is_valid_sentence_id(&self, id: i64) -> bool {
        self.sentence_by_id(id).is_some()
    }

    /// Keep ids that still point at something: any id below
    /// [`SENTENCE_ID_START`] (words, song vocabulary) and the ids of
    /// sentences that still exist.
    pub fn filter_valid_sentence_ids(&self, ids: &HashSet<i64>) -> HashSet<i64> {
        let batches = self.cache();
        let existing: HashSet<i64> = batches
            .iter()
            .flat_map(|b| b.sentences.iter().map(|s| s.id))
            .collect();
        ids.iter()
            .copied()
            .filter(|id| *id < SENTENCE_ID_START || existing.contains(id))
            .collect()
    }

    /// Delete one batch and renumber the rest.
    ///
    /// Returns the ids of the sentences that were in the batch, so callers
    /// can prune references to them, or `None` when no such batch exists.
    pub fn delete_batch(&self, batch_id: &str) -> Result<Option<Vec<i64>>> {
        let mut batches = self.cache_mut();

        if !self.backend.remove(batch_id)? {
            tracing::warn!(batch_id, "batch to delete does not exist");
            return Ok(None);
        }

        let removed_ids = match batches.iter().position(|b| b.info.batch_id == batch_id) {
            Some(index) => batches.remove(index).sentence_ids(),
            None => Vec::new(),
        };

        self.renumber_locked(&mut batches)?;
        tracing::info!(batch_id, removed_sentences = removed_ids.len(), "deleted sentence batch");

        Ok(Some(removed_ids))
    }

    /// Reassign display numbers 1..N by creation time, rewriting only the
    /// batches whose number changed.
    pub fn renumber_batches(&self) -> Result<()> {
        let mut batches = self.cache_mut();
        self.renumber_locked(&mut batches)
    }

    fn renumber_locked(&self, batches: &mut [SentenceBatchData]) -> Result<()> {
        batches.sort_by_key(|b| (b.info.created_at, b.info.batch_number));

        for (index, batch) in batches.iter_mut().enumerate() {
            let number = index as u32 + 1;
            if batch.info.batch_number != number {
                let mut updated = batch.clone();
                updated.info.batch_number = number;
                self.backend.write(&updated)?;
                *batch = updated;
            }
        }
        Ok(())
    }

    /// Delete every batch and reset the sentence id counter.
    ///
    /// Unlike [`delete_batch`](Self::delete_batch) this allows ids to be
    /// handed out again.
    pub fn clear_all_batches(&self) -> Result<()> {
        let mut batches = self.cache_mut();
        self.backend.remove_all()?;
        batches.clear();
        self.prefs
            .set(NEXT_SENTENCE_ID_KEY, Value::from(SENTENCE_ID_START))?;
        tracing::info!("cleared all sentence batches and reset the sentence id counter");
        Ok(())
    }
}

/// Open the key/value file and batch store under the configured storage
/// directory, creating it on first use.
pub fn open_storage(config: &StorageConfig) -> Result<(Arc<dyn KeyValueStore>, BatchStore)> {
    std::fs::create_dir_all(&config.dir).with_context(|| {
        format!("Failed to create storage directory: {}", config.dir.display())
    })?;
    let prefs: Arc<dyn KeyValueStore> =
        Arc::new(JsonFileKvStore::open(config.dir.join(PREFS_FILE_NAME))?);
    let store = BatchStore::open_dir(&config.dir, prefs.clone())?;
    Ok((prefs, store))
}

fn next_number(batches: &[SentenceBatchData]) -> u32 {
    batches
        .iter()
        .map(|b| b.info.batch_number)
        .max()
        .map_or(1, |max| max + 1)
}
