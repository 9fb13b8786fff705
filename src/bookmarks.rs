//! Bookmarked ("weak") study items.
//!
//! A JSON array of item ids on disk. Sentence ids disappear when their batch
//! is deleted, so the set has to be pruned afterwards.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::store::file::write_atomic;
use crate::store::{BatchStore, SENTENCE_ID_START};
use crate::words::ItemKind;

pub const BOOKMARKS_FILE_NAME: &str = "bookmarks.json";

pub struct Bookmarks {
    path: PathBuf,
    ids: BTreeSet<i64>,
}

/// Bookmark counts per item kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookmarkSummary {
    pub words: usize,
    pub song_words: usize,
    pub sentences: usize,
}

impl Bookmarks {
    /// Open the bookmark file; a missing file is an empty set.
    pub fn load(path: &Path) -> Result<Self> {
        let ids = if path.exists() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read bookmarks: {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse bookmarks: {}", path.display()))?
        } else {
            BTreeSet::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            ids,
        })
    }

    pub fn save(&self) -> Result<()> {
        write_atomic(&self.path, &serde_json::to_vec(&self.ids)?)
    }

    pub fn ids(&self) -> &BTreeSet<i64> {
        &self.ids
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn add(&mut self, id: i64) -> bool {
        self.ids.insert(id)
    }

    /// Drop the given ids. Returns how many were bookmarked.
    pub fn remove_ids(&mut self, ids: &[i64]) -> usize {
        ids.iter().filter(|id| self.ids.remove(*id)).count()
    }

    /// Drop sentence ids that no longer exist in `store`.
    pub fn retain_valid(&mut self, store: &BatchStore) -> usize {
        let before = self.ids.len();
        let valid = store.filter_valid_sentence_ids(&self.ids.iter().copied().collect());
        self.ids.retain(|id| valid.contains(id));
        before - self.ids.len()
    }

    /// Drop every sentence bookmark, keeping word and song bookmarks.
    pub fn clear_sentences(&mut self) -> usize {
        let before = self.ids.len();
        self.ids.retain(|id| *id < SENTENCE_ID_START);
        before - self.ids.len()
    }

    pub fn summary(&self) -> BookmarkSummary {
        let mut summary = BookmarkSummary::default();
        for id in &self.ids {
            match ItemKind::of(*id) {
                ItemKind::Word => summary.words += 1,
                ItemKind::SongWord => summary.song_words += 1,
                ItemKind::Sentence => summary.sentences += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewSentence;
    use crate::words::song_word_id;
    use tempfile::TempDir;

    fn sentence() -> NewSentence {
        NewSentence {
            kanji: "駅に行く".to_string(),
            meaning: "역에 가다".to_string(),
            hiragana: "えきにいく".to_string(),
        }
    }

    #[test]
    fn test_prune_after_batch_delete() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(BOOKMARKS_FILE_NAME);
        let store = BatchStore::in_memory();
        let kept = store.save_batch(&[sentence()], &[], &[]).unwrap();
        let doomed = store.save_batch(&[sentence(), sentence()], &[], &[]).unwrap();
        let doomed_ids: Vec<i64> = store
            .sentences_by_batch_id(&doomed.batch_id)
            .iter()
            .map(|s| s.id)
            .collect();
        let kept_id = store.sentences_by_batch_id(&kept.batch_id)[0].id;

        let mut bookmarks = Bookmarks::load(&path).unwrap();
        for id in [5, song_word_id(2), kept_id, doomed_ids[0], doomed_ids[1]] {
            bookmarks.add(id);
        }
        bookmarks.save().unwrap();

        let removed = store.delete_batch(&doomed.batch_id).unwrap().unwrap();
        let mut bookmarks = Bookmarks::load(&path).unwrap();
        assert_eq!(bookmarks.remove_ids(&removed), 2);
        assert_eq!(bookmarks.retain_valid(&store), 0);
        assert_eq!(
            bookmarks.summary(),
            BookmarkSummary {
                words: 1,
                song_words: 1,
                sentences: 1
            }
        );
    }

    #[test]
    fn test_retain_valid_drops_stale_sentence_ids() {
        let tmp = TempDir::new().unwrap();
        let store = BatchStore::in_memory();
        let mut bookmarks = Bookmarks::load(&tmp.path().join("b.json")).unwrap();
        bookmarks.add(7);
        bookmarks.add(SENTENCE_ID_START + 99);

        assert_eq!(bookmarks.retain_valid(&store), 1);
        assert!(bookmarks.contains(7));

        bookmarks.add(SENTENCE_ID_START);
        assert_eq!(bookmarks.clear_sentences(), 1);
        assert_eq!(bookmarks.ids().len(), 1);
    }
}
