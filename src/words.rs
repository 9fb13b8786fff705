//! Vocabulary source.
//!
//! Words come from a JSON array of `{id, word, reading, meaning}` objects
//! (other fields are ignored) and are studied in fixed-size days: day 1 is
//! the first `words_per_day` entries, day 2 the next, and so on.
//!
//! Item ids share one number space across the app:
//!
//! | Range | Kind |
//! |-------|------|
//! | `0..10000` | vocabulary words |
//! | `10000..20000` | song vocabulary (`SONG_WORD_ID_OFFSET + local id`) |
//! | `20000..` | generated sentences |

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::models::WordItem;
use crate::store::SENTENCE_ID_START;

/// Added to a song's local word id to keep it clear of vocabulary ids.
pub const SONG_WORD_ID_OFFSET: i64 = 10000;

/// Which kind of study item an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKind {
    Word,
    SongWord,
    Sentence,
}

impl ItemKind {
    pub fn of(id: i64) -> Self {
        if id >= SENTENCE_ID_START {
            ItemKind::Sentence
        } else if id >= SONG_WORD_ID_OFFSET {
            ItemKind::SongWord
        } else {
            ItemKind::Word
        }
    }
}

pub fn song_word_id(local_id: i64) -> i64 {
    SONG_WORD_ID_OFFSET + local_id
}

pub struct WordSource {
    words: Vec<WordItem>,
    words_per_day: usize,
}

impl WordSource {
    pub fn new(words: Vec<WordItem>, words_per_day: usize) -> Self {
        Self {
            words,
            words_per_day: words_per_day.max(1),
        }
    }

    /// Load the vocabulary file.
    pub fn load(path: &Path, words_per_day: usize) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read word list: {}", path.display()))?;
        let words: Vec<WordItem> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse word list: {}", path.display()))?;
        tracing::debug!(path = %path.display(), words = words.len(), "loaded word list");
        Ok(Self::new(words, words_per_day))
    }

    pub fn words(&self) -> &[WordItem] {
        &self.words
    }

    pub fn total_days(&self) -> usize {
        self.words.len().div_ceil(self.words_per_day)
    }

    /// Words of a 1-based day; empty when the day is out of range.
    pub fn words_for_day(&self, day: usize) -> &[WordItem] {
        if day == 0 {
            return &[];
        }
        let start = (day - 1).saturating_mul(self.words_per_day);
        if start >= self.words.len() {
            return &[];
        }
        let end = (start + self.words_per_day).min(self.words.len());
        &self.words[start..end]
    }

    /// Words of the given days followed by words picked by id, without
    /// duplicates, in that order. Unknown days or ids are an error.
    pub fn select(&self, days: &[usize], ids: &[i64]) -> Result<Vec<WordItem>> {
        let mut seen: HashSet<i64> = HashSet::new();
        let mut selected = Vec::new();

        for &day in days {
            let words = self.words_for_day(day);
            if words.is_empty() {
                bail!("Day {} does not exist (1..={})", day, self.total_days());
            }
            for word in words {
                if seen.insert(word.id) {
                    selected.push(word.clone());
                }
            }
        }

        for &id in ids {
            let Some(word) = self.words.iter().find(|w| w.id == id) else {
                bail!("No word with id {}", id);
            };
            if seen.insert(id) {
                selected.push(word.clone());
            }
        }

        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source(n: i64, per_day: usize) -> WordSource {
        let words = (0..n)
            .map(|id| WordItem {
                id,
                word: format!("w{}", id),
                reading: format!("r{}", id),
                meaning: format!("m{}", id),
            })
            .collect();
        WordSource::new(words, per_day)
    }

    #[test]
    fn test_days_split_by_words_per_day() {
        let src = source(45, 20);
        assert_eq!(src.total_days(), 3);
        assert_eq!(src.words_for_day(1).len(), 20);
        assert_eq!(src.words_for_day(2)[0].id, 20);
        assert_eq!(src.words_for_day(3).len(), 5);
        assert!(src.words_for_day(0).is_empty());
        assert!(src.words_for_day(4).is_empty());
    }

    #[test]
    fn test_select_days_and_ids_without_duplicates() {
        let src = source(30, 10);
        let picked = src.select(&[2], &[3, 12, 3]).unwrap();
        let ids: Vec<i64> = picked.iter().map(|w| w.id).collect();
        let mut expected: Vec<i64> = (10..20).collect();
        expected.push(3);
        assert_eq!(ids, expected);

        assert!(src.select(&[9], &[]).is_err());
        assert!(src.select(&[], &[999]).is_err());
    }

    #[test]
    fn test_load_ignores_extra_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("words.json");
        std::fs::write(
            &path,
            r#"[{"id": 1, "word": "学校", "reading": "がっこう", "meaning": "학교", "partOfSpeech": "noun"}]"#,
        )
        .unwrap();
        let src = WordSource::load(&path, 20).unwrap();
        assert_eq!(src.words()[0].word, "学校");
        assert_eq!(src.total_days(), 1);
    }

    #[test]
    fn test_item_kind_ranges() {
        assert_eq!(ItemKind::of(0), ItemKind::Word);
        assert_eq!(ItemKind::of(9_999), ItemKind::Word);
        assert_eq!(ItemKind::of(song_word_id(3)), ItemKind::SongWord);
        assert_eq!(ItemKind::of(SENTENCE_ID_START), ItemKind::Sentence);
    }
}
