//! Core data models used throughout reibun.
//!
//! Words flow in from the vocabulary source, sentences come back from the
//! model as [`GeneratedSentence`]s, and every finished run is persisted as a
//! [`SentenceBatchData`] file.

use serde::{Deserialize, Serialize};

/// A vocabulary entry supplied by the caller. The `id` is stable and
/// externally assigned; the pipeline only ever references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordItem {
    pub id: i64,
    pub word: String,
    pub reading: String,
    pub meaning: String,
}

impl WordItem {
    /// `"word (meaning)"`, the label used when reporting uncovered words.
    pub fn label(&self) -> String {
        format!("{} ({})", self.word, self.meaning)
    }
}

/// A sentence as decoded from model output, before persistence.
///
/// `used_word_ids` holds stable word ids, already mapped back from the
/// prompt's local indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedSentence {
    pub japanese: String,
    pub reading: String,
    pub korean: String,
    pub used_word_ids: Vec<i64>,
}

/// Vocabulary the model introduced that the learner was not given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownWord {
    pub word: String,
    pub reading: String,
    pub meaning: String,
}

/// A persisted sentence. `id` comes from the global sentence counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub id: i64,
    pub kanji: String,
    pub meaning: String,
    pub hiragana: String,
}

/// Sentence text handed to the batch store, which assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSentence {
    pub kanji: String,
    pub meaning: String,
    pub hiragana: String,
}

impl From<&GeneratedSentence> for NewSentence {
    fn from(generated: &GeneratedSentence) -> Self {
        Self {
            kanji: generated.japanese.clone(),
            meaning: generated.korean.clone(),
            hiragana: generated.reading.clone(),
        }
    }
}

/// Summary of a stored batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceBatchInfo {
    /// Opaque UUID, fixed at creation.
    pub batch_id: String,
    /// 1-based display rank, recomputed when a batch is deleted.
    pub batch_number: u32,
    pub sentence_count: usize,
    pub word_count: usize,
    pub used_words: Vec<String>,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    #[serde(default)]
    pub unknown_word_count: usize,
}

/// On-disk shape of one batch file.
///
/// `unknown_words` is optional because records written before the field
/// existed omit it (or store `null`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceBatchData {
    pub info: SentenceBatchInfo,
    pub sentences: Vec<Sentence>,
    #[serde(default)]
    pub unknown_words: Option<Vec<UnknownWord>>,
}

impl SentenceBatchData {
    pub fn unknown_words(&self) -> &[UnknownWord] {
        self.unknown_words.as_deref().unwrap_or(&[])
    }

    pub fn sentence_ids(&self) -> Vec<i64> {
        self.sentences.iter().map(|s| s.id).collect()
    }
}

/// Outcome of one generation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationResult {
    pub sentences: Vec<GeneratedSentence>,
    pub total_words: usize,
    pub used_words: usize,
    pub unused_words: usize,
    pub group_count: usize,
    /// `(word id, "word (meaning)")` for every word left uncovered.
    pub unused_word_details: Vec<(i64, String)>,
    pub unknown_words: Vec<UnknownWord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_without_unknown_words_field_decodes() {
        let json = r#"{
            "info": {
                "batchId": "b-1",
                "batchNumber": 1,
                "sentenceCount": 1,
                "wordCount": 2,
                "usedWords": ["学校", "行く"],
                "createdAt": 1700000000000
            },
            "sentences": [
                {"id": 20000, "kanji": "毎日学校に行きます", "meaning": "매일 학교에 갑니다", "hiragana": "まいにちがっこうにいきます"}
            ]
        }"#;

        let data: SentenceBatchData = serde_json::from_str(json).unwrap();
        assert!(data.unknown_words().is_empty());
        assert_eq!(data.info.unknown_word_count, 0);
        assert_eq!(data.sentence_ids(), vec![20000]);
    }

    #[test]
    fn null_unknown_words_reads_as_empty() {
        let json = r#"{
            "info": {
                "batchId": "b-2", "batchNumber": 2, "sentenceCount": 0, "wordCount": 0,
                "usedWords": [], "createdAt": 1, "unknownWordCount": 0
            },
            "sentences": [],
            "unknownWords": null
        }"#;
        let data: SentenceBatchData = serde_json::from_str(json).unwrap();
        assert!(data.unknown_words().is_empty());
    }

    #[test]
    fn info_serializes_with_camel_case_keys() {
        let info = SentenceBatchInfo {
            batch_id: "abc".to_string(),
            batch_number: 3,
            sentence_count: 0,
            word_count: 0,
            used_words: vec![],
            created_at: 5,
            unknown_word_count: 0,
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["batchId"], "abc");
        assert_eq!(value["batchNumber"], 3);
        assert!(value.get("unknownWordCount").is_some());
    }

    #[test]
    fn new_sentence_maps_fields_from_generated() {
        let generated = GeneratedSentence {
            japanese: "駅で友達に会った".to_string(),
            reading: "えきでともだちにあった".to_string(),
            korean: "역에서 친구를 만났다".to_string(),
            used_word_ids: vec![1, 2],
        };
        let new = NewSentence::from(&generated);
        assert_eq!(new.kanji, "駅で友達に会った");
        assert_eq!(new.hiragana, "えきでともだちにあった");
        assert_eq!(new.meaning, "역에서 친구를 만났다");
    }
}
