//! Decoding of model output.
//!
//! Model replies are untrusted text. Each decoder strips an optional
//! markdown code fence, decodes JSON, and keeps whatever entries are usable.
//! A reply that cannot be decoded at all yields [`Parsed::Malformed`]; the
//! orchestrator reads that as "nothing covered" rather than as an error.

use std::collections::HashSet;

use serde_json::Value;

use crate::models::{GeneratedSentence, UnknownWord, WordItem};

/// Outcome of decoding one model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Ok(T),
    /// The reply was not the expected JSON shape. Carries a short reason.
    Malformed(String),
}

#[cfg(test)]
impl<T> Parsed<T> {
    pub fn is_malformed(&self) -> bool {
        matches!(self, Parsed::Malformed(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Parsed::Ok(value) => Some(value),
            Parsed::Malformed(_) => None,
        }
    }
}

#[cfg(test)]
impl<T: Default> Parsed<T> {
    pub fn unwrap_or_default(self) -> T {
        self.ok().unwrap_or_default()
    }
}

/// Remove a leading ```` ```json ```` / ```` ``` ```` line and a trailing fence.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches("json"),
        };
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

fn decode(raw: &str) -> Result<Value, String> {
    let cleaned = strip_code_fence(raw);
    if cleaned.is_empty() {
        return Err("empty reply".to_string());
    }
    serde_json::from_str(cleaned).map_err(|e| e.to_string())
}

/// Interpret a JSON value as a local word index.
///
/// Models occasionally emit `3.0` or `"3"`; both are accepted.
fn as_index(value: &Value) -> Option<usize> {
    if let Some(n) = value.as_u64() {
        return usize::try_from(n).ok();
    }
    if let Some(f) = value.as_f64() {
        if f >= 0.0 && f.fract() == 0.0 {
            return Some(f as usize);
        }
        return None;
    }
    value.as_str().and_then(|s| s.trim().parse().ok())
}

fn str_field<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str).map(str::trim)
}

/// Decode a sentence array and map local indices back to word ids.
///
/// Entries without Japanese text are dropped. Indices outside `words`
/// are dropped silently.
pub fn parse_sentences(raw: &str, words: &[WordItem]) -> Parsed<Vec<GeneratedSentence>> {
    let value = match decode(raw) {
        Ok(v) => v,
        Err(reason) => return Parsed::Malformed(reason),
    };
    let Some(items) = value.as_array() else {
        return Parsed::Malformed("expected a JSON array of sentences".to_string());
    };

    let mut sentences = Vec::with_capacity(items.len());
    for item in items {
        let Some(obj) = item.as_object() else {
            continue;
        };
        let japanese = str_field(obj, "japanese").unwrap_or_default();
        if japanese.is_empty() {
            continue;
        }

        let mut used_word_ids: Vec<i64> = Vec::new();
        if let Some(indices) = obj.get("used_word_ids").and_then(Value::as_array) {
            for index in indices.iter().filter_map(as_index) {
                if let Some(word) = words.get(index) {
                    if !used_word_ids.contains(&word.id) {
                        used_word_ids.push(word.id);
                    }
                }
            }
        }

        sentences.push(GeneratedSentence {
            japanese: japanese.to_string(),
            reading: str_field(obj, "reading").unwrap_or_default().to_string(),
            korean: str_field(obj, "korean").unwrap_or_default().to_string(),
            used_word_ids,
        });
    }

    Parsed::Ok(sentences)
}

/// Decode `{"groups": [{"theme", "word_ids"}]}` into groups of words.
///
/// The first group to claim an index keeps it. Words no group claimed are
/// appended in original order as extra groups of `chunk_size`, so every
/// word lands in exactly one group.
pub fn parse_groups(raw: &str, words: &[WordItem], chunk_size: usize) -> Parsed<Vec<Vec<WordItem>>> {
    let value = match decode(raw) {
        Ok(v) => v,
        Err(reason) => return Parsed::Malformed(reason),
    };
    let Some(declared) = value.get("groups").and_then(Value::as_array) else {
        return Parsed::Malformed("expected an object with a \"groups\" array".to_string());
    };

    let mut claimed = vec![false; words.len()];
    let mut groups: Vec<Vec<WordItem>> = Vec::new();

    for group in declared {
        let Some(ids) = group.get("word_ids").and_then(Value::as_array) else {
            continue;
        };
        let mut members = Vec::new();
        for index in ids.iter().filter_map(as_index) {
            if index < words.len() && !claimed[index] {
                claimed[index] = true;
                members.push(words[index].clone());
            }
        }
        if !members.is_empty() {
            groups.push(members);
        }
    }

    let missing: Vec<WordItem> = (0..words.len())
        .filter(|&index| !claimed[index])
        .map(|index| words[index].clone())
        .collect();
    if !missing.is_empty() {
        tracing::warn!(missing = missing.len(), "grouping reply left words unassigned");
        groups.extend(missing.chunks(chunk_size.max(1)).map(<[WordItem]>::to_vec));
    }

    Parsed::Ok(groups)
}

/// Decode an unknown-word array, dropping known and duplicate entries.
///
/// An entry is dropped when any field is missing, or when its `word` or
/// `reading` is in `known`. Duplicates by `word` keep the first occurrence.
pub fn parse_unknown_words(raw: &str, known: &HashSet<String>) -> Parsed<Vec<UnknownWord>> {
    let value = match decode(raw) {
        Ok(v) => v,
        Err(reason) => return Parsed::Malformed(reason),
    };
    let Some(items) = value.as_array() else {
        return Parsed::Malformed("expected a JSON array of words".to_string());
    };

    let mut seen: HashSet<String> = HashSet::new();
    let mut result = Vec::new();
    for item in items {
        let Some(obj) = item.as_object() else {
            continue;
        };
        let (Some(word), Some(reading), Some(meaning)) = (
            str_field(obj, "word"),
            str_field(obj, "reading"),
            str_field(obj, "meaning"),
        ) else {
            continue;
        };
        if word.is_empty() || reading.is_empty() || meaning.is_empty() {
            continue;
        }
        if known.contains(word) || known.contains(reading) {
            continue;
        }
        if !seen.insert(word.to_string()) {
            continue;
        }
        result.push(UnknownWord {
            word: word.to_string(),
            reading: reading.to_string(),
            meaning: meaning.to_string(),
        });
    }

    Parsed::Ok(result)
}
