//! Prompt construction for the generation pipeline.
//!
//! Every builder is a pure function over the words (or sentences) it is
//! given. Words are always listed with local 0-based indices; the model
//! answers with those indices and [`crate::parse`] maps them back to stable
//! word ids.

use crate::models::{GeneratedSentence, WordItem};

/// System prompt for first-pass and retry sentence generation.
pub const SENTENCE_SYSTEM_PROMPT: &str = "You are a Japanese language teacher. You MUST use every single word provided - this is mandatory, not optional.";

/// System prompt for semantic grouping.
pub const GROUPING_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that groups Japanese words by semantic similarity.";

/// System prompt for unknown-word extraction.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a Japanese vocabulary extractor.";

fn indexed_word_list(words: &[WordItem]) -> String {
    words
        .iter()
        .enumerate()
        .map(|(i, w)| format!("{}. {} ({}): {}", i, w.word, w.reading, w.meaning))
        .collect::<Vec<_>>()
        .join("\n")
}

fn last_index(words: &[WordItem]) -> usize {
    words.len().saturating_sub(1)
}

/// Ask the model to partition `words` into themed groups of roughly 6-10.
pub fn build_grouping_prompt(words: &[WordItem]) -> String {
    let list = words
        .iter()
        .enumerate()
        .map(|(i, w)| format!("{}: {} ({})", i, w.word, w.meaning))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Group the following Japanese words by shared meaning or topic.

[Words]
{list}

[Example themes]
- School / study: school, teacher, study, exam, classroom
- Food: eat, cook, delicious, restaurant, rice
- Feelings: happy, sad, angry, fun
- Time / weather: morning, evening, rain, sunny
- Places / movement: go, come, home, station, park
- Everyday actions: do, see, listen, speak

[Required rules]
- Every word must be placed in a group ({count} words in total, none left out).
- Each group holds 6-10 words (not much smaller, not much larger).
- Words that fit no theme go into an "other" group.
- Each word belongs to exactly one group.

[Response format - JSON]
{{
  "groups": [
    {{"theme": "group theme", "word_ids": [0, 3, 5, 8, 12]}},
    {{"theme": "group theme", "word_ids": [1, 2, 4, 6, 7]}}
  ]
}}

Every word id from 0 to {last} must appear exactly once. Respond with JSON only."#,
        list = list,
        count = words.len(),
        last = last_index(words),
    )
}

/// First-pass sentence prompt: cover every word, combining 2-4 per sentence.
pub fn build_sentence_prompt(words: &[WordItem]) -> String {
    format!(
        r#"Write short, natural Japanese sentences that use the {count} words below.
Combine related words in the same sentence wherever you can so that fewer sentences are needed.

[Words]
{list}

[Core rules]
- Every word must be used (no word may be left out).
- Combine 2-4 related words naturally in one sentence.
- Keep sentences short (about 10-20 characters).
- Use natural, everyday expressions.
- "korean" is a natural Korean translation of the sentence.

[Good examples]
- "学校" (school) + "行く" (go) + "毎日" (every day) -> "毎日学校に行きます" (매일 학교에 갑니다)
- "食べる" (eat) + "美味しい" (delicious) + "料理" (dish) -> "美味しい料理を食べた" (맛있는 요리를 먹었다)
- "友達" (friend) + "会う" (meet) + "駅" (station) -> "駅で友達に会った" (역에서 친구를 만났다)

[Response format - one JSON array]
[
  {{"japanese": "日本語文", "reading": "ひらがな", "korean": "한국어", "used_word_ids": [0, 2, 5]}},
  {{"japanese": "日本語文", "reading": "ひらがな", "korean": "한국어", "used_word_ids": [1, 3]}}
]

Every word id from 0 to {last} must appear in some sentence's used_word_ids. Respond with JSON only."#,
        count = words.len(),
        list = indexed_word_list(words),
        last = last_index(words),
    )
}

/// Retry prompt for words that are still uncovered after earlier passes.
pub fn build_retry_prompt(words: &[WordItem]) -> String {
    format!(
        r#"[URGENT] The words below have NOT been used in any sentence yet.
Write short, natural Japanese sentences that use them.

[Unused words]
{list}

[Rules]
- Every one of these words MUST be used. Leaving one out is not allowed.
- Combine 2-3 words in one sentence when it reads naturally.
- If a combination does not work, one sentence per word is fine.
- Keep sentences short and simple.
- "korean" is a natural Korean translation of the sentence.

[Response format - one JSON array]
[
  {{"japanese": "日本語文", "reading": "ひらがな", "korean": "한국어", "used_word_ids": [0, 2]}},
  {{"japanese": "日本語文", "reading": "ひらがな", "korean": "한국어", "used_word_ids": [1]}}
]

Word ids 0 to {last} MUST all be included. Respond with JSON only."#,
        list = indexed_word_list(words),
        last = last_index(words),
    )
}

/// Ask for vocabulary used in `sentences` that is not among `provided`.
pub fn build_unknown_word_extraction_prompt(
    sentences: &[GeneratedSentence],
    provided: &[WordItem],
) -> String {
    let text = sentences
        .iter()
        .map(|s| s.japanese.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let known = provided
        .iter()
        .map(|w| format!("{}({})", w.word, w.reading))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"From the Japanese sentences below, extract only the NEW words that are not in the provided word list.

[Generated sentences]
{text}

[Provided words (already known)]
{known}

[Extraction rules]
- Exclude particles (は, が, を, に, で, と, の, へ, から, まで, ...).
- Convert inflected verbs to dictionary form (食べました -> 食べる).
- Convert inflected adjectives to dictionary form (美味しかった -> 美味しい).
- Exclude very basic words (です, ます, ある, いる, する, なる, ...).
- Exclude numbers and proper nouns.
- Exclude anything that is a provided word or an inflection of one.
- "meaning" is the Korean meaning of the word.

[Response format - JSON array]
[
  {{"word": "漢字表記", "reading": "ひらがな", "meaning": "한국어뜻"}}
]

If there are no new words, return an empty array []. Respond with JSON only."#,
        text = text,
        known = known,
    )
}
