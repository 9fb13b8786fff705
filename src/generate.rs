//! Coverage-seeking sentence generation.
//!
//! One [`SentenceGenerator::generate`] call turns a word list into example
//! sentences. It runs as a fixed sequence of awaited model calls:
//!
//! 1. **Group**: lists longer than `group_target_size` are split into themed
//!    groups by the model, falling back to plain chunks when the reply is
//!    unusable.
//! 2. **Generate**: one sentence call per group, in order.
//! 3. **Retry**: words no sentence used are re-sent in small chunks, for at
//!    most `max_retry_rounds` rounds.
//! 4. **Extract**: one call lists vocabulary the sentences introduced that
//!    the learner was not given.
//!
//! Calls never run concurrently. Nothing is persisted here; the caller saves
//! the returned [`GenerationResult`], so dropping the future mid-run leaves
//! no trace beyond the usage already recorded.
//!
//! # Failure handling
//!
//! | Failure | Effect |
//! |---------|--------|
//! | No API key | [`Error::Config`] before any call |
//! | Non-success HTTP status on a sentence call (after adapter retries) | Run aborts with [`Error::Api`] |
//! | Any failure of the grouping call | Fixed-size chunks instead |
//! | Any failure of the extraction call | No unknown words |
//! | Timeout, connection error, undecodable envelope | That call covers nothing |
//! | Malformed model JSON | That call covers nothing |

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::Instrument;

use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::ledger::UsageLedger;
use crate::llm::{ChatClient, ChatRequest, Pricing};
use crate::models::{GeneratedSentence, GenerationResult, UnknownWord, WordItem};
use crate::parse::{parse_groups, parse_sentences, parse_unknown_words, Parsed};
use crate::progress::{GenerationEvent, GenerationProgress};
use crate::prompt::{
    build_grouping_prompt, build_retry_prompt, build_sentence_prompt,
    build_unknown_word_extraction_prompt, EXTRACTION_SYSTEM_PROMPT, GROUPING_SYSTEM_PROMPT,
    SENTENCE_SYSTEM_PROMPT,
};

/// Drives one generation request against a [`ChatClient`].
pub struct SentenceGenerator<'a> {
    client: &'a dyn ChatClient,
    ledger: &'a UsageLedger,
    pricing: Pricing,
    config: GenerationConfig,
}

impl<'a> SentenceGenerator<'a> {
    pub fn new(
        client: &'a dyn ChatClient,
        ledger: &'a UsageLedger,
        pricing: Pricing,
        config: GenerationConfig,
    ) -> Self {
        Self {
            client,
            ledger,
            pricing,
            config,
        }
    }

    /// Generate sentences covering as many of `words` as the retry budget allows.
    ///
    /// `known_unknown_words` holds the `word` and `reading` of unknown words
    /// from earlier batches, so extraction does not report them again.
    pub async fn generate(
        &self,
        words: &[WordItem],
        known_unknown_words: &HashSet<String>,
        progress: &dyn GenerationProgress,
    ) -> Result<GenerationResult> {
        if !self.client.has_credential() {
            return Err(Error::Config(
                "API key is not set; run `reibun key set <KEY>` or export the configured variable"
                    .to_string(),
            ));
        }

        if words.is_empty() {
            return Ok(GenerationResult::default());
        }

        let span = tracing::info_span!(
            "generate",
            words = words.len(),
            model = self.client.model_name()
        );
        self.run(words, known_unknown_words, progress)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        words: &[WordItem],
        known_unknown_words: &HashSet<String>,
        progress: &dyn GenerationProgress,
    ) -> Result<GenerationResult> {
        notify(progress, GenerationEvent::Started { total_words: words.len() });

        let groups = self.build_groups(words).await?;
        notify(progress, GenerationEvent::Grouped { groups: groups.len() });
        tracing::info!(groups = groups.len(), "word groups ready");

        let mut sentences: Vec<GeneratedSentence> = Vec::new();
        let mut covered: HashSet<i64> = HashSet::new();

        for (index, group) in groups.iter().enumerate() {
            notify(
                progress,
                GenerationEvent::Group {
                    index: index + 1,
                    total: groups.len(),
                },
            );
            let produced = self
                .sentence_call(group, build_sentence_prompt(group))
                .await?;
            absorb(&mut sentences, &mut covered, produced);
        }

        let mut uncovered = uncovered_words(words, &covered);
        let mut round = 0;
        while !uncovered.is_empty() && round < self.config.max_retry_rounds {
            round += 1;
            notify(
                progress,
                GenerationEvent::RetryRound {
                    round,
                    max_rounds: self.config.max_retry_rounds,
                    remaining: uncovered.len(),
                },
            );
            tracing::info!(round, remaining = uncovered.len(), "retrying uncovered words");

            for chunk in uncovered.chunks(self.config.retry_chunk_size.max(1)) {
                let produced = self.sentence_call(chunk, build_retry_prompt(chunk)).await?;
                absorb(&mut sentences, &mut covered, produced);
            }
            uncovered = uncovered_words(words, &covered);
        }

        if !uncovered.is_empty() {
            tracing::warn!(uncovered = uncovered.len(), "words left uncovered after retries");
        }

        notify(progress, GenerationEvent::ExtractingUnknownWords);
        let unknown_words = self
            .extract_unknown_words(&sentences, words, known_unknown_words)
            .await?;

        notify(
            progress,
            GenerationEvent::Finished {
                sentences: sentences.len(),
            },
        );

        let total_words = words.len();
        Ok(GenerationResult {
            total_words,
            used_words: total_words - uncovered.len(),
            unused_words: uncovered.len(),
            group_count: groups.len(),
            unused_word_details: uncovered.iter().map(|w| (w.id, w.label())).collect(),
            unknown_words,
            sentences,
        })
    }

    /// Partition `words` into groups for the first generation pass.
    ///
    /// Lists no longer than `group_target_size` form a single group without
    /// a model call.
    pub async fn build_groups(&self, words: &[WordItem]) -> Result<Vec<Vec<WordItem>>> {
        let target = self.config.group_target_size.max(1);
        if words.len() <= target {
            return Ok(vec![words.to_vec()]);
        }

        let request = ChatRequest {
            system: GROUPING_SYSTEM_PROMPT.to_string(),
            user: build_grouping_prompt(words),
            temperature: self.config.grouping_temperature,
            max_tokens: self.config.grouping_max_tokens,
        };

        let groups = match self.optional_call(&request, "grouping").await? {
            Some(content) => match parse_groups(&content, words, target) {
                Parsed::Ok(groups) if !groups.is_empty() => Some(groups),
                Parsed::Ok(_) => None,
                Parsed::Malformed(reason) => {
                    tracing::warn!(%reason, "grouping reply unusable");
                    None
                }
            },
            None => None,
        };

        Ok(groups.unwrap_or_else(|| {
            tracing::info!(chunk = target, "falling back to fixed-size chunks");
            chunk_words(words, target)
        }))
    }

    /// One sentence call over `words`. A failed or malformed reply covers nothing.
    async fn sentence_call(
        &self,
        words: &[WordItem],
        prompt: String,
    ) -> Result<Vec<GeneratedSentence>> {
        let request = ChatRequest {
            system: SENTENCE_SYSTEM_PROMPT.to_string(),
            user: prompt,
            temperature: self.config.sentence_temperature,
            max_tokens: self.config.sentence_max_tokens,
        };

        let Some(content) = self.call(&request).await? else {
            return Ok(Vec::new());
        };
        match parse_sentences(&content, words) {
            Parsed::Ok(sentences) => Ok(sentences),
            Parsed::Malformed(reason) => {
                tracing::warn!(%reason, words = words.len(), "sentence reply unusable");
                Ok(Vec::new())
            }
        }
    }

    /// Ask for vocabulary in `sentences` that is neither provided nor already known.
    pub async fn extract_unknown_words(
        &self,
        sentences: &[GeneratedSentence],
        provided: &[WordItem],
        known_unknown_words: &HashSet<String>,
    ) -> Result<Vec<UnknownWord>> {
        if sentences.is_empty() {
            return Ok(Vec::new());
        }

        let mut known: HashSet<String> = known_unknown_words.clone();
        for word in provided {
            known.insert(word.word.clone());
            known.insert(word.reading.clone());
        }

        let request = ChatRequest {
            system: EXTRACTION_SYSTEM_PROMPT.to_string(),
            user: build_unknown_word_extraction_prompt(sentences, provided),
            temperature: self.config.extraction_temperature,
            max_tokens: self.config.extraction_max_tokens,
        };

        let Some(content) = self.optional_call(&request, "extraction").await? else {
            return Ok(Vec::new());
        };
        match parse_unknown_words(&content, &known) {
            Parsed::Ok(words) => {
                tracing::info!(unknown_words = words.len(), "extracted unknown words");
                Ok(words)
            }
            Parsed::Malformed(reason) => {
                tracing::warn!(%reason, "unknown-word reply unusable");
                Ok(Vec::new())
            }
        }
    }

    /// [`Self::call`] for steps the run can do without.
    ///
    /// Any error other than [`Error::Config`] yields `Ok(None)`, so an API
    /// error here never discards work already done.
    async fn optional_call(&self, request: &ChatRequest, step: &str) -> Result<Option<String>> {
        match self.call(request).await {
            Ok(content) => Ok(content),
            Err(e @ Error::Config(_)) => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, step, "optional model call failed; skipping");
                Ok(None)
            }
        }
    }

    /// Send one request and record its usage.
    ///
    /// Returns `Ok(None)` for call failures the run can absorb; other
    /// errors propagate and abort the run.
    async fn call(&self, request: &ChatRequest) -> Result<Option<String>> {
        match self.client.complete(request).await {
            Ok(completion) => {
                let cost = self.pricing.cost(&completion.usage);
                if let Err(e) = self
                    .ledger
                    .record_usage(completion.usage.total_tokens, cost)
                {
                    tracing::warn!(error = %e, "failed to record API usage");
                }
                tracing::debug!(
                    prompt_tokens = completion.usage.prompt_tokens,
                    completion_tokens = completion.usage.completion_tokens,
                    cost,
                    "model call complete"
                );
                Ok(Some(completion.content))
            }
            Err(e) if e.is_call_failure() => {
                tracing::warn!(error = %e, "model call failed; continuing without its output");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Prompts a run would start with, without calling the model.
///
/// Lists longer than `group_target_size` would first be grouped by the
/// model; the preview shows the grouping request and then the sentence
/// requests for the fixed-size fallback chunks.
pub fn preview_requests(words: &[WordItem], config: &GenerationConfig) -> Vec<ChatRequest> {
    let target = config.group_target_size.max(1);
    let mut requests = Vec::new();
    if words.is_empty() {
        return requests;
    }
    if words.len() > target {
        requests.push(ChatRequest {
            system: GROUPING_SYSTEM_PROMPT.to_string(),
            user: build_grouping_prompt(words),
            temperature: config.grouping_temperature,
            max_tokens: config.grouping_max_tokens,
        });
    }
    for group in chunk_words(words, target) {
        requests.push(ChatRequest {
            system: SENTENCE_SYSTEM_PROMPT.to_string(),
            user: build_sentence_prompt(&group),
            temperature: config.sentence_temperature,
            max_tokens: config.sentence_max_tokens,
        });
    }
    requests
}

fn chunk_words(words: &[WordItem], size: usize) -> Vec<Vec<WordItem>> {
    words.chunks(size.max(1)).map(<[WordItem]>::to_vec).collect()
}

fn absorb(
    sentences: &mut Vec<GeneratedSentence>,
    covered: &mut HashSet<i64>,
    produced: Vec<GeneratedSentence>,
) {
    for sentence in produced {
        covered.extend(sentence.used_word_ids.iter().copied());
        sentences.push(sentence);
    }
}

/// Words whose id no sentence has used yet, in input order.
fn uncovered_words(words: &[WordItem], covered: &HashSet<i64>) -> Vec<WordItem> {
    words
        .iter()
        .filter(|w| !covered.contains(&w.id))
        .cloned()
        .collect()
}

/// Progress callbacks are advisory; a panicking reporter must not end the run.
fn notify(progress: &dyn GenerationProgress, event: GenerationEvent) {
    if catch_unwind(AssertUnwindSafe(|| progress.report(event))).is_err() {
        tracing::warn!("progress reporter panicked; ignoring");
    }
}
