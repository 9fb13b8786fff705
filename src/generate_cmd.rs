//! `reibun generate`: pick words, run the generator, save one batch.

use std::collections::HashSet;

use anyhow::{bail, Result};

use crate::config::Config;
use crate::credential::resolve_api_key;
use crate::generate::{preview_requests, SentenceGenerator};
use crate::ledger::UsageLedger;
use crate::llm::{OpenAiClient, Pricing};
use crate::models::{GenerationResult, NewSentence, WordItem};
use crate::progress::ProgressMode;
use crate::stats::format_cost;
use crate::store::open_storage;
use crate::words::WordSource;

pub async fn run_generate(
    config: &Config,
    days: &[usize],
    ids: &[i64],
    progress: ProgressMode,
    dry_run: bool,
) -> Result<()> {
    if days.is_empty() && ids.is_empty() {
        bail!("Nothing to generate. Pick words with --day N or --ids 1,2,3.");
    }

    let source = WordSource::load(&config.words.path, config.words.words_per_day)?;
    let words = source.select(days, ids)?;

    if dry_run {
        print_preview(config, &words);
        return Ok(());
    }

    let (prefs, store) = open_storage(&config.storage)?;
    let client = OpenAiClient::new(&config.llm, resolve_api_key(prefs.as_ref(), &config.llm))?;
    let ledger = UsageLedger::new(prefs);
    let cost_before = ledger.total_cost();
    let known: HashSet<String> = store.all_unknown_word_keys();

    let generator = SentenceGenerator::new(
        &client,
        &ledger,
        Pricing::from_config(&config.pricing),
        config.generation.clone(),
    );
    let reporter = progress.reporter();
    let result = generator.generate(&words, &known, reporter.as_ref()).await?;

    if result.sentences.is_empty() {
        println!("generate");
        println!("  no sentences were produced; nothing saved");
        print_uncovered(&result);
        return Ok(());
    }

    let sentences: Vec<NewSentence> = result.sentences.iter().map(NewSentence::from).collect();
    let used_words: Vec<String> = words.iter().map(|w| w.word.clone()).collect();
    let info = store.save_batch(&sentences, &used_words, &result.unknown_words)?;

    println!("generate");
    println!("  batch: #{} ({})", info.batch_number, info.batch_id);
    println!("  sentences: {}", info.sentence_count);
    println!("  words covered: {} / {}", result.used_words, result.total_words);
    println!("  groups: {}", result.group_count);
    println!("  new words: {}", info.unknown_word_count);
    println!("  cost: {}", format_cost(ledger.total_cost() - cost_before));
    print_uncovered(&result);

    Ok(())
}

fn print_uncovered(result: &GenerationResult) {
    if result.unused_word_details.is_empty() {
        return;
    }
    println!("  uncovered words: {}", result.unused_words);
    for (id, label) in &result.unused_word_details {
        println!("    {:>6}  {}", id, label);
    }
    let ids: Vec<String> = result
        .unused_word_details
        .iter()
        .map(|(id, _)| id.to_string())
        .collect();
    println!("  retry with: reibun generate --ids {}", ids.join(","));
}

fn print_preview(config: &Config, words: &[WordItem]) {
    println!("generate (dry-run)");
    println!("  words: {}", words.len());
    println!("  model: {}", config.llm.model);
    for (index, request) in preview_requests(words, &config.generation)
        .iter()
        .enumerate()
    {
        println!();
        println!(
            "--- request {} (temperature {}, max tokens {}) ---",
            index + 1,
            request.temperature,
            request.max_tokens
        );
        println!("[system] {}", request.system);
        println!("{}", request.user);
    }
}
