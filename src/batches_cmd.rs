//! `reibun batches`: inspect and manage stored sentence batches.

use std::path::Path;

use anyhow::{bail, Result};

use crate::bookmarks::Bookmarks;
use crate::stats::format_ts_iso;
use crate::store::BatchStore;

pub fn run_list(store: &BatchStore) -> Result<()> {
    let batches = store.all_batches();
    if batches.is_empty() {
        println!("No batches.");
        return Ok(());
    }

    println!(
        "{:<4} {:<36} {:>9} {:>6} {:>9}   {}",
        "#", "BATCH ID", "SENTENCES", "WORDS", "NEW WORDS", "CREATED"
    );
    for b in &batches {
        println!(
            "{:<4} {:<36} {:>9} {:>6} {:>9}   {}",
            b.batch_number,
            b.batch_id,
            b.sentence_count,
            b.word_count,
            b.unknown_word_count,
            format_ts_iso(b.created_at)
        );
    }
    Ok(())
}

pub fn run_show(store: &BatchStore, batch_id: &str) -> Result<()> {
    let Some(batch) = store.batch(batch_id) else {
        bail!("No batch with id {}", batch_id);
    };

    println!(
        "Batch #{} ({}), created {}",
        batch.info.batch_number,
        batch.info.batch_id,
        format_ts_iso(batch.info.created_at)
    );
    println!("Words: {}", batch.info.used_words.join(", "));
    println!();
    for s in &batch.sentences {
        println!("{:>6}  {}", s.id, s.kanji);
        println!("        {}", s.hiragana);
        println!("        {}", s.meaning);
    }
    Ok(())
}

pub fn run_unknown(store: &BatchStore, batch_id: &str) -> Result<()> {
    if store.batch(batch_id).is_none() {
        bail!("No batch with id {}", batch_id);
    }
    let words = store.unknown_words_by_batch_id(batch_id);
    if words.is_empty() {
        println!("No new words in this batch.");
        return Ok(());
    }
    for w in &words {
        println!("{}  ({})  {}", w.word, w.reading, w.meaning);
    }
    Ok(())
}

/// Delete one batch and prune bookmarks that pointed at its sentences.
pub fn run_delete(store: &BatchStore, batch_id: &str, bookmarks_path: &Path) -> Result<()> {
    let Some(removed_ids) = store.delete_batch(batch_id)? else {
        println!("No batch with id {}; nothing deleted.", batch_id);
        return Ok(());
    };

    let mut bookmarks = Bookmarks::load(bookmarks_path)?;
    let pruned = bookmarks.remove_ids(&removed_ids) + bookmarks.retain_valid(store);
    if pruned > 0 {
        bookmarks.save()?;
    }

    println!("batches delete");
    println!("  deleted: {}", batch_id);
    println!("  sentences removed: {}", removed_ids.len());
    println!("  bookmarks pruned: {}", pruned);
    println!("  remaining batches: {}", store.all_batches().len());
    Ok(())
}

pub fn run_clear(store: &BatchStore, bookmarks_path: &Path, yes: bool) -> Result<()> {
    if !yes {
        bail!("This deletes every batch and resets sentence ids. Re-run with --yes to confirm.");
    }
    let count = store.all_batches().len();
    store.clear_all_batches()?;

    let mut bookmarks = Bookmarks::load(bookmarks_path)?;
    if bookmarks.clear_sentences() > 0 {
        bookmarks.save()?;
    }

    println!("batches clear");
    println!("  deleted: {}", count);
    Ok(())
}
