//! Usage and storage overview.
//!
//! Provides a quick summary of what has been generated and what it cost:
//! cumulative API usage, batch and sentence counts, and a per-batch
//! breakdown. Used by `reibun stats`.

use anyhow::Result;

use crate::bookmarks::Bookmarks;
use crate::config::Config;
use crate::ledger::UsageLedger;
use crate::progress::format_number;
use crate::store::BatchStore;

/// Print the stats summary.
pub fn run_stats(
    config: &Config,
    store: &BatchStore,
    ledger: &UsageLedger,
    bookmarks: &Bookmarks,
) -> Result<()> {
    let usage = ledger.snapshot();
    let batches = store.all_batches();
    let total_sentences: usize = batches.iter().map(|b| b.sentence_count).sum();
    let total_unknown: usize = batches.iter().map(|b| b.unknown_word_count).sum();
    let marked = bookmarks.summary();

    println!("reibun: Generation Stats");
    println!("========================");
    println!();
    println!("  Storage:     {}", config.storage.dir.display());
    println!("  Model:       {}", config.llm.model);
    println!();
    println!("  Requests:    {}", format_number(usage.requests));
    println!("  Tokens:      {}", format_number(usage.tokens));
    println!("  Cost:        {}", format_cost(usage.cost));
    println!();
    println!("  Batches:     {}", batches.len());
    println!("  Sentences:   {}", format_number(total_sentences as u64));
    println!("  New words:   {}", format_number(total_unknown as u64));
    println!("  Next id:     {}", store.next_sentence_id());
    println!(
        "  Bookmarks:   {} words, {} song words, {} sentences",
        marked.words, marked.song_words, marked.sentences
    );

    if !batches.is_empty() {
        println!();
        println!("  By batch:");
        println!(
            "  {:<4} {:<36} {:>9} {:>6} {:>9}   {}",
            "#", "BATCH ID", "SENTENCES", "WORDS", "NEW WORDS", "CREATED"
        );
        println!("  {}", "-".repeat(86));

        for b in &batches {
            println!(
                "  {:<4} {:<36} {:>9} {:>6} {:>9}   {}",
                b.batch_number,
                b.batch_id,
                b.sentence_count,
                b.word_count,
                b.unknown_word_count,
                format_ts_relative(b.created_at)
            );
        }
    }

    println!();
    Ok(())
}

/// Format a USD amount; sub-cent values keep enough digits to be visible.
pub fn format_cost(cost: f64) -> String {
    if cost > 0.0 && cost < 0.01 {
        format!("${:.6}", cost)
    } else {
        format!("${:.2}", cost)
    }
}

/// Format a millisecond timestamp as a relative time string (e.g. "3 hours ago").
pub fn format_ts_relative(ts_ms: i64) -> String {
    let now = chrono::Utc::now().timestamp_millis();
    let delta = (now - ts_ms) / 1000;

    if delta < 0 {
        return format_ts_iso(ts_ms);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts_ms)
    }
}

pub fn format_ts_iso(ts_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts_ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cost() {
        assert_eq!(format_cost(0.0), "$0.00");
        assert_eq!(format_cost(0.000345), "$0.000345");
        assert_eq!(format_cost(1.5), "$1.50");
    }

    #[test]
    fn test_format_ts() {
        let now = chrono::Utc::now().timestamp_millis();
        assert_eq!(format_ts_relative(now), "just now");
        assert_eq!(format_ts_relative(now - 2 * 3_600_000), "2 hours ago");
        assert_eq!(format_ts_iso(0), "1970-01-01 00:00");
    }
}
