//! Generation progress reporting.
//!
//! Reports observable progress during `reibun generate` so users see how many
//! groups are being sent and which retry round is running. Progress is emitted
//! on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event from the sentence generator.
#[derive(Clone, Debug, PartialEq)]
pub enum GenerationEvent {
    /// A run has started with this many input words.
    Started { total_words: usize },
    /// Words have been partitioned into groups.
    Grouped { groups: usize },
    /// Generating sentences for group `index` (1-based) of `total`.
    Group { index: usize, total: usize },
    /// A coverage retry round is starting.
    RetryRound {
        round: usize,
        max_rounds: usize,
        remaining: usize,
    },
    /// Extracting unknown vocabulary from the produced sentences.
    ExtractingUnknownWords,
    /// The run finished with this many sentences.
    Finished { sentences: usize },
}

/// Reports generation progress. Implementations write to stderr (human or JSON).
pub trait GenerationProgress: Send + Sync {
    /// Emit a progress event. Called from the generator between LLM calls.
    fn report(&self, event: GenerationEvent);
}

/// Human-friendly progress on stderr: "generate  group 2 / 5".
pub struct StderrProgress;

impl GenerationProgress for StderrProgress {
    fn report(&self, event: GenerationEvent) {
        let line = match &event {
            GenerationEvent::Started { total_words } => {
                format!("generate  {} words\n", format_number(*total_words as u64))
            }
            GenerationEvent::Grouped { groups } => {
                format!("generate  {} groups\n", format_number(*groups as u64))
            }
            GenerationEvent::Group { index, total } => {
                format!("generate  group {} / {}\n", index, total)
            }
            GenerationEvent::RetryRound {
                round,
                max_rounds,
                remaining,
            } => format!(
                "generate  retry {} / {}  {} words left\n",
                round,
                max_rounds,
                format_number(*remaining as u64)
            ),
            GenerationEvent::ExtractingUnknownWords => {
                "generate  extracting unknown words...\n".to_string()
            }
            GenerationEvent::Finished { sentences } => {
                format!("generate  done  {} sentences\n", format_number(*sentences as u64))
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl GenerationProgress for JsonProgress {
    fn report(&self, event: GenerationEvent) {
        let obj = match &event {
            GenerationEvent::Started { total_words } => serde_json::json!({
                "event": "progress",
                "phase": "started",
                "total_words": total_words
            }),
            GenerationEvent::Grouped { groups } => serde_json::json!({
                "event": "progress",
                "phase": "grouped",
                "groups": groups
            }),
            GenerationEvent::Group { index, total } => serde_json::json!({
                "event": "progress",
                "phase": "group",
                "n": index,
                "total": total
            }),
            GenerationEvent::RetryRound {
                round,
                max_rounds,
                remaining,
            } => serde_json::json!({
                "event": "progress",
                "phase": "retry",
                "n": round,
                "total": max_rounds,
                "remaining": remaining
            }),
            GenerationEvent::ExtractingUnknownWords => serde_json::json!({
                "event": "progress",
                "phase": "extracting"
            }),
            GenerationEvent::Finished { sentences } => serde_json::json!({
                "event": "progress",
                "phase": "finished",
                "sentences": sentences
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl GenerationProgress for NoProgress {
    fn report(&self, _event: GenerationEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Caller passes it to the generator.
    pub fn reporter(&self) -> Box<dyn GenerationProgress> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1), "1");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn progress_mode_parses_from_cli_value() {
        use clap::ValueEnum;
        assert_eq!(
            ProgressMode::from_str("json", true).unwrap(),
            ProgressMode::Json
        );
        assert_eq!(ProgressMode::from_str("OFF", true).unwrap(), ProgressMode::Off);
        assert!(ProgressMode::from_str("loud", true).is_err());
    }
}
