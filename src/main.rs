//! # reibun CLI
//!
//! The `reibun` binary generates example sentences for vocabulary words and
//! manages the stored batches.
//!
//! ## Usage
//!
//! ```bash
//! reibun --config ./reibun.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `reibun generate --day <N>` | Generate sentences for one or more study days |
//! | `reibun generate --ids <1,2,3>` | Generate sentences for specific words |
//! | `reibun batches list` | List stored batches |
//! | `reibun batches show <ID>` | Print the sentences of one batch |
//! | `reibun batches unknown <ID>` | Print the new words found in one batch |
//! | `reibun batches delete <ID>` | Delete a batch and renumber the rest |
//! | `reibun batches clear --yes` | Delete every batch and reset sentence ids |
//! | `reibun key set <KEY>` | Store the API key |
//! | `reibun key clear` | Remove the stored API key |
//! | `reibun stats` | Usage, cost, and batch overview |
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `reibun=info`).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use reibun::bookmarks::{Bookmarks, BOOKMARKS_FILE_NAME};
use reibun::config::{self, Config};
use reibun::ledger::UsageLedger;
use reibun::progress::ProgressMode;
use reibun::store::open_storage;
use reibun::{batches_cmd, credential, generate_cmd, stats};

/// Example-sentence generator for Japanese vocabulary.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "reibun",
    about = "Generate Japanese example sentences that cover your vocabulary",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./reibun.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Generate sentences and save them as a new batch.
    ///
    /// Words come from the configured word list, chosen by study day and/or
    /// by id. Words the model still skipped after all retries are listed at
    /// the end so they can be passed back with `--ids`.
    Generate {
        /// Study day (1-based). Repeat for several days.
        #[arg(long = "day")]
        days: Vec<usize>,

        /// Comma-separated word ids.
        #[arg(long, value_delimiter = ',')]
        ids: Vec<i64>,

        /// Progress output on stderr. Defaults to human when stderr is a TTY.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,

        /// Print the prompts that would be sent without calling the API.
        #[arg(long)]
        dry_run: bool,
    },

    /// Inspect and manage stored batches.
    Batches {
        #[command(subcommand)]
        action: BatchesAction,
    },

    /// Manage the stored API key.
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Show usage, cost, and batch statistics.
    Stats,
}

#[derive(Subcommand)]
enum BatchesAction {
    /// List batches by display number.
    List,
    /// Print the sentences of one batch.
    Show { batch_id: String },
    /// Print the new words extracted for one batch.
    Unknown { batch_id: String },
    /// Delete one batch. Bookmarks pointing at its sentences are pruned.
    Delete {
        batch_id: String,
        /// Bookmark file to prune. Defaults to `bookmarks.json` in the storage directory.
        #[arg(long)]
        bookmarks: Option<PathBuf>,
    },
    /// Delete every batch and reset the sentence id counter.
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store the API key.
    Set { key: String },
    /// Remove the stored API key.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reibun=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Generate {
            days,
            ids,
            progress,
            dry_run,
        } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            generate_cmd::run_generate(&cfg, &days, &ids, mode, dry_run).await?;
        }
        Commands::Batches { action } => {
            let (_, store) = open_storage(&cfg.storage)?;
            match action {
                BatchesAction::List => batches_cmd::run_list(&store)?,
                BatchesAction::Show { batch_id } => batches_cmd::run_show(&store, &batch_id)?,
                BatchesAction::Unknown { batch_id } => {
                    batches_cmd::run_unknown(&store, &batch_id)?
                }
                BatchesAction::Delete {
                    batch_id,
                    bookmarks,
                } => {
                    let path = bookmarks.unwrap_or_else(|| default_bookmarks_path(&cfg));
                    batches_cmd::run_delete(&store, &batch_id, &path)?;
                }
                BatchesAction::Clear { yes } => {
                    batches_cmd::run_clear(&store, &default_bookmarks_path(&cfg), yes)?
                }
            }
        }
        Commands::Key { action } => {
            let (prefs, _) = open_storage(&cfg.storage)?;
            match action {
                KeyAction::Set { key } => {
                    if key.trim().is_empty() {
                        anyhow::bail!("API key must not be empty");
                    }
                    credential::save_api_key(prefs.as_ref(), &key)?;
                    println!("API key saved.");
                }
                KeyAction::Clear => {
                    credential::clear_api_key(prefs.as_ref())?;
                    println!("API key removed.");
                }
            }
        }
        Commands::Stats => {
            let (prefs, store) = open_storage(&cfg.storage)?;
            let ledger = UsageLedger::new(prefs);
            let bookmarks = Bookmarks::load(&default_bookmarks_path(&cfg))?;
            stats::run_stats(&cfg, &store, &ledger, &bookmarks)?;
        }
    }

    Ok(())
}

fn default_bookmarks_path(cfg: &Config) -> PathBuf {
    cfg.storage.dir.join(BOOKMARKS_FILE_NAME)
}
