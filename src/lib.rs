//! # reibun
//!
//! Example-sentence generation for Japanese vocabulary study.
//!
//! reibun sends a learner's word list to a chat-completion model, asks for
//! short natural sentences that use every word (with readings and Korean
//! translations), retries words the model skipped, and stores each run as a
//! numbered batch on disk. Vocabulary the model introduced on its own is
//! extracted alongside, and every call's token usage and cost is tallied.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌─────────────┐
//! │  Words   │──▶│   Generator   │──▶│ Batch Store │──▶ batch_<id>.json
//! │ (day/id) │   │  group/write  │   │ ids/numbers │
//! └──────────┘   │ retry/extract │   └─────────────┘
//!                └───────┬───────┘
//!                        ▼
//!                 ┌────────────┐   ┌──────────┐
//!                 │ ChatClient │──▶│  Ledger  │──▶ prefs.json
//!                 │  (OpenAI)  │   │tokens/USD│
//!                 └────────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! reibun key set sk-...           # store the API key
//! reibun generate --day 3         # sentences for day 3's words
//! reibun batches list
//! reibun stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`prompt`] | Prompt construction |
//! | [`llm`] | Chat-completion client trait and HTTP adapter |
//! | [`parse`] | Defensive decoding of model replies |
//! | [`generate`] | Coverage-seeking generation run |
//! | [`store`] | Batch persistence and key/value storage |
//! | [`migrate`] | One-time legacy storage migration |
//! | [`ledger`] | Cumulative usage and cost |
//! | [`words`] | Vocabulary source |
//! | [`bookmarks`] | Bookmarked study items |

pub mod batches_cmd;
pub mod bookmarks;
pub mod config;
pub mod credential;
pub mod error;
pub mod generate;
pub mod generate_cmd;
pub mod ledger;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod parse;
pub mod progress;
pub mod prompt;
pub mod stats;
pub mod store;
pub mod words;
