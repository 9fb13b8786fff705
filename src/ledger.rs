//! Cumulative API usage and cost.
//!
//! Three scalars in the key/value store, never reset automatically. Each
//! update is a single read-modify-write of all three.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::store::KeyValueStore;

pub const TOTAL_REQUESTS_KEY: &str = "total_requests";
pub const TOTAL_TOKENS_KEY: &str = "total_tokens";
pub const TOTAL_COST_KEY: &str = "total_cost";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub requests: u64,
    pub tokens: u64,
    /// USD.
    pub cost: f64,
}

pub struct UsageLedger {
    prefs: Arc<dyn KeyValueStore>,
    update: Mutex<()>,
}

impl UsageLedger {
    pub fn new(prefs: Arc<dyn KeyValueStore>) -> Self {
        Self {
            prefs,
            update: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            requests: self.total_requests(),
            tokens: self.total_tokens(),
            cost: self.total_cost(),
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.prefs.get_u64(TOTAL_REQUESTS_KEY).unwrap_or(0)
    }

    pub fn total_tokens(&self) -> u64 {
        self.prefs.get_u64(TOTAL_TOKENS_KEY).unwrap_or(0)
    }

    pub fn total_cost(&self) -> f64 {
        self.prefs.get_f64(TOTAL_COST_KEY).unwrap_or(0.0)
    }

    /// Count one request with its tokens and cost.
    pub fn record_usage(&self, tokens: u64, cost: f64) -> Result<()> {
        let _guard = self.update.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();
        self.prefs.set_many(&[
            (TOTAL_REQUESTS_KEY, Value::from(current.requests + 1)),
            (TOTAL_TOKENS_KEY, Value::from(current.tokens + tokens)),
            (TOTAL_COST_KEY, Value::from(current.cost + cost)),
        ])
    }
}
