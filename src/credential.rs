//! API key lookup: stored key first, then the configured environment variable.

use anyhow::Result;
use serde_json::Value;

use crate::config::LlmConfig;
use crate::store::KeyValueStore;

pub const API_KEY_KEY: &str = "api_key";

pub fn save_api_key(prefs: &dyn KeyValueStore, api_key: &str) -> Result<()> {
    prefs.set(API_KEY_KEY, Value::from(api_key.trim()))
}

pub fn clear_api_key(prefs: &dyn KeyValueStore) -> Result<()> {
    prefs.remove(API_KEY_KEY)
}

/// The API key to use, if any. Blank values count as absent.
pub fn resolve_api_key(prefs: &dyn KeyValueStore, config: &LlmConfig) -> Option<String> {
    prefs
        .get_string(API_KEY_KEY)
        .filter(|k| !k.trim().is_empty())
        .or_else(|| {
            std::env::var(&config.api_key_env)
                .ok()
                .filter(|k| !k.trim().is_empty())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKvStore;

    fn config_without_env() -> LlmConfig {
        LlmConfig {
            api_key_env: "REIBUN_TEST_UNSET_KEY_VARIABLE".to_string(),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn stored_key_wins() {
        let prefs = MemoryKvStore::new();
        save_api_key(&prefs, "  sk-test  ").unwrap();
        assert_eq!(
            resolve_api_key(&prefs, &config_without_env()).as_deref(),
            Some("sk-test")
        );
        clear_api_key(&prefs).unwrap();
        assert_eq!(resolve_api_key(&prefs, &config_without_env()), None);
    }

    #[test]
    fn blank_key_is_absent() {
        let prefs = MemoryKvStore::new();
        prefs.set(API_KEY_KEY, Value::from("")).unwrap();
        assert_eq!(resolve_api_key(&prefs, &config_without_env()), None);
    }
}
