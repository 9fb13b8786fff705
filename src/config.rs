use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub words: WordsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_connect_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    2
}

/// Per-token prices, in USD per one million tokens.
#[derive(Debug, Deserialize, Clone)]
pub struct PricingConfig {
    #[serde(default = "default_input_price")]
    pub input_per_million: f64,
    #[serde(default = "default_output_price")]
    pub output_per_million: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            input_per_million: default_input_price(),
            output_per_million: default_output_price(),
        }
    }
}

fn default_input_price() -> f64 {
    0.150
}
fn default_output_price() -> f64 {
    0.600
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_group_target_size")]
    pub group_target_size: usize,
    #[serde(default = "default_max_retry_rounds")]
    pub max_retry_rounds: usize,
    #[serde(default = "default_retry_chunk_size")]
    pub retry_chunk_size: usize,
    #[serde(default = "default_sentence_temperature")]
    pub sentence_temperature: f32,
    #[serde(default = "default_low_temperature")]
    pub grouping_temperature: f32,
    #[serde(default = "default_low_temperature")]
    pub extraction_temperature: f32,
    #[serde(default = "default_sentence_max_tokens")]
    pub sentence_max_tokens: u32,
    #[serde(default = "default_grouping_max_tokens")]
    pub grouping_max_tokens: u32,
    #[serde(default = "default_sentence_max_tokens")]
    pub extraction_max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            group_target_size: default_group_target_size(),
            max_retry_rounds: default_max_retry_rounds(),
            retry_chunk_size: default_retry_chunk_size(),
            sentence_temperature: default_sentence_temperature(),
            grouping_temperature: default_low_temperature(),
            extraction_temperature: default_low_temperature(),
            sentence_max_tokens: default_sentence_max_tokens(),
            grouping_max_tokens: default_grouping_max_tokens(),
            extraction_max_tokens: default_sentence_max_tokens(),
        }
    }
}

fn default_group_target_size() -> usize {
    8
}
fn default_max_retry_rounds() -> usize {
    3
}
fn default_retry_chunk_size() -> usize {
    4
}
fn default_sentence_temperature() -> f32 {
    0.7
}
fn default_low_temperature() -> f32 {
    0.3
}
fn default_sentence_max_tokens() -> u32 {
    2000
}
fn default_grouping_max_tokens() -> u32 {
    1500
}

#[derive(Debug, Deserialize, Clone)]
pub struct WordsConfig {
    #[serde(default = "default_words_path")]
    pub path: PathBuf,
    #[serde(default = "default_words_per_day")]
    pub words_per_day: usize,
}

impl Default for WordsConfig {
    fn default() -> Self {
        Self {
            path: default_words_path(),
            words_per_day: default_words_per_day(),
        }
    }
}

fn default_words_path() -> PathBuf {
    PathBuf::from("./words.json")
}
fn default_words_per_day() -> usize {
    20
}

/// Load and validate the configuration file.
///
/// A missing file is not an error: every section has defaults, so the
/// built-in configuration is returned instead.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let generation = &config.generation;
    if generation.group_target_size == 0 {
        anyhow::bail!("generation.group_target_size must be >= 1");
    }
    if generation.retry_chunk_size == 0 {
        anyhow::bail!("generation.retry_chunk_size must be >= 1");
    }
    for (name, value) in [
        ("sentence_temperature", generation.sentence_temperature),
        ("grouping_temperature", generation.grouping_temperature),
        ("extraction_temperature", generation.extraction_temperature),
    ] {
        if !(0.0..=2.0).contains(&value) {
            anyhow::bail!("generation.{} must be in [0.0, 2.0]", name);
        }
    }

    if config.pricing.input_per_million < 0.0 || config.pricing.output_per_million < 0.0 {
        anyhow::bail!("pricing values must be >= 0");
    }

    if config.llm.endpoint.trim().is_empty() {
        anyhow::bail!("llm.endpoint must not be empty");
    }

    if config.words.words_per_day == 0 {
        anyhow::bail!("words.words_per_day must be >= 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config(&tmp.path().join("nope.toml")).unwrap();
        assert_eq!(cfg.generation.group_target_size, 8);
        assert_eq!(cfg.generation.max_retry_rounds, 3);
        assert_eq!(cfg.generation.retry_chunk_size, 4);
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("reibun.toml");
        std::fs::write(
            &path,
            r#"
[storage]
dir = "/tmp/reibun-data"

[generation]
max_retry_rounds = 1
"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.storage.dir, PathBuf::from("/tmp/reibun-data"));
        assert_eq!(cfg.generation.max_retry_rounds, 1);
        assert_eq!(cfg.generation.group_target_size, 8);
        assert!((cfg.pricing.output_per_million - 0.6).abs() < 1e-9);
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("reibun.toml");
        std::fs::write(&path, "[generation]\nretry_chunk_size = 0\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("retry_chunk_size"));
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("reibun.toml");
        std::fs::write(&path, "[generation]\nsentence_temperature = 3.5\n").unwrap();

        assert!(load_config(&path).is_err());
    }
}
