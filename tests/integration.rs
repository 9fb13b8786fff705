use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn reibun_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("reibun");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let words: Vec<String> = (1..=25)
        .map(|id| {
            format!(
                r#"{{"id": {id}, "word": "単語{id}", "reading": "たんご{id}", "meaning": "단어{id}"}}"#
            )
        })
        .collect();
    fs::write(root.join("words.json"), format!("[{}]", words.join(","))).unwrap();

    // The endpoint is never reachable; no test here should get that far.
    let config_content = format!(
        r#"[storage]
dir = "{root}/data"

[llm]
endpoint = "http://127.0.0.1:9/v1/chat/completions"
api_key_env = "REIBUN_TEST_NO_SUCH_KEY"
max_retries = 0

[words]
path = "{root}/words.json"
words_per_day = 20
"#,
        root = root.display()
    );

    let config_path = root.join("reibun.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_reibun(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = reibun_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("REIBUN_TEST_NO_SUCH_KEY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run reibun binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_batches_list_empty() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_reibun(&config_path, &["batches", "list"]);
    assert!(success, "batches list failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("No batches."));
}

#[test]
fn test_storage_migration_runs_on_first_open() {
    let (tmp, config_path) = setup_test_env();
    let data = tmp.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("generated_sentences.json"), "[]").unwrap();

    let (_, stderr, success) = run_reibun(&config_path, &["batches", "list"]);
    assert!(success, "batches list failed: {}", stderr);
    assert!(!data.join("generated_sentences.json").exists());

    let prefs = fs::read_to_string(data.join("prefs.json")).unwrap();
    assert!(prefs.contains("\"sentence_migration_v2_done\": true"));
    assert!(prefs.contains("\"next_sentence_id\": 20000"));
}

#[test]
fn test_stats_on_fresh_store() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_reibun(&config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Requests:    0"));
    assert!(stdout.contains("Batches:     0"));
    assert!(stdout.contains("Next id:     20000"));
}

#[test]
fn test_key_set_persists() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_reibun(&config_path, &["key", "set", "sk-test-123"]);
    assert!(success, "key set failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("API key saved."));

    let prefs = fs::read_to_string(tmp.path().join("data").join("prefs.json")).unwrap();
    assert!(prefs.contains("sk-test-123"));

    let (_, _, success) = run_reibun(&config_path, &["key", "clear"]);
    assert!(success);
    let prefs = fs::read_to_string(tmp.path().join("data").join("prefs.json")).unwrap();
    assert!(!prefs.contains("sk-test-123"));
}

#[test]
fn test_generate_without_key_is_config_error() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_reibun(&config_path, &["generate", "--day", "1"]);
    assert!(!success, "generate should fail without a key: stdout={}", stdout);
    assert!(stderr.contains("API key is not set"), "stderr={}", stderr);
    assert!(!tmp
        .path()
        .join("data")
        .join("sentence_batches")
        .read_dir()
        .map(|mut d| d.next().is_some())
        .unwrap_or(false));
}

#[test]
fn test_generate_requires_word_selection() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_reibun(&config_path, &["generate"]);
    assert!(!success);
    assert!(stderr.contains("--day"));
}

#[test]
fn test_generate_dry_run_prints_prompts() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_reibun(&config_path, &["generate", "--day", "2", "--dry-run"]);
    assert!(success, "dry run failed: stderr={}", stderr);
    assert!(stdout.contains("generate (dry-run)"));
    assert!(stdout.contains("words: 5"));
    assert!(stdout.contains("0. 単語21 (たんご21): 단어21"));
}

#[test]
fn test_unknown_day_is_rejected() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_reibun(&config_path, &["generate", "--day", "7", "--dry-run"]);
    assert!(!success);
    assert!(stderr.contains("Day 7 does not exist"));
}

#[test]
fn test_delete_missing_batch_is_noop() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_reibun(&config_path, &["batches", "delete", "nope"]);
    assert!(success, "delete failed: {}", stderr);
    assert!(stdout.contains("nothing deleted"));
}

#[test]
fn test_clear_requires_confirmation() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_reibun(&config_path, &["batches", "clear"]);
    assert!(!success);
    assert!(stderr.contains("--yes"));

    let (stdout, _, success) = run_reibun(&config_path, &["batches", "clear", "--yes"]);
    assert!(success);
    assert!(stdout.contains("deleted: 0"));
}
