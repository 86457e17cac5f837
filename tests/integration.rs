use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn rvr_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("rvr");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    // Raw batch: two days plus one empty-text review and one undated row
    fs::write(
        data_dir.join("raw.csv"),
        "Date,Review_Text,Rating,User\n\
         2024-06-01 08:30:00,App keeps crashing on checkout,1,maya\n\
         2024-06-01 12:00:00,,5,kira\n\
         2024-06-02 09:15:00,Driver was friendly and fast,5,omar\n\
         not-a-date,Never loads,3,pat\n",
    )
    .unwrap();

    let config_content = format!(
        r#"[storage]
raw_path = "{root}/data/raw.csv"
history_path = "{root}/data/history.csv"

[classifier]
provider = "disabled"

[pipeline]
default_date = "2024-06-01"
chat_context_rows = 50
resimulate = "append"

[server]
bind = "127.0.0.1:7341"
log_level = "warn"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("rvr.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn seed_history(tmp: &TempDir) {
    fs::write(
        tmp.path().join("data").join("history.csv"),
        "Date,Topic,Review,Original_Topic\n\
         2024-06-01,Positive Feedback,Great delivery,Positive Feedback\n\
         2024-06-01,Positive Feedback,Lovely food,Positive Feedback\n\
         2024-06-02,Order Accuracy,Wrong pizza arrived,Order Accuracy\n",
    )
    .unwrap();
}

fn run_rvr(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = rvr_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run rvr binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_range_reports_bounds() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_rvr(&config_path, &["range"]);
    assert!(success, "range failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("rows: 3"), "undated row should be dropped, got: {}", stdout);
    assert!(stdout.contains("min date: 2024-06-01"));
    assert!(stdout.contains("max date: 2024-06-02"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_range_with_missing_batch() {
    let (tmp, config_path) = setup_test_env();
    fs::remove_file(tmp.path().join("data").join("raw.csv")).unwrap();

    let (stdout, _, success) = run_rvr(&config_path, &["range"]);
    assert!(success, "range over a missing batch should not fail");
    assert!(stdout.contains("rows: 0"));
    assert!(stdout.contains("no raw data loaded"));
}

#[test]
fn test_simulate_with_disabled_classifier_reports_failures() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_rvr(&config_path, &["simulate", "--date", "2024-06-01"]);
    assert!(
        success,
        "simulate should complete despite failures: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(stdout.contains("fetched: 2"));
    assert!(stdout.contains("classified: 0"));
    assert!(stdout.contains("skipped empty: 1"));
    assert!(stdout.contains("failed: 1"));
    assert!(stdout.contains("ok"));

    // Nothing classified, so nothing was flushed
    assert!(!tmp.path().join("data").join("history.csv").exists());
}

#[test]
fn test_simulate_uses_configured_default_date() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_rvr(&config_path, &["simulate"]);
    assert!(success);
    assert!(stdout.contains("simulate 2024-06-01"));
}

#[test]
fn test_simulate_no_reviews_for_date() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_rvr(&config_path, &["simulate", "--date", "2030-01-01"]);
    assert!(success, "empty day is not an error");
    assert!(stdout.contains("no reviews found for 2030-01-01"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_simulate_invalid_date_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_rvr(&config_path, &["simulate", "--date", "June first"]);
    assert!(!success, "malformed date should fail");
    assert!(stderr.contains("Invalid date"), "got: {}", stderr);
}

#[test]
fn test_trends_table_over_seeded_history() {
    let (tmp, config_path) = setup_test_env();
    seed_history(&tmp);

    let (stdout, _, success) = run_rvr(&config_path, &["trends"]);
    assert!(success);
    assert!(stdout.contains("Topic"));
    assert!(stdout.contains("2024-06-01"));
    assert!(stdout.contains("Order Accuracy"));
    assert!(stdout.contains("Positive Feedback"));
}

#[test]
fn test_trends_json_records() {
    let (tmp, config_path) = setup_test_env();
    seed_history(&tmp);

    let (stdout, _, success) = run_rvr(&config_path, &["trends", "--json"]);
    assert!(success);

    let records: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["Topic"], "Order Accuracy");
    assert_eq!(records[0]["2024-06-01"], 0);
    assert_eq!(records[0]["2024-06-02"], 1);
    assert_eq!(records[1]["Topic"], "Positive Feedback");
    assert_eq!(records[1]["2024-06-01"], 2);
}

#[test]
fn test_trends_empty_history() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_rvr(&config_path, &["trends"]);
    assert!(success, "empty history is not an error");
    assert!(stdout.contains("(no trend data)"));
}

#[test]
fn test_ask_with_no_history() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_rvr(&config_path, &["ask", "How are delivery times?"]);
    assert!(success);
    assert!(stdout.contains("I haven't processed any data yet"));
}

#[test]
fn test_ask_with_disabled_model_reports_error_reply() {
    let (tmp, config_path) = setup_test_env();
    seed_history(&tmp);

    let (stdout, _, success) = run_rvr(&config_path, &["ask", "How are delivery times?"]);
    assert!(success, "chat never fails the command");
    assert!(stdout.contains("Error processing chat:"));
}

#[test]
fn test_ingest_converts_export() {
    let (tmp, config_path) = setup_test_env();
    let export = tmp.path().join("export.json");
    fs::write(
        &export,
        r#"[
  {"at": "2024-06-01 10:00:00", "content": "Solid app", "score": 5, "userName": "ana"},
  {"at": "2024-06-02 11:30:00", "content": "Soggy fries", "score": 2, "userName": "ben"},
  {"at": "2024-05-20 09:00:00", "content": "Ancient history", "score": 3, "userName": "cruz"}
]"#,
    )
    .unwrap();
    let out = tmp.path().join("data").join("converted.csv");

    let (stdout, stderr, success) = run_rvr(
        &config_path,
        &[
            "ingest",
            export.to_str().unwrap(),
            "--cutoff",
            "2024-06-01",
            "--output",
            out.to_str().unwrap(),
        ],
    );
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("records in export: 3"));
    assert!(stdout.contains("before cutoff: 1"));
    assert!(stdout.contains("written: 2"));
    assert!(stdout.contains("ok"));

    let written = fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("Date,Review_Text,Rating,User"));
    assert!(written.contains("2024-06-01 10:00:00,Solid app,5,ana"));
    assert!(!written.contains("Ancient history"));
}

#[test]
fn test_ingest_works_without_config_file() {
    let tmp = TempDir::new().unwrap();
    let export = tmp.path().join("export.json");
    fs::write(
        &export,
        r#"[{"at": "2024-06-01", "content": "Fine", "score": 4, "userName": "dee"}]"#,
    )
    .unwrap();
    let out = tmp.path().join("raw.csv");
    let missing_config = tmp.path().join("nope.toml");

    let (stdout, stderr, success) = run_rvr(
        &missing_config,
        &[
            "ingest",
            export.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
        ],
    );
    assert!(success, "ingest without config failed: stdout={}, stderr={}", stdout, stderr);
    assert!(out.exists());
}

#[test]
fn test_unknown_provider_rejected() {
    let (tmp, config_path) = setup_test_env();
    let config = fs::read_to_string(&config_path).unwrap();
    fs::write(
        &config_path,
        config.replace("provider = \"disabled\"", "provider = \"oracle\""),
    )
    .unwrap();
    let _ = tmp;

    let (_, stderr, success) = run_rvr(&config_path, &["range"]);
    assert!(!success, "unknown provider should fail config load");
    assert!(stderr.contains("Unknown classifier provider"), "got: {}", stderr);
}

#[test]
fn test_simulate_then_trends_roundtrip_files() {
    // With the classifier disabled nothing lands in history, so seed it by
    // hand and confirm trends reads exactly what simulate would have written.
    let (tmp, config_path) = setup_test_env();
    seed_history(&tmp);

    let (stdout, _, success) = run_rvr(&config_path, &["trends", "--json"]);
    assert!(success);
    let records: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 2);

    // A simulate on a day with no classifiable output must leave the file alone
    let before = fs::read_to_string(tmp.path().join("data").join("history.csv")).unwrap();
    run_rvr(&config_path, &["simulate", "--date", "2024-06-02"]);
    let after = fs::read_to_string(tmp.path().join("data").join("history.csv")).unwrap();
    assert_eq!(before, after);
}
