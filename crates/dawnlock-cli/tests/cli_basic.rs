//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own DAWNLOCK_HOME.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_dawnlock"))
        .args(args)
        .env("DAWNLOCK_HOME", home)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn run_cli_with_input(home: &Path, args: &[&str], input: &str) -> (i32, String) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_dawnlock"))
        .args(args)
        .env("DAWNLOCK_HOME", home)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn CLI");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
    )
}

#[test]
fn test_config_path_is_under_home() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "path"]);
    assert_eq!(code, 0);
    assert!(stdout.trim().ends_with("config.toml"));
    assert!(stdout.contains(&*home.path().to_string_lossy()));
}

#[test]
fn test_config_get_and_set() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "alarm.puzzles_required"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "3");

    let (code, _, _) = run_cli(home.path(), &["config", "set", "alarm.puzzles_required", "5"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(home.path(), &["config", "get", "alarm.puzzles_required"]);
    assert_eq!(stdout.trim(), "5");
}

#[test]
fn test_config_set_rejects_invalid_value() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "set", "alarm.puzzles_required", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error"));

    let (_, stdout, _) = run_cli(home.path(), &["config", "get", "alarm.puzzles_required"]);
    assert_eq!(stdout.trim(), "3");
}

#[test]
fn test_config_get_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "get", "alarm.volume"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_reminder_add_and_list() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["reminder", "add", "Take out the trash"]);
    assert_eq!(code, 0);
    let (code, _, _) = run_cli(
        home.path(),
        &["reminder", "add", "Dentist moved to Thursday", "--kind", "note"],
    );
    assert_eq!(code, 0);

    let (code, stdout, _) = run_cli(home.path(), &["reminder", "list", "--json"]);
    assert_eq!(code, 0);
    let items: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["content"], "Take out the trash");
    assert_eq!(items[1]["kind"], "note");
}

#[test]
fn test_reminder_rejects_empty_text() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["reminder", "add", "   "]);
    assert_eq!(code, 1);
}

#[test]
fn test_next_json() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["next", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed["next_fire_at"].is_string());
    assert!(parsed["minutes_until"].as_i64().unwrap() >= 0);
    assert_eq!(parsed["puzzles_required"], 3);
}

#[test]
fn test_puzzle_sample_is_reproducible_with_seed() {
    let home = tempfile::tempdir().unwrap();
    let args = ["puzzle", "sample", "--kind", "math", "--count", "2", "--seed", "42"];
    let (code, first, _) = run_cli(home.path(), &args);
    assert_eq!(code, 0);
    let (_, second, _) = run_cli(home.path(), &args);
    assert_eq!(first, second);
    assert_eq!(first.matches("answer:").count(), 2);
}

#[test]
fn test_dashboard_without_network() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["dashboard", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed["weather"].is_null());
    assert!(parsed["news"].is_null());
}

#[test]
fn test_status_without_runner_exits_2() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["status"]);
    assert_eq!(code, 2);
}

#[test]
fn test_run_debug_alarm_then_override() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["config", "set", "alarm.check_internet", "false"]);
    assert_eq!(code, 0);

    let (code, stdout) = run_cli_with_input(
        home.path(),
        &["run", "--debug-alarm", "--silent", "--json"],
        ":disable\n:quit\n",
    );
    assert_eq!(code, 0);

    let events: Vec<serde_json::Value> = stdout
        .lines()
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect();
    let types: Vec<&str> = events.iter().filter_map(|e| e["type"].as_str()).collect();
    assert!(types.contains(&"AlarmFired"));
    assert!(types.contains(&"PuzzlePresented"));
    let disabled = events.iter().find(|e| e["type"] == "AlarmDisabled").unwrap();
    assert_eq!(disabled["forced"], true);
}

#[test]
fn test_memory_sequence_is_revealed_before_answers_count() {
    let home = tempfile::tempdir().unwrap();
    for (key, value) in [
        ("alarm.check_internet", "false"),
        ("puzzles.kinds", r#"["memory"]"#),
        ("puzzles.memory_reveal_secs", "60"),
    ] {
        let (code, _, stderr) = run_cli(home.path(), &["config", "set", key, value]);
        assert_eq!(code, 0, "{key}: {stderr}");
    }

    let (code, stdout) = run_cli_with_input(
        home.path(),
        &["run", "--debug-alarm", "--silent"],
        "1234\n:disable\n:quit\n",
    );
    assert_eq!(code, 0);
    assert!(stdout.contains("Memorize:"));
    assert!(stdout.contains("Wait until the sequence is hidden."));
    assert!(!stdout.contains("Not quite"));
    assert!(stdout.contains("Alarm disabled by override."));
}

#[test]
fn test_config_sounds_lists_audio_files() {
    let home = tempfile::tempdir().unwrap();
    let sounds = home.path().join("alarms");
    std::fs::create_dir(&sounds).unwrap();
    for name in ["rooster.mp3", "birds.ogg", "readme.txt"] {
        std::fs::write(sounds.join(name), b"").unwrap();
    }
    let (code, _, _) = run_cli(
        home.path(),
        &["config", "set", "audio.sounds_dir", &sounds.to_string_lossy()],
    );
    assert_eq!(code, 0);

    let (code, stdout, _) = run_cli(home.path(), &["config", "sounds"]);
    assert_eq!(code, 0);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["  birds.ogg", "* rooster.mp3"]);
}
