//! End-to-end tests that drive the `tour` binary.
//!
//! Every run gets its own HOME so a developer's config file never leaks in.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const FEED: &str = r#"{
    "appointments": [
        {"id": "a1", "userId": "ann", "startDate": "2025-01-15T09:00:00Z", "endDate": "2025-01-15T09:30:00Z"},
        {"id": "a2", "userId": "ann", "startDate": "2025-01-15T14:00:00Z", "endDate": "2025-01-15T15:00:00Z"}
    ],
    "teamEvents": [
        {"id": "t1", "teamId": "leasing", "startDate": "2025-01-15T16:00:00Z", "endDate": "2025-01-15T17:00:00Z"}
    ]
}"#;

fn tour(home: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_tour"));
    command
        .env("HOME", home)
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("TOUR_TIMEZONE")
        .env_remove("RUST_LOG");
    command
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "tour should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn write_feed(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("feed.json");
    std::fs::write(&path, FEED).unwrap();
    path
}

#[test]
fn round_floors_the_offset() {
    let temp = TempDir::new().unwrap();
    let output = tour(temp.path())
        .args(["round", "--offset", "37", "--slot", "15"])
        .output()
        .unwrap();
    assert_eq!(stdout(&output), "30\n");
}

#[test]
fn round_rejects_a_zero_slot() {
    let temp = TempDir::new().unwrap();
    let output = tour(temp.path())
        .args(["round", "--offset", "37", "--slot", "0"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid --slot"));
}

#[test]
fn evaluate_reports_an_agent_overlap() {
    let temp = TempDir::new().unwrap();
    let feed = write_feed(&temp);
    let output = tour(temp.path())
        .arg("evaluate")
        .arg("--feed")
        .arg(&feed)
        .args(["--agent", "ann", "--start", "2025-01-15T09:15:00Z"])
        .args(["--now", "2025-01-15T08:00:00Z", "--json"])
        .output()
        .unwrap();

    let decision: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(decision["hasOverlap"], true);
    assert_eq!(decision["overlappingEvents"][0]["id"], "a1");
    assert!(decision.get("agentSuggestion").is_none());
}

#[test]
fn evaluate_suggests_a_team_member() {
    let temp = TempDir::new().unwrap();
    let feed = write_feed(&temp);
    let output = tour(temp.path())
        .arg("evaluate")
        .arg("--feed")
        .arg(&feed)
        .args(["--team", "leasing", "--member", "ann", "--member", "bob"])
        .args(["--start", "2025-01-15 14:00", "--now", "2025-01-15T08:00:00Z"])
        .output()
        .unwrap();

    let text = stdout(&output);
    assert!(text.contains("Overlap: no"), "{text}");
    assert!(text.contains("Suggested agent: bob"), "{text}");
}

#[test]
fn evaluate_needs_a_target() {
    let temp = TempDir::new().unwrap();
    let feed = write_feed(&temp);
    let output = tour(temp.path())
        .arg("evaluate")
        .arg("--feed")
        .arg(&feed)
        .args(["--start", "2025-01-15T09:15:00Z"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn config_reads_environment_overrides() {
    let temp = TempDir::new().unwrap();
    let output = tour(temp.path())
        .env("TOUR_TIMEZONE", "America/New_York")
        .arg("config")
        .output()
        .unwrap();

    let config: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(config["timezone"], "America/New_York");
    assert_eq!(config["team_slot_minutes"], 60);
}

#[test]
fn config_file_sets_the_property_zone() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("tour.toml");
    std::fs::write(&config_path, "timezone = \"America/Chicago\"\n").unwrap();
    let feed = write_feed(&temp);

    // 08:15 in Chicago is 14:15 UTC, inside ann's second appointment.
    let output = tour(temp.path())
        .arg("--config")
        .arg(&config_path)
        .arg("evaluate")
        .arg("--feed")
        .arg(&feed)
        .args(["--agent", "ann", "--start", "2025-01-15 08:15"])
        .args(["--now", "2025-01-15T08:00:00Z", "--json"])
        .output()
        .unwrap();

    let decision: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(decision["hasOverlap"], true);
    assert_eq!(decision["overlappingEvents"][0]["id"], "a2");
    assert_eq!(decision["interval"]["timezone"], "America/Chicago");
}

#[test]
fn draft_session_submits_a_create_command() {
    let temp = TempDir::new().unwrap();
    let feed = write_feed(&temp);
    let script = temp.path().join("script.json");
    std::fs::write(
        &script,
        r#"[
            {"action": "selectSlot", "start": "2025-01-15T10:00:00Z"},
            {"action": "setPartyMembers", "ids": ["p1", "p2"]},
            {"action": "setTourType", "tourType": "virtualTour"},
            {"action": "submit"}
        ]"#,
    )
    .unwrap();

    let output = tour(temp.path())
        .arg("draft")
        .arg("--feed")
        .arg(&feed)
        .arg("--script")
        .arg(&script)
        .args(["--agent", "ann", "--now", "2025-01-15T08:00:00Z"])
        .output()
        .unwrap();

    let text = stdout(&output);
    assert!(text.starts_with("1. selectSlot -> slot selected\n"), "{text}");
    assert!(text.contains("4. submit -> submitted"), "{text}");
    assert!(text.contains("\"command\": \"create\""), "{text}");
    assert!(text.contains("\"agentId\": \"ann\""), "{text}");
}

#[test]
fn draft_with_missing_script_fails() {
    let temp = TempDir::new().unwrap();
    let feed = write_feed(&temp);
    let output = tour(temp.path())
        .arg("draft")
        .arg("--feed")
        .arg(&feed)
        .arg("--script")
        .arg(temp.path().join("missing.json"))
        .args(["--agent", "ann"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read draft script"));
}
