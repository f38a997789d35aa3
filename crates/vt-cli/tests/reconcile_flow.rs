//! End-to-end integration tests for the presence tracking flow.
//!
//! Tests the full pipeline: ingest → reconcile → intervals/report queries,
//! driving the actual binary against a temp database.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn vt_binary() -> String {
    env!("CARGO_BIN_EXE_vt").to_string()
}

fn ingest(db: &Path, args: &[&str]) -> Output {
    let output = Command::new(vt_binary())
        .env("VT_DATABASE_PATH", db)
        .arg("ingest")
        .args(args)
        .output()
        .expect("failed to run vt ingest");
    assert!(
        output.status.success(),
        "vt ingest should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn query(db: &Path, args: &[&str]) -> String {
    let output = Command::new(vt_binary())
        .env("VT_DATABASE_PATH", db)
        .args(args)
        .output()
        .expect("failed to run vt");
    assert!(
        output.status.success(),
        "vt {args:?} should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn full_episode_flow() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("vt.db");

    // A enters at T0: start announced
    let output = ingest(
        &db,
        &[
            "--participant", "1", "--name", "alice",
            "--to", "general", "--at", "2025-01-01T10:00:00Z",
        ],
    );
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Call started in #general by alice"), "{stdout}");

    // B enters at T1
    ingest(
        &db,
        &[
            "--participant", "2", "--name", "bob",
            "--to", "general", "--at", "2025-01-01T10:05:00Z",
        ],
    );

    // A exits at T2: episode still open, no "ended"
    let output = ingest(
        &db,
        &["--participant", "1", "--from", "general", "--at", "2025-01-01T10:30:00Z"],
    );
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains("Call ended"), "{stdout}");

    // B exits at T3: episode closes with duration T3-T0
    let output = ingest(
        &db,
        &["--participant", "2", "--from", "general", "--at", "2025-01-01T12:30:00Z"],
    );
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Call ended in #general after 02:30:00"), "{stdout}");

    // The read model has exactly one interval {T0, T3}
    let intervals = query(&db, &["intervals", "--channel", "general", "--json"]);
    let parsed: Vec<serde_json::Value> = serde_json::from_str(&intervals).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0]["start"], "2025-01-01T10:00:00Z");
    assert_eq!(parsed[0]["end"], "2025-01-01T12:30:00Z");

    // 2.5h on Jan 1 is ~0.104 of a day
    let report = query(&db, &["report", "--json"]);
    let parsed: Vec<serde_json::Value> = serde_json::from_str(&report).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0]["date"], "2025-01-01");
    let load = parsed[0]["load"].as_f64().unwrap();
    assert!((load - 2.5 / 24.0).abs() < 1e-9);
}

#[test]
fn duplicate_delivery_is_filtered() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("vt.db");

    ingest(
        &db,
        &["--participant", "1", "--to", "general", "--at", "2025-01-01T10:00:00Z"],
    );
    ingest(
        &db,
        &["--participant", "1", "--from", "general", "--at", "2025-01-01T11:00:00Z"],
    );
    // Upstream redelivers the exit
    ingest(
        &db,
        &["--participant", "1", "--from", "general", "--at", "2025-01-01T11:00:05Z"],
    );

    let events = query(&db, &["events"]);
    assert_eq!(events.lines().count(), 2, "redelivered exit must not commit");

    let intervals = query(&db, &["intervals", "--json"]);
    let parsed: Vec<serde_json::Value> = serde_json::from_str(&intervals).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0]["end"], "2025-01-01T11:00:00Z");
}

#[test]
fn status_shows_open_channel() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("vt.db");

    ingest(
        &db,
        &["--participant", "1", "--to", "general", "--at", "2025-01-01T10:00:00Z"],
    );

    let status = query(&db, &["status"]);
    assert!(status.contains("Events: 1"), "{status}");
    assert!(status.contains("- general"), "{status}");
}
