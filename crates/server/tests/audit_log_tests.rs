//! Audit Log Integration Tests
//!
//! Tests cover:
//! - Concurrent appends produce whole, parseable lines
//! - The data directory is created on first write
//! - An unwritable location never surfaces an error

use obras_server::{AppliedFilters, AuditEntry, AuditLog, AuthResult};
use serde_json::Value;
use std::collections::HashSet;
use tempfile::TempDir;

fn entry(request_id: String, count: usize) -> AuditEntry {
    AuditEntry {
        request_id,
        auth: AuthResult::Firebase {
            uid: "uid-ana".to_string(),
            email: None,
        },
        action: "export",
        format: "csv",
        filters: AppliedFilters {
            project: "Metro de Bogotá".to_string(),
            incident_type: "all".to_string(),
            from: None,
            to: None,
        },
        count,
    }
}

fn lines(log: &AuditLog) -> Vec<Value> {
    std::fs::read_to_string(log.path())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

/// Test: two simultaneous exports yield two complete lines
#[tokio::test]
async fn test_two_concurrent_appends() {
    let dir = TempDir::new().unwrap();
    let log = AuditLog::new(dir.path());

    let first = entry("req-a".to_string(), 1);
    let second = entry("req-b".to_string(), 2);
    tokio::join!(log.append(&first), log.append(&second));

    let written = lines(&log);
    assert_eq!(written.len(), 2);
    let ids: HashSet<&str> = written
        .iter()
        .map(|l| l["request_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, HashSet::from(["req-a", "req-b"]));
}

/// Test: many spawned appends never interleave
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_parallel_appends() {
    let dir = TempDir::new().unwrap();
    let log = AuditLog::new(dir.path());

    let tasks: Vec<_> = (0..64)
        .map(|i| {
            let log = log.clone();
            tokio::spawn(async move { log.append(&entry(format!("req-{}", i), i)).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let written = lines(&log);
    assert_eq!(written.len(), 64);
    for line in &written {
        assert_eq!(line["auth"]["method"], "firebase");
        assert_eq!(line["filters"]["project"], "Metro de Bogotá");
        assert!(line["filters"].get("from").is_none());
    }
}

/// Test: missing parent directories are created
#[tokio::test]
async fn test_creates_data_dir() {
    let dir = TempDir::new().unwrap();
    let log = AuditLog::new(dir.path().join("nested").join("data"));

    log.append(&entry("req-1".to_string(), 0)).await;

    assert_eq!(lines(&log).len(), 1);
}

/// Test: failures are swallowed
#[tokio::test]
async fn test_unwritable_location_is_ignored() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file in the way").unwrap();

    let log = AuditLog::new(&blocker);
    log.append(&entry("req-1".to_string(), 0)).await;

    assert!(!log.path().exists());
}
