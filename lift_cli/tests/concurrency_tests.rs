//! Concurrency tests for the lift binary.
//!
//! These tests verify that multiple processes can safely:
//! - Read the store while another process saves it (file locking)
//! - Log several sessions back to back without losing any

use assert_cmd::Command;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("lift"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn run(data_dir: &std::path::Path, args: &[&str]) {
    cli()
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .assert()
        .success();
}

#[test]
fn test_sequential_sessions_all_kept() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    for i in 0..3 {
        thread::sleep(Duration::from_millis(i * 5));
        run(&data_dir, &["start"]);
        run(&data_dir, &["add", "pull_up"]);
        run(&data_dir, &["set", "done", "1", "1"]);
        run(&data_dir, &["finish"]);
    }

    let content = std::fs::read_to_string(data_dir.join("store.json")).unwrap();
    let store: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(store["sessions"].as_object().unwrap().len(), 3);
    assert_eq!(store["sets"].as_object().unwrap().len(), 3);
}

#[test]
fn test_concurrent_reads_during_writes() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    run(&data_dir, &["start"]);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                for _ in 0..3 {
                    run(&data_dir, &["show"]);
                }
            })
        })
        .collect();

    for _ in 0..3 {
        run(&data_dir, &["add", "plank"]);
    }

    for reader in readers {
        reader.join().expect("Reader thread panicked");
    }

    // Readers never observe or leave a half-written store
    let content = std::fs::read_to_string(data_dir.join("store.json")).unwrap();
    let store: serde_json::Value =
        serde_json::from_str(&content).expect("Store should be valid JSON");
    assert!(!store["sessions"].as_object().unwrap().is_empty());
}
