//! Integration tests for the lift binary.
//!
//! These tests verify end-to-end behavior including:
//! - Session start, logging and finishing
//! - Personal record detection and rest timer output
//! - Superset linking and reordering
//! - Data persistence between invocations

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the path to the CLI binary
fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("lift"))
}

/// Run `lift` against a data directory and expect success
fn lift(data_dir: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    cli()
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .assert()
        .success()
}

fn read_store(data_dir: &Path) -> Value {
    let content = fs::read_to_string(data_dir.join("store.json")).expect("Failed to read store");
    serde_json::from_str(&content).expect("Store is not valid JSON")
}

fn table_len(store: &Value, table: &str) -> usize {
    store[table].as_object().map(|t| t.len()).unwrap_or(0)
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Strength workout session logger"));
}

#[test]
fn test_exercises_lists_seeded_catalog() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    lift(data_dir, &["exercises"])
        .stdout(predicate::str::contains("bench_press"))
        .stdout(predicate::str::contains("treadmill_run"));

    assert!(table_len(&read_store(data_dir), "definitions") > 0);
}

#[test]
fn test_first_lift_reports_pr_and_rest() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    lift(data_dir, &["start"]).stdout(predicate::str::contains("Session started"));
    lift(data_dir, &["add", "bench_press"]).stdout(predicate::str::contains("1. Bench Press"));
    lift(data_dir, &["set", "edit", "1", "1", "--weight", "135", "--reps", "5"])
        .stdout(predicate::str::contains("135 x 5"));

    lift(data_dir, &["set", "done", "1", "1"])
        .stdout(predicate::str::contains(
            "New PR on Bench Press: weight, e1RM, volume",
        ))
        .stdout(predicate::str::contains("Rest 2:00 (Bench Press)"));
}

#[test]
fn test_lighter_session_is_not_pr() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    lift(data_dir, &["start"]);
    lift(data_dir, &["add", "bench_press"]);
    lift(data_dir, &["set", "edit", "1", "1", "--weight", "135", "--reps", "5"]);
    lift(data_dir, &["set", "done", "1", "1"]);
    lift(data_dir, &["finish"]);

    lift(data_dir, &["start"]);
    // Prefilled from last time
    lift(data_dir, &["add", "bench_press"]).stdout(predicate::str::contains("135 x 5"));
    lift(data_dir, &["set", "edit", "1", "1", "--weight", "95"]);
    lift(data_dir, &["set", "done", "1", "1"])
        .stdout(predicate::str::contains("New PR").not());
}

#[test]
fn test_finish_prunes_unfinished_work() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    lift(data_dir, &["start"]);
    lift(data_dir, &["add", "bench_press"]);
    lift(data_dir, &["add", "barbell_row"]);
    lift(data_dir, &["set", "add", "1"]);
    lift(data_dir, &["set", "done", "1", "2"]);

    lift(data_dir, &["finish"])
        .stdout(predicate::str::contains("Session finished"))
        .stdout(predicate::str::contains("Exercises: 1"))
        .stdout(predicate::str::contains("Completed sets: 1"));

    let store = read_store(data_dir);
    assert_eq!(table_len(&store, "sessions"), 1);
    assert_eq!(table_len(&store, "exercises"), 1);
    assert_eq!(table_len(&store, "sets"), 1);

    let set = store["sets"].as_object().unwrap().values().next().unwrap();
    assert_eq!(set["order"], 0);
    assert_eq!(set["is_completed"], true);
}

#[test]
fn test_empty_finish_keeps_session() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    lift(data_dir, &["start"]);
    lift(data_dir, &["add", "deadlift"]);
    lift(data_dir, &["finish"]).stdout(predicate::str::contains("Exercises: 0"));

    let store = read_store(data_dir);
    assert_eq!(table_len(&store, "sessions"), 1);
    assert_eq!(table_len(&store, "exercises"), 0);
    let session = store["sessions"].as_object().unwrap().values().next().unwrap();
    assert!(!session["ended_at"].is_null());
}

#[test]
fn test_second_start_is_rejected() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    lift(data_dir, &["start"]);
    cli()
        .arg("--data-dir")
        .arg(data_dir)
        .arg("start")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already active"));
}

#[test]
fn test_commands_need_active_session() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli()
        .arg("--data-dir")
        .arg(data_dir)
        .args(["add", "bench_press"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No active session"));
}

#[test]
fn test_superset_link_and_move() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    lift(data_dir, &["start"]);
    lift(data_dir, &["add", "bench_press"]);
    lift(data_dir, &["add", "barbell_row"]);
    lift(data_dir, &["add", "lateral_raise"]);

    lift(data_dir, &["link", "2", "3"]).stdout(predicate::str::contains("[group 2] superset"));
    lift(data_dir, &["move", "2", "1"])
        .stdout(predicate::str::contains("[group 1] superset"))
        .stdout(predicate::str::contains("1. Barbell Row"))
        .stdout(predicate::str::contains("3. Bench Press"));

    // Completing the first member of the superset does not start rest
    lift(data_dir, &["set", "done", "1", "1"]).stdout(predicate::str::contains("Rest").not());
    lift(data_dir, &["set", "done", "2", "1"])
        .stdout(predicate::str::contains("Rest 2:00 (Barbell Row + Lateral Raise)"));

    lift(data_dir, &["unlink", "1"]).stdout(predicate::str::contains("superset").not());
}

#[test]
fn test_warmup_toggle_and_rpe() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    lift(data_dir, &["start"]);
    lift(data_dir, &["add", "back_squat"]);
    lift(data_dir, &["set", "rpe", "1", "1", "8.5"]).stdout(predicate::str::contains("@8.5"));
    lift(data_dir, &["set", "kind", "1", "1"])
        .stdout(predicate::str::contains("(warm-up)"))
        .stdout(predicate::str::contains("@8.5").not());

    cli()
        .arg("--data-dir")
        .arg(data_dir)
        .args(["set", "rpe", "1", "1", "7"])
        .assert()
        .failure();
}

#[test]
fn test_remove_and_delete_keep_numbering_dense() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    lift(data_dir, &["start"]);
    lift(data_dir, &["add", "bench_press"]);
    lift(data_dir, &["add", "barbell_row"]);
    lift(data_dir, &["add", "deadlift"]);
    lift(data_dir, &["remove", "2"]).stdout(predicate::str::contains("2. Deadlift"));

    lift(data_dir, &["set", "add", "1"]);
    lift(data_dir, &["set", "edit", "1", "2", "--weight", "100"]);
    lift(data_dir, &["set", "delete", "1", "1"]).stdout(predicate::str::contains("1. 100 x 0"));
}

#[test]
fn test_discard_removes_everything() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    lift(data_dir, &["start"]);
    lift(data_dir, &["add", "bench_press"]);
    lift(data_dir, &["discard"]).stdout(predicate::str::contains("Session discarded"));

    let store = read_store(data_dir);
    assert_eq!(table_len(&store, "sessions"), 0);
    assert_eq!(table_len(&store, "exercises"), 0);
    assert_eq!(table_len(&store, "sets"), 0);
}

#[test]
fn test_records_and_backfill() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    lift(data_dir, &["start"]);
    lift(data_dir, &["add", "deadlift"]);
    lift(data_dir, &["set", "edit", "1", "1", "--weight", "315", "--reps", "3"]);
    lift(data_dir, &["set", "done", "1", "1"]);
    lift(data_dir, &["finish"]);

    lift(data_dir, &["records", "deadlift"])
        .stdout(predicate::str::contains("Deadlift"))
        .stdout(predicate::str::contains("Best weight: 315"))
        .stdout(predicate::str::contains("Best volume: 945"));

    lift(data_dir, &["backfill"]).stdout(predicate::str::contains("1 sets hold a record"));
}

#[test]
fn test_start_from_template() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let template = data_dir.join("push.toml");
    fs::write(
        &template,
        r#"
name = "Push"

[[exercises]]
exercise_id = "bench_press"
order = 0
set_count = 2
warmup_set_count = 1
default_weight = 185.0
default_reps = 5

[[exercises]]
exercise_id = "not_a_real_exercise"
order = 1
"#,
    )
    .unwrap();

    lift(data_dir, &["start", "--template", template.to_str().unwrap()])
        .stdout(predicate::str::contains("1. 93 x 5 (warm-up)"))
        .stdout(predicate::str::contains("3. 185 x 5"));

    // Unknown exercises are skipped
    assert_eq!(table_len(&read_store(data_dir), "exercises"), 1);
}

#[test]
fn test_rest_time_and_import() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let csv = data_dir.join("custom.csv");
    fs::write(
        &csv,
        "id,name,muscle_group,is_cardio,default_rest_seconds\n\
         cable_fly,Cable Fly,chest,false,45\n",
    )
    .unwrap();

    lift(data_dir, &["import-exercises", csv.to_str().unwrap()])
        .stdout(predicate::str::contains("Imported 1 exercises"));
    lift(data_dir, &["exercises"]).stdout(predicate::str::contains("45s rest"));

    lift(data_dir, &["rest-time", "cable_fly", "0"])
        .stdout(predicate::str::contains("disabled"));
    lift(data_dir, &["exercises"]).stdout(predicate::str::contains("45s rest").not());
}

#[test]
fn test_rest_command_runs_to_idle() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    lift(data_dir, &["rest", "1"]).stdout(predicate::str::contains("Rest complete!"));
}
