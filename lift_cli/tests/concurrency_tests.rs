//! Concurrency tests for the `lift` binary.
//!
//! Readers running alongside a writer must never see a half-written active
//! workout or history file.

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::TempDir;

fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("lift"));
    cmd.arg("--data-dir")
        .arg(data_dir)
        .env("XDG_CONFIG_HOME", data_dir.join("config"));
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_readers_during_workout() {
    let temp_dir = setup_test_dir();
    let data_dir: PathBuf = temp_dir.path().to_path_buf();
    cli(&data_dir).args(["start", "dia_1"]).assert().success();
    cli(&data_dir).args(["weight", "20"]).assert().success();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                for _ in 0..5 {
                    cli(&data_dir).arg("templates").assert().success();
                    cli(&data_dir).arg("history").assert().success();
                }
            })
        })
        .collect();

    for reps in [10, 9, 8] {
        cli(&data_dir).args(["log", &reps.to_string()]).assert().success();
        cli(&data_dir).arg("skip").assert().success();
    }

    for reader in readers {
        reader.join().expect("reader panicked");
    }

    let contents = std::fs::read_to_string(data_dir.join("active_workout.json"))
        .expect("Failed to read active workout");
    let state: serde_json::Value = serde_json::from_str(&contents).expect("Invalid JSON");
    assert_eq!(state["current_slot_index"], 1);
    assert_eq!(state["session_logs"]["d1_e1"].as_array().unwrap().len(), 3);
}

#[test]
fn test_parallel_workouts_in_separate_dirs() {
    let dirs: Vec<TempDir> = (0..3).map(|_| setup_test_dir()).collect();

    let workers: Vec<_> = dirs
        .iter()
        .map(|d| {
            let data_dir = d.path().to_path_buf();
            thread::spawn(move || {
                cli(&data_dir).args(["start", "dia_2"]).assert().success();
                cli(&data_dir).args(["weight", "50"]).assert().success();
                cli(&data_dir).args(["log", "12"]).assert().success();
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker panicked");
    }

    for d in &dirs {
        assert!(d.path().join("active_workout.json").exists());
        assert!(d.path().join("rest_notice.json").exists());
    }
}
