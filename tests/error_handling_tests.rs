use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn setup_test_env() -> (TempDir, std::sync::MutexGuard<'static, ()>) {
    let guard = test_env::lock_test_env();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let config_dir = temp_dir.path().join(".stagetrack");
    fs::create_dir_all(&config_dir).unwrap();
    let config_file = config_dir.join("rc");
    fs::write(&config_file, format!("data.location={}\n", db_path.display())).unwrap();
    std::env::set_var("HOME", temp_dir.path().to_str().unwrap());
    (temp_dir, guard)
}

fn get_cmd(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stagetrack").unwrap();
    cmd.env("HOME", temp_dir.path());
    cmd
}

#[test]
fn test_empty_task_title_rejected() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir)
        .args(&["task", "add", "contact", "   "])
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("Task title cannot be empty"));

    drop(temp_dir);
}

#[test]
fn test_empty_stage_name_rejected() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir)
        .args(&["stage", "add", "  "])
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("Stage name cannot be empty"));

    drop(temp_dir);
}

#[test]
fn test_task_add_to_unknown_stage_fails() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir)
        .args(&["task", "add", "ghost", "Call"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("No stage found"));

    drop(temp_dir);
}

#[test]
fn test_invalid_task_id_rejected() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir)
        .args(&["task", "toggle", "abc"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("Invalid task ID"));

    get_cmd(&temp_dir)
        .args(&["task", "toggle", "0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("must be positive"));

    drop(temp_dir);
}

#[test]
fn test_missing_task_fails() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir)
        .args(&["task", "toggle", "999"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("No task found"));

    drop(temp_dir);
}

#[test]
fn test_rename_unknown_stage_fails() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir)
        .args(&["stage", "rename", "ghost", "New name"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("Stage 'ghost' not found"));

    drop(temp_dir);
}

#[test]
fn test_unknown_subcommand_shows_usage() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir)
        .args(&["frobnicate"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("Usage"));

    drop(temp_dir);
}
