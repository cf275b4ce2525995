//! Running tools through the orchestrator against real processes.
//!
//! The tools are shell stubs placed on the server's `tool_path`.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use lft::config::ServerConfig;
use lft::{Category, Orchestrator};
use lft_protocol::ops::{ExecutionStatus, RunRequest, SelectionReason};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const STUBS: &[(&str, &str)] = &[
    ("pylint", "echo \"pylint $*\""),
    ("pytest", "exit 1"),
    ("black", "cat \"$@\""),
    ("flake8", "sleep 30"),
];

fn stub_bin() -> TempDir {
    let bin = TempDir::new().unwrap();
    for (name, body) in STUBS {
        let path = bin.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
    bin
}

fn ruff_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("pyproject.toml"),
        "[tool.ruff]\nline-length = 100\n\n[tool.pylint.format]\nmax-line-length = 120\n",
    )
    .unwrap();
    dir
}

fn request(dir: &TempDir, tool: &str) -> RunRequest {
    RunRequest {
        work_dir: dir.path().display().to_string(),
        exact_tool: Some(tool.to_string()),
        ..RunRequest::default()
    }
}

fn orchestrator(bin: &TempDir) -> Orchestrator {
    Orchestrator::new(ServerConfig {
        tool_path: vec![bin.path().to_path_buf()],
        ..ServerConfig::default()
    })
    .unwrap()
}

#[test]
fn exact_tool_overrides_detection() {
    let bin = stub_bin();
    let dir = ruff_project();
    let response = orchestrator(&bin)
        .lint(&request(&dir, "pylint"), Arc::new(AtomicBool::new(false)))
        .unwrap();

    assert_eq!(response.tool, "pylint");
    assert_eq!(response.reason, SelectionReason::ExplicitOverride);
    assert_eq!(response.status, ExecutionStatus::Success);
    assert_eq!(response.exit_code, Some(0));
    assert_eq!(response.category, "lint");
    assert_eq!(
        response.command,
        vec!["pylint", "--recursive=y", "--max-line-length", "120", "."]
    );
    assert_eq!(response.stdout, "pylint --recursive=y --max-line-length 120 .\n");
}

#[test]
fn unlisted_program_is_rejected() {
    let bin = stub_bin();
    let dir = ruff_project();
    let mut run = request(&dir, "sh");
    run.target = Some("-c".to_string());
    run.custom_args = vec!["touch created".to_string()];

    let err = orchestrator(&bin)
        .lint(&run, Arc::new(AtomicBool::new(false)))
        .unwrap_err();

    assert!(err.to_string().contains("invalid request"), "{}", err);
    assert!(!dir.path().join("created").exists());
}

#[test]
fn non_zero_exit_is_a_status() {
    let bin = stub_bin();
    let dir = ruff_project();
    let response = orchestrator(&bin)
        .test(&request(&dir, "pytest"), Arc::new(AtomicBool::new(false)))
        .unwrap();

    assert_eq!(response.status, ExecutionStatus::NonZeroExit);
    assert_eq!(response.exit_code, Some(1));
}

#[test]
fn tool_runs_in_work_dir() {
    let bin = stub_bin();
    let dir = ruff_project();
    fs::write(dir.path().join("marker.txt"), "here\n").unwrap();
    let mut run = request(&dir, "black");
    run.target = Some("marker.txt".to_string());

    let response = orchestrator(&bin)
        .format(&run, Arc::new(AtomicBool::new(false)))
        .unwrap();
    assert_eq!(response.status, ExecutionStatus::Success);
    assert_eq!(response.stdout, "here\n");
}

#[test]
fn timeout_terminates_tool() {
    let bin = stub_bin();
    let dir = ruff_project();
    let mut run = request(&dir, "flake8");
    run.timeout_seconds = Some(1);

    let start = Instant::now();
    let response = orchestrator(&bin)
        .lint(&run, Arc::new(AtomicBool::new(false)))
        .unwrap();

    assert_eq!(response.status, ExecutionStatus::TimedOut);
    assert!(start.elapsed() < Duration::from_secs(15));
    assert_eq!(response.command, vec!["flake8", "."]);
}

#[test]
fn cancellation_stops_tool() {
    let bin = stub_bin();
    let dir = ruff_project();
    let run = request(&dir, "flake8");

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        flag.store(true, Ordering::SeqCst);
    });

    let start = Instant::now();
    let response = orchestrator(&bin).run(Category::Lint, &run, cancel).unwrap();
    canceller.join().unwrap();

    assert_eq!(response.status, ExecutionStatus::Cancelled);
    assert!(start.elapsed() < Duration::from_secs(15));
}

#[test]
fn out_of_range_timeout_is_rejected() {
    let bin = stub_bin();
    let dir = ruff_project();
    let mut run = request(&dir, "pylint");
    run.timeout_seconds = Some(0);

    let err = orchestrator(&bin)
        .lint(&run, Arc::new(AtomicBool::new(false)))
        .unwrap_err();
    assert!(err.to_string().contains("invalid request"), "{}", err);
}

#[test]
fn missing_workspace_is_an_error() {
    let bin = stub_bin();
    let dir = TempDir::new().unwrap();
    let mut run = request(&dir, "pylint");
    run.work_dir = dir.path().join("gone").display().to_string();

    let err = orchestrator(&bin)
        .lint(&run, Arc::new(AtomicBool::new(false)))
        .unwrap_err();
    assert!(err.to_string().contains("invalid workspace"), "{}", err);
}
