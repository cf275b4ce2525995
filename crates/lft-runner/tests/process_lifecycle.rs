//! Timeout, cancellation and concurrency behaviour against real processes.

#![cfg(unix)]

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use lft_runner::{ExecutionRequest, ExecutionStatus, Executor, ExecutorConfig, ProcessSlots};

fn fast_config() -> ExecutorConfig {
    ExecutorConfig {
        termination_grace: Duration::from_millis(300),
        poll_interval: Duration::from_millis(20),
        ..ExecutorConfig::default()
    }
}

fn sh(script: &str, dir: &Path, timeout: Duration) -> ExecutionRequest {
    ExecutionRequest {
        tool: "sh".to_string(),
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        work_dir: dir.to_path_buf(),
        timeout,
    }
}

fn pid_alive(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid), None).is_ok()
}

fn read_pid(path: &Path) -> i32 {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(text) = std::fs::read_to_string(path) {
            if let Ok(pid) = text.trim().parse() {
                return pid;
            }
        }
        assert!(Instant::now() < deadline, "pid file never written");
        thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn never_terminating_process_times_out_and_is_gone() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("child.pid");
    // The background sleep shares the process group and must be reaped too.
    let script = format!(
        "sleep 600 & echo $! > {}; wait",
        pid_file.display()
    );
    let executor = Executor::new(fast_config(), ProcessSlots::new(1));

    let start = Instant::now();
    let result = executor
        .run(&sh(&script, dir.path(), Duration::from_millis(500)))
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(result.status, ExecutionStatus::TimedOut);
    assert!(result.exit_code.is_none());
    assert!(elapsed < Duration::from_secs(5), "took {:?}", elapsed);

    let pid = read_pid(&pid_file);
    let deadline = Instant::now() + Duration::from_secs(2);
    while pid_alive(pid) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    assert!(!pid_alive(pid), "background process {} survived", pid);
}

#[test]
fn sigterm_ignoring_process_is_killed_after_grace() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::new(fast_config(), ProcessSlots::new(1));

    let start = Instant::now();
    let result = executor
        .run(&sh(
            "trap '' TERM; while true; do sleep 0.05; done",
            dir.path(),
            Duration::from_millis(300),
        ))
        .unwrap();

    assert_eq!(result.status, ExecutionStatus::TimedOut);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn cancellation_from_another_thread_terminates_run() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::new(fast_config(), ProcessSlots::new(1));
    let flag = executor.cancellation_flag();

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
    });

    let start = Instant::now();
    let result = executor
        .run(&sh("sleep 600", dir.path(), Duration::from_secs(60)))
        .unwrap();
    canceller.join().unwrap();

    assert_eq!(result.status, ExecutionStatus::Cancelled);
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn slot_limit_serializes_runs() {
    let dir = tempfile::tempdir().unwrap();
    let slots = ProcessSlots::new(1);
    let path = Arc::new(dir.path().to_path_buf());

    let start = Instant::now();
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let slots = slots.clone();
            let path = Arc::clone(&path);
            thread::spawn(move || {
                let executor = Executor::new(fast_config(), slots);
                executor
                    .run(&sh("sleep 0.3", &path, Duration::from_secs(10)))
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        let result = handle.join().unwrap();
        assert_eq!(result.status, ExecutionStatus::Success);
    }
    assert!(start.elapsed() >= Duration::from_millis(550));
    assert_eq!(slots.in_use(), 0);
}

#[test]
fn queued_time_does_not_count_against_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let slots = ProcessSlots::new(1);
    let held = slots.try_acquire().unwrap();

    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(600));
        drop(held);
    });

    let executor = Executor::new(fast_config(), slots);
    let result = executor
        .run(&sh("exit 0", dir.path(), Duration::from_millis(300)))
        .unwrap();
    releaser.join().unwrap();

    assert_eq!(result.status, ExecutionStatus::Success);
    assert!(result.duration_ms < 300, "queue time counted: {} ms", result.duration_ms);
}

#[test]
fn running_group_can_be_killed_during_grace() {
    let dir = tempfile::tempdir().unwrap();
    let slots = ProcessSlots::new(1);
    let config = ExecutorConfig {
        termination_grace: Duration::from_secs(30),
        ..fast_config()
    };
    let executor = Executor::new(config, slots.clone());

    let killer = thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(5);
        while slots.running_groups().is_empty() {
            assert!(Instant::now() < deadline, "tool never started");
            thread::sleep(Duration::from_millis(20));
        }
        // Past the timeout, inside the grace period.
        thread::sleep(Duration::from_millis(600));
        slots.kill_groups()
    });

    let start = Instant::now();
    let result = executor
        .run(&sh(
            "trap '' TERM; while true; do sleep 0.05; done",
            dir.path(),
            Duration::from_millis(200),
        ))
        .unwrap();

    assert_eq!(killer.join().unwrap(), 1);
    assert_eq!(result.status, ExecutionStatus::TimedOut);
    assert!(start.elapsed() < Duration::from_secs(10), "took {:?}", start.elapsed());
}
