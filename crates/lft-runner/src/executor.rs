//! Tool process executor.
//!
//! One [`Executor`] is created per operation call. It owns the call's
//! cancellation flag and shares the process-wide [`ProcessSlots`].
//! Tool outcomes (non-zero exit, timeout, missing binary, cancellation)
//! are statuses inside an `Ok` result; only infrastructure problems are
//! returned as [`ExecutorError`].

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use lft_protocol::ops::ExecutionStatus;

use crate::slots::ProcessSlots;

/// Errors from executor operations.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("working directory unusable: {0}")]
    WorkDir(String),

    #[error("{program} failed to start: {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("output pipe unavailable for {0}")]
    PipeUnavailable(&'static str),
}

/// Result type for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Executor settings shared by every run.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Time between SIGTERM and SIGKILL.
    pub termination_grace: Duration,
    /// How often the child is polled for exit.
    pub poll_interval: Duration,
    /// Directories searched for programs; `PATH` when unset.
    pub search_path: Option<OsString>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            termination_grace: Duration::from_millis(2000),
            poll_interval: Duration::from_millis(50),
            search_path: None,
        }
    }
}

/// A fully built tool invocation.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Tool name reported in the result.
    pub tool: String,
    /// Program to resolve on PATH.
    pub program: String,
    /// Arguments after the program.
    pub args: Vec<String>,
    /// Current directory of the child.
    pub work_dir: PathBuf,
    /// Wall-clock limit.
    pub timeout: Duration,
}

impl ExecutionRequest {
    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }
}

/// Result of a tool run.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub tool: String,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub work_dir: PathBuf,
    pub command: Vec<String>,
    pub started_at: DateTime<Utc>,
}

/// How the wait loop ended.
enum Outcome {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
}

/// The tool executor.
pub struct Executor {
    config: ExecutorConfig,
    slots: ProcessSlots,
    /// Cancellation flag
    cancelled: Arc<AtomicBool>,
}

impl Executor {
    /// Create a new executor drawing from `slots`.
    pub fn new(config: ExecutorConfig, slots: ProcessSlots) -> Self {
        Self {
            config,
            slots,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use an externally owned cancellation flag.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Get a cancellation flag that can be shared.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Request cancellation.
    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Run one tool invocation to completion, timeout or cancellation.
    ///
    /// The timeout clock starts once a process slot is held; time spent
    /// queued behind other tools does not count against it.
    pub fn run(&self, request: &ExecutionRequest) -> ExecutorResult<ExecutionResult> {
        let started_at = Utc::now();
        let queued = Instant::now();

        if !request.work_dir.is_dir() {
            return Err(ExecutorError::WorkDir(format!(
                "{} is not a directory",
                request.work_dir.display()
            )));
        }

        let program = match self.resolve(&request.program, &request.work_dir) {
            Ok(path) => path,
            Err(e) => {
                info!(tool = %request.tool, program = %request.program, "tool not found on PATH");
                return Ok(self.finish(
                    request,
                    ExecutionStatus::ToolNotFound,
                    None,
                    String::new(),
                    format!("{}: {}", request.program, e),
                    started_at,
                    queued,
                ));
            }
        };

        let Some(_slot) = self.slots.acquire(&self.cancelled) else {
            return Ok(self.cancelled_result(request, started_at, queued));
        };
        if self.is_cancelled() {
            return Ok(self.cancelled_result(request, started_at, queued));
        }
        let started_at = Utc::now();
        let start = Instant::now();

        debug!(
            tool = %request.tool,
            program = %program.display(),
            args = ?request.args,
            work_dir = %request.work_dir.display(),
            "spawning tool"
        );

        let mut command = Command::new(&program);
        command
            .args(&request.args)
            .current_dir(&request.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(self.finish(
                    request,
                    ExecutionStatus::ToolNotFound,
                    None,
                    String::new(),
                    format!("{}: {}", request.program, e),
                    started_at,
                    start,
                ));
            }
            Err(e) => {
                return Err(ExecutorError::SpawnFailed {
                    program: request.program.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let group = self.slots.track_group(child.id());

        let stdout = child.stdout.take().ok_or(ExecutorError::PipeUnavailable("stdout"));
        let stderr = child.stderr.take().ok_or(ExecutorError::PipeUnavailable("stderr"));
        let (stdout, stderr) = match (stdout, stderr) {
            (Ok(out), Ok(err)) => (out, err),
            (Err(e), _) | (_, Err(e)) => {
                self.terminate_group(&mut child);
                return Err(e);
            }
        };
        let stdout_handle = spawn_reader(stdout);
        let stderr_handle = spawn_reader(stderr);

        let outcome = self.wait(&mut child, start, request.timeout);

        // Anything the tool left behind in its group goes too.
        reap_group(&mut child);
        drop(group);

        let stdout = collect(stdout_handle);
        let stderr = collect(stderr_handle);

        let (status, exit_code) = match outcome {
            Outcome::Exited(exit) => {
                let code = exit.code();
                let status = if exit.success() {
                    ExecutionStatus::Success
                } else {
                    ExecutionStatus::NonZeroExit
                };
                (status, code)
            }
            Outcome::TimedOut => {
                warn!(
                    tool = %request.tool,
                    timeout_secs = request.timeout.as_secs_f64(),
                    "tool timed out"
                );
                (ExecutionStatus::TimedOut, None)
            }
            Outcome::Cancelled => {
                info!(tool = %request.tool, "tool run cancelled");
                (ExecutionStatus::Cancelled, None)
            }
        };

        Ok(self.finish(request, status, exit_code, stdout, stderr, started_at, start))
    }

    fn resolve(&self, program: &str, work_dir: &Path) -> which::Result<PathBuf> {
        match &self.config.search_path {
            Some(paths) => which::which_in(program, Some(paths), work_dir),
            None => which::which(program),
        }
    }

    /// Poll the child until it exits, times out, or is cancelled.
    fn wait(&self, child: &mut Child, start: Instant, timeout: Duration) -> Outcome {
        loop {
            if self.is_cancelled() {
                self.terminate_group(child);
                return Outcome::Cancelled;
            }
            if start.elapsed() >= timeout {
                self.terminate_group(child);
                return Outcome::TimedOut;
            }
            match child.try_wait() {
                Ok(Some(status)) => return Outcome::Exited(status),
                Ok(None) => thread::sleep(self.config.poll_interval),
                Err(e) => {
                    warn!(error = %e, "try_wait failed, terminating tool");
                    self.terminate_group(child);
                    return Outcome::Cancelled;
                }
            }
        }
    }

    /// Terminate the child's process group gracefully then forcefully.
    fn terminate_group(&self, child: &mut Child) {
        signal_group(child, Termination::Graceful);

        let start = Instant::now();
        while start.elapsed() < self.config.termination_grace {
            match child.try_wait() {
                Ok(Some(_)) => {
                    signal_group(child, Termination::Forced);
                    return;
                }
                Ok(None) => thread::sleep(self.config.poll_interval),
                Err(_) => break,
            }
        }

        debug!(pid = child.id(), "grace period elapsed, killing process group");
        signal_group(child, Termination::Forced);
        let _ = child.kill();
        let _ = child.wait();
    }

    fn cancelled_result(
        &self,
        request: &ExecutionRequest,
        started_at: DateTime<Utc>,
        start: Instant,
    ) -> ExecutionResult {
        self.finish(
            request,
            ExecutionStatus::Cancelled,
            None,
            String::new(),
            String::new(),
            started_at,
            start,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        request: &ExecutionRequest,
        status: ExecutionStatus,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        started_at: DateTime<Utc>,
        start: Instant,
    ) -> ExecutionResult {
        ExecutionResult {
            tool: request.tool.clone(),
            status,
            exit_code,
            stdout,
            stderr,
            duration_ms: start.elapsed().as_millis() as u64,
            work_dir: request.work_dir.clone(),
            command: request.argv(),
            started_at,
        }
    }
}

#[derive(Clone, Copy)]
enum Termination {
    Graceful,
    Forced,
}

/// Signal every process in the child's group.
#[cfg(unix)]
fn signal_group(child: &mut Child, how: Termination) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let signal = match how {
        Termination::Graceful => Signal::SIGTERM,
        Termination::Forced => Signal::SIGKILL,
    };
    // ESRCH just means the group is already gone.
    let _ = killpg(Pid::from_raw(child.id() as i32), signal);
}

#[cfg(not(unix))]
fn signal_group(child: &mut Child, _how: Termination) {
    let _ = child.kill();
}

#[cfg(unix)]
fn reap_group(child: &mut Child) {
    signal_group(child, Termination::Forced);
}

#[cfg(not(unix))]
fn reap_group(_child: &mut Child) {}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: JoinHandle<Vec<u8>>) -> String {
    let bytes = handle.join().unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}
