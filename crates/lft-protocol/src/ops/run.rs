//! lint / format / test operation types.
//!
//! All three operations share one request and one response shape; the
//! operation name picks the tool category.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::detect::SelectionReason;

/// Request payload for `lint`, `format` and `test`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunRequest {
    /// Project directory; the tool runs with this as its CWD.
    pub work_dir: String,
    /// File or directory to operate on, or `"all"`.
    #[serde(default)]
    pub target: Option<String>,
    /// Force a specific tool. `"auto"` or empty means detect.
    #[serde(default)]
    pub exact_tool: Option<String>,
    /// Settings overlaid on the detected configuration for this call only.
    #[serde(default)]
    pub tool_config: Option<serde_json::Map<String, serde_json::Value>>,
    /// Extra arguments appended verbatim to the command line.
    #[serde(default)]
    pub custom_args: Vec<String>,
    /// Overrides the configured timeout for this category.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// Outcome of a tool process.
///
/// Every variant is a successful call; the status says what the tool did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Exit code 0.
    Success,
    /// The tool ran and exited non-zero (findings, failed tests).
    NonZeroExit,
    /// The timeout elapsed and the process group was terminated.
    TimedOut,
    /// The program is not resolvable on PATH.
    ToolNotFound,
    /// The caller cancelled the run.
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NonZeroExit => "non_zero_exit",
            Self::TimedOut => "timed_out",
            Self::ToolNotFound => "tool_not_found",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response payload for `lint`, `format` and `test`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    /// Category the operation ran (`lint`, `format`, `test`).
    pub category: String,
    /// Tool that was run.
    pub tool: String,
    /// Why the tool was selected.
    pub reason: SelectionReason,
    /// Process outcome.
    pub status: ExecutionStatus,
    /// Exit code, absent when the process never ran or died by signal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Captured stdout, lossily decoded.
    pub stdout: String,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Directory the tool ran in.
    pub work_dir: String,
    /// Full argv, program first.
    pub command: Vec<String>,
    /// When the process was started.
    pub started_at: DateTime<Utc>,
}
