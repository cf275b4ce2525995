//! Human-readable rendering of operation results.
//!
//! `standard` prints a tagged headline followed by the tool output;
//! `compact` prints the headline only.

use std::fmt;

use lft_protocol::ops::{CheckConfigResponse, DetectResponse, ExecutionStatus, RunResponse};
use serde::{Deserialize, Serialize};

/// Human output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Standard,
    Compact,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Compact => "compact",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Error,
}

impl Severity {
    fn tag(&self, format: OutputFormat) -> &'static str {
        match (format, self) {
            (OutputFormat::Standard, Self::Success) => "[SUCCESS]",
            (OutputFormat::Standard, Self::Warning) => "[WARNING]",
            (OutputFormat::Standard, Self::Error) => "[ERROR]",
            (OutputFormat::Compact, Self::Success) => "OK:",
            (OutputFormat::Compact, Self::Warning) => "WARN:",
            (OutputFormat::Compact, Self::Error) => "ERROR:",
        }
    }
}

/// One headline plus optional details.
pub fn message(
    format: OutputFormat,
    severity: Severity,
    tool: &str,
    text: &str,
    details: Option<&str>,
) -> String {
    match format {
        OutputFormat::Standard => {
            let mut out = format!("{} {}: {}", severity.tag(format), tool, text);
            if let Some(details) = details.filter(|d| !d.trim().is_empty()) {
                out.push_str("\n\n");
                out.push_str(details.trim_end());
            }
            out
        }
        OutputFormat::Compact => format!("{} {} - {}", severity.tag(format), tool, text),
    }
}

pub fn run(format: OutputFormat, response: &RunResponse) -> String {
    let (severity, text) = match response.status {
        ExecutionStatus::Success => (
            Severity::Success,
            format!("{} passed in {} ms", response.category, response.duration_ms),
        ),
        ExecutionStatus::NonZeroExit => (
            Severity::Warning,
            format!(
                "{} reported issues (exit code {})",
                response.category,
                response.exit_code.map_or_else(|| "?".to_string(), |c| c.to_string())
            ),
        ),
        ExecutionStatus::TimedOut => (
            Severity::Error,
            format!("timed out after {} ms", response.duration_ms),
        ),
        ExecutionStatus::ToolNotFound => (
            Severity::Error,
            format!(
                "'{}' is not installed or not on PATH",
                response.command.first().unwrap_or(&response.tool)
            ),
        ),
        ExecutionStatus::Cancelled => (Severity::Error, "cancelled".to_string()),
    };

    let details = [response.stdout.trim_end(), response.stderr.trim_end()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    message(format, severity, &response.tool, &text, Some(&details))
}

pub fn detect(format: OutputFormat, response: &DetectResponse) -> String {
    let summary = response
        .categories
        .iter()
        .map(|(category, report)| format!("{}={}", category, report.selected_tool))
        .collect::<Vec<_>>()
        .join(", ");
    let severity = if response.parse_failures.is_empty() {
        Severity::Success
    } else {
        Severity::Warning
    };
    let headline = format!("{} config files; {}", response.config_files.len(), summary);
    if format == OutputFormat::Compact {
        return message(format, severity, "detect", &headline, None);
    }

    let mut details = Vec::new();
    for (category, report) in &response.categories {
        details.push(format!("{}: {} ({})", category, report.selected_tool, report.reason));
        for (key, value) in &report.config {
            let source = report
                .provenance
                .get(key)
                .map(|p| p.source.as_str())
                .unwrap_or_default();
            details.push(format!("    {} = {}  [{}]", key, value, source));
        }
    }
    if !response.config_files.is_empty() {
        details.push(String::new());
        details.push("Config files:".to_string());
        for file in &response.config_files {
            details.push(format!("    {} ({}, {})", file.path, file.dialect, file.rank));
        }
    }
    if !response.dependencies.is_empty() {
        details.push(String::new());
        details.push(format!("Dependencies: {}", response.dependencies.join(", ")));
    }
    if !response.parse_failures.is_empty() {
        details.push(String::new());
        details.push("Parse failures:".to_string());
        for failure in &response.parse_failures {
            details.push(format!("    {}: {}", failure.file, failure.reason));
        }
    }
    message(format, severity, "detect", &headline, Some(&details.join("\n")))
}

pub fn check(format: OutputFormat, response: &CheckConfigResponse) -> String {
    let present: Vec<&str> = response.present().collect();
    let headline = format!("{} of {} known config files present", present.len(), response.files.len());
    let details = present
        .iter()
        .map(|p| format!("    {}", p))
        .collect::<Vec<_>>()
        .join("\n");
    message(format, Severity::Success, "check-config", &headline, Some(&details))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lft_protocol::ops::SelectionReason;
    use std::collections::BTreeMap;

    fn response(status: ExecutionStatus, exit_code: Option<i32>) -> RunResponse {
        RunResponse {
            category: "lint".to_string(),
            tool: "flake8".to_string(),
            reason: SelectionReason::ConfigPresent,
            status,
            exit_code,
            stdout: "app.py:1:1: F401 unused import\n".to_string(),
            stderr: String::new(),
            duration_ms: 42,
            work_dir: "/p".to_string(),
            command: vec!["flake8".to_string(), ".".to_string()],
            started_at: Utc::now(),
        }
    }

    #[test]
    fn test_standard_message() {
        assert_eq!(
            message(OutputFormat::Standard, Severity::Success, "black", "formatted", Some("1 file")),
            "[SUCCESS] black: formatted\n\n1 file"
        );
        assert_eq!(
            message(OutputFormat::Standard, Severity::Error, "black", "failed", Some("  \n")),
            "[ERROR] black: failed"
        );
    }

    #[test]
    fn test_compact_message_drops_details() {
        assert_eq!(
            message(OutputFormat::Compact, Severity::Warning, "ruff", "issues", Some("lots")),
            "WARN: ruff - issues"
        );
    }

    #[test]
    fn test_run_rendering() {
        let rendered = run(OutputFormat::Standard, &response(ExecutionStatus::NonZeroExit, Some(1)));
        assert_eq!(
            rendered,
            "[WARNING] flake8: lint reported issues (exit code 1)\n\napp.py:1:1: F401 unused import"
        );

        let rendered = run(OutputFormat::Compact, &response(ExecutionStatus::Success, Some(0)));
        assert_eq!(rendered, "OK: flake8 - lint passed in 42 ms");

        let rendered = run(OutputFormat::Compact, &response(ExecutionStatus::ToolNotFound, None));
        assert_eq!(rendered, "ERROR: flake8 - 'flake8' is not installed or not on PATH");
    }

    #[test]
    fn test_check_rendering() {
        let mut files = BTreeMap::new();
        files.insert("pyproject.toml".to_string(), true);
        files.insert("setup.cfg".to_string(), false);
        let response = CheckConfigResponse {
            work_dir: "/p".to_string(),
            files,
        };
        assert_eq!(
            check(OutputFormat::Standard, &response),
            "[SUCCESS] check-config: 1 of 2 known config files present\n\n    pyproject.toml"
        );
    }
}
