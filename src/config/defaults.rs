//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

use crate::locate::DEFAULT_MAX_DEPTH;
use crate::render::OutputFormat;
use crate::timeout::TimeoutConfig;

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Tool processes allowed to run at once (default: 4)
    pub max_concurrent_processes: usize,

    /// Wait between SIGTERM and SIGKILL (default: 2000)
    pub termination_grace_ms: u64,

    /// Locator walk depth (default: 3)
    pub max_depth: usize,

    pub timeouts: TimeoutConfig,

    /// Human output style (default: standard)
    pub output_format: OutputFormat,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            max_concurrent_processes: 4,
            termination_grace_ms: 2000,
            max_depth: DEFAULT_MAX_DEPTH,
            timeouts: TimeoutConfig::default(),
            output_format: OutputFormat::Standard,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "max_concurrent_processes": self.max_concurrent_processes,
            "tool_path": [],
            "termination_grace_ms": self.termination_grace_ms,
            "locate": {
                "max_depth": self.max_depth,
                "extra_excludes": []
            },
            "timeouts": {
                "lint_seconds": self.timeouts.lint_seconds,
                "format_seconds": self.timeouts.format_seconds,
                "test_seconds": self.timeouts.test_seconds
            },
            "preferred": {},
            "output_format": self.output_format.as_str()
        })
    }
}
