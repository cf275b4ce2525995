//! Per-category tool timeouts.
//!
//! Every timeout, whether configured or passed with a single call, must be
//! in (0, 86400] seconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::Category;

/// Upper bound for any timeout, in seconds.
pub const MAX_TIMEOUT_SECONDS: u64 = 86_400;

/// Per-category tool timeouts, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Linter timeout (default: 60)
    pub lint_seconds: u64,

    /// Formatter timeout (default: 30)
    pub format_seconds: u64,

    /// Test runner timeout (default: 300 = 5 min)
    pub test_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            lint_seconds: 60,
            format_seconds: 30,
            test_seconds: 300,
        }
    }
}

impl TimeoutConfig {
    pub fn validate(&self) -> Result<(), TimeoutValidationError> {
        for (field, value) in [
            ("lint_seconds", self.lint_seconds),
            ("format_seconds", self.format_seconds),
            ("test_seconds", self.test_seconds),
        ] {
            check(field, value)?;
        }
        Ok(())
    }

    pub fn seconds_for(&self, category: Category) -> u64 {
        match category {
            Category::Lint => self.lint_seconds,
            Category::Format => self.format_seconds,
            Category::Test => self.test_seconds,
        }
    }

    /// Timeout for one call: the requested value if any, else the
    /// category's configured value.
    pub fn resolve(
        &self,
        category: Category,
        requested: Option<u64>,
    ) -> Result<Duration, TimeoutValidationError> {
        let seconds = match requested {
            Some(value) => {
                check("timeout_seconds", value)?;
                value
            }
            None => self.seconds_for(category),
        };
        Ok(Duration::from_secs(seconds))
    }
}

fn check(field: &'static str, value: u64) -> Result<(), TimeoutValidationError> {
    if value == 0 || value > MAX_TIMEOUT_SECONDS {
        return Err(TimeoutValidationError::OutOfBounds { field, value });
    }
    Ok(())
}

/// A timeout outside (0, 86400] seconds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeoutValidationError {
    #[error("{field} must be in (0, 86400], got {value}")]
    OutOfBounds { field: &'static str, value: u64 },
}
