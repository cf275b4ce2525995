//! Directory exclusion rules for the locator walk.
//!
//! Virtual environments, VCS metadata and build caches are pruned before
//! descending. Patterns are globs matched against both the directory name
//! and its root-relative path.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Directories never descended into.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "venv",
    ".venv",
    "v",
    "env",
    ".env",
    "site-packages",
    "__pycache__",
    "node_modules",
    "build",
    "dist",
    ".tox",
    ".nox",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    "*.egg-info",
];

/// A configured exclude pattern that is not a valid glob.
#[derive(Debug, thiserror::Error)]
pub enum ExcludeError {
    #[error("invalid exclude pattern: {0}")]
    GlobError(#[from] globset::Error),
}

/// Compiled directory exclusions.
#[derive(Debug, Clone)]
pub struct ExcludeRules {
    glob_set: GlobSet,
}

impl ExcludeRules {
    /// Only the built-in directory list.
    pub fn new() -> Result<Self, ExcludeError> {
        Self::with_patterns::<&str>(&[])
    }

    /// Defaults plus additional patterns
    pub fn with_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ExcludeError> {
        let mut builder = GlobSetBuilder::new();

        for pattern in DEFAULT_EXCLUDES {
            builder.add(Glob::new(pattern)?);
        }

        for pattern in patterns {
            let pattern = pattern.as_ref().trim().trim_end_matches('/');
            if !pattern.is_empty() {
                builder.add(Glob::new(pattern)?);
            }
        }

        Ok(Self {
            glob_set: builder.build()?,
        })
    }

    /// Check if a directory (given relative to the root) should be pruned
    pub fn is_excluded(&self, relative: &Path) -> bool {
        if let Some(name) = relative.file_name() {
            if self.glob_set.is_match(Path::new(name)) {
                return true;
            }
        }
        self.glob_set.is_match(relative)
    }
}
