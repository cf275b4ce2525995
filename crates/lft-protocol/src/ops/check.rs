//! check_config_files operation types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// check_config_files request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfigRequest {
    /// Project directory to inspect.
    pub work_dir: String,
}

/// check_config_files response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfigResponse {
    /// Resolved absolute project directory.
    pub work_dir: String,
    /// Catalog pattern to presence flag, one entry per catalog pattern.
    pub files: BTreeMap<String, bool>,
}

impl CheckConfigResponse {
    /// Patterns that matched at least one file.
    pub fn present(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .filter(|(_, present)| **present)
            .map(|(pattern, _)| pattern.as_str())
    }
}
