//! detect_workspace_tools operation types.
//!
//! Informational only: nothing is executed. The response carries the
//! normalized configuration, the selected tool per category and enough
//! provenance for a caller to see where each setting came from.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// detect_workspace_tools request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectRequest {
    /// Project directory to scan.
    pub work_dir: String,
}

/// Why a tool was selected for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    /// The caller named the tool.
    ExplicitOverride,
    /// The tool has a non-empty configuration block.
    ConfigPresent,
    /// Nothing was configured; the category default applies.
    DefaultFallback,
}

impl SelectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExplicitOverride => "explicit_override",
            Self::ConfigPresent => "config_present",
            Self::DefaultFallback => "default_fallback",
        }
    }
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a single setting came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceReport {
    /// File whose value won.
    pub source: String,
    /// Every file that defined the key, in merge order.
    pub defined_in: Vec<String>,
}

/// Merged settings of one tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolReport {
    /// Flattened keys.
    pub config: BTreeMap<String, serde_json::Value>,
    /// Provenance for each key in `config`.
    pub provenance: BTreeMap<String, ProvenanceReport>,
}

/// Per-category detection result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    /// Tool chosen for the category.
    pub selected_tool: String,
    /// Why it was chosen.
    pub reason: SelectionReason,
    /// Merged settings of the selected tool (flattened keys).
    pub config: BTreeMap<String, serde_json::Value>,
    /// Provenance for each key in `config`.
    pub provenance: BTreeMap<String, ProvenanceReport>,
    /// Tools of this category with configuration present, in priority order.
    pub candidates: Vec<String>,
    /// Every configured tool of this category, selected or not.
    pub tools: BTreeMap<String, ToolReport>,
}

/// One detected configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFileReport {
    /// Path relative to the project root, `/`-separated.
    pub path: String,
    /// Catalog pattern that matched.
    pub pattern: String,
    /// Dialect name (toml, ini, yaml, ...).
    pub dialect: String,
    /// Precedence rank name.
    pub rank: String,
    /// Tool this file belongs to, for tool-specific dotfiles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// SHA-256 hex of the raw file bytes.
    pub digest: String,
    /// Whether the file parsed successfully.
    pub parsed: bool,
}

/// A configuration file that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailureReport {
    /// Path relative to the project root.
    pub file: String,
    /// Single-line reason.
    pub reason: String,
}

/// detect_workspace_tools response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectResponse {
    /// Resolved absolute project directory.
    pub work_dir: String,
    /// Keyed by category name: `lint`, `format`, `test`.
    pub categories: BTreeMap<String, CategoryReport>,
    /// Every detected configuration file, sorted by path.
    pub config_files: Vec<ConfigFileReport>,
    /// Declared dependencies (requirements files, setup.py, pre-commit).
    pub dependencies: Vec<String>,
    /// Files that were found but could not be parsed.
    pub parse_failures: Vec<ParseFailureReport>,
    /// Parsed files in the order they were overlaid.
    pub sources: Vec<String>,
    /// SHA-256 over the canonical JSON of the normalized view.
    pub config_digest: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_reason_wire_format() {
        let json = serde_json::to_value(SelectionReason::DefaultFallback).unwrap();
        assert_eq!(json, "default_fallback");
        assert_eq!(SelectionReason::ExplicitOverride.to_string(), "explicit_override");
    }

    #[test]
    fn test_category_report_lists_every_tool() {
        let mut mypy = ToolReport::default();
        mypy.config.insert("strict".to_string(), serde_json::Value::Bool(true));
        let report = CategoryReport {
            selected_tool: "ruff".to_string(),
            reason: SelectionReason::ConfigPresent,
            config: BTreeMap::new(),
            provenance: BTreeMap::new(),
            candidates: vec!["ruff".to_string(), "mypy".to_string()],
            tools: BTreeMap::from([("mypy".to_string(), mypy)]),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["tools"]["mypy"]["config"]["strict"], true);
    }

    #[test]
    fn test_owner_omitted_when_absent() {
        let report = ConfigFileReport {
            path: "pyproject.toml".to_string(),
            pattern: "pyproject.toml".to_string(),
            dialect: "toml".to_string(),
            rank: "manifest".to_string(),
            owner: None,
            digest: "00".to_string(),
            parsed: true,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("owner").is_none());
    }
}
