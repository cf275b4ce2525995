//! Tool selection.
//!
//! An explicit override always wins. Otherwise the first tool of the
//! category's priority list with a non-empty merged block is chosen, and
//! the category default is used when nothing is configured.

use lft_protocol::ops::SelectionReason;
use serde::Serialize;

use crate::catalog::Category;
use crate::merge::NormalizedConfig;

/// Override value that defers to detection.
pub const AUTO: &str = "auto";

/// The tool picked for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolSelection {
    pub category: Category,
    pub tool: String,
    pub reason: SelectionReason,
}

/// Pick the tool for `category`.
pub fn select(
    category: Category,
    normalized: &NormalizedConfig,
    explicit_override: Option<&str>,
) -> ToolSelection {
    select_with_preference(category, normalized, explicit_override, None)
}

/// Like [`select`], with a server-configured preference ranked just below
/// the per-call override.
pub fn select_with_preference(
    category: Category,
    normalized: &NormalizedConfig,
    explicit_override: Option<&str>,
    preferred: Option<&str>,
) -> ToolSelection {
    let chosen = |tool: &str, reason| ToolSelection {
        category,
        tool: tool.to_string(),
        reason,
    };

    for requested in [explicit_override, preferred].into_iter().flatten() {
        let requested = requested.trim();
        if !requested.is_empty() && requested != AUTO {
            return chosen(requested, SelectionReason::ExplicitOverride);
        }
    }

    match candidates(category, normalized).first() {
        Some(tool) => chosen(tool, SelectionReason::ConfigPresent),
        None => chosen(category.default_tool(), SelectionReason::DefaultFallback),
    }
}

/// Configured tools of `category`, highest priority first.
pub fn candidates(category: Category, normalized: &NormalizedConfig) -> Vec<String> {
    category
        .priority()
        .iter()
        .filter(|tool| normalized.has_config(category, tool))
        .map(|tool| tool.to_string())
        .collect()
}
