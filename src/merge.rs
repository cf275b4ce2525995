//! Config merger.
//!
//! Detected files are overlaid in ascending precedence, lowest rank first,
//! so a higher-ranked file wins every key collision. Within one rank files
//! are applied in descending path order, which lets the lexicographically
//! smallest path win. Every definition is recorded so callers can see
//! which file a setting came from and which files it shadowed.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::catalog::{Category, Dialect, PrecedenceRank};
use crate::parse::{self, DetectedFile, FlatMap, ParseFailure};

/// Provenance label for settings supplied with a request.
pub const REQUEST_SOURCE: &str = "<request>";

/// Merge errors
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("failed to canonicalize normalized config: {0}")]
    Canonicalize(String),
}

/// Where a setting came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    /// The file whose value won.
    pub source: String,
    /// Every file that defined the key, in merge order.
    pub defined_in: Vec<String>,
}

/// Merged settings of one tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolBlock {
    pub settings: FlatMap,
    pub provenance: BTreeMap<String, Provenance>,
}

impl ToolBlock {
    /// Set `key`, replacing any earlier value.
    pub fn define(&mut self, key: String, value: Value, source: &str) {
        let provenance = self
            .provenance
            .entry(key.clone())
            .or_insert_with(|| Provenance {
                source: String::new(),
                defined_in: Vec::new(),
            });
        provenance.source = source.to_string();
        provenance.defined_in.push(source.to_string());
        self.settings.insert(key, value);
    }

    pub fn overlay(&mut self, settings: &FlatMap, source: &str) {
        for (key, value) in settings {
            self.define(key.clone(), value.clone(), source);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

/// One detected file as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRecord {
    pub path: String,
    pub pattern: &'static str,
    pub dialect: Dialect,
    pub rank: PrecedenceRank,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<&'static str>,
    pub digest: String,
    pub parsed: bool,
}

impl From<&DetectedFile> for SourceRecord {
    fn from(file: &DetectedFile) -> Self {
        Self {
            path: file.relative_path.clone(),
            pattern: file.pattern,
            dialect: file.dialect,
            rank: file.rank,
            owner: file.owner,
            digest: file.digest.clone(),
            parsed: file.is_parsed(),
        }
    }
}

/// The merged, precedence-resolved view of a workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedConfig {
    pub categories: BTreeMap<Category, BTreeMap<String, ToolBlock>>,
    /// Declared dependencies, deduplicated, in path order.
    pub dependencies: Vec<String>,
    /// Every detected file, sorted by path.
    pub sources: Vec<SourceRecord>,
    /// Parsed files in the order they were overlaid.
    pub merge_order: Vec<String>,
    pub parse_failures: Vec<ParseFailure>,
}

impl NormalizedConfig {
    pub fn tool(&self, category: Category, tool: &str) -> Option<&ToolBlock> {
        self.categories.get(&category)?.get(tool)
    }

    /// True if `tool` has at least one setting in `category`.
    pub fn has_config(&self, category: Category, tool: &str) -> bool {
        self.tool(category, tool).is_some_and(|block| !block.is_empty())
    }

    /// Overlay caller-supplied settings on one tool block.
    pub fn overlay_request(&mut self, category: Category, tool: &str, settings: &FlatMap) {
        if settings.is_empty() {
            return;
        }
        self.categories
            .entry(category)
            .or_default()
            .entry(tool.to_string())
            .or_default()
            .overlay(settings, REQUEST_SOURCE);
    }

    /// SHA-256 over the canonical JSON form of this view.
    pub fn config_digest(&self) -> Result<String, MergeError> {
        let value =
            serde_json::to_value(self).map_err(|e| MergeError::Canonicalize(e.to_string()))?;
        let bytes = serde_json_canonicalizer::to_vec(&value)
            .map_err(|e| MergeError::Canonicalize(e.to_string()))?;
        Ok(parse::sha256_hex(&bytes))
    }
}

/// Merge detected files into one normalized view.
///
/// The result does not depend on the order of `files`.
pub fn merge(files: &[DetectedFile]) -> NormalizedConfig {
    let mut by_path: Vec<&DetectedFile> = files.iter().collect();
    by_path.sort_by(|a, b| {
        a.relative_path
            .cmp(&b.relative_path)
            .then_with(|| a.pattern.cmp(b.pattern))
    });

    let mut normalized = NormalizedConfig {
        sources: by_path.iter().map(|f| SourceRecord::from(*f)).collect(),
        parse_failures: by_path.iter().filter_map(|f| f.failure()).collect(),
        ..Default::default()
    };

    for file in &by_path {
        for dependency in parse::dependencies(file) {
            if !normalized.dependencies.contains(&dependency) {
                normalized.dependencies.push(dependency);
            }
        }
    }

    let mut ordered: Vec<&DetectedFile> = by_path.into_iter().filter(|f| f.is_parsed()).collect();
    ordered.sort_by(|a, b| {
        a.rank
            .cmp(&b.rank)
            .then_with(|| b.relative_path.cmp(&a.relative_path))
    });

    for file in ordered {
        normalized.merge_order.push(file.relative_path.clone());
        for (tool, settings) in parse::tool_blocks(file) {
            debug!(file = %file.relative_path, tool, keys = settings.len(), "overlay");
            for category in Category::ALL {
                if !category.priority().contains(&tool) {
                    continue;
                }
                normalized
                    .categories
                    .entry(category)
                    .or_default()
                    .entry(tool.to_string())
                    .or_default()
                    .overlay(&settings, &file.relative_path);
            }
        }
    }

    normalized
}
