//! Dotted-key flattening shared by every dialect.
//!
//! Identifier-like segments are normalized so `line_length` (setup.cfg)
//! and `line-length` (pyproject.toml) are the same key. Segments that are
//! not identifiers, such as globs or module patterns, are quoted verbatim.
//! Arrays are leaves.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Flattened settings, ordered by key.
pub type FlatMap = BTreeMap<String, Value>;

/// Flatten a nested mapping into dotted keys.
pub fn flatten(value: &Value) -> FlatMap {
    let mut out = FlatMap::new();
    if let Value::Object(map) = value {
        walk(&mut Vec::new(), map, &mut out);
    }
    out
}

/// Flatten caller-supplied settings.
///
/// Top-level keys may already be dotted (`"lint.select"`); each dot
/// separates a segment.
pub fn flatten_request(map: &Map<String, Value>) -> FlatMap {
    let mut out = FlatMap::new();
    for (key, value) in map {
        let mut prefix: Vec<String> = key
            .split('.')
            .filter(|s| !s.is_empty())
            .map(normalize_segment)
            .collect();
        if prefix.is_empty() {
            continue;
        }
        match value {
            Value::Object(inner) => walk(&mut prefix, inner, &mut out),
            leaf => {
                out.insert(prefix.join("."), leaf.clone());
            }
        }
    }
    out
}

fn walk(prefix: &mut Vec<String>, map: &Map<String, Value>, out: &mut FlatMap) {
    for (key, value) in map {
        prefix.push(normalize_segment(key));
        match value {
            Value::Object(inner) => walk(prefix, inner, out),
            leaf => {
                out.insert(prefix.join("."), leaf.clone());
            }
        }
        prefix.pop();
    }
}

/// Normalize one key segment.
pub fn normalize_segment(segment: &str) -> String {
    let trimmed = segment.trim();
    if is_identifier(trimmed) {
        trimmed.replace(['_', ' '], "-")
    } else {
        format!("\"{}\"", trimmed.replace('"', "\\\""))
    }
}

fn is_identifier(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == ' ')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_nested_keys_dotted() {
        let flat = flatten(&json!({
            "line_length": 100,
            "lint": {"select": ["E", "F"], "isort": {"known-first-party": ["app"]}}
        }));
        let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["line-length", "lint.isort.known-first-party", "lint.select"]);
        assert_eq!(flat["lint.select"], json!(["E", "F"]));
    }

    #[test]
    fn test_non_identifier_segments_quoted() {
        let flat = flatten(&json!({
            "per-file-ignores": {"__init__.py": ["F401"], "tests/*": ["S101"]},
            "foo.*": {"ignore_errors": true}
        }));
        assert_eq!(flat["per-file-ignores.\"__init__.py\""], json!(["F401"]));
        assert_eq!(flat["per-file-ignores.\"tests/*\""], json!(["S101"]));
        assert_eq!(flat["\"foo.*\".ignore-errors"], json!(true));
    }

    #[test]
    fn test_quoted_segments_trimmed() {
        assert_eq!(normalize_segment(" tests/* "), "\"tests/*\"");
        assert_eq!(normalize_segment("  max_line length "), "max-line-length");
        let flat = flatten(&json!({"per-file-ignores": {" __init__.py ": ["F401"]}}));
        assert_eq!(flat["per-file-ignores.\"__init__.py\""], json!(["F401"]));
    }

    #[test]
    fn test_empty_tables_vanish() {
        assert!(flatten(&json!({"ruff": {}})).is_empty());
        assert!(flatten(&json!([1, 2])).is_empty());
    }

    #[test]
    fn test_request_keys_split_on_dots() {
        let map = json!({"lint.select": ["E"], "line_length": 90, "format": {"quote_style": "single"}});
        let flat = flatten_request(map.as_object().unwrap());
        assert_eq!(flat["lint.select"], json!(["E"]));
        assert_eq!(flat["line-length"], 90);
        assert_eq!(flat["format.quote-style"], "single");
    }
}
