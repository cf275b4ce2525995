//! Per-tool configuration blocks and dependency lists from parsed files.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::flatten::{flatten, FlatMap};
use super::DetectedFile;
use crate::catalog::{Dialect, KNOWN_TOOLS};

/// Section names a tool-owned INI file uses for its main block.
const OWNED_SECTION_ALIASES: &[(&str, &[&str])] = &[
    ("isort", &["settings"]),
    ("yapf", &["style"]),
    ("autopep8", &["pep8", "pycodestyle"]),
];

/// Flattened configuration blocks keyed by tool name.
///
/// Only known tools appear, and only when their block is non-empty.
pub fn tool_blocks(file: &DetectedFile) -> BTreeMap<&'static str, FlatMap> {
    let mut blocks = BTreeMap::new();
    if !file.is_parsed() {
        return blocks;
    }
    let Value::Object(doc) = &file.mapping else {
        return blocks;
    };

    let owner = file.owner.and_then(known_tool);

    match (file.dialect, owner) {
        (Dialect::Toml, Some(owner)) => {
            let block = table_at(doc, &["tool", owner])
                .cloned()
                .unwrap_or_else(|| doc.clone());
            insert(&mut blocks, owner, Value::Object(block));
        }
        (Dialect::Toml, None) => {
            for tool in KNOWN_TOOLS {
                let Some(table) = table_at(doc, &["tool", *tool]) else {
                    continue;
                };
                let block = match table.get("ini_options") {
                    Some(Value::Object(ini)) if *tool == "pytest" => ini.clone(),
                    _ => table.clone(),
                };
                insert(&mut blocks, *tool, Value::Object(block));
            }
        }
        (Dialect::Ini, owner) => ini_blocks(doc, owner, &mut blocks),
        (Dialect::Yaml | Dialect::Json | Dialect::KeyValue, Some(owner)) => {
            insert(&mut blocks, owner, Value::Object(doc.clone()));
        }
        (Dialect::Yaml, None) if file.pattern.starts_with(".pre-commit-config.") => {
            pre_commit_blocks(doc, &mut blocks);
        }
        _ => {}
    }

    blocks
}

fn known_tool(name: &str) -> Option<&'static str> {
    KNOWN_TOOLS.iter().copied().find(|t| *t == name)
}

fn insert(blocks: &mut BTreeMap<&'static str, FlatMap>, tool: &'static str, block: Value) {
    let flat = flatten(&block);
    if !flat.is_empty() {
        blocks.insert(tool, flat);
    }
}

fn table_at<'a>(doc: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Map<String, Value>> {
    let mut current = doc;
    for segment in path {
        current = current.get(*segment)?.as_object()?;
    }
    Some(current)
}

fn ini_blocks(
    doc: &Map<String, Value>,
    owner: Option<&'static str>,
    blocks: &mut BTreeMap<&'static str, FlatMap>,
) {
    for tool in KNOWN_TOOLS {
        let aliases: &[&str] = match owner {
            Some(o) if o == *tool => OWNED_SECTION_ALIASES
                .iter()
                .find(|(t, _)| t == tool)
                .map(|(_, a)| *a)
                .unwrap_or(&[]),
            _ => &[],
        };

        let mut block = Map::new();
        for (name, section) in doc {
            let Value::Object(section) = section else {
                continue;
            };
            let name = name.strip_prefix("tool:").unwrap_or(name);
            if name == *tool || aliases.contains(&name) {
                for (k, v) in section {
                    block.insert(k.clone(), v.clone());
                }
            } else if let Some(sub) = name
                .strip_prefix(*tool)
                .and_then(|rest| rest.strip_prefix(['.', '-', ':']))
                .filter(|sub| !sub.is_empty())
            {
                block.insert(sub.to_string(), Value::Object(section.clone()));
            }
        }

        if block.is_empty() && owner == Some(*tool) {
            // No recognisable section: keep every section under its own name.
            block = doc.clone();
        }
        insert(blocks, *tool, Value::Object(block));
    }
}

fn pre_commit_blocks(doc: &Map<String, Value>, blocks: &mut BTreeMap<&'static str, FlatMap>) {
    let hooks: Vec<(&str, &Map<String, Value>, &Map<String, Value>)> = doc
        .get("repos")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .flat_map(|repo| {
            let url = repo.get("repo").and_then(Value::as_str).unwrap_or_default();
            repo.get("hooks")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_object)
                .map(move |hook| (url, repo, hook))
        })
        .collect();

    for tool in KNOWN_TOOLS {
        let exact = hooks
            .iter()
            .find(|(_, _, hook)| hook_id(hook) == Some(*tool));
        let loose = || {
            hooks.iter().find(|(url, _, hook)| {
                hook_id(hook).is_some_and(|id| id.starts_with(&format!("{}-", tool)))
                    || repo_names_tool(url, tool)
            })
        };
        let Some((_, repo, hook)) = exact.or_else(loose) else {
            continue;
        };

        let mut entry = Map::new();
        if let Some(id) = hook_id(hook) {
            entry.insert("hook".to_string(), Value::String(id.to_string()));
        }
        if let Some(rev @ Value::String(_)) = repo.get("rev") {
            entry.insert("rev".to_string(), rev.clone());
        }
        if let Some(args @ Value::Array(_)) = hook.get("args") {
            entry.insert("args".to_string(), args.clone());
        }
        let mut block = Map::new();
        block.insert("pre-commit".to_string(), Value::Object(entry));
        insert(blocks, *tool, Value::Object(block));
    }
}

fn hook_id(hook: &Map<String, Value>) -> Option<&str> {
    hook.get("id").and_then(Value::as_str)
}

fn repo_names_tool(url: &str, tool: &str) -> bool {
    let name = url.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    let name = name.strip_suffix(".git").unwrap_or(name);
    name == tool || name.starts_with(&format!("{}-", tool))
}

/// Declared dependencies of a parsed file.
pub fn dependencies(file: &DetectedFile) -> Vec<String> {
    if !file.is_parsed() {
        return Vec::new();
    }
    let doc = &file.mapping;
    let strings = |value: &Value| -> Vec<String> {
        value
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    };

    match file.dialect {
        Dialect::Requirements => strings(&doc["requirements"]),
        Dialect::SetupScript => strings(&doc["install_requires"]),
        Dialect::Toml if file.pattern == "pyproject.toml" => {
            let mut deps = strings(&doc["project"]["dependencies"]);
            if let Some(poetry) = doc["tool"]["poetry"]["dependencies"].as_object() {
                deps.extend(named_specs(poetry));
            }
            deps
        }
        Dialect::Toml if file.pattern == "Pipfile" => {
            let mut deps = Vec::new();
            for section in ["packages", "dev-packages"] {
                if let Some(table) = doc[section].as_object() {
                    deps.extend(named_specs(table));
                }
            }
            deps
        }
        _ => Vec::new(),
    }
}

/// `name = "spec"` tables as `namespec` strings; `*` means unpinned.
fn named_specs(table: &Map<String, Value>) -> impl Iterator<Item = String> + '_ {
    table
        .iter()
        .filter(|(name, _)| name.as_str() != "python")
        .map(|(name, spec)| match spec.as_str() {
            Some("*") | None => name.clone(),
            Some(spec) if spec.starts_with(|c: char| c.is_ascii_digit()) => {
                format!("{}=={}", name, spec)
            }
            Some(spec) => format!("{}{}", name, spec),
        })
}
