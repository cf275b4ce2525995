//! INI-style and plain `key = value` parsers.
//!
//! Sections become nested tables keyed by their lowercased name. Keys seen
//! before any section land at the top level. Option names are lowercased;
//! indented lines continue the previous value. Integer and boolean values
//! are typed so they compare equal to the same setting written in TOML.

use serde_json::{Map, Value};

use super::DialectParser;

pub struct IniParser;

impl DialectParser for IniParser {
    fn parse(&self, text: &str) -> Result<Value, String> {
        parse_lines(text, true)
    }
}

pub struct KeyValueParser;

impl DialectParser for KeyValueParser {
    fn parse(&self, text: &str) -> Result<Value, String> {
        parse_lines(text, false)
    }
}

struct Pending {
    section: Option<String>,
    key: String,
    value: String,
}

fn parse_lines(text: &str, sections: bool) -> Result<Value, String> {
    let mut root = Map::new();
    let mut section: Option<String> = None;
    let mut pending: Option<Pending> = None;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            flush(&mut root, pending.take());
            continue;
        }
        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let indented = raw.starts_with(' ') || raw.starts_with('\t');
        if indented {
            if let Some(p) = pending.as_mut() {
                let piece = strip_inline_comment(trimmed);
                if !piece.is_empty() {
                    if !p.value.is_empty() {
                        p.value.push('\n');
                    }
                    p.value.push_str(piece);
                }
                continue;
            }
        }

        flush(&mut root, pending.take());

        if trimmed.starts_with('[') {
            if !sections {
                return Err(format!("line {}: sections are not allowed here", line_no));
            }
            let Some(name) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else {
                return Err(format!("line {}: unterminated section header", line_no));
            };
            let name = name.trim().to_lowercase();
            if name.is_empty() {
                return Err(format!("line {}: empty section name", line_no));
            }
            root.entry(name.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            section = Some(name);
            continue;
        }

        let Some(split) = trimmed.find(['=', ':']) else {
            return Err(format!("line {}: expected 'key = value'", line_no));
        };
        let key = trimmed[..split].trim().to_lowercase();
        if key.is_empty() {
            return Err(format!("line {}: missing key", line_no));
        }
        let value = strip_inline_comment(trimmed[split + 1..].trim()).to_string();
        pending = Some(Pending {
            section: section.clone(),
            key,
            value,
        });
    }
    flush(&mut root, pending.take());

    Ok(Value::Object(root))
}

fn flush(root: &mut Map<String, Value>, pending: Option<Pending>) {
    let Some(Pending {
        section,
        key,
        value,
    }) = pending
    else {
        return;
    };
    let value = typed(value);
    match section {
        Some(name) => {
            if let Some(Value::Object(table)) = root.get_mut(&name) {
                table.insert(key, value);
            }
        }
        None => {
            root.insert(key, value);
        }
    }
}

/// Drop a trailing ` # comment` or ` ; comment`.
fn strip_inline_comment(value: &str) -> &str {
    let bytes = value.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if (*b == b'#' || *b == b';') && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return value[..i].trim_end();
        }
    }
    value
}

fn typed(value: String) -> Value {
    if !value.contains('\n') {
        if let Ok(i) = value.parse::<i64>() {
            return Value::Number(i.into());
        }
        match value.to_ascii_lowercase().as_str() {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
    }
    Value::String(value)
}
