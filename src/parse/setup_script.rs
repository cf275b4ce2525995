//! Regex scan of `setup.py` keyword arguments.
//!
//! The script is never executed; only literal string arguments are seen.

use regex_lite::Regex;
use serde_json::{Map, Value};

use super::DialectParser;

const STRING_FIELDS: &[&str] = &["name", "version", "description", "author", "python_requires"];

pub struct SetupScriptParser;

impl DialectParser for SetupScriptParser {
    fn parse(&self, text: &str) -> Result<Value, String> {
        let mut out = Map::new();

        for field in STRING_FIELDS {
            let pattern = format!(r#"\b{}\s*=\s*['"]([^'"]*)['"]"#, field);
            let re = Regex::new(&pattern).map_err(|e| e.to_string())?;
            if let Some(caps) = re.captures(text) {
                out.insert(field.to_string(), Value::String(caps[1].to_string()));
            }
        }

        let list = Regex::new(r"(?s)\binstall_requires\s*=\s*\[(.*?)\]").map_err(|e| e.to_string())?;
        let item = Regex::new(r#"['"]([^'"]+)['"]"#).map_err(|e| e.to_string())?;
        if let Some(caps) = list.captures(text) {
            let requires: Vec<Value> = item
                .captures_iter(&caps[1])
                .map(|c| Value::String(c[1].trim().to_string()))
                .collect();
            out.insert("install_requires".to_string(), Value::Array(requires));
        }

        Ok(Value::Object(out))
    }
}
