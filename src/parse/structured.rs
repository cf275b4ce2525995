//! TOML, YAML and JSON parsers.

use serde_json::{Map, Value};

use super::{one_line, DialectParser};

pub struct TomlParser;

impl DialectParser for TomlParser {
    fn parse(&self, text: &str) -> Result<Value, String> {
        let value: toml::Value = toml::from_str(text).map_err(one_line)?;
        Ok(toml_to_json(value))
    }
}

/// Convert TOML Value to JSON Value
pub fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

pub struct YamlParser;

impl DialectParser for YamlParser {
    fn parse(&self, text: &str) -> Result<Value, String> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| format!("YAML parse error: {}", one_line(e)))?;
        match yaml_to_json(value) {
            object @ Value::Object(_) => Ok(object),
            Value::Null => Err("YAML document is empty".to_string()),
            _ => Err("YAML document is not a mapping".to_string()),
        }
    }
}

fn yaml_to_json(yaml: serde_yaml::Value) -> Value {
    match yaml {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(yaml_key(key), yaml_to_json(value));
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

pub struct JsonParser;

impl DialectParser for JsonParser {
    fn parse(&self, text: &str) -> Result<Value, String> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| format!("JSON parse error: {}", e))?;
        if value.is_object() {
            Ok(value)
        } else {
            Err("JSON document is not an object".to_string())
        }
    }
}
