use serde_json::{json, Value};

use super::DialectParser;

/// Opaque files: only size facts are recorded.
pub struct TextParser;

impl DialectParser for TextParser {
    fn parse(&self, text: &str) -> Result<Value, String> {
        Ok(json!({
            "line_count": text.lines().count(),
            "bytes": text.len(),
        }))
    }
}
