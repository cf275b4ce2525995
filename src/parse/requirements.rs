//! requirements.txt style dependency lists.

use serde_json::{json, Value};

use super::DialectParser;

/// One requirement per line; comments and `-r`/`-e`/`--index-url`
/// style option lines are skipped.
pub struct RequirementsParser;

impl DialectParser for RequirementsParser {
    fn parse(&self, text: &str) -> Result<Value, String> {
        let requirements: Vec<&str> = text
            .lines()
            .map(|line| match line.find(" #") {
                Some(i) => &line[..i],
                None => line,
            })
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
            .collect();
        Ok(json!({ "requirements": requirements }))
    }
}
