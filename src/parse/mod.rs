//! Config parsers.
//!
//! Each dialect implements [`DialectParser`], turning text into a nested
//! JSON mapping. A file that cannot be read or parsed becomes a
//! [`ParseFailure`] attached to its [`DetectedFile`]; it never aborts a scan.

mod extract;
mod flatten;
mod ini;
mod requirements;
mod setup_script;
mod structured;
mod text;

pub use extract::{dependencies, tool_blocks};
pub use flatten::{flatten, flatten_request, normalize_segment, FlatMap};
pub use ini::{IniParser, KeyValueParser};
pub use requirements::RequirementsParser;
pub use setup_script::SetupScriptParser;
pub use structured::{toml_to_json, JsonParser, TomlParser, YamlParser};
pub use text::TextParser;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::catalog::{Dialect, PrecedenceRank};
use crate::locate::LocatedFile;

/// Text to nested mapping, one implementation per dialect.
pub trait DialectParser: Send + Sync {
    /// Parse file content. Errors are single-line reasons.
    fn parse(&self, text: &str) -> Result<Value, String>;
}

/// The parser for a dialect.
pub fn parser_for(dialect: Dialect) -> &'static dyn DialectParser {
    match dialect {
        Dialect::Toml => &TomlParser,
        Dialect::Ini => &IniParser,
        Dialect::Yaml => &YamlParser,
        Dialect::Json => &JsonParser,
        Dialect::KeyValue => &KeyValueParser,
        Dialect::Requirements => &RequirementsParser,
        Dialect::SetupScript => &SetupScriptParser,
        Dialect::Text => &TextParser,
    }
}

/// A file that was found but could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{file}: {reason}")]
pub struct ParseFailure {
    pub file: String,
    pub reason: String,
}

/// A located file after reading and parsing.
#[derive(Debug, Clone)]
pub struct DetectedFile {
    pub path: PathBuf,
    pub relative_path: String,
    pub pattern: &'static str,
    pub dialect: Dialect,
    pub rank: PrecedenceRank,
    pub owner: Option<&'static str>,
    /// SHA-256 hex of the raw bytes; empty if the file could not be read.
    pub digest: String,
    /// Parsed content; an empty object on failure.
    pub mapping: Value,
    pub parse_error: Option<String>,
}

impl DetectedFile {
    pub fn is_parsed(&self) -> bool {
        self.parse_error.is_none()
    }

    pub fn failure(&self) -> Option<ParseFailure> {
        self.parse_error.as_ref().map(|reason| ParseFailure {
            file: self.relative_path.clone(),
            reason: reason.clone(),
        })
    }
}

/// Read and parse a located file.
pub fn detect(located: &LocatedFile) -> DetectedFile {
    let entry = located.entry;
    let (digest, parsed) = match fs::read(&located.path) {
        Ok(bytes) => (sha256_hex(&bytes), parse_bytes(&bytes, entry.dialect)),
        Err(e) => (String::new(), Err(format!("read failed: {}", e))),
    };

    let (mapping, parse_error) = match parsed {
        Ok(mapping) => (mapping, None),
        Err(reason) => {
            debug!(file = %located.relative_path, %reason, "parse failure");
            (Value::Object(serde_json::Map::new()), Some(reason))
        }
    };

    DetectedFile {
        path: located.path.clone(),
        relative_path: located.relative_path.clone(),
        pattern: entry.pattern,
        dialect: entry.dialect,
        rank: entry.rank,
        owner: entry.owner,
        digest,
        mapping,
        parse_error,
    }
}

/// Parse a single file with the given dialect.
pub fn parse(path: &Path, dialect: Dialect) -> Result<Value, ParseFailure> {
    let failure = |reason: String| ParseFailure {
        file: path.display().to_string(),
        reason,
    };
    let bytes = fs::read(path).map_err(|e| failure(format!("read failed: {}", e)))?;
    parse_bytes(&bytes, dialect).map_err(failure)
}

/// Decode and parse raw bytes.
///
/// Text files are opaque and decoded lossily; every other dialect rejects
/// invalid UTF-8 and blank content.
pub fn parse_bytes(bytes: &[u8], dialect: Dialect) -> Result<Value, String> {
    if dialect == Dialect::Text {
        return TextParser.parse(&String::from_utf8_lossy(bytes));
    }
    let text = std::str::from_utf8(bytes).map_err(|e| format!("invalid UTF-8: {}", e))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        return Err("empty file".to_string());
    }
    parser_for(dialect).parse(text)
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// First line of an error message.
pub(crate) fn one_line(message: impl std::fmt::Display) -> String {
    let message = message.to_string();
    message.lines().next().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::locate::LocatedFile;
    use serde_json::json;
    use tempfile::TempDir;

    fn located(dir: &TempDir, name: &str, content: &[u8]) -> LocatedFile {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        LocatedFile {
            path,
            relative_path: name.to_string(),
            entry: catalog::find(name).unwrap(),
        }
    }

    #[test]
    fn test_detect_records_digest_and_mapping() {
        let dir = TempDir::new().unwrap();
        let file = detect(&located(&dir, "pyproject.toml", b"[tool.black]\nline-length = 88\n"));

        assert!(file.is_parsed());
        assert_eq!(file.digest.len(), 64);
        assert_eq!(file.mapping["tool"]["black"]["line-length"], 88);
        assert_eq!(file.rank, PrecedenceRank::Manifest);
    }

    #[test]
    fn test_empty_file_is_failure() {
        let dir = TempDir::new().unwrap();
        let file = detect(&located(&dir, "setup.cfg", b"  \n\n"));

        assert!(!file.is_parsed());
        let failure = file.failure().unwrap();
        assert_eq!(failure.file, "setup.cfg");
        assert_eq!(failure.reason, "empty file");
        assert_eq!(file.mapping, json!({}));
    }

    #[test]
    fn test_invalid_utf8_is_failure() {
        let dir = TempDir::new().unwrap();
        let file = detect(&located(&dir, "tox.ini", b"[flake8]\nx = \xff\xfe\n"));
        assert!(file.parse_error.unwrap().starts_with("invalid UTF-8"));
    }

    #[test]
    fn test_syntax_error_is_single_line() {
        let dir = TempDir::new().unwrap();
        let file = detect(&located(&dir, "ruff.toml", b"line-length = = 3\n"));
        let reason = file.parse_error.unwrap();
        assert!(!reason.contains('\n'));
        assert!(reason.starts_with("TOML parse error"));
    }

    #[test]
    fn test_text_files_never_fail() {
        assert_eq!(
            parse_bytes(b"", Dialect::Text).unwrap(),
            json!({"line_count": 0, "bytes": 0})
        );
        assert!(parse_bytes(b"\xff\xfe", Dialect::Text).is_ok());
    }

    #[test]
    fn test_parse_by_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("requirements.txt");
        fs::write(&path, "requests>=2\n").unwrap();
        let value = parse(&path, Dialect::Requirements).unwrap();
        assert_eq!(value, json!({"requirements": ["requests>=2"]}));

        let err = parse(&dir.path().join("missing.txt"), Dialect::Requirements).unwrap_err();
        assert!(err.reason.starts_with("read failed"));
    }
}
