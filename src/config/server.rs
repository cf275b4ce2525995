//! Effective server configuration with provenance.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::adapter::Adapter;
use crate::catalog::Category;
use crate::parse::{self, toml_to_json};
use crate::render::OutputFormat;
use crate::select::AUTO;
use crate::timeout::TimeoutConfig;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "LFT_CONFIG";

/// Most tool processes a server may run at once.
const MAX_PROCESSES: usize = 64;

/// Longest allowed SIGTERM grace, in milliseconds.
const MAX_GRACE_MS: u64 = 60_000;

/// Which layer a setting came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Cli,
}

/// One config layer that took part in the merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// Config file path, for the file layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 hex of the config file bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Locator limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocateSection {
    pub max_depth: usize,
    pub extra_excludes: Vec<String>,
}

impl Default for LocateSection {
    fn default() -> Self {
        Self {
            max_depth: BuiltinDefaults::default().max_depth,
            extra_excludes: Vec::new(),
        }
    }
}

/// Tools preferred over detection, per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreferredTools {
    pub lint: Option<String>,
    pub format: Option<String>,
    pub test: Option<String>,
}

impl PreferredTools {
    pub fn for_category(&self, category: Category) -> Option<&str> {
        match category {
            Category::Lint => self.lint.as_deref(),
            Category::Format => self.format.as_deref(),
            Category::Test => self.test.as_deref(),
        }
    }
}

/// Typed server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Base for relative `work_dir` values; the process CWD when unset.
    pub project_root: Option<PathBuf>,
    /// Directories searched for tools before `PATH`, such as a
    /// virtualenv's `bin`. Relative entries resolve against the project root.
    pub tool_path: Vec<PathBuf>,
    pub max_concurrent_processes: usize,
    pub termination_grace_ms: u64,
    pub locate: LocateSection,
    pub timeouts: TimeoutConfig,
    pub preferred: PreferredTools,
    pub output_format: OutputFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            project_root: None,
            tool_path: Vec::new(),
            max_concurrent_processes: defaults.max_concurrent_processes,
            termination_grace_ms: defaults.termination_grace_ms,
            locate: LocateSection::default(),
            timeouts: defaults.timeouts,
            preferred: PreferredTools::default(),
            output_format: defaults.output_format,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_processes == 0 || self.max_concurrent_processes > MAX_PROCESSES {
            return Err(ConfigError::ValidationError(format!(
                "max_concurrent_processes must be in [1, {}]",
                MAX_PROCESSES
            )));
        }
        if self.termination_grace_ms > MAX_GRACE_MS {
            return Err(ConfigError::ValidationError(format!(
                "termination_grace_ms must be at most {}",
                MAX_GRACE_MS
            )));
        }
        if self.locate.max_depth == 0 {
            return Err(ConfigError::ValidationError(
                "locate.max_depth must be at least 1".to_string(),
            ));
        }
        self.timeouts
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        for category in Category::ALL {
            if let Some(tool) = self.preferred.for_category(category) {
                let tool = tool.trim();
                if tool.is_empty() {
                    return Err(ConfigError::ValidationError(format!(
                        "preferred.{} must not be empty",
                        category
                    )));
                }
                if tool != AUTO && Adapter::for_tool(tool, category).is_none() {
                    return Err(ConfigError::ValidationError(format!(
                        "preferred.{}: '{}' is not a supported {} tool",
                        category, tool, category
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Merged configuration plus where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub config: ServerConfig,

    /// Layers, lowest precedence first.
    pub sources: Vec<ConfigSource>,

    /// SHA-256 over the canonical JSON of the merged layers
    pub digest: String,
}

impl EffectiveConfig {
    /// Merge defaults, the config file and CLI overrides, then validate.
    pub fn build(
        config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        layers.push(BuiltinDefaults::default().to_value());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        });

        if let Some(path) = config_path {
            let (value, digest) = Self::load_toml_file(path)?;
            debug!(path = %path.display(), "loaded config file");
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        let canonical = serde_json_canonicalizer::to_vec(&merged)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let config: ServerConfig = serde_json::from_value(merged)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        config.validate()?;

        Ok(Self {
            config,
            sources,
            digest: parse::sha256_hex(&canonical),
        })
    }

    /// The file as JSON plus the digest of its raw bytes.
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        let digest = parse::sha256_hex(&bytes);

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;
        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        Ok((toml_to_json(toml_value), digest))
    }
}

/// Config file to load: the explicit path, else `$LFT_CONFIG`, else
/// `~/.config/lft/config.toml` when it exists.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let home = std::env::var_os("HOME")?;
    let path = PathBuf::from(home).join(".config/lft/config.toml");
    path.is_file().then_some(path)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_build_with_defaults_only() {
        let effective = EffectiveConfig::build(None, None).unwrap();

        assert_eq!(effective.config, ServerConfig::default());
        assert_eq!(effective.sources.len(), 1);
        assert_eq!(effective.sources[0].origin, ConfigOrigin::Builtin);
        assert_eq!(effective.digest.len(), 64);
    }

    #[test]
    fn test_file_then_cli() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "max_concurrent_processes = 2").unwrap();
        writeln!(temp, "output_format = \"compact\"").unwrap();
        writeln!(temp, "[timeouts]").unwrap();
        writeln!(temp, "test_seconds = 900").unwrap();
        writeln!(temp, "[preferred]").unwrap();
        writeln!(temp, "lint = \"flake8\"").unwrap();

        let cli = json!({"max_concurrent_processes": 6});
        let effective = EffectiveConfig::build(Some(temp.path()), Some(cli)).unwrap();
        let config = &effective.config;

        assert_eq!(config.max_concurrent_processes, 6);
        assert_eq!(config.output_format, OutputFormat::Compact);
        assert_eq!(config.timeouts.test_seconds, 900);
        assert_eq!(config.timeouts.lint_seconds, 60);
        assert_eq!(config.preferred.for_category(Category::Lint), Some("flake8"));
        assert_eq!(config.preferred.for_category(Category::Test), None);

        let origins: Vec<_> = effective.sources.iter().map(|s| s.origin.clone()).collect();
        assert_eq!(origins, vec![ConfigOrigin::Builtin, ConfigOrigin::File, ConfigOrigin::Cli]);
        assert_eq!(effective.sources[1].digest.as_ref().map(String::len), Some(64));
    }

    #[test]
    fn test_timeout_validation() {
        let cli = json!({"timeouts": {"lint_seconds": 0}});
        let err = EffectiveConfig::build(None, Some(cli)).unwrap_err();
        assert!(err.to_string().contains("lint_seconds"));
    }

    #[test]
    fn test_process_limit_validation() {
        let err = EffectiveConfig::build(None, Some(json!({"max_concurrent_processes": 0}))).unwrap_err();
        assert!(err.to_string().contains("max_concurrent_processes"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = EffectiveConfig::build(None, Some(json!({"max_concurent_processes": 2}))).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_preferred_tool_must_have_adapter() {
        let err = EffectiveConfig::build(None, Some(json!({"preferred": {"lint": "sh"}}))).unwrap_err();
        assert!(err.to_string().contains("not a supported lint tool"));

        // black formats; it is not a linter
        let err = EffectiveConfig::build(None, Some(json!({"preferred": {"lint": "black"}}))).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));

        let ok = EffectiveConfig::build(None, Some(json!({"preferred": {"lint": "auto", "test": "nose2"}})));
        assert!(ok.is_ok());
    }

    #[test]
    fn test_tool_path_from_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "tool_path = [\".venv/bin\", \"/opt/tools\"]").unwrap();
        let effective = EffectiveConfig::build(Some(temp.path()), None).unwrap();
        assert_eq!(
            effective.config.tool_path,
            vec![PathBuf::from(".venv/bin"), PathBuf::from("/opt/tools")]
        );
    }

    #[test]
    fn test_missing_file() {
        let err = EffectiveConfig::build(Some(Path::new("/nonexistent/lft.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_malformed_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[timeouts").unwrap();
        let err = EffectiveConfig::build(Some(temp.path()), None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = Path::new("/etc/lft.toml");
        assert_eq!(resolve_config_path(Some(path)), Some(path.to_path_buf()));
    }
}
