//! Tool adapters.
//!
//! A static table maps each `(tool, category)` pair to a program, its
//! leading arguments, the way merged settings become flags and the way a
//! target is passed. Building an invocation is a pure function of the
//! merged settings, the target and the caller's extra arguments.

use serde_json::Value;

use crate::catalog::Category;
use crate::parse::FlatMap;

/// Target meaning "the whole project".
pub const ALL_TARGETS: &str = "all";

/// Key prefix of blocks extracted from pre-commit hooks.
const PRE_COMMIT_PREFIX: &str = "pre-commit.";

/// How merged settings become command-line arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagStyle {
    /// `--config 'key = <toml value>'` per setting.
    TomlConfig,
    /// `--key value`; arrays repeat the flag.
    LongRepeated,
    /// `--key value`; arrays and multi-line strings are comma-joined.
    LongCommaJoined,
    /// `-o key=value` per setting.
    IniOverride,
    /// One `--style={key: value, ...}` argument.
    Style,
    /// The tool reads its own config files.
    Native,
}

/// How a target is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStyle {
    /// A path; the whole project is `.`.
    Path,
    /// A path; the whole project needs no argument.
    Optional,
    /// A dotted module; `.py` paths are converted and the whole project
    /// uses test discovery.
    Module,
}

/// One row of the adapter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterSpec {
    pub tool: &'static str,
    pub category: Category,
    pub program: &'static str,
    pub leading_args: &'static [&'static str],
    pub style: FlagStyle,
    pub target: TargetStyle,
    /// Setting keys renamed before they become flags.
    pub renames: &'static [(&'static str, &'static str)],
    /// Use the last dotted segment as the flag name.
    pub leaf_keys: bool,
}

const fn spec(
    tool: &'static str,
    category: Category,
    program: &'static str,
    leading_args: &'static [&'static str],
    style: FlagStyle,
    target: TargetStyle,
) -> AdapterSpec {
    AdapterSpec {
        tool,
        category,
        program,
        leading_args,
        style,
        target,
        renames: &[],
        leaf_keys: false,
    }
}

use FlagStyle::*;
use TargetStyle::*;

pub static ADAPTERS: &[AdapterSpec] = &[
    // lint
    spec("ruff", Category::Lint, "ruff", &["check"], TomlConfig, Path),
    spec("flake8", Category::Lint, "flake8", &[], LongCommaJoined, Path),
    AdapterSpec {
        leaf_keys: true,
        ..spec("pylint", Category::Lint, "pylint", &["--recursive=y"], LongCommaJoined, Path)
    },
    spec("mypy", Category::Lint, "mypy", &[], LongCommaJoined, Path),
    spec("pydocstyle", Category::Lint, "pydocstyle", &[], LongCommaJoined, Path),
    AdapterSpec {
        renames: &[("skips", "skip"), ("exclude-dirs", "exclude")],
        ..spec("bandit", Category::Lint, "bandit", &["-r"], LongCommaJoined, Path)
    },
    // format
    spec("black", Category::Format, "black", &[], LongRepeated, Path),
    spec("ruff", Category::Format, "ruff", &["format"], TomlConfig, Path),
    spec("isort", Category::Format, "isort", &[], LongRepeated, Path),
    spec(
        "autopep8",
        Category::Format,
        "autopep8",
        &["--in-place", "--recursive"],
        LongCommaJoined,
        Path,
    ),
    spec("yapf", Category::Format, "yapf", &["--in-place", "--recursive"], Style, Path),
    // test
    spec("pytest", Category::Test, "pytest", &[], IniOverride, Optional),
    spec("nose2", Category::Test, "nose2", &[], Native, Optional),
    spec("unittest", Category::Test, "python3", &["-m", "unittest"], Native, Module),
];

/// A program and its full argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

/// Resolved adapter for one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adapter {
    pub tool: String,
    pub program: String,
    leading_args: Vec<String>,
    style: FlagStyle,
    target: TargetStyle,
    renames: &'static [(&'static str, &'static str)],
    leaf_keys: bool,
}

impl From<&AdapterSpec> for Adapter {
    fn from(spec: &AdapterSpec) -> Self {
        Self {
            tool: spec.tool.to_string(),
            program: spec.program.to_string(),
            leading_args: spec.leading_args.iter().map(|a| a.to_string()).collect(),
            style: spec.style,
            target: spec.target,
            renames: spec.renames,
            leaf_keys: spec.leaf_keys,
        }
    }
}

impl Adapter {
    /// Adapter for `tool` in `category`, if the table has a row for it.
    ///
    /// Only listed tools are ever run; any other name has no adapter.
    pub fn for_tool(tool: &str, category: Category) -> Option<Self> {
        ADAPTERS
            .iter()
            .find(|a| a.tool == tool && a.category == category)
            .map(Self::from)
    }

    pub fn style(&self) -> FlagStyle {
        self.style
    }

    /// Build the full command line.
    pub fn build(&self, settings: &FlatMap, target: Option<&str>, custom_args: &[String]) -> Invocation {
        let mut args = self.leading_args.clone();
        args.extend(self.setting_args(settings));
        args.extend(self.target_args(target));
        args.extend(custom_args.iter().cloned());
        Invocation {
            program: self.program.clone(),
            args,
        }
    }

    fn setting_args(&self, settings: &FlatMap) -> Vec<String> {
        let usable = settings
            .iter()
            .filter(|(key, value)| !key.starts_with(PRE_COMMIT_PREFIX) && !value.is_null());

        match self.style {
            Native => Vec::new(),
            TomlConfig => usable
                .filter_map(|(key, value)| {
                    toml_literal(value).map(|v| vec!["--config".to_string(), format!("{} = {}", key, v)])
                })
                .flatten()
                .collect(),
            IniOverride => {
                let mut args = Vec::new();
                for (key, value) in usable {
                    if !is_plain(key) {
                        continue;
                    }
                    if key == "addopts" {
                        args.extend(split_words(value));
                        continue;
                    }
                    args.push("-o".to_string());
                    args.push(format!("{}={}", snake(key), ini_value(value)));
                }
                args
            }
            Style => {
                let entries: Vec<String> = usable
                    .filter(|(key, _)| is_plain(key))
                    .map(|(key, value)| format!("{}: {}", snake(key), style_value(value)))
                    .collect();
                if entries.is_empty() {
                    Vec::new()
                } else {
                    vec![format!("--style={{{}}}", entries.join(", "))]
                }
            }
            LongRepeated | LongCommaJoined => {
                let mut args = Vec::new();
                for (key, value) in usable {
                    let Some(name) = self.flag_name(key) else {
                        continue;
                    };
                    self.push_long(&mut args, &name, value);
                }
                args
            }
        }
    }

    fn flag_name(&self, key: &str) -> Option<String> {
        let key = if self.leaf_keys {
            key.rsplit('.').next().unwrap_or(key)
        } else {
            key
        };
        if !is_plain(key) {
            return None;
        }
        let renamed = self
            .renames
            .iter()
            .find(|(from, _)| *from == key)
            .map_or(key, |(_, to)| *to);
        Some(format!("--{}", renamed))
    }

    fn push_long(&self, args: &mut Vec<String>, flag: &str, value: &Value) {
        match value {
            Value::Bool(true) => args.push(flag.to_string()),
            Value::Bool(false) | Value::Null => {}
            Value::Array(items) if self.style == LongRepeated => {
                for item in items {
                    args.push(flag.to_string());
                    args.push(scalar(item));
                }
            }
            Value::Array(items) => {
                if !items.is_empty() {
                    args.push(flag.to_string());
                    args.push(items.iter().map(scalar).collect::<Vec<_>>().join(","));
                }
            }
            Value::String(s) if self.style == LongCommaJoined && s.contains('\n') => {
                args.push(flag.to_string());
                args.push(comma_join_lines(s));
            }
            other => {
                args.push(flag.to_string());
                args.push(scalar(other));
            }
        }
    }

    fn target_args(&self, target: Option<&str>) -> Vec<String> {
        let target = target.map(str::trim).filter(|t| !t.is_empty() && *t != ALL_TARGETS);
        match (self.target, target) {
            (Path, None) => vec![".".to_string()],
            (Optional, None) => Vec::new(),
            (Module, None) => ["discover", "-s", ".", "-p", "*test*.py"]
                .iter()
                .map(|a| a.to_string())
                .collect(),
            (Module, Some(t)) if t.ends_with(".py") => {
                let module = t.trim_end_matches(".py").trim_start_matches("./");
                vec![module.replace('/', ".")]
            }
            (_, Some(t)) => vec![t.to_string()],
        }
    }
}

/// A single unquoted key without nesting.
fn is_plain(key: &str) -> bool {
    !key.is_empty() && !key.contains('.') && !key.contains('"')
}

fn snake(key: &str) -> String {
    key.replace('-', "_")
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn comma_join_lines(value: &str) -> String {
    value
        .lines()
        .map(|line| line.trim().trim_end_matches(','))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

fn split_words(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(scalar).collect(),
        other => scalar(other).split_whitespace().map(str::to_string).collect(),
    }
}

fn ini_value(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join(" "),
        Value::String(s) => s.split_whitespace().collect::<Vec<_>>().join(" "),
        other => scalar(other),
    }
}

fn style_value(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join(","),
        other => scalar(other),
    }
}

/// Render a JSON value as an inline TOML value.
fn toml_literal(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(_) | Value::Number(_) | Value::String(_) => Some(value.to_string()),
        Value::Array(items) => {
            let rendered: Option<Vec<String>> = items.iter().map(toml_literal).collect();
            Some(format!("[{}]", rendered?.join(", ")))
        }
        Value::Object(map) => {
            let rendered: Option<Vec<String>> = map
                .iter()
                .map(|(k, v)| toml_literal(v).map(|v| format!("{} = {}", Value::from(k.as_str()), v)))
                .collect();
            Some(format!("{{{}}}", rendered?.join(", ")))
        }
    }
}
