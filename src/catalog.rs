//! Known configuration files and the static tables derived from them.
//!
//! Every pattern is a `/`-separated glob anchored at the project root.
//! The catalog, the category priority lists and the precedence ranks are
//! process-wide constants; nothing here is mutated at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration file syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    Toml,
    Ini,
    Yaml,
    Json,
    KeyValue,
    Requirements,
    SetupScript,
    Text,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Ini => "ini",
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::KeyValue => "key_value",
            Self::Requirements => "requirements",
            Self::SetupScript => "setup_script",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool category an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Lint,
    Format,
    Test,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Lint, Category::Format, Category::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lint => "lint",
            Self::Format => "format",
            Self::Test => "test",
        }
    }

    /// Tools of this category, highest priority first.
    pub fn priority(&self) -> &'static [&'static str] {
        match self {
            Self::Lint => LINT_PRIORITY,
            Self::Format => FORMAT_PRIORITY,
            Self::Test => TEST_PRIORITY,
        }
    }

    /// Tool used when nothing is configured.
    pub fn default_tool(&self) -> &'static str {
        match self {
            Self::Lint => "ruff",
            Self::Format => "ruff",
            Self::Test => "pytest",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "lint" => Some(Self::Lint),
            "format" => Some(Self::Format),
            "test" => Some(Self::Test),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const LINT_PRIORITY: &[&str] = &["ruff", "flake8", "pylint", "mypy", "pydocstyle", "bandit"];
pub const FORMAT_PRIORITY: &[&str] = &["black", "ruff", "isort", "autopep8", "yapf"];
pub const TEST_PRIORITY: &[&str] = &["pytest", "nose2", "unittest"];

/// Every tool whose configuration block is extracted from detected files.
pub const KNOWN_TOOLS: &[&str] = &[
    "autopep8",
    "bandit",
    "black",
    "flake8",
    "isort",
    "mypy",
    "nose2",
    "pydocstyle",
    "pylint",
    "pytest",
    "ruff",
    "unittest",
    "yapf",
];

/// What a file is useful for. The first three mirror [`Category`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hint {
    Lint,
    Format,
    Test,
    Deps,
    Ci,
    Docs,
    Editor,
    Vcs,
    Deploy,
}

/// Merge precedence; a higher rank wins on key collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecedenceRank {
    /// Dependency declarations and files that never carry tool settings.
    Dependency,
    /// CI definitions such as pre-commit.
    Ci,
    /// setup.cfg, tox.ini, setup.py.
    Legacy,
    /// Files owned by a single tool (`.flake8`, `ruff.toml`).
    ToolDotfile,
    /// pyproject.toml.
    Manifest,
}

impl PrecedenceRank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dependency => "dependency",
            Self::Ci => "ci",
            Self::Legacy => "legacy",
            Self::ToolDotfile => "tool_dotfile",
            Self::Manifest => "manifest",
        }
    }
}

/// One known configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigCatalogEntry {
    pub pattern: &'static str,
    pub dialect: Dialect,
    pub rank: PrecedenceRank,
    pub hints: &'static [Hint],
    /// Tool a tool-specific dotfile belongs to.
    pub owner: Option<&'static str>,
}

impl ConfigCatalogEntry {
    pub fn is_pre_commit(&self) -> bool {
        self.pattern.starts_with(".pre-commit-config.")
    }
}

const fn entry(
    pattern: &'static str,
    dialect: Dialect,
    rank: PrecedenceRank,
    hints: &'static [Hint],
    owner: Option<&'static str>,
) -> ConfigCatalogEntry {
    ConfigCatalogEntry {
        pattern,
        dialect,
        rank,
        hints,
        owner,
    }
}

use Dialect::*;
use PrecedenceRank::*;

const LFT: &[Hint] = &[Hint::Lint, Hint::Format, Hint::Test];
const L: &[Hint] = &[Hint::Lint];
const F: &[Hint] = &[Hint::Format];
const T: &[Hint] = &[Hint::Test];
const LF: &[Hint] = &[Hint::Lint, Hint::Format];
const LT: &[Hint] = &[Hint::Lint, Hint::Test];
const DEPS: &[Hint] = &[Hint::Deps];
const CI: &[Hint] = &[Hint::Ci];
const CI_LF: &[Hint] = &[Hint::Ci, Hint::Lint, Hint::Format];
const DOCS: &[Hint] = &[Hint::Docs];
const EDITOR: &[Hint] = &[Hint::Editor];
const VCS: &[Hint] = &[Hint::Vcs];
const DEPLOY: &[Hint] = &[Hint::Deploy];

/// The catalog.
pub static CATALOG: &[ConfigCatalogEntry] = &[
    // Project manifests and legacy setup files
    entry("pyproject.toml", Toml, Manifest, &[Hint::Lint, Hint::Format, Hint::Test, Hint::Deps], None),
    entry("setup.cfg", Ini, Legacy, LFT, None),
    entry("setup.py", SetupScript, Legacy, DEPS, None),
    entry("tox.ini", Ini, Legacy, LT, None),
    // Ruff
    entry("ruff.toml", Toml, ToolDotfile, LF, Some("ruff")),
    entry(".ruff.toml", Toml, ToolDotfile, LF, Some("ruff")),
    // Black
    entry("black.toml", Toml, ToolDotfile, F, Some("black")),
    entry(".black.toml", Toml, ToolDotfile, F, Some("black")),
    // Flake8
    entry(".flake8", Ini, ToolDotfile, L, Some("flake8")),
    entry("flake8.ini", Ini, ToolDotfile, L, Some("flake8")),
    // Pylint
    entry(".pylintrc", Ini, ToolDotfile, L, Some("pylint")),
    entry("pylintrc", Ini, ToolDotfile, L, Some("pylint")),
    entry(".pylint", Ini, ToolDotfile, L, Some("pylint")),
    entry("pylintrc.toml", Toml, ToolDotfile, L, Some("pylint")),
    entry(".pylintrc.toml", Toml, ToolDotfile, L, Some("pylint")),
    // Mypy
    entry("mypy.ini", Ini, ToolDotfile, L, Some("mypy")),
    entry(".mypy.ini", Ini, ToolDotfile, L, Some("mypy")),
    // Pydocstyle
    entry(".pydocstyle", Ini, ToolDotfile, L, Some("pydocstyle")),
    entry(".pydocstyle.ini", Ini, ToolDotfile, L, Some("pydocstyle")),
    entry(".pydocstylerc", Ini, ToolDotfile, L, Some("pydocstyle")),
    entry(".pydocstylerc.ini", Ini, ToolDotfile, L, Some("pydocstyle")),
    // Bandit
    entry("bandit.yaml", Yaml, ToolDotfile, L, Some("bandit")),
    entry("bandit.yml", Yaml, ToolDotfile, L, Some("bandit")),
    entry(".bandit.yaml", Yaml, ToolDotfile, L, Some("bandit")),
    entry(".bandit.yml", Yaml, ToolDotfile, L, Some("bandit")),
    entry(".bandit", Ini, ToolDotfile, L, Some("bandit")),
    // Isort
    entry(".isort.cfg", Ini, ToolDotfile, F, Some("isort")),
    entry("isort.cfg", Ini, ToolDotfile, F, Some("isort")),
    // Autopep8 / pycodestyle
    entry(".pep8", Ini, ToolDotfile, F, Some("autopep8")),
    entry(".pycodestyle", Ini, ToolDotfile, F, Some("autopep8")),
    // Yapf
    entry(".style.yapf", Ini, ToolDotfile, F, Some("yapf")),
    entry("yapf.ini", Ini, ToolDotfile, F, Some("yapf")),
    entry(".yapfrc", Ini, ToolDotfile, F, Some("yapf")),
    // Test runners
    entry("pytest.ini", Ini, ToolDotfile, T, Some("pytest")),
    entry(".pytest.ini", Ini, ToolDotfile, T, Some("pytest")),
    entry("nose2.cfg", Ini, ToolDotfile, T, Some("nose2")),
    entry("unittest.cfg", Ini, ToolDotfile, T, Some("nose2")),
    // Coverage
    entry(".coveragerc", Ini, ToolDotfile, T, Some("coverage")),
    entry("coverage.ini", Ini, ToolDotfile, T, Some("coverage")),
    entry(".coverage", Text, Dependency, T, None),
    // CI
    entry(".pre-commit-config.yaml", Yaml, Ci, CI_LF, None),
    entry(".pre-commit-config.yml", Yaml, Ci, CI_LF, None),
    entry(".github/workflows/*.yml", Yaml, Ci, CI, None),
    entry(".github/workflows/*.yaml", Yaml, Ci, CI, None),
    entry(".gitlab-ci.yml", Yaml, Ci, CI, None),
    entry(".travis.yml", Yaml, Ci, CI, None),
    entry("azure-pipelines.yml", Yaml, Ci, CI, None),
    entry(".circleci/config.yml", Yaml, Ci, CI, None),
    // Documentation
    entry("mkdocs.yml", Yaml, Dependency, DOCS, None),
    entry("mkdocs.yaml", Yaml, Dependency, DOCS, None),
    entry(".readthedocs.yml", Yaml, Dependency, DOCS, None),
    entry(".readthedocs.yaml", Yaml, Dependency, DOCS, None),
    entry("conf.py", Text, Dependency, DOCS, None),
    entry("docs/conf.py", Text, Dependency, DOCS, None),
    // Dependencies
    entry("requirements.txt", Requirements, Dependency, DEPS, None),
    entry("requirements-dev.txt", Requirements, Dependency, DEPS, None),
    entry("requirements-test.txt", Requirements, Dependency, DEPS, None),
    entry("dev-requirements.txt", Requirements, Dependency, DEPS, None),
    entry("test-requirements.txt", Requirements, Dependency, DEPS, None),
    entry("requirements/*.txt", Requirements, Dependency, DEPS, None),
    entry("constraints.txt", Requirements, Dependency, DEPS, None),
    entry("Pipfile", Toml, Dependency, DEPS, None),
    entry("Pipfile.lock", Json, Dependency, DEPS, None),
    entry("poetry.lock", Toml, Dependency, DEPS, None),
    entry("conda-environment.yml", Yaml, Dependency, DEPS, None),
    entry("environment.yml", Yaml, Dependency, DEPS, None),
    entry("environment.yaml", Yaml, Dependency, DEPS, None),
    entry(".python-version", Text, Dependency, DEPS, None),
    // Version control
    entry(".gitignore", Text, Dependency, VCS, None),
    entry(".gitattributes", Text, Dependency, VCS, None),
    // Editor
    entry(".editorconfig", Ini, Dependency, EDITOR, None),
    entry(".vscode/settings.json", Json, Dependency, EDITOR, None),
    // Deployment
    entry("Dockerfile", Text, Dependency, DEPLOY, None),
    entry(".dockerignore", Text, Dependency, DEPLOY, None),
    entry("docker-compose.yml", Yaml, Dependency, DEPLOY, None),
    entry("docker-compose.yaml", Yaml, Dependency, DEPLOY, None),
    entry("Makefile", Text, Dependency, DEPLOY, None),
    entry(".env", KeyValue, Dependency, DEPLOY, None),
];

/// Look up a catalog entry by its exact pattern.
pub fn find(pattern: &str) -> Option<&'static ConfigCatalogEntry> {
    CATALOG.iter().find(|e| e.pattern == pattern)
}
