//! Operation façade.
//!
//! Each operation is a linear pipeline over a fresh scan of the workspace:
//! locate, parse, merge, select and, for the run operations, build the
//! command line and execute it. Nothing is cached between calls.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use lft_protocol::ops::{
    CategoryReport, CheckConfigResponse, ConfigFileReport, DetectResponse, ParseFailureReport,
    ProvenanceReport, RunRequest, RunResponse, ToolReport,
};
use lft_protocol::RpcError;
use lft_runner::{ExecutionRequest, Executor, ExecutorConfig, ExecutorError, ProcessSlots};
use tracing::{debug, info};

use crate::adapter::Adapter;
use crate::catalog::Category;
use crate::config::ServerConfig;
use crate::locate::{self, LocateError, LocateOptions, Locator};
use crate::merge::{self, NormalizedConfig, SourceRecord, ToolBlock};
use crate::parse::{self, flatten_request, DetectedFile};
use crate::select::{self, ToolSelection};

/// Orchestrator errors, tagged by the stage that failed.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("invalid workspace '{path}': {reason}")]
    InvalidWorkspace { path: String, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{tool} could not be executed: {source}")]
    Execution {
        tool: String,
        #[source]
        source: ExecutorError,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// Wire form of this error.
    pub fn to_rpc(&self) -> RpcError {
        match self {
            Self::InvalidWorkspace { path, reason } => RpcError::invalid_workspace(path, reason),
            Self::InvalidRequest(message) => RpcError::invalid_request(message.clone()),
            Self::Execution { tool, source } => RpcError::execution_failed(tool, source.to_string()),
            Self::Internal(message) => RpcError::internal(message.clone()),
        }
    }
}

impl From<LocateError> for OrchestratorError {
    fn from(e: LocateError) -> Self {
        match e {
            LocateError::InvalidWorkspace { path, reason } => Self::InvalidWorkspace { path, reason },
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Runs operations against workspaces.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: ServerConfig,
    project_root: PathBuf,
    locator: Locator,
    executor_config: ExecutorConfig,
    slots: ProcessSlots,
}

impl Orchestrator {
    pub fn new(config: ServerConfig) -> Result<Self, OrchestratorError> {
        let cwd = std::env::current_dir()
            .map_err(|e| OrchestratorError::Internal(format!("current directory: {}", e)))?;
        let project_root = match &config.project_root {
            Some(root) => cwd.join(root),
            None => cwd,
        };
        let locator = Locator::new(&LocateOptions {
            max_depth: config.locate.max_depth,
            extra_excludes: config.locate.extra_excludes.clone(),
        })?;
        let executor_config = ExecutorConfig {
            termination_grace: Duration::from_millis(config.termination_grace_ms),
            search_path: search_path(&project_root, &config.tool_path)?,
            ..ExecutorConfig::default()
        };
        let slots = ProcessSlots::new(config.max_concurrent_processes);

        Ok(Self {
            config,
            project_root,
            locator,
            executor_config,
            slots,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Process slots shared by every run, with the live process groups.
    pub fn slots(&self) -> &ProcessSlots {
        &self.slots
    }

    /// Resolve a caller-supplied directory against the project root.
    pub fn resolve_work_dir(&self, work_dir: &str) -> PathBuf {
        let trimmed = work_dir.trim();
        if trimmed.is_empty() {
            return self.project_root.clone();
        }
        self.project_root.join(trimmed)
    }

    fn workspace(&self, work_dir: &str) -> Result<PathBuf, OrchestratorError> {
        Ok(locate::validate_root(&self.resolve_work_dir(work_dir))?)
    }

    fn scan(&self, root: &Path) -> Result<NormalizedConfig, OrchestratorError> {
        let located = self.locator.locate(root)?;
        let detected: Vec<DetectedFile> = located.iter().map(parse::detect).collect();
        let normalized = merge::merge(&detected);
        debug!(
            root = %root.display(),
            files = detected.len(),
            failures = normalized.parse_failures.len(),
            "workspace scanned"
        );
        Ok(normalized)
    }

    fn selection(
        &self,
        category: Category,
        normalized: &NormalizedConfig,
        exact_tool: Option<&str>,
    ) -> ToolSelection {
        select::select_with_preference(
            category,
            normalized,
            exact_tool,
            self.config.preferred.for_category(category),
        )
    }

    /// Report the detected tools and their merged settings.
    pub fn detect_workspace_tools(&self, work_dir: &str) -> Result<DetectResponse, OrchestratorError> {
        let root = self.workspace(work_dir)?;
        let normalized = self.scan(&root)?;

        let mut categories = BTreeMap::new();
        for category in Category::ALL {
            let selection = self.selection(category, &normalized, None);
            let selected = normalized
                .tool(category, &selection.tool)
                .map(tool_report)
                .unwrap_or_default();
            let tools = normalized
                .categories
                .get(&category)
                .map(|blocks| {
                    blocks
                        .iter()
                        .filter(|(_, block)| !block.is_empty())
                        .map(|(tool, block)| (tool.clone(), tool_report(block)))
                        .collect()
                })
                .unwrap_or_default();
            categories.insert(
                category.as_str().to_string(),
                CategoryReport {
                    config: selected.config,
                    provenance: selected.provenance,
                    candidates: select::candidates(category, &normalized),
                    tools,
                    selected_tool: selection.tool,
                    reason: selection.reason,
                },
            );
        }

        let config_digest = normalized
            .config_digest()
            .map_err(|e| OrchestratorError::Internal(e.to_string()))?;

        Ok(DetectResponse {
            work_dir: root.display().to_string(),
            categories,
            config_files: normalized.sources.iter().map(file_report).collect(),
            dependencies: normalized.dependencies,
            parse_failures: normalized
                .parse_failures
                .into_iter()
                .map(|f| ParseFailureReport {
                    file: f.file,
                    reason: f.reason,
                })
                .collect(),
            sources: normalized.merge_order,
            config_digest,
        })
    }

    /// Which catalog files exist at the workspace.
    pub fn check_config_files(&self, work_dir: &str) -> Result<CheckConfigResponse, OrchestratorError> {
        let root = self.workspace(work_dir)?;
        let files = self
            .locator
            .check(&root)?
            .into_iter()
            .map(|(pattern, present)| (pattern.to_string(), present))
            .collect();
        Ok(CheckConfigResponse {
            work_dir: root.display().to_string(),
            files,
        })
    }

    pub fn lint(&self, request: &RunRequest, cancel: Arc<AtomicBool>) -> Result<RunResponse, OrchestratorError> {
        self.run(Category::Lint, request, cancel)
    }

    pub fn format(&self, request: &RunRequest, cancel: Arc<AtomicBool>) -> Result<RunResponse, OrchestratorError> {
        self.run(Category::Format, request, cancel)
    }

    pub fn test(&self, request: &RunRequest, cancel: Arc<AtomicBool>) -> Result<RunResponse, OrchestratorError> {
        self.run(Category::Test, request, cancel)
    }

    /// Select, configure and execute the tool for `category`.
    ///
    /// Tool failures are statuses inside the response; only an unusable
    /// workspace or an executor infrastructure failure is an error.
    pub fn run(
        &self,
        category: Category,
        request: &RunRequest,
        cancel: Arc<AtomicBool>,
    ) -> Result<RunResponse, OrchestratorError> {
        let timeout = self
            .config
            .timeouts
            .resolve(category, request.timeout_seconds)
            .map_err(|e| OrchestratorError::InvalidRequest(e.to_string()))?;

        let root = self.workspace(&request.work_dir)?;
        let mut normalized = self.scan(&root)?;
        let selection = self.selection(category, &normalized, request.exact_tool.as_deref());
        let Some(adapter) = Adapter::for_tool(&selection.tool, category) else {
            return Err(OrchestratorError::InvalidRequest(format!(
                "'{}' is not a supported {} tool",
                selection.tool, category
            )));
        };

        if let Some(tool_config) = &request.tool_config {
            normalized.overlay_request(category, &selection.tool, &flatten_request(tool_config));
        }
        let settings = normalized
            .tool(category, &selection.tool)
            .map(|block| block.settings.clone())
            .unwrap_or_default();

        let invocation = adapter.build(
            &settings,
            request.target.as_deref(),
            &request.custom_args,
        );
        let execution = ExecutionRequest {
            tool: selection.tool.clone(),
            program: invocation.program,
            args: invocation.args,
            work_dir: root,
            timeout,
        };

        info!(
            category = %category,
            tool = %selection.tool,
            reason = %selection.reason,
            "running tool"
        );
        let executor = Executor::new(self.executor_config.clone(), self.slots.clone())
            .with_cancellation(cancel);
        let result = executor
            .run(&execution)
            .map_err(|source| OrchestratorError::Execution {
                tool: selection.tool.clone(),
                source,
            })?;
        info!(
            tool = %result.tool,
            status = %result.status,
            duration_ms = result.duration_ms,
            "tool finished"
        );

        Ok(RunResponse {
            category: category.as_str().to_string(),
            tool: result.tool,
            reason: selection.reason,
            status: result.status,
            exit_code: result.exit_code,
            stdout: result.stdout,
            stderr: result.stderr,
            duration_ms: result.duration_ms,
            work_dir: result.work_dir.display().to_string(),
            command: result.command,
            started_at: result.started_at,
        })
    }
}

/// `tool_path` entries ahead of `PATH`; `None` leaves lookup on `PATH`.
fn search_path(project_root: &Path, tool_path: &[PathBuf]) -> Result<Option<OsString>, OrchestratorError> {
    if tool_path.is_empty() {
        return Ok(None);
    }
    let inherited = std::env::var_os("PATH").unwrap_or_default();
    let dirs = tool_path
        .iter()
        .map(|dir| project_root.join(dir))
        .chain(std::env::split_paths(&inherited));
    std::env::join_paths(dirs)
        .map(Some)
        .map_err(|e| OrchestratorError::Internal(format!("tool_path: {}", e)))
}

fn tool_report(block: &ToolBlock) -> ToolReport {
    ToolReport {
        config: block.settings.clone(),
        provenance: block
            .provenance
            .iter()
            .map(|(key, p)| {
                (
                    key.clone(),
                    ProvenanceReport {
                        source: p.source.clone(),
                        defined_in: p.defined_in.clone(),
                    },
                )
            })
            .collect(),
    }
}

fn file_report(source: &SourceRecord) -> ConfigFileReport {
    ConfigFileReport {
        path: source.path.clone(),
        pattern: source.pattern.to_string(),
        dialect: source.dialect.as_str().to_string(),
        rank: source.rank.as_str().to_string(),
        owner: source.owner.map(str::to_string),
        digest: source.digest.clone(),
        parsed: source.parsed,
    }
}
