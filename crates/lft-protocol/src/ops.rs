//! Operation-specific types.

pub mod cancel;
pub mod check;
pub mod detect;
pub mod run;

pub use cancel::{CancelRequest, CancelResponse};
pub use check::{CheckConfigRequest, CheckConfigResponse};
pub use detect::{
    CategoryReport, ConfigFileReport, DetectRequest, DetectResponse, ParseFailureReport,
    ProvenanceReport, SelectionReason, ToolReport,
};
pub use run::{ExecutionStatus, RunRequest, RunResponse};

/// Known operation names.
pub mod names {
    pub const DETECT_WORKSPACE_TOOLS: &str = "detect_workspace_tools";
    pub const LINT: &str = "lint";
    pub const FORMAT: &str = "format";
    pub const TEST: &str = "test";
    pub const CHECK_CONFIG_FILES: &str = "check_config_files";
    pub const CANCEL: &str = "cancel";
}
