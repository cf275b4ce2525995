//! LFT - workspace tool detection and orchestration
//!
//! Discovers which linter, formatter and test runner a Python project is
//! configured for, merges their settings from every known config file,
//! and runs the selected tool as an external process.

pub mod adapter;
pub mod catalog;
pub mod config;
pub mod locate;
pub mod merge;
pub mod orchestrator;
pub mod parse;
pub mod render;
pub mod rpc;
pub mod select;
pub mod signal;
pub mod timeout;

pub use catalog::{Category, Dialect, PrecedenceRank};
pub use config::{EffectiveConfig, ServerConfig};
pub use merge::{merge, NormalizedConfig};
pub use orchestrator::{Orchestrator, OrchestratorError};
pub use rpc::RpcHandler;
pub use select::{select, ToolSelection};
