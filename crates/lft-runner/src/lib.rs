//! Process runner for external quality tools.
//!
//! Resolves a program on `PATH`, runs it in its own process group with
//! captured output, and enforces a timeout and cooperative cancellation.
//! A shared [`ProcessSlots`] limit caps how many tools run at once.

pub mod executor;
pub mod slots;

pub use executor::{
    ExecutionRequest, ExecutionResult, Executor, ExecutorConfig, ExecutorError, ExecutorResult,
};
pub use lft_protocol::ops::ExecutionStatus;
pub use slots::{GroupGuard, ProcessSlots, SlotGuard};
