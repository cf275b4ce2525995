//! LFT Protocol Types
//!
//! Defines the JSON-lines request/response envelope used by callers of the
//! tool orchestration server, plus the payload shapes of each operation.

pub mod error;
pub mod ops;
pub mod request;
pub mod response;

pub use error::{ErrorKind, RpcError};
pub use request::RpcRequest;
pub use response::RpcResponse;

/// Minimum protocol version supported by this implementation.
pub const PROTOCOL_MIN: i32 = 1;

/// Maximum protocol version supported by this implementation.
pub const PROTOCOL_MAX: i32 = 1;

