//! Request line.

use serde::{Deserialize, Serialize};

/// One request line.
///
/// One JSON object per line on stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Protocol version spoken by the caller.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: i32,
    /// One of [`crate::ops::names`].
    pub op: String,
    /// Caller-chosen request ID for correlation and cancellation.
    pub request_id: String,
    /// Operation payload; its shape depends on `op`.
    #[serde(default)]
    pub payload: serde_json::Value,
}

fn default_protocol_version() -> i32 {
    crate::PROTOCOL_MAX
}

impl RpcRequest {
    /// Build a request for the current protocol version.
    pub fn new(op: impl Into<String>, request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            protocol_version: crate::PROTOCOL_MAX,
            op: op.into(),
            request_id: request_id.into(),
            payload,
        }
    }
}
