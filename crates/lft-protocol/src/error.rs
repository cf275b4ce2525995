//! Error types for the RPC protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error kinds returned in RPC error responses.
///
/// Each pipeline stage reports its own kind so callers can tell a bad
/// workspace apart from a failed process launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed JSON, missing required fields, or invalid field values.
    InvalidRequest,
    /// Protocol version is outside the supported range.
    UnsupportedProtocol,
    /// Unknown operation requested.
    UnknownOperation,
    /// `work_dir` does not exist or is not a directory.
    InvalidWorkspace,
    /// The executor could not run the tool for infrastructure reasons.
    ExecutionFailed,
    /// The referenced request is not in flight.
    NotFound,
    /// Anything else; should not normally happen.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "INVALID_REQUEST"),
            Self::UnsupportedProtocol => write!(f, "UNSUPPORTED_PROTOCOL"),
            Self::UnknownOperation => write!(f, "UNKNOWN_OPERATION"),
            Self::InvalidWorkspace => write!(f, "INVALID_WORKSPACE"),
            Self::ExecutionFailed => write!(f, "EXECUTION_FAILED"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Structured error object returned across the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    /// Error kind from the registry.
    pub kind: ErrorKind,
    /// Human-readable, single-line error message.
    pub message: String,
    /// Optional machine-readable details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl RpcError {
    /// Create a new RPC error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new RPC error with additional details.
    pub fn with_details(
        kind: ErrorKind,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            details: Some(details),
        }
    }

    /// Create an INVALID_REQUEST error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// Create an UNSUPPORTED_PROTOCOL error.
    pub fn unsupported_protocol(version: i32, min: i32, max: i32) -> Self {
        Self::with_details(
            ErrorKind::UnsupportedProtocol,
            format!(
                "protocol_version {} is outside supported range [{}, {}]",
                version, min, max
            ),
            serde_json::json!({
                "requested": version,
                "min": min,
                "max": max
            }),
        )
    }

    /// Create an UNKNOWN_OPERATION error.
    pub fn unknown_operation(op: &str) -> Self {
        Self::with_details(
            ErrorKind::UnknownOperation,
            format!("unknown operation: {}", op),
            serde_json::json!({ "op": op }),
        )
    }

    /// Create an INVALID_WORKSPACE error.
    pub fn invalid_workspace(path: &str, reason: &str) -> Self {
        Self::with_details(
            ErrorKind::InvalidWorkspace,
            format!("invalid workspace '{}': {}", path, reason),
            serde_json::json!({ "work_dir": path, "reason": reason }),
        )
    }

    /// Create an EXECUTION_FAILED error.
    pub fn execution_failed(tool: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::with_details(
            ErrorKind::ExecutionFailed,
            format!("failed to execute '{}': {}", tool, reason),
            serde_json::json!({ "tool": tool, "reason": reason }),
        )
    }

    /// Create a NOT_FOUND error for a cancel target.
    pub fn request_not_found(request_id: &str) -> Self {
        Self::with_details(
            ErrorKind::NotFound,
            format!("request '{}' is not in flight", request_id),
            serde_json::json!({ "request_id": request_id }),
        )
    }

    /// Create an INTERNAL error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RpcError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_wire_format() {
        let json = serde_json::to_value(ErrorKind::InvalidWorkspace).unwrap();
        assert_eq!(json, "INVALID_WORKSPACE");
        assert_eq!(ErrorKind::ExecutionFailed.to_string(), "EXECUTION_FAILED");
    }

    #[test]
    fn test_invalid_workspace_details() {
        let err = RpcError::invalid_workspace("/nope", "does not exist");
        assert_eq!(err.kind, ErrorKind::InvalidWorkspace);
        assert!(err.message.contains("/nope"));
        let details = err.details.unwrap();
        assert_eq!(details["reason"], "does not exist");
    }

    #[test]
    fn test_serialized_shape_has_kind_message_details() {
        let err = RpcError::unknown_operation("frobnicate");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "UNKNOWN_OPERATION");
        assert_eq!(json["details"]["op"], "frobnicate");
        assert!(json["message"].as_str().unwrap().contains("frobnicate"));
    }

    #[test]
    fn test_details_omitted_when_absent() {
        let err = RpcError::internal("boom");
        let json = serde_json::to_string(&err).unwrap();
        assert!(!json.contains("details"));
    }
}
