//! RPC response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;

/// One response line. Exactly one of `payload` and `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub protocol_version: i32,
    /// Copied from the request; empty when the request line was unreadable.
    pub request_id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(protocol_version: i32, request_id: String, payload: Value) -> Self {
        Self::from_result(protocol_version, request_id, Ok(payload))
    }

    pub fn error(protocol_version: i32, request_id: String, error: RpcError) -> Self {
        Self::from_result(protocol_version, request_id, Err(error))
    }

    /// Wrap an operation outcome.
    pub fn from_result(
        protocol_version: i32,
        request_id: String,
        result: Result<Value, RpcError>,
    ) -> Self {
        let (ok, payload, error) = match result {
            Ok(payload) => (true, Some(payload), None),
            Err(error) => (false, None, Some(error)),
        };
        Self {
            protocol_version,
            request_id,
            ok,
            payload,
            error,
        }
    }

    /// The payload, or the error if the call failed.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match (self.payload, self.error) {
            (_, Some(error)) => Err(error),
            (Some(payload), None) => Ok(payload),
            (None, None) => Ok(Value::Null),
        }
    }
}
