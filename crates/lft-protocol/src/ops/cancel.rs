//! `cancel` operation types.
//!
//! Best-effort cancellation of an in-flight tool run.

use serde::{Deserialize, Serialize};

/// `cancel` request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    /// The request ID of the operation to cancel.
    pub request_id: String,
}

/// `cancel` response payload.
///
/// Only returned when the run was in flight; an unknown id is `NOT_FOUND`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    /// The request ID that was targeted.
    pub request_id: String,
    /// Whether the cancellation flag was raised.
    pub acknowledged: bool,
}
