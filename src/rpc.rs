//! JSON-lines RPC handler.
//!
//! Each input line is one request; each output line is one response,
//! correlated by `request_id`. Requests run concurrently on scoped threads
//! and responses are written whole under a mutex, so they may arrive out
//! of order. Run requests are registered for cancellation before the next
//! line is read.

use std::io::{self, BufRead, Write};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use lft_protocol::ops::{
    names, CancelRequest, CancelResponse, CheckConfigRequest, DetectRequest, RunRequest,
};
use lft_protocol::{RpcError, RpcRequest, RpcResponse, PROTOCOL_MAX, PROTOCOL_MIN};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::Category;
use crate::orchestrator::Orchestrator;
use crate::signal::CancelRegistry;

enum Admission {
    Respond(RpcResponse),
    Spawn(RpcRequest, Option<Arc<AtomicBool>>),
}

/// RPC handler bound to one orchestrator.
pub struct RpcHandler {
    orchestrator: Orchestrator,
    registry: Arc<CancelRegistry>,
}

impl RpcHandler {
    pub fn new(orchestrator: Orchestrator, registry: Arc<CancelRegistry>) -> Self {
        Self {
            orchestrator,
            registry,
        }
    }

    /// Serve stdin/stdout until stdin closes.
    pub fn run(&self) -> io::Result<()> {
        self.run_with_io(&mut io::stdin().lock(), io::stdout())
    }

    /// Serve custom I/O; returns once input ends and every request has
    /// been answered.
    pub fn run_with_io<R: BufRead, W: Write + Send>(&self, reader: &mut R, writer: W) -> io::Result<()> {
        let writer = Mutex::new(writer);
        thread::scope(|scope| {
            let mut line = String::new();
            loop {
                line.clear();
                if reader.read_line(&mut line)? == 0 {
                    break;
                }
                if line.trim().is_empty() {
                    continue;
                }
                match self.admit(&line) {
                    Admission::Respond(response) => write_response(&writer, &response)?,
                    Admission::Spawn(request, cancel) => {
                        let writer = &writer;
                        scope.spawn(move || {
                            let response = self.dispatch(&request, cancel);
                            if let Err(e) = write_response(writer, &response) {
                                warn!(request_id = %request.request_id, error = %e, "failed to write response");
                            }
                        });
                    }
                }
            }
            debug!("input closed, waiting for in-flight requests");
            Ok(())
        })
    }

    /// Handle one line synchronously.
    pub fn handle_line(&self, line: &str) -> RpcResponse {
        match self.admit(line) {
            Admission::Respond(response) => response,
            Admission::Spawn(request, cancel) => self.dispatch(&request, cancel),
        }
    }

    /// Parse and validate a request, registering runs for cancellation.
    fn admit(&self, line: &str) -> Admission {
        let request = match read_request(line) {
            Ok(request) => request,
            Err((request_id, e)) => {
                return Admission::Respond(RpcResponse::error(PROTOCOL_MAX, request_id, e));
            }
        };
        if let Err(e) = validate_protocol_version(&request) {
            return Admission::Respond(RpcResponse::error(
                request.protocol_version,
                request.request_id.clone(),
                e,
            ));
        }

        match request.op.as_str() {
            names::CANCEL => Admission::Respond(self.dispatch(&request, None)),
            names::LINT | names::FORMAT | names::TEST if !request.request_id.is_empty() => {
                match self.registry.register(&request.request_id) {
                    Some(flag) => Admission::Spawn(request, Some(flag)),
                    None => {
                        let e = RpcError::invalid_request(format!(
                            "request_id '{}' is already in flight",
                            request.request_id
                        ));
                        Admission::Respond(RpcResponse::error(
                            request.protocol_version,
                            request.request_id.clone(),
                            e,
                        ))
                    }
                }
            }
            _ => Admission::Spawn(request, None),
        }
    }

    /// Run one admitted request to its response.
    fn dispatch(&self, request: &RpcRequest, cancel: Option<Arc<AtomicBool>>) -> RpcResponse {
        let registered = cancel.is_some();
        let cancel = cancel.unwrap_or_default();

        let result = match request.op.as_str() {
            names::DETECT_WORKSPACE_TOOLS => self.handle_detect(&request.payload),
            names::CHECK_CONFIG_FILES => self.handle_check(&request.payload),
            names::LINT => self.handle_run(Category::Lint, &request.payload, cancel),
            names::FORMAT => self.handle_run(Category::Format, &request.payload, cancel),
            names::TEST => self.handle_run(Category::Test, &request.payload, cancel),
            names::CANCEL => self.handle_cancel(&request.payload),
            _ => Err(RpcError::unknown_operation(&request.op)),
        };
        if registered {
            self.registry.unregister(&request.request_id);
        }

        RpcResponse::from_result(request.protocol_version, request.request_id.clone(), result)
    }

    fn handle_detect(&self, payload: &Value) -> Result<Value, RpcError> {
        let request: DetectRequest = decode(payload)?;
        let response = self
            .orchestrator
            .detect_workspace_tools(&request.work_dir)
            .map_err(|e| e.to_rpc())?;
        encode(&response)
    }

    fn handle_check(&self, payload: &Value) -> Result<Value, RpcError> {
        let request: CheckConfigRequest = decode(payload)?;
        let response = self
            .orchestrator
            .check_config_files(&request.work_dir)
            .map_err(|e| e.to_rpc())?;
        encode(&response)
    }

    fn handle_run(&self, category: Category, payload: &Value, cancel: Arc<AtomicBool>) -> Result<Value, RpcError> {
        let request: RunRequest = decode(payload)?;
        let response = self
            .orchestrator
            .run(category, &request, cancel)
            .map_err(|e| e.to_rpc())?;
        encode(&response)
    }

    fn handle_cancel(&self, payload: &Value) -> Result<Value, RpcError> {
        let request: CancelRequest = decode(payload)?;
        if !self.registry.cancel(&request.request_id) {
            return Err(RpcError::request_not_found(&request.request_id));
        }
        debug!(request_id = %request.request_id, "cancellation requested");
        encode(&CancelResponse {
            request_id: request.request_id,
            acknowledged: true,
        })
    }
}

/// Parse one request line. On failure, the request id is recovered when
/// the line is at least a JSON object carrying one.
fn read_request(line: &str) -> Result<RpcRequest, (String, RpcError)> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| (String::new(), RpcError::invalid_request(format!("invalid JSON: {}", e))))?;
    let request_id = value
        .get("request_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    serde_json::from_value(value)
        .map_err(|e| (request_id, RpcError::invalid_request(format!("invalid request: {}", e))))
}

fn validate_protocol_version(request: &RpcRequest) -> Result<(), RpcError> {
    if request.protocol_version < PROTOCOL_MIN || request.protocol_version > PROTOCOL_MAX {
        return Err(RpcError::unsupported_protocol(
            request.protocol_version,
            PROTOCOL_MIN,
            PROTOCOL_MAX,
        ));
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(payload: &Value) -> Result<T, RpcError> {
    serde_json::from_value(payload.clone())
        .map_err(|e| RpcError::invalid_request(format!("invalid payload: {}", e)))
}

fn encode<T: Serialize>(response: &T) -> Result<Value, RpcError> {
    serde_json::to_value(response).map_err(|e| RpcError::internal(e.to_string()))
}

fn write_response<W: Write>(writer: &Mutex<W>, response: &RpcResponse) -> io::Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut writer = writer.lock().unwrap_or_else(PoisonError::into_inner);
    writeln!(writer, "{}", json)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use lft_protocol::ErrorKind;
    use serde_json::json;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn handler() -> RpcHandler {
        let orchestrator = Orchestrator::new(ServerConfig::default()).unwrap();
        RpcHandler::new(orchestrator, Arc::new(CancelRegistry::new()))
    }

    fn line(op: &str, request_id: &str, payload: Value) -> String {
        json!({"protocol_version": 1, "op": op, "request_id": request_id, "payload": payload}).to_string()
    }

    #[test]
    fn test_detect_round_trip() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ruff.toml"), "line-length = 100\n").unwrap();

        let response = handler().handle_line(&line(
            names::DETECT_WORKSPACE_TOOLS,
            "r-1",
            json!({"work_dir": dir.path()}),
        ));

        assert!(response.ok, "{:?}", response.error);
        assert_eq!(response.request_id, "r-1");
        let payload = response.payload.unwrap();
        assert_eq!(payload["categories"]["lint"]["selected_tool"], "ruff");
        assert_eq!(payload["categories"]["lint"]["config"]["line-length"], 100);
    }

    #[test]
    fn test_invalid_json() {
        let response = handler().handle_line("{not json");
        assert!(!response.ok);
        assert_eq!(response.error.unwrap().kind, ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_request_id_recovered_from_bad_request() {
        let response = handler().handle_line(r#"{"request_id": "r-9", "op": 5}"#);
        assert_eq!(response.request_id, "r-9");
        assert_eq!(response.error.unwrap().kind, ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_unsupported_protocol() {
        let input = json!({"protocol_version": 99, "op": "lint", "request_id": "r-2", "payload": {}});
        let response = handler().handle_line(&input.to_string());
        assert_eq!(response.error.unwrap().kind, ErrorKind::UnsupportedProtocol);
    }

    #[test]
    fn test_unknown_operation() {
        let response = handler().handle_line(&line("explode", "r-3", json!({})));
        assert_eq!(response.error.unwrap().kind, ErrorKind::UnknownOperation);
    }

    #[test]
    fn test_missing_work_dir_is_invalid_workspace() {
        let response = handler().handle_line(&line(
            names::CHECK_CONFIG_FILES,
            "r-4",
            json!({"work_dir": "/nonexistent/lft/workspace"}),
        ));
        assert_eq!(response.error.unwrap().kind, ErrorKind::InvalidWorkspace);
    }

    #[test]
    fn test_bad_payload() {
        let response = handler().handle_line(&line(names::LINT, "r-5", json!({"target": 3})));
        assert_eq!(response.error.unwrap().kind, ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_cancel_unknown_request() {
        let response = handler().handle_line(&line(names::CANCEL, "r-6", json!({"request_id": "nope"})));
        assert_eq!(response.error.unwrap().kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_unlisted_tool_rejected_and_unregistered() {
        let dir = TempDir::new().unwrap();
        let handler = handler();
        let response = handler.handle_line(&line(
            names::LINT,
            "r-7",
            json!({"work_dir": dir.path(), "exact_tool": "sh", "target": "-c", "custom_args": ["touch created"]}),
        ));
        assert!(!response.ok);
        assert_eq!(response.error.unwrap().kind, ErrorKind::InvalidRequest);
        assert!(!dir.path().join("created").exists());
        assert!(handler.registry.in_flight().is_empty());
    }

    #[test]
    fn test_run_with_io_answers_every_line() {
        let dir = TempDir::new().unwrap();
        let input = format!(
            "{}\n\n{}\n{}\n",
            line(names::CHECK_CONFIG_FILES, "a", json!({"work_dir": dir.path()})),
            line(names::DETECT_WORKSPACE_TOOLS, "b", json!({"work_dir": dir.path()})),
            line("bogus", "c", json!({})),
        );
        let mut output = Vec::new();
        handler()
            .run_with_io(&mut Cursor::new(input), &mut output)
            .unwrap();

        let mut ids: Vec<String> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str::<RpcResponse>(l).unwrap().request_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
