//! Cancellation registry and SIGINT/SIGTERM handling.
//!
//! Every running tool invocation registers a cancellation flag under its
//! request id. A `cancel` request flips one flag; the first signal flips
//! all of them and the executor terminates each process group. A second
//! signal SIGKILLs every tool process group still running and exits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use lft_runner::ProcessSlots;
use tracing::warn;

/// Exit code after a second interrupt.
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// In-flight cancellation flags keyed by request id.
#[derive(Debug, Default)]
pub struct CancelRegistry {
    flags: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `request_id`; `None` if it is already in flight.
    pub fn register(&self, request_id: &str) -> Option<Arc<AtomicBool>> {
        let mut flags = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
        if flags.contains_key(request_id) {
            return None;
        }
        let flag = Arc::new(AtomicBool::new(false));
        flags.insert(request_id.to_string(), Arc::clone(&flag));
        Some(flag)
    }

    pub fn unregister(&self, request_id: &str) {
        self.flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(request_id);
    }

    /// Cancel one request. False if it is not in flight.
    pub fn cancel(&self, request_id: &str) -> bool {
        let flags = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
        match flags.get(request_id) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Cancel everything in flight, returning how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let flags = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
        for flag in flags.values() {
            flag.store(true, Ordering::SeqCst);
        }
        flags.len()
    }

    /// Request ids in flight, sorted.
    pub fn in_flight(&self) -> Vec<String> {
        let flags = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = flags.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Action to take after receiving a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: cancel every in-flight run
    CancelInFlight,
    /// Second signal: tool groups killed, exit immediately
    ImmediateExit,
    /// Third+ signal: ignore
    Ignore,
}

/// Signal counter bound to a registry.
#[derive(Debug)]
pub struct SignalState {
    signal_count: AtomicU8,
    registry: Arc<CancelRegistry>,
    slots: ProcessSlots,
}

impl SignalState {
    pub fn new(registry: Arc<CancelRegistry>, slots: ProcessSlots) -> Self {
        Self {
            signal_count: AtomicU8::new(0),
            registry,
            slots,
        }
    }

    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    /// Handle a signal (SIGINT/SIGTERM)
    pub fn handle_signal(&self) -> SignalAction {
        let count = self.signal_count.fetch_add(1, Ordering::SeqCst);
        match count {
            0 => {
                let cancelled = self.registry.cancel_all();
                warn!(cancelled, "interrupt received, cancelling running tools");
                SignalAction::CancelInFlight
            }
            1 => {
                let killed = self.slots.kill_groups();
                warn!(killed, "second interrupt, killed running tools");
                SignalAction::ImmediateExit
            }
            _ => SignalAction::Ignore,
        }
    }
}

/// Install the process-wide SIGINT/SIGTERM handler.
///
/// Must be called at most once per process.
pub fn install(state: Arc<SignalState>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        if state.handle_signal() == SignalAction::ImmediateExit {
            eprintln!("\nReceived second interrupt, exiting immediately...");
            std::process::exit(EXIT_CODE_INTERRUPTED);
        }
    })
}
