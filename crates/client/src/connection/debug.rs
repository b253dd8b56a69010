//! Developer diagnostics toggles for the live socket.

use std::cell::Cell;
use std::rc::Rc;

/// Runtime switches for frame logging and simulated latency.
///
/// Cloned handles share the same switches. Only reachable through
/// `AppContext::debug_console`.
#[derive(Clone, Default)]
pub struct DebugConsole {
    verbose: Rc<Cell<bool>>,
    latency_ms: Rc<Cell<Option<u64>>>,
}

impl DebugConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log every frame sent and received.
    pub fn enable_debug(&self) {
        self.verbose.set(true);
        tracing::info!("Socket debug logging enabled");
    }

    pub fn disable_debug(&self) {
        self.verbose.set(false);
    }

    /// Delay every outbound send and inbound dispatch by `ms`.
    pub fn enable_latency_sim(&self, ms: u64) {
        self.latency_ms.set(Some(ms));
        tracing::info!(latency_ms = ms, "Latency simulation enabled");
    }

    pub fn disable_latency_sim(&self) {
        self.latency_ms.set(None);
    }

    pub fn verbose(&self) -> bool {
        self.verbose.get()
    }

    pub fn latency_ms(&self) -> Option<u64> {
        self.latency_ms.get().filter(|ms| *ms > 0)
    }
}
