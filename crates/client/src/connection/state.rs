//! Connection lifecycle state.
//!
//! The live socket owns the state cell; anything else observes it through a
//! cloned `ConnectionStateObserver`.

use std::cell::Cell;
use std::rc::Rc;

/// Connection state of the live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected and not trying to (before `connect` or after `disconnect`)
    #[default]
    Disconnected,
    /// First attempt of the session in progress
    Connecting,
    /// Channel joined, pushes flow
    Connected,
    /// Connection lost, waiting out the backoff or retrying
    Reconnecting,
}

/// Observable connection state.
///
/// Multiple observers share the same underlying cell.
#[derive(Clone, Default)]
pub struct ConnectionStateObserver {
    state: Rc<Cell<ConnectionState>>,
}

impl ConnectionStateObserver {
    pub fn new(state: Rc<Cell<ConnectionState>>) -> Self {
        Self { state }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Check if currently connected.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

/// Update the shared state cell, logging transitions.
pub(crate) fn set_connection_state(cell: &Cell<ConnectionState>, new_state: ConnectionState) {
    let old = cell.replace(new_state);
    if old != new_state {
        tracing::debug!(from = ?old, to = ?new_state, "Connection state changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observer_reads_state() {
        let state = Rc::new(Cell::new(ConnectionState::Disconnected));
        let observer = ConnectionStateObserver::new(Rc::clone(&state));

        assert_eq!(observer.state(), ConnectionState::Disconnected);
        assert!(!observer.is_connected());

        set_connection_state(&state, ConnectionState::Connected);

        assert_eq!(observer.state(), ConnectionState::Connected);
        assert!(observer.is_connected());
    }
}
