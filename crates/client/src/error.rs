//! Error types for the client sync layer.

use gang_protocol::ProtocolError;

use crate::ports::outbound::TransportKind;

/// Errors that stop the application from starting.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The page carries no anti-forgery token; connecting would be unsafe.
    #[error("Anti-forgery token missing: no <meta name=\"{0}\"> with content on the page")]
    MissingCsrfToken(&'static str),

    #[error("Invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    Config { key: &'static str, message: String },
}

impl ClientError {
    pub fn invalid_endpoint(endpoint: impl ToString, message: impl ToString) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        }
    }

    pub fn config(key: &'static str, message: impl ToString) -> Self {
        Self::Config {
            key,
            message: message.to_string(),
        }
    }
}

/// Transport and session failures. These never leave the live socket: they
/// are logged and answered with a reconnect.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to open {kind} transport: {message}")]
    Open {
        kind: TransportKind,
        message: String,
    },

    #[error("Transport closed: {0}")]
    Closed(String),

    #[error("Join rejected with status '{0}'")]
    JoinRejected(String),

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl TransportError {
    pub fn open(kind: TransportKind, message: impl ToString) -> Self {
        Self::Open {
            kind,
            message: message.to_string(),
        }
    }
}

/// Clipboard write failures. Reported to diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("Clipboard write denied: {0}")]
    Denied(String),
}
