//! Error types for decoding wire data.

/// Errors raised while decoding frames and event payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The frame text is not a valid `[join_ref, ref, topic, event, payload]` array.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// A known event arrived with a payload that does not match its contract.
    #[error("Invalid payload for event '{event}': {message}")]
    InvalidPayload { event: String, message: String },

    /// A long-poll response body could not be decoded.
    #[error("Malformed long-poll envelope: {0}")]
    MalformedEnvelope(String),
}

impl ProtocolError {
    /// Create an InvalidPayload error with event name context.
    pub fn invalid_payload(event: impl ToString, message: impl ToString) -> Self {
        Self::InvalidPayload {
            event: event.to_string(),
            message: message.to_string(),
        }
    }
}
