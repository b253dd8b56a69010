//! Long-poll response envelope.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::frame::Frame;

/// Body returned by every long-poll GET.
///
/// `status` mirrors HTTP semantics:
/// - `410`: a new poll session was opened; `token` must be echoed back
/// - `200`: `messages` holds encoded frames
/// - `204`: the poll timed out without messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongPollEnvelope {
    pub status: u16,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl LongPollEnvelope {
    pub const STATUS_OK: u16 = 200;
    pub const STATUS_NO_CONTENT: u16 = 204;
    pub const STATUS_GONE: u16 = 410;

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))
    }

    /// Decode the carried frames, stopping at the first malformed one.
    pub fn frames(&self) -> Result<Vec<Frame>, ProtocolError> {
        self.messages.iter().map(|m| Frame::decode(m)).collect()
    }
}
