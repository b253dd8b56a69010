//! Channel frames.
//!
//! Frames use the Phoenix V2 JSON serializer layout, a five element array:
//! `[join_ref, ref, topic, event, payload]`. The same text encoding travels
//! over the WebSocket transport and inside long-poll envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::events::ClientEvent;
use crate::params::ConnectParams;

/// Serializer version announced in the handshake query string.
pub const PROTOCOL_VSN: &str = "2.0.0";

/// Topic reserved for socket-level traffic such as heartbeats.
pub const PHOENIX_TOPIC: &str = "phoenix";

/// Channel-level event names.
pub mod frame_events {
    pub const JOIN: &str = "phx_join";
    pub const REPLY: &str = "phx_reply";
    pub const CLOSE: &str = "phx_close";
    pub const ERROR: &str = "phx_error";
    pub const HEARTBEAT: &str = "heartbeat";
    /// Client hook push
    pub const HOOK_EVENT: &str = "event";
    /// Server render diff, may carry pushed events under `e`
    pub const DIFF: &str = "diff";
}

#[derive(Serialize, Deserialize)]
struct WireFrame(Option<String>, Option<String>, String, String, Value);

/// A single channel message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireFrame", into = "WireFrame")]
pub struct Frame {
    pub join_ref: Option<String>,
    pub msg_ref: Option<String>,
    pub topic: String,
    pub event: String,
    pub payload: Value,
}

impl From<WireFrame> for Frame {
    fn from(WireFrame(join_ref, msg_ref, topic, event, payload): WireFrame) -> Self {
        Self {
            join_ref,
            msg_ref,
            topic,
            event,
            payload,
        }
    }
}

impl From<Frame> for WireFrame {
    fn from(frame: Frame) -> Self {
        WireFrame(
            frame.join_ref,
            frame.msg_ref,
            frame.topic,
            frame.event,
            frame.payload,
        )
    }
}

/// A named event pushed by the server inside a diff.
#[derive(Debug, Clone, PartialEq)]
pub struct PushEvent {
    pub name: String,
    pub payload: Value,
}

impl Frame {
    /// Join request for `topic`; the join ref doubles as the message ref.
    pub fn join(join_ref: &str, topic: &str, params: &ConnectParams) -> Self {
        Self {
            join_ref: Some(join_ref.to_string()),
            msg_ref: Some(join_ref.to_string()),
            topic: topic.to_string(),
            event: frame_events::JOIN.to_string(),
            payload: serde_json::json!({ "params": params.to_json() }),
        }
    }

    pub fn heartbeat(msg_ref: &str) -> Self {
        Self {
            join_ref: None,
            msg_ref: Some(msg_ref.to_string()),
            topic: PHOENIX_TOPIC.to_string(),
            event: frame_events::HEARTBEAT.to_string(),
            payload: Value::Object(Default::default()),
        }
    }

    /// Wrap a hook push for the joined topic.
    pub fn hook_event(join_ref: &str, msg_ref: &str, topic: &str, event: &ClientEvent) -> Self {
        Self {
            join_ref: Some(join_ref.to_string()),
            msg_ref: Some(msg_ref.to_string()),
            topic: topic.to_string(),
            event: frame_events::HOOK_EVENT.to_string(),
            payload: serde_json::json!({
                "type": "hook",
                "event": event.name(),
                "value": event.payload(),
            }),
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
    }

    pub fn is_reply_to(&self, msg_ref: &str) -> bool {
        self.event == frame_events::REPLY && self.msg_ref.as_deref() == Some(msg_ref)
    }

    /// `status` of a `phx_reply` payload (`ok` or `error`).
    pub fn reply_status(&self) -> Option<&str> {
        if self.event != frame_events::REPLY {
            return None;
        }
        self.payload.get("status").and_then(Value::as_str)
    }

    /// The server closed or crashed the channel; the client must rejoin.
    pub fn is_channel_close(&self) -> bool {
        self.event == frame_events::CLOSE || self.event == frame_events::ERROR
    }

    /// Events pushed by the server, in the order they were sent.
    ///
    /// Pushes ride on render diffs, either as a standalone `diff` frame or
    /// inside the `response.diff` of a reply.
    pub fn push_events(&self) -> Vec<PushEvent> {
        let diff = match self.event.as_str() {
            frame_events::DIFF => Some(&self.payload),
            frame_events::REPLY => self.payload.get("response").and_then(|r| r.get("diff")),
            _ => None,
        };

        let Some(entries) = diff.and_then(|d| d.get("e")).and_then(Value::as_array) else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| {
                let pair = entry.as_array()?;
                let name = pair.first()?.as_str()?.to_string();
                let payload = pair.get(1).cloned().unwrap_or(Value::Null);
                Some(PushEvent { name, payload })
            })
            .collect()
    }
}
