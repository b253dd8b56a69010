//! Named events exchanged with the live server.
//!
//! Three directions exist:
//! - `ClientEvent`: pushed by a hook to the server
//! - `ServerEvent`: pushed by the server, handled by hooks (or re-broadcast)
//! - `BroadcastEvent`: page-wide notifications not scoped to a hook instance

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProtocolError;
use crate::identity::PlayerIdentity;

/// Wire names for every event this layer understands.
pub mod event_names {
    pub const RESTORE_PLAYER_INFO: &str = "restore_player_info";
    pub const SAVE_PLAYER_INFO: &str = "save_player_info";
    pub const COPY_TO_CLIPBOARD: &str = "copy_to_clipboard";
    pub const SCROLL_CHAT_TO_BOTTOM: &str = "scroll_chat_to_bottom";
    pub const PAGE_LOADING_START: &str = "page-loading-start";
    pub const PAGE_LOADING_STOP: &str = "page-loading-stop";

    /// Prefix used when a broadcast is dispatched as a DOM event on `window`.
    pub const DOM_EVENT_PREFIX: &str = "phx:";
}

// =============================================================================
// Client Events (client → server)
// =============================================================================

/// Events pushed from a hook to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Hand a cached identity back to the server for reconciliation
    RestorePlayerInfo(PlayerIdentity),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::RestorePlayerInfo(_) => event_names::RESTORE_PLAYER_INFO,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            ClientEvent::RestorePlayerInfo(identity) => serde_json::json!({
                "player_name": identity.name,
                "player_id": identity.id,
            }),
        }
    }
}

// =============================================================================
// Server Events (server → client)
// =============================================================================

/// Events pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Persist the server-assigned identity locally
    SavePlayerInfo(PlayerIdentity),
    /// Copy text to the system clipboard without a user click
    CopyToClipboard { text: String },
    /// New chat content was rendered somewhere on the page
    ScrollChatToBottom,
}

#[derive(Deserialize)]
struct CopyToClipboardPayload {
    text: String,
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::SavePlayerInfo(_) => event_names::SAVE_PLAYER_INFO,
            ServerEvent::CopyToClipboard { .. } => event_names::COPY_TO_CLIPBOARD,
            ServerEvent::ScrollChatToBottom => event_names::SCROLL_CHAT_TO_BOTTOM,
        }
    }

    /// Decode a named push from the server.
    ///
    /// Returns `Ok(None)` for names this layer does not handle (other hooks on
    /// the page may still care about them). A known name with a payload that
    /// violates its contract is an error.
    pub fn from_wire(name: &str, payload: Value) -> Result<Option<Self>, ProtocolError> {
        let event = match name {
            event_names::SAVE_PLAYER_INFO => {
                let identity: PlayerIdentity = serde_json::from_value(payload)
                    .map_err(|e| ProtocolError::invalid_payload(name, e))?;
                ServerEvent::SavePlayerInfo(identity)
            }
            event_names::COPY_TO_CLIPBOARD => {
                let CopyToClipboardPayload { text } = serde_json::from_value(payload)
                    .map_err(|e| ProtocolError::invalid_payload(name, e))?;
                ServerEvent::CopyToClipboard { text }
            }
            event_names::SCROLL_CHAT_TO_BOTTOM => ServerEvent::ScrollChatToBottom,
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Server pushes that are re-dispatched page-wide rather than to one hook.
    pub fn as_broadcast(&self) -> Option<BroadcastEvent> {
        match self {
            ServerEvent::ScrollChatToBottom => Some(BroadcastEvent::ScrollChatToBottom),
            _ => None,
        }
    }
}

// =============================================================================
// Broadcast Events (page-wide)
// =============================================================================

/// Page-wide notifications. None of them carry a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadcastEvent {
    ScrollChatToBottom,
    PageLoadingStart,
    PageLoadingStop,
}

impl BroadcastEvent {
    pub const ALL: [BroadcastEvent; 3] = [
        BroadcastEvent::ScrollChatToBottom,
        BroadcastEvent::PageLoadingStart,
        BroadcastEvent::PageLoadingStop,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BroadcastEvent::ScrollChatToBottom => event_names::SCROLL_CHAT_TO_BOTTOM,
            BroadcastEvent::PageLoadingStart => event_names::PAGE_LOADING_START,
            BroadcastEvent::PageLoadingStop => event_names::PAGE_LOADING_STOP,
        }
    }

    /// Name of the DOM event on `window`, e.g. `phx:page-loading-start`.
    pub fn dom_event_name(&self) -> String {
        format!("{}{}", event_names::DOM_EVENT_PREFIX, self.name())
    }

    pub fn from_dom_event_name(name: &str) -> Option<Self> {
        let bare = name.strip_prefix(event_names::DOM_EVENT_PREFIX)?;
        Self::ALL.into_iter().find(|event| event.name() == bare)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_player_info_decodes() {
        let event = ServerEvent::from_wire(
            event_names::SAVE_PLAYER_INFO,
            serde_json::json!({ "player_name": "Ava", "player_id": "p-42" }),
        )
        .expect("valid payload");

        assert_eq!(
            event,
            Some(ServerEvent::SavePlayerInfo(PlayerIdentity::new("Ava", "p-42")))
        );
    }

    #[test]
    fn test_copy_to_clipboard_missing_text_is_invalid() {
        let err = ServerEvent::from_wire(event_names::COPY_TO_CLIPBOARD, serde_json::json!({}))
            .expect_err("payload without text");

        assert!(matches!(err, ProtocolError::InvalidPayload { ref event, .. } if event == "copy_to_clipboard"));
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        let event = ServerEvent::from_wire("highlight_row", serde_json::json!({ "row": 3 }))
            .expect("unknown names are not errors");

        assert_eq!(event, None);
    }

    #[test]
    fn test_scroll_push_ignores_payload_and_broadcasts() {
        let event = ServerEvent::from_wire(event_names::SCROLL_CHAT_TO_BOTTOM, Value::Null)
            .expect("no payload needed")
            .expect("known event");

        assert_eq!(
            event.as_broadcast(),
            Some(BroadcastEvent::ScrollChatToBottom)
        );
    }

    #[test]
    fn test_restore_payload_shape() {
        let event = ClientEvent::RestorePlayerInfo(PlayerIdentity::new("Ava", "p-42"));

        assert_eq!(event.name(), "restore_player_info");
        assert_eq!(
            event.payload(),
            serde_json::json!({ "player_name": "Ava", "player_id": "p-42" })
        );
    }

    #[test]
    fn test_dom_event_names() {
        assert_eq!(
            BroadcastEvent::PageLoadingStart.dom_event_name(),
            "phx:page-loading-start"
        );
        assert_eq!(
            BroadcastEvent::from_dom_event_name("phx:page-loading-stop"),
            Some(BroadcastEvent::PageLoadingStop)
        );
        assert_eq!(BroadcastEvent::from_dom_event_name("page-loading-stop"), None);
    }
}
