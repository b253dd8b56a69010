//! Anonymous player identity assigned by the server.

use serde::{Deserialize, Serialize};

/// A (player-name, player-id) pair.
///
/// The server assigns the identity and the client caches it locally so it can
/// be handed back on the next page load or reconnect. On the wire both fields
/// are prefixed with `player_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerIdentity {
    #[serde(rename = "player_name")]
    pub name: String,
    #[serde(rename = "player_id")]
    pub id: String,
}

impl PlayerIdentity {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}
