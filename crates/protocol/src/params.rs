//! Connection handshake parameters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Handshake parameter keys.
pub mod param_keys {
    pub const CSRF_TOKEN: &str = "_csrf_token";
    pub const PLAYER_NAME: &str = "player_name";
    pub const PLAYER_ID: &str = "player_id";
}

/// Key-value bundle sent on every connection attempt.
///
/// Built fresh per attempt and never stored. Missing identity fields are sent
/// as empty strings so the server always sees the same key set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectParams(BTreeMap<String, String>);

impl ConnectParams {
    /// Build the standard bundle from the page token and the cached identity fields.
    pub fn new(csrf_token: &str, player_name: Option<&str>, player_id: Option<&str>) -> Self {
        let mut params = BTreeMap::new();
        params.insert(param_keys::CSRF_TOKEN.to_string(), csrf_token.to_string());
        params.insert(
            param_keys::PLAYER_NAME.to_string(),
            player_name.unwrap_or_default().to_string(),
        );
        params.insert(
            param_keys::PLAYER_ID.to_string(),
            player_id.unwrap_or_default().to_string(),
        );
        Self(params)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn csrf_token(&self) -> &str {
        self.get(param_keys::CSRF_TOKEN).unwrap_or_default()
    }

    pub fn player_name(&self) -> &str {
        self.get(param_keys::PLAYER_NAME).unwrap_or_default()
    }

    pub fn player_id(&self) -> &str {
        self.get(param_keys::PLAYER_ID).unwrap_or_default()
    }

    /// Iterate parameters in key order (used to build query strings).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_identity_sends_empty_strings() {
        let params = ConnectParams::new("tok", None, None);

        assert_eq!(params.csrf_token(), "tok");
        assert_eq!(params.player_name(), "");
        assert_eq!(params.player_id(), "");
        assert_eq!(params.iter().count(), 3);
    }

    #[test]
    fn test_fields_fall_back_independently() {
        let params = ConnectParams::new("tok", Some("Ava"), None);

        assert_eq!(params.player_name(), "Ava");
        assert_eq!(params.player_id(), "");
    }

    #[test]
    fn test_json_shape() {
        let params = ConnectParams::new("tok", Some("Ava"), Some("p-42"));

        assert_eq!(
            params.to_json(),
            serde_json::json!({
                "_csrf_token": "tok",
                "player_name": "Ava",
                "player_id": "p-42",
            })
        );
    }
}
