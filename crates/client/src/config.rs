//! Client configuration.
//!
//! Native builds read `GANG_*` environment variables (after the binary has
//! loaded `.env` files); browser builds derive the endpoint from the page
//! location. Every value has a default matching the production client.

use crate::error::ClientError;

pub const DEFAULT_ENDPOINT: &str = "ws://localhost:4000/live";
pub const DEFAULT_TOPIC: &str = "lv:gang";

pub const DEFAULT_LONG_POLL_FALLBACK_MS: u64 = 2_500;
pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;

pub const DEFAULT_SCROLL_SETTLE_MS: u64 = 100;
pub const DEFAULT_SCROLL_REASSERT_MS: u64 = 10;
pub const DEFAULT_PROGRESS_DELAY_MS: u64 = 300;

/// Reconnect backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 50,
            max_delay_ms: 5_000,
            multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    /// Socket mount point, e.g. `wss://example.com/live`
    pub endpoint: String,
    /// Channel topic joined after the transport opens
    pub topic: String,
    /// `None` disables the long-poll fallback
    pub long_poll_fallback_ms: Option<u64>,
    pub join_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub backoff: BackoffConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            long_poll_fallback_ms: Some(DEFAULT_LONG_POLL_FALLBACK_MS),
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Delays used by the scroll synchronizer and the progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    pub scroll_settle_ms: u64,
    pub scroll_reassert_ms: u64,
    pub progress_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            scroll_settle_ms: DEFAULT_SCROLL_SETTLE_MS,
            scroll_reassert_ms: DEFAULT_SCROLL_REASSERT_MS,
            progress_delay_ms: DEFAULT_PROGRESS_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientConfig {
    pub connection: ConnectionConfig,
    pub timing: TimingConfig,
    /// Token for hosts without a rendered page (native headless runs)
    pub csrf_token: Option<String>,
}

impl ClientConfig {
    /// Load from `GANG_*` environment variables.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let mut config = Self::default();

        if let Some(endpoint) = lookup("GANG_ENDPOINT") {
            config.connection.endpoint = endpoint;
        }
        if let Some(topic) = lookup("GANG_TOPIC") {
            config.connection.topic = topic;
        }
        if let Some(raw) = lookup("GANG_LONG_POLL_FALLBACK_MS") {
            config.connection.long_poll_fallback_ms = match raw.trim() {
                "off" | "0" => None,
                value => Some(parse_ms("GANG_LONG_POLL_FALLBACK_MS", value)?),
            };
        }
        if let Some(raw) = lookup("GANG_JOIN_TIMEOUT_MS") {
            config.connection.join_timeout_ms = parse_ms("GANG_JOIN_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("GANG_HEARTBEAT_MS") {
            config.connection.heartbeat_interval_ms = parse_ms("GANG_HEARTBEAT_MS", &raw)?;
        }
        config.csrf_token = lookup("GANG_CSRF_TOKEN").filter(|t| !t.is_empty());

        Ok(config)
    }

    /// Defaults with the endpoint derived from the page location.
    ///
    /// `protocol` is `location.protocol` (`"https:"` or `"http:"`), `host`
    /// is `location.host`.
    pub fn for_location(protocol: &str, host: &str) -> Self {
        let scheme = if protocol == "https:" { "wss" } else { "ws" };
        let mut config = Self::default();
        config.connection.endpoint = format!("{scheme}://{host}/live");
        config
    }
}

fn parse_ms(key: &'static str, raw: &str) -> Result<u64, ClientError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ClientError::config(key, format!("'{raw}' is not a millisecond count: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = ClientConfig::from_lookup(|_| None).expect("defaults");

        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.connection.long_poll_fallback_ms, Some(2_500));
        assert_eq!(config.timing.progress_delay_ms, 300);
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("GANG_ENDPOINT", "wss://gang.example/live"),
            ("GANG_LONG_POLL_FALLBACK_MS", "off"),
            ("GANG_HEARTBEAT_MS", "15000"),
            ("GANG_CSRF_TOKEN", "tok"),
        ]))
        .expect("valid config");

        assert_eq!(config.connection.endpoint, "wss://gang.example/live");
        assert_eq!(config.connection.long_poll_fallback_ms, None);
        assert_eq!(config.connection.heartbeat_interval_ms, 15_000);
        assert_eq!(config.csrf_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_bad_number_names_the_key() {
        let err = ClientConfig::from_lookup(lookup_from(&[("GANG_JOIN_TIMEOUT_MS", "soon")]))
            .expect_err("not a number");

        assert!(matches!(err, ClientError::Config { key: "GANG_JOIN_TIMEOUT_MS", .. }));
    }

    #[test]
    fn test_endpoint_follows_page_scheme() {
        assert_eq!(
            ClientConfig::for_location("https:", "gang.example").connection.endpoint,
            "wss://gang.example/live"
        );
        assert_eq!(
            ClientConfig::for_location("http:", "localhost:4000").connection.endpoint,
            "ws://localhost:4000/live"
        );
    }
}
