//! Transport adapters behind the `Connector` port.
//!
//! Each platform provides a WebSocket and a long-poll session; the
//! platform connector picks one by `TransportKind`.

#[cfg(not(target_arch = "wasm32"))]
pub mod desktop;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

#[cfg(not(target_arch = "wasm32"))]
pub use desktop::DesktopConnector;

#[cfg(target_arch = "wasm32")]
pub use wasm::WasmConnector;

use url::Url;

use gang_protocol::{Frame, LongPollEnvelope};

/// What a single long-poll response means for the session.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PollOutcome {
    Frames(Vec<Frame>),
    /// Poll timed out server-side; poll again
    Idle,
    /// The session is gone; the socket must reconnect
    Lost(String),
}

impl PollOutcome {
    pub(crate) fn from_envelope(envelope: &LongPollEnvelope) -> Self {
        match envelope.status {
            LongPollEnvelope::STATUS_OK => match envelope.frames() {
                Ok(frames) => PollOutcome::Frames(frames),
                Err(e) => PollOutcome::Lost(e.to_string()),
            },
            LongPollEnvelope::STATUS_NO_CONTENT => PollOutcome::Idle,
            LongPollEnvelope::STATUS_GONE => PollOutcome::Lost("poll session expired".to_string()),
            other => PollOutcome::Lost(format!("unexpected poll status {other}")),
        }
    }
}

/// Long-poll URL for an established poll session.
pub(crate) fn with_poll_token(url: &Url, token: Option<&str>) -> Url {
    let mut url = url.clone();
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "token")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        for (key, value) in &retained {
            query.append_pair(key, value);
        }
        if let Some(token) = token {
            query.append_pair("token", token);
        }
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_outcomes() {
        let ok = LongPollEnvelope {
            status: 200,
            token: Some("t".into()),
            messages: vec![r#"[null,"1","phoenix","phx_reply",{"status":"ok"}]"#.into()],
        };
        let idle = LongPollEnvelope {
            status: 204,
            token: Some("t".into()),
            messages: Vec::new(),
        };
        let gone = LongPollEnvelope {
            status: 410,
            token: Some("u".into()),
            messages: Vec::new(),
        };

        assert!(matches!(PollOutcome::from_envelope(&ok), PollOutcome::Frames(f) if f.len() == 1));
        assert_eq!(PollOutcome::from_envelope(&idle), PollOutcome::Idle);
        assert!(matches!(PollOutcome::from_envelope(&gone), PollOutcome::Lost(_)));
    }

    #[test]
    fn test_garbled_message_loses_session() {
        let envelope = LongPollEnvelope {
            status: 200,
            token: None,
            messages: vec!["{}".into()],
        };

        assert!(matches!(PollOutcome::from_envelope(&envelope), PollOutcome::Lost(_)));
    }

    #[test]
    fn test_poll_token_replaces_previous() {
        let url = Url::parse("http://localhost:4000/live/longpoll?vsn=2.0.0&token=old")
            .expect("url");

        let next = with_poll_token(&url, Some("new"));

        assert_eq!(
            next.as_str(),
            "http://localhost:4000/live/longpoll?vsn=2.0.0&token=new"
        );
    }

    #[test]
    fn test_no_token_keeps_handshake_params() {
        let url = Url::parse("http://h/live/longpoll?_csrf_token=t&player_name=Ava").expect("url");

        let next = with_poll_token(&url, None);

        assert_eq!(next.query(), Some("_csrf_token=t&player_name=Ava"));
    }
}
