//! Socket endpoint and per-transport URLs.

use url::Url;

use gang_protocol::{ConnectParams, PROTOCOL_VSN};

use crate::error::ClientError;
use crate::ports::outbound::TransportKind;

/// The socket mount point, e.g. `wss://gang.example/live`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: Url,
}

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self, ClientError> {
        let base = Url::parse(raw).map_err(|e| ClientError::invalid_endpoint(raw, e))?;
        match base.scheme() {
            "ws" | "wss" | "http" | "https" => Ok(Self { base }),
            other => Err(ClientError::invalid_endpoint(
                raw,
                format!("unsupported scheme '{other}'"),
            )),
        }
    }

    /// URL for one attempt over `kind`, carrying `params` in the query.
    ///
    /// WebSocket uses `ws`/`wss`, long-poll uses `http`/`https`.
    pub fn url_for(&self, kind: TransportKind, params: &ConnectParams) -> Url {
        let secure = matches!(self.base.scheme(), "wss" | "https");
        let (scheme, suffix) = match kind {
            TransportKind::WebSocket => (if secure { "wss" } else { "ws" }, "websocket"),
            TransportKind::LongPoll => (if secure { "https" } else { "http" }, "longpoll"),
        };

        let mut url = self.base.clone();
        // ws, wss, http and https are all special schemes, so switching between them succeeds
        if url.set_scheme(scheme).is_err() {
            tracing::warn!(endpoint = %self.base, scheme, "Could not switch endpoint scheme");
        }
        let path = format!("{}/{}", self.base.path().trim_end_matches('/'), suffix);
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params.iter() {
                query.append_pair(key, value);
            }
            query.append_pair("vsn", PROTOCOL_VSN);
        }
        url
    }
}
