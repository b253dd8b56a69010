//! Browser transports: web-sys WebSocket and gloo-net long-poll.

mod longpoll;
mod websocket;

use async_trait::async_trait;
use url::Url;

use crate::error::TransportError;
use crate::ports::outbound::{Connector, TransportKind, TransportLink};

/// Opens browser sessions of either kind.
#[derive(Clone, Default)]
pub struct WasmConnector;

impl WasmConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait(?Send)]
impl Connector for WasmConnector {
    async fn open(&self, kind: TransportKind, url: &Url) -> Result<TransportLink, TransportError> {
        match kind {
            TransportKind::WebSocket => websocket::open(url).await,
            TransportKind::LongPoll => longpoll::open(url).await,
        }
    }
}
