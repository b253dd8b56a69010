//! Desktop transports: tokio-tungstenite WebSocket and reqwest long-poll.

mod longpoll;
mod websocket;

use async_trait::async_trait;
use url::Url;

use crate::error::TransportError;
use crate::ports::outbound::{Connector, TransportKind, TransportLink};

pub use longpoll::LongPollClient;

/// Opens desktop sessions of either kind.
#[derive(Clone, Default)]
pub struct DesktopConnector {
    long_poll: LongPollClient,
}

impl DesktopConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait(?Send)]
impl Connector for DesktopConnector {
    async fn open(&self, kind: TransportKind, url: &Url) -> Result<TransportLink, TransportError> {
        match kind {
            TransportKind::WebSocket => websocket::open(url).await,
            TransportKind::LongPoll => self.long_poll.open(url).await,
        }
    }
}
