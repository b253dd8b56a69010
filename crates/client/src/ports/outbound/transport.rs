//! Duplex transport port.
//!
//! A `Connector` opens one transport session and hands back a pair of
//! channels. The adapter owns the socket (or poll loop) and feeds decoded
//! frames into `inbound`; the live socket writes frames into `outbound`.
//! Dropping the link tears the session down.

use std::fmt;

use async_trait::async_trait;
use futures_channel::mpsc;
use url::Url;

use gang_protocol::Frame;

use crate::error::TransportError;

/// Available transports, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    WebSocket,
    LongPoll,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::WebSocket => f.write_str("websocket"),
            TransportKind::LongPoll => f.write_str("longpoll"),
        }
    }
}

/// What an adapter reports from the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Frame(Frame),
    Closed { reason: String },
}

/// An open transport session.
pub struct TransportLink {
    pub outbound: mpsc::UnboundedSender<Frame>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait(?Send)]
pub trait Connector {
    /// Open a session at `url`. Resolves once the transport is usable.
    async fn open(&self, kind: TransportKind, url: &Url) -> Result<TransportLink, TransportError>;
}
