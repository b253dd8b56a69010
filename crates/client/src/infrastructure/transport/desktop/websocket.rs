//! Desktop WebSocket session using tokio-tungstenite

use std::time::Duration;

use futures_channel::{mpsc, oneshot};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use gang_protocol::Frame;

use crate::error::TransportError;
use crate::ports::outbound::{TransportEvent, TransportKind, TransportLink};

/// How long a dropped link waits for the peer to answer its close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Open a session. Resolves once the WebSocket handshake completes.
pub(super) async fn open(url: &Url) -> Result<TransportLink, TransportError> {
    let (ws_stream, _) = connect_async(url.as_str())
        .await
        .map_err(|e| TransportError::open(TransportKind::WebSocket, e))?;
    tracing::debug!("WebSocket open at {}", url);

    let (mut write, mut read) = ws_stream.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded::<Frame>();
    let (inbound_tx, inbound) = mpsc::unbounded::<TransportEvent>();

    // Dropped by the writer when it exits; the reader stops with it
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let closed_tx = inbound_tx.clone();
    tokio::spawn(async move {
        let _stop = stop_tx;
        while let Some(frame) = outbound_rx.next().await {
            let text = match frame.encode() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Failed to encode frame: {}", e);
                    continue;
                }
            };
            if let Err(e) = write.send(Message::Text(text)).await {
                let _ = closed_tx.unbounded_send(TransportEvent::Closed {
                    reason: format!("send failed: {e}"),
                });
                return;
            }
        }
        // Link dropped by the socket. A dead peer never answers the close.
        if tokio::time::timeout(CLOSE_TIMEOUT, write.close()).await.is_err() {
            tracing::debug!("WebSocket close unanswered, dropping connection");
        }
    });

    tokio::spawn(async move {
        let reason = loop {
            let message = tokio::select! {
                _ = &mut stop_rx => return,
                message = read.next() => message,
            };
            match message {
                Some(Ok(Message::Text(text))) => match Frame::decode(&text) {
                    Ok(frame) => {
                        if inbound_tx.unbounded_send(TransportEvent::Frame(frame)).is_err() {
                            return;
                        }
                    }
                    Err(e) => tracing::warn!("Dropping undecodable frame: {}", e),
                },
                Some(Ok(Message::Close(close))) => {
                    break close
                        .map(|c| format!("closed by server ({})", c.code))
                        .unwrap_or_else(|| "closed by server".to_string());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break e.to_string(),
                None => break "stream ended".to_string(),
            }
        };
        let _ = inbound_tx.unbounded_send(TransportEvent::Closed { reason });
    });

    Ok(TransportLink { outbound, inbound })
}
