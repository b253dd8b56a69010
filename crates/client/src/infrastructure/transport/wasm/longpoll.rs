//! WASM long-poll session using gloo-net.

use futures_channel::mpsc;
use futures_util::StreamExt;
use gloo_net::http::Request;
use url::Url;

use gang_protocol::{Frame, LongPollEnvelope};

use crate::error::TransportError;
use crate::infrastructure::transport::{with_poll_token, PollOutcome};
use crate::ports::outbound::{TransportEvent, TransportKind, TransportLink};

pub(super) async fn open(url: &Url) -> Result<TransportLink, TransportError> {
    let envelope = poll(url)
        .await
        .map_err(|e| TransportError::open(TransportKind::LongPoll, e))?;
    let token = match (envelope.status, envelope.token) {
        (LongPollEnvelope::STATUS_GONE, Some(token)) => token,
        (status, _) => {
            return Err(TransportError::open(
                TransportKind::LongPoll,
                format!("handshake answered {status} without a session token"),
            ))
        }
    };
    tracing::debug!("Long-poll session open at {}", url);

    let session_url = with_poll_token(url, Some(&token));
    let (outbound, outbound_rx) = mpsc::unbounded::<Frame>();
    let (inbound_tx, inbound) = mpsc::unbounded::<TransportEvent>();

    wasm_bindgen_futures::spawn_local(send_loop(
        session_url.clone(),
        outbound_rx,
        inbound_tx.clone(),
    ));
    wasm_bindgen_futures::spawn_local(poll_loop(session_url, inbound_tx));

    Ok(TransportLink { outbound, inbound })
}

async fn poll(url: &Url) -> Result<LongPollEnvelope, String> {
    let body = Request::get(url.as_str())
        .header("accept", "application/json")
        .send()
        .await
        .map_err(|e| e.to_string())?
        .text()
        .await
        .map_err(|e| e.to_string())?;
    LongPollEnvelope::decode(&body).map_err(|e| e.to_string())
}

async fn poll_loop(url: Url, inbound_tx: mpsc::UnboundedSender<TransportEvent>) {
    while !inbound_tx.is_closed() {
        let outcome = match poll(&url).await {
            Ok(envelope) => PollOutcome::from_envelope(&envelope),
            Err(e) => PollOutcome::Lost(e),
        };
        match outcome {
            PollOutcome::Frames(frames) => {
                for frame in frames {
                    if inbound_tx.unbounded_send(TransportEvent::Frame(frame)).is_err() {
                        return;
                    }
                }
            }
            PollOutcome::Idle => {}
            PollOutcome::Lost(reason) => {
                let _ = inbound_tx.unbounded_send(TransportEvent::Closed { reason });
                return;
            }
        }
    }
}

async fn send_loop(
    url: Url,
    mut outbound_rx: mpsc::UnboundedReceiver<Frame>,
    inbound_tx: mpsc::UnboundedSender<TransportEvent>,
) {
    while let Some(frame) = outbound_rx.next().await {
        let result = match frame.encode() {
            Ok(body) => send(&url, body).await,
            Err(e) => {
                tracing::error!("Failed to encode frame: {}", e);
                continue;
            }
        };
        if let Err(e) = result {
            let _ = inbound_tx.unbounded_send(TransportEvent::Closed {
                reason: format!("long-poll send failed: {e}"),
            });
            return;
        }
    }
}

async fn send(url: &Url, body: String) -> Result<(), String> {
    let response = Request::post(url.as_str())
        .header("content-type", "application/json")
        .body(body)
        .map_err(|e| e.to_string())?
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if response.ok() {
        Ok(())
    } else {
        Err(format!("status {}", response.status()))
    }
}
