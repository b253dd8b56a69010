//! Desktop long-poll session using reqwest.
//!
//! The handshake GET answers `410` with a session token. After that one task
//! keeps a GET outstanding for server frames and another POSTs client frames,
//! both tagged with the token.

use futures_channel::mpsc;
use futures_util::StreamExt;
use url::Url;

use gang_protocol::{Frame, LongPollEnvelope};

use crate::error::TransportError;
use crate::infrastructure::transport::{with_poll_token, PollOutcome};
use crate::ports::outbound::{TransportEvent, TransportKind, TransportLink};

#[derive(Clone, Default)]
pub struct LongPollClient {
    http: reqwest::Client,
}

impl LongPollClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    pub(super) async fn open(&self, url: &Url) -> Result<TransportLink, TransportError> {
        let envelope = poll(&self.http, url)
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

        tokio::spawn(send_loop(
            self.http.clone(),
            session_url.clone(),
            outbound_rx,
            inbound_tx.clone(),
        ));
        tokio::spawn(poll_loop(self.http.clone(), session_url, inbound_tx));

        Ok(TransportLink { outbound, inbound })
    }
}

async fn poll(http: &reqwest::Client, url: &Url) -> Result<LongPollEnvelope, String> {
    let body = http
        .get(url.clone())
        .header("accept", "application/json")
        .send()
        .await
        .map_err(|e| e.to_string())?
        .text()
        .await
        .map_err(|e| e.to_string())?;
    LongPollEnvelope::decode(&body).map_err(|e| e.to_string())
}

async fn poll_loop(
    http: reqwest::Client,
    url: Url,
    inbound_tx: mpsc::UnboundedSender<TransportEvent>,
) {
    while !inbound_tx.is_closed() {
        let outcome = match poll(&http, &url).await {
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
    http: reqwest::Client,
    url: Url,
    mut outbound_rx: mpsc::UnboundedReceiver<Frame>,
    inbound_tx: mpsc::UnboundedSender<TransportEvent>,
) {
    while let Some(frame) = outbound_rx.next().await {
        let body = match frame.encode() {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Failed to encode frame: {}", e);
                continue;
            }
        };
        let result = http
            .post(url.clone())
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .and_then(|response| response.error_for_status());
        if let Err(e) = result {
            let _ = inbound_tx.unbounded_send(TransportEvent::Closed {
                reason: format!("long-poll send failed: {e}"),
            });
            return;
        }
    }
}
