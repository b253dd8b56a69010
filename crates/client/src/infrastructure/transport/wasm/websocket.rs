//! WASM WebSocket session using web-sys

use std::cell::RefCell;
use std::rc::Rc;

use futures_channel::{mpsc, oneshot};
use futures_util::StreamExt;
use url::Url;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

use gang_protocol::Frame;

use crate::error::TransportError;
use crate::ports::outbound::{TransportEvent, TransportKind, TransportLink};

/// Event closures must outlive the socket callbacks that reference them.
struct WasmClosures {
    #[allow(dead_code)]
    onmessage: Closure<dyn FnMut(MessageEvent)>,
    #[allow(dead_code)]
    onopen: Closure<dyn FnMut()>,
    #[allow(dead_code)]
    onclose: Closure<dyn FnMut(CloseEvent)>,
    #[allow(dead_code)]
    onerror: Closure<dyn FnMut()>,
}

type OpenSignal = Rc<RefCell<Option<oneshot::Sender<Result<(), String>>>>>;

fn signal(open: &OpenSignal, result: Result<(), String>) -> bool {
    match open.borrow_mut().take() {
        Some(tx) => {
            let _ = tx.send(result);
            true
        }
        None => false,
    }
}

/// Open a session. Resolves once `onopen` fires.
pub(super) async fn open(url: &Url) -> Result<TransportLink, TransportError> {
    let ws = WebSocket::new(url.as_str())
        .map_err(|e| TransportError::open(TransportKind::WebSocket, format!("{:?}", e)))?;

    let (open_tx, open_rx) = oneshot::channel::<Result<(), String>>();
    let open_signal: OpenSignal = Rc::new(RefCell::new(Some(open_tx)));
    let (inbound_tx, inbound) = mpsc::unbounded::<TransportEvent>();
    let (outbound, mut outbound_rx) = mpsc::unbounded::<Frame>();

    let message_tx = inbound_tx.clone();
    let onmessage = Closure::<dyn FnMut(_)>::new(move |e: MessageEvent| {
        let Some(text) = e.data().as_string() else {
            return;
        };
        match Frame::decode(&text) {
            Ok(frame) => {
                let _ = message_tx.unbounded_send(TransportEvent::Frame(frame));
            }
            Err(e) => tracing::warn!("Dropping undecodable frame: {}", e),
        }
    });
    ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));

    let opened = Rc::clone(&open_signal);
    let onopen = Closure::<dyn FnMut()>::new(move || {
        signal(&opened, Ok(()));
    });
    ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));

    let opened = Rc::clone(&open_signal);
    let close_tx = inbound_tx.clone();
    let onclose = Closure::<dyn FnMut(_)>::new(move |e: CloseEvent| {
        let reason = format!("closed ({})", e.code());
        if !signal(&opened, Err(reason.clone())) {
            let _ = close_tx.unbounded_send(TransportEvent::Closed { reason });
        }
    });
    ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));

    let opened = Rc::clone(&open_signal);
    let onerror = Closure::<dyn FnMut()>::new(move || {
        // An error after open is always followed by close
        signal(&opened, Err("WebSocket error".to_string()));
    });
    ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));

    let closures = WasmClosures {
        onmessage,
        onopen,
        onclose,
        onerror,
    };

    match open_rx.await {
        Ok(Ok(())) => {}
        Ok(Err(message)) => {
            detach(&ws);
            return Err(TransportError::open(TransportKind::WebSocket, message));
        }
        Err(_) => {
            detach(&ws);
            return Err(TransportError::open(TransportKind::WebSocket, "open abandoned"));
        }
    }
    tracing::debug!("WebSocket open at {}", url);

    wasm_bindgen_futures::spawn_local(async move {
        while let Some(frame) = outbound_rx.next().await {
            let sent = frame
                .encode()
                .map_err(|e| e.to_string())
                .and_then(|text| ws.send_with_str(&text).map_err(|e| format!("{:?}", e)));
            if let Err(e) = sent {
                let _ = inbound_tx.unbounded_send(TransportEvent::Closed {
                    reason: format!("send failed: {e}"),
                });
                break;
            }
        }
        detach(&ws);
        let _ = ws.close();
        drop(closures);
    });

    Ok(TransportLink { outbound, inbound })
}

/// Clear every handler so dropped closures are never invoked.
fn detach(ws: &WebSocket) {
    ws.set_onmessage(None);
    ws.set_onopen(None);
    ws.set_onclose(None);
    ws.set_onerror(None);
}
