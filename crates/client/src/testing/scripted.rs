//! Scripted transport for driving the live socket under tokio.
//!
//! Must run inside a `tokio::task::LocalSet`.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use futures_channel::mpsc;
use futures_util::{future, StreamExt};
use serde_json::{json, Value};
use url::Url;

use gang_protocol::frame::{frame_events, PHOENIX_TOPIC};
use gang_protocol::Frame;

use crate::config::DEFAULT_TOPIC;
use crate::error::TransportError;
use crate::ports::outbound::{
    Connector, LocalFuture, TaskSpawner, TransportEvent, TransportKind, TransportLink,
};

/// Spawns onto the current `LocalSet`.
pub struct LocalSpawner;

impl TaskSpawner for LocalSpawner {
    fn spawn(&self, task: LocalFuture<()>) {
        tokio::task::spawn_local(task);
    }
}

/// Poll `condition` every few (virtual) milliseconds until it holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..20_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 100s of virtual time");
}

/// What the next `open` call does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenBehavior {
    Accept,
    Fail(String),
    /// Never resolves
    Hang,
}

#[derive(Debug, Clone)]
pub struct OpenRecord {
    pub kind: TransportKind,
    pub url: Url,
}

impl OpenRecord {
    /// A query parameter of the handshake URL.
    pub fn param(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

/// Connector that follows a script (defaulting to `Accept`) and plays the
/// server side of every accepted session.
#[derive(Default)]
pub struct ScriptedConnector {
    script: RefCell<VecDeque<OpenBehavior>>,
    opens: RefCell<Vec<OpenRecord>>,
    servers: RefCell<Vec<ServerEnd>>,
    silent_heartbeats: Rc<Cell<bool>>,
    reject_joins: Rc<Cell<bool>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the behavior of a future `open` call.
    pub fn script(&self, behavior: OpenBehavior) {
        self.script.borrow_mut().push_back(behavior);
    }

    pub fn set_answer_heartbeats(&self, answer: bool) {
        self.silent_heartbeats.set(!answer);
    }

    pub fn set_accept_join(&self, accept: bool) {
        self.reject_joins.set(!accept);
    }

    pub fn opens(&self) -> Vec<OpenRecord> {
        self.opens.borrow().clone()
    }

    pub fn server(&self, index: usize) -> Option<ServerEnd> {
        self.servers.borrow().get(index).cloned()
    }

    pub fn latest_server(&self) -> Option<ServerEnd> {
        self.servers.borrow().last().cloned()
    }

    fn accept(&self) -> TransportLink {
        let (client_tx, mut server_rx) = mpsc::unbounded::<Frame>();
        let (server_tx, client_rx) = mpsc::unbounded::<TransportEvent>();

        let end = ServerEnd {
            tx: server_tx.clone(),
            received: Rc::new(RefCell::new(Vec::new())),
            topic: Rc::new(RefCell::new(None)),
        };
        let received = Rc::clone(&end.received);
        let topic = Rc::clone(&end.topic);
        let silent_heartbeats = Rc::clone(&self.silent_heartbeats);
        let reject_joins = Rc::clone(&self.reject_joins);

        tokio::task::spawn_local(async move {
            while let Some(frame) = server_rx.next().await {
                received.borrow_mut().push(frame.clone());
                let status = match frame.event.as_str() {
                    frame_events::JOIN => {
                        *topic.borrow_mut() = Some(frame.topic.clone());
                        Some(if reject_joins.get() { "error" } else { "ok" })
                    }
                    frame_events::HEARTBEAT if frame.topic == PHOENIX_TOPIC => {
                        (!silent_heartbeats.get()).then_some("ok")
                    }
                    _ => None,
                };
                if let Some(status) = status {
                    let reply = Frame {
                        join_ref: frame.join_ref.clone(),
                        msg_ref: frame.msg_ref.clone(),
                        topic: frame.topic.clone(),
                        event: frame_events::REPLY.to_string(),
                        payload: json!({ "status": status, "response": {} }),
                    };
                    let _ = server_tx.unbounded_send(TransportEvent::Frame(reply));
                }
            }
        });

        self.servers.borrow_mut().push(end);
        TransportLink {
            outbound: client_tx,
            inbound: client_rx,
        }
    }
}

#[async_trait(?Send)]
impl Connector for ScriptedConnector {
    async fn open(&self, kind: TransportKind, url: &Url) -> Result<TransportLink, TransportError> {
        self.opens.borrow_mut().push(OpenRecord {
            kind,
            url: url.clone(),
        });
        let behavior = self
            .script
            .borrow_mut()
            .pop_front()
            .unwrap_or(OpenBehavior::Accept);

        match behavior {
            OpenBehavior::Accept => Ok(self.accept()),
            OpenBehavior::Fail(message) => Err(TransportError::open(kind, message)),
            OpenBehavior::Hang => future::pending().await,
        }
    }
}

/// Server side of one accepted session.
#[derive(Clone)]
pub struct ServerEnd {
    tx: mpsc::UnboundedSender<TransportEvent>,
    received: Rc<RefCell<Vec<Frame>>>,
    topic: Rc<RefCell<Option<String>>>,
}

impl ServerEnd {
    /// Push a named event inside a render diff.
    pub fn push_event(&self, name: &str, payload: Value) {
        let topic = self
            .topic
            .borrow()
            .clone()
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        let frame = Frame {
            join_ref: None,
            msg_ref: None,
            topic,
            event: frame_events::DIFF.to_string(),
            payload: json!({ "e": [[name, payload]] }),
        };
        let _ = self.tx.unbounded_send(TransportEvent::Frame(frame));
    }

    /// Drop the connection from the server side.
    pub fn close(&self, reason: &str) {
        let _ = self.tx.unbounded_send(TransportEvent::Closed {
            reason: reason.to_string(),
        });
    }

    /// Every frame the client sent on this session.
    pub fn received(&self) -> Vec<Frame> {
        self.received.borrow().clone()
    }

    /// Hook pushes as `(event name, value)`.
    pub fn hook_pushes(&self) -> Vec<(String, Value)> {
        self.received
            .borrow()
            .iter()
            .filter(|f| f.event == frame_events::HOOK_EVENT)
            .map(|f| {
                let name = f.payload["event"].as_str().unwrap_or_default().to_string();
                (name, f.payload["value"].clone())
            })
            .collect()
    }
}
