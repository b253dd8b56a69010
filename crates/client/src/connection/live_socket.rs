//! The live socket: one duplex session with the server, kept alive across
//! failures.
//!
//! A single run loop owns the transport. Each attempt builds fresh handshake
//! params, opens a transport (WebSocket, or long-poll once the session has
//! degraded), joins the channel, then pumps frames until the session is lost
//! or `disconnect` is called. Failures never escape the loop; they are logged
//! and answered with a backoff-delayed retry.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use futures_channel::{mpsc, oneshot};
use futures_util::future::{self, Either, Fuse};
use futures_util::{select, FutureExt, StreamExt};

use gang_protocol::{BroadcastEvent, ClientEvent, Frame, PushEvent, ServerEvent};

use crate::broadcast::BroadcastBus;
use crate::config::ConnectionConfig;
use crate::error::{ClientError, TransportError};
use crate::ports::outbound::{
    Connector, SleepProvider, TaskSpawner, TransportEvent, TransportKind, TransportLink,
};

use super::backoff::BackoffState;
use super::debug::DebugConsole;
use super::endpoint::Endpoint;
use super::params::ParamsSupplier;
use super::state::{set_connection_state, ConnectionState, ConnectionStateObserver};

/// Receives every decoded server push.
pub type EventSink = Rc<dyn Fn(ServerEvent)>;

/// Services the socket needs from the platform.
pub struct SocketServices {
    pub connector: Rc<dyn Connector>,
    pub sleep: Rc<dyn SleepProvider>,
    pub spawner: Rc<dyn TaskSpawner>,
    pub bus: BroadcastBus,
    pub debug: DebugConsole,
}

#[derive(Clone)]
pub struct LiveSocket {
    inner: Rc<SocketInner>,
}

struct SocketInner {
    endpoint: Endpoint,
    config: ConnectionConfig,
    params: ParamsSupplier,
    services: SocketServices,
    state: Rc<Cell<ConnectionState>>,
    transport: Cell<TransportKind>,
    websocket_established: Cell<bool>,
    sink: RefCell<Option<EventSink>>,
    outbound_tx: mpsc::UnboundedSender<ClientEvent>,
    /// Parked here while no run loop is alive
    outbound_rx: RefCell<Option<mpsc::UnboundedReceiver<ClientEvent>>>,
    shutdown: RefCell<Option<oneshot::Sender<()>>>,
    running: Cell<bool>,
}

/// Cheap handle hooks use to push events to the server.
#[derive(Clone)]
pub struct EventPusher {
    tx: mpsc::UnboundedSender<ClientEvent>,
    state: ConnectionStateObserver,
}

impl EventPusher {
    /// Queue `event` for the current session.
    ///
    /// Returns false (and drops the event) when not connected.
    pub fn push(&self, event: ClientEvent) -> bool {
        if !self.state.is_connected() {
            tracing::debug!(event = event.name(), "Not connected, dropping push");
            return false;
        }
        if self.tx.unbounded_send(event).is_err() {
            tracing::warn!("Socket outbound queue closed, dropping push");
            return false;
        }
        true
    }
}

impl LiveSocket {
    pub fn new(
        config: &ConnectionConfig,
        params: ParamsSupplier,
        services: SocketServices,
    ) -> Result<Self, ClientError> {
        let endpoint = Endpoint::parse(&config.endpoint)?;
        let (outbound_tx, outbound_rx) = mpsc::unbounded();

        Ok(Self {
            inner: Rc::new(SocketInner {
                endpoint,
                config: config.clone(),
                params,
                services,
                state: Rc::new(Cell::new(ConnectionState::Disconnected)),
                transport: Cell::new(TransportKind::WebSocket),
                websocket_established: Cell::new(false),
                sink: RefCell::new(None),
                outbound_tx,
                outbound_rx: RefCell::new(Some(outbound_rx)),
                shutdown: RefCell::new(None),
                running: Cell::new(false),
            }),
        })
    }

    /// Route decoded server pushes to `sink`. Replaces any previous sink.
    pub fn set_event_sink(&self, sink: EventSink) {
        *self.inner.sink.borrow_mut() = Some(sink);
    }

    pub fn clear_event_sink(&self) {
        self.inner.sink.borrow_mut().take();
    }

    /// Start the run loop. A no-op while the loop is alive.
    pub fn connect(&self) {
        let inner = &self.inner;
        if inner.running.get() {
            tracing::debug!("connect() ignored, socket already running");
            return;
        }
        let Some(outbound) = inner.outbound_rx.borrow_mut().take() else {
            tracing::warn!("connect() ignored, previous run loop still shutting down");
            return;
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        *inner.shutdown.borrow_mut() = Some(shutdown_tx);
        inner.running.set(true);

        let task_inner = Rc::clone(inner);
        inner.services.spawner.spawn(Box::pin(async move {
            let outbound = run(Rc::clone(&task_inner), outbound, shutdown_rx).await;
            *task_inner.outbound_rx.borrow_mut() = Some(outbound);
            task_inner.running.set(false);
        }));
    }

    /// Stop the run loop. No further reconnects happen until `connect`.
    pub fn disconnect(&self) {
        match self.inner.shutdown.borrow_mut().take() {
            Some(tx) => {
                tracing::info!("Disconnecting live socket");
                let _ = tx.send(());
            }
            None => tracing::debug!("disconnect() ignored, socket not running"),
        }
    }

    pub fn observer(&self) -> ConnectionStateObserver {
        ConnectionStateObserver::new(Rc::clone(&self.inner.state))
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.get()
    }

    pub fn pusher(&self) -> EventPusher {
        EventPusher {
            tx: self.inner.outbound_tx.clone(),
            state: self.observer(),
        }
    }

    /// Transport used for the next (or current) attempt.
    pub fn transport_kind(&self) -> TransportKind {
        self.inner.transport.get()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }
}

// =============================================================================
// Run loop
// =============================================================================

/// Open session after a successful join.
struct Session {
    link: TransportLink,
    join_ref: String,
    last_ref: u64,
}

impl Session {
    fn new(link: TransportLink) -> Self {
        Self {
            link,
            join_ref: String::new(),
            last_ref: 0,
        }
    }

    fn next_ref(&mut self) -> String {
        self.last_ref += 1;
        self.last_ref.to_string()
    }
}

enum SessionEnd {
    Shutdown,
    Lost(TransportError),
}

enum Step {
    Shutdown,
    Outbound(Option<ClientEvent>),
    Inbound(Option<TransportEvent>),
    Heartbeat,
}

type Shutdown = Fuse<oneshot::Receiver<()>>;

async fn run(
    inner: Rc<SocketInner>,
    mut outbound: mpsc::UnboundedReceiver<ClientEvent>,
    shutdown: oneshot::Receiver<()>,
) -> mpsc::UnboundedReceiver<ClientEvent> {
    let mut shutdown = shutdown.fuse();
    let mut backoff = BackoffState::new(inner.config.backoff);
    let mut first_attempt = true;

    loop {
        if first_attempt {
            inner.set_state(ConnectionState::Connecting);
        } else {
            inner.set_state(ConnectionState::Reconnecting);
            let delay = backoff.next_delay_and_advance();
            tracing::info!(attempt = backoff.attempts(), delay_ms = delay, "Reconnecting");

            let mut wait = inner.services.sleep.sleep_ms(delay).fuse();
            let stopped = select! {
                _ = wait => false,
                _ = shutdown => true,
            };
            if stopped {
                break;
            }
        }
        first_attempt = false;

        inner.services.bus.publish(BroadcastEvent::PageLoadingStart);

        let attempt = {
            let mut establish = Box::pin(inner.establish()).fuse();
            select! {
                result = establish => Some(result),
                _ = shutdown => None,
            }
        };
        let Some(result) = attempt else {
            break;
        };
        let (mut session, join_reply) = match result {
            Ok(established) => established,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    transport = %inner.transport.get(),
                    "Connection attempt failed"
                );
                continue;
            }
        };

        backoff.reset();
        inner.set_state(ConnectionState::Connected);
        tracing::info!(
            transport = %inner.transport.get(),
            topic = %inner.config.topic,
            "Joined live channel"
        );
        inner.services.bus.publish(BroadcastEvent::PageLoadingStop);

        while let Ok(stale) = outbound.try_recv() {
            tracing::debug!(event = stale.name(), "Dropping push queued for a previous session");
        }
        inner.dispatch_pushes(&join_reply).await;

        match inner.pump(&mut session, &mut outbound, &mut shutdown).await {
            SessionEnd::Shutdown => break,
            SessionEnd::Lost(e) => {
                tracing::warn!(error = %e, "Connection lost");
            }
        }
    }

    inner.set_state(ConnectionState::Disconnected);
    inner.services.bus.publish(BroadcastEvent::PageLoadingStop);
    outbound
}

impl SocketInner {
    fn set_state(&self, state: ConnectionState) {
        set_connection_state(&self.state, state);
    }

    /// Run `fut`, failing with `Timeout(what)` after `ms`.
    async fn within<T>(
        &self,
        ms: u64,
        what: &'static str,
        fut: impl Future<Output = Result<T, TransportError>>,
    ) -> Result<T, TransportError> {
        match future::select(Box::pin(fut), self.services.sleep.sleep_ms(ms)).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => Err(TransportError::Timeout(what)),
        }
    }

    /// Open a transport and join the channel.
    ///
    /// Returns the session and the join reply (which may carry pushes).
    async fn establish(&self) -> Result<(Session, Frame), TransportError> {
        let params = (self.params)();
        let link = self.open_transport(&params).await?;
        let mut session = Session::new(link);

        session.join_ref = session.next_ref();
        let join = Frame::join(&session.join_ref, &self.config.topic, &params);
        self.send(&session, join).await?;

        let join_ref = session.join_ref.clone();
        let reply = self
            .within(
                self.config.join_timeout_ms,
                "join reply",
                self.await_join_reply(&mut session, &join_ref),
            )
            .await?;
        Ok((session, reply))
    }

    async fn open_transport(
        &self,
        params: &gang_protocol::ConnectParams,
    ) -> Result<TransportLink, TransportError> {
        let kind = self.transport.get();
        let url = self.endpoint.url_for(kind, params);
        tracing::debug!(transport = %kind, "Opening transport");

        let fallback_window = match (kind, self.config.long_poll_fallback_ms) {
            (TransportKind::WebSocket, Some(ms)) if !self.websocket_established.get() => Some(ms),
            _ => None,
        };

        let Some(window_ms) = fallback_window else {
            let link = self
                .within(
                    self.config.join_timeout_ms,
                    "transport open",
                    self.services.connector.open(kind, &url),
                )
                .await?;
            if kind == TransportKind::WebSocket {
                self.websocket_established.set(true);
            }
            return Ok(link);
        };

        let err = match self
            .within(
                window_ms,
                "websocket open",
                self.services.connector.open(kind, &url),
            )
            .await
        {
            Ok(link) => {
                self.websocket_established.set(true);
                return Ok(link);
            }
            Err(e) => e,
        };

        tracing::warn!(
            error = %err,
            "WebSocket unavailable, falling back to long-poll for this session"
        );
        self.transport.set(TransportKind::LongPoll);
        let url = self.endpoint.url_for(TransportKind::LongPoll, params);
        self.within(
            self.config.join_timeout_ms,
            "transport open",
            self.services.connector.open(TransportKind::LongPoll, &url),
        )
        .await
    }

    async fn await_join_reply(
        &self,
        session: &mut Session,
        join_ref: &str,
    ) -> Result<Frame, TransportError> {
        while let Some(event) = session.link.inbound.next().await {
            let frame = match event {
                TransportEvent::Frame(frame) => frame,
                TransportEvent::Closed { reason } => return Err(TransportError::Closed(reason)),
            };
            self.log_inbound(&frame);

            if frame.topic == self.config.topic && frame.is_reply_to(join_ref) {
                return match frame.reply_status() {
                    Some("ok") => Ok(frame),
                    status => Err(TransportError::JoinRejected(
                        status.unwrap_or("unknown").to_string(),
                    )),
                };
            }
            tracing::debug!(event = %frame.event, "Ignoring frame before join reply");
        }
        Err(TransportError::Closed(
            "transport ended before join reply".to_string(),
        ))
    }

    async fn pump(
        &self,
        session: &mut Session,
        outbound: &mut mpsc::UnboundedReceiver<ClientEvent>,
        shutdown: &mut Shutdown,
    ) -> SessionEnd {
        let interval = self.config.heartbeat_interval_ms;
        let mut heartbeat = self.services.sleep.sleep_ms(interval).fuse();
        let mut pending_heartbeat: Option<String> = None;

        loop {
            let step = select! {
                _ = &mut *shutdown => Step::Shutdown,
                event = outbound.next() => Step::Outbound(event),
                event = session.link.inbound.next() => Step::Inbound(event),
                _ = heartbeat => Step::Heartbeat,
            };

            match step {
                Step::Shutdown | Step::Outbound(None) => return SessionEnd::Shutdown,
                Step::Outbound(Some(event)) => {
                    let msg_ref = session.next_ref();
                    let frame =
                        Frame::hook_event(&session.join_ref, &msg_ref, &self.config.topic, &event);
                    tracing::debug!(event = event.name(), "Pushing hook event");
                    if let Err(e) = self.send(session, frame).await {
                        return SessionEnd::Lost(e);
                    }
                }
                Step::Inbound(None) => {
                    return SessionEnd::Lost(TransportError::Closed("transport ended".to_string()))
                }
                Step::Inbound(Some(TransportEvent::Closed { reason })) => {
                    return SessionEnd::Lost(TransportError::Closed(reason))
                }
                Step::Inbound(Some(TransportEvent::Frame(frame))) => {
                    self.log_inbound(&frame);
                    if pending_heartbeat
                        .as_deref()
                        .is_some_and(|msg_ref| frame.is_reply_to(msg_ref))
                    {
                        pending_heartbeat = None;
                        continue;
                    }
                    if frame.topic != self.config.topic {
                        continue;
                    }
                    if frame.is_channel_close() {
                        return SessionEnd::Lost(TransportError::Closed(format!(
                            "channel {}",
                            frame.event
                        )));
                    }
                    self.dispatch_pushes(&frame).await;
                }
                Step::Heartbeat => {
                    if pending_heartbeat.is_some() {
                        return SessionEnd::Lost(TransportError::Timeout("heartbeat reply"));
                    }
                    let msg_ref = session.next_ref();
                    if let Err(e) = self.send(session, Frame::heartbeat(&msg_ref)).await {
                        return SessionEnd::Lost(e);
                    }
                    pending_heartbeat = Some(msg_ref);
                    heartbeat = self.services.sleep.sleep_ms(interval).fuse();
                }
            }
        }
    }

    async fn send(&self, session: &Session, frame: Frame) -> Result<(), TransportError> {
        if let Some(ms) = self.services.debug.latency_ms() {
            self.services.sleep.sleep_ms(ms).await;
        }
        if self.services.debug.verbose() {
            tracing::info!(
                topic = %frame.topic,
                event = %frame.event,
                payload = %frame.payload,
                "socket send"
            );
        }
        session
            .link
            .outbound
            .unbounded_send(frame)
            .map_err(|_| TransportError::Closed("outbound channel closed".to_string()))
    }

    fn log_inbound(&self, frame: &Frame) {
        if self.services.debug.verbose() {
            tracing::info!(
                topic = %frame.topic,
                event = %frame.event,
                payload = %frame.payload,
                "socket receive"
            );
        }
    }

    async fn dispatch_pushes(&self, frame: &Frame) {
        let pushes = frame.push_events();
        if pushes.is_empty() {
            return;
        }
        if let Some(ms) = self.services.debug.latency_ms() {
            self.services.sleep.sleep_ms(ms).await;
        }
        for push in pushes {
            self.dispatch_push(push);
        }
    }

    fn dispatch_push(&self, PushEvent { name, payload }: PushEvent) {
        match ServerEvent::from_wire(&name, payload) {
            Ok(Some(event)) => {
                let sink = self.sink.borrow().clone();
                match sink {
                    Some(sink) => sink(event),
                    None => tracing::debug!(event = %name, "No event sink, dropping server push"),
                }
            }
            Ok(None) => tracing::debug!(event = %name, "Ignoring unhandled server push"),
            Err(e) => tracing::error!(error = %e, "Dropping malformed server push"),
        }
    }
}
