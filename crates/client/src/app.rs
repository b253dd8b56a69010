//! Application composition.
//!
//! `AppContext` wires the identity store, live socket, hook registry and
//! broadcast subscribers together, and is the single handle debug tooling
//! gets to the running socket.

use std::rc::Rc;

use gang_protocol::{BroadcastEvent, ServerEvent};

use crate::broadcast::{BroadcastBus, ProgressIndicator, ScrollSynchronizer, SubscriptionId};
use crate::config::ClientConfig;
use crate::connection::{
    params_supplier, CsrfToken, DebugConsole, LiveSocket, SocketServices,
};
use crate::error::ClientError;
use crate::hooks::{HookRegistry, HookServices};
use crate::identity::IdentityStore;
use crate::ports::outbound::Connector;
use crate::state::Platform;

pub struct AppContext {
    socket: LiveSocket,
    hooks: HookRegistry,
    broadcast: BroadcastBus,
    identity: IdentityStore,
    debug: DebugConsole,
    subscriptions: Vec<SubscriptionId>,
}

impl AppContext {
    /// Build everything and start connecting.
    ///
    /// Fails only when the page carries no anti-forgery token (or the
    /// endpoint is unusable).
    pub fn start(
        platform: Platform,
        connector: Rc<dyn Connector>,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let csrf = CsrfToken::from_document(platform.document().as_ref())?;

        let identity = IdentityStore::new(platform.storage());
        let broadcast = BroadcastBus::new();
        let debug = DebugConsole::new();

        let socket = LiveSocket::new(
            &config.connection,
            params_supplier(csrf, identity.clone()),
            SocketServices {
                connector,
                sleep: platform.sleep(),
                spawner: platform.spawner(),
                bus: broadcast.clone(),
                debug: debug.clone(),
            },
        )?;

        let hooks = HookRegistry::with_default_hooks(HookServices {
            identity: identity.clone(),
            clipboard: platform.clipboard(),
            spawner: platform.spawner(),
            pusher: Rc::new(socket.pusher()),
        });

        let subscriptions = subscribe_page_listeners(&platform, &config, &broadcast);

        let route_hooks = hooks.clone();
        let route_bus = broadcast.clone();
        socket.set_event_sink(Rc::new(move |event: ServerEvent| {
            match event.as_broadcast() {
                Some(broadcast_event) => route_bus.publish(broadcast_event),
                None => {
                    route_hooks.dispatch(&event);
                }
            }
        }));

        socket.connect();
        tracing::info!(endpoint = %config.connection.endpoint, "Client started");

        Ok(Self {
            socket,
            hooks,
            broadcast,
            identity,
            debug,
            subscriptions,
        })
    }

    pub fn socket(&self) -> &LiveSocket {
        &self.socket
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn broadcast(&self) -> &BroadcastBus {
        &self.broadcast
    }

    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    pub fn debug_console(&self) -> &DebugConsole {
        &self.debug
    }

    /// Disconnect, detach every binding and drop all subscriptions.
    pub fn teardown(&mut self) {
        self.socket.disconnect();
        self.socket.clear_event_sink();
        self.hooks.detach_all();
        for id in self.subscriptions.drain(..) {
            self.broadcast.unsubscribe(id);
        }
        tracing::info!("Client torn down");
    }
}

/// Scroll synchronizer and progress indicator, fed from the bus.
fn subscribe_page_listeners(
    platform: &Platform,
    config: &ClientConfig,
    bus: &BroadcastBus,
) -> Vec<SubscriptionId> {
    let scroll = ScrollSynchronizer::new(
        platform.document(),
        platform.frames(),
        platform.sleep(),
        &config.timing,
    );
    let progress = ProgressIndicator::new(
        platform.progress_bar(),
        platform.sleep(),
        platform.spawner(),
        &config.timing,
    );
    let spawner = platform.spawner();

    let scroll_subscription = bus.subscribe(move |event| {
        if event == BroadcastEvent::ScrollChatToBottom {
            let scroll = scroll.clone();
            spawner.spawn(Box::pin(async move {
                scroll.scroll_all().await;
            }));
        }
    });
    let progress_subscription = bus.subscribe(move |event| match event {
        BroadcastEvent::PageLoadingStart => progress.start(),
        BroadcastEvent::PageLoadingStop => progress.stop(),
        BroadcastEvent::ScrollChatToBottom => {}
    });

    vec![scroll_subscription, progress_subscription]
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::connection::ConnectionState;
    use crate::hooks::hook_names;
    use crate::ports::outbound::HookElement;
    use crate::infrastructure::platform::desktop::{DesktopFrameProvider, DesktopSleepProvider};
    use crate::testing::{
        wait_until, FakeDocument, FakeElement, FakeScrollContainer, LocalSpawner, MemoryStorage,
        RecordingClipboard, RecordingProgressBar, ScriptedConnector,
    };
    use gang_protocol::PlayerIdentity;
    use std::time::Duration;

    struct Page {
        storage: Rc<MemoryStorage>,
        document: Rc<FakeDocument>,
        clipboard: Rc<RecordingClipboard>,
        bar: Rc<RecordingProgressBar>,
        connector: Rc<ScriptedConnector>,
    }

    impl Page {
        fn new(csrf: &str) -> Self {
            Self {
                storage: Rc::new(MemoryStorage::new()),
                document: Rc::new(FakeDocument::new(csrf)),
                clipboard: Rc::new(RecordingClipboard::new()),
                bar: Rc::new(RecordingProgressBar::new()),
                connector: Rc::new(ScriptedConnector::new()),
            }
        }

        fn start(&self) -> Result<AppContext, ClientError> {
            self.start_with(ClientConfig::default())
        }

        fn start_with(&self, config: ClientConfig) -> Result<AppContext, ClientError> {
            let platform = Platform::from_shared(
                self.storage.clone(),
                self.clipboard.clone(),
                self.document.clone(),
                Rc::new(DesktopSleepProvider),
                Rc::new(DesktopFrameProvider),
                Rc::new(LocalSpawner),
                self.bar.clone(),
            );
            AppContext::start(
                platform,
                Rc::clone(&self.connector) as Rc<dyn Connector>,
                config,
            )
        }
    }

    async fn run_local<F: std::future::Future<Output = ()>>(test: F) {
        tokio::task::LocalSet::new().run_until(test).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_csrf_token_is_fatal() {
        run_local(async {
            let page = Page::new("");

            let result = page.start();

            assert!(matches!(result, Err(ClientError::MissingCsrfToken(_))));
            assert!(page.connector.opens().is_empty());
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_is_only_read_from_document() {
        run_local(async {
            let page = Page::new("");
            let config = ClientConfig {
                csrf_token: Some("configured".to_string()),
                ..ClientConfig::default()
            };

            let result = page.start_with(config);

            assert!(matches!(result, Err(ClientError::MissingCsrfToken(_))));
            assert!(page.connector.opens().is_empty());
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_player_gets_identity_on_next_reconnect() {
        run_local(async {
            let page = Page::new("tok");
            let app = page.start().expect("started");
            wait_until(|| app.socket().state() == ConnectionState::Connected).await;

            let form = Rc::new(FakeElement::new().with_input("player_name"));
            app.hooks()
                .attach("player-form", hook_names::SET_PLAYER_NAME, form as Rc<dyn HookElement>);

            let first = &page.connector.opens()[0];
            assert_eq!(first.param("player_name").as_deref(), Some(""));
            assert_eq!(first.param("player_id").as_deref(), Some(""));

            let server = page.connector.latest_server().expect("server end");
            server.push_event(
                "save_player_info",
                serde_json::json!({ "player_name": "Ava", "player_id": "p-42" }),
            );
            wait_until(|| page.storage.get("player_id").is_some()).await;
            assert_eq!(page.storage.get("player_name").as_deref(), Some("Ava"));
            assert_eq!(page.storage.get("player_id").as_deref(), Some("p-42"));

            server.close("deploy");
            wait_until(|| page.connector.opens().len() == 2).await;

            let second = &page.connector.opens()[1];
            assert_eq!(second.param("player_name").as_deref(), Some("Ava"));
            assert_eq!(second.param("player_id").as_deref(), Some("p-42"));
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_returning_player_restores_on_attach() {
        run_local(async {
            let page = Page::new("tok");
            page.storage.save_identity("Ava", "p-42");
            let app = page.start().expect("started");
            wait_until(|| app.socket().state() == ConnectionState::Connected).await;

            let form = Rc::new(FakeElement::new().with_input("player_name"));
            app.hooks().attach(
                "player-form",
                hook_names::SET_PLAYER_NAME,
                Rc::clone(&form) as Rc<dyn HookElement>,
            );

            let server = page.connector.latest_server().expect("server end");
            wait_until(|| !server.hook_pushes().is_empty()).await;

            assert_eq!(form.input_value("player_name").as_deref(), Some("Ava"));
            let (name, value) = &server.hook_pushes()[0];
            assert_eq!(name, "restore_player_info");
            assert_eq!(value["player_id"], "p-42");
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_copy_reaches_clipboard_hook() {
        run_local(async {
            let page = Page::new("tok");
            let app = page.start().expect("started");
            wait_until(|| app.socket().state() == ConnectionState::Connected).await;
            let button = Rc::new(FakeElement::new());
            app.hooks().attach(
                "copy-code",
                hook_names::CLIPBOARD,
                Rc::clone(&button) as Rc<dyn HookElement>,
            );

            page.connector
                .latest_server()
                .expect("server end")
                .push_event("copy_to_clipboard", serde_json::json!({ "text": "ROOM-7" }));
            wait_until(|| button.focus_count() == 1).await;

            assert_eq!(page.clipboard.contents().as_deref(), Some("ROOM-7"));
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_push_pins_chat_containers() {
        run_local(async {
            let page = Page::new("tok");
            let chat = page
                .document
                .add_chat_container(FakeScrollContainer::new(900, 300).with_children(2));
            let app = page.start().expect("started");
            wait_until(|| app.socket().state() == ConnectionState::Connected).await;

            page.connector
                .latest_server()
                .expect("server end")
                .push_event("scroll_chat_to_bottom", serde_json::json!({}));
            wait_until(|| chat.last_child_scrolls() == 1).await;
            tokio::time::sleep(Duration::from_millis(50)).await;

            assert_eq!(chat.scroll_top(), 600);
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_join_never_paints_progress_bar() {
        run_local(async {
            let page = Page::new("tok");
            let app = page.start().expect("started");
            wait_until(|| app.socket().state() == ConnectionState::Connected).await;
            tokio::time::sleep(Duration::from_secs(1)).await;

            assert!(page.bar.calls().is_empty());
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_disconnects_and_unbinds() {
        run_local(async {
            let page = Page::new("tok");
            let mut app = page.start().expect("started");
            wait_until(|| app.socket().state() == ConnectionState::Connected).await;
            app.hooks()
                .attach("copy", hook_names::CLIPBOARD, Rc::new(FakeElement::new()));

            app.teardown();
            wait_until(|| !app.socket().is_running()).await;

            assert_eq!(app.socket().state(), ConnectionState::Disconnected);
            assert_eq!(app.hooks().binding_count(), 0);
            assert_eq!(app.broadcast().subscriber_count(), 0);
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_survives_restart() {
        run_local(async {
            let page = Page::new("tok");
            page.storage.save_identity("Ava", "p-42");
            let app = page.start().expect("started");

            assert_eq!(
                app.identity().read().complete(),
                Some(&PlayerIdentity::new("Ava", "p-42"))
            );
        })
        .await;
    }
}
