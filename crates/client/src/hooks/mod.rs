//! Element-bound behaviors.
//!
//! The renderer marks elements with `phx-hook="<Name>"`. When such an element
//! appears the registry builds the named hook and attaches it; when the
//! element goes away the binding is detached. Hooks talk to the outside world
//! only through their `HookContext`.

pub mod clipboard;
pub mod registry;
pub mod set_player_name;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gang_protocol::{ClientEvent, ServerEvent};

use crate::connection::EventPusher;
use crate::identity::IdentityStore;
use crate::ports::outbound::{ClipboardProvider, HookElement, LocalFuture, TaskSpawner};

pub use clipboard::Clipboard;
pub use registry::{hook_names, HookFactory, HookRegistry};
pub use set_player_name::{RestorationState, SetPlayerName};

/// Lifecycle callbacks of one hook instance.
pub trait Hook {
    fn on_attach(&mut self, ctx: &HookContext);

    fn on_detach(&mut self, _ctx: &HookContext) {}

    /// A server push this hook subscribed to with `handle_event`.
    fn on_event(&mut self, _ctx: &HookContext, _event: &ServerEvent) {}

    /// The bound element was clicked (after `listen_click`).
    fn on_click(&mut self, _ctx: &HookContext) {}
}

/// Outbound half of the socket as seen by hooks.
pub trait PushChannel {
    /// Returns false if the event was dropped.
    fn push(&self, event: ClientEvent) -> bool;
}

impl PushChannel for EventPusher {
    fn push(&self, event: ClientEvent) -> bool {
        EventPusher::push(self, event)
    }
}

/// Shared services handed to every binding.
#[derive(Clone)]
pub struct HookServices {
    pub identity: IdentityStore,
    pub clipboard: Rc<dyn ClipboardProvider>,
    pub spawner: Rc<dyn TaskSpawner>,
    pub pusher: Rc<dyn PushChannel>,
}

/// Per-binding handle passed to every hook callback.
pub struct HookContext {
    element_id: String,
    element: Rc<dyn HookElement>,
    services: HookServices,
    subscriptions: RefCell<Vec<&'static str>>,
    listening_clicks: Cell<bool>,
    attached: Rc<Cell<bool>>,
    click_route: Rc<dyn Fn()>,
}

impl HookContext {
    pub(crate) fn new(
        element_id: &str,
        element: Rc<dyn HookElement>,
        services: HookServices,
        click_route: Rc<dyn Fn()>,
    ) -> Self {
        Self {
            element_id: element_id.to_string(),
            element,
            services,
            subscriptions: RefCell::new(Vec::new()),
            listening_clicks: Cell::new(false),
            attached: Rc::new(Cell::new(true)),
            click_route,
        }
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    pub fn element(&self) -> Rc<dyn HookElement> {
        Rc::clone(&self.element)
    }

    /// Push an event to the server. Dropped while disconnected.
    pub fn push(&self, event: ClientEvent) -> bool {
        self.services.pusher.push(event)
    }

    /// Subscribe this binding to a server push by name.
    pub fn handle_event(&self, event_name: &'static str) {
        let mut subscriptions = self.subscriptions.borrow_mut();
        if !subscriptions.contains(&event_name) {
            subscriptions.push(event_name);
        }
    }

    /// Route clicks on the bound element to `Hook::on_click`.
    pub fn listen_click(&self) {
        if self.listening_clicks.replace(true) {
            return;
        }
        let route = Rc::clone(&self.click_route);
        self.element.add_click_listener(Box::new(move || route()));
    }

    pub fn identity(&self) -> &IdentityStore {
        &self.services.identity
    }

    pub fn clipboard(&self) -> Rc<dyn ClipboardProvider> {
        Rc::clone(&self.services.clipboard)
    }

    pub fn spawn(&self, task: LocalFuture<()>) {
        self.services.spawner.spawn(task)
    }

    /// Shared flag that turns false once the binding is detached. Useful for
    /// async work that outlives the callback.
    pub fn attached_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.attached)
    }

    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    pub(crate) fn is_subscribed(&self, event_name: &str) -> bool {
        self.subscriptions.borrow().contains(&event_name)
    }

    pub(crate) fn listens_clicks(&self) -> bool {
        self.listening_clicks.get()
    }

    pub(crate) fn mark_detached(&self) {
        self.attached.set(false);
        self.subscriptions.borrow_mut().clear();
    }
}
