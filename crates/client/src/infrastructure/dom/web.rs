//! Browser side of hook mounting and `phx:*` window broadcasts.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlElement, HtmlInputElement, MutationObserver, MutationObserverInit};

use gang_protocol::BroadcastEvent;

use crate::broadcast::{BroadcastBus, SubscriptionId};
use crate::hooks::HookRegistry;
use crate::ports::outbound::{dom, HookElement};

use super::{plan_mounts, FoundHook, MountAction};

type ObserverCallback = Closure<dyn FnMut(js_sys::Array, MutationObserver)>;

struct BridgeInner {
    hooks: HookRegistry,
    bus: BroadcastBus,
    mounted: RefCell<HashMap<String, (String, Element)>>,
    observer: RefCell<Option<(MutationObserver, ObserverCallback)>>,
    window_listeners: RefCell<Vec<(String, Closure<dyn FnMut(Event)>)>>,
    subscription: Cell<Option<SubscriptionId>>,
}

/// Keeps the hook registry in line with the page and feeds window
/// broadcasts into the bus.
///
/// Mounting starts on the first `PageLoadingStop` (the socket has joined),
/// so hooks never push into a session that is not there yet.
#[derive(Clone)]
pub struct DomBridge {
    inner: Rc<BridgeInner>,
}

impl DomBridge {
    pub fn install(hooks: HookRegistry, bus: BroadcastBus) -> Self {
        let bridge = Self {
            inner: Rc::new(BridgeInner {
                hooks,
                bus: bus.clone(),
                mounted: RefCell::new(HashMap::new()),
                observer: RefCell::new(None),
                window_listeners: RefCell::new(Vec::new()),
                subscription: Cell::new(None),
            }),
        };

        bridge.listen_window_broadcasts();

        let weak: Weak<BridgeInner> = Rc::downgrade(&bridge.inner);
        let subscription = bus.subscribe(move |event| {
            if event != BroadcastEvent::PageLoadingStop {
                return;
            }
            if let Some(inner) = weak.upgrade() {
                DomBridge { inner }.start_observing();
            }
        });
        bridge.inner.subscription.set(Some(subscription));

        bridge
    }

    fn listen_window_broadcasts(&self) {
        let Some(window) = web_sys::window() else {
            tracing::warn!("No window, page broadcasts disabled");
            return;
        };

        for event in BroadcastEvent::ALL {
            let name = event.dom_event_name();
            let bus = self.inner.bus.clone();
            let listener = Closure::<dyn FnMut(_)>::new(move |e: Event| {
                if let Some(event) = BroadcastEvent::from_dom_event_name(&e.type_()) {
                    bus.publish(event);
                }
            });
            if window
                .add_event_listener_with_callback(&name, listener.as_ref().unchecked_ref())
                .is_ok()
            {
                self.inner
                    .window_listeners
                    .borrow_mut()
                    .push((name, listener));
            }
        }
    }

    /// Start the mutation observer and scan once. Idempotent.
    pub fn start_observing(&self) {
        if self.inner.observer.borrow().is_some() {
            return;
        }
        let Some(body) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.body())
        else {
            tracing::warn!("No document body, hooks not mounted");
            return;
        };

        let weak = Rc::downgrade(&self.inner);
        let callback: ObserverCallback = Closure::new(move |_records: js_sys::Array, _obs: MutationObserver| {
            if let Some(inner) = weak.upgrade() {
                DomBridge { inner }.scan();
            }
        });
        let observer = match MutationObserver::new(callback.as_ref().unchecked_ref()) {
            Ok(observer) => observer,
            Err(e) => {
                tracing::error!("Failed to create MutationObserver: {:?}", e);
                return;
            }
        };

        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        options.set_attributes(true);
        let filter = js_sys::Array::of2(&dom::HOOK_ATTRIBUTE.into(), &"id".into());
        options.set_attribute_filter(&filter);
        if let Err(e) = observer.observe_with_options(&body, &options) {
            tracing::error!("Failed to observe document: {:?}", e);
            return;
        }

        *self.inner.observer.borrow_mut() = Some((observer, callback));
        tracing::debug!("Observing document for hook elements");
        self.scan();
    }

    /// Attach and detach bindings to match the current document.
    pub fn scan(&self) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let Ok(nodes) = document.query_selector_all(&format!("[{}]", dom::HOOK_ATTRIBUTE)) else {
            return;
        };

        let mut found = Vec::new();
        for i in 0..nodes.length() {
            let Some(element) = nodes.item(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
                continue;
            };
            let Some(hook_name) = element.get_attribute(dom::HOOK_ATTRIBUTE) else {
                continue;
            };
            let element_id = element.id();
            if element_id.is_empty() {
                tracing::warn!(hook = %hook_name, "phx-hook element without an id, skipped");
                continue;
            }
            found.push(FoundHook {
                element_id,
                hook_name,
                node: element,
            });
        }

        let actions = plan_mounts(&self.inner.mounted.borrow(), &found, |a, b| {
            a.is_same_node(Some(b.as_ref()))
        });

        for action in actions {
            match action {
                MountAction::Detach { element_id } => {
                    self.inner.mounted.borrow_mut().remove(&element_id);
                    self.inner.hooks.detach(&element_id);
                }
                MountAction::Attach {
                    element_id,
                    hook_name,
                } => {
                    let Some(hook) = found.iter().find(|f| f.element_id == element_id) else {
                        continue;
                    };
                    let element = Rc::new(WebHookElement::new(hook.node.clone()));
                    if self.inner.hooks.attach(&element_id, &hook_name, element) {
                        self.inner
                            .mounted
                            .borrow_mut()
                            .insert(element_id, (hook_name, hook.node.clone()));
                    } else {
                        self.inner.mounted.borrow_mut().remove(&element_id);
                    }
                }
            }
        }
    }

    /// Stop observing, remove window listeners and detach every mount.
    pub fn uninstall(&self) {
        if let Some((observer, _callback)) = self.inner.observer.borrow_mut().take() {
            observer.disconnect();
        }
        if let Some(window) = web_sys::window() {
            for (name, listener) in self.inner.window_listeners.borrow_mut().drain(..) {
                let _ = window
                    .remove_event_listener_with_callback(&name, listener.as_ref().unchecked_ref());
            }
        }
        if let Some(id) = self.inner.subscription.take() {
            self.inner.bus.unsubscribe(id);
        }
        let ids: Vec<String> = self.inner.mounted.borrow_mut().drain().map(|(id, _)| id).collect();
        for id in ids {
            self.inner.hooks.detach(&id);
        }
    }
}

/// A bound DOM element. Click listeners are removed when the binding drops.
struct WebHookElement {
    element: Element,
    listeners: RefCell<Vec<Closure<dyn FnMut(Event)>>>,
}

impl WebHookElement {
    fn new(element: Element) -> Self {
        Self {
            element,
            listeners: RefCell::new(Vec::new()),
        }
    }
}

impl HookElement for WebHookElement {
    fn set_input_value(&self, input_name: &str, value: &str) -> bool {
        let input = self
            .element
            .query_selector(&format!("input[name='{}']", input_name))
            .ok()
            .flatten()
            .and_then(|e| e.dyn_into::<HtmlInputElement>().ok());
        match input {
            Some(input) => {
                input.set_value(value);
                true
            }
            None => false,
        }
    }

    fn data_attribute(&self, key: &str) -> Option<String> {
        self.element.get_attribute(&format!("data-{}", key))
    }

    fn focus(&self) {
        if let Some(element) = self.element.dyn_ref::<HtmlElement>() {
            let _ = element.focus();
        }
    }

    fn add_click_listener(&self, listener: Box<dyn Fn()>) {
        let closure = Closure::<dyn FnMut(_)>::new(move |_e: Event| listener());
        match self
            .element
            .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())
        {
            Ok(()) => self.listeners.borrow_mut().push(closure),
            Err(e) => tracing::warn!("Failed to add click listener: {:?}", e),
        }
    }
}

impl Drop for WebHookElement {
    fn drop(&mut self) {
        for closure in self.listeners.borrow_mut().drain(..) {
            let _ = self
                .element
                .remove_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        }
    }
}
