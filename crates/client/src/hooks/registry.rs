//! Hook registry: symbolic names to constructors, and the live bindings.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use gang_protocol::ServerEvent;

use crate::ports::outbound::HookElement;

use super::{Clipboard, Hook, HookContext, HookServices, SetPlayerName};

/// Names used in `phx-hook` attributes.
pub mod hook_names {
    pub const SET_PLAYER_NAME: &str = "SetPlayerName";
    pub const CLIPBOARD: &str = "Clipboard";
}

pub type HookFactory = Rc<dyn Fn() -> Box<dyn Hook>>;

struct Binding {
    element_id: String,
    hook_name: &'static str,
    serial: u64,
    hook: Rc<RefCell<Box<dyn Hook>>>,
    ctx: Rc<HookContext>,
}

struct RegistryInner {
    factories: RefCell<HashMap<&'static str, HookFactory>>,
    /// In attach order
    bindings: RefCell<Vec<Binding>>,
    services: HookServices,
    next_serial: Cell<u64>,
}

#[derive(Clone)]
pub struct HookRegistry {
    inner: Rc<RegistryInner>,
}

type BoundHook = (Rc<RefCell<Box<dyn Hook>>>, Rc<HookContext>);

impl HookRegistry {
    /// Empty registry; see `with_default_hooks` for the standard set.
    pub fn new(services: HookServices) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                factories: RefCell::new(HashMap::new()),
                bindings: RefCell::new(Vec::new()),
                services,
                next_serial: Cell::new(0),
            }),
        }
    }

    /// Registry with `SetPlayerName` and `Clipboard` registered.
    pub fn with_default_hooks(services: HookServices) -> Self {
        let registry = Self::new(services);
        registry.register(hook_names::SET_PLAYER_NAME, || {
            Box::new(SetPlayerName::new())
        });
        registry.register(hook_names::CLIPBOARD, || Box::new(Clipboard));
        registry
    }

    pub fn register(&self, name: &'static str, factory: impl Fn() -> Box<dyn Hook> + 'static) {
        self.inner
            .factories
            .borrow_mut()
            .insert(name, Rc::new(factory));
    }

    /// Bind a new instance of `hook_name` to `element`.
    ///
    /// Re-attaching an id detaches the previous binding first. Returns false
    /// when the name is unknown.
    pub fn attach(&self, element_id: &str, hook_name: &str, element: Rc<dyn HookElement>) -> bool {
        let entry = self
            .inner
            .factories
            .borrow()
            .get_key_value(hook_name)
            .map(|(name, factory)| (*name, Rc::clone(factory)));
        let Some((hook_name, factory)) = entry else {
            tracing::warn!(hook = hook_name, element_id, "Unknown hook, element left unbound");
            return false;
        };

        if self.is_attached(element_id) {
            self.detach(element_id);
        }

        let serial = self.inner.next_serial.get();
        self.inner.next_serial.set(serial + 1);

        let ctx = Rc::new(HookContext::new(
            element_id,
            element,
            self.inner.services.clone(),
            self.click_route(element_id, serial),
        ));
        let hook = Rc::new(RefCell::new(factory()));

        self.inner.bindings.borrow_mut().push(Binding {
            element_id: element_id.to_string(),
            hook_name,
            serial,
            hook: Rc::clone(&hook),
            ctx: Rc::clone(&ctx),
        });

        tracing::debug!(hook = hook_name, element_id, "Hook attached");
        hook.borrow_mut().on_attach(&ctx);
        true
    }

    pub fn detach(&self, element_id: &str) -> bool {
        let removed = {
            let mut bindings = self.inner.bindings.borrow_mut();
            let position = bindings.iter().position(|b| b.element_id == element_id);
            position.map(|index| bindings.remove(index))
        };
        let Some(binding) = removed else {
            return false;
        };

        binding.ctx.mark_detached();
        match binding.hook.try_borrow_mut() {
            Ok(mut hook) => hook.on_detach(&binding.ctx),
            Err(_) => tracing::warn!(element_id, "Hook busy during detach, skipping on_detach"),
        }
        tracing::debug!(hook = binding.hook_name, element_id, "Hook detached");
        true
    }

    /// Deliver `event` to every binding subscribed to it, in attach order.
    ///
    /// Returns the number of bindings reached.
    pub fn dispatch(&self, event: &ServerEvent) -> usize {
        let targets: Vec<BoundHook> = self
            .inner
            .bindings
            .borrow()
            .iter()
            .filter(|b| b.ctx.is_subscribed(event.name()))
            .map(|b| (Rc::clone(&b.hook), Rc::clone(&b.ctx)))
            .collect();

        if targets.is_empty() {
            tracing::debug!(event = event.name(), "No hook subscribed to server push");
        }

        let mut delivered = 0;
        for (hook, ctx) in targets {
            match hook.try_borrow_mut() {
                Ok(mut hook) => {
                    hook.on_event(&ctx, event);
                    delivered += 1;
                }
                Err(_) => tracing::warn!(
                    event = event.name(),
                    element_id = ctx.element_id(),
                    "Hook busy, dropping re-entrant event"
                ),
            }
        }
        delivered
    }

    /// Deliver a click to the binding on `element_id`, if it listens for clicks.
    pub fn click(&self, element_id: &str) -> bool {
        let target = self.find(|b| b.element_id == element_id);
        Self::deliver_click(target)
    }

    pub fn detach_all(&self) {
        let ids: Vec<String> = self
            .inner
            .bindings
            .borrow()
            .iter()
            .map(|b| b.element_id.clone())
            .collect();
        for id in ids {
            self.detach(&id);
        }
    }

    pub fn is_attached(&self, element_id: &str) -> bool {
        self.inner
            .bindings
            .borrow()
            .iter()
            .any(|b| b.element_id == element_id)
    }

    pub fn binding_count(&self) -> usize {
        self.inner.bindings.borrow().len()
    }

    fn find(&self, predicate: impl Fn(&Binding) -> bool) -> Option<BoundHook> {
        self.inner
            .bindings
            .borrow()
            .iter()
            .find(|b| predicate(b))
            .map(|b| (Rc::clone(&b.hook), Rc::clone(&b.ctx)))
    }

    fn deliver_click(target: Option<BoundHook>) -> bool {
        let Some((hook, ctx)) = target else {
            return false;
        };
        if !ctx.listens_clicks() {
            return false;
        }
        let delivered = match hook.try_borrow_mut() {
            Ok(mut hook) => {
                hook.on_click(&ctx);
                true
            }
            Err(_) => {
                tracing::warn!(element_id = ctx.element_id(), "Hook busy, dropping click");
                false
            }
        };
        delivered
    }

    /// An element listener may outlive its binding, so each routes by binding
    /// serial and goes quiet once its binding is gone.
    fn click_route(&self, element_id: &str, serial: u64) -> Rc<dyn Fn()> {
        let registry: Weak<RegistryInner> = Rc::downgrade(&self.inner);
        let element_id = element_id.to_string();
        Rc::new(move || {
            let Some(inner) = registry.upgrade() else {
                return;
            };
            let registry = HookRegistry { inner };
            let target = registry.find(|b| b.element_id == element_id && b.serial == serial);
            HookRegistry::deliver_click(target);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{hook_services, FakeElement, HookFixture};
    use gang_protocol::PlayerIdentity;

    struct Counting {
        events: Rc<RefCell<Vec<String>>>,
        label: &'static str,
    }

    impl Hook for Counting {
        fn on_attach(&mut self, ctx: &HookContext) {
            ctx.handle_event("save_player_info");
            self.events.borrow_mut().push(format!("{}:attach", self.label));
        }

        fn on_detach(&mut self, _ctx: &HookContext) {
            self.events.borrow_mut().push(format!("{}:detach", self.label));
        }

        fn on_event(&mut self, ctx: &HookContext, event: &ServerEvent) {
            self.events
                .borrow_mut()
                .push(format!("{}:{}:{}", self.label, ctx.element_id(), event.name()));
        }
    }

    fn counting_registry(fixture: &HookFixture) -> (HookRegistry, Rc<RefCell<Vec<String>>>) {
        let registry = HookRegistry::new(hook_services(fixture));
        let events = Rc::new(RefCell::new(Vec::new()));
        let events_a = Rc::clone(&events);
        registry.register("A", move || {
            Box::new(Counting {
                events: Rc::clone(&events_a),
                label: "A",
            })
        });
        (registry, events)
    }

    fn save_event() -> ServerEvent {
        ServerEvent::SavePlayerInfo(PlayerIdentity::new("Ava", "p-42"))
    }

    #[test]
    fn test_unknown_hook_is_not_bound() {
        let fixture = HookFixture::new();
        let registry = HookRegistry::with_default_hooks(hook_services(&fixture));

        assert!(!registry.attach("el-1", "Nope", Rc::new(FakeElement::new())));
        assert_eq!(registry.binding_count(), 0);
    }

    #[test]
    fn test_dispatch_reaches_subscribers_in_attach_order() {
        let fixture = HookFixture::new();
        let (registry, events) = counting_registry(&fixture);

        registry.attach("first", "A", Rc::new(FakeElement::new()));
        registry.attach("second", "A", Rc::new(FakeElement::new()));
        let delivered = registry.dispatch(&save_event());

        assert_eq!(delivered, 2);
        assert_eq!(
            events.borrow()[2..],
            [
                "A:first:save_player_info".to_string(),
                "A:second:save_player_info".to_string()
            ]
        );
    }

    #[test]
    fn test_unsubscribed_event_is_not_delivered() {
        let fixture = HookFixture::new();
        let (registry, _events) = counting_registry(&fixture);
        registry.attach("first", "A", Rc::new(FakeElement::new()));

        let delivered = registry.dispatch(&ServerEvent::CopyToClipboard { text: "x".into() });

        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_reattach_detaches_previous_binding() {
        let fixture = HookFixture::new();
        let (registry, events) = counting_registry(&fixture);

        registry.attach("el", "A", Rc::new(FakeElement::new()));
        registry.attach("el", "A", Rc::new(FakeElement::new()));

        assert_eq!(registry.binding_count(), 1);
        assert_eq!(
            *events.borrow(),
            vec!["A:attach", "A:detach", "A:attach"]
        );
    }

    #[test]
    fn test_detached_binding_gets_nothing() {
        let fixture = HookFixture::new();
        let (registry, events) = counting_registry(&fixture);
        registry.attach("el", "A", Rc::new(FakeElement::new()));

        assert!(registry.detach("el"));
        assert!(!registry.detach("el"));
        registry.dispatch(&save_event());

        assert_eq!(*events.borrow(), vec!["A:attach", "A:detach"]);
    }

    #[test]
    fn test_stale_element_listener_is_ignored() {
        let fixture = HookFixture::new();
        let registry = HookRegistry::with_default_hooks(hook_services(&fixture));
        let element = Rc::new(FakeElement::new().with_data("clipboard-text", "ROOM-1"));

        registry.attach("copy", hook_names::CLIPBOARD, Rc::clone(&element) as Rc<dyn HookElement>);
        registry.attach("copy", hook_names::CLIPBOARD, Rc::clone(&element) as Rc<dyn HookElement>);
        element.click();
        fixture.spawner.run_all();

        assert_eq!(fixture.clipboard.writes(), vec!["ROOM-1".to_string()]);
    }

    #[test]
    fn test_detach_all_clears_bindings() {
        let fixture = HookFixture::new();
        let (registry, events) = counting_registry(&fixture);
        registry.attach("a", "A", Rc::new(FakeElement::new()));
        registry.attach("b", "A", Rc::new(FakeElement::new()));

        registry.detach_all();

        assert_eq!(registry.binding_count(), 0);
        assert_eq!(events.borrow().iter().filter(|e| e.ends_with("detach")).count(), 2);
    }
}
