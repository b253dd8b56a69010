//! `SetPlayerName`: hands a cached identity back to the server on mount and
//! caches whatever identity the server assigns.

use gang_protocol::{event_names, ClientEvent, ServerEvent};

use crate::ports::outbound::dom;

use super::{Hook, HookContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestorationState {
    #[default]
    Uninitialized,
    /// A complete identity was found and pushed
    Restored,
    /// Nothing (or only half) was cached, or the push had no session to go to
    Idle,
}

#[derive(Debug, Default)]
pub struct SetPlayerName {
    state: RestorationState,
}

impl SetPlayerName {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RestorationState {
        self.state
    }
}

impl Hook for SetPlayerName {
    fn on_attach(&mut self, ctx: &HookContext) {
        ctx.handle_event(event_names::SAVE_PLAYER_INFO);

        let stored = ctx.identity().read();
        if let Some(name) = stored.name() {
            if !ctx.element().set_input_value(dom::PLAYER_NAME_INPUT, name) {
                tracing::debug!(
                    element_id = ctx.element_id(),
                    "No player_name input inside hook element"
                );
            }
        }

        match stored.complete() {
            Some(identity) => {
                tracing::info!(player_id = %identity.id, "Restoring cached player identity");
                self.state = if ctx.push(ClientEvent::RestorePlayerInfo(identity.clone())) {
                    RestorationState::Restored
                } else {
                    tracing::debug!(
                        element_id = ctx.element_id(),
                        "Socket not connected, identity restore dropped"
                    );
                    RestorationState::Idle
                };
            }
            None => {
                tracing::debug!(cached = ?stored, "No complete cached identity, nothing to restore");
                self.state = RestorationState::Idle;
            }
        }
    }

    fn on_event(&mut self, ctx: &HookContext, event: &ServerEvent) {
        if let ServerEvent::SavePlayerInfo(identity) = event {
            ctx.identity().write(identity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{hook_context, FakeElement, HookFixture};
    use gang_protocol::PlayerIdentity;
    use std::rc::Rc;

    fn element_with_input() -> Rc<FakeElement> {
        Rc::new(FakeElement::new().with_input("player_name"))
    }

    #[test]
    fn test_complete_identity_is_restored_and_pushed() {
        let fixture = HookFixture::new();
        fixture.storage.save_identity("Ava", "p-42");
        let element = element_with_input();
        let ctx = hook_context(&fixture, "form", Rc::clone(&element));
        let mut hook = SetPlayerName::new();

        hook.on_attach(&ctx);

        assert_eq!(hook.state(), RestorationState::Restored);
        assert_eq!(element.input_value("player_name").as_deref(), Some("Ava"));
        assert_eq!(
            fixture.pusher.pushed(),
            vec![ClientEvent::RestorePlayerInfo(PlayerIdentity::new("Ava", "p-42"))]
        );
    }

    #[test]
    fn test_dropped_restore_push_leaves_hook_idle() {
        let fixture = HookFixture::new();
        fixture.storage.save_identity("Ava", "p-42");
        fixture.pusher.set_offline(true);
        let element = element_with_input();
        let ctx = hook_context(&fixture, "form", Rc::clone(&element));
        let mut hook = SetPlayerName::new();

        hook.on_attach(&ctx);

        assert_eq!(hook.state(), RestorationState::Idle);
        assert_eq!(element.input_value("player_name").as_deref(), Some("Ava"));
        assert!(fixture.pusher.pushed().is_empty());
    }

    #[test]
    fn test_name_only_fills_input_without_push() {
        let fixture = HookFixture::new();
        fixture.storage.save_raw("player_name", "Ava");
        let element = element_with_input();
        let ctx = hook_context(&fixture, "form", Rc::clone(&element));
        let mut hook = SetPlayerName::new();

        hook.on_attach(&ctx);

        assert_eq!(hook.state(), RestorationState::Idle);
        assert_eq!(element.input_value("player_name").as_deref(), Some("Ava"));
        assert!(fixture.pusher.pushed().is_empty());
    }

    #[test]
    fn test_id_only_does_nothing() {
        let fixture = HookFixture::new();
        fixture.storage.save_raw("player_id", "p-42");
        let element = element_with_input();
        let ctx = hook_context(&fixture, "form", Rc::clone(&element));
        let mut hook = SetPlayerName::new();

        hook.on_attach(&ctx);

        assert_eq!(hook.state(), RestorationState::Idle);
        assert_eq!(element.input_value("player_name").as_deref(), Some(""));
        assert!(fixture.pusher.pushed().is_empty());
    }

    #[test]
    fn test_save_player_info_overwrites_store() {
        let fixture = HookFixture::new();
        fixture.storage.save_identity("Ava", "p-42");
        let ctx = hook_context(&fixture, "form", element_with_input());
        let mut hook = SetPlayerName::new();
        hook.on_attach(&ctx);

        hook.on_event(
            &ctx,
            &ServerEvent::SavePlayerInfo(PlayerIdentity::new("Bo", "p-7")),
        );

        assert_eq!(fixture.storage.get("player_name").as_deref(), Some("Bo"));
        assert_eq!(fixture.storage.get("player_id").as_deref(), Some("p-7"));
    }

    #[test]
    fn test_reattach_repeats_push_without_writing() {
        let fixture = HookFixture::new();
        fixture.storage.save_identity("Ava", "p-42");
        let writes_before = fixture.storage.write_count();

        for _ in 0..2 {
            let ctx = hook_context(&fixture, "form", element_with_input());
            SetPlayerName::new().on_attach(&ctx);
        }

        let pushed = fixture.pusher.pushed();
        assert_eq!(pushed.len(), 2);
        assert_eq!(pushed[0], pushed[1]);
        assert_eq!(fixture.storage.write_count(), writes_before);
    }
}
