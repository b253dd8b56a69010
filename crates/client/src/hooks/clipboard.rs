//! `Clipboard`: copies text on click or when the server asks.

use gang_protocol::{event_names, ServerEvent};

use crate::ports::outbound::dom;

use super::{Hook, HookContext};

#[derive(Debug, Default)]
pub struct Clipboard;

impl Hook for Clipboard {
    fn on_attach(&mut self, ctx: &HookContext) {
        ctx.listen_click();
        ctx.handle_event(event_names::COPY_TO_CLIPBOARD);
    }

    fn on_click(&mut self, ctx: &HookContext) {
        match ctx.element().data_attribute(dom::CLIPBOARD_TEXT_KEY) {
            Some(text) => copy(ctx, text, false),
            None => tracing::warn!(
                element_id = ctx.element_id(),
                "Clipboard element has no data-clipboard-text, nothing copied"
            ),
        }
    }

    fn on_event(&mut self, ctx: &HookContext, event: &ServerEvent) {
        if let ServerEvent::CopyToClipboard { text } = event {
            copy(ctx, text.clone(), true);
        }
    }
}

/// Write `text` in the background. Failures are logged and never retried.
fn copy(ctx: &HookContext, text: String, focus_on_success: bool) {
    let write = ctx.clipboard().write_text(&text);
    let element = ctx.element();
    let attached = ctx.attached_flag();
    let element_id = ctx.element_id().to_string();

    ctx.spawn(Box::pin(async move {
        match write.await {
            Ok(()) => {
                tracing::debug!(element_id = %element_id, chars = text.chars().count(), "Copied to clipboard");
                if focus_on_success && attached.get() {
                    element.focus();
                }
            }
            Err(e) => {
                tracing::error!(element_id = %element_id, error = %e, "Clipboard write failed");
            }
        }
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClipboardError;
    use crate::testing::{hook_context, FakeElement, HookFixture};
    use std::rc::Rc;

    #[test]
    fn test_click_copies_data_attribute() {
        let fixture = HookFixture::new();
        let element = Rc::new(FakeElement::new().with_data("clipboard-text", "ROOM-1"));
        let ctx = hook_context(&fixture, "copy", Rc::clone(&element));
        let mut hook = Clipboard;
        hook.on_attach(&ctx);

        hook.on_click(&ctx);
        fixture.spawner.run_all();

        assert_eq!(fixture.clipboard.writes(), vec!["ROOM-1".to_string()]);
        assert_eq!(element.focus_count(), 0);
    }

    #[test]
    fn test_click_without_attribute_writes_nothing() {
        let fixture = HookFixture::new();
        let ctx = hook_context(&fixture, "copy", Rc::new(FakeElement::new()));
        let mut hook = Clipboard;
        hook.on_attach(&ctx);

        hook.on_click(&ctx);
        fixture.spawner.run_all();

        assert!(fixture.clipboard.writes().is_empty());
    }

    #[test]
    fn test_server_copy_focuses_after_success() {
        let fixture = HookFixture::new();
        let element = Rc::new(FakeElement::new());
        let ctx = hook_context(&fixture, "copy", Rc::clone(&element));
        let mut hook = Clipboard;
        hook.on_attach(&ctx);

        hook.on_event(&ctx, &ServerEvent::CopyToClipboard { text: "X".into() });
        fixture.spawner.run_all();

        assert_eq!(fixture.clipboard.writes(), vec!["X".to_string()]);
        assert_eq!(element.focus_count(), 1);
    }

    #[test]
    fn test_copies_converge_to_last_write() {
        let fixture = HookFixture::new();
        let element = Rc::new(FakeElement::new().with_data("clipboard-text", "A"));
        let ctx = hook_context(&fixture, "copy", Rc::clone(&element));
        let mut hook = Clipboard;
        hook.on_attach(&ctx);

        hook.on_click(&ctx);
        hook.on_event(&ctx, &ServerEvent::CopyToClipboard { text: "B".into() });
        fixture.spawner.run_all();

        assert_eq!(fixture.clipboard.contents().as_deref(), Some("B"));
    }

    #[test]
    fn test_denied_write_does_not_focus() {
        let fixture = HookFixture::new();
        fixture
            .clipboard
            .fail_with(ClipboardError::Denied("not allowed".into()));
        let element = Rc::new(FakeElement::new());
        let ctx = hook_context(&fixture, "copy", Rc::clone(&element));
        let mut hook = Clipboard;
        hook.on_attach(&ctx);

        hook.on_event(&ctx, &ServerEvent::CopyToClipboard { text: "X".into() });
        fixture.spawner.run_all();

        assert!(fixture.clipboard.writes().is_empty());
        assert_eq!(element.focus_count(), 0);
    }

    #[test]
    fn test_attach_registers_one_click_listener() {
        let fixture = HookFixture::new();
        let element = Rc::new(FakeElement::new().with_data("clipboard-text", "ROOM-9"));
        let ctx = hook_context(&fixture, "copy", Rc::clone(&element));
        let mut hook = Clipboard;
        hook.on_attach(&ctx);
        ctx.listen_click();

        assert_eq!(element.click_listener_count(), 1);
    }
}
