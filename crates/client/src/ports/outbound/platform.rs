//! Platform abstraction ports for cross-platform compatibility
//!
//! These traits abstract browser operations so that:
//! 1. Identity, hook, and broadcast code remains platform-agnostic
//! 2. Platform-specific code is isolated in infrastructure
//! 3. Code becomes easily testable with fake implementations
//!
//! Everything here runs on a single event-loop thread, so none of the traits
//! require `Send`/`Sync` and returned futures are local.

use std::{future::Future, pin::Pin, rc::Rc};

use crate::error::ClipboardError;

/// A boxed future that stays on the current thread.
pub type LocalFuture<T> = Pin<Box<dyn Future<Output = T> + 'static>>;

/// Persistent key-value storage (localStorage / file-based).
///
/// Implementations never fail: an unavailable store reads as empty and
/// ignores writes.
#[cfg_attr(test, mockall::automock)]
pub trait StorageProvider {
    /// Save a string value with the given key
    fn save(&self, key: &str, value: &str);

    /// Load a string value by key, returns None if not found
    fn load(&self, key: &str) -> Option<String>;
}

/// System clipboard.
pub trait ClipboardProvider {
    /// Write `text` to the clipboard. The write may need user permission, so
    /// it completes asynchronously.
    fn write_text(&self, text: &str) -> LocalFuture<Result<(), ClipboardError>>;
}

/// Async sleep abstraction
pub trait SleepProvider {
    fn sleep_ms(&self, ms: u64) -> LocalFuture<()>;
}

/// Resolves at the next rendering opportunity (`requestAnimationFrame`).
pub trait FrameProvider {
    fn next_frame(&self) -> LocalFuture<()>;
}

/// Spawns a task on the current event loop.
pub trait TaskSpawner {
    fn spawn(&self, task: LocalFuture<()>);
}

/// Read-only queries against the rendered page.
#[cfg_attr(test, mockall::automock)]
pub trait DocumentProvider {
    /// `content` of `<meta name="{name}">`
    fn meta_content(&self, name: &str) -> Option<String>;

    /// Every element currently carrying `class`, in document order.
    fn elements_by_class(&self, class: &str) -> Vec<Rc<dyn ScrollContainer>>;
}

/// A scrollable element such as a chat message list.
pub trait ScrollContainer {
    fn scroll_height(&self) -> i32;

    fn set_scroll_top(&self, value: i32);

    /// Bring the last child element into view (instant, aligned to the end).
    ///
    /// Returns false when the container has no children.
    fn scroll_last_child_into_view(&self) -> bool;
}

/// The DOM element a hook is bound to.
pub trait HookElement {
    /// Set the value of `<input name="{input_name}">` inside this element.
    ///
    /// Returns false if no such input exists.
    fn set_input_value(&self, input_name: &str, value: &str) -> bool;

    /// Value of the `data-{key}` attribute.
    fn data_attribute(&self, key: &str) -> Option<String>;

    fn focus(&self);

    /// Register a click listener for as long as the element lives.
    fn add_click_listener(&self, listener: Box<dyn Fn()>);
}

/// The navigation progress bar painter.
#[cfg_attr(test, mockall::automock)]
pub trait ProgressBar {
    fn show(&self);
    fn hide(&self);
}

/// Storage key constants
///
/// These are kept in the ports layer as they define the contract for
/// what keys are used across the application.
pub mod storage_keys {
    pub const PLAYER_NAME: &str = "player_name";
    pub const PLAYER_ID: &str = "player_id";
}

/// Markup contract with the renderer.
pub mod dom {
    /// `<meta name="csrf-token" content="...">`
    pub const CSRF_META_NAME: &str = "csrf-token";
    /// Class shared by every chat message list.
    pub const CHAT_MESSAGES_CLASS: &str = "chat-messages";
    /// Attribute naming the hook bound to an element.
    pub const HOOK_ATTRIBUTE: &str = "phx-hook";
    /// `data-clipboard-text`
    pub const CLIPBOARD_TEXT_KEY: &str = "clipboard-text";
    /// Input restored by the identity hook.
    pub const PLAYER_NAME_INPUT: &str = "player_name";
}
