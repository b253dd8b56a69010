//! Test doubles for the outbound ports.
//!
//! Enabled for unit tests and, through the `testing` feature, for downstream
//! integration tests. Everything here is single-threaded and records what it
//! was asked to do.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures_util::future;
use futures_util::task::noop_waker_ref;

use gang_protocol::ClientEvent;

use crate::error::ClipboardError;
use crate::hooks::{HookContext, HookServices, PushChannel};
use crate::identity::IdentityStore;
use crate::ports::outbound::{
    dom, storage_keys, ClipboardProvider, DocumentProvider, FrameProvider, HookElement,
    LocalFuture, ProgressBar, ScrollContainer, SleepProvider, StorageProvider, TaskSpawner,
};

#[cfg(not(target_arch = "wasm32"))]
mod scripted;

#[cfg(not(target_arch = "wasm32"))]
pub use scripted::{wait_until, LocalSpawner, OpenBehavior, OpenRecord, ScriptedConnector, ServerEnd};

// =============================================================================
// Storage
// =============================================================================

/// In-memory `StorageProvider`. Can simulate a blocked store.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
    unavailable: bool,
    writes: Cell<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that reads empty and drops writes (private browsing).
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    /// Seed an entry without counting it as a write.
    pub fn save_raw(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    pub fn save_identity(&self, name: &str, id: &str) {
        self.save_raw(storage_keys::PLAYER_NAME, name);
        self.save_raw(storage_keys::PLAYER_ID, id);
    }

    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl StorageProvider for MemoryStorage {
    fn save(&self, key: &str, value: &str) {
        if self.unavailable {
            return;
        }
        self.writes.set(self.writes.get() + 1);
        self.save_raw(key, value);
    }

    fn load(&self, key: &str) -> Option<String> {
        if self.unavailable {
            return None;
        }
        self.get(key)
    }
}

// =============================================================================
// Clipboard
// =============================================================================

/// Clipboard that records successful writes, or fails every write.
#[derive(Default)]
pub struct RecordingClipboard {
    writes: RefCell<Vec<String>>,
    failure: RefCell<Option<ClipboardError>>,
}

impl RecordingClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, error: ClipboardError) {
        *self.failure.borrow_mut() = Some(error);
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.borrow().clone()
    }

    /// What the clipboard holds now.
    pub fn contents(&self) -> Option<String> {
        self.writes.borrow().last().cloned()
    }
}

impl ClipboardProvider for RecordingClipboard {
    fn write_text(&self, text: &str) -> LocalFuture<Result<(), ClipboardError>> {
        let result = match self.failure.borrow().clone() {
            Some(error) => Err(error),
            None => {
                self.writes.borrow_mut().push(text.to_string());
                Ok(())
            }
        };
        Box::pin(future::ready(result))
    }
}

// =============================================================================
// Document
// =============================================================================

/// Element with named inputs, data attributes and click listeners.
#[derive(Default)]
pub struct FakeElement {
    inputs: RefCell<HashMap<String, String>>,
    data: HashMap<String, String>,
    focus_count: Cell<usize>,
    listeners: RefCell<Vec<Rc<dyn Fn()>>>,
}

impl FakeElement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty `<input name="{name}">`.
    pub fn with_input(self, name: &str) -> Self {
        self.inputs
            .borrow_mut()
            .insert(name.to_string(), String::new());
        self
    }

    /// Add a `data-{key}` attribute.
    pub fn with_data(mut self, key: &str, value: &str) -> Self {
        self.data.insert(key.to_string(), value.to_string());
        self
    }

    pub fn input_value(&self, name: &str) -> Option<String> {
        self.inputs.borrow().get(name).cloned()
    }

    pub fn focus_count(&self) -> usize {
        self.focus_count.get()
    }

    pub fn click_listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Fire every registered click listener.
    pub fn click(&self) {
        let listeners: Vec<Rc<dyn Fn()>> = self.listeners.borrow().clone();
        for listener in listeners {
            listener();
        }
    }
}

impl HookElement for FakeElement {
    fn set_input_value(&self, input_name: &str, value: &str) -> bool {
        match self.inputs.borrow_mut().get_mut(input_name) {
            Some(slot) => {
                *slot = value.to_string();
                true
            }
            None => false,
        }
    }

    fn data_attribute(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }

    fn focus(&self) {
        self.focus_count.set(self.focus_count.get() + 1);
    }

    fn add_click_listener(&self, listener: Box<dyn Fn()>) {
        self.listeners.borrow_mut().push(Rc::from(listener));
    }
}

/// Scrollable container that clamps its offset like a browser does.
pub struct FakeScrollContainer {
    scroll_height: Cell<i32>,
    client_height: i32,
    scroll_top: Cell<i32>,
    children: usize,
    last_child_scrolls: Cell<usize>,
}

impl FakeScrollContainer {
    pub fn new(scroll_height: i32, client_height: i32) -> Self {
        Self {
            scroll_height: Cell::new(scroll_height),
            client_height,
            scroll_top: Cell::new(0),
            children: 0,
            last_child_scrolls: Cell::new(0),
        }
    }

    pub fn with_children(mut self, children: usize) -> Self {
        self.children = children;
        self
    }

    /// Simulate content growing (new messages, images loading).
    pub fn set_scroll_height(&self, height: i32) {
        self.scroll_height.set(height);
    }

    pub fn scroll_top(&self) -> i32 {
        self.scroll_top.get()
    }

    pub fn last_child_scrolls(&self) -> usize {
        self.last_child_scrolls.get()
    }

    fn max_scroll_top(&self) -> i32 {
        (self.scroll_height.get() - self.client_height).max(0)
    }
}

impl ScrollContainer for FakeScrollContainer {
    fn scroll_height(&self) -> i32 {
        self.scroll_height.get()
    }

    fn set_scroll_top(&self, value: i32) {
        self.scroll_top.set(value.clamp(0, self.max_scroll_top()));
    }

    fn scroll_last_child_into_view(&self) -> bool {
        if self.children == 0 {
            return false;
        }
        self.last_child_scrolls.set(self.last_child_scrolls.get() + 1);
        self.scroll_top.set(self.max_scroll_top());
        true
    }
}

/// Page with a CSRF meta tag and any number of chat containers.
pub struct FakeDocument {
    csrf_token: String,
    chat_containers: RefCell<Vec<Rc<FakeScrollContainer>>>,
}

impl FakeDocument {
    pub fn new(csrf_token: &str) -> Self {
        Self {
            csrf_token: csrf_token.to_string(),
            chat_containers: RefCell::new(Vec::new()),
        }
    }

    pub fn add_chat_container(&self, container: FakeScrollContainer) -> Rc<FakeScrollContainer> {
        let container = Rc::new(container);
        self.chat_containers
            .borrow_mut()
            .push(Rc::clone(&container));
        container
    }
}

impl DocumentProvider for FakeDocument {
    fn meta_content(&self, name: &str) -> Option<String> {
        (name == dom::CSRF_META_NAME).then(|| self.csrf_token.clone())
    }

    fn elements_by_class(&self, class: &str) -> Vec<Rc<dyn ScrollContainer>> {
        if class != dom::CHAT_MESSAGES_CLASS {
            return Vec::new();
        }
        self.chat_containers
            .borrow()
            .iter()
            .map(|c| Rc::clone(c) as Rc<dyn ScrollContainer>)
            .collect()
    }
}

// =============================================================================
// Scheduling
// =============================================================================

/// Sleep that resolves immediately and records the requested durations.
#[derive(Default)]
pub struct InstantSleep {
    requested: RefCell<Vec<u64>>,
    on_sleep: RefCell<Option<Box<dyn Fn(u64)>>>,
}

impl InstantSleep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> Vec<u64> {
        self.requested.borrow().clone()
    }

    /// Run `callback` whenever a sleep is requested.
    pub fn on_sleep(&self, callback: impl Fn(u64) + 'static) {
        *self.on_sleep.borrow_mut() = Some(Box::new(callback));
    }
}

impl SleepProvider for InstantSleep {
    fn sleep_ms(&self, ms: u64) -> LocalFuture<()> {
        self.requested.borrow_mut().push(ms);
        if let Some(callback) = self.on_sleep.borrow().as_ref() {
            callback(ms);
        }
        Box::pin(future::ready(()))
    }
}

pub struct InstantFrames;

impl FrameProvider for InstantFrames {
    fn next_frame(&self) -> LocalFuture<()> {
        Box::pin(future::ready(()))
    }
}

/// Spawner that queues tasks until `run_all`.
#[derive(Default)]
pub struct QueuedSpawner {
    tasks: RefCell<VecDeque<LocalFuture<()>>>,
    completed: Cell<usize>,
}

impl QueuedSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll queued tasks (including ones they spawn) until none can progress.
    pub fn run_all(&self) {
        let mut stalled = Vec::new();
        loop {
            let next = self.tasks.borrow_mut().pop_front();
            let Some(mut task) = next else {
                break;
            };
            let mut cx = Context::from_waker(noop_waker_ref());
            match task.as_mut().poll(&mut cx) {
                Poll::Ready(()) => self.completed.set(self.completed.get() + 1),
                Poll::Pending => stalled.push(task),
            }
        }
        self.tasks.borrow_mut().extend(stalled);
    }

    pub fn completed(&self) -> usize {
        self.completed.get()
    }

    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }
}

impl TaskSpawner for QueuedSpawner {
    fn spawn(&self, task: LocalFuture<()>) {
        self.tasks.borrow_mut().push_back(task);
    }
}

/// Drive a future built only from instant fakes to completion.
pub fn block_on_local<F: Future>(fut: F) -> F::Output {
    let mut fut = pin!(fut);
    let mut cx = Context::from_waker(noop_waker_ref());
    for _ in 0..10_000 {
        if let Poll::Ready(output) = fut.as_mut().poll(&mut cx) {
            return output;
        }
    }
    panic!("future did not complete; is something waiting on a real timer?");
}

// =============================================================================
// Progress bar
// =============================================================================

#[derive(Default)]
pub struct RecordingProgressBar {
    calls: RefCell<Vec<&'static str>>,
}

impl RecordingProgressBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }
}

impl ProgressBar for RecordingProgressBar {
    fn show(&self) {
        self.calls.borrow_mut().push("show");
    }

    fn hide(&self) {
        self.calls.borrow_mut().push("hide");
    }
}

// =============================================================================
// Hooks
// =============================================================================

/// Push channel that records everything it accepts.
#[derive(Default)]
pub struct RecordingPusher {
    pushed: RefCell<Vec<ClientEvent>>,
    offline: Cell<bool>,
}

impl RecordingPusher {
    pub fn pushed(&self) -> Vec<ClientEvent> {
        self.pushed.borrow().clone()
    }

    /// Refuse pushes the way a socket without a session does.
    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }
}

impl PushChannel for RecordingPusher {
    fn push(&self, event: ClientEvent) -> bool {
        if self.offline.get() {
            return false;
        }
        self.pushed.borrow_mut().push(event);
        true
    }
}

/// Shared fakes behind a hook's services.
pub struct HookFixture {
    pub storage: Rc<MemoryStorage>,
    pub clipboard: Rc<RecordingClipboard>,
    pub spawner: Rc<QueuedSpawner>,
    pub pusher: Rc<RecordingPusher>,
}

impl HookFixture {
    pub fn new() -> Self {
        Self {
            storage: Rc::new(MemoryStorage::new()),
            clipboard: Rc::new(RecordingClipboard::new()),
            spawner: Rc::new(QueuedSpawner::new()),
            pusher: Rc::new(RecordingPusher::default()),
        }
    }
}

impl Default for HookFixture {
    fn default() -> Self {
        Self::new()
    }
}

pub fn hook_services(fixture: &HookFixture) -> HookServices {
    HookServices {
        identity: IdentityStore::new(Rc::clone(&fixture.storage) as Rc<dyn StorageProvider>),
        clipboard: Rc::clone(&fixture.clipboard) as Rc<dyn ClipboardProvider>,
        spawner: Rc::clone(&fixture.spawner) as Rc<dyn TaskSpawner>,
        pusher: Rc::clone(&fixture.pusher) as Rc<dyn PushChannel>,
    }
}

/// A standalone context for driving one hook directly.
pub fn hook_context(fixture: &HookFixture, element_id: &str, element: Rc<FakeElement>) -> HookContext {
    HookContext::new(
        element_id,
        element,
        hook_services(fixture),
        Rc::new(|| {}),
    )
}
