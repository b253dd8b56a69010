//! WASM platform implementations
//!
//! web-sys adapters over the browser: localStorage, the async clipboard API,
//! `requestAnimationFrame`, and a fixed top progress bar.

use std::cell::RefCell;
use std::rc::Rc;

use futures_channel::oneshot;
use gloo_timers::future::TimeoutFuture;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Element, HtmlElement, ScrollBehavior, ScrollIntoViewOptions, ScrollLogicalPosition};

use crate::config::ClientConfig;
use crate::error::ClipboardError;
use crate::ports::outbound::{
    ClipboardProvider, DocumentProvider, FrameProvider, LocalFuture, ProgressBar,
    ScrollContainer, SleepProvider, StorageProvider, TaskSpawner,
};
use crate::state::Platform;

const TOP_BAR_COLOR: &str = "#29d";
const TOP_BAR_SHADOW: &str = "0 0 10px rgba(0, 0, 0, .3)";

/// localStorage-backed storage. Private browsing or a disabled store reads
/// empty and drops writes.
#[derive(Clone, Default)]
pub struct WasmStorageProvider;

impl WasmStorageProvider {
    fn storage() -> Option<web_sys::Storage> {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        if storage.is_none() {
            tracing::warn!("localStorage unavailable");
        }
        storage
    }
}

impl StorageProvider for WasmStorageProvider {
    fn save(&self, key: &str, value: &str) {
        if let Some(storage) = Self::storage() {
            if let Err(e) = storage.set_item(key, value) {
                tracing::warn!(key, "localStorage write failed: {:?}", e);
            }
        }
    }

    fn load(&self, key: &str) -> Option<String> {
        Self::storage().and_then(|s| s.get_item(key).ok().flatten())
    }
}

/// `navigator.clipboard.writeText`
#[derive(Clone, Default)]
pub struct WasmClipboardProvider;

impl ClipboardProvider for WasmClipboardProvider {
    fn write_text(&self, text: &str) -> LocalFuture<Result<(), ClipboardError>> {
        let text = text.to_string();
        Box::pin(async move {
            let window = web_sys::window()
                .ok_or_else(|| ClipboardError::Unavailable("no window".to_string()))?;
            let promise = window.navigator().clipboard().write_text(&text);
            JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|e| ClipboardError::Denied(format!("{:?}", e)))
        })
    }
}

/// Queries against `window.document`.
#[derive(Clone, Default)]
pub struct WasmDocumentProvider;

impl DocumentProvider for WasmDocumentProvider {
    fn meta_content(&self, name: &str) -> Option<String> {
        let document = web_sys::window()?.document()?;
        let meta = document
            .query_selector(&format!("meta[name='{}']", name))
            .ok()
            .flatten()?;
        meta.get_attribute("content")
    }

    fn elements_by_class(&self, class: &str) -> Vec<Rc<dyn ScrollContainer>> {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return Vec::new();
        };
        let collection = document.get_elements_by_class_name(class);
        (0..collection.length())
            .filter_map(|i| collection.item(i))
            .map(|element| Rc::new(DomScrollContainer(element)) as Rc<dyn ScrollContainer>)
            .collect()
    }
}

/// A live DOM element used as a scroll container.
struct DomScrollContainer(Element);

impl ScrollContainer for DomScrollContainer {
    fn scroll_height(&self) -> i32 {
        self.0.scroll_height()
    }

    fn set_scroll_top(&self, value: i32) {
        self.0.set_scroll_top(value);
    }

    fn scroll_last_child_into_view(&self) -> bool {
        let Some(last) = self.0.last_element_child() else {
            return false;
        };
        let options = ScrollIntoViewOptions::new();
        options.set_behavior(ScrollBehavior::Instant);
        options.set_block(ScrollLogicalPosition::End);
        last.scroll_into_view_with_scroll_into_view_options(&options);
        true
    }
}

/// WASM sleep provider using gloo timers
#[derive(Clone, Default)]
pub struct WasmSleepProvider;

impl SleepProvider for WasmSleepProvider {
    fn sleep_ms(&self, ms: u64) -> LocalFuture<()> {
        let ms = u32::try_from(ms).unwrap_or(u32::MAX);
        Box::pin(async move {
            TimeoutFuture::new(ms).await;
        })
    }
}

/// Resolves on the next `requestAnimationFrame` callback.
#[derive(Clone, Default)]
pub struct RafFrameProvider;

impl FrameProvider for RafFrameProvider {
    fn next_frame(&self) -> LocalFuture<()> {
        let (tx, rx) = oneshot::channel::<()>();
        let callback = Closure::once_into_js(move || {
            let _ = tx.send(());
        });
        let scheduled = web_sys::window()
            .map(|w| w.request_animation_frame(callback.unchecked_ref()).is_ok())
            .unwrap_or(false);

        Box::pin(async move {
            if scheduled {
                let _ = rx.await;
            } else {
                // No frame loop (hidden document or no window), fall back to a timer
                TimeoutFuture::new(16).await;
            }
        })
    }
}

#[derive(Clone, Default)]
pub struct SpawnLocalSpawner;

impl TaskSpawner for SpawnLocalSpawner {
    fn spawn(&self, task: LocalFuture<()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

/// Thin bar fixed to the top of the viewport, created on first show.
#[derive(Clone, Default)]
pub struct TopBar {
    bar: Rc<RefCell<Option<HtmlElement>>>,
}

impl TopBar {
    fn element(&self) -> Option<HtmlElement> {
        if let Some(bar) = self.bar.borrow().as_ref() {
            return Some(bar.clone());
        }

        let document = web_sys::window()?.document()?;
        let bar: HtmlElement = document.create_element("div").ok()?.dyn_into().ok()?;
        let style = bar.style();
        for (property, value) in [
            ("position", "fixed"),
            ("top", "0"),
            ("left", "0"),
            ("width", "100%"),
            ("height", "3px"),
            ("z-index", "100001"),
            ("background", TOP_BAR_COLOR),
            ("box-shadow", TOP_BAR_SHADOW),
            ("display", "none"),
        ] {
            let _ = style.set_property(property, value);
        }
        document.body()?.append_child(&bar).ok()?;

        *self.bar.borrow_mut() = Some(bar.clone());
        Some(bar)
    }
}

impl ProgressBar for TopBar {
    fn show(&self) {
        match self.element() {
            Some(bar) => {
                let _ = bar.style().set_property("display", "block");
            }
            None => tracing::warn!("Cannot paint progress bar: no document body"),
        }
    }

    fn hide(&self) {
        if let Some(bar) = self.bar.borrow().as_ref() {
            let _ = bar.style().set_property("display", "none");
        }
    }
}

/// Create platform services for WASM
pub fn create_platform(_config: &ClientConfig) -> Platform {
    Platform::new(
        WasmStorageProvider,
        WasmClipboardProvider,
        WasmDocumentProvider,
        WasmSleepProvider,
        RafFrameProvider,
        SpawnLocalSpawner,
        TopBar::default(),
    )
}
