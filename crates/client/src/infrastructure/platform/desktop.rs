//! Desktop platform implementations
//!
//! Headless adapters for running the client outside a browser: file-backed
//! storage, tokio timers, and log-only renderers for the page-bound ports.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use directories::ProjectDirs;

use crate::config::ClientConfig;
use crate::error::ClipboardError;
use crate::ports::outbound::{
    ClipboardProvider, DocumentProvider, FrameProvider, HookElement, LocalFuture, ProgressBar,
    ScrollContainer, SleepProvider, StorageProvider, TaskSpawner,
};
use crate::state::Platform;

/// Frame interval used in place of `requestAnimationFrame`.
const FRAME_INTERVAL_MS: u64 = 16;

/// Desktop storage provider with file-based persistence
///
/// Stores key-value pairs in a JSON file at:
/// - Linux: ~/.config/gang/client/storage.json
/// - macOS: ~/Library/Application Support/io.gang.client/storage.json
/// - Windows: C:\Users\<User>\AppData\Roaming\gang\client\storage.json
#[derive(Clone)]
pub struct DesktopStorageProvider {
    /// Path to the storage file
    storage_path: PathBuf,
    /// In-memory cache of stored values
    cache: Rc<RefCell<HashMap<String, String>>>,
}

impl Default for DesktopStorageProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopStorageProvider {
    /// Create a storage provider at the platform config location.
    pub fn new() -> Self {
        let storage_path = if let Some(dirs) = ProjectDirs::from("io", "gang", "client") {
            dirs.config_dir().join("storage.json")
        } else {
            // Fallback to current directory if project dirs unavailable
            PathBuf::from("gang_storage.json")
        };
        Self::with_path(storage_path)
    }

    /// Create a storage provider backed by `storage_path`.
    ///
    /// Loads existing data from the file if it exists.
    pub fn with_path(storage_path: PathBuf) -> Self {
        let cache = if storage_path.exists() {
            match fs::read_to_string(&storage_path) {
                Ok(data) => match serde_json::from_str::<HashMap<String, String>>(&data) {
                    Ok(map) => map,
                    Err(e) => {
                        tracing::warn!("Failed to parse storage file: {}", e);
                        HashMap::new()
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read storage file: {}", e);
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        tracing::debug!("Desktop storage initialized at: {:?}", storage_path);

        Self {
            storage_path,
            cache: Rc::new(RefCell::new(cache)),
        }
    }

    /// Persist the cache to disk. Failures leave the in-memory value in place.
    fn persist(&self) {
        if let Some(parent) = self.storage_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::warn!("Failed to create storage directory: {}", e);
                return;
            }
        }

        match serde_json::to_string_pretty(&*self.cache.borrow()) {
            Ok(data) => {
                if let Err(e) = fs::write(&self.storage_path, data) {
                    tracing::warn!("Failed to write storage file: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!("Failed to serialize storage data: {}", e);
            }
        }
    }
}

impl StorageProvider for DesktopStorageProvider {
    fn save(&self, key: &str, value: &str) {
        self.cache
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.persist();
    }

    fn load(&self, key: &str) -> Option<String> {
        self.cache.borrow().get(key).cloned()
    }
}

/// No system clipboard in headless runs; every write reports unavailable.
#[derive(Clone, Default)]
pub struct DesktopClipboardProvider;

impl ClipboardProvider for DesktopClipboardProvider {
    fn write_text(&self, _text: &str) -> LocalFuture<Result<(), ClipboardError>> {
        Box::pin(async {
            Err(ClipboardError::Unavailable(
                "no clipboard in headless client".to_string(),
            ))
        })
    }
}

/// Document without rendered markup. Only the anti-forgery token is known.
#[derive(Clone, Default)]
pub struct HeadlessDocumentProvider {
    csrf_token: Option<String>,
}

impl HeadlessDocumentProvider {
    pub fn new(csrf_token: Option<String>) -> Self {
        Self { csrf_token }
    }
}

impl DocumentProvider for HeadlessDocumentProvider {
    fn meta_content(&self, name: &str) -> Option<String> {
        if name == crate::ports::outbound::dom::CSRF_META_NAME {
            self.csrf_token.clone()
        } else {
            None
        }
    }

    fn elements_by_class(&self, _class: &str) -> Vec<Rc<dyn ScrollContainer>> {
        Vec::new()
    }
}

/// Stand-in for the player form when no page is rendered. Input values are
/// logged; there is nothing to click or focus.
#[derive(Clone, Default)]
pub struct HeadlessElement;

impl HookElement for HeadlessElement {
    fn set_input_value(&self, input_name: &str, value: &str) -> bool {
        tracing::info!(input = input_name, value, "Input restored");
        true
    }

    fn data_attribute(&self, _key: &str) -> Option<String> {
        None
    }

    fn focus(&self) {}

    fn add_click_listener(&self, _listener: Box<dyn Fn()>) {}
}

/// Desktop sleep provider using tokio timer
#[derive(Clone, Default)]
pub struct DesktopSleepProvider;

impl SleepProvider for DesktopSleepProvider {
    fn sleep_ms(&self, ms: u64) -> LocalFuture<()> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        })
    }
}

/// Stand-in for animation frames: resolves after one 60 Hz frame interval.
#[derive(Clone, Default)]
pub struct DesktopFrameProvider;

impl FrameProvider for DesktopFrameProvider {
    fn next_frame(&self) -> LocalFuture<()> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_millis(FRAME_INTERVAL_MS)).await;
        })
    }
}

/// Spawns onto the enclosing `tokio::task::LocalSet`.
#[derive(Clone, Default)]
pub struct LocalTaskSpawner;

impl TaskSpawner for LocalTaskSpawner {
    fn spawn(&self, task: LocalFuture<()>) {
        tokio::task::spawn_local(task);
    }
}

/// Progress bar that only logs.
#[derive(Clone, Default)]
pub struct LogProgressBar;

impl ProgressBar for LogProgressBar {
    fn show(&self) {
        tracing::info!("Loading...");
    }

    fn hide(&self) {
        tracing::info!("Loaded");
    }
}

/// Create platform services for desktop
pub fn create_platform(config: &ClientConfig) -> Platform {
    Platform::new(
        DesktopStorageProvider::new(),
        DesktopClipboardProvider,
        HeadlessDocumentProvider::new(config.csrf_token.clone()),
        DesktopSleepProvider,
        DesktopFrameProvider,
        LocalTaskSpawner,
        LogProgressBar,
    )
}
