//! Platform DI Container
//!
//! This module provides the `Platform` struct - a dependency injection container
//! that aggregates all platform-specific service implementations behind port traits.
//!
//! Usage:
//! - Created by `create_platform()` in `infrastructure/platform/desktop.rs` or
//!   `infrastructure/platform/wasm.rs`, or assembled from fakes in tests
//! - Handed to `AppContext::start`, which passes the individual services on to
//!   the identity store, hooks, socket, and broadcast subscribers

use std::rc::Rc;

use crate::ports::outbound::{
    ClipboardProvider, DocumentProvider, FrameProvider, LocalFuture, ProgressBar, SleepProvider,
    StorageProvider, TaskSpawner,
};

/// Unified platform services container
///
/// Single-threaded: services are shared through `Rc`.
#[derive(Clone)]
pub struct Platform {
    storage: Rc<dyn StorageProvider>,
    clipboard: Rc<dyn ClipboardProvider>,
    document: Rc<dyn DocumentProvider>,
    sleep: Rc<dyn SleepProvider>,
    frames: Rc<dyn FrameProvider>,
    spawner: Rc<dyn TaskSpawner>,
    progress_bar: Rc<dyn ProgressBar>,
}

impl Platform {
    /// Create a new Platform with the given providers
    pub fn new<S, C, D, Sl, F, Sp, P>(
        storage: S,
        clipboard: C,
        document: D,
        sleep: Sl,
        frames: F,
        spawner: Sp,
        progress_bar: P,
    ) -> Self
    where
        S: StorageProvider + 'static,
        C: ClipboardProvider + 'static,
        D: DocumentProvider + 'static,
        Sl: SleepProvider + 'static,
        F: FrameProvider + 'static,
        Sp: TaskSpawner + 'static,
        P: ProgressBar + 'static,
    {
        Self::from_shared(
            Rc::new(storage),
            Rc::new(clipboard),
            Rc::new(document),
            Rc::new(sleep),
            Rc::new(frames),
            Rc::new(spawner),
            Rc::new(progress_bar),
        )
    }

    /// Create a Platform from already shared providers (lets tests keep a
    /// handle on their fakes).
    pub fn from_shared(
        storage: Rc<dyn StorageProvider>,
        clipboard: Rc<dyn ClipboardProvider>,
        document: Rc<dyn DocumentProvider>,
        sleep: Rc<dyn SleepProvider>,
        frames: Rc<dyn FrameProvider>,
        spawner: Rc<dyn TaskSpawner>,
        progress_bar: Rc<dyn ProgressBar>,
    ) -> Self {
        Self {
            storage,
            clipboard,
            document,
            sleep,
            frames,
            spawner,
            progress_bar,
        }
    }

    // -------------------------------------------------------------------------
    // Shared service handles
    // -------------------------------------------------------------------------

    pub fn storage(&self) -> Rc<dyn StorageProvider> {
        Rc::clone(&self.storage)
    }

    pub fn clipboard(&self) -> Rc<dyn ClipboardProvider> {
        Rc::clone(&self.clipboard)
    }

    pub fn document(&self) -> Rc<dyn DocumentProvider> {
        Rc::clone(&self.document)
    }

    pub fn sleep(&self) -> Rc<dyn SleepProvider> {
        Rc::clone(&self.sleep)
    }

    pub fn frames(&self) -> Rc<dyn FrameProvider> {
        Rc::clone(&self.frames)
    }

    pub fn spawner(&self) -> Rc<dyn TaskSpawner> {
        Rc::clone(&self.spawner)
    }

    pub fn progress_bar(&self) -> Rc<dyn ProgressBar> {
        Rc::clone(&self.progress_bar)
    }

    // -------------------------------------------------------------------------
    // Convenience operations
    // -------------------------------------------------------------------------

    /// Sleep for the given number of milliseconds.
    pub fn sleep_ms(&self, ms: u64) -> LocalFuture<()> {
        self.sleep.sleep_ms(ms)
    }

    /// Spawn a task on the current event loop.
    pub fn spawn(&self, task: LocalFuture<()>) {
        self.spawner.spawn(task)
    }
}
