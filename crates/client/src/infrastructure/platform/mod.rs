//! Platform-specific implementations
//!
//! This module provides platform-specific implementations of the
//! platform abstraction traits defined in ports/outbound/platform.rs.
//!
//! The correct platform is selected at compile time based on the target architecture.

#[cfg(target_arch = "wasm32")]
pub mod wasm;

#[cfg(not(target_arch = "wasm32"))]
pub mod desktop;

#[cfg(target_arch = "wasm32")]
pub use wasm::{
    create_platform, RafFrameProvider, SpawnLocalSpawner, TopBar, WasmClipboardProvider,
    WasmDocumentProvider, WasmSleepProvider, WasmStorageProvider,
};

#[cfg(not(target_arch = "wasm32"))]
pub use desktop::{
    create_platform, DesktopClipboardProvider, DesktopFrameProvider, DesktopSleepProvider,
    DesktopStorageProvider, HeadlessDocumentProvider, HeadlessElement, LocalTaskSpawner,
    LogProgressBar,
};
