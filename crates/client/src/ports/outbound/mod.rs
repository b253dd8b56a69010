//! Outbound ports - Interfaces for external services
//!
//! These ports define the contracts that infrastructure adapters must implement,
//! allowing the identity store, hooks, and socket to interact with the browser
//! and network without depending on concrete implementations.

pub mod platform;
pub mod transport;

pub use platform::{
    dom, storage_keys, ClipboardProvider, DocumentProvider, FrameProvider, HookElement,
    LocalFuture, ProgressBar, ScrollContainer, SleepProvider, StorageProvider, TaskSpawner,
};
#[cfg(test)]
pub use platform::{MockDocumentProvider, MockProgressBar, MockStorageProvider};
pub use transport::{Connector, TransportEvent, TransportKind, TransportLink};
