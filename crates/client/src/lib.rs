//! Gang Client - browser-side sync layer for the gang game
//!
//! Keeps a page in sync with the live server:
//! - `identity`: local cache of the server-assigned player identity
//! - `connection`: live socket with per-attempt params, reconnect and long-poll fallback
//! - `hooks`: element-bound behaviors (`SetPlayerName`, `Clipboard`)
//! - `broadcast`: page-wide events (chat scroll, navigation progress)
//!
//! Browser services sit behind the ports in `ports::outbound`; wasm32 builds
//! use web-sys adapters, native builds use headless adapters over tokio.

pub mod app;
pub mod broadcast;
pub mod config;
pub mod connection;
pub mod error;
pub mod hooks;
pub mod identity;
pub mod infrastructure;
pub mod ports;
pub mod state;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use app::AppContext;
pub use config::ClientConfig;
pub use error::{ClientError, ClipboardError, TransportError};
pub use state::Platform;
