//! Connection management: handshake params, the live socket, and its
//! reconnect policy.

pub mod backoff;
pub mod debug;
pub mod endpoint;
pub mod live_socket;
pub mod params;
pub mod state;

pub use backoff::BackoffState;
pub use debug::DebugConsole;
pub use endpoint::Endpoint;
pub use live_socket::{EventPusher, EventSink, LiveSocket, SocketServices};
pub use params::{params_supplier, CsrfToken, ParamsSupplier};
pub use state::{ConnectionState, ConnectionStateObserver};
