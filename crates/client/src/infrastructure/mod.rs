//! Infrastructure adapters for the outbound ports.
//!
//! The platform is selected at compile time: web-sys adapters on wasm32,
//! headless tokio adapters everywhere else.

pub mod dom;
pub mod platform;
pub mod transport;
