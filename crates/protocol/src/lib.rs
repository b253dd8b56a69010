//! Gang Protocol - wire vocabulary shared by the client sync layer and the live server
//!
//! This crate contains the types exchanged over the duplex connection:
//! - Player identity and connection handshake parameters
//! - Named events (client pushes, server pushes, page-wide broadcasts)
//! - Channel frames (Phoenix V2 JSON array encoding) and long-poll envelopes
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde, serde_json and thiserror
//! 2. **No side effects** - Pure data types and serialization
//! 3. **WASM compatible** - Must compile for both native and wasm32 targets

pub mod error;
pub mod events;
pub mod frame;
pub mod identity;
pub mod longpoll;
pub mod params;

pub use error::ProtocolError;
pub use events::{event_names, BroadcastEvent, ClientEvent, ServerEvent};
pub use frame::{Frame, PushEvent, PROTOCOL_VSN};
pub use identity::PlayerIdentity;
pub use longpoll::LongPollEnvelope;
pub use params::{param_keys, ConnectParams};
