//! Ports - interfaces the sync layer needs from its environment.
//!
//! Only outbound ports exist: the browser (or the native headless host) and
//! the duplex transport are driven through these traits.

pub mod outbound;
