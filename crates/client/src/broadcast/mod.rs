//! Page-wide broadcasts and their subscribers.

pub mod bus;
pub mod progress;
pub mod scroll;

pub use bus::{BroadcastBus, SubscriptionId};
pub use progress::{IndicatorState, ProgressIndicator};
pub use scroll::ScrollSynchronizer;
