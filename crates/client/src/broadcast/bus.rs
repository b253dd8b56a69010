//! Page-wide broadcast bus.
//!
//! Push-based: subscribers register callbacks that are invoked synchronously
//! on `publish`. The bus holds strong references to subscribers until they
//! are removed or the bus is cleared.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gang_protocol::BroadcastEvent;

type Subscriber = Rc<dyn Fn(BroadcastEvent)>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

#[derive(Clone, Default)]
pub struct BroadcastBus {
    subscribers: Rc<RefCell<Vec<(SubscriptionId, Subscriber)>>>,
    next_id: Rc<Cell<u64>>,
}

impl BroadcastBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl Fn(BroadcastEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers.borrow_mut().push((id, Rc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    /// Deliver `event` to every current subscriber, in subscription order.
    ///
    /// Subscribers may publish or (un)subscribe from inside their callback;
    /// such changes apply from the next publish.
    pub fn publish(&self, event: BroadcastEvent) {
        let snapshot: Vec<Subscriber> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, subscriber)| Rc::clone(subscriber))
            .collect();

        tracing::trace!(event = event.name(), subscribers = snapshot.len(), "Broadcast");
        for subscriber in snapshot {
            subscriber(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    pub fn clear(&self) {
        self.subscribers.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_and_publish() {
        let bus = BroadcastBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let seen_clone = Rc::clone(&seen);
        bus.subscribe(move |event| seen_clone.borrow_mut().push(event));

        bus.publish(BroadcastEvent::PageLoadingStart);
        bus.publish(BroadcastEvent::PageLoadingStop);

        assert_eq!(
            *seen.borrow(),
            vec![BroadcastEvent::PageLoadingStart, BroadcastEvent::PageLoadingStop]
        );
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = BroadcastBus::new();
        let count = Rc::new(Cell::new(0));

        let count_clone = Rc::clone(&count);
        let id = bus.subscribe(move |_| count_clone.set(count_clone.get() + 1));
        bus.publish(BroadcastEvent::ScrollChatToBottom);

        assert!(bus.unsubscribe(id));
        bus.publish(BroadcastEvent::ScrollChatToBottom);

        assert_eq!(count.get(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_from_subscriber_does_not_deadlock() {
        let bus = BroadcastBus::new();
        let stops = Rc::new(Cell::new(0));

        let inner_bus = bus.clone();
        bus.subscribe(move |event| {
            if event == BroadcastEvent::PageLoadingStart {
                inner_bus.publish(BroadcastEvent::PageLoadingStop);
            }
        });
        let stops_clone = Rc::clone(&stops);
        bus.subscribe(move |event| {
            if event == BroadcastEvent::PageLoadingStop {
                stops_clone.set(stops_clone.get() + 1);
            }
        });

        bus.publish(BroadcastEvent::PageLoadingStart);

        assert_eq!(stops.get(), 1);
    }
}
