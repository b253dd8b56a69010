//! Pins every chat message list to its newest message.

use std::rc::Rc;

use crate::config::TimingConfig;
use crate::ports::outbound::{dom, DocumentProvider, FrameProvider, ScrollContainer, SleepProvider};

#[derive(Clone)]
pub struct ScrollSynchronizer {
    document: Rc<dyn DocumentProvider>,
    frames: Rc<dyn FrameProvider>,
    sleep: Rc<dyn SleepProvider>,
    settle_ms: u64,
    reassert_ms: u64,
}

impl ScrollSynchronizer {
    pub fn new(
        document: Rc<dyn DocumentProvider>,
        frames: Rc<dyn FrameProvider>,
        sleep: Rc<dyn SleepProvider>,
        timing: &TimingConfig,
    ) -> Self {
        Self {
            document,
            frames,
            sleep,
            settle_ms: timing.scroll_settle_ms,
            reassert_ms: timing.scroll_reassert_ms,
        }
    }

    /// Scroll every `.chat-messages` container to the bottom.
    ///
    /// Containers are collected once, after the settle delay; anything added
    /// later is left alone. Returns the number of containers touched.
    pub async fn scroll_all(&self) -> usize {
        self.frames.next_frame().await;
        self.sleep.sleep_ms(self.settle_ms).await;

        let containers = self.document.elements_by_class(dom::CHAT_MESSAGES_CLASS);
        if containers.is_empty() {
            tracing::trace!("No chat containers to scroll");
            return 0;
        }

        for container in &containers {
            pin_to_bottom(container.as_ref());
            container.scroll_last_child_into_view();
        }

        // Late layout (images, fonts) can grow the content after the first pass
        self.sleep.sleep_ms(self.reassert_ms).await;
        for container in &containers {
            pin_to_bottom(container.as_ref());
        }

        tracing::debug!(containers = containers.len(), "Scrolled chat to bottom");
        containers.len()
    }
}

fn pin_to_bottom(container: &dyn ScrollContainer) {
    container.set_scroll_top(container.scroll_height());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{block_on_local, FakeDocument, FakeScrollContainer, InstantFrames, InstantSleep};

    fn synchronizer(document: Rc<FakeDocument>) -> ScrollSynchronizer {
        ScrollSynchronizer::new(
            document,
            Rc::new(InstantFrames),
            Rc::new(InstantSleep::new()),
            &TimingConfig::default(),
        )
    }

    #[test]
    fn test_every_container_ends_at_bottom() {
        let document = Rc::new(FakeDocument::new("tok"));
        let a = document.add_chat_container(FakeScrollContainer::new(800, 200).with_children(3));
        let b = document.add_chat_container(FakeScrollContainer::new(1200, 300).with_children(1));

        let touched = block_on_local(synchronizer(Rc::clone(&document)).scroll_all());

        assert_eq!(touched, 2);
        assert_eq!(a.scroll_top(), 600);
        assert_eq!(b.scroll_top(), 900);
        assert_eq!(a.last_child_scrolls(), 1);
    }

    #[test]
    fn test_repeated_scroll_is_idempotent() {
        let document = Rc::new(FakeDocument::new("tok"));
        let container = document.add_chat_container(FakeScrollContainer::new(800, 200));
        let sync = synchronizer(Rc::clone(&document));

        block_on_local(sync.scroll_all());
        let after_first = container.scroll_top();
        block_on_local(sync.scroll_all());

        assert_eq!(container.scroll_top(), after_first);
    }

    #[test]
    fn test_no_containers_is_a_no_op() {
        let document = Rc::new(FakeDocument::new("tok"));

        assert_eq!(block_on_local(synchronizer(document).scroll_all()), 0);
    }

    #[test]
    fn test_settle_and_reassert_delays_are_used() {
        let document = Rc::new(FakeDocument::new("tok"));
        document.add_chat_container(FakeScrollContainer::new(400, 100));
        let sleep = Rc::new(InstantSleep::new());
        let sync = ScrollSynchronizer::new(
            Rc::clone(&document) as Rc<dyn DocumentProvider>,
            Rc::new(InstantFrames),
            Rc::clone(&sleep) as Rc<dyn SleepProvider>,
            &TimingConfig::default(),
        );

        block_on_local(sync.scroll_all());

        assert_eq!(sleep.requested(), vec![100, 10]);
    }

    #[test]
    fn test_content_growth_during_reassert_is_caught() {
        let document = Rc::new(FakeDocument::new("tok"));
        let container = document.add_chat_container(FakeScrollContainer::new(800, 200));
        let sleep = Rc::new(InstantSleep::new());
        let growing = Rc::clone(&container);
        sleep.on_sleep(move |ms| {
            if ms == 10 {
                growing.set_scroll_height(1000);
            }
        });
        let sync = ScrollSynchronizer::new(
            Rc::clone(&document) as Rc<dyn DocumentProvider>,
            Rc::new(InstantFrames),
            Rc::clone(&sleep) as Rc<dyn SleepProvider>,
            &TimingConfig::default(),
        );

        block_on_local(sync.scroll_all());

        assert_eq!(container.scroll_top(), 800);
    }
}
