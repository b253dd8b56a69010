//! Top-of-page navigation progress bar.
//!
//! Quick navigations never flash the bar: painting waits for the display
//! delay and is cancelled if loading stops first.

use std::cell::Cell;
use std::rc::Rc;

use crate::config::TimingConfig;
use crate::ports::outbound::{ProgressBar, SleepProvider, TaskSpawner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    Hidden,
    Showing { painted: bool },
}

#[derive(Clone)]
pub struct ProgressIndicator {
    inner: Rc<IndicatorInner>,
}

struct IndicatorInner {
    bar: Rc<dyn ProgressBar>,
    sleep: Rc<dyn SleepProvider>,
    spawner: Rc<dyn TaskSpawner>,
    delay_ms: u64,
    state: Cell<IndicatorState>,
    /// Bumped on every transition so stale delayed paints can tell
    generation: Cell<u64>,
}

impl ProgressIndicator {
    pub fn new(
        bar: Rc<dyn ProgressBar>,
        sleep: Rc<dyn SleepProvider>,
        spawner: Rc<dyn TaskSpawner>,
        timing: &TimingConfig,
    ) -> Self {
        Self {
            inner: Rc::new(IndicatorInner {
                bar,
                sleep,
                spawner,
                delay_ms: timing.progress_delay_ms,
                state: Cell::new(IndicatorState::Hidden),
                generation: Cell::new(0),
            }),
        }
    }

    pub fn state(&self) -> IndicatorState {
        self.inner.state.get()
    }

    /// Loading started. A no-op while already showing.
    pub fn start(&self) {
        let inner = &self.inner;
        if inner.state.get() != IndicatorState::Hidden {
            return;
        }
        inner.state.set(IndicatorState::Showing { painted: false });
        let generation = inner.generation.get() + 1;
        inner.generation.set(generation);

        let delayed = Rc::clone(inner);
        let delay = inner.sleep.sleep_ms(inner.delay_ms);
        inner.spawner.spawn(Box::pin(async move {
            delay.await;
            if delayed.generation.get() != generation {
                return;
            }
            if delayed.state.get() == (IndicatorState::Showing { painted: false }) {
                delayed.state.set(IndicatorState::Showing { painted: true });
                delayed.bar.show();
            }
        }));
    }

    /// Loading finished. Always ends hidden.
    pub fn stop(&self) {
        let inner = &self.inner;
        let was = inner.state.replace(IndicatorState::Hidden);
        inner.generation.set(inner.generation.get() + 1);
        if was == (IndicatorState::Showing { painted: true }) {
            inner.bar.hide();
        }
    }
}
