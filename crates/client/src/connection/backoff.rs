//! Reconnect backoff math.
//!
//! Free of runtime dependencies; the live socket does the actual sleeping.

use crate::config::BackoffConfig;

/// Exponential backoff state shared by reconnect logic.
///
/// Retries never run out: once the delay reaches the cap it stays there
/// until a successful join resets it.
#[derive(Debug, Clone, Copy)]
pub struct BackoffState {
    config: BackoffConfig,
    attempts: u32,
    delay_ms: u64,
}

impl BackoffState {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            attempts: 0,
            delay_ms: config.initial_delay_ms,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    /// Advance to the next attempt, updating the delay for the subsequent attempt.
    ///
    /// Returns the delay to wait *before* performing this attempt.
    pub fn next_delay_and_advance(&mut self) -> u64 {
        let current_delay = self.delay_ms;
        self.attempts = self.attempts.saturating_add(1);
        self.delay_ms = ((self.delay_ms as f64) * self.config.multiplier)
            .min(self.config.max_delay_ms as f64) as u64;
        current_delay
    }
}

impl Default for BackoffState {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double_up_to_cap() {
        let mut backoff = BackoffState::new(BackoffConfig {
            initial_delay_ms: 50,
            max_delay_ms: 300,
            multiplier: 2.0,
        });

        let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay_and_advance()).collect();

        assert_eq!(delays, vec![50, 100, 200, 300, 300, 300]);
        assert_eq!(backoff.attempts(), 6);
    }

    #[test]
    fn test_reset_restores_initial_delay() {
        let mut backoff = BackoffState::default();
        backoff.next_delay_and_advance();
        backoff.next_delay_and_advance();

        backoff.reset();

        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.delay_ms(), 50);
    }
}
