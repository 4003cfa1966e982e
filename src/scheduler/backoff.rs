//! Exponential backoff for rate-limited venues

use std::time::Duration;

/// Delay-doubling backoff with a ceiling.
///
/// Each `next()` returns the current delay and doubles it for the next
/// call; `reset()` snaps back to the initial delay after a clean cycle.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay to wait now; doubles the stored delay up to the ceiling
    pub fn next(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// A successful cycle clears accumulated pressure
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(300))
    }
}
