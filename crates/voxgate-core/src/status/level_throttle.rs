use std::time::Duration;

use tokio::time::Instant;

/// Minimum spacing between published audio-level events (~30 Hz).
pub const LEVEL_INTERVAL: Duration = Duration::from_millis(33);

/// Publisher-side rate limiter for audio-level events.
#[derive(Debug, Clone)]
pub struct LevelThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl LevelThrottle {
    /// Create a throttle admitting at most one sample per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Admit a sample at `now` if the interval has passed since the last one.
    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Forget the last admission (new session).
    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl Default for LevelThrottle {
    fn default() -> Self {
        Self::new(LEVEL_INTERVAL)
    }
}
