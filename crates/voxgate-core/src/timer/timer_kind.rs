use std::{fmt, time::Duration};

/// Named timers owned by the session coordinator.
///
/// The first four are bound to a `Recording` session and are armed and
/// disarmed together. `DisplayTimeout` reverts a terminal state to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    /// Recomputes the elapsed recording time.
    DurationTicker,
    /// Fires once, shortly before the maximum duration is reached.
    Warning,
    /// Fires once at the maximum duration and stops the recording.
    MaxDuration,
    /// Polls the capture device for stream faults.
    HealthPoll,
    /// Reverts `Done`, `Error` and `Cancelled` back to `Idle`.
    DisplayTimeout,
}

impl TimerKind {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DurationTicker => "duration_ticker",
            Self::Warning => "warning",
            Self::MaxDuration => "max_duration",
            Self::HealthPoll => "health_poll",
            Self::DisplayTimeout => "display_timeout",
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-shot delay or fixed period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSchedule {
    /// Fire once after the delay.
    Once(Duration),
    /// Fire every period until disarmed.
    Every(Duration),
}
