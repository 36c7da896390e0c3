//! Generation-tagged timer bookkeeping.
//!
//! `TimerSet` does not own any OS timers. It records deadlines and hands out
//! [`TimerFire`] tokens when they come due; the event loop sleeps until
//! [`TimerSet::next_deadline`] and routes each fire back into the coordinator.
//! Every fire carries the generation it was armed under, and
//! [`TimerSet::is_current`] rejects fires whose generation has since been
//! retired by [`TimerSet::disarm_all`]. This closes the window where a timer
//! that already came due is processed after the transition that disarmed it.

use crate::timer::{TimerKind, TimerSchedule};

use std::{fmt, time::Duration};

use tokio::time::Instant;
use tracing::trace;

/// Smallest period accepted for periodic timers.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Epoch counter; bumped by every `disarm_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(u64);

impl Generation {
    /// Raw counter value, for logging.
    pub const fn value(&self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Handle returned by [`TimerSet::arm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    /// Which timer was armed.
    pub kind: TimerKind,
    /// Generation the timer belongs to.
    pub generation: Generation,
    serial: u64,
}

/// A timer that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFire {
    /// Which timer fired.
    pub kind: TimerKind,
    /// Generation the timer was armed under.
    pub generation: Generation,
    /// Scheduled deadline of this fire.
    pub deadline: Instant,
    serial: u64,
}

#[derive(Debug, Clone, Copy)]
struct ArmedTimer {
    kind: TimerKind,
    serial: u64,
    deadline: Instant,
    period: Option<Duration>,
}

/// Named, cancellable one-shot and periodic timers.
#[derive(Debug, Default)]
pub struct TimerSet {
    generation: Generation,
    next_serial: u64,
    armed: Vec<ArmedTimer>,
}

impl TimerSet {
    /// Create an empty timer set at generation zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Arm `kind` in the current generation, replacing any armed timer of
    /// the same kind.
    pub fn arm(&mut self, kind: TimerKind, schedule: TimerSchedule, now: Instant) -> TimerHandle {
        self.disarm(kind);

        let (deadline, period) = match schedule {
            TimerSchedule::Once(delay) => (now + delay, None),
            TimerSchedule::Every(period) => {
                let period = period.max(MIN_PERIOD);
                (now + period, Some(period))
            }
        };

        self.next_serial = self.next_serial.wrapping_add(1);
        let serial = self.next_serial;

        self.armed.push(ArmedTimer {
            kind,
            serial,
            deadline,
            period,
        });

        trace!(timer = %kind, generation = %self.generation, "Timer armed");

        TimerHandle {
            kind,
            generation: self.generation,
            serial,
        }
    }

    /// Disarm a single timer. Returns whether one was armed.
    pub fn disarm(&mut self, kind: TimerKind) -> bool {
        let before = self.armed.len();
        self.armed.retain(|t| t.kind != kind);
        before != self.armed.len()
    }

    /// Disarm every timer and retire the current generation.
    ///
    /// Idempotent. Fires already handed out by [`take_due`](Self::take_due)
    /// fail [`is_current`](Self::is_current) afterwards.
    pub fn disarm_all(&mut self) {
        self.armed.clear();
        self.generation = self.generation.next();
        trace!(generation = %self.generation, "All timers disarmed");
    }

    /// Whether `kind` is armed in the current generation.
    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.iter().any(|t| t.kind == kind)
    }

    /// Whether `handle` still refers to an armed timer.
    pub fn is_live(&self, handle: &TimerHandle) -> bool {
        handle.generation == self.generation
            && self.armed.iter().any(|t| t.serial == handle.serial)
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.armed.iter().map(|t| t.deadline).min()
    }

    /// Collect every timer due at `now`, ordered by deadline.
    ///
    /// One-shot timers are removed. Periodic timers produce a single fire
    /// and are rescheduled to their next deadline after `now`; missed
    /// periods are coalesced.
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerFire> {
        let generation = self.generation;
        let mut fires = Vec::new();

        self.armed.retain_mut(|timer| {
            if timer.deadline > now {
                return true;
            }

            fires.push(TimerFire {
                kind: timer.kind,
                generation,
                deadline: timer.deadline,
                serial: timer.serial,
            });

            match timer.period {
                Some(period) => {
                    let behind = now.saturating_duration_since(timer.deadline);
                    let skipped = behind.as_nanos() / period.as_nanos();
                    let steps = u32::try_from(skipped + 1).unwrap_or(u32::MAX);
                    timer.deadline += period.saturating_mul(steps);
                    true
                }
                None => false,
            }
        });

        fires.sort_by_key(|f| (f.deadline, f.kind));
        fires
    }

    /// Whether a fire still belongs to a live timer.
    ///
    /// False once the generation it was armed under has been retired, or
    /// once that specific timer was disarmed or replaced.
    pub fn is_current(&self, fire: &TimerFire) -> bool {
        if fire.generation != self.generation {
            return false;
        }
        match fire.kind {
            // One-shot fires are removed by take_due; they stay current
            // until the generation changes or the kind is re-armed.
            TimerKind::Warning | TimerKind::MaxDuration | TimerKind::DisplayTimeout => {
                !self.armed.iter().any(|t| t.kind == fire.kind && t.serial != fire.serial)
            }
            TimerKind::DurationTicker | TimerKind::HealthPoll => {
                self.armed.iter().any(|t| t.serial == fire.serial)
            }
        }
    }
}
