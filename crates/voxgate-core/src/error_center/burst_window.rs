use std::{collections::VecDeque, time::Duration};

use tokio::time::Instant;

/// Trailing window over which error bursts are detected.
pub const BURST_SPAN: Duration = Duration::from_secs(2);

/// Errors within [`BURST_SPAN`] that switch display to an aggregate.
pub const BURST_THRESHOLD: usize = 5;

/// Classification of one observed error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BurstStatus {
    /// Below the threshold; show individually.
    Individual,
    /// This error started a burst. `members` are the entries (including this
    /// one) collapsed into the aggregate.
    Started {
        /// Tags of every error in the window.
        members: Vec<u64>,
    },
    /// A burst is already active; bump its counter.
    Continued {
        /// Errors counted in the burst so far.
        count: u32,
    },
}

/// Rolling log of recent errors. Derived state, never persisted.
#[derive(Debug, Clone)]
pub struct BurstWindow {
    span: Duration,
    threshold: usize,
    recent: VecDeque<(Instant, u64)>,
    grouped: Option<u32>,
    last_at: Option<Instant>,
}

impl BurstWindow {
    /// Window with the given span and threshold.
    pub fn new(span: Duration, threshold: usize) -> Self {
        Self {
            span,
            threshold: threshold.max(1),
            recent: VecDeque::new(),
            grouped: None,
            last_at: None,
        }
    }

    /// Record an error tagged `tag` at `now` and classify it.
    pub fn observe(&mut self, tag: u64, now: Instant) -> BurstStatus {
        self.reset_if_quiet(now);

        while let Some(&(at, _)) = self.recent.front() {
            if now.saturating_duration_since(at) >= self.span {
                self.recent.pop_front();
            } else {
                break;
            }
        }

        self.recent.push_back((now, tag));
        self.last_at = Some(now);

        if let Some(count) = self.grouped.as_mut() {
            *count += 1;
            return BurstStatus::Continued { count: *count };
        }

        if self.recent.len() >= self.threshold {
            self.grouped = Some(u32::try_from(self.recent.len()).unwrap_or(u32::MAX));
            return BurstStatus::Started {
                members: self.recent.iter().map(|&(_, tag)| tag).collect(),
            };
        }

        BurstStatus::Individual
    }

    /// End grouping once a full span has passed without errors.
    /// Returns whether a burst just ended.
    pub fn reset_if_quiet(&mut self, now: Instant) -> bool {
        match self.last_at {
            Some(last) if now.saturating_duration_since(last) >= self.span => {
                self.recent.clear();
                self.last_at = None;
                self.grouped.take().is_some()
            }
            _ => false,
        }
    }

    /// Whether a burst is active.
    pub fn is_grouping(&self) -> bool {
        self.grouped.is_some()
    }

    /// When grouping would reset if no further error arrives.
    pub fn quiet_deadline(&self) -> Option<Instant> {
        self.last_at.map(|last| last + self.span)
    }
}

impl Default for BurstWindow {
    fn default() -> Self {
        Self::new(BURST_SPAN, BURST_THRESHOLD)
    }
}
