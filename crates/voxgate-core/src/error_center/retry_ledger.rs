use crate::{ErrorRecord, RetryKey};

use std::{collections::HashMap, time::Duration};

/// Waits before the 2nd and 3rd retry of a key; later attempts reuse the last.
pub const RETRY_BACKOFF: [Duration; 2] = [Duration::from_secs(1), Duration::from_secs(3)];

/// Delay before retry attempt `attempt` (1-based). The first is immediate.
pub fn backoff_for_attempt(attempt: u32) -> Duration {
    match attempt {
        0 | 1 => Duration::ZERO,
        n => {
            let index = usize::try_from(n - 2)
                .unwrap_or(usize::MAX)
                .min(RETRY_BACKOFF.len() - 1);
            RETRY_BACKOFF[index]
        }
    }
}

/// Retry state for one `(code, component)` key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryState {
    /// Failed retry attempts so far.
    pub attempt_count: u32,
    /// Whether an attempt is in flight.
    pub is_retrying: bool,
    /// The record being retried, for merging later failures into.
    pub origin: Option<ErrorRecord>,
}

/// Per-key retry state. Entries persist across repeated failures until a
/// retry succeeds.
#[derive(Debug, Default)]
pub struct RetryLedger {
    states: HashMap<RetryKey, RetryState>,
}

impl RetryLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin an attempt for `record`'s key.
    ///
    /// Returns the 1-based attempt number, or `None` if one is already in
    /// flight for that key.
    pub fn begin(&mut self, record: &ErrorRecord) -> Option<u32> {
        let state = self.states.entry(record.key()).or_default();
        if state.is_retrying {
            return None;
        }
        state.is_retrying = true;
        state.origin = Some(record.clone());
        Some(state.attempt_count + 1)
    }

    /// The attempt succeeded: forget the key.
    pub fn succeed(&mut self, key: &RetryKey) -> Option<RetryState> {
        self.states.remove(key)
    }

    /// The attempt failed: count it and release the in-flight flag.
    /// Returns the record that was being retried.
    pub fn fail(&mut self, key: &RetryKey) -> Option<ErrorRecord> {
        let state = self.states.get_mut(key)?;
        state.attempt_count += 1;
        state.is_retrying = false;
        state.origin.clone()
    }

    /// The attempt never ran: release the in-flight flag only.
    pub fn abandon(&mut self, key: &RetryKey) {
        if let Some(state) = self.states.get_mut(key) {
            state.is_retrying = false;
        }
    }

    /// State for `key`, if any.
    pub fn get(&self, key: &RetryKey) -> Option<&RetryState> {
        self.states.get(key)
    }
}
