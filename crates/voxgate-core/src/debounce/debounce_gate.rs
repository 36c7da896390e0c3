use std::{collections::HashMap, hash::Hash, time::Duration};

use tokio::time::Instant;
use tracing::debug;

/// Default suppression window for repeated triggers.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);

/// Trigger families tracked by the coordinator's gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// Shortcut press in toggle mode (start or stop).
    Toggle,
}

/// Rejects a trigger if one of the same kind was accepted within the window.
///
/// In-memory only; state lives for the process lifetime.
#[derive(Debug, Clone)]
pub struct DebounceGate<K = TriggerKind> {
    window: Duration,
    last_accepted: HashMap<K, Instant>,
}

impl<K> DebounceGate<K>
where
    K: Copy + Eq + Hash + std::fmt::Debug,
{
    /// Create a gate with the given suppression window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
        }
    }

    /// The suppression window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Accept the trigger if the last accepted one of the same kind is at
    /// least one window old, recording `now` on acceptance.
    pub fn accept(&mut self, kind: K, now: Instant) -> bool {
        if let Some(last) = self.last_accepted.get(&kind) {
            let since = now.saturating_duration_since(*last);
            if since < self.window {
                debug!(
                    kind = ?kind,
                    since_ms = since.as_millis(),
                    "Trigger debounced"
                );
                return false;
            }
        }

        self.last_accepted.insert(kind, now);
        true
    }
}

impl<K> Default for DebounceGate<K>
where
    K: Copy + Eq + Hash + std::fmt::Debug,
{
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}
