//! One-way, best-effort fan-out of lifecycle events.
//!
//! Subscribers are mirrors, not participants: there is no acknowledgement,
//! no replay for late subscribers and no backpressure on the publisher. A
//! subscriber that falls behind skips the events it missed and carries on
//! with the newest ones.

use crate::StatusEvent;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{trace, warn};

/// Events buffered per subscriber before the oldest are dropped.
pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// Publish side of the status bus. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StatusBus {
    sender: broadcast::Sender<StatusEvent>,
}

impl StatusBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Fan `event` out to current subscribers.
    ///
    /// Returns how many subscribers it was queued for; zero subscribers is
    /// not an error.
    pub fn publish(&self, event: StatusEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                trace!(event = ?event, "Status event dropped, no subscribers");
                0
            }
        }
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> StatusSubscription {
        StatusSubscription {
            receiver: self.sender.subscribe(),
            missed: 0,
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

/// Receive side held by one display surface.
#[derive(Debug)]
pub struct StatusSubscription {
    receiver: broadcast::Receiver<StatusEvent>,
    missed: u64,
}

impl StatusSubscription {
    /// Wait for the next event. `None` once every publisher is gone.
    pub async fn recv(&mut self) -> Option<StatusEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => self.note_lag(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<StatusEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => self.note_lag(skipped),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Drain every queued event.
    pub fn drain(&mut self) -> Vec<StatusEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Total events skipped because this subscriber fell behind.
    pub fn missed(&self) -> u64 {
        self.missed
    }

    fn note_lag(&mut self, skipped: u64) {
        self.missed += skipped;
        warn!(skipped, total_missed = self.missed, "Status subscriber lagged, events skipped");
    }
}
