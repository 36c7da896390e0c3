use crate::{Command, ErrorRecord, RetryKey, RetryOutcome, StatusEvent};

/// Side effects requested by the coordinator for the event loop to carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Invoke a collaborator.
    Invoke(Command),
    /// Publish on the status bus.
    Publish(StatusEvent),
    /// Report to the error/retry subsystem.
    Raise(ErrorRecord),
    /// A retry started through [`resume`](crate::SessionCoordinator::resume)
    /// has finished.
    RetrySettled {
        /// Key of the retried error.
        key: RetryKey,
        /// How it ended.
        outcome: RetryOutcome,
    },
}
