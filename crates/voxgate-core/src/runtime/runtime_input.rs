use crate::{RetryAction, RetryKey, SessionConfig, SessionInput, ToastId};

/// Messages consumed by the session runtime loop.
#[derive(Debug)]
pub enum RuntimeInput {
    /// Coordinator input (shortcut events and collaborator reports).
    Session(SessionInput),
    /// The user asked to retry the error shown in a toast.
    Retry(ToastId),
    /// A scheduled retry's backoff has elapsed.
    RetryDue {
        /// Key of the retried error.
        key: RetryKey,
        /// What to run.
        action: RetryAction,
    },
    /// The user dismissed a toast.
    Dismiss(ToastId),
    /// New settings for the next session.
    UpdateConfig(SessionConfig),
    /// Cancel any recording and stop the loop.
    Shutdown,
}

impl From<SessionInput> for RuntimeInput {
    fn from(input: SessionInput) -> Self {
        Self::Session(input)
    }
}
