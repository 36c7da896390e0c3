use crate::{
    CancelReason,
    session::{SessionId, SessionState, ShortcutMode},
};

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Lifecycle events fanned out to display surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusEvent {
    /// Recording began.
    SessionStarted {
        /// New session.
        session_id: SessionId,
        /// Shortcut mode for the session.
        mode: ShortcutMode,
        /// Wall-clock start time.
        timestamp: SystemTime,
    },
    /// Throttled audio level sample (0–100).
    AudioLevel {
        /// Level.
        level: u8,
    },
    /// Elapsed recording time.
    Elapsed {
        /// Milliseconds since recording began.
        elapsed_ms: u64,
    },
    /// The maximum duration is close.
    DurationWarning {
        /// Milliseconds until the automatic stop.
        remaining_ms: u64,
    },
    /// Recording stopped normally; the pipeline takes over.
    SessionStopped {
        /// Final recording length.
        elapsed_ms: u64,
    },
    /// The session moved to a pipeline state.
    StageChanged {
        /// New state.
        state: SessionState,
    },
    /// Text delivered.
    SessionDone,
    /// The session failed.
    SessionError {
        /// User-facing message.
        message: String,
    },
    /// Recording discarded.
    SessionCancelled {
        /// Why.
        reason: CancelReason,
    },
    /// A start trigger arrived while a session is running.
    Busy,
    /// The session is over; surfaces may hide.
    Hide,
}
