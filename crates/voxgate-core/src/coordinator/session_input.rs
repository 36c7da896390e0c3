use crate::{
    CapturedAudio, CoreResult, DeviceFault, Generation, PipelineStage, StopDisposition,
    session::{DetectedContext, SessionId},
};

use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Events consumed by the coordinator.
///
/// Shortcut events come from the global-shortcut source and carry the
/// instant the OS reported the key edge, since they may be queued behind a
/// foreground-app probe. The rest are collaborator reports tagged with the
/// session they belong to, so a report that arrives after its session has
/// been superseded is ignored.
#[derive(Debug)]
pub enum SessionInput {
    /// Shortcut pressed.
    ShortcutPressed {
        /// Foreground application at press time.
        context: DetectedContext,
        /// When the key went down.
        at: Instant,
    },
    /// Shortcut released.
    ShortcutReleased {
        /// When the key came up.
        at: Instant,
    },
    /// The shortcut source cancelled the gesture.
    ShortcutCancelled {
        /// Why the source cancelled.
        reason: String,
    },
    /// The shortcut source reports it is busy.
    ShortcutBusy,
    /// An OS permission is missing for the shortcut or text insertion.
    PermissionRequired {
        /// What needs to be granted.
        detail: String,
    },
    /// Escape pressed (cancels a toggle-mode recording).
    EscapePressed,
    /// Explicit request to hide a terminal session.
    Hide,
    /// Outcome of `start_capture`.
    CaptureStarted {
        /// Session the capture belongs to.
        session_id: SessionId,
        /// Collaborator result.
        result: CoreResult<()>,
    },
    /// Outcome of `stop_capture`.
    CaptureStopped {
        /// Session the capture belongs to.
        session_id: SessionId,
        /// Disposition the stop was issued with.
        disposition: StopDisposition,
        /// Collaborator result.
        result: CoreResult<CapturedAudio>,
    },
    /// Audio level sample (0–100).
    AudioLevel {
        /// Session the sample belongs to.
        session_id: SessionId,
        /// Level, clamped to 100.
        level: u8,
    },
    /// Outcome of `poll_health`.
    HealthReport {
        /// Session that was polled.
        session_id: SessionId,
        /// Timer generation the poll was issued under.
        generation: Generation,
        /// `Some` when the stream has faulted.
        result: CoreResult<Option<DeviceFault>>,
    },
    /// Outcome of archiving a delivered transcript.
    Archived {
        /// Session that delivered the transcript.
        session_id: SessionId,
        /// Where it was written; `None` when archiving is off.
        result: CoreResult<Option<PathBuf>>,
    },
    /// Pipeline callback.
    Pipeline {
        /// Session the stage belongs to.
        session_id: SessionId,
        /// What happened.
        signal: PipelineSignal,
    },
}

/// Pipeline stage callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineSignal {
    /// A stage began.
    StageStarted(PipelineStage),
    /// A stage produced text for the next stage.
    StageOutput {
        /// Stage that produced the text.
        stage: PipelineStage,
        /// Produced text.
        text: String,
    },
    /// The final text was delivered.
    Complete {
        /// Delivered text.
        text: String,
    },
    /// A stage failed.
    Failed {
        /// Stage that failed.
        stage: PipelineStage,
        /// Failure description.
        message: String,
    },
}

/// Why a recording was discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CancelReason {
    /// Push-to-talk released before the minimum hold time.
    TooShort,
    /// Escape pressed during a toggle-mode recording.
    Escape,
    /// Health poll reported a stream fault.
    DeviceFault(String),
    /// Shortcut source cancelled the gesture.
    Shortcut(String),
    /// Application shutting down.
    Shutdown,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => f.write_str("shortcut released too early"),
            Self::Escape => f.write_str("cancelled with Escape"),
            Self::DeviceFault(reason) => write!(f, "capture device fault: {reason}"),
            Self::Shortcut(reason) => write!(f, "shortcut cancelled: {reason}"),
            Self::Shutdown => f.write_str("shutting down"),
        }
    }
}
