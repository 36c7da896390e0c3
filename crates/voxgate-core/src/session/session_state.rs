use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session; ready for a start trigger.
    #[default]
    Idle,
    /// Capturing audio.
    Recording,
    /// Capture stopped; waiting for the pipeline to pick it up.
    Processing,
    /// Speech-to-text running.
    Transcribing,
    /// Text cleanup running.
    Improving,
    /// Delivered; reverts to `Idle` after a display timeout.
    Done,
    /// Failed; reverts to `Idle` after a display timeout.
    Error,
    /// Discarded; reverts to `Idle` after a display timeout.
    Cancelled,
}

impl SessionState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Processing => "processing",
            Self::Transcribing => "transcribing",
            Self::Improving => "improving",
            Self::Done => "done",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }

    /// Recording or any pipeline stage.
    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Recording | Self::Processing | Self::Transcribing | Self::Improving
        )
    }

    /// Processing, Transcribing or Improving.
    pub const fn is_pipeline(&self) -> bool {
        matches!(self, Self::Processing | Self::Transcribing | Self::Improving)
    }

    /// Done, Error or Cancelled.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancelled)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
