use crate::{
    Generation,
    session::{DetectedContext, SessionId, SessionState},
};

use std::{fmt, path::PathBuf, time::SystemTime};

use serde::{Deserialize, Serialize};

/// Result of a successful `stop_capture`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedAudio {
    /// Where the recording was written.
    pub path: PathBuf,
    /// Recording length as measured by the capture collaborator.
    pub duration_ms: u64,
}

/// A stream fault reported by `poll_health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFault {
    /// Description of the fault.
    pub reason: String,
}

/// What to do with the recording once capture stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopDisposition {
    /// Hand the recording to the pipeline.
    Keep,
    /// Delete the recording.
    Discard,
}

/// Pipeline stages downstream of capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Speech-to-text.
    Transcription,
    /// Language-model cleanup of the transcript.
    Improvement,
    /// Insertion of the final text into the target application.
    Delivery,
}

impl PipelineStage {
    /// Component name used in error records.
    pub const fn component(&self) -> &'static str {
        match self {
            Self::Transcription => "transcription",
            Self::Improvement => "improvement",
            Self::Delivery => "delivery",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transcription => "Transcription",
            Self::Improvement => "Improvement",
            Self::Delivery => "Delivery",
        })
    }
}

/// Inputs for one pipeline stage; enough to re-run it on retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageJob {
    /// Transcribe a recording.
    Transcription {
        /// Recording to transcribe.
        path: PathBuf,
        /// Foreground application at trigger time.
        context: DetectedContext,
    },
    /// Improve a transcript.
    Improvement {
        /// Raw transcript.
        text: String,
        /// Foreground application at trigger time.
        context: DetectedContext,
    },
    /// Deliver the final text.
    Delivery {
        /// Text to insert.
        text: String,
        /// Foreground application at trigger time.
        context: DetectedContext,
    },
}

impl StageJob {
    /// Stage this job runs.
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Transcription { .. } => PipelineStage::Transcription,
            Self::Improvement { .. } => PipelineStage::Improvement,
            Self::Delivery { .. } => PipelineStage::Delivery,
        }
    }

    /// Context carried by the job.
    pub fn context(&self) -> &DetectedContext {
        match self {
            Self::Transcription { context, .. }
            | Self::Improvement { context, .. }
            | Self::Delivery { context, .. } => context,
        }
    }

    /// State a resumed session starts in when this job is retried.
    pub(crate) fn entry_state(&self) -> SessionState {
        match self {
            Self::Transcription { .. } => SessionState::Processing,
            Self::Improvement { .. } | Self::Delivery { .. } => SessionState::Transcribing,
        }
    }
}

/// A delivered transcript, handed to the pipeline for archiving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Text that was delivered.
    pub text: String,
    /// Raw transcript, when improvement changed it.
    pub original: Option<String>,
    /// Foreground application at trigger time.
    pub context: DetectedContext,
    /// Recording length; zero for sessions resumed by a retry.
    pub duration_ms: u64,
    /// Wall-clock time the session began.
    pub recorded_at: SystemTime,
}

impl TranscriptEntry {
    /// Whether improvement changed the text.
    pub fn was_edited(&self) -> bool {
        self.original.is_some()
    }
}

/// Collaborator invocations issued by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `start_capture()`.
    StartCapture {
        /// Session the capture belongs to.
        session_id: SessionId,
    },
    /// `stop_capture()`, followed by `discard(path)` when discarding.
    StopCapture {
        /// Session the capture belongs to.
        session_id: SessionId,
        /// Keep for the pipeline or discard.
        disposition: StopDisposition,
    },
    /// `poll_health()`.
    PollHealth {
        /// Session being polled.
        session_id: SessionId,
        /// Timer generation the poll was issued under.
        generation: Generation,
    },
    /// `discard(path)` for a kept recording nothing needs any more.
    DiscardRecording {
        /// Recording to delete.
        path: PathBuf,
    },
    /// `begin_transcription`, `begin_improvement` or delivery.
    BeginStage {
        /// Session the stage belongs to.
        session_id: SessionId,
        /// Stage inputs.
        job: StageJob,
    },
    /// Archive a delivered transcript.
    Archive {
        /// Session that delivered it.
        session_id: SessionId,
        /// What was delivered.
        entry: TranscriptEntry,
    },
}

impl Command {
    /// Whether this command goes to the capture collaborator.
    pub fn is_capture(&self) -> bool {
        matches!(
            self,
            Command::StartCapture { .. }
                | Command::StopCapture { .. }
                | Command::PollHealth { .. }
                | Command::DiscardRecording { .. }
        )
    }
}
