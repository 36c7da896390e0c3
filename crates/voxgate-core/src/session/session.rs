use crate::{
    CapturedAudio, ErrorRecord, RetryKey, StageJob,
    session::{DetectedContext, SessionConfig, SessionState, ShortcutMode},
};

use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use tokio::time::Instant;
use uuid::Uuid;

/// Unique session identifier, used to tag collaborator reports and logs.
pub type SessionId = Uuid;

/// One capture-to-delivery cycle.
///
/// Owned exclusively by the coordinator. Collaborators and display
/// surfaces only ever see clones.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    pub(crate) state: SessionState,
    config: SessionConfig,
    started_at: Option<Instant>,
    recorded_at: SystemTime,
    pub(crate) elapsed: Duration,
    context: DetectedContext,
    pub(crate) audio_level: Option<u8>,
    pub(crate) audio: Option<CapturedAudio>,
    pub(crate) recording: Option<PathBuf>,
    pub(crate) transcript: Option<String>,
    pub(crate) stage_job: Option<StageJob>,
    pub(crate) pending_retry: Option<RetryKey>,
    pub(crate) error: Option<ErrorRecord>,
}

impl Session {
    /// The empty `Idle` session.
    pub(crate) fn idle(config: SessionConfig) -> Self {
        Self {
            id: Uuid::nil(),
            state: SessionState::Idle,
            config,
            started_at: None,
            recorded_at: SystemTime::UNIX_EPOCH,
            elapsed: Duration::ZERO,
            context: DetectedContext::unknown(),
            audio_level: None,
            audio: None,
            recording: None,
            transcript: None,
            stage_job: None,
            pending_retry: None,
            error: None,
        }
    }

    /// A fresh session entering `Recording` at `now`.
    pub(crate) fn recording(config: SessionConfig, context: DetectedContext, now: Instant) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Recording,
            started_at: Some(now),
            recorded_at: SystemTime::now(),
            context,
            ..Self::idle(config)
        }
    }

    /// A session resumed directly at a pipeline stage (stage retry).
    pub(crate) fn resumed(config: SessionConfig, job: &StageJob) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: job.entry_state(),
            recorded_at: SystemTime::now(),
            recording: match job {
                StageJob::Transcription { path, .. } => Some(path.clone()),
                _ => None,
            },
            context: job.context().clone(),
            stage_job: Some(job.clone()),
            ..Self::idle(config)
        }
    }

    /// Session identifier (nil while `Idle`).
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Shortcut mode fixed at session start.
    pub fn mode(&self) -> ShortcutMode {
        self.config.mode
    }

    /// Settings snapshot fixed at session start.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// When recording began.
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Wall-clock time the session began.
    pub fn recorded_at(&self) -> SystemTime {
        self.recorded_at
    }

    /// Recording file still owned by this session, if any.
    pub fn recording_path(&self) -> Option<&Path> {
        self.recording.as_deref()
    }

    /// Raw transcript, once transcription has produced one.
    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    /// Recording time as of the last tick, or final recording length.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Foreground application captured at recording start.
    pub fn detected_context(&self) -> &DetectedContext {
        &self.context
    }

    /// Latest audio level sample (0–100); only set while recording.
    pub fn audio_level(&self) -> Option<u8> {
        self.audio_level
    }

    /// The capture result, once the recording has been stopped.
    pub fn audio(&self) -> Option<&CapturedAudio> {
        self.audio.as_ref()
    }

    /// The error that put this session into `Error`.
    pub fn error(&self) -> Option<&ErrorRecord> {
        self.error.as_ref()
    }

    pub(crate) fn held_for(&self, now: Instant) -> Duration {
        self.started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default()
    }
}
