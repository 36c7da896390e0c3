//! Collaborator interfaces the runtime drives.
//!
//! Implementations live outside the core crate (process-backed in the
//! desktop binary, in-memory in tests).

use crate::{
    CapturedAudio, CoreResult, DeviceFault, RuntimeInput, SessionInput, TranscriptEntry,
    session::{DetectedContext, SessionId},
};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::trace;

/// Audio capture collaborator.
///
/// Owned by a single worker task, so calls never overlap and always run in
/// the order the coordinator issued them.
#[async_trait]
pub trait CaptureDevice: Send + 'static {
    /// Begin recording. Level samples are pushed into `levels` while the
    /// recording runs.
    async fn start_capture(&mut self, levels: LevelSink) -> CoreResult<()>;

    /// Finish recording and hand back the file.
    async fn stop_capture(&mut self) -> CoreResult<CapturedAudio>;

    /// Delete a recording that will not be transcribed.
    async fn discard(&mut self, path: &Path) -> CoreResult<()>;

    /// Check the running stream. `Some` reports a fault.
    async fn poll_health(&mut self) -> CoreResult<Option<DeviceFault>>;
}

/// Downstream pipeline stages.
///
/// Each call runs on its own task; the runtime reports stage start before
/// the call and the result after it.
#[async_trait]
pub trait Pipeline: Send + Sync + 'static {
    /// Speech-to-text.
    async fn transcribe(&self, path: &Path, context: &DetectedContext) -> CoreResult<String>;

    /// Clean up a transcript.
    async fn improve(&self, text: &str, context: &DetectedContext) -> CoreResult<String>;

    /// Insert the final text into the target application.
    async fn deliver(&self, text: &str, context: &DetectedContext) -> CoreResult<()>;

    /// Keep a record of a delivered transcript. Returns where it was
    /// written, or `None` when archiving is off.
    async fn archive(&self, _entry: &TranscriptEntry) -> CoreResult<Option<PathBuf>> {
        Ok(None)
    }
}

/// Best-effort sink for audio level samples of one session.
#[derive(Debug, Clone)]
pub struct LevelSink {
    session_id: SessionId,
    tx: mpsc::Sender<RuntimeInput>,
}

impl LevelSink {
    pub(crate) fn new(session_id: SessionId, tx: mpsc::Sender<RuntimeInput>) -> Self {
        Self { session_id, tx }
    }

    /// Session the samples belong to.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Push a sample (0–100). Dropped when the runtime queue is full or
    /// closed; returns whether it was queued.
    pub fn push(&self, level: u8) -> bool {
        let queued = self
            .tx
            .try_send(RuntimeInput::Session(SessionInput::AudioLevel {
                session_id: self.session_id,
                level: level.min(100),
            }))
            .is_ok();

        if !queued {
            trace!(session_id = %self.session_id, "Audio level sample dropped");
        }

        queued
    }
}
