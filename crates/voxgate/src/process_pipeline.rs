//! Pipeline stages backed by external commands and the clipboard, plus the
//! markdown archive written after delivery.

use crate::{
    AppError, OutputHandler, TranscriptArchive,
    config::{BehaviourConfig, INPUT_PLACEHOLDER, PipelineConfig},
    external_command::{expand_args, run_command},
};

use std::{
    panic::Location,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use voxgate_core::{
    CoreError, CoreResult, DetectedContext, Pipeline, PipelineStage, TranscriptEntry,
};

/// Upper bound for one transcription run.
const TRANSCRIBE_TIMEOUT: Duration = Duration::from_secs(120);

/// Upper bound for one improvement run.
const IMPROVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable carrying the focused application to the improver.
pub(crate) const APP_ID_ENV: &str = "VOXGATE_APP_ID";

/// [`Pipeline`] that shells out for transcription and improvement and
/// delivers through the clipboard.
pub struct ProcessPipeline {
    config: PipelineConfig,
    behavior: BehaviourConfig,
    // Created on first delivery so a headless start does not need a clipboard.
    output: Mutex<Option<OutputHandler>>,
    archive: TranscriptArchive,
}

impl ProcessPipeline {
    /// Create a pipeline for the given commands.
    pub fn new(config: PipelineConfig, behavior: BehaviourConfig, archive: TranscriptArchive) -> Self {
        Self {
            config,
            behavior,
            output: Mutex::new(None),
            archive,
        }
    }
}

#[async_trait]
impl Pipeline for ProcessPipeline {
    #[instrument(skip(self, path, context), fields(path = %path.display(), context = %context))]
    async fn transcribe(&self, path: &Path, context: &DetectedContext) -> CoreResult<String> {
        let argv = expand_args(
            &self.config.transcribe_command,
            INPUT_PLACEHOLDER,
            &path.to_string_lossy(),
        );

        let text = run_command(&argv, None, &[], TRANSCRIBE_TIMEOUT)
            .await
            .map_err(|e| stage_failed(PipelineStage::Transcription, e))?;

        info!(text_len = text.len(), "Transcription complete");

        Ok(text)
    }

    #[instrument(skip(self, text, context), fields(text_len = text.len(), context = %context))]
    async fn improve(&self, text: &str, context: &DetectedContext) -> CoreResult<String> {
        let Some(argv) = self.config.improve_command.as_deref() else {
            debug!("No improve command configured, passing text through");
            return Ok(text.to_string());
        };

        let app_id = context.app_id().unwrap_or_default();
        let improved = run_command(argv, Some(text), &[(APP_ID_ENV, app_id)], IMPROVE_TIMEOUT)
            .await
            .map_err(|e| stage_failed(PipelineStage::Improvement, e))?;

        info!(improved_len = improved.len(), "Improvement complete");

        Ok(improved)
    }

    #[instrument(skip(self, text, context), fields(text_len = text.len(), context = %context))]
    async fn deliver(&self, text: &str, context: &DetectedContext) -> CoreResult<()> {
        if text.trim().is_empty() {
            return Err(CoreError::StageFailed {
                stage: PipelineStage::Delivery,
                reason: "No speech detected".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut output = self.output.lock().await;
        if output.is_none() {
            *output = Some(
                OutputHandler::new().map_err(|e| stage_failed(PipelineStage::Delivery, e))?,
            );
        }

        if let Some(handler) = output.as_mut() {
            handler
                .output_text(text, &self.behavior)
                .await
                .map_err(|e| stage_failed(PipelineStage::Delivery, e))?;
        }

        Ok(())
    }

    async fn archive(&self, entry: &TranscriptEntry) -> CoreResult<Option<PathBuf>> {
        self.archive
            .write(entry)
            .await
            .map_err(|e| CoreError::ArchiveFailed {
                reason: e.reason(),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

#[track_caller]
fn stage_failed(stage: PipelineStage, error: AppError) -> CoreError {
    CoreError::StageFailed {
        stage,
        reason: error.reason(),
        location: ErrorLocation::from(Location::caller()),
    }
}
