use crate::PipelineStage;

use error_location::ErrorLocation;
use thiserror::Error;

/// Collaborator and orchestration errors with source location tracking.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The capture collaborator failed to start, stop or discard a recording.
    #[error("Capture failed: {reason} {location}")]
    CaptureFailed {
        /// Description of the capture failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The health poll itself could not be answered.
    #[error("Health check failed: {reason} {location}")]
    HealthCheckFailed {
        /// Description of the health check failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A pipeline stage (transcription, improvement, delivery) failed.
    #[error("{stage} failed: {reason} {location}")]
    StageFailed {
        /// The stage that failed.
        stage: PipelineStage,
        /// Description of the stage failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// An internal channel was closed while sending.
    #[error("Channel closed: {message} {location}")]
    ChannelClosed {
        /// Human-readable error message.
        message: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A delivered transcript could not be archived.
    #[error("Archive failed: {reason} {location}")]
    ArchiveFailed {
        /// Why the transcript was not written.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Session configuration rejected by validation.
    #[error("Invalid session configuration: {reason} {location}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl CoreError {
    /// User-facing reason, without the location suffix.
    pub fn reason(&self) -> &str {
        match self {
            CoreError::CaptureFailed { reason, .. }
            | CoreError::HealthCheckFailed { reason, .. }
            | CoreError::StageFailed { reason, .. }
            | CoreError::ArchiveFailed { reason, .. }
            | CoreError::InvalidConfig { reason, .. } => reason,
            CoreError::ChannelClosed { message, .. } => message,
        }
    }

    /// The error text shown to users: like `Display`, minus the source
    /// location, which only belongs in logs.
    pub fn describe(&self) -> String {
        match self {
            CoreError::CaptureFailed { reason, .. } => format!("Capture failed: {reason}"),
            CoreError::HealthCheckFailed { reason, .. } => format!("Health check failed: {reason}"),
            CoreError::StageFailed { stage, reason, .. } => format!("{stage} failed: {reason}"),
            CoreError::ChannelClosed { message, .. } => format!("Channel closed: {message}"),
            CoreError::ArchiveFailed { reason, .. } => format!("Archive failed: {reason}"),
            CoreError::InvalidConfig { reason, .. } => {
                format!("Invalid session configuration: {reason}")
            }
        }
    }
}

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
