use serde::{Deserialize, Serialize};

/// External transcription and improvement commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Transcriber argv. `{input}` is replaced with the WAV path; the
    /// transcript is read from stdout.
    pub transcribe_command: Vec<String>,
    /// Improver argv. The transcript is written to stdin and the improved
    /// text read from stdout. Without it, improvement passes text through.
    #[serde(default)]
    pub improve_command: Option<Vec<String>>,
}
