use crate::config::{default_privacy_mode, default_recorder_command};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// External recorder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Recorder argv. `{output}` is replaced with the WAV path. The recorder
    /// is stopped with SIGINT on unix and by writing `q` to its stdin
    /// elsewhere, then killed if it has not exited after a grace period.
    #[serde(default = "default_recorder_command")]
    pub recorder_command: Vec<String>,
    /// Where recordings are written.
    pub recordings_dir: PathBuf,
    /// Delete each recording once it has been transcribed and delivered,
    /// and sweep leftovers older than an hour at startup.
    #[serde(default = "default_privacy_mode")]
    pub privacy_mode: bool,
}
