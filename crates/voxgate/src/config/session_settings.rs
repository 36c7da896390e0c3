use crate::config::{default_max_duration_minutes, default_min_hold_ms};

use serde::{Deserialize, Serialize};

/// Per-session limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Recording stops automatically after this many minutes.
    #[serde(default = "default_max_duration_minutes")]
    pub max_duration_minutes: u64,
    /// Push-to-talk releases sooner than this cancel the recording.
    #[serde(default = "default_min_hold_ms")]
    pub min_hold_ms: u64,
    /// Run the improvement command between transcription and delivery.
    #[serde(default)]
    pub improvement_enabled: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_duration_minutes: default_max_duration_minutes(),
            min_hold_ms: default_min_hold_ms(),
            improvement_enabled: false,
        }
    }
}
