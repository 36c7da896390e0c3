use crate::{CoreError, CoreResult};

use std::{fmt, panic::Location, time::Duration};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// Period of the elapsed-time ticker while recording.
pub const DURATION_TICK: Duration = Duration::from_millis(100);

/// Period of the capture health poller while recording.
pub const HEALTH_POLL_PERIOD: Duration = Duration::from_millis(500);

/// How long before the maximum duration the warning fires.
pub const WARNING_LEAD: Duration = Duration::from_secs(30);

/// `Done` reverts to `Idle` after this long.
pub const DONE_DISPLAY_TIMEOUT: Duration = Duration::from_millis(1500);

/// `Error` reverts to `Idle` after this long.
pub const ERROR_DISPLAY_TIMEOUT: Duration = Duration::from_secs(3);

/// `Cancelled` reverts to `Idle` after this long.
pub const CANCELLED_DISPLAY_TIMEOUT: Duration = Duration::from_secs(1);

/// How the shortcut drives a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortcutMode {
    /// Record only while the shortcut is held.
    #[default]
    PushToTalk,
    /// One press starts, the next press stops.
    Toggle,
}

impl fmt::Display for ShortcutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PushToTalk => "push_to_talk",
            Self::Toggle => "toggle",
        })
    }
}

/// Settings snapshot taken when a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Shortcut mode for the session.
    pub mode: ShortcutMode,
    /// Recording stops automatically after this long.
    pub max_duration: Duration,
    /// Push-to-talk releases before this are treated as cancels.
    pub min_hold: Duration,
    /// Whether the improvement stage runs after transcription.
    pub improvement_enabled: bool,
    /// Delete the recording once no stage or retry can still need it.
    pub privacy_mode: bool,
}

impl SessionConfig {
    /// Reject configurations the coordinator cannot honor.
    #[track_caller]
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_duration <= WARNING_LEAD {
            return Err(CoreError::InvalidConfig {
                reason: format!(
                    "max duration {:?} must exceed the {:?} warning lead",
                    self.max_duration, WARNING_LEAD
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.min_hold >= self.max_duration {
            return Err(CoreError::InvalidConfig {
                reason: format!(
                    "minimum hold {:?} must be shorter than max duration {:?}",
                    self.min_hold, self.max_duration
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(())
    }

    /// Delay from recording start to the duration warning.
    pub fn warning_after(&self) -> Duration {
        self.max_duration.saturating_sub(WARNING_LEAD)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: ShortcutMode::PushToTalk,
            max_duration: Duration::from_secs(5 * 60),
            min_hold: Duration::from_millis(300),
            improvement_enabled: false,
            privacy_mode: true,
        }
    }
}
