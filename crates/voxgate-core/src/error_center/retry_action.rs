use crate::{DetectedContext, ErrorRecord, StageJob};

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a retry re-invokes, as data rather than a captured closure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RetryAction {
    /// Start a new capture.
    StartCapture {
        /// Context of the session whose start failed.
        context: DetectedContext,
    },
    /// Re-run a pipeline stage with the same inputs.
    RunStage {
        /// Stage inputs.
        job: StageJob,
    },
}

/// Retry bookkeeping key: `(code, component)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RetryKey {
    /// Error code.
    pub code: String,
    /// Failing component.
    pub component: String,
}

impl RetryKey {
    /// Build a key.
    pub fn new(code: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            component: component.into(),
        }
    }
}

impl fmt::Display for RetryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.component, self.code)
    }
}

/// How a retry attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    /// The action succeeded.
    Succeeded,
    /// The action failed again.
    Failed(ErrorRecord),
    /// The action could not run (a session was active); nothing was attempted.
    Abandoned,
}
