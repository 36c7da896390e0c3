use crate::{CoreError, RetryAction, RetryKey};

use std::{fmt, time::SystemTime};

use serde::{Deserialize, Serialize};

/// How an error is displayed and whether it may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Environment-like hiccup; shown briefly, retryable.
    Transient,
    /// The user has to act (e.g. free a busy microphone).
    UserAction,
    /// Unexpected internal fault.
    Fatal,
    /// An OS-level grant is missing.
    Permission,
}

impl ErrorCategory {
    /// Whether toasts of this category expire on their own.
    pub const fn is_timed(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transient => "transient",
            Self::UserAction => "user_action",
            Self::Fatal => "fatal",
            Self::Permission => "permission",
        })
    }
}

/// A classified failure, owned by the error/retry subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Stable machine-readable code, e.g. `capture_start_failed`.
    pub code: String,
    /// User-facing message.
    pub message: String,
    /// Diagnostic details.
    pub details: Option<String>,
    /// Display and retry class.
    pub category: ErrorCategory,
    /// Whether a retry may be attempted.
    pub retryable: bool,
    /// Component that failed, e.g. `capture` or `transcription`.
    pub component: String,
    /// When the failure was observed.
    pub timestamp: SystemTime,
    /// What a retry re-invokes.
    pub retry_action: Option<RetryAction>,
}

impl ErrorRecord {
    /// New non-retryable record stamped with the current time.
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        category: ErrorCategory,
        component: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            category,
            retryable: false,
            component: component.into(),
            timestamp: SystemTime::now(),
            retry_action: None,
        }
    }

    /// Build from a collaborator error. Details carry the error kind but
    /// never the source location.
    pub fn from_core(
        code: impl Into<String>,
        category: ErrorCategory,
        component: impl Into<String>,
        error: &CoreError,
    ) -> Self {
        Self::new(code, error.reason(), category, component).with_details(error.describe())
    }

    /// Attach diagnostic details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach a retry action and mark the record retryable.
    pub fn with_retry(mut self, action: RetryAction) -> Self {
        self.retry_action = Some(action);
        self.retryable = true;
        self
    }

    /// Key under which retry state is tracked.
    pub fn key(&self) -> RetryKey {
        RetryKey::new(&self.code, &self.component)
    }

    /// This record with a later failure's message and details merged in.
    ///
    /// Code, component and category are kept so the retry key is stable.
    pub fn merged_with(&self, failure: &ErrorRecord) -> Self {
        Self {
            message: failure.message.clone(),
            details: failure.details.clone().or_else(|| self.details.clone()),
            timestamp: failure.timestamp,
            retry_action: failure
                .retry_action
                .clone()
                .or_else(|| self.retry_action.clone()),
            ..self.clone()
        }
    }
}
