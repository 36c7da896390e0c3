//! Classification, display, burst grouping and retry of error records.
//!
//! The center is the process-wide error channel. It does not execute retry
//! actions itself: [`ErrorCenter::retry`] decides whether and when an action
//! may run, the event loop runs it, and the outcome comes back through
//! [`ErrorCenter::settle`].

use crate::{
    BurstStatus, BurstWindow, ErrorCategory, ErrorRecord, RetryAction, RetryKey, RetryLedger,
    RetryOutcome, backoff_for_attempt,
};

use std::{fmt, time::Duration};

use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// How long transient toasts (and the burst aggregate) stay visible.
pub const TRANSIENT_DISPLAY: Duration = Duration::from_secs(5);

/// Identifier of a displayed toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(u64);

impl ToastId {
    /// Raw identifier.
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "toast-{}", self.0)
    }
}

/// Toast contents.
#[derive(Debug, Clone, PartialEq)]
pub enum ToastKind {
    /// One error.
    Single(ErrorRecord),
    /// Several errors collapsed during a burst.
    Aggregate {
        /// Errors counted so far.
        count: u32,
        /// Most recent message.
        last_message: String,
    },
}

/// A visible error notice.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    /// Identifier for dismiss/retry.
    pub id: ToastId,
    /// Contents.
    pub kind: ToastKind,
    /// `None` for toasts that persist until dismissed.
    pub expires_at: Option<Instant>,
}

impl Toast {
    /// The record behind a single-error toast.
    pub fn record(&self) -> Option<&ErrorRecord> {
        match &self.kind {
            ToastKind::Single(record) => Some(record),
            ToastKind::Aggregate { .. } => None,
        }
    }

    /// Headline text.
    pub fn message(&self) -> String {
        match &self.kind {
            ToastKind::Single(record) => record.message.clone(),
            ToastKind::Aggregate { count, last_message } => {
                format!("{count} errors occurred (latest: {last_message})")
            }
        }
    }
}

/// Result of [`ErrorCenter::report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Displayed as its own toast.
    Shown(ToastId),
    /// Folded into the burst aggregate.
    Grouped {
        /// Aggregate toast.
        toast: ToastId,
        /// Errors counted in the burst.
        count: u32,
    },
}

/// Result of [`ErrorCenter::retry`].
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Run `action` after `delay`, then report via [`ErrorCenter::settle`].
    Scheduled {
        /// Key to settle.
        key: RetryKey,
        /// 1-based attempt number.
        attempt: u32,
        /// Backoff before running the action.
        delay: Duration,
        /// What to run.
        action: RetryAction,
    },
    /// An attempt for the same key is already running.
    AlreadyInFlight,
    /// The record is not retryable or has no action.
    NotRetryable,
}

/// The error/retry subsystem.
#[derive(Debug)]
pub struct ErrorCenter {
    visible: Vec<Toast>,
    next_id: u64,
    burst: BurstWindow,
    aggregate: Option<ToastId>,
    ledger: RetryLedger,
    transient_display: Duration,
}

impl ErrorCenter {
    /// Center with default burst and display settings.
    pub fn new() -> Self {
        Self::with_settings(BurstWindow::default(), TRANSIENT_DISPLAY)
    }

    /// Center with explicit burst window and transient display time.
    pub fn with_settings(burst: BurstWindow, transient_display: Duration) -> Self {
        Self {
            visible: Vec::new(),
            next_id: 0,
            burst,
            aggregate: None,
            ledger: RetryLedger::new(),
            transient_display,
        }
    }

    /// Log, classify and display a record.
    #[instrument(skip(self, record), fields(code = %record.code, component = %record.component))]
    pub fn report(&mut self, record: ErrorRecord, now: Instant) -> ReportOutcome {
        Self::log(&record);

        let id = self.allocate_id();

        match self.burst.observe(id.0, now) {
            BurstStatus::Individual => {
                let expires_at = self.expiry_for(record.category, now);
                self.visible.push(Toast {
                    id,
                    kind: ToastKind::Single(record),
                    expires_at,
                });
                ReportOutcome::Shown(id)
            }
            BurstStatus::Started { members } => {
                self.visible.retain(|toast| !members.contains(&toast.id.0));
                let count = u32::try_from(members.len()).unwrap_or(u32::MAX);
                self.visible.push(Toast {
                    id,
                    kind: ToastKind::Aggregate {
                        count,
                        last_message: record.message,
                    },
                    expires_at: Some(now + self.transient_display),
                });
                self.aggregate = Some(id);
                warn!(count, "Error burst detected, grouping notices");
                ReportOutcome::Grouped { toast: id, count }
            }
            BurstStatus::Continued { count } => {
                let toast = self.refresh_aggregate(count, record.message, now);
                ReportOutcome::Grouped { toast, count }
            }
        }
    }

    /// Decide whether `record` may be retried now and with what delay.
    #[instrument(skip(self, record), fields(code = %record.code, component = %record.component))]
    pub fn retry(&mut self, record: &ErrorRecord) -> RetryDecision {
        let action = match (&record.retry_action, record.retryable) {
            (Some(action), true) => action.clone(),
            _ => {
                debug!("Retry ignored, record is not retryable");
                return RetryDecision::NotRetryable;
            }
        };

        let Some(attempt) = self.ledger.begin(record) else {
            debug!("Retry ignored, attempt already in flight");
            return RetryDecision::AlreadyInFlight;
        };

        let delay = backoff_for_attempt(attempt);
        info!(attempt, delay_ms = delay.as_millis(), "Retry scheduled");

        RetryDecision::Scheduled {
            key: record.key(),
            attempt,
            delay,
            action,
        }
    }

    /// Record how a scheduled retry ended.
    ///
    /// A failure is re-reported as the original record with the new
    /// failure's message and details merged in.
    #[instrument(skip(self, outcome), fields(key = %key))]
    pub fn settle(
        &mut self,
        key: &RetryKey,
        outcome: RetryOutcome,
        now: Instant,
    ) -> Option<ReportOutcome> {
        match outcome {
            RetryOutcome::Succeeded => {
                if let Some(state) = self.ledger.succeed(key) {
                    info!(failed_attempts = state.attempt_count, "Retry succeeded");
                }
                None
            }
            RetryOutcome::Failed(failure) => {
                let merged = match self.ledger.fail(key) {
                    Some(origin) => origin.merged_with(&failure),
                    None => failure,
                };
                Some(self.report(merged, now))
            }
            RetryOutcome::Abandoned => {
                debug!("Retry abandoned");
                self.ledger.abandon(key);
                None
            }
        }
    }

    /// Remove a toast. Returns whether it was visible.
    pub fn dismiss(&mut self, id: ToastId) -> bool {
        let before = self.visible.len();
        self.visible.retain(|toast| toast.id != id);
        if self.aggregate == Some(id) {
            self.aggregate = None;
        }
        before != self.visible.len()
    }

    /// Drop expired toasts and end a quiet burst. Returns whether the
    /// visible set changed.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.burst.reset_if_quiet(now) {
            debug!("Error burst ended");
        }

        let before = self.visible.len();
        self.visible
            .retain(|toast| toast.expires_at.is_none_or(|at| at > now));
        let changed = before != self.visible.len();

        if let Some(id) = self.aggregate {
            if !self.visible.iter().any(|toast| toast.id == id) {
                self.aggregate = None;
            }
        }

        changed
    }

    /// Earliest toast expiry or burst reset.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.visible
            .iter()
            .filter_map(|toast| toast.expires_at)
            .chain(self.burst.quiet_deadline())
            .min()
    }

    /// Visible toasts, oldest first.
    pub fn visible(&self) -> &[Toast] {
        &self.visible
    }

    /// A visible toast by id.
    pub fn toast(&self, id: ToastId) -> Option<&Toast> {
        self.visible.iter().find(|toast| toast.id == id)
    }

    /// Retry bookkeeping for a key.
    pub fn retry_state(&self, key: &RetryKey) -> Option<&crate::RetryState> {
        self.ledger.get(key)
    }

    fn refresh_aggregate(&mut self, count: u32, message: String, now: Instant) -> ToastId {
        let expires_at = Some(now + self.transient_display);

        if let Some(id) = self.aggregate {
            if let Some(toast) = self.visible.iter_mut().find(|toast| toast.id == id) {
                toast.kind = ToastKind::Aggregate {
                    count,
                    last_message: message,
                };
                toast.expires_at = expires_at;
                return id;
            }
        }

        // The aggregate was dismissed or expired mid-burst; show a new one.
        let id = self.allocate_id();
        self.visible.push(Toast {
            id,
            kind: ToastKind::Aggregate {
                count,
                last_message: message,
            },
            expires_at,
        });
        self.aggregate = Some(id);
        id
    }

    fn expiry_for(&self, category: ErrorCategory, now: Instant) -> Option<Instant> {
        category.is_timed().then(|| now + self.transient_display)
    }

    fn allocate_id(&mut self) -> ToastId {
        self.next_id += 1;
        ToastId(self.next_id)
    }

    fn log(record: &ErrorRecord) {
        match record.category {
            ErrorCategory::Transient | ErrorCategory::UserAction => warn!(
                code = %record.code,
                component = %record.component,
                category = %record.category,
                retryable = record.retryable,
                details = ?record.details,
                "{}",
                record.message
            ),
            ErrorCategory::Fatal | ErrorCategory::Permission => error!(
                code = %record.code,
                component = %record.component,
                category = %record.category,
                details = ?record.details,
                "{}",
                record.message
            ),
        }
    }
}

impl Default for ErrorCenter {
    fn default() -> Self {
        Self::new()
    }
}
