mod burst_window;
#[allow(clippy::module_inception)]
mod error_center;
mod error_record;
mod retry_action;
mod retry_ledger;

pub use {
    burst_window::{BURST_SPAN, BURST_THRESHOLD, BurstStatus, BurstWindow},
    error_center::{
        ErrorCenter, ReportOutcome, RetryDecision, TRANSIENT_DISPLAY, Toast, ToastId, ToastKind,
    },
    error_record::{ErrorCategory, ErrorRecord},
    retry_action::{RetryAction, RetryKey, RetryOutcome},
    retry_ledger::{RETRY_BACKOFF, RetryLedger, RetryState, backoff_for_attempt},
};
