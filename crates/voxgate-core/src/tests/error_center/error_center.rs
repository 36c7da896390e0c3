use crate::{
    DetectedContext, ErrorCategory, ErrorCenter, ErrorRecord, ReportOutcome, RetryAction,
    RetryDecision, RetryKey, RetryOutcome, TRANSIENT_DISPLAY, ToastKind,
};

use std::time::Duration;

use tokio::time::Instant;

fn scheduled_key(decision: RetryDecision) -> Option<RetryKey> {
    match decision {
        RetryDecision::Scheduled { key, .. } => Some(key),
        RetryDecision::AlreadyInFlight | RetryDecision::NotRetryable => None,
    }
}

fn transient(code: &str) -> ErrorRecord {
    ErrorRecord::new(code, "microphone busy", ErrorCategory::Transient, "capture").with_retry(
        RetryAction::StartCapture {
            context: DetectedContext::unknown(),
        },
    )
}

/// WHAT: Five transient errors within one second show one aggregate
/// WHY: A failing collaborator must not flood the user with toasts
#[test]
fn given_five_transient_errors_in_one_second_when_reported_then_one_aggregate_toast() {
    // Given: An error center
    let t0 = Instant::now();
    let mut center = ErrorCenter::new();

    // When: Reporting five errors 200ms apart
    let outcomes: Vec<_> = (0..5)
        .map(|i| center.report(transient("capture_start_failed"), t0 + Duration::from_millis(i * 200)))
        .collect();

    // Then: One aggregate counting five is visible
    assert!(matches!(
        outcomes[4],
        ReportOutcome::Grouped { count: 5, .. }
    ));
    assert_eq!(center.visible().len(), 1);
    assert!(matches!(
        center.visible()[0].kind,
        ToastKind::Aggregate { count: 5, .. }
    ));
}

/// WHAT: Four errors within two seconds are shown individually
/// WHY: Grouping only starts at the threshold
#[test]
fn given_four_transient_errors_in_two_seconds_when_reported_then_four_toasts() {
    // Given: An error center
    let t0 = Instant::now();
    let mut center = ErrorCenter::new();

    // When: Reporting four errors 500ms apart
    for i in 0..4 {
        let outcome = center.report(transient("transcription_failed"), t0 + Duration::from_millis(i * 500));
        assert!(matches!(outcome, ReportOutcome::Shown(_)));
    }

    // Then: Four individual toasts
    assert_eq!(center.visible().len(), 4);
    assert!(center.visible().iter().all(|t| t.record().is_some()));
}

/// WHAT: The aggregate counter updates while the burst continues
/// WHY: Users see how many errors were collapsed
#[test]
fn given_active_burst_when_another_error_then_aggregate_count_updated() {
    // Given: A burst of five
    let t0 = Instant::now();
    let mut center = ErrorCenter::new();
    for _ in 0..5 {
        center.report(transient("capture_device_fault"), t0);
    }

    // When: A sixth error arrives
    let later = t0 + Duration::from_secs(1);
    let outcome = center.report(
        ErrorRecord::new("delivery_failed", "paste failed", ErrorCategory::Transient, "delivery"),
        later,
    );

    // Then: Same toast, count six, latest message, expiry pushed out
    assert!(matches!(outcome, ReportOutcome::Grouped { count: 6, .. }));
    assert_eq!(center.visible().len(), 1);
    let toast = &center.visible()[0];
    assert_eq!(
        toast.kind,
        ToastKind::Aggregate {
            count: 6,
            last_message: "paste failed".to_string()
        }
    );
    assert_eq!(toast.expires_at, Some(later + TRANSIENT_DISPLAY));
}

/// WHAT: Transient toasts expire, persistent categories stay
/// WHY: Display duration is classified by category
#[test]
fn given_transient_and_permission_errors_when_expiring_then_only_transient_removed() {
    // Given: One transient and one permission error
    let t0 = Instant::now();
    let mut center = ErrorCenter::new();
    center.report(transient("capture_start_failed"), t0);
    center.report(
        ErrorRecord::new(
            "permission_required",
            "Accessibility access needed",
            ErrorCategory::Permission,
            "shortcut",
        ),
        t0,
    );

    // When: The transient display time passes
    let changed = center.expire(t0 + TRANSIENT_DISPLAY);

    // Then: Only the permission toast remains
    assert!(changed);
    assert_eq!(center.visible().len(), 1);
    assert_eq!(
        center.visible()[0].record().map(|r| r.code.as_str()),
        Some("permission_required")
    );
    assert_eq!(center.next_deadline(), None);
}

/// WHAT: Two immediate retries of the same error schedule only one attempt
/// WHY: At most one retry may be in flight per (code, component)
#[test]
fn given_retryable_error_when_retried_twice_then_single_attempt_in_flight() {
    // Given: A retryable record
    let mut center = ErrorCenter::new();
    let record = transient("capture_start_failed");

    // When: Retrying twice in immediate succession
    let first = center.retry(&record);
    let second = center.retry(&record);

    // Then: Only the first is scheduled, immediately
    assert!(matches!(
        first,
        RetryDecision::Scheduled {
            attempt: 1,
            delay: Duration::ZERO,
            ..
        }
    ));
    assert_eq!(second, RetryDecision::AlreadyInFlight);
}

/// WHAT: Non-retryable records are ignored by retry
/// WHY: retry is a no-op without a retry action
#[test]
fn given_non_retryable_error_when_retried_then_not_retryable() {
    // Given: A fatal record without an action
    let mut center = ErrorCenter::new();
    let record = ErrorRecord::new("capture_stop_failed", "stop failed", ErrorCategory::Fatal, "capture");

    // When: Retrying
    let decision = center.retry(&record);

    // Then: Nothing is scheduled
    assert_eq!(decision, RetryDecision::NotRetryable);
}

/// WHAT: Repeated failures back off 0s, 1s, 3s, 3s
/// WHY: Later attempts wait before re-invoking the action
#[test]
fn given_repeated_failures_when_retrying_then_backoff_grows_and_caps() {
    // Given: A retryable record
    let t0 = Instant::now();
    let mut center = ErrorCenter::new();
    let record = transient("capture_start_failed");

    // When: Each attempt fails and is retried again
    let mut delays = Vec::new();
    for _ in 0..4 {
        if let RetryDecision::Scheduled { key, delay, .. } = center.retry(&record) {
            delays.push(delay);
            center.settle(&key, RetryOutcome::Failed(transient("capture_start_failed")), t0);
        }
    }

    // Then: Backoff follows the schedule
    assert_eq!(
        delays,
        vec![
            Duration::ZERO,
            Duration::from_secs(1),
            Duration::from_secs(3),
            Duration::from_secs(3)
        ]
    );
}

/// WHAT: A failed retry re-reports the original record with the new details
/// WHY: The retry key must stay stable while the message reflects the latest failure
#[test]
#[allow(clippy::unwrap_used)]
fn given_in_flight_retry_when_failed_then_merged_record_reported() {
    // Given: A retry in flight
    let t0 = Instant::now();
    let mut center = ErrorCenter::new();
    let record = transient("capture_start_failed");
    let key = scheduled_key(center.retry(&record)).unwrap();

    // When: The attempt fails with a new message
    let failure = ErrorRecord::new(
        "capture_start_failed",
        "device disconnected",
        ErrorCategory::Transient,
        "capture",
    )
    .with_details("ENODEV");
    let outcome = center.settle(&key, RetryOutcome::Failed(failure), t0);

    // Then: A toast with the merged record is shown and the count is kept
    assert!(matches!(outcome, Some(ReportOutcome::Shown(_))));
    let shown = center.visible()[0].record().cloned();
    assert_eq!(shown.as_ref().map(|r| r.message.as_str()), Some("device disconnected"));
    assert_eq!(shown.as_ref().and_then(|r| r.details.as_deref()), Some("ENODEV"));
    assert_eq!(shown.map(|r| r.key()), Some(key.clone()));
    assert_eq!(center.retry_state(&key).map(|s| s.attempt_count), Some(1));
}

/// WHAT: A successful retry clears the key's state
/// WHY: The next failure of the same error starts from attempt one
#[test]
#[allow(clippy::unwrap_used)]
fn given_in_flight_retry_when_succeeded_then_state_cleared() {
    // Given: A retry in flight
    let t0 = Instant::now();
    let mut center = ErrorCenter::new();
    let record = transient("capture_start_failed");
    let key = scheduled_key(center.retry(&record)).unwrap();

    // When: It succeeds
    let outcome = center.settle(&key, RetryOutcome::Succeeded, t0);

    // Then: No toast and no retry state
    assert_eq!(outcome, None);
    assert!(center.retry_state(&key).is_none());
}

/// WHAT: An abandoned retry frees the key without counting an attempt
/// WHY: A busy coordinator must not block later retries
#[test]
#[allow(clippy::unwrap_used)]
fn given_in_flight_retry_when_abandoned_then_retry_allowed_again_at_same_attempt() {
    // Given: A retry in flight
    let t0 = Instant::now();
    let mut center = ErrorCenter::new();
    let record = transient("capture_start_failed");
    let key = scheduled_key(center.retry(&record)).unwrap();

    // When: It is abandoned and retried again
    center.settle(&key, RetryOutcome::Abandoned, t0);
    let again = center.retry(&record);

    // Then: Scheduled again as attempt one
    assert!(matches!(again, RetryDecision::Scheduled { attempt: 1, .. }));
}

/// WHAT: Dismissed toasts disappear
/// WHY: Persistent toasts are only removed by the user
#[test]
fn given_persistent_toast_when_dismissed_then_removed() {
    // Given: A fatal toast
    let t0 = Instant::now();
    let mut center = ErrorCenter::new();
    center.report(
        ErrorRecord::new("capture_stop_failed", "stop failed", ErrorCategory::Fatal, "capture"),
        t0,
    );
    let id = center.visible()[0].id;

    // When: Dismissing it twice
    let first = center.dismiss(id);
    let second = center.dismiss(id);

    // Then: Removed once
    assert!(first);
    assert!(!second);
    assert!(center.visible().is_empty());
}
