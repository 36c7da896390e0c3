use crate::{BURST_SPAN, BurstStatus, BurstWindow};

use std::time::Duration;

use tokio::time::Instant;

/// WHAT: The fifth error inside the span starts a burst with all five members
/// WHY: Members are needed to replace their individual toasts
#[test]
fn given_four_recent_errors_when_fifth_observed_then_burst_started_with_five_members() {
    // Given: Four errors 100ms apart
    let t0 = Instant::now();
    let mut window = BurstWindow::default();
    for tag in 1..=4 {
        let status = window.observe(tag, t0 + Duration::from_millis(tag * 100));
        assert_eq!(status, BurstStatus::Individual);
    }

    // When: A fifth arrives
    let status = window.observe(5, t0 + Duration::from_millis(500));

    // Then: A burst starts containing every error in the window
    assert_eq!(
        status,
        BurstStatus::Started {
            members: vec![1, 2, 3, 4, 5]
        }
    );
    assert!(window.is_grouping());
}

/// WHAT: Errors older than the span do not count toward a burst
/// WHY: The window is a trailing 2s log
#[test]
fn given_errors_spread_beyond_span_when_observed_then_never_grouped() {
    // Given: A window
    let t0 = Instant::now();
    let mut window = BurstWindow::default();

    // When: Errors arrive every 600ms
    let statuses: Vec<_> = (0..8)
        .map(|i| window.observe(i, t0 + Duration::from_millis(i * 600)))
        .collect();

    // Then: At most four fit in any 2s span, so none are grouped
    assert!(statuses.iter().all(|s| *s == BurstStatus::Individual));
}

/// WHAT: Grouping ends after a quiet span
/// WHY: Normal display resumes once the flood stops
#[test]
fn given_active_burst_when_quiet_for_span_then_reset() {
    // Given: An active burst whose last error was at t0
    let t0 = Instant::now();
    let mut window = BurstWindow::default();
    for tag in 0..5 {
        window.observe(tag, t0);
    }
    assert!(window.is_grouping());
    assert_eq!(window.quiet_deadline(), Some(t0 + BURST_SPAN));

    // When: A full span passes with no errors
    let ended = window.reset_if_quiet(t0 + BURST_SPAN);

    // Then: The burst ends and the next error is individual
    assert!(ended);
    assert!(!window.is_grouping());
    assert_eq!(
        window.observe(9, t0 + BURST_SPAN + Duration::from_millis(1)),
        BurstStatus::Individual
    );
}

/// WHAT: Errors during a burst continue the count
/// WHY: The aggregate counter must reflect every grouped error
#[test]
fn given_active_burst_when_more_errors_then_count_continues() {
    // Given: A burst of five
    let t0 = Instant::now();
    let mut window = BurstWindow::default();
    for tag in 0..5 {
        window.observe(tag, t0);
    }

    // When: Two more arrive within the span of the last one
    let sixth = window.observe(5, t0 + Duration::from_millis(1500));
    let seventh = window.observe(6, t0 + Duration::from_millis(3000));

    // Then: The count keeps growing
    assert_eq!(sixth, BurstStatus::Continued { count: 6 });
    assert_eq!(seventh, BurstStatus::Continued { count: 7 });
}
