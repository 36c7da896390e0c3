use crate::{TimerKind, TimerSchedule, TimerSet};

use std::time::Duration;

use tokio::time::Instant;

/// WHAT: A one-shot timer fires once at its deadline
/// WHY: Warning and max-duration timers must not repeat
#[test]
fn given_one_shot_timer_when_deadline_passes_then_fires_once() {
    // Given: A one-shot timer armed for 1s
    let t0 = Instant::now();
    let mut timers = TimerSet::new();
    timers.arm(
        TimerKind::MaxDuration,
        TimerSchedule::Once(Duration::from_secs(1)),
        t0,
    );

    // When: Collecting fires before, at and after the deadline
    let early = timers.take_due(t0 + Duration::from_millis(999));
    let due = timers.take_due(t0 + Duration::from_secs(1));
    let late = timers.take_due(t0 + Duration::from_secs(5));

    // Then: Only the collection at the deadline yields a fire
    assert!(early.is_empty());
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].kind, TimerKind::MaxDuration);
    assert!(late.is_empty());
    assert!(!timers.is_armed(TimerKind::MaxDuration));
}

/// WHAT: Fires taken before disarm_all are stale afterwards
/// WHY: A timer queued for execution must not act after the stop that disarmed it
#[test]
fn given_taken_fire_when_disarm_all_then_fire_is_not_current() {
    // Given: A health poll fire already handed out
    let t0 = Instant::now();
    let mut timers = TimerSet::new();
    timers.arm(
        TimerKind::HealthPoll,
        TimerSchedule::Every(Duration::from_millis(500)),
        t0,
    );
    let fires = timers.take_due(t0 + Duration::from_millis(500));
    assert_eq!(fires.len(), 1);
    assert!(timers.is_current(&fires[0]));

    // When: Every timer is disarmed
    timers.disarm_all();

    // Then: The pending fire is rejected and nothing remains armed
    assert!(!timers.is_current(&fires[0]));
    assert_eq!(timers.next_deadline(), None);
}

/// WHAT: Periodic timers coalesce missed periods into one fire
/// WHY: A stalled loop should not replay a burst of ticks
#[test]
fn given_periodic_timer_when_several_periods_missed_then_single_fire_and_next_deadline_ahead() {
    // Given: A 100ms ticker
    let t0 = Instant::now();
    let mut timers = TimerSet::new();
    timers.arm(
        TimerKind::DurationTicker,
        TimerSchedule::Every(Duration::from_millis(100)),
        t0,
    );

    // When: Collecting 350ms later
    let fires = timers.take_due(t0 + Duration::from_millis(350));

    // Then: One fire, rescheduled to the next period boundary
    assert_eq!(fires.len(), 1);
    assert_eq!(
        timers.next_deadline(),
        Some(t0 + Duration::from_millis(400))
    );
}

/// WHAT: disarm_all is safe with nothing armed
/// WHY: Every exit from Recording calls it, including repeated exits
#[test]
fn given_empty_set_when_disarm_all_twice_then_no_deadline_and_generation_advances() {
    // Given: An empty timer set
    let mut timers = TimerSet::new();
    let start = timers.generation();

    // When: Disarming everything twice
    timers.disarm_all();
    timers.disarm_all();

    // Then: Still nothing armed; each call retired a generation
    assert_eq!(timers.next_deadline(), None);
    assert_eq!(timers.generation().value(), start.value() + 2);
}

/// WHAT: Re-arming a kind replaces the previous timer
/// WHY: Only one timer per kind may be live for a session
#[test]
fn given_armed_timer_when_rearmed_then_old_handle_dead_and_old_fire_stale() {
    // Given: A display timeout armed and fired
    let t0 = Instant::now();
    let mut timers = TimerSet::new();
    let first = timers.arm(
        TimerKind::DisplayTimeout,
        TimerSchedule::Once(Duration::from_secs(1)),
        t0,
    );
    let fires = timers.take_due(t0 + Duration::from_secs(1));

    // When: Re-arming the same kind
    let second = timers.arm(
        TimerKind::DisplayTimeout,
        TimerSchedule::Once(Duration::from_secs(3)),
        t0 + Duration::from_secs(1),
    );

    // Then: The old handle and its fire are no longer current
    assert!(!timers.is_live(&first));
    assert!(timers.is_live(&second));
    assert!(!timers.is_current(&fires[0]));
}

/// WHAT: Fires are ordered by deadline
/// WHY: The coordinator processes a batch in order and later fires may go stale
#[test]
fn given_several_due_timers_when_taken_then_sorted_by_deadline() {
    // Given: Timers with different deadlines
    let t0 = Instant::now();
    let mut timers = TimerSet::new();
    timers.arm(
        TimerKind::MaxDuration,
        TimerSchedule::Once(Duration::from_millis(300)),
        t0,
    );
    timers.arm(
        TimerKind::DurationTicker,
        TimerSchedule::Every(Duration::from_millis(100)),
        t0,
    );
    timers.arm(
        TimerKind::Warning,
        TimerSchedule::Once(Duration::from_millis(200)),
        t0,
    );

    // When: Collecting once all are due
    let kinds: Vec<_> = timers
        .take_due(t0 + Duration::from_millis(300))
        .into_iter()
        .map(|fire| fire.kind)
        .collect();

    // Then: Earliest deadline first
    assert_eq!(
        kinds,
        vec![
            TimerKind::DurationTicker,
            TimerKind::Warning,
            TimerKind::MaxDuration
        ]
    );
}
