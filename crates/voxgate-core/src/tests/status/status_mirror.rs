use crate::{
    CancelReason, HideDelays, IndicatorPhase, SessionState, ShortcutMode, StatusEvent,
    StatusMirror,
};

use std::time::{Duration, SystemTime};

use tokio::time::Instant;
use uuid::Uuid;

fn started() -> StatusEvent {
    StatusEvent::SessionStarted {
        session_id: Uuid::new_v4(),
        mode: ShortcutMode::Toggle,
        timestamp: SystemTime::now(),
    }
}

/// WHAT: The mirror follows a normal session through its phases
/// WHY: Surfaces render purely from bus events
#[test]
fn given_lifecycle_events_when_applied_then_phases_follow() {
    // Given: A hidden mirror
    let t0 = Instant::now();
    let mut mirror = StatusMirror::default();

    // When/Then: Each lifecycle event moves the phase
    assert!(mirror.apply(&started(), t0));
    assert_eq!(mirror.phase(), IndicatorPhase::Recording);

    mirror.apply(&StatusEvent::AudioLevel { level: 140 }, t0);
    assert_eq!(mirror.level(), 100);

    mirror.apply(&StatusEvent::SessionStopped { elapsed_ms: 2000 }, t0);
    assert_eq!(mirror.phase(), IndicatorPhase::Processing);
    assert_eq!(mirror.elapsed_ms(), 2000);

    mirror.apply(
        &StatusEvent::StageChanged {
            state: SessionState::Transcribing,
        },
        t0,
    );
    assert_eq!(mirror.phase(), IndicatorPhase::Transcribing);

    mirror.apply(&StatusEvent::SessionDone, t0);
    assert_eq!(mirror.phase(), IndicatorPhase::Done);
}

/// WHAT: Done hides on the mirror's own 1.5s timer
/// WHY: Surface hide timing is decoupled from the coordinator
#[test]
fn given_done_when_ticking_then_hidden_after_delay() {
    // Given: A mirror showing Done
    let t0 = Instant::now();
    let mut mirror = StatusMirror::new(HideDelays::default());
    mirror.apply(&started(), t0);
    mirror.apply(&StatusEvent::SessionDone, t0);

    // When: Ticking before and at the hide deadline
    let early = mirror.tick(t0 + Duration::from_millis(1499));
    let due = mirror.tick(t0 + Duration::from_millis(1500));

    // Then: It hides exactly at the deadline
    assert!(!early);
    assert!(due);
    assert!(!mirror.is_visible());
}

/// WHAT: A Hide event does not cut a terminal phase short
/// WHY: The surface keeps its own hide timer for Done/Error/Cancelled
#[test]
fn given_cancelled_when_hide_event_arrives_then_still_visible_until_own_timer() {
    // Given: A mirror showing Cancelled
    let t0 = Instant::now();
    let mut mirror = StatusMirror::default();
    mirror.apply(&started(), t0);
    mirror.apply(
        &StatusEvent::SessionCancelled {
            reason: CancelReason::Escape,
        },
        t0,
    );

    // When: The coordinator's Hide arrives first
    mirror.apply(&StatusEvent::Hide, t0 + Duration::from_millis(10));

    // Then: Still visible until its 1s timer runs
    assert_eq!(mirror.phase(), IndicatorPhase::Cancelled);
    assert_eq!(
        mirror.next_hide_deadline(),
        Some(t0 + Duration::from_secs(1))
    );
    assert!(mirror.tick(t0 + Duration::from_secs(1)));
}

/// WHAT: Error phase keeps the message for display
/// WHY: The indicator shows why the session failed
#[test]
fn given_session_error_when_applied_then_message_kept_and_hide_after_three_seconds() {
    // Given: A mirror in Processing
    let t0 = Instant::now();
    let mut mirror = StatusMirror::default();
    mirror.apply(&started(), t0);
    mirror.apply(&StatusEvent::SessionStopped { elapsed_ms: 500 }, t0);

    // When: The session fails
    mirror.apply(
        &StatusEvent::SessionError {
            message: "model missing".to_string(),
        },
        t0,
    );

    // Then: Message and 3s hide timer are set
    assert_eq!(mirror.phase(), IndicatorPhase::Error);
    assert_eq!(mirror.message(), Some("model missing"));
    assert_eq!(
        mirror.next_hide_deadline(),
        Some(t0 + Duration::from_secs(3))
    );
}
