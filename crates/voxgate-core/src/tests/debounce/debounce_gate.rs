use crate::{DEFAULT_DEBOUNCE_WINDOW, DebounceGate, TriggerKind};

use std::time::Duration;

use tokio::time::Instant;

/// WHAT: A second trigger inside the window is rejected
/// WHY: Key chatter must not start and immediately stop a session
#[test]
fn given_accepted_trigger_when_repeated_after_150ms_then_rejected() {
    // Given: A gate that just accepted a toggle trigger
    let t0 = Instant::now();
    let mut gate = DebounceGate::default();
    assert!(gate.accept(TriggerKind::Toggle, t0));

    // When: The same kind arrives 150ms later
    let accepted = gate.accept(TriggerKind::Toggle, t0 + Duration::from_millis(150));

    // Then: It is rejected
    assert!(!accepted);
}

/// WHAT: A trigger exactly one window later is accepted
/// WHY: The window bound is inclusive of `now - last == window`
#[test]
fn given_accepted_trigger_when_repeated_after_window_then_accepted() {
    // Given: A gate that accepted a trigger at t0
    let t0 = Instant::now();
    let mut gate = DebounceGate::default();
    assert!(gate.accept(TriggerKind::Toggle, t0));

    // When: The next one arrives exactly one window later
    let accepted = gate.accept(TriggerKind::Toggle, t0 + DEFAULT_DEBOUNCE_WINDOW);

    // Then: It is accepted
    assert!(accepted);
}

/// WHAT: Rejected triggers do not extend the window
/// WHY: Only accepted triggers record a timestamp
#[test]
fn given_rejected_trigger_when_next_arrives_after_original_window_then_accepted() {
    // Given: An accepted trigger followed by a rejected one
    let t0 = Instant::now();
    let mut gate = DebounceGate::new(Duration::from_millis(200));
    assert!(gate.accept(TriggerKind::Toggle, t0));
    assert!(!gate.accept(TriggerKind::Toggle, t0 + Duration::from_millis(150)));

    // When: A trigger arrives 200ms after the accepted one
    let accepted = gate.accept(TriggerKind::Toggle, t0 + Duration::from_millis(200));

    // Then: It is accepted
    assert!(accepted);
}

/// WHAT: Kinds are tracked independently
/// WHY: One trigger family must not suppress another
#[test]
fn given_two_kinds_when_both_fire_together_then_both_accepted() {
    // Given: A gate keyed by arbitrary trigger names
    let t0 = Instant::now();
    let mut gate: DebounceGate<&'static str> = DebounceGate::new(Duration::from_millis(200));

    // When: Two different kinds arrive at the same instant
    let first = gate.accept("toggle", t0);
    let second = gate.accept("escape", t0);

    // Then: Both are accepted
    assert!(first);
    assert!(second);
}
