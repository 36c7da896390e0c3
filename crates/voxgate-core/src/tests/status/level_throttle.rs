use crate::{LEVEL_INTERVAL, LevelThrottle};

use std::time::Duration;

use tokio::time::Instant;

/// WHAT: 100 samples/sec are admitted at no more than ~30/sec
/// WHY: Level events must not flood the status bus
#[test]
fn given_100_samples_per_second_when_throttled_then_at_most_30_admitted() {
    // Given: A default throttle and one second of 10ms-spaced samples
    let t0 = Instant::now();
    let mut throttle = LevelThrottle::default();

    // When: Offering every sample
    let admitted = (0..100)
        .filter(|i| throttle.admit(t0 + Duration::from_millis(i * 10)))
        .count();

    // Then: The admitted rate stays under 30 Hz
    assert!(admitted > 0);
    assert!(admitted <= 30, "admitted {admitted} samples");
}

/// WHAT: reset lets the next sample through immediately
/// WHY: A new session must show its first level without delay
#[test]
fn given_recent_admission_when_reset_then_next_sample_admitted() {
    // Given: A throttle that just admitted a sample
    let t0 = Instant::now();
    let mut throttle = LevelThrottle::new(LEVEL_INTERVAL);
    assert!(throttle.admit(t0));
    assert!(!throttle.admit(t0 + Duration::from_millis(1)));

    // When: Resetting
    throttle.reset();

    // Then: The next sample is admitted
    assert!(throttle.admit(t0 + Duration::from_millis(2)));
}
