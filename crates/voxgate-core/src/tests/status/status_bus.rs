use crate::{StatusBus, StatusEvent};

/// WHAT: Publishing with no subscribers is not an error
/// WHY: The bus is best-effort; surfaces may come and go
#[test]
fn given_no_subscribers_when_publishing_then_zero_receivers() {
    // Given: A bus with no subscribers
    let bus = StatusBus::default();

    // When: Publishing an event
    let receivers = bus.publish(StatusEvent::Busy);

    // Then: Nobody received it and nothing failed
    assert_eq!(receivers, 0);
}

/// WHAT: Every subscriber receives each event
/// WHY: Primary view and floating indicator mirror the same stream
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_two_subscribers_when_publishing_then_both_receive() {
    // Given: Two subscribers
    let bus = StatusBus::default();
    let mut primary = bus.subscribe();
    let mut indicator = bus.subscribe();

    // When: Publishing one event
    let receivers = bus.publish(StatusEvent::SessionDone);

    // Then: Both get it
    assert_eq!(receivers, 2);
    assert_eq!(primary.recv().await.unwrap(), StatusEvent::SessionDone);
    assert_eq!(indicator.recv().await.unwrap(), StatusEvent::SessionDone);
}

/// WHAT: A lagging subscriber skips missed events and continues
/// WHY: No backpressure or replay; a slow surface is merely stale
#[test]
#[allow(clippy::unwrap_used)]
fn given_full_buffer_when_subscriber_reads_then_oldest_skipped() {
    // Given: A bus buffering two events and a subscriber that never read
    let bus = StatusBus::new(2);
    let mut subscription = bus.subscribe();

    // When: Five events are published
    for elapsed_ms in 0..5 {
        bus.publish(StatusEvent::Elapsed { elapsed_ms });
    }
    let events = subscription.drain();

    // Then: Only the newest two arrive and the gap is counted
    assert_eq!(
        events,
        vec![
            StatusEvent::Elapsed { elapsed_ms: 3 },
            StatusEvent::Elapsed { elapsed_ms: 4 }
        ]
    );
    assert_eq!(subscription.missed(), 3);
}

/// WHAT: Late subscribers do not see earlier events
/// WHY: The bus never replays
#[test]
fn given_event_published_when_subscribing_later_then_nothing_queued() {
    // Given: An event published before anyone subscribed
    let bus = StatusBus::default();
    let _early = bus.subscribe();
    bus.publish(StatusEvent::Hide);

    // When: A new subscriber joins
    let mut late = bus.subscribe();

    // Then: It has nothing to read
    assert_eq!(late.try_recv(), None);
}
