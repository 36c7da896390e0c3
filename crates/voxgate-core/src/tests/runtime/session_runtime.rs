use crate::{
    CancelReason, CaptureDevice, CapturedAudio, CoreError, CoreResult, DetectedContext, DeviceFault,
    ErrorCategory, LevelSink, Pipeline, SessionConfig, SessionRuntime, ShortcutMode, StatusBus,
    StatusEvent, StatusSubscription, TranscriptEntry,
};

use std::{
    panic::Location,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use tokio::time::{self, Instant};

type CallLog = Arc<Mutex<Vec<String>>>;

fn log(calls: &CallLog, call: impl Into<String>) {
    if let Ok(mut calls) = calls.lock() {
        calls.push(call.into());
    }
}

fn logged(calls: &CallLog) -> Vec<String> {
    calls.lock().map(|calls| calls.clone()).unwrap_or_default()
}

/// In-memory capture that fails the first `failing_starts` starts.
struct FakeCapture {
    calls: CallLog,
    failing_starts: usize,
}

#[async_trait]
impl CaptureDevice for FakeCapture {
    async fn start_capture(&mut self, levels: LevelSink) -> CoreResult<()> {
        log(&self.calls, "start");
        if self.failing_starts > 0 {
            self.failing_starts -= 1;
            return Err(CoreError::CaptureFailed {
                reason: "microphone in use".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        levels.push(35);
        Ok(())
    }

    async fn stop_capture(&mut self) -> CoreResult<CapturedAudio> {
        log(&self.calls, "stop");
        Ok(CapturedAudio {
            path: PathBuf::from("/tmp/voxgate/take.wav"),
            duration_ms: 500,
        })
    }

    async fn discard(&mut self, path: &Path) -> CoreResult<()> {
        log(&self.calls, format!("discard {}", path.display()));
        Ok(())
    }

    async fn poll_health(&mut self) -> CoreResult<Option<DeviceFault>> {
        Ok(None)
    }
}

struct FakePipeline {
    calls: CallLog,
}

#[async_trait]
impl Pipeline for FakePipeline {
    async fn transcribe(&self, path: &Path, _context: &DetectedContext) -> CoreResult<String> {
        log(&self.calls, format!("transcribe {}", path.display()));
        Ok("hello world".to_string())
    }

    async fn improve(&self, text: &str, _context: &DetectedContext) -> CoreResult<String> {
        log(&self.calls, format!("improve {text}"));
        Ok(text.to_uppercase())
    }

    async fn deliver(&self, text: &str, context: &DetectedContext) -> CoreResult<()> {
        log(&self.calls, format!("deliver {text} to {context}"));
        Ok(())
    }

    async fn archive(&self, entry: &TranscriptEntry) -> CoreResult<Option<PathBuf>> {
        log(&self.calls, format!("archive {}", entry.text));
        Ok(Some(PathBuf::from("/tmp/voxgate/notes/hello.md")))
    }
}

fn push_to_talk() -> SessionConfig {
    SessionConfig {
        mode: ShortcutMode::PushToTalk,
        ..SessionConfig::default()
    }
}

/// Collect events until (and including) the first one matching `last`.
async fn events_until(
    status: &mut StatusSubscription,
    last: impl Fn(&StatusEvent) -> bool,
) -> Vec<StatusEvent> {
    let mut events = Vec::new();
    while let Ok(Some(event)) = time::timeout(Duration::from_secs(30), status.recv()).await {
        let done = last(&event);
        events.push(event);
        if done {
            break;
        }
    }
    events
}

/// WHAT: A held push-to-talk shortcut runs the whole session and hides
/// WHY: Collaborator calls and bus events must follow the session lifecycle
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_push_to_talk_when_held_500ms_then_transcribed_delivered_and_hidden() {
    // Given: A running runtime with fake collaborators
    let calls = CallLog::default();
    let bus = StatusBus::new(256);
    let mut status = bus.subscribe();
    let (runtime, handle) = SessionRuntime::new(
        push_to_talk(),
        FakeCapture {
            calls: Arc::clone(&calls),
            failing_starts: 0,
        },
        FakePipeline {
            calls: Arc::clone(&calls),
        },
        bus,
    )
    .unwrap();
    let task = tokio::spawn(runtime.run());

    // When: The shortcut is held for 500ms
    handle
        .press(DetectedContext::new("com.example.notes"), Instant::now())
        .await
        .unwrap();
    time::sleep(Duration::from_millis(500)).await;
    handle.release(Instant::now()).await.unwrap();
    let events = events_until(&mut status, |e| *e == StatusEvent::Hide).await;

    // Then: Start, stop, transcription, done and hide were published in order
    let lifecycle: Vec<_> = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                StatusEvent::SessionStarted { .. }
                    | StatusEvent::SessionStopped { .. }
                    | StatusEvent::StageChanged { .. }
                    | StatusEvent::SessionDone
                    | StatusEvent::Hide
            )
        })
        .collect();
    assert_eq!(lifecycle.len(), 5, "{lifecycle:?}");
    assert!(matches!(lifecycle[0], StatusEvent::SessionStarted { .. }));
    assert!(matches!(
        lifecycle[1],
        StatusEvent::SessionStopped { elapsed_ms } if *elapsed_ms >= 500
    ));
    assert_eq!(*lifecycle[3], StatusEvent::SessionDone);

    // And: Collaborators were called in order with the captured context
    let calls = logged(&calls);
    assert_eq!(
        calls[..4],
        [
            "start".to_string(),
            "stop".to_string(),
            "transcribe /tmp/voxgate/take.wav".to_string(),
            "deliver hello world to com.example.notes".to_string(),
        ]
    );

    // And: Once done the transcript was archived and the recording deleted
    let mut after_done = calls[4..].to_vec();
    after_done.sort();
    assert_eq!(
        after_done,
        vec![
            "archive hello world".to_string(),
            "discard /tmp/voxgate/take.wav".to_string(),
        ]
    );

    handle.shutdown().await.unwrap();
    task.await.unwrap().unwrap();
}

/// WHAT: Shutting down mid-recording stops and discards the capture
/// WHY: No recording may be left running or on disk after exit
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_recording_when_shutdown_then_capture_stopped_and_discarded() {
    // Given: A recording in progress
    let calls = CallLog::default();
    let bus = StatusBus::new(256);
    let mut status = bus.subscribe();
    let (runtime, handle) = SessionRuntime::new(
        push_to_talk(),
        FakeCapture {
            calls: Arc::clone(&calls),
            failing_starts: 0,
        },
        FakePipeline {
            calls: Arc::clone(&calls),
        },
        bus,
    )
    .unwrap();
    let task = tokio::spawn(runtime.run());
    handle
        .press(DetectedContext::unknown(), Instant::now())
        .await
        .unwrap();
    time::sleep(Duration::from_millis(200)).await;

    // When: The runtime shuts down
    handle.shutdown().await.unwrap();
    task.await.unwrap().unwrap();

    // Then: The recording was cancelled, stopped and deleted
    let events = status.drain();
    assert!(events.contains(&StatusEvent::SessionCancelled {
        reason: CancelReason::Shutdown
    }));
    assert_eq!(
        logged(&calls),
        vec![
            "start".to_string(),
            "stop".to_string(),
            "discard /tmp/voxgate/take.wav".to_string(),
        ]
    );
}

/// WHAT: A failed start shows a toast and retrying starts capture again
/// WHY: Retry re-invokes the original operation and clears the toast
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_failed_capture_start_when_toast_retried_then_capture_restarted() {
    // Given: A capture whose first start fails
    let calls = CallLog::default();
    let bus = StatusBus::new(256);
    let mut status = bus.subscribe();
    let (runtime, handle) = SessionRuntime::new(
        push_to_talk(),
        FakeCapture {
            calls: Arc::clone(&calls),
            failing_starts: 1,
        },
        FakePipeline {
            calls: Arc::clone(&calls),
        },
        bus,
    )
    .unwrap();
    let mut toasts = handle.toasts();
    let task = tokio::spawn(runtime.run());

    // When: The shortcut is pressed and capture fails
    handle
        .press(DetectedContext::unknown(), Instant::now())
        .await
        .unwrap();
    toasts.changed().await.unwrap();
    let toast = toasts.borrow_and_update().clone();

    // Then: One transient, retryable toast
    assert_eq!(toast.len(), 1);
    let record = toast[0].record().cloned().unwrap();
    assert_eq!(record.code, "capture_start_failed");
    assert_eq!(record.category, ErrorCategory::Transient);
    assert!(record.retryable);
    events_until(&mut status, |e| *e == StatusEvent::Hide).await;

    // When: The user retries
    handle.retry(toast[0].id).await.unwrap();
    let restarted = events_until(&mut status, |e| {
        matches!(e, StatusEvent::SessionStarted { .. })
    })
    .await;
    time::sleep(Duration::from_millis(50)).await;

    // Then: A new session started, capture was invoked again and no toast remains
    assert!(matches!(
        restarted.last(),
        Some(StatusEvent::SessionStarted { .. })
    ));
    assert_eq!(logged(&calls), vec!["start".to_string(), "start".to_string()]);
    assert!(toasts.borrow().is_empty());

    handle.shutdown().await.unwrap();
    task.await.unwrap().unwrap();
}

/// WHAT: Hiding a finished session returns to Idle before the done timeout
/// WHY: Dismissing from the tray must clear the indicator at once
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_done_session_when_hidden_then_hide_published_before_timeout() {
    // Given: A session that has just completed
    let calls = CallLog::default();
    let bus = StatusBus::new(256);
    let mut status = bus.subscribe();
    let (runtime, handle) = SessionRuntime::new(
        push_to_talk(),
        FakeCapture {
            calls: Arc::clone(&calls),
            failing_starts: 0,
        },
        FakePipeline {
            calls: Arc::clone(&calls),
        },
        bus,
    )
    .unwrap();
    let task = tokio::spawn(runtime.run());
    handle
        .press(DetectedContext::unknown(), Instant::now())
        .await
        .unwrap();
    time::sleep(Duration::from_millis(500)).await;
    handle.release(Instant::now()).await.unwrap();
    events_until(&mut status, |e| *e == StatusEvent::SessionDone).await;
    let done_at = Instant::now();

    // When: Hide is requested
    handle.hide().await.unwrap();
    let events = events_until(&mut status, |e| *e == StatusEvent::Hide).await;

    // Then: Hidden well before the 1.5 s done timeout
    assert_eq!(events.last(), Some(&StatusEvent::Hide));
    assert!(done_at.elapsed() < Duration::from_millis(1500));

    handle.shutdown().await.unwrap();
    task.await.unwrap().unwrap();
}
