//! Voxgate Core Library
//!
//! Session orchestration for shortcut-driven voice capture: a single-session
//! state machine with generation-tagged timers, a debounce gate, a best-effort
//! status broadcast bus and an error/retry center with burst grouping.
//!
//! The [`SessionCoordinator`] is a synchronous value that turns inputs into
//! [`Effect`]s. [`SessionRuntime`] drives it on one tokio task against a
//! [`CaptureDevice`] and a [`Pipeline`].
//!
//! # Example
//!
//! ```no_run
//! use voxgate_core::{
//!     CaptureDevice, CoreResult, DetectedContext, Pipeline, SessionConfig, SessionRuntime,
//!     StatusBus,
//! };
//! use tokio::time::Instant;
//!
//! async fn serve<C: CaptureDevice, P: Pipeline>(capture: C, pipeline: P) -> CoreResult<()> {
//!     let bus = StatusBus::default();
//!     let mut status = bus.subscribe();
//!     let (runtime, handle) = SessionRuntime::new(SessionConfig::default(), capture, pipeline, bus)?;
//!     let task = tokio::spawn(runtime.run());
//!
//!     handle.press(DetectedContext::new("com.example.editor"), Instant::now()).await?;
//!     while let Some(event) = status.recv().await {
//!         println!("{event:?}");
//!     }
//!
//!     handle.shutdown().await?;
//!     let _ = task.await;
//!     Ok(())
//! }
//! ```

mod coordinator;
mod debounce;
mod error;
mod error_center;
mod runtime;
mod session;
mod status;
mod timer;

pub use {
    coordinator::{
        CancelReason, CapturedAudio, Command, DeviceFault, Effect, PipelineSignal, PipelineStage,
        SessionCoordinator, SessionInput, StageJob, StopDisposition, TranscriptEntry,
    },
    debounce::{DEFAULT_DEBOUNCE_WINDOW, DebounceGate, TriggerKind},
    error::{CoreError, Result as CoreResult},
    error_center::{
        BURST_SPAN, BURST_THRESHOLD, BurstStatus, BurstWindow, ErrorCategory, ErrorCenter,
        ErrorRecord, RETRY_BACKOFF, ReportOutcome, RetryAction, RetryDecision, RetryKey,
        RetryLedger, RetryOutcome, RetryState, TRANSIENT_DISPLAY, Toast, ToastId, ToastKind,
        backoff_for_attempt,
    },
    runtime::{
        CaptureDevice, INPUT_QUEUE_CAPACITY, LevelSink, Pipeline, RuntimeHandle, RuntimeInput,
        SessionRuntime,
    },
    session::{
        CANCELLED_DISPLAY_TIMEOUT, DONE_DISPLAY_TIMEOUT, DURATION_TICK, DetectedContext,
        ERROR_DISPLAY_TIMEOUT, HEALTH_POLL_PERIOD, Session, SessionConfig, SessionId,
        SessionState, ShortcutMode, WARNING_LEAD,
    },
    status::{
        DEFAULT_BUS_CAPACITY, HideDelays, IndicatorPhase, LEVEL_INTERVAL, LevelThrottle,
        StatusBus, StatusEvent, StatusMirror, StatusSubscription,
    },
    timer::{Generation, TimerFire, TimerHandle, TimerKind, TimerSchedule, TimerSet},
};

#[cfg(test)]
mod tests;
