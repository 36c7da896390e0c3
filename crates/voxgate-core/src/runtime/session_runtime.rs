//! Single-task event loop around the coordinator and the error center.
//!
//! All coordinator and error-center mutation happens on the task running
//! [`SessionRuntime::run`]. Collaborator calls happen elsewhere (the capture
//! worker and per-stage tasks) and come back as [`RuntimeInput`] messages.

use crate::{
    CaptureDevice, Command, CoreError, CoreResult, Effect, ErrorCategory, ErrorCenter,
    ErrorRecord, LevelSink, Pipeline, PipelineSignal, RetryDecision, RuntimeInput, SessionConfig,
    SessionCoordinator, SessionInput, StageJob, StatusBus, StatusEvent, StopDisposition, Toast,
    ToastId, TranscriptEntry,
    session::{DetectedContext, SessionId},
};

use std::{future, panic::Location, sync::Arc};

use error_location::ErrorLocation;
use tokio::{
    sync::{mpsc, watch},
    time::{self, Instant},
};
use tracing::{debug, error, info, instrument, warn};

/// Messages buffered for the runtime loop before senders wait.
pub const INPUT_QUEUE_CAPACITY: usize = 256;

/// Drives one [`SessionCoordinator`] against real collaborators.
pub struct SessionRuntime<C, P> {
    coordinator: SessionCoordinator,
    errors: ErrorCenter,
    bus: StatusBus,
    capture: Option<C>,
    capture_tx: Option<mpsc::UnboundedSender<Command>>,
    pipeline: Arc<P>,
    input_tx: mpsc::Sender<RuntimeInput>,
    input_rx: mpsc::Receiver<RuntimeInput>,
    toasts_tx: watch::Sender<Vec<Toast>>,
}

impl<C, P> SessionRuntime<C, P>
where
    C: CaptureDevice,
    P: Pipeline,
{
    /// Build a runtime and the handle used to feed it.
    #[track_caller]
    pub fn new(
        config: SessionConfig,
        capture: C,
        pipeline: P,
        bus: StatusBus,
    ) -> CoreResult<(Self, RuntimeHandle)> {
        let coordinator = SessionCoordinator::new(config)?;
        let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);
        let (toasts_tx, toasts_rx) = watch::channel(Vec::new());

        let handle = RuntimeHandle {
            tx: input_tx.clone(),
            toasts: toasts_rx,
            bus: bus.clone(),
        };

        let runtime = Self {
            coordinator,
            errors: ErrorCenter::new(),
            bus,
            capture: Some(capture),
            capture_tx: None,
            pipeline: Arc::new(pipeline),
            input_tx,
            input_rx,
            toasts_tx,
        };

        Ok((runtime, handle))
    }

    /// Run until [`RuntimeHandle::shutdown`] is called.
    #[instrument(skip(self))]
    pub async fn run(mut self) -> CoreResult<()> {
        let capture = self.capture.take().ok_or_else(|| CoreError::ChannelClosed {
            message: "session runtime already started".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let (capture_tx, capture_rx) = mpsc::unbounded_channel();
        self.capture_tx = Some(capture_tx);
        let worker = tokio::spawn(capture_worker(capture, capture_rx, self.input_tx.clone()));

        info!("Session runtime started");

        loop {
            let deadline = [self.coordinator.next_deadline(), self.errors.next_deadline()]
                .into_iter()
                .flatten()
                .min();

            tokio::select! {
                input = self.input_rx.recv() => match input {
                    Some(RuntimeInput::Shutdown) | None => break,
                    Some(input) => self.dispatch(input),
                },
                () = sleep_until(deadline) => self.on_deadline(),
            }
        }

        self.shutdown();

        // Closing the queue lets the worker finish the stop issued above.
        self.capture_tx = None;
        if let Err(e) = worker.await {
            error!(error = ?e, "Capture worker task failed");
        }

        info!("Session runtime stopped");
        Ok(())
    }

    fn dispatch(&mut self, input: RuntimeInput) {
        let now = Instant::now();

        match input {
            RuntimeInput::Session(input) => {
                let effects = self.coordinator.handle(input, now);
                self.apply(effects, now);
            }
            RuntimeInput::Retry(id) => self.schedule_retry(id, now),
            RuntimeInput::RetryDue { key, action } => {
                let effects = self.coordinator.resume(key, action, now);
                self.apply(effects, now);
            }
            RuntimeInput::Dismiss(id) => {
                if self.errors.dismiss(id) {
                    self.publish_toasts();
                }
            }
            RuntimeInput::UpdateConfig(config) => {
                if let Err(e) = self.coordinator.update_config(config) {
                    let record = ErrorRecord::from_core(
                        "invalid_config",
                        ErrorCategory::UserAction,
                        "config",
                        &e,
                    );
                    self.errors.report(record, now);
                    self.publish_toasts();
                }
            }
            RuntimeInput::Shutdown => {}
        }
    }

    fn on_deadline(&mut self) {
        let now = Instant::now();

        let effects = self.coordinator.fire_due(now);
        self.apply(effects, now);

        if self.errors.expire(now) {
            self.publish_toasts();
        }
    }

    fn apply(&mut self, effects: Vec<Effect>, now: Instant) {
        let mut toasts_changed = false;

        for effect in effects {
            match effect {
                Effect::Invoke(Command::BeginStage { session_id, job }) => {
                    self.spawn_stage(session_id, job);
                }
                Effect::Invoke(Command::Archive { session_id, entry }) => {
                    self.spawn_archive(session_id, entry);
                }
                Effect::Invoke(command) => self.send_capture(command),
                Effect::Publish(event) => {
                    self.bus.publish(event);
                }
                Effect::Raise(record) => {
                    self.errors.report(record, now);
                    toasts_changed = true;
                }
                Effect::RetrySettled { key, outcome } => {
                    self.errors.settle(&key, outcome, now);
                    toasts_changed = true;
                }
            }
        }

        if toasts_changed {
            self.publish_toasts();
        }
    }

    fn schedule_retry(&mut self, id: ToastId, now: Instant) {
        let Some(record) = self.errors.toast(id).and_then(Toast::record).cloned() else {
            debug!(toast = %id, "Retry requested for unknown or grouped toast");
            return;
        };

        match self.errors.retry(&record) {
            RetryDecision::Scheduled {
                key, delay, action, ..
            } => {
                self.errors.dismiss(id);
                self.publish_toasts();

                if delay.is_zero() {
                    let effects = self.coordinator.resume(key, action, now);
                    self.apply(effects, now);
                } else {
                    let tx = self.input_tx.clone();
                    tokio::spawn(async move {
                        time::sleep(delay).await;
                        if tx.send(RuntimeInput::RetryDue { key, action }).await.is_err() {
                            debug!("Runtime stopped before retry was due");
                        }
                    });
                }
            }
            RetryDecision::AlreadyInFlight | RetryDecision::NotRetryable => {}
        }
    }

    fn send_capture(&self, command: Command) {
        let Some(tx) = &self.capture_tx else {
            warn!(command = ?command, "Capture worker not running, command dropped");
            return;
        };

        if let Err(e) = tx.send(command) {
            error!(command = ?e.0, "Capture worker gone, command dropped");
        }
    }

    fn spawn_stage(&self, session_id: SessionId, job: StageJob) {
        let pipeline = Arc::clone(&self.pipeline);
        let tx = self.input_tx.clone();

        tokio::spawn(async move {
            let stage = job.stage();
            let report = move |signal| RuntimeInput::Session(SessionInput::Pipeline { session_id, signal });

            if tx
                .send(report(PipelineSignal::StageStarted(stage)))
                .await
                .is_err()
            {
                return;
            }

            let signal = run_stage(pipeline.as_ref(), job).await;

            if tx.send(report(signal)).await.is_err() {
                debug!(session_id = %session_id, stage = %stage, "Runtime stopped before stage report");
            }
        });
    }

    fn spawn_archive(&self, session_id: SessionId, entry: TranscriptEntry) {
        let pipeline = Arc::clone(&self.pipeline);
        let tx = self.input_tx.clone();

        tokio::spawn(async move {
            let result = pipeline.archive(&entry).await;
            let report = RuntimeInput::Session(SessionInput::Archived { session_id, result });

            if tx.send(report).await.is_err() {
                debug!(session_id = %session_id, "Runtime stopped before archive report");
            }
        });
    }

    fn shutdown(&mut self) {
        let now = Instant::now();
        let effects = self.coordinator.shutdown(now);
        self.apply(effects, now);
    }

    fn publish_toasts(&self) {
        self.toasts_tx.send_replace(self.errors.visible().to_vec());
    }
}

async fn run_stage<P: Pipeline>(pipeline: &P, job: StageJob) -> PipelineSignal {
    let stage = job.stage();
    let failed = |e: CoreError| PipelineSignal::Failed {
        stage,
        message: e.reason().to_string(),
    };

    match job {
        StageJob::Transcription { path, context } => {
            match pipeline.transcribe(&path, &context).await {
                Ok(text) => PipelineSignal::StageOutput { stage, text },
                Err(e) => failed(e),
            }
        }
        StageJob::Improvement { text, context } => match pipeline.improve(&text, &context).await {
            Ok(text) => PipelineSignal::StageOutput { stage, text },
            Err(e) => failed(e),
        },
        StageJob::Delivery { text, context } => match pipeline.deliver(&text, &context).await {
            Ok(()) => PipelineSignal::Complete { text },
            Err(e) => failed(e),
        },
    }
}

/// Executes capture commands one at a time, in issue order.
async fn capture_worker<C: CaptureDevice>(
    mut capture: C,
    mut commands: mpsc::UnboundedReceiver<Command>,
    tx: mpsc::Sender<RuntimeInput>,
) {
    while let Some(command) = commands.recv().await {
        let report = match command {
            Command::StartCapture { session_id } => {
                let levels = LevelSink::new(session_id, tx.clone());
                let result = capture.start_capture(levels).await;
                Some(SessionInput::CaptureStarted { session_id, result })
            }
            Command::StopCapture {
                session_id,
                disposition,
            } => {
                let result = capture.stop_capture().await;

                if let (StopDisposition::Discard, Ok(audio)) = (disposition, &result) {
                    if let Err(e) = capture.discard(&audio.path).await {
                        warn!(path = %audio.path.display(), error = %e, "Failed to discard recording");
                    }
                }

                Some(SessionInput::CaptureStopped {
                    session_id,
                    disposition,
                    result,
                })
            }
            Command::PollHealth {
                session_id,
                generation,
            } => {
                let result = capture.poll_health().await;
                Some(SessionInput::HealthReport {
                    session_id,
                    generation,
                    result,
                })
            }
            Command::DiscardRecording { path } => {
                if let Err(e) = capture.discard(&path).await {
                    warn!(path = %path.display(), error = %e, "Failed to delete recording");
                }
                None
            }
            Command::BeginStage { .. } | Command::Archive { .. } => None,
        };

        if let Some(report) = report {
            if tx.send(RuntimeInput::Session(report)).await.is_err() {
                debug!("Runtime stopped, capture report dropped");
            }
        }
    }

    debug!("Capture worker stopped");
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => future::pending().await,
    }
}

/// Cloneable front door to a running [`SessionRuntime`].
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    tx: mpsc::Sender<RuntimeInput>,
    toasts: watch::Receiver<Vec<Toast>>,
    bus: StatusBus,
}

impl RuntimeHandle {
    /// Queue an input for the runtime.
    pub async fn send(&self, input: impl Into<RuntimeInput>) -> CoreResult<()> {
        self.tx
            .send(input.into())
            .await
            .map_err(|e| CoreError::ChannelClosed {
                message: format!("session runtime stopped: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    /// Shortcut pressed at `at` with the given foreground context.
    pub async fn press(&self, context: DetectedContext, at: Instant) -> CoreResult<()> {
        self.send(SessionInput::ShortcutPressed { context, at }).await
    }

    /// Shortcut released at `at`.
    pub async fn release(&self, at: Instant) -> CoreResult<()> {
        self.send(SessionInput::ShortcutReleased { at }).await
    }

    /// Shortcut press dropped because the pipeline is still busy.
    pub async fn busy(&self) -> CoreResult<()> {
        self.send(SessionInput::ShortcutBusy).await
    }

    /// Shortcut gesture abandoned while recording.
    pub async fn cancel_shortcut(&self, reason: impl Into<String>) -> CoreResult<()> {
        self.send(SessionInput::ShortcutCancelled {
            reason: reason.into(),
        })
        .await
    }

    /// The global shortcut could not be registered.
    pub async fn permission_required(&self, detail: impl Into<String>) -> CoreResult<()> {
        self.send(SessionInput::PermissionRequired {
            detail: detail.into(),
        })
        .await
    }

    /// Escape pressed.
    pub async fn escape(&self) -> CoreResult<()> {
        self.send(SessionInput::EscapePressed).await
    }

    /// Hide a finished session now.
    pub async fn hide(&self) -> CoreResult<()> {
        self.send(SessionInput::Hide).await
    }

    /// Retry the error shown in `toast`.
    pub async fn retry(&self, toast: ToastId) -> CoreResult<()> {
        self.send(RuntimeInput::Retry(toast)).await
    }

    /// Dismiss `toast`.
    pub async fn dismiss(&self, toast: ToastId) -> CoreResult<()> {
        self.send(RuntimeInput::Dismiss(toast)).await
    }

    /// Apply new settings from the next session on.
    pub async fn update_config(&self, config: SessionConfig) -> CoreResult<()> {
        self.send(RuntimeInput::UpdateConfig(config)).await
    }

    /// Stop the runtime, cancelling any recording.
    pub async fn shutdown(&self) -> CoreResult<()> {
        self.send(RuntimeInput::Shutdown).await
    }

    /// Watch the visible toasts.
    pub fn toasts(&self) -> watch::Receiver<Vec<Toast>> {
        self.toasts.clone()
    }

    /// The status bus the runtime publishes on.
    pub fn bus(&self) -> &StatusBus {
        &self.bus
    }

    /// Publish directly on the status bus (for surfaces' own notices).
    pub fn publish(&self, event: StatusEvent) -> usize {
        self.bus.publish(event)
    }
}
