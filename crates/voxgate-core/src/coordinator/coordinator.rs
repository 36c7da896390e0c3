//! The session state machine.
//!
//! `SessionCoordinator` is a plain value driven by one event loop turn at a
//! time. Every entry point takes the current instant and returns the
//! [`Effect`]s the turn produced; it never blocks on or calls collaborators
//! itself. Because each turn runs to completion before the next input is
//! dequeued, racing inputs are resolved strictly in delivery order.

use crate::{
    CancelReason, CapturedAudio, Command, CoreResult, DebounceGate, DeviceFault,
    Effect, ErrorCategory, ErrorRecord, Generation, LevelThrottle, PipelineSignal, PipelineStage,
    RetryAction, RetryKey, RetryOutcome, SessionInput, StageJob, StatusEvent, StopDisposition,
    TimerFire, TimerKind, TimerSchedule, TimerSet, TriggerKind,
    session::{
        CANCELLED_DISPLAY_TIMEOUT, DONE_DISPLAY_TIMEOUT, DURATION_TICK, DetectedContext,
        ERROR_DISPLAY_TIMEOUT, HEALTH_POLL_PERIOD, Session, SessionConfig, SessionId,
        SessionState, ShortcutMode,
    },
    TranscriptEntry,
};

use std::{
    mem,
    time::{Duration, SystemTime},
};

use tokio::time::Instant;
use tracing::{debug, info, instrument, trace, warn};

/// Single source of truth for whether a session is active.
#[derive(Debug)]
pub struct SessionCoordinator {
    config: SessionConfig,
    session: Session,
    timers: TimerSet,
    debounce: DebounceGate,
    throttle: LevelThrottle,
    outbox: Vec<Effect>,
}

impl SessionCoordinator {
    /// Create an idle coordinator.
    #[track_caller]
    pub fn new(config: SessionConfig) -> CoreResult<Self> {
        config.validate()?;

        Ok(Self {
            session: Session::idle(config.clone()),
            config,
            timers: TimerSet::new(),
            debounce: DebounceGate::default(),
            throttle: LevelThrottle::default(),
            outbox: Vec::new(),
        })
    }

    /// Replace the configuration. The running session keeps its snapshot;
    /// the new settings apply from the next session start.
    #[track_caller]
    pub fn update_config(&mut self, config: SessionConfig) -> CoreResult<()> {
        config.validate()?;
        info!(mode = %config.mode, max_duration_secs = config.max_duration.as_secs(), "Session config updated");
        self.config = config;
        Ok(())
    }

    /// Configuration the next session will snapshot.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Read-only view of the current session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current timer generation.
    pub fn generation(&self) -> Generation {
        self.timers.generation()
    }

    /// Earliest armed timer deadline; the event loop sleeps until then and
    /// calls [`fire_due`](Self::fire_due).
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Process one input.
    ///
    /// Shortcut edges are timed from the instant they carry rather than
    /// from `now`, so hold times and deadlines follow the physical key.
    #[instrument(skip_all, fields(state = %self.session.state()))]
    pub fn handle(&mut self, input: SessionInput, now: Instant) -> Vec<Effect> {
        match input {
            SessionInput::ShortcutPressed { context, at } => self.on_pressed(context, at),
            SessionInput::ShortcutReleased { at } => self.on_released(at),
            SessionInput::ShortcutCancelled { reason } => {
                if self.session.state == SessionState::Recording {
                    self.cancel(CancelReason::Shortcut(reason), now);
                } else {
                    debug!(reason = %reason, "Shortcut cancel ignored, not recording");
                }
            }
            SessionInput::ShortcutBusy => {
                debug!("Shortcut source busy");
                self.publish(StatusEvent::Busy);
            }
            SessionInput::PermissionRequired { detail } => {
                let record = ErrorRecord::new(
                    "permission_required",
                    format!("Permission required: {detail}"),
                    ErrorCategory::Permission,
                    "shortcut",
                );
                self.outbox.push(Effect::Raise(record));
            }
            SessionInput::EscapePressed => {
                if self.session.state == SessionState::Recording
                    && self.session.mode() == ShortcutMode::Toggle
                {
                    self.cancel(CancelReason::Escape, now);
                } else {
                    trace!("Escape ignored");
                }
            }
            SessionInput::Hide => {
                if self.session.state.is_terminal() {
                    self.reset_to_idle();
                }
            }
            SessionInput::CaptureStarted { session_id, result } => {
                self.on_capture_started(session_id, result);
            }
            SessionInput::CaptureStopped {
                session_id,
                disposition,
                result,
            } => self.on_capture_stopped(session_id, disposition, result, now),
            SessionInput::AudioLevel { session_id, level } => {
                if session_id == self.session.id()
                    && self.session.state == SessionState::Recording
                {
                    let level = level.min(100);
                    self.session.audio_level = Some(level);
                    if self.throttle.admit(now) {
                        self.publish(StatusEvent::AudioLevel { level });
                    }
                }
            }
            SessionInput::HealthReport {
                session_id,
                generation,
                result,
            } => self.on_health(session_id, generation, result, now),
            SessionInput::Archived { session_id, result } => match result {
                Ok(Some(path)) => {
                    info!(session_id = %session_id, path = %path.display(), "Transcript archived");
                }
                Ok(None) => trace!(session_id = %session_id, "Archiving disabled"),
                Err(error) => {
                    warn!(session_id = %session_id, error = %error, "Transcript not archived");
                    let record = ErrorRecord::from_core(
                        "archive_failed",
                        ErrorCategory::UserAction,
                        "archive",
                        &error,
                    );
                    self.outbox.push(Effect::Raise(record));
                }
            },
            SessionInput::Pipeline { session_id, signal } => {
                if session_id == self.session.id() {
                    self.on_pipeline(signal, now);
                } else {
                    debug!(session_id = %session_id, "Pipeline report for superseded session ignored");
                }
            }
        }

        mem::take(&mut self.outbox)
    }

    /// Run every timer due at `now`.
    ///
    /// Fires are handled one at a time and each is checked against the live
    /// generation first, so a transition caused by an earlier fire in the
    /// same batch invalidates the rest.
    pub fn fire_due(&mut self, now: Instant) -> Vec<Effect> {
        for fire in self.timers.take_due(now) {
            if !self.timers.is_current(&fire) {
                trace!(timer = %fire.kind, generation = %fire.generation, "Stale timer fire dropped");
                continue;
            }
            self.on_timer(fire, now);
        }

        mem::take(&mut self.outbox)
    }

    /// Run a retry action scheduled by the error subsystem.
    ///
    /// The outcome comes back as an [`Effect::RetrySettled`], either in this
    /// turn (abandoned because a session is busy) or once the re-run
    /// operation succeeds or fails.
    #[instrument(skip(self, action), fields(state = %self.session.state()))]
    pub fn resume(&mut self, key: RetryKey, action: RetryAction, now: Instant) -> Vec<Effect> {
        match action {
            RetryAction::StartCapture { context } => {
                if self.session.state == SessionState::Idle {
                    info!("Retrying capture start");
                    self.start(context, now, Some(key));
                } else {
                    self.reject_retry(key);
                }
            }
            RetryAction::RunStage { job } => {
                if matches!(self.session.state, SessionState::Idle | SessionState::Error) {
                    self.resume_stage(job, key);
                } else {
                    self.reject_retry(key);
                }
            }
        }

        mem::take(&mut self.outbox)
    }

    /// Cancel a recording in progress before the process exits.
    pub fn shutdown(&mut self, now: Instant) -> Vec<Effect> {
        if self.session.state == SessionState::Recording {
            self.cancel(CancelReason::Shutdown, now);
        }

        mem::take(&mut self.outbox)
    }

    fn on_pressed(&mut self, context: DetectedContext, now: Instant) {
        match self.session.state {
            SessionState::Idle => {
                if self.config.mode == ShortcutMode::Toggle
                    && !self.debounce.accept(TriggerKind::Toggle, now)
                {
                    return;
                }
                self.start(context, now, None);
            }
            SessionState::Recording => match self.session.mode() {
                ShortcutMode::Toggle => {
                    if self.debounce.accept(TriggerKind::Toggle, now) {
                        self.stop(now);
                    }
                }
                // Key auto-repeat while held.
                ShortcutMode::PushToTalk => trace!("Press ignored while holding"),
            },
            state => {
                info!(state = %state, "Start trigger while busy");
                self.publish(StatusEvent::Busy);
            }
        }
    }

    fn on_released(&mut self, now: Instant) {
        if self.session.state != SessionState::Recording
            || self.session.mode() != ShortcutMode::PushToTalk
        {
            return;
        }

        let held = self.session.held_for(now);
        if held < self.session.config().min_hold {
            debug!(held_ms = held.as_millis(), "Released before minimum hold");
            self.cancel(CancelReason::TooShort, now);
        } else {
            self.stop(now);
        }
    }

    fn on_capture_started(&mut self, session_id: SessionId, result: CoreResult<()>) {
        if session_id != self.session.id() {
            debug!(session_id = %session_id, "Capture start report for superseded session ignored");
            return;
        }

        match result {
            Ok(()) => {
                debug!(session_id = %session_id, "Capture started");
                self.settle_success("capture");
            }
            Err(error) => {
                warn!(session_id = %session_id, error = %error, "Capture failed to start");
                let record = ErrorRecord::from_core(
                    "capture_start_failed",
                    ErrorCategory::Transient,
                    "capture",
                    &error,
                )
                .with_retry(RetryAction::StartCapture {
                    context: self.session.detected_context().clone(),
                });

                // A stop already issued for this capture fails as well;
                // resetting makes its report stale so the fault is raised once.
                if matches!(
                    self.session.state,
                    SessionState::Recording | SessionState::Processing
                ) {
                    self.publish(StatusEvent::SessionError {
                        message: record.message.clone(),
                    });
                    self.settle_or_raise(record);
                    self.reset_to_idle();
                } else {
                    self.settle_or_raise(record);
                }
            }
        }
    }

    fn on_capture_stopped(
        &mut self,
        session_id: SessionId,
        disposition: StopDisposition,
        result: CoreResult<CapturedAudio>,
        now: Instant,
    ) {
        if disposition == StopDisposition::Discard {
            match result {
                Ok(audio) => debug!(path = %audio.path.display(), "Recording discarded"),
                Err(error) => debug!(error = %error, "Capture stop before discard failed"),
            }
            return;
        }

        if session_id != self.session.id() || self.session.state != SessionState::Processing {
            debug!(session_id = %session_id, "Capture stop report for superseded session ignored");
            return;
        }

        match result {
            Ok(audio) => {
                info!(
                    session_id = %session_id,
                    duration_ms = audio.duration_ms,
                    path = %audio.path.display(),
                    "Recording captured"
                );
                let job = StageJob::Transcription {
                    path: audio.path.clone(),
                    context: self.session.detected_context().clone(),
                };
                self.session.recording = Some(audio.path.clone());
                self.session.audio = Some(audio);
                self.begin_stage(job);
            }
            Err(error) => {
                let record = ErrorRecord::from_core(
                    "capture_stop_failed",
                    ErrorCategory::Fatal,
                    "capture",
                    &error,
                );
                self.fail(record, now);
            }
        }
    }

    fn on_health(
        &mut self,
        session_id: SessionId,
        generation: Generation,
        result: CoreResult<Option<DeviceFault>>,
        now: Instant,
    ) {
        if session_id != self.session.id()
            || generation != self.timers.generation()
            || self.session.state != SessionState::Recording
        {
            trace!(generation = %generation, "Stale health report dropped");
            return;
        }

        match result {
            Ok(None) => {}
            Ok(Some(fault)) => {
                warn!(session_id = %session_id, reason = %fault.reason, "Capture device fault");
                let context = self.session.detected_context().clone();
                self.cancel(CancelReason::DeviceFault(fault.reason.clone()), now);
                let record = ErrorRecord::new(
                    "capture_device_fault",
                    format!("Recording stopped: {}", fault.reason),
                    ErrorCategory::Transient,
                    "capture",
                )
                .with_retry(RetryAction::StartCapture { context });
                self.outbox.push(Effect::Raise(record));
            }
            Err(error) => warn!(error = %error, "Health poll failed"),
        }
    }

    fn on_pipeline(&mut self, signal: PipelineSignal, now: Instant) {
        let state = self.session.state;

        match signal {
            PipelineSignal::StageStarted(PipelineStage::Transcription) => {
                if state == SessionState::Processing {
                    self.enter(SessionState::Transcribing);
                }
            }
            PipelineSignal::StageStarted(PipelineStage::Improvement) => {
                let improving = matches!(self.session.stage_job, Some(StageJob::Improvement { .. }));
                if state == SessionState::Transcribing && improving {
                    self.enter(SessionState::Improving);
                }
            }
            PipelineSignal::StageStarted(PipelineStage::Delivery) => {
                debug!("Delivery started");
            }
            PipelineSignal::StageOutput { stage, text } => {
                let context = self.session.detected_context().clone();
                let next = match (stage, state) {
                    (PipelineStage::Transcription, SessionState::Transcribing) => {
                        self.session.transcript = Some(text.clone());
                        if self.session.config().improvement_enabled {
                            Some(StageJob::Improvement { text, context })
                        } else {
                            Some(StageJob::Delivery { text, context })
                        }
                    }
                    (PipelineStage::Improvement, SessionState::Improving) => {
                        Some(StageJob::Delivery { text, context })
                    }
                    _ => None,
                };

                match next {
                    Some(job) => {
                        self.settle_success(stage.component());
                        self.begin_stage(job);
                    }
                    None => debug!(stage = %stage, state = %state, "Unexpected stage output ignored"),
                }
            }
            PipelineSignal::Complete { text } => {
                if matches!(state, SessionState::Transcribing | SessionState::Improving) {
                    info!(
                        session_id = %self.session.id(),
                        chars = text.chars().count(),
                        "Session complete"
                    );
                    self.settle_success(PipelineStage::Delivery.component());
                    self.enter(SessionState::Done);
                    self.publish(StatusEvent::SessionDone);
                    self.timers.arm(
                        TimerKind::DisplayTimeout,
                        TimerSchedule::Once(DONE_DISPLAY_TIMEOUT),
                        now,
                    );
                    self.release_recording();

                    let entry = TranscriptEntry {
                        original: self.session.transcript.take().filter(|raw| *raw != text),
                        text,
                        context: self.session.detected_context().clone(),
                        duration_ms: self.session.audio().map_or(0, |audio| audio.duration_ms),
                        recorded_at: self.session.recorded_at(),
                    };
                    self.invoke(Command::Archive {
                        session_id: self.session.id(),
                        entry,
                    });
                } else {
                    debug!(state = %state, "Completion ignored");
                }
            }
            PipelineSignal::Failed { stage, message } => {
                if !state.is_pipeline() {
                    debug!(stage = %stage, state = %state, "Stage failure ignored");
                    return;
                }

                let mut record = ErrorRecord::new(
                    format!("{}_failed", stage.component()),
                    message.clone(),
                    ErrorCategory::Transient,
                    stage.component(),
                )
                .with_details(format!("{stage} failed: {message}"));

                if let Some(job) = self
                    .session
                    .stage_job
                    .clone()
                    .filter(|job| job.stage() == stage)
                {
                    record = record.with_retry(RetryAction::RunStage { job });
                }

                self.fail(record, now);
            }
        }
    }

    fn on_timer(&mut self, fire: TimerFire, now: Instant) {
        match fire.kind {
            TimerKind::DurationTicker => {
                let elapsed = self.session.held_for(now);
                self.session.elapsed = elapsed;
                self.publish(StatusEvent::Elapsed {
                    elapsed_ms: millis(elapsed),
                });
            }
            TimerKind::Warning => {
                let remaining = self
                    .session
                    .config()
                    .max_duration
                    .saturating_sub(self.session.held_for(now));
                info!(remaining_secs = remaining.as_secs(), "Maximum duration approaching");
                self.publish(StatusEvent::DurationWarning {
                    remaining_ms: millis(remaining),
                });
            }
            TimerKind::MaxDuration => {
                info!(session_id = %self.session.id(), "Maximum duration reached, stopping");
                self.stop(now);
            }
            TimerKind::HealthPoll => self.invoke(Command::PollHealth {
                session_id: self.session.id(),
                generation: fire.generation,
            }),
            TimerKind::DisplayTimeout => {
                if self.session.state.is_terminal() {
                    self.reset_to_idle();
                }
            }
        }
    }

    fn start(&mut self, context: DetectedContext, now: Instant, retry: Option<RetryKey>) {
        self.timers.disarm_all();
        self.throttle.reset();
        self.session = Session::recording(self.config.clone(), context, now);
        self.session.pending_retry = retry;

        let config = self.session.config();
        self.timers.arm(
            TimerKind::DurationTicker,
            TimerSchedule::Every(DURATION_TICK),
            now,
        );
        self.timers.arm(
            TimerKind::Warning,
            TimerSchedule::Once(config.warning_after()),
            now,
        );
        self.timers.arm(
            TimerKind::MaxDuration,
            TimerSchedule::Once(config.max_duration),
            now,
        );
        self.timers.arm(
            TimerKind::HealthPoll,
            TimerSchedule::Every(HEALTH_POLL_PERIOD),
            now,
        );

        let session_id = self.session.id();
        info!(
            session_id = %session_id,
            mode = %self.session.mode(),
            context = %self.session.detected_context(),
            generation = %self.timers.generation(),
            "Recording started"
        );

        self.publish(StatusEvent::SessionStarted {
            session_id,
            mode: self.session.mode(),
            timestamp: SystemTime::now(),
        });
        self.invoke(Command::StartCapture { session_id });
    }

    fn stop(&mut self, now: Instant) {
        let elapsed = self.session.held_for(now);
        self.timers.disarm_all();
        self.session.elapsed = elapsed;
        self.session.audio_level = None;
        self.session.state = SessionState::Processing;

        info!(
            session_id = %self.session.id(),
            elapsed_ms = millis(elapsed),
            "Recording stopped"
        );

        self.invoke(Command::StopCapture {
            session_id: self.session.id(),
            disposition: StopDisposition::Keep,
        });
        self.publish(StatusEvent::SessionStopped {
            elapsed_ms: millis(elapsed),
        });
    }

    fn cancel(&mut self, reason: CancelReason, now: Instant) {
        self.timers.disarm_all();
        self.session.elapsed = self.session.held_for(now);
        self.session.audio_level = None;
        self.session.state = SessionState::Cancelled;

        info!(session_id = %self.session.id(), reason = %reason, "Recording cancelled");

        self.invoke(Command::StopCapture {
            session_id: self.session.id(),
            disposition: StopDisposition::Discard,
        });
        self.publish(StatusEvent::SessionCancelled { reason });
        self.timers.arm(
            TimerKind::DisplayTimeout,
            TimerSchedule::Once(CANCELLED_DISPLAY_TIMEOUT),
            now,
        );
    }

    fn fail(&mut self, record: ErrorRecord, now: Instant) {
        self.timers.disarm_all();
        self.session.state = SessionState::Error;
        self.session.error = Some(record.clone());

        let retry_needs_audio = matches!(
            record.retry_action,
            Some(RetryAction::RunStage {
                job: StageJob::Transcription { .. }
            })
        );
        if !retry_needs_audio {
            self.release_recording();
        }

        warn!(
            session_id = %self.session.id(),
            code = %record.code,
            "Session failed"
        );

        self.publish(StatusEvent::SessionError {
            message: record.message.clone(),
        });
        self.settle_or_raise(record);
        self.timers.arm(
            TimerKind::DisplayTimeout,
            TimerSchedule::Once(ERROR_DISPLAY_TIMEOUT),
            now,
        );
    }

    fn resume_stage(&mut self, job: StageJob, key: RetryKey) {
        self.timers.disarm_all();
        self.session = Session::resumed(self.config.clone(), &job);
        self.session.pending_retry = Some(key);

        info!(
            session_id = %self.session.id(),
            stage = %job.stage(),
            "Retrying pipeline stage"
        );

        self.publish(StatusEvent::StageChanged {
            state: self.session.state,
        });
        self.invoke(Command::BeginStage {
            session_id: self.session.id(),
            job,
        });
    }

    fn begin_stage(&mut self, job: StageJob) {
        debug!(session_id = %self.session.id(), stage = %job.stage(), "Beginning stage");
        self.session.stage_job = Some(job.clone());
        self.invoke(Command::BeginStage {
            session_id: self.session.id(),
            job,
        });
    }

    fn reset_to_idle(&mut self) {
        self.timers.disarm_all();

        if let Some(key) = self.session.pending_retry.take() {
            self.outbox.push(Effect::RetrySettled {
                key,
                outcome: RetryOutcome::Abandoned,
            });
        }

        debug!(session_id = %self.session.id(), from = %self.session.state, "Session reset");
        self.session = Session::idle(self.config.clone());
        self.publish(StatusEvent::Hide);
    }

    /// In privacy mode, delete the session's recording.
    fn release_recording(&mut self) {
        if !self.session.config().privacy_mode {
            return;
        }

        if let Some(path) = self.session.recording.take() {
            debug!(session_id = %self.session.id(), path = %path.display(), "Deleting processed recording");
            self.invoke(Command::DiscardRecording { path });
        }
    }

    fn reject_retry(&mut self, key: RetryKey) {
        info!(key = %key, state = %self.session.state, "Retry rejected, session busy");
        self.publish(StatusEvent::Busy);
        self.outbox.push(Effect::RetrySettled {
            key,
            outcome: RetryOutcome::Abandoned,
        });
    }

    fn enter(&mut self, state: SessionState) {
        debug!(session_id = %self.session.id(), from = %self.session.state, to = %state, "Transition");
        self.session.state = state;
        if state.is_pipeline() {
            self.publish(StatusEvent::StageChanged { state });
        }
    }

    /// A retried operation for `component` succeeded.
    fn settle_success(&mut self, component: &str) {
        let Some(key) = self
            .session
            .pending_retry
            .take_if(|key| key.component == component)
        else {
            return;
        };
        self.outbox.push(Effect::RetrySettled {
            key,
            outcome: RetryOutcome::Succeeded,
        });
    }

    /// Report `record`, as the outcome of a pending retry for the same
    /// component if there is one.
    fn settle_or_raise(&mut self, record: ErrorRecord) {
        match self
            .session
            .pending_retry
            .take_if(|key| key.component == record.component)
        {
            Some(key) => self.outbox.push(Effect::RetrySettled {
                key,
                outcome: RetryOutcome::Failed(record),
            }),
            None => self.outbox.push(Effect::Raise(record)),
        }
    }

    fn publish(&mut self, event: StatusEvent) {
        self.outbox.push(Effect::Publish(event));
    }

    fn invoke(&mut self, command: Command) {
        self.outbox.push(Effect::Invoke(command));
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
