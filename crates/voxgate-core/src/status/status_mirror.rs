//! Subscriber-side read model for indicator surfaces.
//!
//! A mirror only ever sees bus events. It runs its own hide timers, which are
//! not synchronized with the coordinator's terminal-state timeout: a surface
//! may hide slightly before or after the coordinator returns to `Idle`, and a
//! dropped event can leave it stale until the next one arrives.

use crate::{SessionState, StatusEvent};

use std::time::Duration;

use tokio::time::Instant;

/// What an indicator should currently show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndicatorPhase {
    /// Nothing to show.
    #[default]
    Hidden,
    /// Recording in progress.
    Recording,
    /// Waiting for the pipeline.
    Processing,
    /// Speech-to-text running.
    Transcribing,
    /// Text cleanup running.
    Improving,
    /// Finished successfully.
    Done,
    /// Failed.
    Error,
    /// Discarded.
    Cancelled,
}

/// Per-phase hide delays owned by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HideDelays {
    /// After `SessionDone`.
    pub done: Duration,
    /// After `SessionError`.
    pub error: Duration,
    /// After `SessionCancelled`.
    pub cancelled: Duration,
}

impl Default for HideDelays {
    fn default() -> Self {
        Self {
            done: Duration::from_millis(1500),
            error: Duration::from_secs(3),
            cancelled: Duration::from_secs(1),
        }
    }
}

/// Non-authoritative mirror of the session for one display surface.
#[derive(Debug, Clone, Default)]
pub struct StatusMirror {
    phase: IndicatorPhase,
    level: u8,
    elapsed_ms: u64,
    warning: bool,
    message: Option<String>,
    hide_at: Option<Instant>,
    delays: HideDelays,
}

impl StatusMirror {
    /// Create a hidden mirror with the given hide delays.
    pub fn new(delays: HideDelays) -> Self {
        Self {
            delays,
            ..Self::default()
        }
    }

    /// Apply a bus event. Returns whether the visible phase changed.
    pub fn apply(&mut self, event: &StatusEvent, now: Instant) -> bool {
        let before = self.phase;

        match event {
            StatusEvent::SessionStarted { .. } => {
                *self = Self::new(self.delays);
                self.phase = IndicatorPhase::Recording;
            }
            StatusEvent::AudioLevel { level } => self.level = (*level).min(100),
            StatusEvent::Elapsed { elapsed_ms } => self.elapsed_ms = *elapsed_ms,
            StatusEvent::DurationWarning { .. } => self.warning = true,
            StatusEvent::SessionStopped { elapsed_ms } => {
                self.elapsed_ms = *elapsed_ms;
                self.level = 0;
                self.phase = IndicatorPhase::Processing;
                self.hide_at = None;
            }
            StatusEvent::StageChanged { state } => {
                self.phase = match state {
                    SessionState::Transcribing => IndicatorPhase::Transcribing,
                    SessionState::Improving => IndicatorPhase::Improving,
                    _ => IndicatorPhase::Processing,
                };
                self.hide_at = None;
            }
            StatusEvent::SessionDone => {
                self.phase = IndicatorPhase::Done;
                self.hide_at = Some(now + self.delays.done);
            }
            StatusEvent::SessionError { message } => {
                self.phase = IndicatorPhase::Error;
                self.message = Some(message.clone());
                self.hide_at = Some(now + self.delays.error);
            }
            StatusEvent::SessionCancelled { reason } => {
                self.phase = IndicatorPhase::Cancelled;
                self.message = Some(reason.to_string());
                self.hide_at = Some(now + self.delays.cancelled);
            }
            // Busy is a transient notice; it does not change what is shown.
            StatusEvent::Busy => {}
            // The surface keeps its own hide timer for terminal phases.
            StatusEvent::Hide => {
                if !matches!(
                    self.phase,
                    IndicatorPhase::Done | IndicatorPhase::Error | IndicatorPhase::Cancelled
                ) {
                    self.hide();
                }
            }
        }

        before != self.phase
    }

    /// Run the hide timer. Returns whether the mirror just hid.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.hide_at {
            Some(at) if now >= at => {
                self.hide();
                true
            }
            _ => false,
        }
    }

    /// When the hide timer is due, if armed.
    pub fn next_hide_deadline(&self) -> Option<Instant> {
        self.hide_at
    }

    /// Current phase.
    pub fn phase(&self) -> IndicatorPhase {
        self.phase
    }

    /// Whether anything should be shown.
    pub fn is_visible(&self) -> bool {
        self.phase != IndicatorPhase::Hidden
    }

    /// Last audio level seen.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Last elapsed time seen.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Whether the duration warning has fired for this session.
    pub fn warning(&self) -> bool {
        self.warning
    }

    /// Error or cancel message for terminal phases.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn hide(&mut self) {
        *self = Self::new(self.delays);
    }
}
