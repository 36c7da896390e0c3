//! Bridges the status bus to the tray on the UI thread.
//!
//! Keeps a [`StatusMirror`], renders it into an icon state and status line,
//! and only wakes the UI thread when either changes.

use crate::{AppError, AppResult, TrayIconState, UiCommand, notifier};

use std::panic::Location;

use error_location::ErrorLocation;
use tao::event_loop::EventLoopProxy;
use tokio::{
    sync::watch,
    time::{self, Instant},
};
use tracing::{debug, info, instrument};
use voxgate_core::{
    HideDelays, IndicatorPhase, StatusEvent, StatusMirror, StatusSubscription,
};

/// Status menu line for the mirror's current phase.
pub(crate) fn status_line(mirror: &StatusMirror) -> String {
    match mirror.phase() {
        IndicatorPhase::Hidden => "Ready".to_string(),
        IndicatorPhase::Recording => {
            let secs = mirror.elapsed_ms() / 1000;
            let line = format!("Recording {}:{:02}", secs / 60, secs % 60);
            if mirror.warning() {
                format!("{line} (stopping soon)")
            } else {
                line
            }
        }
        IndicatorPhase::Processing => "Processing...".to_string(),
        IndicatorPhase::Transcribing => "Transcribing...".to_string(),
        IndicatorPhase::Improving => "Improving...".to_string(),
        IndicatorPhase::Done => "Done".to_string(),
        IndicatorPhase::Error => mirror.message().unwrap_or("Error").to_string(),
        IndicatorPhase::Cancelled => match mirror.message() {
            Some(reason) => format!("Cancelled: {reason}"),
            None => "Cancelled".to_string(),
        },
    }
}

/// Escape is live only while a session records. Toggle sessions cancel on
/// it directly; push-to-talk holds abandon the gesture.
pub(crate) fn escape_armed(phase: IndicatorPhase) -> bool {
    phase == IndicatorPhase::Recording
}

/// Forwards rendered status to the UI thread.
pub struct StatusForwarder {
    subscription: StatusSubscription,
    proxy: EventLoopProxy<UiCommand>,
    mirror: StatusMirror,
    shown: Option<(TrayIconState, String)>,
    escape: bool,
}

impl StatusForwarder {
    /// Create a forwarder over a fresh bus subscription.
    pub fn new(subscription: StatusSubscription, proxy: EventLoopProxy<UiCommand>) -> Self {
        Self {
            subscription,
            proxy,
            mirror: StatusMirror::new(HideDelays::default()),
            shown: None,
            escape: false,
        }
    }

    /// Run until shutdown or until the bus closes.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) -> AppResult<()> {
        loop {
            let hide_at = self.mirror.next_hide_deadline();

            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Status forwarder shutting down");
                    break;
                }
                event = self.subscription.recv() => {
                    let Some(event) = event else {
                        debug!("Status bus closed");
                        break;
                    };
                    self.on_event(&event, Instant::now())?;
                }
                _ = sleep_until(hide_at) => {
                    if self.mirror.tick(Instant::now()) {
                        self.render()?;
                    }
                }
            }
        }

        if self.escape {
            self.escape = false;
            // The event loop may already be gone during shutdown.
            let _ = self.proxy.send_event(UiCommand::ArmEscape(false));
        }

        Ok(())
    }

    #[track_caller]
    fn on_event(&mut self, event: &StatusEvent, now: Instant) -> AppResult<()> {
        if *event == StatusEvent::Busy {
            notifier::spawn_notification(
                "Voxgate is busy",
                "Wait for the current recording to finish.".to_string(),
            );
        }

        self.mirror.apply(event, now);
        self.render()
    }

    #[track_caller]
    fn render(&mut self) -> AppResult<()> {
        let phase = self.mirror.phase();

        let escape = escape_armed(phase);
        if escape != self.escape {
            self.escape = escape;
            self.send(UiCommand::ArmEscape(escape))?;
        }

        let next = (TrayIconState::from_phase(phase), status_line(&self.mirror));
        if self.shown.as_ref() != Some(&next) {
            let (state, status) = next.clone();
            self.shown = Some(next);
            self.send(UiCommand::SetIndicator { state, status })?;
        }

        Ok(())
    }

    #[track_caller]
    fn send(&self, command: UiCommand) -> AppResult<()> {
        self.proxy
            .send_event(command)
            .map_err(|e| AppError::ChannelSendFailed {
                message: format!("UI event loop closed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
