//! Global shortcut source.
//!
//! Registers the configured hotkey on the main thread and forwards its
//! press and release events, plus Escape while it is armed, to the session
//! runtime. The coordinator owns all session state; this module only
//! translates OS events, stamped with the instant they arrived.

use crate::{AppError, AppResult, context_probe};

use std::{panic::Location, time::Duration};

use error_location::ErrorLocation;
use global_hotkey::{
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
    hotkey::{Code, HotKey},
};
use tokio::{
    sync::{mpsc, watch},
    time::Instant,
};
use tracing::{debug, info, instrument, warn};
use voxgate_core::{RuntimeHandle, ShortcutMode, StatusEvent};

/// Reason sent when Escape abandons a push-to-talk hold.
pub const ESCAPE_WHILE_HOLDING: &str = "Escape pressed while holding";

/// What a hotkey event means for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    /// Session shortcut pressed.
    Press,
    /// Session shortcut released.
    Release,
    /// Escape pressed.
    Escape,
}

/// Registered shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotkeys {
    /// The session shortcut.
    pub session: HotKey,
    /// Escape; only registered while a recording runs.
    pub escape: HotKey,
}

impl Hotkeys {
    /// Parse the configured binding, e.g. `control+shift+Space`.
    #[track_caller]
    pub fn parse(binding: &str) -> AppResult<Self> {
        let session = binding
            .parse::<HotKey>()
            .map_err(|e| AppError::HotkeyRegistrationFailed {
                reason: format!("Invalid hotkey `{binding}`: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let escape = HotKey::new(None, Code::Escape);
        if session.id() == escape.id() {
            return Err(AppError::HotkeyRegistrationFailed {
                reason: "Escape is reserved for cancelling recordings".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self { session, escape })
    }

    /// Translate a raw event into an action. Escape only reacts to presses;
    /// unknown ids are ignored.
    pub fn route(&self, id: u32, state: HotKeyState) -> Option<HotkeyAction> {
        if id == self.session.id() {
            Some(match state {
                HotKeyState::Pressed => HotkeyAction::Press,
                HotKeyState::Released => HotkeyAction::Release,
            })
        } else if id == self.escape.id() && state == HotKeyState::Pressed {
            Some(HotkeyAction::Escape)
        } else {
            None
        }
    }
}

/// What the shortcut source knows about the running session, rebuilt from
/// status events.
///
/// It lags the coordinator by one bus hop, so it only decides what to send,
/// never whether a session starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShortcutGate {
    recording: Option<ShortcutMode>,
    busy: bool,
}

impl ShortcutGate {
    /// Fold one status event into the view.
    pub fn observe(&mut self, event: &StatusEvent) {
        match event {
            StatusEvent::SessionStarted { mode, .. } => {
                self.recording = Some(*mode);
                self.busy = false;
            }
            StatusEvent::SessionStopped { .. } | StatusEvent::StageChanged { .. } => {
                self.recording = None;
                self.busy = true;
            }
            StatusEvent::SessionDone
            | StatusEvent::SessionError { .. }
            | StatusEvent::SessionCancelled { .. }
            | StatusEvent::Hide => *self = Self::default(),
            _ => {}
        }
    }

    /// The pipeline is still working on the last recording.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// A push-to-talk recording is being held.
    pub fn is_holding(&self) -> bool {
        self.recording == Some(ShortcutMode::PushToTalk)
    }
}

/// Forwards global shortcut events to the session runtime.
pub struct HotkeyHandler {
    hotkeys: Hotkeys,
    runtime: RuntimeHandle,
}

impl HotkeyHandler {
    /// Register the session shortcut.
    ///
    /// Must be called on a thread with a message pump (e.g. the main thread
    /// running a `tao`/`winit` event loop) so that `WM_HOTKEY` messages are
    /// dispatched on Windows. The returned [`GlobalHotKeyManager`] must be
    /// kept alive on that thread for the hotkey to remain registered.
    #[track_caller]
    #[instrument]
    pub fn register(binding: &str) -> AppResult<(GlobalHotKeyManager, Hotkeys)> {
        let hotkeys = Hotkeys::parse(binding)?;

        let manager =
            GlobalHotKeyManager::new().map_err(|e| AppError::HotkeyRegistrationFailed {
                reason: format!("Failed to create manager: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        manager
            .register(hotkeys.session)
            .map_err(|e| AppError::HotkeyRegistrationFailed {
                reason: format!("Failed to register {binding}: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(hotkey = %binding, "Global hotkey registered");

        Ok((manager, hotkeys))
    }

    /// Register or unregister Escape on the manager's thread.
    pub fn arm_escape(manager: &GlobalHotKeyManager, hotkeys: &Hotkeys, armed: bool) {
        let result = if armed {
            manager.register(hotkeys.escape)
        } else {
            manager.unregister(hotkeys.escape)
        };

        match result {
            Ok(()) => debug!(armed, "Escape shortcut updated"),
            Err(e) => warn!(armed, error = %e, "Failed to update Escape shortcut"),
        }
    }

    /// Create a handler for previously registered hotkeys.
    ///
    /// This struct is `Send` and can live on any thread; it only listens on
    /// the global [`GlobalHotKeyEvent`] channel.
    pub fn new(hotkeys: Hotkeys, runtime: RuntimeHandle) -> Self {
        Self { hotkeys, runtime }
    }

    /// Run the hotkey handler event loop until shutdown is signalled.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) -> AppResult<()> {
        let receiver = GlobalHotKeyEvent::receiver().clone();
        let (event_tx, mut event_rx) = mpsc::channel::<(GlobalHotKeyEvent, Instant)>(32);
        let mut status = self.runtime.bus().subscribe();
        let mut gate = ShortcutGate::default();
        let mut missed = 0;

        // GlobalHotKeyEvent::receiver() is a crossbeam channel with a
        // blocking recv(); one blocking task forwards it. The task exits on
        // the first send after event_rx is dropped. Events are stamped here,
        // before any queueing, so hold times follow the physical key.
        let handle = tokio::task::spawn_blocking(move || {
            while let Ok(event) = receiver.recv() {
                if event_tx.blocking_send((event, Instant::now())).is_err() {
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Hotkey handler shutting down");
                    break;
                }
                Some(event) = status.recv() => {
                    if status.missed() != missed {
                        // Skipped events may have ended the session.
                        missed = status.missed();
                        gate = ShortcutGate::default();
                    }
                    gate.observe(&event);
                }
                Some((event, at)) = event_rx.recv() => {
                    if let Some(action) = self.hotkeys.route(event.id, event.state) {
                        self.dispatch(action, at, &gate).await?;
                    }
                }
            }
        }

        drop(event_rx);

        // The blocking task may sit in recv() until the next hotkey event.
        match tokio::time::timeout(Duration::from_secs(1), handle).await {
            Ok(Ok(())) => debug!("Hotkey event forwarder stopped cleanly"),
            Ok(Err(e)) => warn!(error = ?e, "Hotkey event forwarder task panicked"),
            Err(_) => debug!(
                "Hotkey event forwarder did not stop within timeout, \
                   will be cleaned up on exit"
            ),
        }

        Ok(())
    }

    #[instrument(skip(self, gate))]
    async fn dispatch(&self, action: HotkeyAction, at: Instant, gate: &ShortcutGate) -> AppResult<()> {
        match action {
            HotkeyAction::Press if gate.is_busy() => {
                debug!("Shortcut pressed while processing");
                self.runtime.busy().await?;
            }
            HotkeyAction::Press => {
                let context = context_probe::detect_foreground_app().await;
                debug!(context = %context, "Shortcut pressed");
                self.runtime.press(context, at).await?;
            }
            HotkeyAction::Release => self.runtime.release(at).await?,
            HotkeyAction::Escape if gate.is_holding() => {
                self.runtime.cancel_shortcut(ESCAPE_WHILE_HOLDING).await?;
            }
            HotkeyAction::Escape => self.runtime.escape().await?,
        }

        Ok(())
    }
}
