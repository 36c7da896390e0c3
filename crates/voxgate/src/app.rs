use crate::{AppResult, TrayMenuAction, TrayMenuIds, config::Config, notifier};

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{error, info, instrument, warn};
use tray_icon::menu::MenuEvent;
use voxgate_core::{RuntimeHandle, Toast, ToastId};

/// Newest visible toast that can be retried.
pub(crate) fn latest_retryable(toasts: &[Toast]) -> Option<ToastId> {
    toasts
        .iter()
        .rev()
        .find(|toast| notifier::is_retryable(toast))
        .map(|toast| toast.id)
}

/// Tray menu side of the application.
///
/// Runs on the async runtime thread. Only menu ids live here; the tray
/// itself is `!Send` and stays on the main thread.
pub struct App {
    pub(crate) runtime: RuntimeHandle,
    pub(crate) menu_ids: TrayMenuIds,
    pub(crate) shutdown_tx: watch::Sender<bool>,
}

impl App {
    /// Handle tray menu events until Exit is chosen or shutdown is signalled.
    #[instrument(skip(self))]
    pub(crate) async fn run(self) -> AppResult<()> {
        info!("Voxgate starting");

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        // MenuEvent::receiver() is a crossbeam channel with a blocking
        // recv(); one blocking task forwards it. The task exits on the first
        // send after tray_event_rx is dropped.
        let (tray_event_tx, mut tray_event_rx) = mpsc::channel(32);
        let tray_handle = tokio::task::spawn_blocking(move || {
            let receiver = MenuEvent::receiver();
            while let Ok(event) = receiver.recv() {
                if tray_event_tx.blocking_send(event).is_err() {
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Shutdown signalled");
                    break;
                }

                Some(event) = tray_event_rx.recv() => {
                    let Some(action) = self.menu_ids.action_for(&event.id) else {
                        continue;
                    };

                    if action == TrayMenuAction::Exit {
                        info!("Exit requested from tray menu");
                        break;
                    }

                    if let Err(e) = self.handle_action(action).await {
                        error!(action = ?action, error = ?e, "Failed to handle tray action");
                    }
                }

                else => {
                    info!("Tray channel closed, shutting down");
                    break;
                }
            }
        }

        drop(tray_event_rx);

        match tokio::time::timeout(Duration::from_secs(1), tray_handle).await {
            Ok(Ok(())) => info!("Tray event forwarder stopped cleanly"),
            Ok(Err(e)) => error!(error = ?e, "Tray event forwarder task panicked"),
            Err(_) => info!(
                "Tray event forwarder did not stop within timeout, \
                     will be cleaned up on exit"
            ),
        }

        // Stops the recording, if any, before the other tasks go away.
        if let Err(e) = self.runtime.shutdown().await {
            warn!(error = ?e, "Session runtime already stopped");
        }
        let _ = self.shutdown_tx.send(true);

        Ok(())
    }

    #[instrument(skip(self))]
    async fn handle_action(&self, action: TrayMenuAction) -> AppResult<()> {
        match action {
            TrayMenuAction::RetryLastError => {
                let latest = latest_retryable(&self.runtime.toasts().borrow());
                match latest {
                    Some(id) => {
                        info!(toast = %id, "Retrying from tray");
                        self.runtime.retry(id).await?;
                    }
                    None => info!("Nothing to retry"),
                }
            }
            TrayMenuAction::DismissErrors => {
                let ids: Vec<ToastId> = self
                    .runtime
                    .toasts()
                    .borrow()
                    .iter()
                    .map(|toast| toast.id)
                    .collect();
                for id in ids {
                    self.runtime.dismiss(id).await?;
                }
                // Also clears a finished or failed session from the tray.
                self.runtime.hide().await?;
            }
            TrayMenuAction::ReloadSettings => match Config::load() {
                Ok(config) => {
                    self.runtime.update_config(config.session_config()?).await?;
                    info!("Settings reloaded, applied from the next session");
                }
                Err(e) => {
                    notifier::spawn_notification("Voxgate settings not reloaded", e.reason());
                    return Err(e);
                }
            },
            TrayMenuAction::OpenSettings => {
                let path = Config::config_path()?;
                if let Err(e) = open::that(&path) {
                    warn!(path = %path.display(), error = %e, "Failed to open settings file");
                } else {
                    info!(path = %path.display(), "Opened settings file");
                }
            }
            TrayMenuAction::Exit => {}
        }

        Ok(())
    }
}
