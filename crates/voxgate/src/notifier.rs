//! Desktop notifications for error toasts and the busy notice.

use crate::{AppError, AppResult, UiCommand};

use std::{collections::HashSet, panic::Location};

use error_location::ErrorLocation;
use tao::event_loop::EventLoopProxy;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use voxgate_core::{Toast, ToastId};

/// Application name shown by the notification server.
const APP_NAME: &str = "Voxgate";

/// Show one desktop notification.
///
/// notify-rust blocks on some platforms, so it runs on the blocking pool.
#[instrument(skip(body))]
pub(crate) async fn show_notification(summary: &str, body: &str) -> AppResult<()> {
    let summary = summary.to_owned();
    let body = body.to_owned();

    tokio::task::spawn_blocking(move || {
        notify_rust::Notification::new()
            .appname(APP_NAME)
            .summary(&summary)
            .body(&body)
            .show()
            .map(|_| ())
            .map_err(|e| AppError::NotificationFailed {
                reason: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    })
    .await
    .map_err(|e| AppError::NotificationFailed {
        reason: format!("Notification task panicked: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?
}

/// Fire-and-forget variant; failures are logged.
pub(crate) fn spawn_notification(summary: &'static str, body: String) {
    tokio::spawn(async move {
        if let Err(e) = show_notification(summary, &body).await {
            warn!(error = ?e, "Failed to show notification");
        }
    });
}

/// Toasts in `snapshot` not yet announced.
pub(crate) fn new_toasts<'a>(announced: &HashSet<ToastId>, snapshot: &'a [Toast]) -> Vec<&'a Toast> {
    snapshot
        .iter()
        .filter(|toast| !announced.contains(&toast.id))
        .collect()
}

/// Whether the tray can retry `toast`.
pub(crate) fn is_retryable(toast: &Toast) -> bool {
    toast
        .record()
        .is_some_and(|record| record.retryable && record.retry_action.is_some())
}

/// Whether any visible toast can be retried from the tray.
pub(crate) fn has_retryable(snapshot: &[Toast]) -> bool {
    snapshot.iter().any(is_retryable)
}

/// Summary and body for a toast notification.
pub(crate) fn toast_text(toast: &Toast) -> (String, String) {
    match toast.record() {
        Some(record) => {
            let summary = format!("Voxgate: {} error", record.component);
            let body = match (&record.details, record.retryable) {
                (Some(details), true) => {
                    format!("{}\n{details}\nRetry from the tray menu.", record.message)
                }
                (Some(details), false) => format!("{}\n{details}", record.message),
                (None, true) => format!("{}\nRetry from the tray menu.", record.message),
                (None, false) => record.message.clone(),
            };
            (summary, body)
        }
        None => ("Voxgate: repeated errors".to_string(), toast.message()),
    }
}

/// Announces new toasts and keeps the tray's retry item in sync.
pub struct Notifier {
    toasts: watch::Receiver<Vec<Toast>>,
    proxy: EventLoopProxy<UiCommand>,
    announced: HashSet<ToastId>,
    retry_available: bool,
}

impl Notifier {
    /// Watch `toasts` and report to the UI thread through `proxy`.
    pub fn new(toasts: watch::Receiver<Vec<Toast>>, proxy: EventLoopProxy<UiCommand>) -> Self {
        Self {
            toasts,
            proxy,
            announced: HashSet::new(),
            retry_available: false,
        }
    }

    /// Run until shutdown or until the runtime drops the toast channel.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) -> AppResult<()> {
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Notifier shutting down");
                    break;
                }
                changed = self.toasts.changed() => {
                    if changed.is_err() {
                        debug!("Toast channel closed");
                        break;
                    }
                    let snapshot = self.toasts.borrow_and_update().clone();
                    self.on_snapshot(&snapshot)?;
                }
            }
        }

        Ok(())
    }

    #[track_caller]
    fn on_snapshot(&mut self, snapshot: &[Toast]) -> AppResult<()> {
        for toast in new_toasts(&self.announced, snapshot) {
            let (summary, body) = toast_text(toast);
            debug!(toast = %toast.id, summary = %summary, "Announcing toast");
            tokio::spawn(async move {
                if let Err(e) = show_notification(&summary, &body).await {
                    warn!(error = ?e, "Failed to show notification");
                }
            });
        }

        // Forget toasts that went away so ids never accumulate.
        self.announced = snapshot.iter().map(|toast| toast.id).collect();

        let retry_available = has_retryable(snapshot);
        if retry_available != self.retry_available {
            self.retry_available = retry_available;
            self.proxy
                .send_event(UiCommand::SetRetryAvailable(retry_available))
                .map_err(|e| AppError::ChannelSendFailed {
                    message: format!("UI event loop closed: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;
        }

        Ok(())
    }
}
