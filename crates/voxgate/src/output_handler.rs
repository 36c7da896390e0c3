//! Clipboard delivery with optional auto-paste.
//!
//! Text always lands on the clipboard first, so a failed paste still leaves
//! the transcript one keystroke away.

use crate::{AppError, AppResult, PasteModifierGuard, config::BehaviourConfig};

use std::{panic::Location, time::Duration};

use arboard::Clipboard;
use enigo::Key;
use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};

/// Time for the clipboard owner to publish a write before we paste it.
const CLIPBOARD_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Gap around the V click so slow input methods register it.
const KEY_EVENT_DELAY: Duration = Duration::from_millis(10);

/// Time the target application gets to read the clipboard before the
/// previous contents are put back.
const CLIPBOARD_RESTORE_DELAY: Duration = Duration::from_millis(300);

/// Writes delivered text to the clipboard and pastes it.
pub struct OutputHandler {
    pub(crate) clipboard: Clipboard,
}

impl OutputHandler {
    /// Open the system clipboard.
    #[track_caller]
    #[instrument]
    pub fn new() -> AppResult<Self> {
        let clipboard = Clipboard::new().map_err(|e| AppError::ClipboardError {
            reason: format!("Failed to open clipboard: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        debug!("Clipboard opened");

        Ok(Self { clipboard })
    }

    /// Deliver `text` according to `behavior`.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn output_text(&mut self, text: &str, behavior: &BehaviourConfig) -> AppResult<()> {
        let text = if behavior.single_line {
            flatten_lines(text)
        } else {
            text.to_string()
        };

        let previous = if behavior.auto_paste && behavior.restore_clipboard {
            self.clipboard.get_text().ok()
        } else {
            None
        };

        self.clipboard
            .set_text(text.as_str())
            .map_err(|e| AppError::ClipboardError {
                reason: format!("Failed to set clipboard: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        debug!("Text copied to clipboard");

        if behavior.auto_paste {
            tokio::time::sleep(CLIPBOARD_SETTLE_DELAY).await;

            if let Err(e) = paste().await {
                warn!(error = ?e, "Auto-paste failed, text left on clipboard");
                return Err(e);
            }

            if let Some(previous) = previous {
                tokio::time::sleep(CLIPBOARD_RESTORE_DELAY).await;
                if let Err(e) = self.clipboard.set_text(previous) {
                    warn!(error = %e, "Failed to restore previous clipboard");
                }
            }
        }

        info!(
            delivered_len = text.len(),
            auto_pasted = behavior.auto_paste,
            "Text delivered"
        );

        Ok(())
    }
}

/// Replace line breaks with spaces and collapse whitespace runs.
pub(crate) fn flatten_lines(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Press the platform paste chord.
///
/// Enigo is not `Send`, so the blocking task builds its own instance.
async fn paste() -> AppResult<()> {
    tokio::task::spawn_blocking(|| {
        let mut guard = PasteModifierGuard::press()?;

        std::thread::sleep(KEY_EVENT_DELAY);
        guard.click(Key::Unicode('v'))?;
        std::thread::sleep(KEY_EVENT_DELAY);

        Ok::<(), AppError>(())
    })
    .await
    .map_err(|e| AppError::AutoPasteFailed {
        reason: format!("Paste task panicked: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })??;

    debug!("Paste chord sent");

    Ok(())
}
