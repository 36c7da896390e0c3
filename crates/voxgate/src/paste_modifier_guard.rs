//! Scoped hold of the platform paste modifier.

use crate::{AppError, AppResult};

use std::panic::Location;

use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use error_location::ErrorLocation;

/// Cmd on macOS, Ctrl elsewhere.
pub(crate) fn paste_modifier() -> Key {
    #[cfg(target_os = "macos")]
    {
        Key::Meta
    }
    #[cfg(not(target_os = "macos"))]
    {
        Key::Control
    }
}

/// Holds the paste modifier down until dropped.
///
/// Release on drop is best-effort; a failed release is corrected by the OS
/// on the user's next physical key event.
pub struct PasteModifierGuard {
    enigo: Enigo,
    modifier: Key,
}

impl PasteModifierGuard {
    /// Press the paste modifier.
    #[track_caller]
    pub(crate) fn press() -> AppResult<Self> {
        let modifier = paste_modifier();

        let mut enigo =
            Enigo::new(&Settings::default()).map_err(|e| AppError::AutoPasteFailed {
                reason: format!("Keyboard simulation unavailable: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        enigo
            .key(modifier, Direction::Press)
            .map_err(|e| AppError::AutoPasteFailed {
                reason: format!("Failed to press {:?}: {}", modifier, e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(Self { enigo, modifier })
    }

    /// Click `key` while the modifier is held.
    #[track_caller]
    pub(crate) fn click(&mut self, key: Key) -> AppResult<()> {
        self.enigo
            .key(key, Direction::Click)
            .map_err(|e| AppError::AutoPasteFailed {
                reason: format!("Failed to click {:?}: {}", key, e),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

impl Drop for PasteModifierGuard {
    fn drop(&mut self) {
        let _ = self.enigo.key(self.modifier, Direction::Release);
    }
}
