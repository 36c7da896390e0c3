use crate::TrayIconState;

/// Commands sent from the async runtime to the main UI thread.
///
/// The main thread owns `TrayManager` (because `TrayIcon` is `!Send`) and
/// the `GlobalHotKeyManager` (registration needs the message pump), so all
/// tray and shortcut mutations and process lifecycle events flow through
/// this enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    /// Show a new indicator state and status line.
    SetIndicator {
        /// Icon state.
        state: TrayIconState,
        /// Text for the disabled status menu line.
        status: String,
    },
    /// Enable or disable the retry menu item.
    SetRetryAvailable(bool),
    /// Register (`true`) or unregister the Escape shortcut.
    ArmEscape(bool),
    /// Shut down the application. The main thread will exit the event loop.
    Shutdown,
}
