use crate::config::{default_auto_paste, default_restore_clipboard, default_single_line};

use serde::{Deserialize, Serialize};

/// How delivered text reaches the focused application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviourConfig {
    /// Paste into the focused window after copying to the clipboard.
    #[serde(default = "default_auto_paste")]
    pub auto_paste: bool,
    /// Put the previous clipboard text back after an auto-paste.
    #[serde(default = "default_restore_clipboard")]
    pub restore_clipboard: bool,
    /// Flatten line breaks so a focused terminal never receives Enter.
    #[serde(default = "default_single_line")]
    pub single_line: bool,
}

impl Default for BehaviourConfig {
    fn default() -> Self {
        Self {
            auto_paste: default_auto_paste(),
            restore_clipboard: default_restore_clipboard(),
            single_line: default_single_line(),
        }
    }
}
