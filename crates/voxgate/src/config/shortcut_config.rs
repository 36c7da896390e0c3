use crate::config::{default_hotkey, default_mode};

use serde::{Deserialize, Serialize};
use voxgate_core::ShortcutMode;

/// Global shortcut configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutConfig {
    /// Hotkey in `global-hotkey` syntax, e.g. `control+shift+Space`.
    /// Changes apply after a restart.
    #[serde(default = "default_hotkey")]
    pub hotkey: String,
    /// `push_to_talk` or `toggle`.
    #[serde(default = "default_mode")]
    pub mode: ShortcutMode,
}

impl Default for ShortcutConfig {
    fn default() -> Self {
        Self {
            hotkey: default_hotkey(),
            mode: default_mode(),
        }
    }
}
