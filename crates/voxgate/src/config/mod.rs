mod archive_config;
mod behaviour_config;
mod capture_config;
#[allow(clippy::module_inception)]
mod config;
mod pipeline_config;
mod session_settings;
mod shortcut_config;

pub(crate) use {
    archive_config::{ArchiveConfig, FolderLayout},
    behaviour_config::BehaviourConfig, capture_config::CaptureConfig, config::Config,
    pipeline_config::PipelineConfig, session_settings::SessionSettings,
    shortcut_config::ShortcutConfig,
};

use voxgate_core::ShortcutMode;

pub(crate) const DEFAULT_AUTO_PASTE: bool = true;
pub(crate) const DEFAULT_RESTORE_CLIPBOARD: bool = true;
pub(crate) const DEFAULT_SINGLE_LINE: bool = true;
pub(crate) const DEFAULT_HOTKEY: &str = "control+shift+Space";
pub(crate) const DEFAULT_MAX_DURATION_MINUTES: u64 = 5;
pub(crate) const DEFAULT_MIN_HOLD_MS: u64 = 300;
pub(crate) const DEFAULT_PRIVACY_MODE: bool = true;
pub(crate) const DEFAULT_ARCHIVE_ENABLED: bool = true;
pub(crate) const DEFAULT_INCLUDE_ORIGINAL: bool = true;

/// Placeholder in `recorder_command` replaced with the recording path.
pub(crate) const OUTPUT_PLACEHOLDER: &str = "{output}";
/// Placeholder in `transcribe_command` replaced with the recording path.
pub(crate) const INPUT_PLACEHOLDER: &str = "{input}";

pub(crate) fn default_auto_paste() -> bool {
    DEFAULT_AUTO_PASTE
}

pub(crate) fn default_restore_clipboard() -> bool {
    DEFAULT_RESTORE_CLIPBOARD
}

pub(crate) fn default_single_line() -> bool {
    DEFAULT_SINGLE_LINE
}

pub(crate) fn default_privacy_mode() -> bool {
    DEFAULT_PRIVACY_MODE
}

pub(crate) fn default_archive_enabled() -> bool {
    DEFAULT_ARCHIVE_ENABLED
}

pub(crate) fn default_include_original() -> bool {
    DEFAULT_INCLUDE_ORIGINAL
}

pub(crate) fn default_hotkey() -> String {
    DEFAULT_HOTKEY.to_string()
}

pub(crate) fn default_mode() -> ShortcutMode {
    ShortcutMode::PushToTalk
}

pub(crate) fn default_max_duration_minutes() -> u64 {
    DEFAULT_MAX_DURATION_MINUTES
}

pub(crate) fn default_min_hold_ms() -> u64 {
    DEFAULT_MIN_HOLD_MS
}

/// ffmpeg reading the default input device as 16 kHz mono WAV.
pub(crate) fn default_recorder_command() -> Vec<String> {
    #[cfg(target_os = "macos")]
    let input = ["-f", "avfoundation", "-i", ":0"];
    #[cfg(target_os = "windows")]
    let input = ["-f", "dshow", "-i", "audio=default"];
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let input = ["-f", "pulse", "-i", "default"];

    ["ffmpeg", "-hide_banner", "-loglevel", "error"]
        .into_iter()
        .chain(input)
        .chain(["-ac", "1", "-ar", "16000", "-y", OUTPUT_PLACEHOLDER])
        .map(str::to_string)
        .collect()
}
