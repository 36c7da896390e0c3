//! Configuration management for voxgate.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths, validation into a core session snapshot, and atomic writes.

use crate::{
    AppError, AppResult,
    config::{
        ArchiveConfig, BehaviourConfig, CaptureConfig, INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER,
        PipelineConfig, SessionSettings, ShortcutConfig, default_privacy_mode,
        default_recorder_command,
    },
};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use voxgate_core::SessionConfig;

/// Main configuration struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Global shortcut and its mode.
    #[serde(default)]
    pub shortcut: ShortcutConfig,
    /// Session limits.
    #[serde(default)]
    pub session: SessionSettings,
    /// External recorder.
    pub capture: CaptureConfig,
    /// External transcription and improvement commands.
    pub pipeline: PipelineConfig,
    /// Application behavior settings.
    #[serde(default)]
    pub behavior: BehaviourConfig,
    /// Markdown archive of delivered transcripts.
    #[serde(default)]
    pub archive: ArchiveConfig,
}

impl Config {
    /// Load configuration from disk, creating default if not found.
    ///
    /// The external commands are not checked here; a missing program
    /// surfaces as a capture or stage error when a session runs, so the app
    /// can still start and the user can fix the file from the tray.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to read config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            let config = Self::parse(&contents)?;

            info!(config_path = ?config_path, "Configuration loaded");

            Ok(config)
        } else {
            info!("No config found, creating default");
            Self::create_default()
        }
    }

    /// Parse and validate TOML contents.
    #[track_caller]
    pub fn parse(contents: &str) -> AppResult<Self> {
        let config: Config = toml::from_str(contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Check the parts of the file the core does not validate.
    #[track_caller]
    pub fn validate(&self) -> AppResult<()> {
        if self.session.max_duration_minutes < 1 {
            return Err(AppError::ConfigError {
                reason: "session.max_duration_minutes must be at least 1".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if !self
            .capture
            .recorder_command
            .iter()
            .any(|arg| arg.contains(OUTPUT_PLACEHOLDER))
        {
            return Err(AppError::ConfigError {
                reason: format!("capture.recorder_command must contain {OUTPUT_PLACEHOLDER}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.pipeline.transcribe_command.is_empty() {
            return Err(AppError::ConfigError {
                reason: "pipeline.transcribe_command must not be empty".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if let Some(directory) = self
            .archive
            .directory
            .as_ref()
            .filter(|directory| !directory.is_absolute())
        {
            return Err(AppError::ConfigError {
                reason: format!("archive.directory must be absolute: {}", directory.display()),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.session_config()?;

        Ok(())
    }

    /// Snapshot handed to the coordinator; applies from the next session.
    #[track_caller]
    pub fn session_config(&self) -> AppResult<SessionConfig> {
        let config = SessionConfig {
            mode: self.shortcut.mode,
            max_duration: Duration::from_secs(self.session.max_duration_minutes.saturating_mul(60)),
            min_hold: Duration::from_millis(self.session.min_hold_ms),
            improvement_enabled: self.session.improvement_enabled,
            privacy_mode: self.capture.privacy_mode,
        };

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to disk using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn save(&self) -> AppResult<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Atomically write this configuration to `path`.
    #[track_caller]
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Location of `config.toml`, creating its directory if needed.
    #[track_caller]
    pub fn config_path() -> AppResult<PathBuf> {
        let proj_dirs = Self::project_dirs()?;
        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Directory for rolling log files.
    #[track_caller]
    pub fn log_dir() -> AppResult<PathBuf> {
        Ok(Self::project_dirs()?.data_local_dir().join("logs"))
    }

    /// Defaults rooted at `data_dir`.
    pub fn defaults_in(data_dir: &Path) -> Self {
        let model_path = data_dir.join("models").join("ggml-base.en.bin");

        Config {
            shortcut: ShortcutConfig::default(),
            session: SessionSettings::default(),
            capture: CaptureConfig {
                recorder_command: default_recorder_command(),
                recordings_dir: data_dir.join("recordings"),
                privacy_mode: default_privacy_mode(),
            },
            pipeline: PipelineConfig {
                transcribe_command: vec![
                    "whisper-cli".to_string(),
                    "--no-prints".to_string(),
                    "--no-timestamps".to_string(),
                    "-m".to_string(),
                    model_path.display().to_string(),
                    "-f".to_string(),
                    INPUT_PLACEHOLDER.to_string(),
                ],
                improve_command: None,
            },
            behavior: BehaviourConfig::default(),
            archive: ArchiveConfig::default(),
        }
    }

    #[track_caller]
    fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from("com", "voxgate", "Voxgate").ok_or_else(|| AppError::ConfigError {
            reason: "Failed to get project directories".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    #[track_caller]
    fn create_default() -> AppResult<Self> {
        let proj_dirs = Self::project_dirs()?;
        let config = Self::defaults_in(proj_dirs.data_dir());

        config.save()?;

        warn!(
            transcribe_command = ?config.pipeline.transcribe_command,
            "Default config created. A whisper model must be downloaded before transcribing."
        );

        Ok(config)
    }
}
