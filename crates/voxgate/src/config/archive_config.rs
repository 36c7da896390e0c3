use crate::config::{default_archive_enabled, default_include_original};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How archived transcripts are grouped on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderLayout {
    /// Every note directly in the archive directory.
    #[default]
    Flat,
    /// `<year>/<month>/` subdirectories.
    Nested,
}

/// Markdown archive of delivered transcripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Write a note after every delivered session.
    #[serde(default = "default_archive_enabled")]
    pub enabled: bool,
    /// Archive root. Must lie inside the home directory; defaults to
    /// `~/Voxgate/transcriptions`.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Add the raw transcript when improvement changed it.
    #[serde(default = "default_include_original")]
    pub include_original: bool,
    #[serde(default)]
    pub folder_layout: FolderLayout,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: default_archive_enabled(),
            directory: None,
            include_original: default_include_original(),
            folder_layout: FolderLayout::default(),
        }
    }
}
