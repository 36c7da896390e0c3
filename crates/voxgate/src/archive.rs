//! Markdown archive of delivered transcripts.
//!
//! Every completed session leaves one note with YAML front matter. Notes
//! are only written below the user's home directory, never inside a
//! credential store, and never over an existing file.

use crate::{
    AppError, AppResult,
    config::{ArchiveConfig, FolderLayout},
};

use std::{
    ffi::OsStr,
    io,
    panic::Location,
    path::{Component, Path, PathBuf},
};

use chrono::{DateTime, Local};
use directories::UserDirs;
use error_location::ErrorLocation;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info, instrument, warn};
use voxgate_core::TranscriptEntry;

/// Longest slug taken from the app id or the transcript.
pub(crate) const SLUG_CHARS: usize = 30;

/// Numbered variants tried before giving up on a name.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Directories below home that never receive notes.
const BLOCKED_DIRS: &[&str] = &[
    ".ssh",
    ".gnupg",
    ".aws",
    ".config/gcloud",
    "Library/Keychains",
    "Library/Cookies",
    ".password-store",
];

/// Lowercase ASCII slug: runs of anything else collapse to one dash.
pub(crate) fn sanitize_filename(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .take(SLUG_CHARS)
        .collect::<String>()
        .trim_end_matches('-')
        .to_string()
}

/// A scalar safe to place after `key: ` in front matter.
pub(crate) fn yaml_value(value: &str) -> String {
    const SPECIAL: &[char] = &[
        ':', '#', '\n', '\r', '"', '\'', '`', '|', '>', '&', '*', '!', '%', '@',
    ];

    let needs_quotes = value.is_empty()
        || value.contains(SPECIAL)
        || value.starts_with([' ', '-', '[', '{'])
        || value.ends_with(' ');

    if !needs_quotes {
        return value.to_string();
    }

    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r");
    format!("\"{escaped}\"")
}

/// Note file name without extension.
pub(crate) fn note_name(entry: &TranscriptEntry, recorded: &DateTime<Local>) -> String {
    let app = entry
        .context
        .app_id()
        .map(sanitize_filename)
        .filter(|app| !app.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    let snippet = sanitize_filename(&entry.text);

    let mut name = format!("{}_{app}", recorded.format("%Y-%m-%d_%H-%M"));
    if !snippet.is_empty() {
        name.push('_');
        name.push_str(&snippet);
    }
    name
}

/// Render one note.
pub(crate) fn render_markdown(
    entry: &TranscriptEntry,
    recorded: &DateTime<Local>,
    include_original: bool,
) -> String {
    let app = entry.context.to_string();
    let seconds = entry.duration_ms.saturating_add(500) / 1000;
    let mut note = String::new();

    note.push_str("---\n");
    note.push_str(&format!(
        "date: {}\n",
        yaml_value(&recorded.format("%Y-%m-%d %H:%M").to_string())
    ));
    note.push_str(&format!("app: {}\n", yaml_value(&app)));
    note.push_str(&format!("duration: {seconds}\n"));
    note.push_str(&format!("words: {}\n", entry.text.split_whitespace().count()));
    note.push_str(&format!("edited: {}\n", entry.was_edited()));
    note.push_str("tags:\n  - transcription\n  - voxgate\n");
    note.push_str("---\n\n");

    note.push_str(&format!(
        "# Transcription of {}\n\n",
        recorded.format("%-d %B %Y")
    ));
    note.push_str(&format!("**App:** {app}\n"));
    note.push_str(&format!("**Time:** {}\n", recorded.format("%H:%M")));
    note.push_str(&format!("**Duration:** {seconds} seconds\n\n"));

    match entry.original.as_deref() {
        Some(original) => {
            note.push_str("## Edited text\n\n");
            note.push_str(&entry.text);
            note.push_str("\n\n");

            if include_original {
                note.push_str("## Original text\n\n");
                note.push_str("<details>\n<summary>Show original</summary>\n\n");
                note.push_str(original);
                note.push_str("\n\n</details>\n");
            }
        }
        None => {
            note.push_str("## Text\n\n");
            note.push_str(&entry.text);
            note.push('\n');
        }
    }

    note
}

/// Reject directories outside `home`, containing `..`, or inside a
/// credential store. `dir` and `home` must be comparable (both canonical or
/// both as configured).
#[track_caller]
pub(crate) fn check_archive_dir(dir: &Path, home: &Path) -> AppResult<()> {
    let rejected = |reason: String| AppError::ArchiveFailed {
        reason,
        location: ErrorLocation::from(Location::caller()),
    };

    if dir.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(rejected(format!(
            "Archive directory must not contain `..`: {}",
            dir.display()
        )));
    }

    let Ok(relative) = dir.strip_prefix(home) else {
        warn!(dir = %dir.display(), "Archive directory outside home blocked");
        return Err(rejected(format!(
            "Archive directory must be inside the home directory: {}",
            dir.display()
        )));
    };

    let parts: Vec<&OsStr> = relative.components().map(Component::as_os_str).collect();
    for blocked in BLOCKED_DIRS {
        let needle: Vec<&OsStr> = Path::new(blocked)
            .components()
            .map(Component::as_os_str)
            .collect();

        if parts.windows(needle.len()).any(|window| window == needle.as_slice()) {
            warn!(dir = %dir.display(), blocked = *blocked, "Archive directory in sensitive location blocked");
            return Err(rejected(format!(
                "Archive directory must not be inside {blocked}"
            )));
        }
    }

    Ok(())
}

/// Writes archive notes.
#[derive(Debug, Clone)]
pub struct TranscriptArchive {
    config: ArchiveConfig,
    home: Option<PathBuf>,
}

impl TranscriptArchive {
    /// Archive rooted in the current user's home directory.
    pub fn new(config: ArchiveConfig) -> Self {
        let home = UserDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
        Self::with_home(config, home)
    }

    /// Archive checked against an explicit home directory.
    pub fn with_home(config: ArchiveConfig, home: Option<PathBuf>) -> Self {
        Self { config, home }
    }

    /// Write `entry` as a new note. `None` when archiving is off.
    #[instrument(skip(self, entry), fields(chars = entry.text.chars().count()))]
    pub async fn write(&self, entry: &TranscriptEntry) -> AppResult<Option<PathBuf>> {
        if !self.config.enabled {
            debug!("Archive disabled");
            return Ok(None);
        }

        let home = self.home.as_deref().ok_or_else(|| AppError::ArchiveFailed {
            reason: "No home directory for the archive".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let root = self
            .config
            .directory
            .clone()
            .unwrap_or_else(|| home.join("Voxgate").join("transcriptions"));

        let recorded = DateTime::<Local>::from(entry.recorded_at);
        let dir = match self.config.folder_layout {
            FolderLayout::Flat => root,
            FolderLayout::Nested => root
                .join(recorded.format("%Y").to_string())
                .join(recorded.format("%m").to_string()),
        };

        // Check the configured path before creating anything, then the
        // resolved one so symlinks cannot lead out of home.
        check_archive_dir(&dir, home)?;
        fs::create_dir_all(&dir).await.map_err(|e| io_failed("create", &dir, e))?;
        let canonical_home = fs::canonicalize(home)
            .await
            .map_err(|e| io_failed("resolve", home, e))?;
        let dir = fs::canonicalize(&dir)
            .await
            .map_err(|e| io_failed("resolve", &dir, e))?;
        check_archive_dir(&dir, &canonical_home)?;

        let base = note_name(entry, &recorded);
        let note = render_markdown(entry, &recorded, self.config.include_original);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = if attempt == 0 {
                dir.join(format!("{base}.md"))
            } else {
                dir.join(format!("{base}_{attempt}.md"))
            };

            let mut options = fs::OpenOptions::new();
            options.write(true).create_new(true);
            #[cfg(unix)]
            options.mode(0o600);

            let mut file = match options.open(&path).await {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(io_failed("create", &path, e)),
            };

            file.write_all(note.as_bytes())
                .await
                .map_err(|e| io_failed("write", &path, e))?;
            file.sync_all()
                .await
                .map_err(|e| io_failed("sync", &path, e))?;

            info!(path = %path.display(), "Transcript archived");
            return Ok(Some(path));
        }

        Err(AppError::ArchiveFailed {
            reason: format!("No free file name for {base} in {}", dir.display()),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

#[track_caller]
fn io_failed(action: &str, path: &Path, e: io::Error) -> AppError {
    AppError::ArchiveFailed {
        reason: format!("Failed to {action} {}: {e}", path.display()),
        location: ErrorLocation::from(Location::caller()),
    }
}
