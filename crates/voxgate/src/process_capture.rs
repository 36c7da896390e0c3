//! Capture backed by an external recorder process.
//!
//! The recorder (ffmpeg by default) writes a 16-bit PCM WAV file. Levels
//! are sampled from the tail of that file while it grows.

use crate::{
    config::{CaptureConfig, OUTPUT_PLACEHOLDER},
    external_command::{expand_args, split_program, stderr_summary},
};

use std::{
    io::{ErrorKind, SeekFrom},
    panic::Location,
    path::{Path, PathBuf},
    process::Stdio,
    time::{Duration, Instant, SystemTime},
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use tokio::{
    fs,
    io::{AsyncReadExt, AsyncSeekExt},
    process::{Child, Command},
    task::JoinHandle,
};
use tracing::{debug, info, instrument, warn};
use voxgate_core::{CaptureDevice, CapturedAudio, CoreError, CoreResult, DeviceFault, LevelSink};

/// Canonical WAV header size; a file this small holds no audio.
pub(crate) const WAV_HEADER_LEN: u64 = 44;

/// How long a freshly spawned recorder must survive to count as started.
const START_GRACE: Duration = Duration::from_millis(200);

/// How long a stopping recorder may take to finalize the file.
const STOP_GRACE: Duration = Duration::from_secs(3);

/// Level sampling period.
const METER_INTERVAL: Duration = Duration::from_millis(50);

/// Bytes inspected per level sample: 50 ms of 16 kHz mono s16.
const METER_WINDOW: u64 = 1_600;

/// Recordings older than this are swept at startup in privacy mode.
pub(crate) const STALE_RECORDING_AGE: Duration = Duration::from_secs(60 * 60);

/// Levels below this many dBFS read as silence.
const METER_FLOOR_DB: f32 = -60.0;

struct ActiveRecording {
    child: Child,
    path: PathBuf,
    started: Instant,
    meter: JoinHandle<()>,
}

/// [`CaptureDevice`] that runs the configured recorder command.
pub struct ProcessCapture {
    config: CaptureConfig,
    active: Option<ActiveRecording>,
}

impl ProcessCapture {
    /// Create a capture device; nothing is spawned until a session starts.
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            active: None,
        }
    }

    /// Path of the recording for `file_stem`.
    pub(crate) fn recording_path(&self, file_stem: &str) -> PathBuf {
        self.config.recordings_dir.join(format!("{file_stem}.wav"))
    }

    /// Delete recordings left behind by earlier runs, e.g. after a crash
    /// or a transcription retry that never came. Returns how many went.
    #[instrument(skip(self), fields(dir = %self.config.recordings_dir.display()))]
    pub async fn remove_stale_recordings(&self, max_age: Duration) -> usize {
        let mut entries = match fs::read_dir(&self.config.recordings_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!(error = %e, "Failed to list recordings");
                return 0;
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read recordings directory");
                    break;
                }
            };

            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "wav") {
                continue;
            }

            let Ok(modified) = entry.metadata().await.and_then(|meta| meta.modified()) else {
                continue;
            };
            if now.duration_since(modified).unwrap_or_default() < max_age {
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Stale recording removed");
                    removed += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove stale recording"),
            }
        }

        if removed > 0 {
            info!(removed, "Stale recordings removed");
        }

        removed
    }
}

#[async_trait]
impl CaptureDevice for ProcessCapture {
    #[instrument(skip(self, levels), fields(session_id = %levels.session_id()))]
    async fn start_capture(&mut self, levels: LevelSink) -> CoreResult<()> {
        if self.active.is_some() {
            return Err(capture_failed("A recording is already running"));
        }

        fs::create_dir_all(&self.config.recordings_dir)
            .await
            .map_err(|e| capture_failed(format!("Failed to create recordings directory: {e}")))?;

        let path = self.recording_path(&levels.session_id().to_string());
        let argv = expand_args(
            &self.config.recorder_command,
            OUTPUT_PLACEHOLDER,
            &path.to_string_lossy(),
        );
        let (program, args) = split_program(&argv).map_err(|e| capture_failed(e.reason()))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| capture_failed(format!("Failed to start recorder `{program}`: {e}")))?;

        // A recorder that cannot open the device exits almost immediately.
        tokio::time::sleep(START_GRACE).await;
        if let Some(status) = child
            .try_wait()
            .map_err(|e| capture_failed(format!("Failed to check recorder: {e}")))?
        {
            let detail = read_stderr(&mut child).await;
            let _ = fs::remove_file(&path).await;
            return Err(capture_failed(match detail {
                Some(line) => format!("Recorder exited with {status}: {line}"),
                None => format!("Recorder exited with {status}"),
            }));
        }

        let meter = tokio::spawn(run_meter(path.clone(), levels));

        info!(path = %path.display(), program, "Recorder started");

        self.active = Some(ActiveRecording {
            child,
            path,
            started: Instant::now(),
            meter,
        });

        Ok(())
    }

    #[instrument(skip(self))]
    async fn stop_capture(&mut self) -> CoreResult<CapturedAudio> {
        let Some(mut recording) = self.active.take() else {
            return Err(capture_failed("No recording is running"));
        };

        recording.meter.abort();
        let duration_ms = u64::try_from(recording.started.elapsed().as_millis()).unwrap_or(u64::MAX);

        request_stop(&mut recording.child).await;

        match tokio::time::timeout(STOP_GRACE, recording.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Recorder exited"),
            Ok(Err(e)) => warn!(error = %e, "Failed to wait for recorder"),
            Err(_) => {
                warn!(grace_secs = STOP_GRACE.as_secs(), "Recorder ignored stop request, killing");
                if let Err(e) = recording.child.kill().await {
                    warn!(error = %e, "Failed to kill recorder");
                }
            }
        }

        let written = fs::metadata(&recording.path)
            .await
            .map(|meta| meta.len())
            .unwrap_or(0);

        if written <= WAV_HEADER_LEN {
            let _ = fs::remove_file(&recording.path).await;
            return Err(capture_failed("Recorder produced no audio"));
        }

        info!(
            path = %recording.path.display(),
            duration_ms,
            bytes = written,
            "Recording finished"
        );

        Ok(CapturedAudio {
            path: recording.path,
            duration_ms,
        })
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn discard(&mut self, path: &Path) -> CoreResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!("Recording discarded");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(capture_failed(format!("Failed to delete recording: {e}"))),
        }
    }

    async fn poll_health(&mut self) -> CoreResult<Option<DeviceFault>> {
        let Some(recording) = self.active.as_mut() else {
            return Ok(None);
        };

        let exited = recording
            .child
            .try_wait()
            .map_err(|e| CoreError::HealthCheckFailed {
                reason: format!("Failed to check recorder: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let Some(status) = exited else {
            return Ok(None);
        };

        let detail = read_stderr(&mut recording.child).await;
        warn!(%status, detail = ?detail, "Recorder exited while recording");

        Ok(Some(DeviceFault {
            reason: match detail {
                Some(line) => format!("Recorder stopped unexpectedly ({status}): {line}"),
                None => format!("Recorder stopped unexpectedly ({status})"),
            },
        }))
    }
}

#[track_caller]
fn capture_failed(reason: impl Into<String>) -> CoreError {
    CoreError::CaptureFailed {
        reason: reason.into(),
        location: ErrorLocation::from(Location::caller()),
    }
}

async fn read_stderr(child: &mut Child) -> Option<String> {
    let mut stderr = child.stderr.take()?;
    let mut buf = Vec::new();
    stderr.read_to_end(&mut buf).await.ok()?;
    stderr_summary(&buf)
}

/// Ask the recorder to finalize its output and exit.
#[cfg(unix)]
async fn request_stop(child: &mut Child) {
    use nix::{
        sys::signal::{self, Signal},
        unistd::Pid,
    };

    let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
        return;
    };

    if let Err(e) = signal::kill(Pid::from_raw(pid), Signal::SIGINT) {
        warn!(pid, error = %e, "Failed to interrupt recorder");
    }
}

/// Ask the recorder to finalize its output and exit.
#[cfg(not(unix))]
async fn request_stop(child: &mut Child) {
    use tokio::io::AsyncWriteExt;

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(b"q").await {
            warn!(error = %e, "Failed to send quit to recorder");
        }
    }
}

/// Sample the newest audio in `path` until aborted.
async fn run_meter(path: PathBuf, levels: LevelSink) {
    let mut interval = tokio::time::interval(METER_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        let Some(window) = read_tail(&path).await else {
            continue;
        };

        levels.push(level_from_pcm(&window));
    }
}

async fn read_tail(path: &Path) -> Option<Vec<u8>> {
    let mut file = fs::File::open(path).await.ok()?;
    let len = file.metadata().await.ok()?.len();
    if len <= WAV_HEADER_LEN {
        return None;
    }

    let start = tail_start(len);
    file.seek(SeekFrom::Start(start)).await.ok()?;

    let mut window = Vec::with_capacity(usize::try_from(len - start).ok()?);
    file.read_to_end(&mut window).await.ok()?;
    Some(window)
}

/// Offset of the newest meter window in a file of `len` bytes, on a sample
/// boundary so s16 pairs are never split.
pub(crate) fn tail_start(len: u64) -> u64 {
    let start = len.saturating_sub(METER_WINDOW).max(WAV_HEADER_LEN);
    start - (start - WAV_HEADER_LEN) % 2
}

/// Map little-endian s16 PCM to a 0–100 level on a logarithmic scale.
pub(crate) fn level_from_pcm(bytes: &[u8]) -> u8 {
    let (sum, count) = bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / f32::from(i16::MAX))
        .fold((0.0_f32, 0_u32), |(sum, count), sample| {
            (sum + sample * sample, count + 1)
        });

    if count == 0 {
        return 0;
    }

    let rms = (sum / count as f32).sqrt();
    if rms <= 0.0 {
        return 0;
    }

    let db = 20.0 * rms.log10();
    let scaled = (db - METER_FLOOR_DB) / -METER_FLOOR_DB * 100.0;
    scaled.clamp(0.0, 100.0).round() as u8
}
