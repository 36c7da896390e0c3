//! Tracing setup: human-readable stderr plus a daily JSON log file.

use crate::config::Config;

use tracing::warn;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or invalid.
pub(crate) const DEFAULT_LOG_FILTER: &str = "voxgate=debug,voxgate_core=debug";

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must live until
/// the process exits. `None` means file logging is unavailable.
pub(crate) fn init() -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let appender = Config::log_dir().map_err(|e| e.reason()).and_then(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("voxgate")
            .filename_suffix("log")
            .build(&dir)
            .map_err(|e| format!("{}: {}", dir.display(), e))
    });

    let (file_layer, guard, file_error) = match appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        warn!(error = %e, "File logging disabled");
    }

    guard
}
