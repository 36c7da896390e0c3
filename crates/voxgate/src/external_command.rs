//! Helpers for the user-configured external programs.

use crate::{AppError, AppResult};

use std::{panic::Location, process::Stdio, time::Duration};

use error_location::ErrorLocation;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, instrument, warn};

/// Replace every occurrence of `placeholder` in `argv`.
pub(crate) fn expand_args(argv: &[String], placeholder: &str, value: &str) -> Vec<String> {
    argv.iter()
        .map(|arg| arg.replace(placeholder, value))
        .collect()
}

/// Last non-empty stderr line, which is where most CLIs put the reason.
pub(crate) fn stderr_summary(stderr: &[u8]) -> Option<String> {
    String::from_utf8_lossy(stderr)
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .map(str::to_string)
}

/// Split argv into program and arguments.
#[track_caller]
pub(crate) fn split_program(argv: &[String]) -> AppResult<(&str, &[String])> {
    match argv.split_first() {
        Some((program, args)) if !program.trim().is_empty() => Ok((program.as_str(), args)),
        _ => Err(AppError::CommandFailed {
            program: String::new(),
            reason: "No program configured".to_string(),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}

/// Run `argv` to completion and return its trimmed stdout.
///
/// `input`, when given, is written to stdin which is then closed. The child
/// is killed if it outlives `limit`.
#[instrument(skip(input, envs), fields(input_len = input.map(str::len)))]
pub(crate) async fn run_command(
    argv: &[String],
    input: Option<&str>,
    envs: &[(&str, &str)],
    limit: Duration,
) -> AppResult<String> {
    let (program, args) = split_program(argv)?;
    let failed = |reason: String| AppError::CommandFailed {
        program: program.to_string(),
        reason,
        location: ErrorLocation::from(Location::caller()),
    };

    let mut child = Command::new(program)
        .args(args)
        .envs(envs.iter().copied())
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| failed(format!("Failed to start: {e}")))?;

    // Written from its own task so a child that fills stdout before draining
    // stdin cannot deadlock the wait below.
    let writer = match (input, child.stdin.take()) {
        (Some(text), Some(mut stdin)) => {
            let text = text.to_string();
            Some(tokio::spawn(async move {
                if let Err(e) = stdin.write_all(text.as_bytes()).await {
                    warn!(error = %e, "Failed to write command input");
                }
            }))
        }
        _ => None,
    };

    let output = tokio::time::timeout(limit, child.wait_with_output())
        .await
        .map_err(|_| failed(format!("Timed out after {}s", limit.as_secs())))?
        .map_err(|e| failed(format!("Failed to wait: {e}")))?;

    if let Some(writer) = writer {
        let _ = writer.await;
    }

    if !output.status.success() {
        let reason = stderr_summary(&output.stderr)
            .map(|line| format!("{} ({line})", output.status))
            .unwrap_or_else(|| output.status.to_string());
        return Err(failed(reason));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    debug!(program, stdout_len = stdout.len(), "Command finished");

    Ok(stdout)
}
