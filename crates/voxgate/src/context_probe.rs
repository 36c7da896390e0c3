//! Foreground application detection at trigger time.
//!
//! Best-effort: each platform asks a stock OS tool, bounded by a short
//! timeout. Any failure yields an unknown context rather than an error.

use std::{process::Stdio, time::Duration};

use tokio::process::Command;
use tracing::{debug, trace};
use voxgate_core::DetectedContext;

/// Upper bound on how long a press may wait for detection.
pub(crate) const PROBE_TIMEOUT: Duration = Duration::from_millis(250);

#[cfg(target_os = "macos")]
const PROBE: (&str, &[&str]) = (
    "osascript",
    &[
        "-e",
        r#"tell application "System Events" to get bundle identifier of first application process whose frontmost is true"#,
    ],
);

#[cfg(target_os = "windows")]
const PROBE: (&str, &[&str]) = (
    "powershell",
    &[
        "-NoProfile",
        "-NonInteractive",
        "-Command",
        r#"Add-Type -Name W -Namespace N -MemberDefinition '[DllImport("user32.dll")] public static extern System.IntPtr GetForegroundWindow(); [DllImport("user32.dll")] public static extern uint GetWindowThreadProcessId(System.IntPtr h, out uint p);'; $p = 0; [void][N.W]::GetWindowThreadProcessId([N.W]::GetForegroundWindow(), [ref]$p); (Get-Process -Id $p).ProcessName"#,
    ],
);

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const PROBE: (&str, &[&str]) = ("xdotool", &["getactivewindow", "getwindowclassname"]);

/// Identify the focused application.
pub async fn detect_foreground_app() -> DetectedContext {
    let (program, args) = PROBE;

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(PROBE_TIMEOUT, output).await {
        Ok(Ok(output)) if output.status.success() => {
            let context = parse_probe_output(&String::from_utf8_lossy(&output.stdout));
            trace!(context = %context, "Foreground application detected");
            context
        }
        Ok(Ok(output)) => {
            debug!(program, status = %output.status, "Foreground probe failed");
            DetectedContext::unknown()
        }
        Ok(Err(e)) => {
            debug!(program, error = %e, "Foreground probe unavailable");
            DetectedContext::unknown()
        }
        Err(_) => {
            debug!(program, "Foreground probe timed out");
            DetectedContext::unknown()
        }
    }
}

/// First non-empty line of the probe output, or unknown.
pub(crate) fn parse_probe_output(stdout: &str) -> DetectedContext {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && *line != "missing value")
        .map(DetectedContext::new)
        .unwrap_or_else(DetectedContext::unknown)
}
