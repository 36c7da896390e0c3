mod detected_context;
#[allow(clippy::module_inception)]
mod session;
mod session_config;
mod session_state;

pub use {
    detected_context::DetectedContext,
    session::{Session, SessionId},
    session_config::{
        CANCELLED_DISPLAY_TIMEOUT, DONE_DISPLAY_TIMEOUT, DURATION_TICK, ERROR_DISPLAY_TIMEOUT,
        HEALTH_POLL_PERIOD, SessionConfig, ShortcutMode, WARNING_LEAD,
    },
    session_state::SessionState,
};
