mod level_throttle;
mod status_bus;
mod status_event;
mod status_mirror;

pub use {
    level_throttle::{LEVEL_INTERVAL, LevelThrottle},
    status_bus::{DEFAULT_BUS_CAPACITY, StatusBus, StatusSubscription},
    status_event::StatusEvent,
    status_mirror::{HideDelays, IndicatorPhase, StatusMirror},
};
