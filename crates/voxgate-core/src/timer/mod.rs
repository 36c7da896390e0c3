mod timer_kind;
mod timer_set;

pub use {
    timer_kind::{TimerKind, TimerSchedule},
    timer_set::{Generation, TimerFire, TimerHandle, TimerSet},
};
