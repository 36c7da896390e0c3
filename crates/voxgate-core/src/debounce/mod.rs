mod debounce_gate;

pub use debounce_gate::{DEFAULT_DEBOUNCE_WINDOW, DebounceGate, TriggerKind};
