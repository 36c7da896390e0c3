mod ports;
mod runtime_input;
mod session_runtime;

pub use {
    ports::{CaptureDevice, LevelSink, Pipeline},
    runtime_input::RuntimeInput,
    session_runtime::{INPUT_QUEUE_CAPACITY, RuntimeHandle, SessionRuntime},
};
