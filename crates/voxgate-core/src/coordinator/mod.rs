mod command;
#[allow(clippy::module_inception)]
mod coordinator;
mod effect;
mod session_input;

pub use {
    command::{
        CapturedAudio, Command, DeviceFault, PipelineStage, StageJob, StopDisposition,
        TranscriptEntry,
    },
    coordinator::SessionCoordinator,
    effect::Effect,
    session_input::{CancelReason, PipelineSignal, SessionInput},
};
