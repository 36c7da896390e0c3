use voxgate_core::IndicatorPhase;

/// Tray icon states corresponding to the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayIconState {
    /// Ready to start recording.
    Idle,
    /// Currently recording audio.
    Recording,
    /// Transcribing, improving or delivering.
    Processing,
    /// The last session failed.
    Error,
}

impl TrayIconState {
    /// Icon state for an indicator phase.
    ///
    /// Done and Cancelled show as Idle: the session is over and nothing
    /// needs attention.
    pub fn from_phase(phase: IndicatorPhase) -> Self {
        match phase {
            IndicatorPhase::Recording => Self::Recording,
            IndicatorPhase::Processing
            | IndicatorPhase::Transcribing
            | IndicatorPhase::Improving => Self::Processing,
            IndicatorPhase::Error => Self::Error,
            IndicatorPhase::Hidden | IndicatorPhase::Done | IndicatorPhase::Cancelled => {
                Self::Idle
            }
        }
    }

    /// Hover text.
    pub fn tooltip(&self) -> &'static str {
        match self {
            Self::Idle => "Voxgate - Ready",
            Self::Recording => "Voxgate - Recording...",
            Self::Processing => "Voxgate - Transcribing...",
            Self::Error => "Voxgate - Error",
        }
    }

    /// Fill color of the generated icon (RGBA).
    pub(crate) fn color(&self) -> [u8; 4] {
        match self {
            Self::Idle => [0x8e, 0x8e, 0x93, 0xff],
            Self::Recording => [0xff, 0x3b, 0x30, 0xff],
            Self::Processing => [0xff, 0x95, 0x00, 0xff],
            Self::Error => [0xaf, 0x52, 0xde, 0xff],
        }
    }
}
