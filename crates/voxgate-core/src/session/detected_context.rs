use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of the foreground application at trigger time.
///
/// Captured once when recording starts and handed unchanged to every
/// pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DetectedContext(Option<String>);

impl DetectedContext {
    /// Context for a known application identifier.
    pub fn new(app_id: impl Into<String>) -> Self {
        Self(Some(app_id.into()))
    }

    /// Context when the foreground application could not be determined.
    pub fn unknown() -> Self {
        Self(None)
    }

    /// The application identifier, if known.
    pub fn app_id(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl fmt::Display for DetectedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.app_id().unwrap_or("unknown"))
    }
}
