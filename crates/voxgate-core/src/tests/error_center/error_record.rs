use crate::{CoreError, ErrorCategory, ErrorRecord};

use std::panic::Location;

use error_location::ErrorLocation;

/// WHAT: Records built from core errors describe the failure without its source location
/// WHY: Source locations belong in logs, not in text shown to the user
#[test]
fn given_capture_error_when_converted_to_record_then_details_have_no_location() {
    // Given: A capture error carrying a source location
    let location = Location::caller();
    let error = CoreError::CaptureFailed {
        reason: "microphone in use".to_string(),
        location: ErrorLocation::from(location),
    };

    // When: It becomes a record
    let record =
        ErrorRecord::from_core("capture_start_failed", ErrorCategory::Transient, "capture", &error);

    // Then: Details name the failure kind only
    assert_eq!(record.message, "microphone in use");
    assert_eq!(record.details.as_deref(), Some("Capture failed: microphone in use"));
    assert!(
        record
            .details
            .as_deref()
            .is_some_and(|details| !details.contains(location.file()))
    );
}
