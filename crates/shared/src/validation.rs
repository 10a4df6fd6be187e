//! Common validation utilities.

use validator::ValidationError;

/// Maximum length of a single interest tag.
const MAX_TAG_LENGTH: usize = 50;

/// Validates that a latitude value is finite and within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if lat.is_finite() && (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is finite and within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if lon.is_finite() && (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates a list of interest tags: each must be non-blank and at most 50 characters.
pub fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_TAG_LENGTH {
            let mut err = ValidationError::new("tag_length");
            err.message = Some("Interests must be between 1 and 50 characters".into());
            return Err(err);
        }
    }
    Ok(())
}

/// Normalizes a free-form tag for comparison (trimmed, lowercase).
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}
