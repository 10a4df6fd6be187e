//! User location state domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::visibility::VisibilityLevel;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns true if both components are finite and within WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        shared::validation::validate_latitude(self.latitude).is_ok()
            && shared::validation::validate_longitude(self.longitude).is_ok()
    }
}

/// The last known position and disclosure policy of a user.
///
/// One row per user, written only by that user's own requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocationState {
    pub user_id: Uuid,
    /// `None` until the first location report.
    pub location: Option<Coordinate>,
    pub visibility_level: VisibilityLevel,
    pub beacon_expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl UserLocationState {
    /// Creates the state for a user that has never written before.
    pub fn new(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            location: None,
            visibility_level: VisibilityLevel::default(),
            beacon_expires_at: None,
            updated_at: now,
        }
    }

    /// Returns true if the stored level is beacon and its expiry has passed.
    pub fn is_beacon_expired(&self, now: DateTime<Utc>) -> bool {
        self.visibility_level == VisibilityLevel::Beacon
            && self.beacon_expires_at.map_or(true, |expires| now > expires)
    }

    /// The level that applies at `now`, with beacon expiry applied lazily.
    pub fn effective_level(&self, now: DateTime<Utc>) -> VisibilityLevel {
        if self.is_beacon_expired(now) {
            VisibilityLevel::Discoverable
        } else {
            self.visibility_level
        }
    }

    /// Rewrites an expired beacon to discoverable. Returns true if anything changed.
    ///
    /// Only called on the owner's write paths; reads use [`Self::effective_level`].
    pub fn correct_expired_beacon(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_beacon_expired(now) {
            self.visibility_level = VisibilityLevel::Discoverable;
            self.beacon_expires_at = None;
            true
        } else {
            false
        }
    }
}

/// Request payload for reporting the caller's current location.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReportLocationRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,
}

impl ReportLocationRequest {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Response payload for a location report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLocationResponse {
    pub success: bool,
    pub processed_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn beacon_state(expires_at: DateTime<Utc>) -> UserLocationState {
        UserLocationState {
            user_id: Uuid::new_v4(),
            location: Some(Coordinate::new(37.7749, -122.4194)),
            visibility_level: VisibilityLevel::Beacon,
            beacon_expires_at: Some(expires_at),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(Coordinate::new(37.7749, -122.4194).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_new_state_has_no_location() {
        let state = UserLocationState::new(Uuid::new_v4(), Utc::now());
        assert!(state.location.is_none());
        assert_eq!(state.visibility_level, VisibilityLevel::Circles);
    }

    #[test]
    fn test_active_beacon_keeps_level() {
        let now = Utc::now();
        let state = beacon_state(now + Duration::minutes(10));
        assert!(!state.is_beacon_expired(now));
        assert_eq!(state.effective_level(now), VisibilityLevel::Beacon);
    }

    #[test]
    fn test_expired_beacon_reads_as_discoverable_without_mutation() {
        let now = Utc::now();
        let state = beacon_state(now - Duration::minutes(1));
        assert_eq!(state.effective_level(now), VisibilityLevel::Discoverable);
        assert_eq!(state.visibility_level, VisibilityLevel::Beacon);
    }

    #[test]
    fn test_correct_expired_beacon() {
        let now = Utc::now();
        let mut state = beacon_state(now - Duration::minutes(1));
        assert!(state.correct_expired_beacon(now));
        assert_eq!(state.visibility_level, VisibilityLevel::Discoverable);
        assert!(state.beacon_expires_at.is_none());
        assert!(!state.correct_expired_beacon(now));
    }

    #[test]
    fn test_report_location_request_validation() {
        let ok: ReportLocationRequest =
            serde_json::from_str(r#"{"latitude": 37.7749, "longitude": -122.4194}"#).unwrap();
        assert!(ok.validate().is_ok());

        let bad: ReportLocationRequest =
            serde_json::from_str(r#"{"latitude": 137.0, "longitude": -122.4194}"#).unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_report_location_response_serialization() {
        let response = ReportLocationResponse {
            success: true,
            processed_count: 1,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"processedCount\":1"));
    }
}
