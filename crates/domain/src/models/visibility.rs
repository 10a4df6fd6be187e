//! Visibility levels and resolver results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::location::Coordinate;

/// Disclosure policy a user sets for their own location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityLevel {
    /// Hidden from everyone.
    Ghost,
    /// Visible to circle co-members only.
    #[default]
    Circles,
    /// Visible to everyone in range; blurred for anyone outside the user's circles.
    Fuzzy,
    /// Visible to circle co-members and accepted connections.
    Social,
    /// Visible to everyone in range.
    Discoverable,
    /// Time-boxed discoverable override.
    Beacon,
}

impl VisibilityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityLevel::Ghost => "ghost",
            VisibilityLevel::Circles => "circles",
            VisibilityLevel::Fuzzy => "fuzzy",
            VisibilityLevel::Social => "social",
            VisibilityLevel::Discoverable => "discoverable",
            VisibilityLevel::Beacon => "beacon",
        }
    }
}

impl fmt::Display for VisibilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VisibilityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ghost" => Ok(VisibilityLevel::Ghost),
            "circles" => Ok(VisibilityLevel::Circles),
            "fuzzy" => Ok(VisibilityLevel::Fuzzy),
            "social" => Ok(VisibilityLevel::Social),
            "discoverable" => Ok(VisibilityLevel::Discoverable),
            "beacon" => Ok(VisibilityLevel::Beacon),
            _ => Err(format!("Invalid visibility level: {}", s)),
        }
    }
}

/// Location precision granted to an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Exact,
    Approximate,
}

/// Outcome of resolving one candidate for one observer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityDecision {
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<Precision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<Coordinate>,
}

impl VisibilityDecision {
    pub fn hidden() -> Self {
        Self {
            visible: false,
            precision: None,
            coordinate: None,
        }
    }

    pub fn visible(precision: Precision, coordinate: Coordinate) -> Self {
        Self {
            visible: true,
            precision: Some(precision),
            coordinate: Some(coordinate),
        }
    }
}

/// A user returned by the nearby listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleUser {
    pub user_id: Uuid,
    pub coordinate: Coordinate,
    pub precision: Precision,
    /// Distance from the observer to the returned (possibly blurred) coordinate.
    pub distance_meters: f64,
}

/// Response for the nearby listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyUsersResponse {
    pub users: Vec<VisibleUser>,
    pub total: usize,
}

/// Query parameters for visibility lookups centered on the observer.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(range(
        exclusive_min = 0.0,
        max = 50000.0,
        message = "Radius must be greater than 0 and at most 50000 meters"
    ))]
    pub radius_meters: f64,
}

impl NearbyQuery {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Request payload for changing the caller's visibility level.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetVisibilityRequest {
    pub level: VisibilityLevel,

    #[validate(range(
        min = 1,
        max = 1440,
        message = "Beacon duration must be between 1 and 1440 minutes"
    ))]
    pub beacon_duration_minutes: Option<i64>,
}

/// Effective visibility settings of a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilitySettingsResponse {
    pub level: VisibilityLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beacon_expires_at: Option<DateTime<Utc>>,
}
