//! Proximity alert domain model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::location::Coordinate;
use super::profile::Gender;

/// Filters a reporting user's profile must satisfy for an alert to fire.
///
/// Every field is optional; an alert with no criteria is distance-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_age_range"))]
pub struct AlertCriteria {
    #[validate(range(min = 18, max = 120, message = "Minimum age must be between 18 and 120"))]
    pub min_age: Option<i32>,

    #[validate(range(min = 18, max = 120, message = "Maximum age must be between 18 and 120"))]
    pub max_age: Option<i32>,

    pub gender: Option<Gender>,

    #[serde(default)]
    #[validate(
        length(max = 20, message = "At most 20 interests are allowed"),
        custom(function = "shared::validation::validate_tags")
    )]
    pub interests: Vec<String>,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Activity intent must be between 1 and 50 characters"
    ))]
    pub activity_intent: Option<String>,

    #[validate(range(
        min = 0,
        max = 100,
        message = "Minimum trust score must be between 0 and 100"
    ))]
    pub min_trust_score: Option<i32>,
}

fn validate_age_range(criteria: &AlertCriteria) -> Result<(), ValidationError> {
    match (criteria.min_age, criteria.max_age) {
        (Some(min), Some(max)) if min > max => {
            let mut err = ValidationError::new("age_range");
            err.message = Some("Minimum age cannot exceed maximum age".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

impl AlertCriteria {
    /// Returns true if no criterion is configured.
    pub fn is_empty(&self) -> bool {
        self.min_age.is_none()
            && self.max_age.is_none()
            && self.gender.is_none()
            && self.interests.is_empty()
            && self.activity_intent.is_none()
            && self.min_trust_score.is_none()
    }

    /// Normalizes free-form tags (trimmed, lowercase, deduplicated, order kept).
    pub fn normalized(mut self) -> Self {
        let mut seen = Vec::with_capacity(self.interests.len());
        for interest in &self.interests {
            let tag = shared::validation::normalize_tag(interest);
            if !tag.is_empty() && !seen.contains(&tag) {
                seen.push(tag);
            }
        }
        self.interests = seen;
        self.activity_intent = self
            .activity_intent
            .map(|intent| shared::validation::normalize_tag(&intent))
            .filter(|intent| !intent.is_empty());
        self
    }
}

/// A standing watch over a circular area, owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityAlert {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: Option<String>,
    pub center: Coordinate,
    /// Geohash cell of `center`, used for spatial pre-filtering.
    pub center_geohash: String,
    pub radius_meters: i32,
    pub criteria: AlertCriteria,
    pub cooldown_minutes: i32,
    pub max_triggers_per_day: i32,
    pub triggers_today: i32,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProximityAlert {
    pub fn cooldown(&self) -> Duration {
        Duration::minutes(i64::from(self.cooldown_minutes))
    }

    /// Returns true while the alert's last trigger is younger than its cooldown.
    pub fn is_cooling_down(&self, now: DateTime<Utc>) -> bool {
        self.last_triggered_at
            .map_or(false, |last| now - last < self.cooldown())
    }

    /// Returns true if the daily counter still has room.
    pub fn has_capacity(&self) -> bool {
        self.triggers_today < self.max_triggers_per_day
    }
}

/// Input for inserting a new alert.
#[derive(Debug, Clone)]
pub struct NewProximityAlert {
    pub owner_id: Uuid,
    pub name: Option<String>,
    pub center: Coordinate,
    pub center_geohash: String,
    pub radius_meters: i32,
    pub criteria: AlertCriteria,
    pub cooldown_minutes: i32,
    pub max_triggers_per_day: i32,
    pub is_active: bool,
}

/// Partial update applied by the owner. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct AlertUpdate {
    pub name: Option<String>,
    pub center: Option<(Coordinate, String)>,
    pub radius_meters: Option<i32>,
    pub criteria: Option<AlertCriteria>,
    pub cooldown_minutes: Option<i32>,
    pub max_triggers_per_day: Option<i32>,
    pub is_active: Option<bool>,
}

/// Request payload for creating a proximity alert.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProximityAlertRequest {
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(range(
        min = 50,
        max = 10000,
        message = "Radius must be between 50 and 10000 meters"
    ))]
    pub radius_meters: i32,

    #[serde(default)]
    #[validate(nested)]
    pub criteria: AlertCriteria,

    #[serde(default = "default_cooldown_minutes")]
    #[validate(range(
        min = 1,
        max = 10080,
        message = "Cooldown must be between 1 and 10080 minutes"
    ))]
    pub cooldown_minutes: i32,

    #[serde(default = "default_max_triggers_per_day")]
    #[validate(range(
        min = 1,
        max = 100,
        message = "Max triggers per day must be between 1 and 100"
    ))]
    pub max_triggers_per_day: i32,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_cooldown_minutes() -> i32 {
    60
}

fn default_max_triggers_per_day() -> i32 {
    10
}

/// Default active status for new proximity alerts.
fn default_active() -> bool {
    true
}

/// Request payload for updating a proximity alert (partial update).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_center_pair"))]
pub struct UpdateProximityAlertRequest {
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: Option<f64>,

    #[validate(range(
        min = 50,
        max = 10000,
        message = "Radius must be between 50 and 10000 meters"
    ))]
    pub radius_meters: Option<i32>,

    #[validate(nested)]
    pub criteria: Option<AlertCriteria>,

    #[validate(range(
        min = 1,
        max = 10080,
        message = "Cooldown must be between 1 and 10080 minutes"
    ))]
    pub cooldown_minutes: Option<i32>,

    #[validate(range(
        min = 1,
        max = 100,
        message = "Max triggers per day must be between 1 and 100"
    ))]
    pub max_triggers_per_day: Option<i32>,

    pub is_active: Option<bool>,
}

fn validate_center_pair(request: &UpdateProximityAlertRequest) -> Result<(), ValidationError> {
    if request.latitude.is_some() != request.longitude.is_some() {
        let mut err = ValidationError::new("center_pair");
        err.message = Some("Latitude and longitude must be updated together".into());
        return Err(err);
    }
    Ok(())
}

/// Response payload for proximity alert operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityAlertResponse {
    pub alert_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: i32,
    pub criteria: AlertCriteria,
    pub cooldown_minutes: i32,
    pub max_triggers_per_day: i32,
    pub triggers_today: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProximityAlert> for ProximityAlertResponse {
    fn from(a: ProximityAlert) -> Self {
        Self {
            alert_id: a.id,
            name: a.name,
            latitude: a.center.latitude,
            longitude: a.center.longitude,
            radius_meters: a.radius_meters,
            criteria: a.criteria,
            cooldown_minutes: a.cooldown_minutes,
            max_triggers_per_day: a.max_triggers_per_day,
            triggers_today: a.triggers_today,
            last_triggered_at: a.last_triggered_at,
            is_active: a.is_active,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

/// Response for listing proximity alerts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProximityAlertsResponse {
    pub alerts: Vec<ProximityAlertResponse>,
    pub total: usize,
}
