//! Proximity match (trigger history) domain model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One recorded trigger of an alert by a matched user. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityMatch {
    pub id: Uuid,
    pub alert_id: Uuid,
    pub matched_user_id: Uuid,
    pub distance_meters: f64,
    pub matched_at: DateTime<Utc>,
    /// UTC calendar date of `matched_at`.
    pub day_bucket: NaiveDate,
}

/// Input for recording a match.
#[derive(Debug, Clone)]
pub struct NewProximityMatch {
    pub alert_id: Uuid,
    pub matched_user_id: Uuid,
    pub distance_meters: f64,
    pub matched_at: DateTime<Utc>,
}

impl NewProximityMatch {
    pub fn day_bucket(&self) -> NaiveDate {
        self.matched_at.date_naive()
    }
}

/// Outcome of an attempt to record a match and claim the alert's trigger slot.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchInsert {
    /// The match was stored and the alert's counter was advanced.
    Inserted(ProximityMatch),
    /// A match for the pair already exists within the dedup window.
    Duplicate,
    /// The alert is gone, inactive, cooling down or out of daily triggers.
    AlertUnavailable,
}

impl MatchInsert {
    pub fn inserted(self) -> Option<ProximityMatch> {
        match self {
            MatchInsert::Inserted(m) => Some(m),
            _ => None,
        }
    }
}

/// Response payload for a single match.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityMatchResponse {
    pub match_id: Uuid,
    pub alert_id: Uuid,
    pub matched_user_id: Uuid,
    pub distance_meters: f64,
    pub matched_at: DateTime<Utc>,
}

impl From<ProximityMatch> for ProximityMatchResponse {
    fn from(m: ProximityMatch) -> Self {
        Self {
            match_id: m.id,
            alert_id: m.alert_id,
            matched_user_id: m.matched_user_id,
            distance_meters: m.distance_meters.round(),
            matched_at: m.matched_at,
        }
    }
}

/// Response for listing an alert's matches, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProximityMatchesResponse {
    pub matches: Vec<ProximityMatchResponse>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_bucket_is_utc_date() {
        let new_match = NewProximityMatch {
            alert_id: Uuid::new_v4(),
            matched_user_id: Uuid::new_v4(),
            distance_meters: 47.3,
            matched_at: Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 59).unwrap(),
        };
        assert_eq!(
            new_match.day_bucket(),
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
        );
    }

    #[test]
    fn test_inserted_helper() {
        assert!(MatchInsert::Duplicate.inserted().is_none());
        assert!(MatchInsert::AlertUnavailable.inserted().is_none());
    }

    #[test]
    fn test_response_rounds_distance() {
        let now = Utc::now();
        let response: ProximityMatchResponse = ProximityMatch {
            id: Uuid::new_v4(),
            alert_id: Uuid::new_v4(),
            matched_user_id: Uuid::new_v4(),
            distance_meters: 46.7,
            matched_at: now,
            day_bucket: now.date_naive(),
        }
        .into();
        assert_eq!(response.distance_meters, 47.0);
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"matchedUserId\""));
        assert!(!json.contains("dayBucket"));
    }
}
