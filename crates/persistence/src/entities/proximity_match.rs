//! Proximity match entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::ProximityMatch;

/// Database row mapping for the proximity_matches table.
#[derive(Debug, Clone, FromRow)]
pub struct ProximityMatchEntity {
    pub id: Uuid,
    pub alert_id: Uuid,
    pub matched_user_id: Uuid,
    pub distance_meters: f64,
    pub matched_at: DateTime<Utc>,
    pub day_bucket: NaiveDate,
}

impl From<ProximityMatchEntity> for ProximityMatch {
    fn from(entity: ProximityMatchEntity) -> Self {
        Self {
            id: entity.id,
            alert_id: entity.alert_id,
            matched_user_id: entity.matched_user_id,
            distance_meters: entity.distance_meters,
            matched_at: entity.matched_at,
            day_bucket: entity.day_bucket,
        }
    }
}
