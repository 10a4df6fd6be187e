//! Proximity alert entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{AlertCriteria, Coordinate, Gender, ProximityAlert};
use domain::StoreError;

/// Database row mapping for the proximity_alerts table.
///
/// Criteria are stored as one nullable column per filter.
#[derive(Debug, Clone, FromRow)]
pub struct ProximityAlertEntity {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: Option<String>,
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub center_geohash: String,
    pub radius_meters: i32,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub gender: Option<String>,
    pub interests: Vec<String>, // TEXT[]
    pub activity_intent: Option<String>,
    pub min_trust_score: Option<i32>,
    pub cooldown_minutes: i32,
    pub max_triggers_per_day: i32,
    pub triggers_today: i32,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProximityAlertEntity> for ProximityAlert {
    type Error = StoreError;

    fn try_from(entity: ProximityAlertEntity) -> Result<Self, Self::Error> {
        let gender = entity
            .gender
            .as_deref()
            .map(str::parse::<Gender>)
            .transpose()
            .map_err(StoreError::InvalidData)?;

        Ok(Self {
            id: entity.id,
            owner_id: entity.owner_id,
            name: entity.name,
            center: Coordinate::new(entity.center_latitude, entity.center_longitude),
            center_geohash: entity.center_geohash,
            radius_meters: entity.radius_meters,
            criteria: AlertCriteria {
                min_age: entity.min_age,
                max_age: entity.max_age,
                gender,
                interests: entity.interests,
                activity_intent: entity.activity_intent,
                min_trust_score: entity.min_trust_score,
            },
            cooldown_minutes: entity.cooldown_minutes,
            max_triggers_per_day: entity.max_triggers_per_day,
            triggers_today: entity.triggers_today,
            last_triggered_at: entity.last_triggered_at,
            is_active: entity.is_active,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}
