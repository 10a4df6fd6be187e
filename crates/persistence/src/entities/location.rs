//! User location state entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{Coordinate, UserLocationState, VisibilityLevel};
use domain::StoreError;

/// Database row mapping for the user_locations table.
#[derive(Debug, Clone, FromRow)]
pub struct UserLocationEntity {
    pub user_id: Uuid,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub visibility_level: String,
    pub beacon_expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserLocationEntity> for UserLocationState {
    type Error = StoreError;

    fn try_from(entity: UserLocationEntity) -> Result<Self, Self::Error> {
        let visibility_level: VisibilityLevel = entity
            .visibility_level
            .parse()
            .map_err(StoreError::InvalidData)?;
        let location = match (entity.latitude, entity.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinate::new(latitude, longitude)),
            _ => None,
        };
        Ok(Self {
            user_id: entity.user_id,
            location,
            visibility_level,
            beacon_expires_at: entity.beacon_expires_at,
            updated_at: entity.updated_at,
        })
    }
}
