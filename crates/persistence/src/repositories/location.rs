//! User location state repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::geo::{self, LongitudeRange};
use domain::models::{Coordinate, UserLocationState, VisibilityLevel};
use domain::services::{LocationStore, StoreResult};

use crate::entities::UserLocationEntity;
use crate::error::store_error;
use crate::metrics::QueryTimer;

/// Repository for the user_locations table.
#[derive(Clone)]
pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    /// Creates a new LocationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_states(rows: Vec<UserLocationEntity>) -> StoreResult<Vec<UserLocationState>> {
    rows.into_iter().map(UserLocationState::try_from).collect()
}

#[async_trait]
impl LocationStore for LocationRepository {
    async fn find_location_state(&self, user_id: Uuid) -> StoreResult<Option<UserLocationState>> {
        let timer = QueryTimer::new("find_location_state");
        let result = sqlx::query_as::<_, UserLocationEntity>(
            r#"
            SELECT * FROM user_locations WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result
            .map_err(store_error)?
            .map(UserLocationState::try_from)
            .transpose()
    }

    async fn upsert_location(
        &self,
        user_id: Uuid,
        coord: Coordinate,
        now: DateTime<Utc>,
    ) -> StoreResult<UserLocationState> {
        let timer = QueryTimer::new("upsert_location");
        // An expired beacon is rewritten to discoverable as part of the owner's write.
        let result = sqlx::query_as::<_, UserLocationEntity>(
            r#"
            INSERT INTO user_locations (user_id, latitude, longitude, visibility_level, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                updated_at = EXCLUDED.updated_at,
                visibility_level = CASE
                    WHEN user_locations.visibility_level = 'beacon'
                         AND (user_locations.beacon_expires_at IS NULL
                              OR user_locations.beacon_expires_at < EXCLUDED.updated_at)
                    THEN 'discoverable'
                    ELSE user_locations.visibility_level
                END,
                beacon_expires_at = CASE
                    WHEN user_locations.visibility_level = 'beacon'
                         AND (user_locations.beacon_expires_at IS NULL
                              OR user_locations.beacon_expires_at < EXCLUDED.updated_at)
                    THEN NULL
                    ELSE user_locations.beacon_expires_at
                END
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(coord.latitude)
        .bind(coord.longitude)
        .bind(VisibilityLevel::default().as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        UserLocationState::try_from(result.map_err(store_error)?)
    }

    async fn set_visibility(
        &self,
        user_id: Uuid,
        level: VisibilityLevel,
        beacon_expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> StoreResult<UserLocationState> {
        let timer = QueryTimer::new("set_visibility");
        let result = sqlx::query_as::<_, UserLocationEntity>(
            r#"
            INSERT INTO user_locations (user_id, visibility_level, beacon_expires_at, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                visibility_level = EXCLUDED.visibility_level,
                beacon_expires_at = EXCLUDED.beacon_expires_at,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(level.as_str())
        .bind(beacon_expires_at)
        .bind(now)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        UserLocationState::try_from(result.map_err(store_error)?)
    }

    async fn list_located_within(
        &self,
        center: Coordinate,
        radius_meters: f64,
    ) -> StoreResult<Vec<UserLocationState>> {
        let bbox = geo::bounding_box(center, radius_meters);
        let timer = QueryTimer::new("list_located_within");

        let result = match bbox.longitude {
            LongitudeRange::Any => {
                sqlx::query_as::<_, UserLocationEntity>(
                    r#"
                    SELECT * FROM user_locations
                    WHERE latitude BETWEEN $1 AND $2
                      AND longitude IS NOT NULL
                    "#,
                )
                .bind(bbox.min_latitude)
                .bind(bbox.max_latitude)
                .fetch_all(&self.pool)
                .await
            }
            LongitudeRange::Span { min, max } => {
                sqlx::query_as::<_, UserLocationEntity>(
                    r#"
                    SELECT * FROM user_locations
                    WHERE latitude BETWEEN $1 AND $2
                      AND longitude BETWEEN $3 AND $4
                    "#,
                )
                .bind(bbox.min_latitude)
                .bind(bbox.max_latitude)
                .bind(min)
                .bind(max)
                .fetch_all(&self.pool)
                .await
            }
            LongitudeRange::Wrapped { west, east } => {
                sqlx::query_as::<_, UserLocationEntity>(
                    r#"
                    SELECT * FROM user_locations
                    WHERE latitude BETWEEN $1 AND $2
                      AND (longitude >= $3 OR longitude <= $4)
                    "#,
                )
                .bind(bbox.min_latitude)
                .bind(bbox.max_latitude)
                .bind(west)
                .bind(east)
                .fetch_all(&self.pool)
                .await
            }
        };
        timer.record();

        into_states(result.map_err(store_error)?)
    }
}
