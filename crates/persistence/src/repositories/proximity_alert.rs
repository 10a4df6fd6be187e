//! Proximity alert and match repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::{
    AlertUpdate, MatchInsert, NewProximityAlert, NewProximityMatch, ProximityAlert,
    ProximityMatch,
};
use domain::services::{ProximityAlertStore, StoreResult};

use crate::entities::{ProximityAlertEntity, ProximityMatchEntity};
use crate::error::store_error;
use crate::metrics::QueryTimer;

/// Repository for proximity alert database operations.
#[derive(Clone)]
pub struct ProximityAlertRepository {
    pool: PgPool,
}

impl ProximityAlertRepository {
    /// Creates a new proximity alert repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_alerts(rows: Vec<ProximityAlertEntity>) -> StoreResult<Vec<ProximityAlert>> {
    rows.into_iter().map(ProximityAlert::try_from).collect()
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

#[async_trait]
impl ProximityAlertStore for ProximityAlertRepository {
    async fn create_alert(
        &self,
        alert: NewProximityAlert,
        max_per_owner: usize,
    ) -> StoreResult<Option<ProximityAlert>> {
        let timer = QueryTimer::new("create_proximity_alert");
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        // Serializes concurrent creates by the same owner until commit.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(alert.owner_id)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;

        let (owned,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM proximity_alerts WHERE owner_id = $1")
                .bind(alert.owner_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(store_error)?;
        if owned >= max_per_owner as i64 {
            timer.record();
            return Ok(None);
        }

        let gender = alert.criteria.gender.map(|g| g.as_str());
        let entity = sqlx::query_as::<_, ProximityAlertEntity>(
            r#"
            INSERT INTO proximity_alerts (
                owner_id, name, center_latitude, center_longitude, center_geohash,
                radius_meters, min_age, max_age, gender, interests, activity_intent,
                min_trust_score, cooldown_minutes, max_triggers_per_day, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(alert.owner_id)
        .bind(&alert.name)
        .bind(alert.center.latitude)
        .bind(alert.center.longitude)
        .bind(&alert.center_geohash)
        .bind(alert.radius_meters)
        .bind(alert.criteria.min_age)
        .bind(alert.criteria.max_age)
        .bind(gender)
        .bind(&alert.criteria.interests)
        .bind(&alert.criteria.activity_intent)
        .bind(alert.criteria.min_trust_score)
        .bind(alert.cooldown_minutes)
        .bind(alert.max_triggers_per_day)
        .bind(alert.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(store_error)?;

        tx.commit().await.map_err(store_error)?;
        timer.record();

        ProximityAlert::try_from(entity).map(Some)
    }

    async fn find_alert(&self, alert_id: Uuid) -> StoreResult<Option<ProximityAlert>> {
        let timer = QueryTimer::new("find_proximity_alert");
        let result = sqlx::query_as::<_, ProximityAlertEntity>(
            r#"
            SELECT * FROM proximity_alerts
            WHERE id = $1
            "#,
        )
        .bind(alert_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result
            .map_err(store_error)?
            .map(ProximityAlert::try_from)
            .transpose()
    }

    async fn list_alerts_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<ProximityAlert>> {
        let timer = QueryTimer::new("list_proximity_alerts_by_owner");
        let result = sqlx::query_as::<_, ProximityAlertEntity>(
            r#"
            SELECT * FROM proximity_alerts
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        into_alerts(result.map_err(store_error)?)
    }

    async fn update_alert(
        &self,
        alert_id: Uuid,
        update: AlertUpdate,
    ) -> StoreResult<Option<ProximityAlert>> {
        let timer = QueryTimer::new("update_proximity_alert");
        let (latitude, longitude, cell) = match update.center {
            Some((center, cell)) => (Some(center.latitude), Some(center.longitude), Some(cell)),
            None => (None, None, None),
        };
        // Criteria are replaced as a whole, including clearing filters.
        let replace_criteria = update.criteria.is_some();
        let criteria = update.criteria.unwrap_or_default();

        let result = sqlx::query_as::<_, ProximityAlertEntity>(
            r#"
            UPDATE proximity_alerts
            SET
                name = COALESCE($2, name),
                center_latitude = COALESCE($3, center_latitude),
                center_longitude = COALESCE($4, center_longitude),
                center_geohash = COALESCE($5, center_geohash),
                radius_meters = COALESCE($6, radius_meters),
                min_age = CASE WHEN $7 THEN $8 ELSE min_age END,
                max_age = CASE WHEN $7 THEN $9 ELSE max_age END,
                gender = CASE WHEN $7 THEN $10 ELSE gender END,
                interests = CASE WHEN $7 THEN $11 ELSE interests END,
                activity_intent = CASE WHEN $7 THEN $12 ELSE activity_intent END,
                min_trust_score = CASE WHEN $7 THEN $13 ELSE min_trust_score END,
                cooldown_minutes = COALESCE($14, cooldown_minutes),
                max_triggers_per_day = COALESCE($15, max_triggers_per_day),
                triggers_today = LEAST(triggers_today, COALESCE($15, max_triggers_per_day)),
                is_active = COALESCE($16, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(alert_id)
        .bind(&update.name)
        .bind(latitude)
        .bind(longitude)
        .bind(cell)
        .bind(update.radius_meters)
        .bind(replace_criteria)
        .bind(criteria.min_age)
        .bind(criteria.max_age)
        .bind(criteria.gender.map(|g| g.as_str()))
        .bind(&criteria.interests)
        .bind(&criteria.activity_intent)
        .bind(criteria.min_trust_score)
        .bind(update.cooldown_minutes)
        .bind(update.max_triggers_per_day)
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result
            .map_err(store_error)?
            .map(ProximityAlert::try_from)
            .transpose()
    }

    async fn delete_alert(&self, alert_id: Uuid) -> StoreResult<bool> {
        let timer = QueryTimer::new("delete_proximity_alert");
        // proximity_matches rows go with it via ON DELETE CASCADE.
        let result = sqlx::query(
            r#"
            DELETE FROM proximity_alerts
            WHERE id = $1
            "#,
        )
        .bind(alert_id)
        .execute(&self.pool)
        .await;
        timer.record();

        Ok(result.map_err(store_error)?.rows_affected() > 0)
    }

    async fn list_active_alerts_excluding(
        &self,
        owner_id: Uuid,
        cells: Option<&[String]>,
    ) -> StoreResult<Vec<ProximityAlert>> {
        let timer = QueryTimer::new("list_active_proximity_alerts");
        let result = match cells {
            Some(cells) => {
                sqlx::query_as::<_, ProximityAlertEntity>(
                    r#"
                    SELECT * FROM proximity_alerts
                    WHERE is_active = TRUE
                      AND owner_id <> $1
                      AND triggers_today < max_triggers_per_day
                      AND center_geohash = ANY($2)
                    "#,
                )
                .bind(owner_id)
                .bind(cells)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, ProximityAlertEntity>(
                    r#"
                    SELECT * FROM proximity_alerts
                    WHERE is_active = TRUE
                      AND owner_id <> $1
                      AND triggers_today < max_triggers_per_day
                    "#,
                )
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await
            }
        };
        timer.record();

        into_alerts(result.map_err(store_error)?)
    }

    async fn has_recent_match(
        &self,
        alert_id: Uuid,
        matched_user_id: Uuid,
        since: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let timer = QueryTimer::new("has_recent_proximity_match");
        let result: Result<(bool,), sqlx::Error> = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM proximity_matches
                WHERE alert_id = $1 AND matched_user_id = $2 AND matched_at >= $3
            )
            "#,
        )
        .bind(alert_id)
        .bind(matched_user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(result.map_err(store_error)?.0)
    }

    async fn record_match_if_absent(
        &self,
        new_match: NewProximityMatch,
        dedup_since: DateTime<Utc>,
    ) -> StoreResult<MatchInsert> {
        let timer = QueryTimer::new("record_proximity_match");
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text || ':' || $2::text, 0))")
            .bind(new_match.alert_id)
            .bind(new_match.matched_user_id)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;

        let (recent,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM proximity_matches
                WHERE alert_id = $1 AND matched_user_id = $2 AND matched_at >= $3
            )
            "#,
        )
        .bind(new_match.alert_id)
        .bind(new_match.matched_user_id)
        .bind(dedup_since)
        .fetch_one(&mut *tx)
        .await
        .map_err(store_error)?;
        if recent {
            timer.record();
            return Ok(MatchInsert::Duplicate);
        }

        let inserted = sqlx::query_as::<_, ProximityMatchEntity>(
            r#"
            INSERT INTO proximity_matches (alert_id, matched_user_id, distance_meters, matched_at, day_bucket)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (alert_id, matched_user_id, day_bucket) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(new_match.alert_id)
        .bind(new_match.matched_user_id)
        .bind(new_match.distance_meters)
        .bind(new_match.matched_at)
        .bind(new_match.day_bucket())
        .fetch_optional(&mut *tx)
        .await;

        let entity = match inserted {
            Ok(Some(entity)) => entity,
            Ok(None) => {
                timer.record();
                return Ok(MatchInsert::Duplicate);
            }
            Err(e) if is_foreign_key_violation(&e) => {
                tracing::debug!(alert_id = %new_match.alert_id, "Alert deleted before match was recorded");
                timer.record();
                return Ok(MatchInsert::AlertUnavailable);
            }
            Err(e) => return Err(store_error(e)),
        };

        // Claim the trigger slot; losing here rolls back the insert.
        let claimed = sqlx::query(
            r#"
            UPDATE proximity_alerts
            SET triggers_today = triggers_today + 1,
                last_triggered_at = $2
            WHERE id = $1
              AND is_active = TRUE
              AND triggers_today < max_triggers_per_day
              AND (last_triggered_at IS NULL
                   OR last_triggered_at + cooldown_minutes * INTERVAL '1 minute' <= $2)
            "#,
        )
        .bind(new_match.alert_id)
        .bind(new_match.matched_at)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;

        if claimed.rows_affected() == 0 {
            tx.rollback().await.map_err(store_error)?;
            timer.record();
            return Ok(MatchInsert::AlertUnavailable);
        }

        tx.commit().await.map_err(store_error)?;
        timer.record();
        Ok(MatchInsert::Inserted(entity.into()))
    }

    async fn list_matches(&self, alert_id: Uuid) -> StoreResult<Vec<ProximityMatch>> {
        let timer = QueryTimer::new("list_proximity_matches");
        let result = sqlx::query_as::<_, ProximityMatchEntity>(
            r#"
            SELECT * FROM proximity_matches
            WHERE alert_id = $1
            ORDER BY matched_at DESC
            "#,
        )
        .bind(alert_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(result
            .map_err(store_error)?
            .into_iter()
            .map(ProximityMatch::from)
            .collect())
    }

    async fn reset_daily_counters(&self) -> StoreResult<u64> {
        let timer = QueryTimer::new("reset_proximity_daily_counters");
        let result = sqlx::query(
            r#"
            UPDATE proximity_alerts
            SET triggers_today = 0
            WHERE triggers_today <> 0
            "#,
        )
        .execute(&self.pool)
        .await;
        timer.record();

        Ok(result.map_err(store_error)?.rows_affected())
    }
}
