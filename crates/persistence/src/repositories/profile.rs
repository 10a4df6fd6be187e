//! Profile and subscription read models.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::UserProfileSnapshot;
use domain::services::{EntitlementService, ProfileProvider, StoreResult};

use crate::entities::UserProfileEntity;
use crate::error::store_error;
use crate::metrics::QueryTimer;

/// Repository for the user_profiles table.
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileProvider for ProfileRepository {
    async fn get_profile_snapshot(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Option<UserProfileSnapshot>> {
        let timer = QueryTimer::new("get_profile_snapshot");
        let result = sqlx::query_as::<_, UserProfileEntity>(
            r#"
            SELECT user_id, age, gender, interests, trust_score, activity_intent
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result
            .map_err(store_error)?
            .map(UserProfileSnapshot::try_from)
            .transpose()
    }
}

/// Repository for the subscriptions table.
#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntitlementService for SubscriptionRepository {
    async fn is_premium(&self, user_id: Uuid) -> StoreResult<bool> {
        let timer = QueryTimer::new("is_premium");
        let result: Result<(bool,), sqlx::Error> = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM subscriptions
                WHERE user_id = $1
                  AND tier = 'premium'
                  AND (expires_at IS NULL OR expires_at > NOW())
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(result.map_err(store_error)?.0)
    }
}
