//! Read-only queries over circles and connections.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use domain::services::{SocialGraph, StoreResult};

use crate::error::store_error;
use crate::metrics::QueryTimer;

/// Repository for the circle_members and connections tables.
#[derive(Clone)]
pub struct SocialGraphRepository {
    pool: PgPool,
}

impl SocialGraphRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SocialGraph for SocialGraphRepository {
    async fn circle_comembers(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let timer = QueryTimer::new("circle_comembers");
        let result: Result<Vec<(Uuid,)>, sqlx::Error> = sqlx::query_as(
            r#"
            SELECT DISTINCT other.user_id
            FROM circle_members mine
            JOIN circle_members other ON other.circle_id = mine.circle_id
            WHERE mine.user_id = $1 AND other.user_id <> $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(result
            .map_err(store_error)?
            .into_iter()
            .map(|(id,)| id)
            .collect())
    }

    async fn accepted_connections(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let timer = QueryTimer::new("accepted_connections");
        let result: Result<Vec<(Uuid,)>, sqlx::Error> = sqlx::query_as(
            r#"
            SELECT CASE WHEN user_a_id = $1 THEN user_b_id ELSE user_a_id END
            FROM connections
            WHERE (user_a_id = $1 OR user_b_id = $1) AND status = 'accepted'
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(result
            .map_err(store_error)?
            .into_iter()
            .map(|(id,)| id)
            .collect())
    }

    async fn are_circle_comembers(&self, a: Uuid, b: Uuid) -> StoreResult<bool> {
        let timer = QueryTimer::new("are_circle_comembers");
        let result: Result<(bool,), sqlx::Error> = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM circle_members mine
                JOIN circle_members other ON other.circle_id = mine.circle_id
                WHERE mine.user_id = $1 AND other.user_id = $2 AND $1 <> $2
            )
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(result.map_err(store_error)?.0)
    }

    async fn are_connected(&self, a: Uuid, b: Uuid) -> StoreResult<bool> {
        let timer = QueryTimer::new("are_connected");
        let result: Result<(bool,), sqlx::Error> = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM connections
                WHERE status = 'accepted'
                  AND ((user_a_id = $1 AND user_b_id = $2)
                       OR (user_a_id = $2 AND user_b_id = $1))
            )
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(result.map_err(store_error)?.0)
    }
}
