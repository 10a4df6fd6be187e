//! Storage and collaborator traits consumed by the domain services.
//!
//! Implementations live in the persistence crate (PostgreSQL) and in
//! [`super::memory`] (in-process). Every method is atomic on its own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    AlertUpdate, Coordinate, MatchInsert, NewProximityAlert, NewProximityMatch, ProximityAlert,
    ProximityMatch, UserLocationState, UserProfileSnapshot, VisibilityLevel,
};

pub type StoreResult<T> = Result<T, StoreError>;

/// Per-user location and visibility state.
#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn find_location_state(&self, user_id: Uuid) -> StoreResult<Option<UserLocationState>>;

    /// Records a new position, creating the state on first report.
    ///
    /// An expired beacon is rewritten to discoverable in the same write.
    async fn upsert_location(
        &self,
        user_id: Uuid,
        coord: Coordinate,
        now: DateTime<Utc>,
    ) -> StoreResult<UserLocationState>;

    /// Sets the visibility level, creating the state without a location if needed.
    async fn set_visibility(
        &self,
        user_id: Uuid,
        level: VisibilityLevel,
        beacon_expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> StoreResult<UserLocationState>;

    /// States with a location inside the bounding box of the circle around `center`.
    ///
    /// May return users slightly outside the radius; callers filter by exact distance.
    async fn list_located_within(
        &self,
        center: Coordinate,
        radius_meters: f64,
    ) -> StoreResult<Vec<UserLocationState>>;
}

/// Read-only view of circles and connections.
#[async_trait]
pub trait SocialGraph: Send + Sync {
    /// Users sharing at least one circle with `user_id`, excluding the user.
    async fn circle_comembers(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>>;

    /// Users with an accepted connection to `user_id`.
    async fn accepted_connections(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>>;

    async fn are_circle_comembers(&self, a: Uuid, b: Uuid) -> StoreResult<bool>;

    async fn are_connected(&self, a: Uuid, b: Uuid) -> StoreResult<bool>;
}

/// Durable alerts, matches and daily trigger counters.
#[async_trait]
pub trait ProximityAlertStore: Send + Sync {
    /// Inserts the alert unless the owner already has `max_per_owner` alerts.
    ///
    /// Returns `None` when the cap is reached. The count and insert are atomic.
    async fn create_alert(
        &self,
        alert: NewProximityAlert,
        max_per_owner: usize,
    ) -> StoreResult<Option<ProximityAlert>>;

    async fn find_alert(&self, alert_id: Uuid) -> StoreResult<Option<ProximityAlert>>;

    async fn list_alerts_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<ProximityAlert>>;

    /// Applies a partial update. Lowering the daily cap clamps `triggers_today`.
    async fn update_alert(
        &self,
        alert_id: Uuid,
        update: AlertUpdate,
    ) -> StoreResult<Option<ProximityAlert>>;

    /// Deletes the alert and its matches. Returns false if it did not exist.
    async fn delete_alert(&self, alert_id: Uuid) -> StoreResult<bool>;

    /// Active alerts with remaining daily capacity not owned by `owner_id`.
    ///
    /// When `cells` is given only alerts centered in one of those cells are returned.
    async fn list_active_alerts_excluding(
        &self,
        owner_id: Uuid,
        cells: Option<&[String]>,
    ) -> StoreResult<Vec<ProximityAlert>>;

    /// True if a match for the pair exists at or after `since`.
    async fn has_recent_match(
        &self,
        alert_id: Uuid,
        matched_user_id: Uuid,
        since: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Records the match and claims one trigger slot on the alert, atomically.
    ///
    /// Concurrent callers for the same pair observe exactly one `Inserted`.
    async fn record_match_if_absent(
        &self,
        new_match: NewProximityMatch,
        dedup_since: DateTime<Utc>,
    ) -> StoreResult<MatchInsert>;

    /// Matches of an alert, newest first.
    async fn list_matches(&self, alert_id: Uuid) -> StoreResult<Vec<ProximityMatch>>;

    /// Sets every alert's daily counter to zero. Returns the number of alerts touched.
    async fn reset_daily_counters(&self) -> StoreResult<u64>;
}

/// Profile subsystem lookup.
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn get_profile_snapshot(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Option<UserProfileSnapshot>>;
}

/// Subscription lookup gating alert creation.
#[async_trait]
pub trait EntitlementService: Send + Sync {
    async fn is_premium(&self, user_id: Uuid) -> StoreResult<bool>;
}
