//! In-process implementations of the store and collaborator traits.
//!
//! Backs the domain tests and the server's `memory` storage backend. All state
//! sits behind one mutex that is held for the whole of each trait call, which
//! makes every method atomic within a single process.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::store::{
    EntitlementService, LocationStore, ProfileProvider, ProximityAlertStore, SocialGraph,
    StoreResult,
};
use crate::error::StoreError;
use crate::geo;
use crate::models::{
    AlertUpdate, Connection, ConnectionStatus, Coordinate, MatchInsert, NewProximityAlert,
    NewProximityMatch, ProximityAlert, ProximityMatch, UserLocationState, UserProfileSnapshot,
    VisibilityLevel,
};

#[derive(Default)]
struct State {
    locations: HashMap<Uuid, UserLocationState>,
    circles: HashMap<Uuid, HashSet<Uuid>>,
    connections: Vec<Connection>,
    profiles: HashMap<Uuid, UserProfileSnapshot>,
    premium: HashSet<Uuid>,
    alerts: HashMap<Uuid, ProximityAlert>,
    matches: Vec<ProximityMatch>,
}

impl State {
    fn comembers(&self, user_id: Uuid) -> HashSet<Uuid> {
        self.circles
            .values()
            .filter(|members| members.contains(&user_id))
            .flat_map(|members| members.iter().copied())
            .filter(|member| *member != user_id)
            .collect()
    }

    fn accepted(&self, user_id: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.connections
            .iter()
            .filter(|c| c.is_accepted())
            .filter_map(move |c| c.other(user_id))
    }
}

/// Single-process store used for tests and local development.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    /// Treat every user as premium when no explicit subscription is recorded.
    all_premium: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store in which every user passes the premium gate.
    pub fn with_all_premium() -> Self {
        Self {
            all_premium: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn seed(&self, f: impl FnOnce(&mut State)) {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        }
    }

    /// Adds `members` to a circle, creating it if needed.
    pub fn add_circle_member(&self, circle_id: Uuid, members: &[Uuid]) {
        self.seed(|s| s.circles.entry(circle_id).or_default().extend(members));
    }

    pub fn add_connection(&self, user_a_id: Uuid, user_b_id: Uuid, status: ConnectionStatus) {
        self.seed(|s| {
            s.connections.push(Connection {
                user_a_id,
                user_b_id,
                status,
            })
        });
    }

    pub fn put_profile(&self, profile: UserProfileSnapshot) {
        self.seed(|s| {
            s.profiles.insert(profile.user_id, profile);
        });
    }

    pub fn set_premium(&self, user_id: Uuid, premium: bool) {
        self.seed(|s| {
            if premium {
                s.premium.insert(user_id);
            } else {
                s.premium.remove(&user_id);
            }
        });
    }

    /// Replaces a user's state verbatim, bypassing write-path corrections.
    pub fn put_location_state(&self, state: UserLocationState) {
        self.seed(|s| {
            s.locations.insert(state.user_id, state);
        });
    }
}

#[async_trait]
impl LocationStore for InMemoryStore {
    async fn find_location_state(&self, user_id: Uuid) -> StoreResult<Option<UserLocationState>> {
        Ok(self.lock()?.locations.get(&user_id).cloned())
    }

    async fn upsert_location(
        &self,
        user_id: Uuid,
        coord: Coordinate,
        now: DateTime<Utc>,
    ) -> StoreResult<UserLocationState> {
        let mut state = self.lock()?;
        let entry = state
            .locations
            .entry(user_id)
            .or_insert_with(|| UserLocationState::new(user_id, now));
        entry.correct_expired_beacon(now);
        entry.location = Some(coord);
        entry.updated_at = now;
        Ok(entry.clone())
    }

    async fn set_visibility(
        &self,
        user_id: Uuid,
        level: VisibilityLevel,
        beacon_expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> StoreResult<UserLocationState> {
        let mut state = self.lock()?;
        let entry = state
            .locations
            .entry(user_id)
            .or_insert_with(|| UserLocationState::new(user_id, now));
        entry.visibility_level = level;
        entry.beacon_expires_at = beacon_expires_at;
        entry.updated_at = now;
        Ok(entry.clone())
    }

    async fn list_located_within(
        &self,
        center: Coordinate,
        radius_meters: f64,
    ) -> StoreResult<Vec<UserLocationState>> {
        let bbox = geo::bounding_box(center, radius_meters);
        Ok(self
            .lock()?
            .locations
            .values()
            .filter(|s| s.location.map_or(false, |loc| bbox.contains(loc)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SocialGraph for InMemoryStore {
    async fn circle_comembers(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(self.lock()?.comembers(user_id).into_iter().collect())
    }

    async fn accepted_connections(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(self.lock()?.accepted(user_id).collect())
    }

    async fn are_circle_comembers(&self, a: Uuid, b: Uuid) -> StoreResult<bool> {
        Ok(a != b && self.lock()?.comembers(a).contains(&b))
    }

    async fn are_connected(&self, a: Uuid, b: Uuid) -> StoreResult<bool> {
        Ok(self.lock()?.accepted(a).any(|other| other == b))
    }
}

#[async_trait]
impl ProximityAlertStore for InMemoryStore {
    async fn create_alert(
        &self,
        alert: NewProximityAlert,
        max_per_owner: usize,
    ) -> StoreResult<Option<ProximityAlert>> {
        let mut state = self.lock()?;
        let owned = state
            .alerts
            .values()
            .filter(|a| a.owner_id == alert.owner_id)
            .count();
        if owned >= max_per_owner {
            return Ok(None);
        }

        let now = Utc::now();
        let created = ProximityAlert {
            id: Uuid::new_v4(),
            owner_id: alert.owner_id,
            name: alert.name,
            center: alert.center,
            center_geohash: alert.center_geohash,
            radius_meters: alert.radius_meters,
            criteria: alert.criteria,
            cooldown_minutes: alert.cooldown_minutes,
            max_triggers_per_day: alert.max_triggers_per_day,
            triggers_today: 0,
            last_triggered_at: None,
            is_active: alert.is_active,
            created_at: now,
            updated_at: now,
        };
        state.alerts.insert(created.id, created.clone());
        Ok(Some(created))
    }

    async fn find_alert(&self, alert_id: Uuid) -> StoreResult<Option<ProximityAlert>> {
        Ok(self.lock()?.alerts.get(&alert_id).cloned())
    }

    async fn list_alerts_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<ProximityAlert>> {
        let mut alerts: Vec<ProximityAlert> = self
            .lock()?
            .alerts
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(alerts)
    }

    async fn update_alert(
        &self,
        alert_id: Uuid,
        update: AlertUpdate,
    ) -> StoreResult<Option<ProximityAlert>> {
        let mut state = self.lock()?;
        let Some(alert) = state.alerts.get_mut(&alert_id) else {
            return Ok(None);
        };

        if let Some(name) = update.name {
            alert.name = Some(name);
        }
        if let Some((center, cell)) = update.center {
            alert.center = center;
            alert.center_geohash = cell;
        }
        if let Some(radius) = update.radius_meters {
            alert.radius_meters = radius;
        }
        if let Some(criteria) = update.criteria {
            alert.criteria = criteria;
        }
        if let Some(cooldown) = update.cooldown_minutes {
            alert.cooldown_minutes = cooldown;
        }
        if let Some(max) = update.max_triggers_per_day {
            alert.max_triggers_per_day = max;
            alert.triggers_today = alert.triggers_today.min(max);
        }
        if let Some(active) = update.is_active {
            alert.is_active = active;
        }
        alert.updated_at = Utc::now();
        Ok(Some(alert.clone()))
    }

    async fn delete_alert(&self, alert_id: Uuid) -> StoreResult<bool> {
        let mut state = self.lock()?;
        if state.alerts.remove(&alert_id).is_none() {
            return Ok(false);
        }
        state.matches.retain(|m| m.alert_id != alert_id);
        Ok(true)
    }

    async fn list_active_alerts_excluding(
        &self,
        owner_id: Uuid,
        cells: Option<&[String]>,
    ) -> StoreResult<Vec<ProximityAlert>> {
        Ok(self
            .lock()?
            .alerts
            .values()
            .filter(|a| a.is_active && a.owner_id != owner_id && a.has_capacity())
            .filter(|a| cells.map_or(true, |cells| cells.contains(&a.center_geohash)))
            .cloned()
            .collect())
    }

    async fn has_recent_match(
        &self,
        alert_id: Uuid,
        matched_user_id: Uuid,
        since: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Ok(self.lock()?.matches.iter().any(|m| {
            m.alert_id == alert_id && m.matched_user_id == matched_user_id && m.matched_at >= since
        }))
    }

    async fn record_match_if_absent(
        &self,
        new_match: NewProximityMatch,
        dedup_since: DateTime<Utc>,
    ) -> StoreResult<MatchInsert> {
        let mut state = self.lock()?;
        let day_bucket = new_match.day_bucket();

        let duplicate = state.matches.iter().any(|m| {
            m.alert_id == new_match.alert_id
                && m.matched_user_id == new_match.matched_user_id
                && (m.matched_at >= dedup_since || m.day_bucket == day_bucket)
        });
        if duplicate {
            return Ok(MatchInsert::Duplicate);
        }

        let now = new_match.matched_at;
        let Some(alert) = state.alerts.get_mut(&new_match.alert_id) else {
            return Ok(MatchInsert::AlertUnavailable);
        };
        if !alert.is_active || !alert.has_capacity() || alert.is_cooling_down(now) {
            return Ok(MatchInsert::AlertUnavailable);
        }
        alert.triggers_today += 1;
        alert.last_triggered_at = Some(now);

        let recorded = ProximityMatch {
            id: Uuid::new_v4(),
            alert_id: new_match.alert_id,
            matched_user_id: new_match.matched_user_id,
            distance_meters: new_match.distance_meters,
            matched_at: now,
            day_bucket,
        };
        state.matches.push(recorded.clone());
        Ok(MatchInsert::Inserted(recorded))
    }

    async fn list_matches(&self, alert_id: Uuid) -> StoreResult<Vec<ProximityMatch>> {
        let mut matches: Vec<ProximityMatch> = self
            .lock()?
            .matches
            .iter()
            .filter(|m| m.alert_id == alert_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.matched_at.cmp(&a.matched_at));
        Ok(matches)
    }

    async fn reset_daily_counters(&self) -> StoreResult<u64> {
        let mut state = self.lock()?;
        let mut reset = 0;
        for alert in state.alerts.values_mut() {
            if alert.triggers_today != 0 {
                alert.triggers_today = 0;
                reset += 1;
            }
        }
        Ok(reset)
    }
}

#[async_trait]
impl ProfileProvider for InMemoryStore {
    async fn get_profile_snapshot(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Option<UserProfileSnapshot>> {
        Ok(self.lock()?.profiles.get(&user_id).cloned())
    }
}

#[async_trait]
impl EntitlementService for InMemoryStore {
    async fn is_premium(&self, user_id: Uuid) -> StoreResult<bool> {
        Ok(self.all_premium || self.lock()?.premium.contains(&user_id))
    }
}
