//! Visibility resolution: who may see whose location, and how precisely.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use super::settings::ProximitySettings;
use super::store::{LocationStore, SocialGraph};
use crate::error::DomainError;
use crate::geo::{self, BlurSeed};
use crate::models::{
    Coordinate, Precision, UserLocationState, VisibilityDecision, VisibilityLevel, VisibleUser,
};

/// Social ties between an observer and a candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Relation {
    pub circle_comember: bool,
    pub connected: bool,
}

/// Precision granted at `level` for the given relation, or `None` if hidden.
///
/// `level` must already be the effective level (beacon expiry applied).
pub fn decide(level: VisibilityLevel, relation: Relation) -> Option<Precision> {
    match level {
        VisibilityLevel::Ghost => None,
        VisibilityLevel::Circles => relation.circle_comember.then_some(Precision::Exact),
        VisibilityLevel::Fuzzy => Some(if relation.circle_comember {
            Precision::Exact
        } else {
            Precision::Approximate
        }),
        VisibilityLevel::Social => {
            (relation.circle_comember || relation.connected).then_some(Precision::Exact)
        }
        VisibilityLevel::Discoverable | VisibilityLevel::Beacon => Some(Precision::Exact),
    }
}

fn needs_circle_check(level: VisibilityLevel) -> bool {
    matches!(
        level,
        VisibilityLevel::Circles | VisibilityLevel::Fuzzy | VisibilityLevel::Social
    )
}

/// Resolves location visibility between users. Never writes.
pub struct VisibilityResolver {
    locations: Arc<dyn LocationStore>,
    social: Arc<dyn SocialGraph>,
    settings: ProximitySettings,
}

impl VisibilityResolver {
    pub fn new(
        locations: Arc<dyn LocationStore>,
        social: Arc<dyn SocialGraph>,
        settings: ProximitySettings,
    ) -> Self {
        Self {
            locations,
            social,
            settings,
        }
    }

    fn check_query(&self, location: Coordinate, radius_meters: f64) -> Result<(), DomainError> {
        if !location.is_valid() {
            return Err(DomainError::Validation(
                "Observer location is out of range".to_string(),
            ));
        }
        if !radius_meters.is_finite()
            || radius_meters <= 0.0
            || radius_meters > self.settings.max_nearby_radius_meters
        {
            return Err(DomainError::Validation(format!(
                "Radius must be greater than 0 and at most {} meters",
                self.settings.max_nearby_radius_meters
            )));
        }
        Ok(())
    }

    fn render(
        &self,
        observer_id: Uuid,
        candidate: &UserLocationState,
        position: Coordinate,
        precision: Precision,
        now: DateTime<Utc>,
    ) -> Coordinate {
        match precision {
            Precision::Exact => position,
            Precision::Approximate => {
                let seed = BlurSeed::new(candidate.user_id, observer_id, now.date_naive());
                geo::blur(position, seed, self.settings.blur)
            }
        }
    }

    /// Decides whether `observer_id` may see `candidate_id` from `observer_location`.
    pub async fn resolve_visibility(
        &self,
        observer_id: Uuid,
        candidate_id: Uuid,
        observer_location: Coordinate,
        radius_meters: f64,
        now: DateTime<Utc>,
    ) -> Result<VisibilityDecision, DomainError> {
        self.check_query(observer_location, radius_meters)?;

        let Some(candidate) = self.locations.find_location_state(candidate_id).await? else {
            return Ok(VisibilityDecision::hidden());
        };
        let Some(position) = candidate.location else {
            return Ok(VisibilityDecision::hidden());
        };

        let level = candidate.effective_level(now);
        if level == VisibilityLevel::Ghost {
            return Ok(VisibilityDecision::hidden());
        }
        if geo::distance(observer_location, position) > radius_meters {
            return Ok(VisibilityDecision::hidden());
        }

        if observer_id == candidate_id {
            return Ok(VisibilityDecision::visible(Precision::Exact, position));
        }

        let mut relation = Relation::default();
        if needs_circle_check(level) {
            relation.circle_comember = self
                .social
                .are_circle_comembers(observer_id, candidate_id)
                .await?;
        }
        if level == VisibilityLevel::Social && !relation.circle_comember {
            relation.connected = self.social.are_connected(observer_id, candidate_id).await?;
        }

        Ok(match decide(level, relation) {
            Some(precision) => VisibilityDecision::visible(
                precision,
                self.render(observer_id, &candidate, position, precision, now),
            ),
            None => VisibilityDecision::hidden(),
        })
    }

    /// Users visible to `observer_id` within `radius_meters` of `location`, nearest first.
    pub async fn list_visible_users(
        &self,
        observer_id: Uuid,
        location: Coordinate,
        radius_meters: f64,
        now: DateTime<Utc>,
    ) -> Result<Vec<VisibleUser>, DomainError> {
        self.check_query(location, radius_meters)?;

        let candidates = self
            .locations
            .list_located_within(location, radius_meters)
            .await?;
        let comembers: HashSet<Uuid> = self
            .social
            .circle_comembers(observer_id)
            .await?
            .into_iter()
            .collect();
        let connections: HashSet<Uuid> = self
            .social
            .accepted_connections(observer_id)
            .await?
            .into_iter()
            .collect();

        let mut users: Vec<VisibleUser> = candidates
            .iter()
            .filter(|candidate| candidate.user_id != observer_id)
            .filter_map(|candidate| {
                let position = candidate.location?;
                let level = candidate.effective_level(now);
                if level == VisibilityLevel::Ghost
                    || geo::distance(location, position) > radius_meters
                {
                    return None;
                }
                let relation = Relation {
                    circle_comember: comembers.contains(&candidate.user_id),
                    connected: connections.contains(&candidate.user_id),
                };
                let precision = decide(level, relation)?;
                let coordinate = self.render(observer_id, candidate, position, precision, now);
                Some(VisibleUser {
                    user_id: candidate.user_id,
                    coordinate,
                    precision,
                    distance_meters: geo::distance(location, coordinate),
                })
            })
            .collect();

        users.sort_by(|a, b| {
            a.distance_meters
                .partial_cmp(&b.distance_meters)
                .unwrap_or(Ordering::Equal)
        });

        debug!(
            observer_id = %observer_id,
            candidates = candidates.len(),
            visible = users.len(),
            "Resolved nearby users"
        );
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionStatus, UserLocationState};
    use crate::services::memory::InMemoryStore;
    use chrono::Duration;

    const SF: Coordinate = Coordinate {
        latitude: 37.7749,
        longitude: -122.4194,
    };

    fn resolver(store: &Arc<InMemoryStore>) -> VisibilityResolver {
        VisibilityResolver::new(store.clone(), store.clone(), ProximitySettings::default())
    }

    async fn place(
        store: &InMemoryStore,
        user: Uuid,
        coord: Coordinate,
        level: VisibilityLevel,
        now: DateTime<Utc>,
    ) {
        let expires = (level == VisibilityLevel::Beacon).then(|| now + Duration::minutes(30));
        store.set_visibility(user, level, expires, now).await.unwrap();
        store.upsert_location(user, coord, now).await.unwrap();
    }

    #[test]
    fn test_decision_table() {
        let stranger = Relation::default();
        let member = Relation {
            circle_comember: true,
            connected: false,
        };
        let connection = Relation {
            circle_comember: false,
            connected: true,
        };

        assert_eq!(decide(VisibilityLevel::Ghost, member), None);
        assert_eq!(decide(VisibilityLevel::Ghost, connection), None);
        assert_eq!(decide(VisibilityLevel::Circles, stranger), None);
        assert_eq!(decide(VisibilityLevel::Circles, connection), None);
        assert_eq!(
            decide(VisibilityLevel::Circles, member),
            Some(Precision::Exact)
        );
        assert_eq!(
            decide(VisibilityLevel::Fuzzy, stranger),
            Some(Precision::Approximate)
        );
        assert_eq!(decide(VisibilityLevel::Fuzzy, member), Some(Precision::Exact));
        assert_eq!(decide(VisibilityLevel::Social, stranger), None);
        assert_eq!(
            decide(VisibilityLevel::Social, connection),
            Some(Precision::Exact)
        );
        assert_eq!(
            decide(VisibilityLevel::Discoverable, stranger),
            Some(Precision::Exact)
        );
        assert_eq!(
            decide(VisibilityLevel::Beacon, stranger),
            Some(Precision::Exact)
        );
    }

    #[tokio::test]
    async fn test_ghost_hidden_from_circle_member() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.add_circle_member(Uuid::new_v4(), &[a, b]);
        place(&store, b, Coordinate::new(37.78, -122.41), VisibilityLevel::Ghost, now).await;

        let resolver = resolver(&store);
        let users = resolver.list_visible_users(a, SF, 50_000.0, now).await.unwrap();
        assert!(users.is_empty());

        let decision = resolver
            .resolve_visibility(a, b, SF, 50_000.0, now)
            .await
            .unwrap();
        assert!(!decision.visible);
    }

    #[tokio::test]
    async fn test_ghost_hidden_from_accepted_connection() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.add_connection(a, b, ConnectionStatus::Accepted);
        let position = Coordinate::new(37.78, -122.41);
        place(&store, b, position, VisibilityLevel::Social, now).await;

        let resolver = resolver(&store);
        let users = resolver.list_visible_users(a, SF, 50_000.0, now).await.unwrap();
        assert_eq!(users.iter().map(|u| u.user_id).collect::<Vec<_>>(), vec![b]);

        place(&store, b, position, VisibilityLevel::Ghost, now).await;

        let users = resolver.list_visible_users(a, SF, 50_000.0, now).await.unwrap();
        assert!(users.iter().all(|u| u.user_id != b));

        let decision = resolver
            .resolve_visibility(a, b, SF, 50_000.0, now)
            .await
            .unwrap();
        assert!(!decision.visible);
    }

    #[tokio::test]
    async fn test_fuzzy_blurs_for_non_members_only() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let (c, d, e) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store.add_circle_member(Uuid::new_v4(), &[c, e]);
        let position = Coordinate::new(37.78, -122.41);
        place(&store, c, position, VisibilityLevel::Fuzzy, now).await;

        let resolver = resolver(&store);

        let for_d = resolver.resolve_visibility(d, c, SF, 10_000.0, now).await.unwrap();
        assert_eq!(for_d.precision, Some(Precision::Approximate));
        let offset = geo::distance(position, for_d.coordinate.unwrap());
        assert!(offset >= 499.99 && offset <= 1500.01, "offset {offset}m");

        let again = resolver.resolve_visibility(d, c, SF, 10_000.0, now).await.unwrap();
        assert_eq!(again.coordinate, for_d.coordinate);

        let for_e = resolver.resolve_visibility(e, c, SF, 10_000.0, now).await.unwrap();
        assert_eq!(for_e.precision, Some(Precision::Exact));
        assert_eq!(for_e.coordinate, Some(position));
    }

    #[tokio::test]
    async fn test_social_visible_to_accepted_connections() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let (owner, friend, pending, stranger) =
            (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store.add_connection(owner, friend, ConnectionStatus::Accepted);
        store.add_connection(pending, owner, ConnectionStatus::Pending);
        place(&store, owner, SF, VisibilityLevel::Social, now).await;

        let resolver = resolver(&store);
        for (observer, expected) in [(friend, true), (pending, false), (stranger, false)] {
            let decision = resolver
                .resolve_visibility(observer, owner, SF, 1_000.0, now)
                .await
                .unwrap();
            assert_eq!(decision.visible, expected);
        }
    }

    #[tokio::test]
    async fn test_radius_filter_uses_true_position() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let (observer, far) = (Uuid::new_v4(), Uuid::new_v4());
        place(
            &store,
            far,
            Coordinate::new(37.7849, -122.4194),
            VisibilityLevel::Discoverable,
            now,
        )
        .await;

        let resolver = resolver(&store);
        let hidden = resolver
            .resolve_visibility(observer, far, SF, 1_000.0, now)
            .await
            .unwrap();
        assert!(!hidden.visible);
        let shown = resolver
            .resolve_visibility(observer, far, SF, 1_200.0, now)
            .await
            .unwrap();
        assert!(shown.visible);
    }

    #[tokio::test]
    async fn test_expired_beacon_reads_as_discoverable_without_write_back() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let (observer, user) = (Uuid::new_v4(), Uuid::new_v4());
        store.put_location_state(UserLocationState {
            user_id: user,
            location: Some(SF),
            visibility_level: VisibilityLevel::Beacon,
            beacon_expires_at: Some(now - Duration::minutes(1)),
            updated_at: now - Duration::hours(1),
        });

        let resolver = resolver(&store);
        let decision = resolver
            .resolve_visibility(observer, user, SF, 100.0, now)
            .await
            .unwrap();
        assert_eq!(decision.precision, Some(Precision::Exact));

        let stored = store.find_location_state(user).await.unwrap().unwrap();
        assert_eq!(stored.visibility_level, VisibilityLevel::Beacon);
    }

    #[tokio::test]
    async fn test_list_excludes_observer_and_sorts_by_distance() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let observer = Uuid::new_v4();
        let near = Uuid::new_v4();
        let farther = Uuid::new_v4();
        let silent = Uuid::new_v4();
        place(&store, observer, SF, VisibilityLevel::Discoverable, now).await;
        place(
            &store,
            farther,
            Coordinate::new(37.80, -122.4194),
            VisibilityLevel::Beacon,
            now,
        )
        .await;
        place(
            &store,
            near,
            Coordinate::new(37.776, -122.4194),
            VisibilityLevel::Discoverable,
            now,
        )
        .await;
        store.set_visibility(silent, VisibilityLevel::Discoverable, None, now).await.unwrap();

        let users = resolver(&store)
            .list_visible_users(observer, SF, 5_000.0, now)
            .await
            .unwrap();
        let ids: Vec<Uuid> = users.iter().map(|u| u.user_id).collect();
        assert_eq!(ids, vec![near, farther]);
        assert!(users[0].distance_meters < users[1].distance_meters);
    }

    #[tokio::test]
    async fn test_self_resolution_is_exact_within_filters() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let user = Uuid::new_v4();
        place(&store, user, SF, VisibilityLevel::Circles, now).await;
        let resolver = resolver(&store);

        let decision = resolver
            .resolve_visibility(user, user, SF, 10.0, now)
            .await
            .unwrap();
        assert_eq!(decision, VisibilityDecision::visible(Precision::Exact, SF));

        let far = resolver
            .resolve_visibility(user, user, Coordinate::new(0.0, 0.0), 10.0, now)
            .await
            .unwrap();
        assert!(!far.visible);

        place(&store, user, SF, VisibilityLevel::Ghost, now).await;
        let ghost = resolver
            .resolve_visibility(user, user, SF, 10.0, now)
            .await
            .unwrap();
        assert!(!ghost.visible);
    }

    #[tokio::test]
    async fn test_rejects_invalid_radius() {
        let store = Arc::new(InMemoryStore::new());
        let result = resolver(&store)
            .list_visible_users(Uuid::new_v4(), SF, 60_000.0, Utc::now())
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
