//! Location reporting and visibility settings for the calling user.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::proximity_engine::ProximityEngine;
use super::settings::ProximitySettings;
use super::store::{LocationStore, ProfileProvider};
use crate::error::DomainError;
use crate::models::location::ReportLocationRequest;
use crate::models::visibility::{SetVisibilityRequest, VisibilitySettingsResponse};
use crate::models::{UserLocationState, VisibilityLevel};

fn settings_of(state: &UserLocationState, now: DateTime<Utc>) -> VisibilitySettingsResponse {
    let level = state.effective_level(now);
    VisibilitySettingsResponse {
        level,
        beacon_expires_at: if level == VisibilityLevel::Beacon {
            state.beacon_expires_at
        } else {
            None
        },
    }
}

pub struct LocationService {
    locations: Arc<dyn LocationStore>,
    profiles: Arc<dyn ProfileProvider>,
    engine: Arc<ProximityEngine>,
    settings: ProximitySettings,
}

impl LocationService {
    pub fn new(
        locations: Arc<dyn LocationStore>,
        profiles: Arc<dyn ProfileProvider>,
        engine: Arc<ProximityEngine>,
        settings: ProximitySettings,
    ) -> Self {
        Self {
            locations,
            profiles,
            engine,
            settings,
        }
    }

    /// Stores the caller's position and runs alert matching against it.
    ///
    /// Returns the number of alerts triggered.
    pub async fn report_location(
        &self,
        user_id: Uuid,
        request: ReportLocationRequest,
        now: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        request.validate()?;

        let profile = match self.profiles.get_profile_snapshot(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Profile lookup failed");
                None
            }
        };

        self.engine
            .on_location_update(user_id, request.coordinate(), profile.as_ref(), now)
            .await
    }

    pub async fn set_visibility_level(
        &self,
        user_id: Uuid,
        request: SetVisibilityRequest,
        now: DateTime<Utc>,
    ) -> Result<VisibilitySettingsResponse, DomainError> {
        request.validate()?;

        let expires_at = match (request.level, request.beacon_duration_minutes) {
            (VisibilityLevel::Beacon, minutes) => Some(
                now + Duration::minutes(minutes.unwrap_or(self.settings.default_beacon_minutes)),
            ),
            (_, Some(_)) => {
                return Err(DomainError::Validation(
                    "Beacon duration is only accepted for the beacon level".to_string(),
                ))
            }
            (_, None) => None,
        };

        let state = self
            .locations
            .set_visibility(user_id, request.level, expires_at, now)
            .await?;

        info!(
            user_id = %user_id,
            level = %state.visibility_level,
            "Visibility level changed"
        );
        Ok(settings_of(&state, now))
    }

    /// The caller's effective settings. Beacon expiry is applied but not persisted.
    pub async fn get_visibility_settings(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<VisibilitySettingsResponse, DomainError> {
        let state = self
            .locations
            .find_location_state(user_id)
            .await?
            .unwrap_or_else(|| UserLocationState::new(user_id, now));
        Ok(settings_of(&state, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserProfileSnapshot;
    use crate::services::memory::InMemoryStore;
    use crate::services::notification::MockNotificationDispatcher;

    fn service(store: &Arc<InMemoryStore>) -> LocationService {
        let settings = ProximitySettings::default();
        let engine = Arc::new(ProximityEngine::new(
            store.clone(),
            store.clone(),
            Arc::new(MockNotificationDispatcher::new()),
            settings.clone(),
        ));
        LocationService::new(store.clone(), store.clone(), engine, settings)
    }

    fn visibility(json: &str) -> SetVisibilityRequest {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_report_location_persists_state() {
        let store = Arc::new(InMemoryStore::new());
        let user = Uuid::new_v4();
        store.put_profile(UserProfileSnapshot {
            user_id: user,
            age: Some(30),
            gender: None,
            interests: vec![],
            trust_score: Some(70),
            activity_intent: None,
        });

        let request: ReportLocationRequest =
            serde_json::from_str(r#"{"latitude": 48.8566, "longitude": 2.3522}"#).unwrap();
        let triggered = service(&store)
            .report_location(user, request, Utc::now())
            .await
            .unwrap();
        assert_eq!(triggered, 0);

        let state = store.find_location_state(user).await.unwrap().unwrap();
        assert_eq!(state.location.unwrap().latitude, 48.8566);
        assert_eq!(state.visibility_level, VisibilityLevel::Circles);
    }

    #[tokio::test]
    async fn test_report_location_rejects_out_of_range() {
        let store = Arc::new(InMemoryStore::new());
        let user = Uuid::new_v4();
        let request: ReportLocationRequest =
            serde_json::from_str(r#"{"latitude": 48.8566, "longitude": 200.0}"#).unwrap();

        let result = service(&store).report_location(user, request, Utc::now()).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(store.find_location_state(user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_beacon_defaults_to_sixty_minutes_then_expires() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(&store);
        let user = Uuid::new_v4();
        let now = Utc::now();

        let settings = service
            .set_visibility_level(user, visibility(r#"{"level": "beacon"}"#), now)
            .await
            .unwrap();
        assert_eq!(settings.level, VisibilityLevel::Beacon);
        assert_eq!(settings.beacon_expires_at, Some(now + Duration::minutes(60)));

        let later = now + Duration::minutes(61);
        let settings = service.get_visibility_settings(user, later).await.unwrap();
        assert_eq!(settings.level, VisibilityLevel::Discoverable);
        assert!(settings.beacon_expires_at.is_none());

        let stored = store.find_location_state(user).await.unwrap().unwrap();
        assert_eq!(stored.visibility_level, VisibilityLevel::Beacon);
    }

    #[tokio::test]
    async fn test_duration_rejected_for_non_beacon_level() {
        let store = Arc::new(InMemoryStore::new());
        let result = service(&store)
            .set_visibility_level(
                Uuid::new_v4(),
                visibility(r#"{"level": "fuzzy", "beaconDurationMinutes": 30}"#),
                Utc::now(),
            )
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_switching_level_clears_beacon_expiry() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(&store);
        let user = Uuid::new_v4();
        let now = Utc::now();

        service
            .set_visibility_level(
                user,
                visibility(r#"{"level": "beacon", "beaconDurationMinutes": 15}"#),
                now,
            )
            .await
            .unwrap();
        service
            .set_visibility_level(user, visibility(r#"{"level": "ghost"}"#), now)
            .await
            .unwrap();

        let stored = store.find_location_state(user).await.unwrap().unwrap();
        assert_eq!(stored.visibility_level, VisibilityLevel::Ghost);
        assert!(stored.beacon_expires_at.is_none());
    }

    #[tokio::test]
    async fn test_default_settings_for_unknown_user() {
        let store = Arc::new(InMemoryStore::new());
        let settings = service(&store)
            .get_visibility_settings(Uuid::new_v4(), Utc::now())
            .await
            .unwrap();
        assert_eq!(settings.level, VisibilityLevel::Circles);
    }
}
