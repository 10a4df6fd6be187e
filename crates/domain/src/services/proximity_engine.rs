//! Proximity alert evaluation on location updates.
//!
//! Every location report is persisted first, then checked against other
//! users' active alerts. An alert fires at most once per cooldown, at most
//! `max_triggers_per_day` times per UTC day, and at most once per matched
//! user within the dedup window.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::notification::{NotificationDispatcher, NotificationResult, ProximityMatchEvent};
use super::settings::ProximitySettings;
use super::store::{LocationStore, ProximityAlertStore};
use crate::error::DomainError;
use crate::geo;
use crate::models::{
    AlertCriteria, Coordinate, MatchInsert, NewProximityMatch, ProximityAlert,
    UserProfileSnapshot,
};

/// The first criterion a profile failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriteriaMiss {
    Age,
    Gender,
    TrustScore,
    ActivityIntent,
    Interests,
}

/// Result of checking a profile against alert criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriteriaOutcome {
    Matched { shared_interests: Vec<String> },
    Rejected(CriteriaMiss),
    /// The alert has criteria but no usable profile was supplied.
    Unavailable,
}

/// Checks `profile` against `criteria`.
///
/// Empty criteria match without a profile. Tags compare after trimming and lowercasing.
pub fn evaluate_criteria(
    criteria: &AlertCriteria,
    profile: Option<&UserProfileSnapshot>,
) -> CriteriaOutcome {
    if criteria.is_empty() {
        return CriteriaOutcome::Matched {
            shared_interests: Vec::new(),
        };
    }
    let Some(profile) = profile else {
        return CriteriaOutcome::Unavailable;
    };

    if criteria.min_age.is_some() || criteria.max_age.is_some() {
        let in_range = profile.age.map_or(false, |age| {
            criteria.min_age.map_or(true, |min| age >= min)
                && criteria.max_age.map_or(true, |max| age <= max)
        });
        if !in_range {
            return CriteriaOutcome::Rejected(CriteriaMiss::Age);
        }
    }

    if let Some(gender) = criteria.gender {
        if profile.gender != Some(gender) {
            return CriteriaOutcome::Rejected(CriteriaMiss::Gender);
        }
    }

    if let Some(min_trust) = criteria.min_trust_score {
        if profile.trust_score.map_or(true, |score| score < min_trust) {
            return CriteriaOutcome::Rejected(CriteriaMiss::TrustScore);
        }
    }

    if let Some(intent) = &criteria.activity_intent {
        let wanted = shared::validation::normalize_tag(intent);
        let actual = profile
            .activity_intent
            .as_deref()
            .map(shared::validation::normalize_tag);
        if actual.as_deref() != Some(wanted.as_str()) {
            return CriteriaOutcome::Rejected(CriteriaMiss::ActivityIntent);
        }
    }

    let mut shared_interests = Vec::new();
    if !criteria.interests.is_empty() {
        let theirs: HashSet<String> = profile
            .interests
            .iter()
            .map(|tag| shared::validation::normalize_tag(tag))
            .collect();
        for tag in &criteria.interests {
            let tag = shared::validation::normalize_tag(tag);
            if theirs.contains(&tag) && !shared_interests.contains(&tag) {
                shared_interests.push(tag);
            }
        }
        if shared_interests.is_empty() {
            return CriteriaOutcome::Rejected(CriteriaMiss::Interests);
        }
    }

    CriteriaOutcome::Matched { shared_interests }
}

/// Evaluates alerts against location reports and fires notifications.
pub struct ProximityEngine {
    locations: Arc<dyn LocationStore>,
    alerts: Arc<dyn ProximityAlertStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    settings: ProximitySettings,
}

impl ProximityEngine {
    pub fn new(
        locations: Arc<dyn LocationStore>,
        alerts: Arc<dyn ProximityAlertStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        settings: ProximitySettings,
    ) -> Self {
        Self {
            locations,
            alerts,
            dispatcher,
            settings,
        }
    }

    /// Persists the reporter's location, then evaluates alerts against it.
    ///
    /// Returns the number of alerts triggered. Only the location write can fail;
    /// matching errors are logged and swallowed.
    pub async fn on_location_update(
        &self,
        reporter_id: Uuid,
        coord: Coordinate,
        profile: Option<&UserProfileSnapshot>,
        now: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        if !coord.is_valid() {
            return Err(DomainError::Validation(
                "Latitude must be between -90 and 90 and longitude between -180 and 180"
                    .to_string(),
            ));
        }

        self.locations
            .upsert_location(reporter_id, coord, now)
            .await?;

        Ok(self.evaluate_alerts(reporter_id, coord, profile, now).await)
    }

    async fn evaluate_alerts(
        &self,
        reporter_id: Uuid,
        coord: Coordinate,
        profile: Option<&UserProfileSnapshot>,
        now: DateTime<Utc>,
    ) -> usize {
        let profile = match profile {
            Some(p) if p.is_well_formed() => Some(p),
            Some(_) => {
                warn!(
                    user_id = %reporter_id,
                    "Malformed profile snapshot; evaluating distance-only alerts"
                );
                None
            }
            None => {
                warn!(
                    user_id = %reporter_id,
                    "Profile unavailable; evaluating distance-only alerts"
                );
                None
            }
        };

        let cells = if self.settings.spatial_prefilter {
            geo::search_cells(coord)
        } else {
            None
        };

        let alerts = match self
            .alerts
            .list_active_alerts_excluding(reporter_id, cells.as_deref())
            .await
        {
            Ok(alerts) => alerts,
            Err(e) => {
                error!(user_id = %reporter_id, error = %e, "Failed to load proximity alerts");
                return 0;
            }
        };

        let mut triggered = 0;
        for alert in &alerts {
            match self
                .evaluate_alert(alert, reporter_id, coord, profile, now)
                .await
            {
                Ok(true) => triggered += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        alert_id = %alert.id,
                        user_id = %reporter_id,
                        error = %e,
                        "Proximity alert evaluation failed"
                    );
                }
            }
        }

        debug!(
            user_id = %reporter_id,
            candidates = alerts.len(),
            triggered,
            "Evaluated proximity alerts"
        );
        triggered
    }

    async fn evaluate_alert(
        &self,
        alert: &ProximityAlert,
        reporter_id: Uuid,
        coord: Coordinate,
        profile: Option<&UserProfileSnapshot>,
        now: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        if !alert.is_active
            || alert.owner_id == reporter_id
            || !alert.has_capacity()
            || alert.is_cooling_down(now)
        {
            return Ok(false);
        }

        let distance = geo::distance(alert.center, coord);
        if distance > f64::from(alert.radius_meters) {
            return Ok(false);
        }

        let since = now - self.settings.dedup_window();
        if self
            .alerts
            .has_recent_match(alert.id, reporter_id, since)
            .await?
        {
            return Ok(false);
        }

        let shared_interests = match evaluate_criteria(&alert.criteria, profile) {
            CriteriaOutcome::Matched { shared_interests } => shared_interests,
            CriteriaOutcome::Rejected(miss) => {
                debug!(alert_id = %alert.id, user_id = %reporter_id, ?miss, "Criteria not met");
                return Ok(false);
            }
            CriteriaOutcome::Unavailable => return Ok(false),
        };

        let new_match = NewProximityMatch {
            alert_id: alert.id,
            matched_user_id: reporter_id,
            distance_meters: distance,
            matched_at: now,
        };
        let recorded = match self.alerts.record_match_if_absent(new_match, since).await? {
            MatchInsert::Inserted(m) => m,
            outcome => {
                debug!(alert_id = %alert.id, user_id = %reporter_id, ?outcome, "Trigger not claimed");
                return Ok(false);
            }
        };

        info!(
            alert_id = %alert.id,
            owner_id = %alert.owner_id,
            user_id = %reporter_id,
            match_id = %recorded.id,
            distance_meters = distance.round(),
            "Proximity alert triggered"
        );

        let event = ProximityMatchEvent::new(alert.id, reporter_id, shared_interests, distance);
        let sent = tokio::time::timeout(
            self.settings.notify_timeout(),
            self.dispatcher.notify(alert.owner_id, event),
        )
        .await;
        match sent {
            Ok(NotificationResult::Sent) => {}
            Ok(NotificationResult::Skipped) => {
                debug!(alert_id = %alert.id, "Proximity notification skipped");
            }
            Ok(NotificationResult::Failed(reason)) => {
                warn!(
                    alert_id = %alert.id,
                    owner_id = %alert.owner_id,
                    reason = %reason,
                    "Proximity notification failed"
                );
            }
            Err(_) => {
                warn!(
                    alert_id = %alert.id,
                    owner_id = %alert.owner_id,
                    timeout_ms = self.settings.notify_timeout_ms,
                    "Proximity notification timed out"
                );
            }
        }

        Ok(true)
    }
}
