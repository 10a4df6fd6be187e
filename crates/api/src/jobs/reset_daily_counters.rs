//! Daily reset of proximity alert trigger counters.

use std::sync::Arc;

use tracing::info;

use domain::services::ProximityAlertStore;

use super::scheduler::{Job, JobFrequency};

/// Zeroes `triggers_today` on every alert at UTC midnight.
pub struct ResetDailyCountersJob {
    alerts: Arc<dyn ProximityAlertStore>,
}

impl ResetDailyCountersJob {
    pub fn new(alerts: Arc<dyn ProximityAlertStore>) -> Self {
        Self { alerts }
    }
}

#[async_trait::async_trait]
impl Job for ResetDailyCountersJob {
    fn name(&self) -> &'static str {
        "reset_daily_counters"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Daily
    }

    async fn execute(&self) -> Result<(), String> {
        let reset = self
            .alerts
            .reset_daily_counters()
            .await
            .map_err(|e| format!("Failed to reset daily trigger counters: {}", e))?;

        info!(alerts_reset = reset, "Reset daily proximity alert counters");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::models::{Coordinate, NewProximityAlert, NewProximityMatch};
    use domain::services::InMemoryStore;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_execute_resets_counters() {
        let store = Arc::new(InMemoryStore::new());
        let center = Coordinate::new(37.7749, -122.4194);
        let alert = store
            .create_alert(
                NewProximityAlert {
                    owner_id: Uuid::new_v4(),
                    name: None,
                    center,
                    center_geohash: domain::geo::geohash_cell(center).unwrap(),
                    radius_meters: 1000,
                    criteria: Default::default(),
                    cooldown_minutes: 60,
                    max_triggers_per_day: 10,
                    is_active: true,
                },
                5,
            )
            .await
            .unwrap()
            .unwrap();

        let now = Utc::now();
        store
            .record_match_if_absent(
                NewProximityMatch {
                    alert_id: alert.id,
                    matched_user_id: Uuid::new_v4(),
                    distance_meters: 47.0,
                    matched_at: now,
                },
                now - chrono::Duration::hours(24),
            )
            .await
            .unwrap();
        assert_eq!(
            store.find_alert(alert.id).await.unwrap().unwrap().triggers_today,
            1
        );

        let job = ResetDailyCountersJob::new(store.clone());
        assert_eq!(job.frequency(), JobFrequency::Daily);
        job.execute().await.unwrap();

        assert_eq!(
            store.find_alert(alert.id).await.unwrap().unwrap().triggers_today,
            0
        );
    }
}
