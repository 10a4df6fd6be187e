//! Tunables shared by the visibility and proximity services.

use chrono::Duration;

use crate::geo::BlurRange;

#[derive(Debug, Clone, PartialEq)]
pub struct ProximitySettings {
    /// Maximum number of alerts a single owner may hold.
    pub max_alerts_per_user: usize,
    pub dedup_window_hours: i64,
    /// Load only alerts centered near the reporter instead of scanning all of them.
    pub spatial_prefilter: bool,
    pub blur: BlurRange,
    pub default_beacon_minutes: i64,
    pub max_nearby_radius_meters: f64,
    /// Upper bound on one dispatcher call during a location report.
    pub notify_timeout_ms: u64,
}

impl Default for ProximitySettings {
    fn default() -> Self {
        Self {
            max_alerts_per_user: 5,
            dedup_window_hours: 24,
            spatial_prefilter: true,
            blur: BlurRange::default(),
            default_beacon_minutes: 60,
            max_nearby_radius_meters: 50_000.0,
            notify_timeout_ms: 2_000,
        }
    }
}

impl ProximitySettings {
    pub fn dedup_window(&self) -> Duration {
        Duration::hours(self.dedup_window_hours)
    }

    pub fn notify_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.notify_timeout_ms)
    }
}
