//! Owner-facing proximity alert management.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::settings::ProximitySettings;
use super::store::{EntitlementService, ProximityAlertStore};
use crate::error::DomainError;
use crate::geo;
use crate::models::proximity_alert::{CreateProximityAlertRequest, UpdateProximityAlertRequest};
use crate::models::{AlertUpdate, Coordinate, NewProximityAlert, ProximityAlert, ProximityMatch};

fn not_found() -> DomainError {
    DomainError::NotFound("Proximity alert not found".to_string())
}

fn cell_for(center: Coordinate) -> Result<String, DomainError> {
    geo::geohash_cell(center)
        .ok_or_else(|| DomainError::Validation("Alert center cannot be indexed".to_string()))
}

pub struct AlertService {
    alerts: Arc<dyn ProximityAlertStore>,
    entitlements: Arc<dyn EntitlementService>,
    settings: ProximitySettings,
}

impl AlertService {
    pub fn new(
        alerts: Arc<dyn ProximityAlertStore>,
        entitlements: Arc<dyn EntitlementService>,
        settings: ProximitySettings,
    ) -> Self {
        Self {
            alerts,
            entitlements,
            settings,
        }
    }

    /// Creates an alert for a premium owner below the per-owner cap.
    pub async fn create_alert(
        &self,
        owner_id: Uuid,
        request: CreateProximityAlertRequest,
    ) -> Result<ProximityAlert, DomainError> {
        request.validate()?;

        if !self.entitlements.is_premium(owner_id).await? {
            return Err(DomainError::Forbidden(
                "Proximity alerts require a premium subscription".to_string(),
            ));
        }

        let center = Coordinate::new(request.latitude, request.longitude);
        let new_alert = NewProximityAlert {
            owner_id,
            name: request.name,
            center,
            center_geohash: cell_for(center)?,
            radius_meters: request.radius_meters,
            criteria: request.criteria.normalized(),
            cooldown_minutes: request.cooldown_minutes,
            max_triggers_per_day: request.max_triggers_per_day,
            is_active: request.is_active,
        };

        let alert = self
            .alerts
            .create_alert(new_alert, self.settings.max_alerts_per_user)
            .await?
            .ok_or_else(|| {
                DomainError::LimitExceeded(format!(
                    "Maximum of {} proximity alerts reached",
                    self.settings.max_alerts_per_user
                ))
            })?;

        info!(
            alert_id = %alert.id,
            owner_id = %owner_id,
            radius_meters = alert.radius_meters,
            "Proximity alert created"
        );
        Ok(alert)
    }

    /// Loads an alert owned by `owner_id`. Alerts of other owners read as missing.
    pub async fn get_alert(
        &self,
        owner_id: Uuid,
        alert_id: Uuid,
    ) -> Result<ProximityAlert, DomainError> {
        match self.alerts.find_alert(alert_id).await? {
            Some(alert) if alert.owner_id == owner_id => Ok(alert),
            _ => Err(not_found()),
        }
    }

    pub async fn update_alert(
        &self,
        owner_id: Uuid,
        alert_id: Uuid,
        request: UpdateProximityAlertRequest,
    ) -> Result<ProximityAlert, DomainError> {
        request.validate()?;
        self.get_alert(owner_id, alert_id).await?;

        let center = match (request.latitude, request.longitude) {
            (Some(latitude), Some(longitude)) => {
                let center = Coordinate::new(latitude, longitude);
                Some((center, cell_for(center)?))
            }
            _ => None,
        };
        let update = AlertUpdate {
            name: request.name,
            center,
            radius_meters: request.radius_meters,
            criteria: request.criteria.map(|c| c.normalized()),
            cooldown_minutes: request.cooldown_minutes,
            max_triggers_per_day: request.max_triggers_per_day,
            is_active: request.is_active,
        };

        let alert = self
            .alerts
            .update_alert(alert_id, update)
            .await?
            .ok_or_else(not_found)?;

        info!(alert_id = %alert_id, owner_id = %owner_id, "Proximity alert updated");
        Ok(alert)
    }

    pub async fn delete_alert(&self, owner_id: Uuid, alert_id: Uuid) -> Result<(), DomainError> {
        self.get_alert(owner_id, alert_id).await?;
        if !self.alerts.delete_alert(alert_id).await? {
            return Err(not_found());
        }
        info!(alert_id = %alert_id, owner_id = %owner_id, "Proximity alert deleted");
        Ok(())
    }

    pub async fn list_my_alerts(&self, owner_id: Uuid) -> Result<Vec<ProximityAlert>, DomainError> {
        Ok(self.alerts.list_alerts_by_owner(owner_id).await?)
    }

    /// Match history of an owned alert, newest first.
    pub async fn list_my_matches(
        &self,
        owner_id: Uuid,
        alert_id: Uuid,
    ) -> Result<Vec<ProximityMatch>, DomainError> {
        self.get_alert(owner_id, alert_id).await?;
        Ok(self.alerts.list_matches(alert_id).await?)
    }
}
