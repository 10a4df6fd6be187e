//! Proximity alert endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use domain::models::proximity_alert::{
    CreateProximityAlertRequest, ListProximityAlertsResponse, ProximityAlertResponse,
    UpdateProximityAlertRequest,
};
use domain::models::proximity_match::{ListProximityMatchesResponse, ProximityMatchResponse};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

/// Create a new proximity alert for the caller.
///
/// POST /api/v1/proximity-alerts
///
/// Requires a premium subscription; at most `proximity.max_alerts_per_user`
/// alerts per owner (409 `limit_exceeded` beyond that).
pub async fn create_proximity_alert(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreateProximityAlertRequest>,
) -> Result<(StatusCode, Json<ProximityAlertResponse>), ApiError> {
    let alert = state.alerts.create_alert(auth.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(alert.into())))
}

/// List the caller's alerts, newest first.
///
/// GET /api/v1/proximity-alerts
pub async fn list_proximity_alerts(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Json<ListProximityAlertsResponse>, ApiError> {
    let alerts: Vec<ProximityAlertResponse> = state
        .alerts
        .list_my_alerts(auth.user_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let total = alerts.len();
    Ok(Json(ListProximityAlertsResponse { alerts, total }))
}

/// GET /api/v1/proximity-alerts/:alert_id
pub async fn get_proximity_alert(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(alert_id): Path<Uuid>,
) -> Result<Json<ProximityAlertResponse>, ApiError> {
    let alert = state.alerts.get_alert(auth.user_id, alert_id).await?;
    Ok(Json(alert.into()))
}

/// Update a proximity alert (partial update).
///
/// PATCH /api/v1/proximity-alerts/:alert_id
pub async fn update_proximity_alert(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(alert_id): Path<Uuid>,
    Json(request): Json<UpdateProximityAlertRequest>,
) -> Result<Json<ProximityAlertResponse>, ApiError> {
    let alert = state
        .alerts
        .update_alert(auth.user_id, alert_id, request)
        .await?;
    Ok(Json(alert.into()))
}

/// DELETE /api/v1/proximity-alerts/:alert_id
pub async fn delete_proximity_alert(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(alert_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.alerts.delete_alert(auth.user_id, alert_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Match history of one of the caller's alerts, newest first.
///
/// GET /api/v1/proximity-alerts/:alert_id/matches
pub async fn list_proximity_matches(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(alert_id): Path<Uuid>,
) -> Result<Json<ListProximityMatchesResponse>, ApiError> {
    let matches: Vec<ProximityMatchResponse> = state
        .alerts
        .list_my_matches(auth.user_id, alert_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let total = matches.len();
    Ok(Json(ListProximityMatchesResponse { matches, total }))
}
