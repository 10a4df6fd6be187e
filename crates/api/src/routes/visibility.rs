//! Visibility settings and nearby-user endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use domain::models::visibility::{
    NearbyQuery, NearbyUsersResponse, SetVisibilityRequest, VisibilitySettingsResponse,
};
use domain::models::VisibilityDecision;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

/// The caller's effective visibility settings.
///
/// GET /api/v1/visibility
pub async fn get_visibility_settings(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Json<VisibilitySettingsResponse>, ApiError> {
    let settings = state
        .locations
        .get_visibility_settings(auth.user_id, Utc::now())
        .await?;
    Ok(Json(settings))
}

/// Change the caller's visibility level.
///
/// PUT /api/v1/visibility
pub async fn set_visibility_level(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<SetVisibilityRequest>,
) -> Result<Json<VisibilitySettingsResponse>, ApiError> {
    let settings = state
        .locations
        .set_visibility_level(auth.user_id, request, Utc::now())
        .await?;
    Ok(Json(settings))
}

/// Users the caller may see around a position, nearest first.
///
/// GET /api/v1/nearby?latitude=..&longitude=..&radiusMeters=..
pub async fn list_nearby_users(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<NearbyUsersResponse>, ApiError> {
    query.validate()?;

    let users = state
        .visibility
        .list_visible_users(
            auth.user_id,
            query.coordinate(),
            query.radius_meters,
            Utc::now(),
        )
        .await?;

    let total = users.len();
    Ok(Json(NearbyUsersResponse { users, total }))
}

/// Whether the caller may see one user, and at what precision.
///
/// GET /api/v1/users/:user_id/visibility?latitude=..&longitude=..&radiusMeters=..
pub async fn resolve_user_visibility(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(user_id): Path<Uuid>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<VisibilityDecision>, ApiError> {
    query.validate()?;

    let decision = state
        .visibility
        .resolve_visibility(
            auth.user_id,
            user_id,
            query.coordinate(),
            query.radius_meters,
            Utc::now(),
        )
        .await?;
    Ok(Json(decision))
}
