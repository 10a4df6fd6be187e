//! Location reporting endpoint.

use axum::{extract::State, Json};
use chrono::Utc;
use tracing::debug;

use domain::models::location::{ReportLocationRequest, ReportLocationResponse};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics::record_location_reported;

/// Report the caller's current position.
///
/// POST /api/v1/locations
///
/// Persists the position and evaluates proximity alerts against it. The
/// reporter is never told whose alerts fired.
pub async fn report_location(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<ReportLocationRequest>,
) -> Result<Json<ReportLocationResponse>, ApiError> {
    let triggered = state
        .locations
        .report_location(auth.user_id, request, Utc::now())
        .await?;

    record_location_reported(triggered);
    debug!(user_id = %auth.user_id, triggered, "Location reported");

    Ok(Json(ReportLocationResponse {
        success: true,
        processed_count: 1,
    }))
}
