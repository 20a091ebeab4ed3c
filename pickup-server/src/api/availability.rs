//! Slot availability
//!
//! GET /check-availability/{pickupTime}/{pickupDate}
//!
//! Both path segments are opaque keys; no date or time format is enforced.

use axum::Json;
use axum::extract::{Path, State};
use shared::models::AvailabilityResponse;

use crate::error::ServiceResult;
use crate::state::AppState;

pub async fn check_availability(
    State(state): State<AppState>,
    Path((pickup_time, pickup_date)): Path<(String, String)>,
) -> ServiceResult<Json<AvailabilityResponse>> {
    let result = state.checker.check(&pickup_date, &pickup_time).await?;
    Ok(Json(result.into()))
}
