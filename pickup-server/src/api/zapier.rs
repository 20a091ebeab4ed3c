//! Zapier forwarding
//!
//! POST /send-to-zapier relays an arbitrary JSON body to the catch hook.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde_json::{Value, json};
use shared::error::AppError;

use super::json_rejection;
use crate::error::ServiceResult;
use crate::state::AppState;

pub async fn send_to_zapier(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ServiceResult<Json<Value>> {
    let Json(payload) = payload.map_err(json_rejection)?;
    let zapier = state
        .zapier
        .as_ref()
        .ok_or_else(|| AppError::not_configured("Zapier"))?;

    zapier.forward(&payload).await?;
    Ok(Json(json!({ "success": true })))
}
