//! Event listing and creation endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use tracing::{debug, info};

use isimm_common::ApiResponse;

use super::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::{Event, EventDraft};

/// GET /events - All events, newest first
pub async fn list_events(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Vec<Event>>>> {
    debug!("Fetching events");

    let events = state.store.list_events().await.map_err(ApiError::store(
        "Failed to fetch events from database",
        !state.config.is_production(),
    ))?;

    info!("Found {} events", events.len());
    Ok(Json(ApiResponse::ok(events)))
}

/// POST /events - Create an event
pub async fn create_event(
    State(state): State<AppState>,
    payload: Result<Json<EventDraft>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Event>>> {
    let Json(draft) = payload.map_err(|e| ApiError::InvalidBody(e.body_text()))?;

    let new_event = draft.validate().map_err(|e| {
        debug!("Rejected event: {}", e);
        ApiError::from(e)
    })?;

    debug!("Creating event {:?}", new_event.title);
    let event = state
        .store
        .insert_event(new_event.stamp(Utc::now()))
        .await
        .map_err(ApiError::store("Failed to create event", !state.config.is_production()))?;

    Ok(Json(ApiResponse::ok(event).with_message("Event created successfully")))
}
