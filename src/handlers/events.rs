// src/handlers/events.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError, config::AppState, db::event_repo::NewEvent,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogEventPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "page_view")]
    pub event_name: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "navigation")]
    pub event_type: String,

    pub page_path: Option<String>,
    pub referrer: Option<String>,
    pub ad_source: Option<String>,

    #[validate(length(min = 1, message = "required"))]
    pub session_id: String,
}

// POST /api/events  (public, append-only)
#[utoipa::path(
    post,
    path = "/api/events",
    tag = "Events",
    request_body = LogEventPayload,
    responses(
        (status = 201, description = "Event recorded", body = crate::models::event::Event),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn log_event(
    State(app_state): State<AppState>,
    Json(payload): Json<LogEventPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let event = app_state
        .repos
        .events
        .append(NewEvent {
            event_name: payload.event_name,
            event_type: payload.event_type,
            page_path: payload.page_path,
            referrer: payload.referrer,
            ad_source: payload.ad_source,
            session_id: payload.session_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(event)))
}
