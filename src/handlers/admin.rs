// src/handlers/admin.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    db::lead_repo::LeadFilter,
    db::rep_repo::RepUpdate,
    handlers::leads::{record_touch_point, CreateTouchPointPayload},
    middleware::auth::CurrentPrincipal,
    models::lead::Lead,
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AdminLeadListQuery {
    /// Narrow to one rep's leads; all reps when absent.
    pub sales_rep: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// GET /api/admin/leads
#[utoipa::path(
    get,
    path = "/api/admin/leads",
    tag = "Admin",
    params(AdminLeadListQuery),
    responses((status = 200, description = "Active leads across all reps", body = Vec<Lead>)),
    security(("api_jwt" = []))
)]
pub async fn list_all_leads(
    State(app_state): State<AppState>,
    Query(query): Query<AdminLeadListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = LeadFilter {
        status: query.status,
        search: query.search,
        limit: query.limit,
        offset: query.offset,
    };

    let leads = app_state
        .repos
        .leads
        .list_active(query.sales_rep.as_deref(), &filter)
        .await?;

    Ok((StatusCode::OK, Json(leads)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReassignPayload {
    #[validate(length(min = 1, message = "required"))]
    pub sales_rep: String,
}

// PUT /api/admin/leads/{lead_id}/reassign
#[utoipa::path(
    put,
    path = "/api/admin/leads/{lead_id}/reassign",
    tag = "Admin",
    params(("lead_id" = String, Path, description = "Lead id")),
    request_body = ReassignPayload,
    responses(
        (status = 200, description = "Lead reassigned"),
        (status = 404, description = "Lead not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn reassign_lead(
    State(app_state): State<AppState>,
    Path(lead_id): Path<String>,
    Json(payload): Json<ReassignPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let affected = app_state
        .repos
        .leads
        .reassign(&lead_id, &payload.sales_rep)
        .await?;
    if affected == 0 {
        return Err(AppError::NotFound("Lead not found.".into()));
    }

    Ok((
        StatusCode::OK,
        Json(json!({ "leadId": lead_id, "salesRep": payload.sales_rep })),
    ))
}

// POST /api/admin/leads/{lead_id}/touch-points
#[utoipa::path(
    post,
    path = "/api/admin/leads/{lead_id}/touch-points",
    operation_id = "admin_create_touch_point",
    tag = "Admin",
    params(("lead_id" = String, Path, description = "Lead id")),
    request_body = CreateTouchPointPayload,
    responses(
        (status = 201, description = "Touch point recorded", body = crate::models::touch_point::TouchPoint),
        (status = 404, description = "Lead not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_touch_point(
    State(app_state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(lead_id): Path<String>,
    Json(payload): Json<CreateTouchPointPayload>,
) -> Result<impl IntoResponse, AppError> {
    // Admins may annotate any lead regardless of ownership.
    let lead = app_state
        .repos
        .leads
        .find_by_id(&lead_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Lead not found.".into()))?;

    record_touch_point(&app_state, &lead, &principal.uid, "admin", payload).await
}

// GET /api/admin/sales-reps
#[utoipa::path(
    get,
    path = "/api/admin/sales-reps",
    tag = "Admin",
    responses((status = 200, description = "All sales reps", body = Vec<crate::models::rep::SalesRep>)),
    security(("api_jwt" = []))
)]
pub async fn list_reps(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let reps = app_state.repos.reps.list_reps().await?;
    Ok((StatusCode::OK, Json(reps)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRepPayload {
    #[validate(length(min = 1, message = "required"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub grant_key: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub commission_rate: Option<Decimal>,
    pub is_active: Option<bool>,
}

// PATCH /api/admin/sales-reps/{uid}
#[utoipa::path(
    patch,
    path = "/api/admin/sales-reps/{uid}",
    tag = "Admin",
    params(("uid" = String, Path, description = "Rep uid")),
    request_body = UpdateRepPayload,
    responses(
        (status = 200, description = "Rep updated", body = crate::models::rep::SalesRep),
        (status = 404, description = "Rep not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_rep(
    State(app_state): State<AppState>,
    Path(uid): Path<String>,
    Json(payload): Json<UpdateRepPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let rep = app_state
        .repos
        .reps
        .update_rep(
            &uid,
            &RepUpdate {
                name: payload.name,
                phone: payload.phone,
                grant_key: payload.grant_key,
                commission_rate: payload.commission_rate,
                is_active: payload.is_active,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound("Sales rep not found.".into()))?;

    Ok((StatusCode::OK, Json(rep)))
}

// DELETE /api/admin/sales-reps/{uid}
#[utoipa::path(
    delete,
    path = "/api/admin/sales-reps/{uid}",
    tag = "Admin",
    params(("uid" = String, Path, description = "Rep uid")),
    responses(
        (status = 200, description = "Rep deactivated"),
        (status = 404, description = "Rep not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn deactivate_rep(
    State(app_state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let affected = app_state.repos.reps.deactivate_rep(&uid).await?;
    if affected == 0 {
        return Err(AppError::NotFound("Sales rep not found.".into()));
    }

    Ok((StatusCode::OK, Json(json!({ "deactivated": uid }))))
}

// GET /api/admin/events/summary
#[utoipa::path(
    get,
    path = "/api/admin/events/summary",
    tag = "Admin",
    responses((status = 200, description = "Aggregate analytics", body = crate::models::event::EventSummary)),
    security(("api_jwt" = []))
)]
pub async fn events_summary(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state.repos.events.summary().await?;
    Ok((StatusCode::OK, Json(summary)))
}
