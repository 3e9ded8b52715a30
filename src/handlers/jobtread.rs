// src/handlers/jobtread.rs
//
// Routes backed by the CRM: the lead import itself and the read-side views.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::CurrentPrincipal,
    models::rep::Principal,
    services::import::ImportRequest,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportCustomerPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "L1")]
    pub lead_id: String,

    #[schema(example = "Residence")]
    pub customer_type: Option<String>,
    pub customer_title: Option<String>,
    pub contact_notes: Option<String>,
}

fn grant_key(principal: &Principal) -> Result<&str, AppError> {
    principal.grant_key.as_deref().ok_or_else(|| {
        AppError::BadRequest("No CRM grant key is configured for this account.".into())
    })
}

// POST /api/sales-rep/jobtread/customer
#[utoipa::path(
    post,
    path = "/api/sales-rep/jobtread/customer",
    tag = "JobTread",
    request_body = ImportCustomerPayload,
    responses(
        (status = 201, description = "Lead imported into the CRM", body = crate::services::import::ImportOutcome),
        (status = 400, description = "Missing lead id, lead name or grant key"),
        (status = 404, description = "Lead not found or not owned by caller"),
        (status = 409, description = "Lead already imported"),
        (status = 500, description = "CRM account creation failed")
    ),
    security(("api_jwt" = []))
)]
pub async fn import_customer(
    State(app_state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Json(payload): Json<ImportCustomerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let outcome = app_state
        .import_service
        .import_lead(
            &principal,
            ImportRequest {
                lead_id: payload.lead_id,
                customer_type: payload.customer_type,
                customer_title: payload.customer_title,
                contact_notes: payload.contact_notes,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

// GET /api/sales-rep/jobtread/customer/{customer_id}
#[utoipa::path(
    get,
    path = "/api/sales-rep/jobtread/customer/{customer_id}",
    tag = "JobTread",
    params(("customer_id" = String, Path, description = "CRM customer id")),
    responses(
        (status = 200, description = "Customer with jobs and locations", body = crate::services::jobs::CustomerDetail),
        (status = 404, description = "Customer unknown to the CRM")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(customer_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state
        .jobs_service
        .get_customer(grant_key(&principal)?, &customer_id)
        .await?;

    Ok((StatusCode::OK, Json(detail)))
}

// GET /api/sales-rep/jobs
#[utoipa::path(
    get,
    path = "/api/sales-rep/jobs",
    tag = "JobTread",
    responses((status = 200, description = "Caller's imported customers with jobs, contracts and estimates", body = Vec<crate::models::crm::CustomerJobs>)),
    security(("api_jwt" = []))
)]
pub async fn rep_jobs(
    State(app_state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse, AppError> {
    let customers = app_state
        .jobs_service
        .list_jobs(grant_key(&principal)?, Some(&principal.uid))
        .await?;

    Ok((StatusCode::OK, Json(customers)))
}

// GET /api/admin/jobs
#[utoipa::path(
    get,
    path = "/api/admin/jobs",
    tag = "JobTread",
    responses((status = 200, description = "All imported customers with jobs, contracts and estimates", body = Vec<crate::models::crm::CustomerJobs>)),
    security(("api_jwt" = []))
)]
pub async fn admin_jobs(
    State(app_state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse, AppError> {
    let customers = app_state
        .jobs_service
        .list_jobs(grant_key(&principal)?, None)
        .await?;

    Ok((StatusCode::OK, Json(customers)))
}
