// src/handlers/leads.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    db::lead_repo::{LeadFilter, LeadUpdate, NewLead},
    db::touch_point_repo::NewTouchPoint,
    db::StatusChange,
    middleware::auth::CurrentPrincipal,
    models::{
        lead::{FinanceNeed, Lead, STATUS_FOLLOW_UP},
        touch_point::{generate_touch_id, ContactMethod},
    },
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadPayload {
    /// Caller-supplied id; generated server-side when absent.
    pub lead_id: Option<String>,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Jane Doe")]
    pub name: String,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub project_interest: Option<String>,
    pub budget: Option<String>,
    pub finance_need: Option<FinanceNeed>,
    pub channel: Option<String>,
    pub click_source: Option<String>,
    pub website_source: Option<String>,
    pub ad_source: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeadPayload {
    #[validate(length(min = 1, message = "required"))]
    pub name: Option<String>,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub project_interest: Option<String>,
    pub budget: Option<String>,
    pub finance_need: Option<FinanceNeed>,
    pub channel: Option<String>,
    pub notes: Option<String>,
}

impl UpdateLeadPayload {
    fn into_update(self) -> LeadUpdate {
        LeadUpdate {
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            city: self.city,
            state: self.state,
            zipcode: self.zipcode,
            project_interest: self.project_interest,
            budget: self.budget,
            finance_need: self.finance_need.map(|f| f.as_str().to_string()),
            channel: self.channel,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LeadListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl LeadListQuery {
    pub fn into_filter(self) -> LeadFilter {
        LeadFilter {
            status: self.status,
            search: self.search,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Follow-up")]
    pub status: String,
    /// Only meaningful when status is "Follow-up"; ignored otherwise.
    pub follow_up_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTouchPointPayload {
    pub contact_method: ContactMethod,
    #[validate(length(min = 1, message = "required"))]
    pub description: String,
    /// When present and different from the lead's current status, the lead
    /// is transitioned and the touch point gets a system note.
    pub new_status: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

async fn owned_lead(
    app_state: &AppState,
    lead_id: &str,
    rep_uid: &str,
) -> Result<Lead, AppError> {
    app_state
        .repos
        .leads
        .find_by_id(lead_id)
        .await?
        .filter(|l| l.sales_rep == rep_uid)
        .ok_or_else(|| AppError::NotFound("Lead not found.".into()))
}

// POST /api/sales-rep/leads
#[utoipa::path(
    post,
    path = "/api/sales-rep/leads",
    tag = "Leads",
    request_body = CreateLeadPayload,
    responses(
        (status = 201, description = "Lead created", body = Lead),
        (status = 400, description = "Invalid payload")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_lead(
    State(app_state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Json(payload): Json<CreateLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let lead_id = payload
        .lead_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| format!("lead_{}", Uuid::new_v4().simple()));

    let lead = app_state
        .repos
        .leads
        .create(NewLead {
            lead_id,
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            address: payload.address,
            city: payload.city,
            state: payload.state,
            zipcode: payload.zipcode,
            project_interest: payload.project_interest,
            budget: payload.budget,
            finance_need: payload.finance_need.map(|f| f.as_str().to_string()),
            channel: payload.channel,
            click_source: payload.click_source,
            website_source: payload.website_source,
            ad_source: payload.ad_source,
            sales_rep: principal.uid,
            notes: payload.notes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(lead)))
}

// GET /api/sales-rep/leads
#[utoipa::path(
    get,
    path = "/api/sales-rep/leads",
    tag = "Leads",
    params(LeadListQuery),
    responses((status = 200, description = "Active leads for the caller", body = Vec<Lead>)),
    security(("api_jwt" = []))
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(query): Query<LeadListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let leads = app_state
        .repos
        .leads
        .list_active(Some(&principal.uid), &query.into_filter())
        .await?;

    Ok((StatusCode::OK, Json(leads)))
}

// GET /api/sales-rep/leads/{lead_id}
#[utoipa::path(
    get,
    path = "/api/sales-rep/leads/{lead_id}",
    tag = "Leads",
    params(("lead_id" = String, Path, description = "Lead id")),
    responses(
        (status = 200, description = "Lead detail", body = Lead),
        (status = 404, description = "Not found or not owned by caller")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_lead(
    State(app_state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(lead_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let lead = owned_lead(&app_state, &lead_id, &principal.uid).await?;
    Ok((StatusCode::OK, Json(lead)))
}

// PATCH /api/sales-rep/leads/{lead_id}
#[utoipa::path(
    patch,
    path = "/api/sales-rep/leads/{lead_id}",
    tag = "Leads",
    params(("lead_id" = String, Path, description = "Lead id")),
    request_body = UpdateLeadPayload,
    responses(
        (status = 200, description = "Lead updated", body = Lead),
        (status = 404, description = "Not found or not owned by caller")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_lead(
    State(app_state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(lead_id): Path<String>,
    Json(payload): Json<UpdateLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    owned_lead(&app_state, &lead_id, &principal.uid).await?;

    let lead = app_state
        .repos
        .leads
        .update_fields(&lead_id, &payload.into_update())
        .await?
        .ok_or_else(|| AppError::NotFound("Lead not found.".into()))?;

    Ok((StatusCode::OK, Json(lead)))
}

// PUT /api/sales-rep/leads/{lead_id}/status
#[utoipa::path(
    put,
    path = "/api/sales-rep/leads/{lead_id}/status",
    tag = "Leads",
    params(("lead_id" = String, Path, description = "Lead id")),
    request_body = SetStatusPayload,
    responses(
        (status = 200, description = "Status updated", body = Lead),
        (status = 404, description = "Not found or not owned by caller")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_lead_status(
    State(app_state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(lead_id): Path<String>,
    Json(payload): Json<SetStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    owned_lead(&app_state, &lead_id, &principal.uid).await?;

    let follow_up_date = if payload.status == STATUS_FOLLOW_UP {
        payload.follow_up_date
    } else {
        None
    };

    let lead = app_state
        .repos
        .leads
        .set_status(&lead_id, &payload.status, follow_up_date)
        .await?
        .ok_or_else(|| AppError::NotFound("Lead not found.".into()))?;

    Ok((StatusCode::OK, Json(lead)))
}

/// A status-changing touch point also transitions the lead and carries a
/// system note describing the transition. The two writes are planned here and
/// applied in one transaction by the store.
fn plan_touch_point(
    lead: &Lead,
    author_uid: &str,
    commenter_type: &str,
    payload: &CreateTouchPointPayload,
    now: chrono::DateTime<Utc>,
) -> (NewTouchPoint, Option<StatusChange>) {
    let status_change = payload
        .new_status
        .as_deref()
        .filter(|new_status| *new_status != lead.status)
        .map(|new_status| StatusChange {
            lead_id: lead.lead_id.clone(),
            status: new_status.to_string(),
            follow_up_date: if new_status == STATUS_FOLLOW_UP {
                payload.follow_up_date
            } else {
                None
            },
        });

    let system_note = status_change
        .as_ref()
        .map(|change| format!("Status changed from {} to {}", lead.status, change.status));

    let tp = NewTouchPoint {
        touch_id: generate_touch_id(now),
        uid: author_uid.to_string(),
        lead_id: lead.lead_id.clone(),
        contact_method: payload.contact_method.as_str().to_string(),
        description: payload.description.clone(),
        system_note,
        commenter_type: commenter_type.to_string(),
    };

    (tp, status_change)
}

/// Shared by the rep and admin routes; the admin path skips the ownership
/// filter and stamps `commenter_type = "admin"`.
pub async fn record_touch_point(
    app_state: &AppState,
    lead: &Lead,
    author_uid: &str,
    commenter_type: &str,
    payload: CreateTouchPointPayload,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (tp, status_change) = plan_touch_point(lead, author_uid, commenter_type, &payload, Utc::now());
    let touch_point = app_state.repos.record_touch_point(tp, status_change).await?;

    Ok((StatusCode::CREATED, Json(touch_point)))
}

// POST /api/sales-rep/leads/{lead_id}/touch-points
#[utoipa::path(
    post,
    path = "/api/sales-rep/leads/{lead_id}/touch-points",
    tag = "Touch Points",
    params(("lead_id" = String, Path, description = "Lead id")),
    request_body = CreateTouchPointPayload,
    responses(
        (status = 201, description = "Touch point recorded", body = crate::models::touch_point::TouchPoint),
        (status = 404, description = "Not found or not owned by caller")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_touch_point(
    State(app_state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(lead_id): Path<String>,
    Json(payload): Json<CreateTouchPointPayload>,
) -> Result<impl IntoResponse, AppError> {
    let lead = owned_lead(&app_state, &lead_id, &principal.uid).await?;
    record_touch_point(&app_state, &lead, &principal.uid, "sales_rep", payload).await
}

// GET /api/sales-rep/leads/{lead_id}/touch-points
#[utoipa::path(
    get,
    path = "/api/sales-rep/leads/{lead_id}/touch-points",
    tag = "Touch Points",
    params(("lead_id" = String, Path, description = "Lead id")),
    responses((status = 200, description = "Active touch points, oldest first", body = Vec<crate::models::touch_point::TouchPoint>)),
    security(("api_jwt" = []))
)]
pub async fn list_touch_points(
    State(app_state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(lead_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    owned_lead(&app_state, &lead_id, &principal.uid).await?;

    let touch_points = app_state
        .repos
        .touch_points
        .list_active_for_lead(&lead_id)
        .await?;

    Ok((StatusCode::OK, Json(touch_points)))
}

// DELETE /api/sales-rep/touch-points/{touch_id}
#[utoipa::path(
    delete,
    path = "/api/sales-rep/touch-points/{touch_id}",
    tag = "Touch Points",
    params(("touch_id" = String, Path, description = "Touch point id")),
    responses(
        (status = 200, description = "Touch point soft-deleted"),
        (status = 404, description = "Not found or not owned by caller")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_touch_point(
    State(app_state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(touch_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let touch_point = app_state
        .repos
        .touch_points
        .find_by_id(&touch_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Touch point not found.".into()))?;

    // Soft delete is allowed only on the caller's own leads.
    owned_lead(&app_state, &touch_point.lead_id, &principal.uid).await?;

    let affected = app_state.repos.touch_points.soft_delete(&touch_id).await?;
    if affected == 0 {
        return Err(AppError::NotFound("Touch point not found.".into()));
    }

    Ok((StatusCode::OK, Json(json!({ "deleted": touch_id }))))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepProfile {
    pub profile: crate::models::rep::SalesRep,
    /// Resolved live from the identity gateway; never stored locally.
    pub email: Option<String>,
}

// GET /api/sales-rep/me
#[utoipa::path(
    get,
    path = "/api/sales-rep/me",
    tag = "Profile",
    responses(
        (status = 200, description = "Caller's rep profile", body = RepProfile),
        (status = 404, description = "No rep profile for caller")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse, AppError> {
    let profile = app_state
        .repos
        .reps
        .find_active_rep(&principal.uid)
        .await?
        .ok_or_else(|| AppError::NotFound("Sales rep profile not found.".into()))?;

    Ok((
        StatusCode::OK,
        Json(RepProfile {
            profile,
            email: principal.user.email,
        }),
    ))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMePayload {
    #[validate(length(min = 1, message = "required"))]
    pub name: Option<String>,
    pub phone: Option<String>,
}

// PATCH /api/sales-rep/me
#[utoipa::path(
    patch,
    path = "/api/sales-rep/me",
    tag = "Profile",
    request_body = UpdateMePayload,
    responses(
        (status = 200, description = "Profile updated", body = crate::models::rep::SalesRep),
        (status = 404, description = "No rep profile for caller")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_me(
    State(app_state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Json(payload): Json<UpdateMePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    // Self-service updates cover name and phone only; grant key and
    // commission rate are admin-managed.
    let update = crate::db::rep_repo::RepUpdate {
        name: payload.name,
        phone: payload.phone,
        ..Default::default()
    };

    let profile = app_state
        .repos
        .reps
        .update_rep(&principal.uid, &update)
        .await?
        .ok_or_else(|| AppError::NotFound("Sales rep profile not found.".into()))?;

    Ok((StatusCode::OK, Json(profile)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn lead() -> Lead {
        Lead {
            lead_id: "L1".to_string(),
            name: "Jane Doe".to_string(),
            email: None,
            phone: None,
            address: None,
            city: None,
            state: None,
            zipcode: None,
            project_interest: None,
            budget: None,
            finance_need: None,
            channel: None,
            click_source: None,
            website_source: None,
            ad_source: None,
            status: "New".to_string(),
            follow_up_date: None,
            sales_rep: "rep1".to_string(),
            integration_id: None,
            integration_platform: None,
            commission_rate: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn payload(new_status: Option<&str>, follow_up_date: Option<NaiveDate>) -> CreateTouchPointPayload {
        CreateTouchPointPayload {
            contact_method: ContactMethod::PhoneCall,
            description: "Called the lead".to_string(),
            new_status: new_status.map(str::to_string),
            follow_up_date,
        }
    }

    #[test]
    fn status_changing_touch_point_carries_system_note_and_transition() {
        let date = NaiveDate::from_ymd_opt(2026, 9, 15).unwrap();
        let (tp, change) = plan_touch_point(
            &lead(),
            "rep1",
            "sales_rep",
            &payload(Some("Follow-up"), Some(date)),
            Utc::now(),
        );

        let change = change.unwrap();
        assert_eq!(change.lead_id, "L1");
        assert_eq!(change.status, "Follow-up");
        assert_eq!(change.follow_up_date, Some(date));
        assert_eq!(
            tp.system_note.as_deref(),
            Some("Status changed from New to Follow-up")
        );
        assert_eq!(tp.commenter_type, "sales_rep");
    }

    #[test]
    fn unchanged_status_plans_no_transition_and_no_note() {
        let (tp, change) = plan_touch_point(
            &lead(),
            "rep1",
            "sales_rep",
            &payload(Some("New"), None),
            Utc::now(),
        );
        assert!(change.is_none());
        assert!(tp.system_note.is_none());

        let (tp, change) =
            plan_touch_point(&lead(), "rep1", "admin", &payload(None, None), Utc::now());
        assert!(change.is_none());
        assert!(tp.system_note.is_none());
        assert_eq!(tp.commenter_type, "admin");
    }

    #[test]
    fn follow_up_date_is_dropped_for_other_statuses() {
        let date = NaiveDate::from_ymd_opt(2026, 9, 15).unwrap();
        let (_, change) = plan_touch_point(
            &lead(),
            "rep1",
            "sales_rep",
            &payload(Some("Contacted"), Some(date)),
            Utc::now(),
        );
        assert_eq!(change.unwrap().follow_up_date, None);
    }
}
