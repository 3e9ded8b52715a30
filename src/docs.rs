// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Events ---
        handlers::events::log_event,

        // --- Leads ---
        handlers::leads::create_lead,
        handlers::leads::list_leads,
        handlers::leads::get_lead,
        handlers::leads::update_lead,
        handlers::leads::set_lead_status,

        // --- Touch Points ---
        handlers::leads::create_touch_point,
        handlers::leads::list_touch_points,
        handlers::leads::delete_touch_point,

        // --- Profile ---
        handlers::leads::get_me,
        handlers::leads::update_me,

        // --- JobTread ---
        handlers::jobtread::import_customer,
        handlers::jobtread::get_customer,
        handlers::jobtread::rep_jobs,
        handlers::jobtread::admin_jobs,

        // --- Admin ---
        handlers::admin::list_all_leads,
        handlers::admin::reassign_lead,
        handlers::admin::create_touch_point,
        handlers::admin::list_reps,
        handlers::admin::update_rep,
        handlers::admin::deactivate_rep,
        handlers::admin::events_summary,
    ),
    components(
        schemas(
            // --- Models ---
            models::lead::Lead,
            models::lead::FinanceNeed,
            models::touch_point::TouchPoint,
            models::touch_point::ContactMethod,
            models::rep::Role,
            models::rep::SalesRep,
            models::rep::Admin,
            models::rep::IdentityUser,
            models::event::Event,
            models::event::CountedEntry,
            models::event::EventSummary,
            models::crm::CreatedCustomer,
            models::crm::JobSummary,
            models::crm::CrmDocument,
            models::crm::CustomerJobs,
            services::import::ImportOutcome,
            services::import::LeadSnapshot,
            services::jobs::CustomerDetail,

            // --- Payloads ---
            handlers::leads::CreateLeadPayload,
            handlers::leads::UpdateLeadPayload,
            handlers::leads::SetStatusPayload,
            handlers::leads::CreateTouchPointPayload,
            handlers::leads::UpdateMePayload,
            handlers::leads::RepProfile,
            handlers::jobtread::ImportCustomerPayload,
            handlers::admin::ReassignPayload,
            handlers::admin::UpdateRepPayload,
            handlers::events::LogEventPayload,
        )
    ),
    tags(
        (name = "Leads", description = "Lead creation and tracking"),
        (name = "Touch Points", description = "Interaction log against leads"),
        (name = "Profile", description = "Sales rep self-service profile"),
        (name = "JobTread", description = "CRM import and job views"),
        (name = "Admin", description = "Rep management and cross-rep views"),
        (name = "Events", description = "Page/UI analytics")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
