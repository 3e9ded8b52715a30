// src/services/import.rs
//
// Converts one lead into a CRM customer. Creating the account is the single
// commit point; everything after it is best-effort and must never abort the
// import or roll anything back.

use std::{fmt::Display, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    config::CrmConfig,
    crm::{CrmExecutor, QueryDoc},
    models::{
        crm::CreatedCustomer,
        lead::{Lead, INTEGRATION_PLATFORM, STATUS_IMPORTED},
        rep::{Principal, SalesRep},
        touch_point::TouchPoint,
    },
};

/// The slice of the relational store the workflow touches, behind a seam so
/// the orchestration can be exercised against an in-memory fake.
#[async_trait]
pub trait ImportStore: Send + Sync {
    async fn find_lead(&self, lead_id: &str) -> Result<Option<Lead>, AppError>;
    async fn find_active_rep(&self, uid: &str) -> Result<Option<SalesRep>, AppError>;
    /// Conditional `status <> 'Imported'` update; returns affected rows.
    async fn mark_imported(
        &self,
        lead_id: &str,
        integration_id: &str,
        commission_rate: Option<rust_decimal::Decimal>,
    ) -> Result<u64, AppError>;
    async fn active_touch_points(&self, lead_id: &str) -> Result<Vec<TouchPoint>, AppError>;
}

#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub lead_id: String,
    pub customer_type: Option<String>,
    pub customer_title: Option<String>,
    pub contact_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadSnapshot {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub customer: CreatedCustomer,
    pub lead_id: String,
    pub lead_data: LeadSnapshot,
    pub integration: String,
    pub note: String,
    /// One entry per failed best-effort step; empty on a clean run.
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct LeadImportService {
    crm: Arc<dyn CrmExecutor>,
    store: Arc<dyn ImportStore>,
    config: Arc<CrmConfig>,
}

impl LeadImportService {
    pub fn new(
        crm: Arc<dyn CrmExecutor>,
        store: Arc<dyn ImportStore>,
        config: Arc<CrmConfig>,
    ) -> Self {
        Self { crm, store, config }
    }

    pub async fn import_lead(
        &self,
        principal: &Principal,
        request: ImportRequest,
    ) -> Result<ImportOutcome, AppError> {
        // Preconditions, checked in order; each is a distinct failure.
        let rep = self
            .store
            .find_active_rep(&principal.uid)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Sales rep profile not found.".into()))?;

        let grant_key = rep.grant_key.clone().ok_or_else(|| {
            AppError::BadRequest("No CRM grant key is configured for this account.".into())
        })?;

        let organization_id = self
            .config
            .organization_id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("CRM organization id is not configured"))?;

        if request.lead_id.trim().is_empty() {
            return Err(AppError::BadRequest("lead_id is required.".into()));
        }

        let lead = self
            .store
            .find_lead(&request.lead_id)
            .await?
            .filter(|l| l.sales_rep == principal.uid)
            .ok_or_else(|| AppError::NotFound("Lead not found.".into()))?;

        if lead.name.trim().is_empty() {
            return Err(AppError::BadRequest("Lead has no name.".into()));
        }
        if lead.status == STATUS_IMPORTED {
            return Err(AppError::Conflict("Lead has already been imported.".into()));
        }

        // Critical step: create the customer account. Failure here fails the
        // whole import with no local state change.
        let customer_name =
            derive_customer_name(&lead.name, request.customer_type.as_deref(), self.config.is_production);

        let create_account = QueryDoc::select().child(
            "createAccount",
            QueryDoc::op(json!({
                "organizationId": organization_id,
                "name": customer_name,
                "type": "customer",
                "isTaxable": false,
                "customFieldValues": { "Imported by": rep.name },
            }))
            .child(
                "createdAccount",
                QueryDoc::select().fields(&["id", "name", "createdAt", "type"]),
            ),
        );

        let account_response = self.crm.execute(&grant_key, create_account).await?;
        let created = &account_response["createAccount"]["createdAccount"];
        let customer_id = created["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("CRM did not return a created account id"))?;

        // Commit point: persist the imported flag before any best-effort
        // step, so a later failure still leaves the lead correctly marked.
        let affected = self
            .store
            .mark_imported(&lead.lead_id, &customer_id, rep.commission_rate)
            .await?;
        if affected == 0 {
            tracing::warn!(
                lead_id = %lead.lead_id,
                customer_id = %customer_id,
                "lead was imported concurrently; CRM account is orphaned"
            );
            return Err(AppError::Conflict("Lead has already been imported.".into()));
        }

        // Everything below is best-effort: log, record a warning, keep going.
        let mut warnings = Vec::new();

        let contact_id = if lead.has_contact_info() {
            self.create_contact(&grant_key, &customer_id, &lead, &request, &mut warnings)
                .await
        } else {
            None
        };

        let location_id = if lead.has_location_info() {
            self.create_location(&grant_key, &customer_id, contact_id.as_deref(), &lead, &mut warnings)
                .await
        } else {
            None
        };

        self.replay_touch_points(&grant_key, &customer_id, &lead.lead_id, &mut warnings)
            .await;

        if let Some(summary) = compose_intake_summary(&lead) {
            self.post_comment(&grant_key, &customer_id, &summary, "intake summary", &mut warnings)
                .await;
        }

        if let Some(location_id) = location_id {
            if let Some(job_id) = self
                .create_job(&grant_key, &location_id, &customer_name, &mut warnings)
                .await
            {
                self.copy_checklist(&grant_key, &job_id, &mut warnings).await;
            }
        }

        let note = if lead.has_contact_info() {
            "Customer created with contact information attached.".to_string()
        } else {
            "Customer created without contact information (lead has no email or phone).".to_string()
        };

        Ok(ImportOutcome {
            customer: CreatedCustomer {
                id: customer_id,
                name: created["name"].as_str().map(str::to_string),
                created_at: created["createdAt"].as_str().map(str::to_string),
                account_type: created["type"].as_str().map(str::to_string),
            },
            lead_id: lead.lead_id.clone(),
            lead_data: LeadSnapshot {
                name: lead.name.clone(),
                email: lead.email.clone(),
                phone: lead.phone.clone(),
            },
            integration: INTEGRATION_PLATFORM.to_string(),
            note,
            warnings,
        })
    }

    async fn create_contact(
        &self,
        grant_key: &str,
        customer_id: &str,
        lead: &Lead,
        request: &ImportRequest,
        warnings: &mut Vec<String>,
    ) -> Option<String> {
        let mut custom_fields = Map::new();
        if let Some(email) = lead.email.as_deref().filter(|e| !e.is_empty()) {
            custom_fields.insert("Email".to_string(), json!(email));
        }
        if let Some(phone) = lead.phone.as_deref().filter(|p| !p.is_empty()) {
            custom_fields.insert("Phone".to_string(), json!(phone));
        }

        let mut args = Map::new();
        args.insert("accountId".to_string(), json!(customer_id));
        args.insert("name".to_string(), json!(lead.name));
        args.insert("customFieldValues".to_string(), Value::Object(custom_fields));
        if let Some(title) = &request.customer_title {
            args.insert("title".to_string(), json!(title));
        }
        if let Some(notes) = &request.contact_notes {
            args.insert("notes".to_string(), json!(notes));
        }

        let doc = QueryDoc::select().child(
            "createContact",
            QueryDoc::op(Value::Object(args))
                .child("createdContact", QueryDoc::select().field("id")),
        );

        match self.crm.execute(grant_key, doc).await {
            Ok(response) => {
                let id = response["createContact"]["createdContact"]["id"]
                    .as_str()
                    .map(str::to_string);
                if id.is_none() {
                    record_failure(warnings, "contact", "no created contact id in response");
                }
                id
            }
            Err(e) => {
                record_failure(warnings, "contact", e);
                None
            }
        }
    }

    async fn create_location(
        &self,
        grant_key: &str,
        customer_id: &str,
        contact_id: Option<&str>,
        lead: &Lead,
        warnings: &mut Vec<String>,
    ) -> Option<String> {
        let mut args = Map::new();
        args.insert("accountId".to_string(), json!(customer_id));
        args.insert("name".to_string(), json!(lead.name));
        args.insert("address".to_string(), json!(format_address(lead)));
        if let Some(contact_id) = contact_id {
            args.insert("contactId".to_string(), json!(contact_id));
        }

        let doc = QueryDoc::select().child(
            "createLocation",
            QueryDoc::op(Value::Object(args))
                .child("createdLocation", QueryDoc::select().field("id")),
        );

        match self.crm.execute(grant_key, doc).await {
            Ok(response) => {
                let id = response["createLocation"]["createdLocation"]["id"]
                    .as_str()
                    .map(str::to_string);
                if id.is_none() {
                    record_failure(warnings, "location", "no created location id in response");
                }
                id
            }
            Err(e) => {
                record_failure(warnings, "location", e);
                None
            }
        }
    }

    /// Replays the lead's active touch points as internal comments, oldest
    /// first. One failing comment does not stop the remaining ones.
    async fn replay_touch_points(
        &self,
        grant_key: &str,
        customer_id: &str,
        lead_id: &str,
        warnings: &mut Vec<String>,
    ) {
        let touch_points = match self.store.active_touch_points(lead_id).await {
            Ok(tps) => tps,
            Err(e) => {
                record_failure(warnings, "touch point replay", e);
                return;
            }
        };

        for tp in &touch_points {
            let message = compose_touch_point_comment(tp);
            self.post_comment(grant_key, customer_id, &message, "touch point comment", warnings)
                .await;
        }
    }

    async fn post_comment(
        &self,
        grant_key: &str,
        customer_id: &str,
        message: &str,
        step: &str,
        warnings: &mut Vec<String>,
    ) {
        let doc = QueryDoc::select().child(
            "createComment",
            QueryDoc::op(json!({
                "targetId": customer_id,
                "targetType": "account",
                "message": message,
                "visibility": "internal",
            }))
            .child("createdComment", QueryDoc::select().field("id")),
        );

        if let Err(e) = self.crm.execute(grant_key, doc).await {
            record_failure(warnings, step, e);
        }
    }

    async fn create_job(
        &self,
        grant_key: &str,
        location_id: &str,
        name: &str,
        warnings: &mut Vec<String>,
    ) -> Option<String> {
        let doc = QueryDoc::select().child(
            "createJob",
            QueryDoc::op(json!({ "locationId": location_id, "name": name }))
                .child("createdJob", QueryDoc::select().field("id")),
        );

        match self.crm.execute(grant_key, doc).await {
            Ok(response) => {
                let id = response["createJob"]["createdJob"]["id"]
                    .as_str()
                    .map(str::to_string);
                if id.is_none() {
                    record_failure(warnings, "job", "no created job id in response");
                }
                id
            }
            Err(e) => {
                record_failure(warnings, "job", e);
                None
            }
        }
    }

    /// Copies the fixed sales-process checklist onto the new job without
    /// notifying assignees. Skipped when no template is configured.
    async fn copy_checklist(&self, grant_key: &str, job_id: &str, warnings: &mut Vec<String>) {
        let Some(template_id) = self.config.checklist_template_id.as_deref() else {
            tracing::warn!("no checklist template configured; skipping checklist step");
            return;
        };

        let doc = QueryDoc::select().child(
            "copyTaskTemplate",
            QueryDoc::op(json!({
                "jobId": job_id,
                "taskTemplateId": template_id,
                "notify": false,
            })),
        );

        if let Err(e) = self.crm.execute(grant_key, doc).await {
            record_failure(warnings, "checklist", e);
        }
    }
}

fn record_failure(warnings: &mut Vec<String>, step: &str, error: impl Display) {
    tracing::warn!("best-effort step '{step}' failed: {error}");
    warnings.push(format!("{step}: {error}"));
}

/// Display name for the CRM account: lead name, optional customer-type
/// suffix, and a `[TEST] ` prefix outside production.
pub fn derive_customer_name(
    lead_name: &str,
    customer_type: Option<&str>,
    is_production: bool,
) -> String {
    let mut name = lead_name.trim().to_string();
    if let Some(customer_type) = customer_type.map(str::trim).filter(|t| !t.is_empty()) {
        name = format!("{name} {customer_type}");
    }
    if is_production {
        name
    } else {
        format!("[TEST] {name}")
    }
}

/// Concatenates the lead's address parts into one address string.
pub fn format_address(lead: &Lead) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(address) = lead.address.as_deref().filter(|s| !s.is_empty()) {
        parts.push(address.to_string());
    }
    if let Some(city) = lead.city.as_deref().filter(|s| !s.is_empty()) {
        parts.push(city.to_string());
    }
    match (
        lead.state.as_deref().filter(|s| !s.is_empty()),
        lead.zipcode.as_deref().filter(|s| !s.is_empty()),
    ) {
        (Some(state), Some(zip)) => parts.push(format!("{state} {zip}")),
        (Some(state), None) => parts.push(state.to_string()),
        (None, Some(zip)) => parts.push(zip.to_string()),
        (None, None) => {}
    }
    parts.join(", ")
}

fn human_date(date: DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Comment body for one replayed touch point: description, the system note
/// when present, and a human-readable creation date.
pub fn compose_touch_point_comment(tp: &TouchPoint) -> String {
    let mut message = tp.description.clone();
    if let Some(system_note) = tp.system_note.as_deref().filter(|n| !n.is_empty()) {
        message.push('\n');
        message.push_str(system_note);
    }
    message.push_str(&format!("\n- {}", human_date(tp.created_at)));
    message
}

/// Intake summary comment, one `Label: value` line per present field.
/// Returns None when the lead carries none of the intake fields.
pub fn compose_intake_summary(lead: &Lead) -> Option<String> {
    let fields = [
        ("Finance Need", lead.finance_need.as_deref()),
        ("Channel", lead.channel.as_deref()),
        ("Budget", lead.budget.as_deref()),
        ("Project Interest", lead.project_interest.as_deref()),
    ];

    let lines: Vec<String> = fields
        .iter()
        .filter_map(|(label, value)| {
            value
                .filter(|v| !v.is_empty())
                .map(|v| format!("{label}: {v}"))
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
