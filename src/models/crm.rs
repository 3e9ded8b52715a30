use serde::Serialize;
use utoipa::ToSchema;

// Remote CRM entities are owned by the CRM; these are transient projections
// of the JSON the RPC endpoint returns, never cached or mirrored locally.

/// The account created by the import workflow's critical step.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedCustomer {
    pub id: String,
    pub name: Option<String>,
    pub created_at: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: String,
    pub name: Option<String>,
    pub created_at: Option<String>,
}

/// A CRM document classified into a customer's contracts or estimates list.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrmDocument {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub status: String,
}

/// One entry of the rep/admin jobs view: a locally imported lead enriched
/// with its CRM jobs and matched documents. Batches that fail upstream leave
/// the arrays empty.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerJobs {
    pub lead_id: String,
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub sales_rep: String,
    pub jobs: Vec<JobSummary>,
    pub contracts: Vec<CrmDocument>,
    pub estimates: Vec<CrmDocument>,
}
