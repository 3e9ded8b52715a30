use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Terminal lead state; once set the lead is excluded from active listings
/// and reclassified as a job.
pub const STATUS_IMPORTED: &str = "Imported";
pub const STATUS_FOLLOW_UP: &str = "Follow-up";

pub const INTEGRATION_PLATFORM: &str = "JobTread";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub lead_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub project_interest: Option<String>,
    pub budget: Option<String>,
    pub finance_need: Option<String>,
    pub channel: Option<String>,
    pub click_source: Option<String>,
    pub website_source: Option<String>,
    pub ad_source: Option<String>,

    // Free-text state; "Imported" is the one terminal value the code keys on.
    pub status: String,

    // Only meaningful while status = "Follow-up".
    pub follow_up_date: Option<NaiveDate>,

    // Owning rep's uid, or "unassigned".
    pub sales_rep: String,

    // Set exactly once by the import workflow.
    pub integration_id: Option<String>,
    pub integration_platform: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub commission_rate: Option<Decimal>,

    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn has_contact_info(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.is_empty())
            || self.phone.as_deref().is_some_and(|p| !p.is_empty())
    }

    pub fn has_location_info(&self) -> bool {
        self.address.as_deref().is_some_and(|a| !a.is_empty())
            && self.city.as_deref().is_some_and(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum FinanceNeed {
    Yes,
    No,
}

impl FinanceNeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinanceNeed::Yes => "Yes",
            FinanceNeed::No => "No",
        }
    }
}
