use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Closed role set; keeps the role gates exhaustive instead of matching on
/// free-form strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SalesRep,
    Admin,
}

/// Profile row for a sales rep. The uid is the identity-provider subject;
/// rows are provisioned out of band and never physically deleted. Email is
/// never stored locally, it is always resolved live from the identity
/// gateway.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesRep {
    pub uid: String,
    pub name: String,
    pub phone: Option<String>,

    // CRM credential for this rep; required before they can import leads.
    #[serde(skip_serializing)]
    pub grant_key: Option<String>,

    #[schema(value_type = Option<f64>)]
    pub commission_rate: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub uid: String,
    pub name: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// User record as resolved from the identity gateway. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentityUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Request-scoped principal produced by the auth gate and carried in request
/// extensions until the response completes.
#[derive(Debug, Clone)]
pub struct Principal {
    pub uid: String,
    pub user: IdentityUser,
    pub roles: Vec<Role>,
    pub grant_key: Option<String>,
}

impl Principal {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}
