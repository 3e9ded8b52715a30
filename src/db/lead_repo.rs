// src/db/lead_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::lead::{Lead, INTEGRATION_PLATFORM, STATUS_IMPORTED},
};

/// Optional filters for lead listings. All listings exclude imported leads;
/// those are surfaced through the jobs views instead.
#[derive(Debug, Default)]
pub struct LeadFilter {
    pub status: Option<String>,
    /// Case-insensitive substring match over name, email and phone.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub struct NewLead {
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
    pub sales_rep: String,
    pub notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct LeadUpdate {
    pub name: Option<String>,
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
    pub notes: Option<String>,
}

/// Pagination bounds with negatives clamped; a negative LIMIT or OFFSET is a
/// Postgres error, not an empty page.
fn page_bounds(filter: &LeadFilter) -> (i64, i64) {
    (
        filter.limit.unwrap_or(100).max(0),
        filter.offset.unwrap_or(0).max(0),
    )
}

#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, lead: NewLead) -> Result<Lead, AppError> {
        let created = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (
                lead_id, name, email, phone, address, city, state, zipcode,
                project_interest, budget, finance_need, channel,
                click_source, website_source, ad_source, sales_rep, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(&lead.lead_id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.address)
        .bind(&lead.city)
        .bind(&lead.state)
        .bind(&lead.zipcode)
        .bind(&lead.project_interest)
        .bind(&lead.budget)
        .bind(&lead.finance_need)
        .bind(&lead.channel)
        .bind(&lead.click_source)
        .bind(&lead.website_source)
        .bind(&lead.ad_source)
        .bind(&lead.sales_rep)
        .bind(&lead.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::Conflict(format!(
                        "Lead '{}' already exists.",
                        lead.lead_id
                    ));
                }
            }
            e.into()
        })?;

        Ok(created)
    }

    pub async fn find_by_id(&self, lead_id: &str) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE lead_id = $1")
            .bind(lead_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lead)
    }

    /// Active leads, newest first. `rep_uid = None` is the admin scope.
    pub async fn list_active(
        &self,
        rep_uid: Option<&str>,
        filter: &LeadFilter,
    ) -> Result<Vec<Lead>, AppError> {
        let search = filter.search.as_ref().map(|s| format!("%{s}%"));
        let (limit, offset) = page_bounds(filter);

        let leads = sqlx::query_as::<_, Lead>(
            r#"
            SELECT * FROM leads
            WHERE status <> $1
              AND ($2::TEXT IS NULL OR sales_rep = $2)
              AND ($3::TEXT IS NULL OR status = $3)
              AND ($4::TEXT IS NULL OR name ILIKE $4 OR email ILIKE $4 OR phone ILIKE $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(STATUS_IMPORTED)
        .bind(rep_uid)
        .bind(&filter.status)
        .bind(search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(leads)
    }

    pub async fn update_fields(
        &self,
        lead_id: &str,
        update: &LeadUpdate,
    ) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads SET
                name             = COALESCE($2, name),
                email            = COALESCE($3, email),
                phone            = COALESCE($4, phone),
                address          = COALESCE($5, address),
                city             = COALESCE($6, city),
                state            = COALESCE($7, state),
                zipcode          = COALESCE($8, zipcode),
                project_interest = COALESCE($9, project_interest),
                budget           = COALESCE($10, budget),
                finance_need     = COALESCE($11, finance_need),
                channel          = COALESCE($12, channel),
                notes            = COALESCE($13, notes),
                updated_at       = NOW()
            WHERE lead_id = $1
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(&update.name)
        .bind(&update.email)
        .bind(&update.phone)
        .bind(&update.address)
        .bind(&update.city)
        .bind(&update.state)
        .bind(&update.zipcode)
        .bind(&update.project_interest)
        .bind(&update.budget)
        .bind(&update.finance_need)
        .bind(&update.channel)
        .bind(&update.notes)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lead)
    }

    /// `follow_up_date` is only meaningful for the Follow-up status; callers
    /// pass None otherwise and any previous date is cleared.
    pub async fn set_status(
        &self,
        lead_id: &str,
        status: &str,
        follow_up_date: Option<NaiveDate>,
    ) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads
            SET status = $2, follow_up_date = $3, updated_at = NOW()
            WHERE lead_id = $1
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(status)
        .bind(follow_up_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lead)
    }

    pub async fn reassign(&self, lead_id: &str, new_rep: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE leads SET sales_rep = $2, updated_at = NOW() WHERE lead_id = $1",
        )
        .bind(lead_id)
        .bind(new_rep)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// The import commit point. The `status <> 'Imported'` guard is the sole
    /// at-most-once mechanism: a second concurrent import affects 0 rows and
    /// the caller treats that as a conflict.
    pub async fn mark_imported(
        &self,
        lead_id: &str,
        integration_id: &str,
        commission_rate: Option<Decimal>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE leads
            SET status = $2,
                integration_id = $3,
                integration_platform = $4,
                commission_rate = $5,
                updated_at = NOW()
            WHERE lead_id = $1 AND status <> $2
            "#,
        )
        .bind(lead_id)
        .bind(STATUS_IMPORTED)
        .bind(integration_id)
        .bind(INTEGRATION_PLATFORM)
        .bind(commission_rate)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Imported leads with a CRM id, for the jobs aggregation.
    pub async fn list_imported(&self, rep_uid: Option<&str>) -> Result<Vec<Lead>, AppError> {
        let leads = sqlx::query_as::<_, Lead>(
            r#"
            SELECT * FROM leads
            WHERE status = $1
              AND integration_id IS NOT NULL
              AND ($2::TEXT IS NULL OR sales_rep = $2)
            ORDER BY updated_at DESC
            "#,
        )
        .bind(STATUS_IMPORTED)
        .bind(rep_uid)
        .fetch_all(&self.pool)
        .await?;

        Ok(leads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_default_and_clamp_negatives() {
        assert_eq!(page_bounds(&LeadFilter::default()), (100, 0));
        assert_eq!(
            page_bounds(&LeadFilter {
                limit: Some(25),
                offset: Some(50),
                ..Default::default()
            }),
            (25, 50)
        );
        assert_eq!(
            page_bounds(&LeadFilter {
                limit: Some(-1),
                offset: Some(-10),
                ..Default::default()
            }),
            (0, 0)
        );
    }
}
