pub mod event_repo;
pub mod lead_repo;
pub mod rep_repo;
pub mod touch_point_repo;

pub use event_repo::EventRepository;
pub use lead_repo::LeadRepository;
pub use rep_repo::RepRepository;
pub use touch_point_repo::TouchPointRepository;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::touch_point_repo::NewTouchPoint,
    models::{
        lead::Lead,
        rep::{Admin, SalesRep},
        touch_point::TouchPoint,
    },
    services::{auth::RoleStore, import::ImportStore, jobs::ImportedLeadSource},
};

/// Lead status transition applied together with a touch-point insert.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub lead_id: String,
    pub status: String,
    pub follow_up_date: Option<NaiveDate>,
}

/// One handle over all repositories, shared through `AppState`. Also the
/// production implementation of the store seams the services are tested
/// against, and the home of the one cross-table transactional write.
#[derive(Clone)]
pub struct Repositories {
    pool: PgPool,
    pub leads: LeadRepository,
    pub touch_points: TouchPointRepository,
    pub reps: RepRepository,
    pub events: EventRepository,
}

impl Repositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            leads: LeadRepository::new(pool.clone()),
            touch_points: TouchPointRepository::new(pool.clone()),
            reps: RepRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            pool,
        }
    }

    /// Inserts a touch point and, when it also transitions the lead, applies
    /// both writes in one transaction. A failed insert must not leave a
    /// status change behind with no touch point recording it.
    pub async fn record_touch_point(
        &self,
        tp: NewTouchPoint,
        status_change: Option<StatusChange>,
    ) -> Result<TouchPoint, AppError> {
        let mut tx = self.pool.begin().await?;

        if let Some(change) = &status_change {
            sqlx::query(
                r#"
                UPDATE leads
                SET status = $2, follow_up_date = $3, updated_at = NOW()
                WHERE lead_id = $1
                "#,
            )
            .bind(&change.lead_id)
            .bind(&change.status)
            .bind(change.follow_up_date)
            .execute(&mut *tx)
            .await?;
        }

        let created = sqlx::query_as::<_, TouchPoint>(
            r#"
            INSERT INTO touch_points (
                touch_id, uid, lead_id, contact_method, description,
                system_note, commenter_type
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&tp.touch_id)
        .bind(&tp.uid)
        .bind(&tp.lead_id)
        .bind(&tp.contact_method)
        .bind(&tp.description)
        .bind(&tp.system_note)
        .bind(&tp.commenter_type)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }
}

#[async_trait]
impl RoleStore for Repositories {
    async fn find_active_rep(&self, uid: &str) -> Result<Option<SalesRep>, AppError> {
        self.reps.find_active_rep(uid).await
    }

    async fn find_active_admin(&self, uid: &str) -> Result<Option<Admin>, AppError> {
        self.reps.find_active_admin(uid).await
    }
}

#[async_trait]
impl ImportStore for Repositories {
    async fn find_lead(&self, lead_id: &str) -> Result<Option<Lead>, AppError> {
        self.leads.find_by_id(lead_id).await
    }

    async fn find_active_rep(&self, uid: &str) -> Result<Option<SalesRep>, AppError> {
        self.reps.find_active_rep(uid).await
    }

    async fn mark_imported(
        &self,
        lead_id: &str,
        integration_id: &str,
        commission_rate: Option<rust_decimal::Decimal>,
    ) -> Result<u64, AppError> {
        self.leads
            .mark_imported(lead_id, integration_id, commission_rate)
            .await
    }

    async fn active_touch_points(&self, lead_id: &str) -> Result<Vec<TouchPoint>, AppError> {
        self.touch_points.list_active_for_lead(lead_id).await
    }
}

#[async_trait]
impl ImportedLeadSource for Repositories {
    async fn list_imported(&self, rep_uid: Option<&str>) -> Result<Vec<Lead>, AppError> {
        self.leads.list_imported(rep_uid).await
    }
}
