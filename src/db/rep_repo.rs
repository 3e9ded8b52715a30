// src/db/rep_repo.rs

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::rep::{Admin, SalesRep},
};

#[derive(Debug, Default)]
pub struct RepUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub grant_key: Option<String>,
    pub commission_rate: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct RepRepository {
    pool: PgPool,
}

impl RepRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_active_rep(&self, uid: &str) -> Result<Option<SalesRep>, AppError> {
        let rep = sqlx::query_as::<_, SalesRep>(
            "SELECT * FROM sales_reps WHERE uid = $1 AND is_active = TRUE",
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rep)
    }

    pub async fn find_active_admin(&self, uid: &str) -> Result<Option<Admin>, AppError> {
        let admin = sqlx::query_as::<_, Admin>(
            "SELECT * FROM admins WHERE uid = $1 AND is_active = TRUE",
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }

    pub async fn list_reps(&self) -> Result<Vec<SalesRep>, AppError> {
        let reps = sqlx::query_as::<_, SalesRep>(
            "SELECT * FROM sales_reps ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(reps)
    }

    pub async fn update_rep(
        &self,
        uid: &str,
        update: &RepUpdate,
    ) -> Result<Option<SalesRep>, AppError> {
        let rep = sqlx::query_as::<_, SalesRep>(
            r#"
            UPDATE sales_reps SET
                name            = COALESCE($2, name),
                phone           = COALESCE($3, phone),
                grant_key       = COALESCE($4, grant_key),
                commission_rate = COALESCE($5, commission_rate),
                is_active       = COALESCE($6, is_active)
            WHERE uid = $1
            RETURNING *
            "#,
        )
        .bind(uid)
        .bind(&update.name)
        .bind(&update.phone)
        .bind(&update.grant_key)
        .bind(update.commission_rate)
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rep)
    }

    /// Deactivation is the only removal mechanism; rows stay for audit.
    pub async fn deactivate_rep(&self, uid: &str) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE sales_reps SET is_active = FALSE WHERE uid = $1")
            .bind(uid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
