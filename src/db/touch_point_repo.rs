// src/db/touch_point_repo.rs

use sqlx::PgPool;

use crate::{common::error::AppError, models::touch_point::TouchPoint};

pub struct NewTouchPoint {
    pub touch_id: String,
    pub uid: String,
    pub lead_id: String,
    pub contact_method: String,
    pub description: String,
    pub system_note: Option<String>,
    pub commenter_type: String,
}

#[derive(Clone)]
pub struct TouchPointRepository {
    pool: PgPool,
}

impl TouchPointRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active touch points oldest-first; the replay order during import.
    pub async fn list_active_for_lead(
        &self,
        lead_id: &str,
    ) -> Result<Vec<TouchPoint>, AppError> {
        let touch_points = sqlx::query_as::<_, TouchPoint>(
            r#"
            SELECT * FROM touch_points
            WHERE lead_id = $1 AND is_active = TRUE
            ORDER BY created_at ASC
            "#,
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(touch_points)
    }

    /// Soft delete only; touch points are never physically removed.
    pub async fn soft_delete(&self, touch_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE touch_points SET is_active = FALSE WHERE touch_id = $1 AND is_active = TRUE",
        )
        .bind(touch_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn find_by_id(&self, touch_id: &str) -> Result<Option<TouchPoint>, AppError> {
        let tp = sqlx::query_as::<_, TouchPoint>(
            "SELECT * FROM touch_points WHERE touch_id = $1",
        )
        .bind(touch_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tp)
    }
}
