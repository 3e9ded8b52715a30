// src/db/event_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::event::{CountedEntry, Event, EventSummary},
};

pub struct NewEvent {
    pub event_name: String,
    pub event_type: String,
    pub page_path: Option<String>,
    pub referrer: Option<String>,
    pub ad_source: Option<String>,
    pub session_id: String,
}

#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, event: NewEvent) -> Result<Event, AppError> {
        let created = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (
                event_id, event_name, event_type, page_path, referrer,
                ad_source, session_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&event.event_name)
        .bind(&event.event_type)
        .bind(&event.page_path)
        .bind(&event.referrer)
        .bind(&event.ad_source)
        .bind(&event.session_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn summary(&self) -> Result<EventSummary, AppError> {
        let (total_events, total_sessions): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(DISTINCT session_id) FROM events",
        )
        .fetch_one(&self.pool)
        .await?;

        let top_pages = sqlx::query_as::<_, CountedEntry>(
            r#"
            SELECT page_path AS label, COUNT(*) AS count
            FROM events
            WHERE page_path IS NOT NULL
            GROUP BY page_path
            ORDER BY count DESC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        // Absent ad sources are excluded from the ranking.
        let top_ad_sources = sqlx::query_as::<_, CountedEntry>(
            r#"
            SELECT ad_source AS label, COUNT(*) AS count
            FROM events
            WHERE ad_source IS NOT NULL AND ad_source <> ''
            GROUP BY ad_source
            ORDER BY count DESC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(EventSummary {
            total_events,
            total_sessions,
            top_pages,
            top_ad_sources,
        })
    }
}
