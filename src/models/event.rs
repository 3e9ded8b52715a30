use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Append-only analytics fact, grouped by session for aggregate reporting.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: Uuid,
    pub event_name: String,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub page_path: Option<String>,
    pub referrer: Option<String>,
    pub ad_source: Option<String>,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountedEntry {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub total_events: i64,
    pub total_sessions: i64,
    pub top_pages: Vec<CountedEntry>,
    pub top_ad_sources: Vec<CountedEntry>,
}
