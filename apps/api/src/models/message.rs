use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A notice fanned out to N message boxes, one per recipient.
/// Type: "job-notice" or "event-notice".
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MessageRow {
    pub id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A message box joined to its message, as returned by the notice listing.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NoticeRow {
    pub id: i64,
    pub message_id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub body: String,
    pub is_read: bool,
}
