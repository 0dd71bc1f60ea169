use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A job or event row. The two kinds are structurally parallel and
/// independently tabled; this struct maps either table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostingRow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub postal_code: Option<String>,
    pub prefecture: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A scheduled time window for a posting.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TimeRow {
    pub id: i64,
    pub posting_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub user_id: i64,
    pub job_id: Option<i64>,
    pub event_id: Option<i64>,
    pub description: String,
    pub score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A posting enriched with the computed properties recomputed on every
/// access: mean review score, purchase-derived visibility, and bookmark
/// state relative to the calling user.
#[derive(Debug, Clone, Serialize)]
pub struct PostingDetail {
    #[serde(flatten)]
    pub posting: PostingRow,
    pub tags: Vec<String>,
    pub times: Vec<TimeRow>,
    pub reviews: Vec<ReviewRow>,
    pub average_review_point: Option<f64>,
    pub is_active: bool,
    pub is_favorite: bool,
}
