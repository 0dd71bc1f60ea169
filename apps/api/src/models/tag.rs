use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A free-form label, many-to-many with jobs and events independently.
/// Looked up by exact name; no case normalization.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TagRow {
    pub id: i64,
    pub name: String,
}
