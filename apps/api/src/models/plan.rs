use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An admin-defined advertising product. `period` is the validity window
/// in days per contracted unit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanRow {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub period: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A (user, plan, posting) purchase gating a posting's promoted
/// visibility window. `is_paid` is flipped by admin confirmation, which
/// also refreshes `updated_at`; the window (plan period × contract
/// amount, counted from that timestamp) is evaluated in SQL where it is
/// consumed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PurchaseRow {
    pub id: i64,
    pub user_id: i64,
    pub plan_id: i64,
    pub job_id: Option<i64>,
    pub event_id: Option<i64>,
    pub contract_amount: i32,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
