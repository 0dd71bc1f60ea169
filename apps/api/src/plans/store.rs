use serde::Deserialize;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::plan::{PlanRow, PurchaseRow};

#[derive(Debug, Deserialize)]
pub struct PlanPayload {
    pub name: String,
    pub price: i64,
    pub period: i32,
}

#[derive(Debug, Deserialize)]
pub struct PlanUpdate {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub period: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct PurchasePayload {
    pub plan_id: i64,
    pub job_id: Option<i64>,
    pub event_id: Option<i64>,
    #[serde(default = "default_contract_amount")]
    pub contract_amount: i32,
}

fn default_contract_amount() -> i32 {
    1
}

pub async fn create_plan(pool: &PgPool, payload: &PlanPayload) -> Result<PlanRow, AppError> {
    Ok(
        sqlx::query_as("INSERT INTO plans (name, price, period) VALUES ($1, $2, $3) RETURNING *")
            .bind(&payload.name)
            .bind(payload.price)
            .bind(payload.period)
            .fetch_one(pool)
            .await?,
    )
}

pub async fn get_plan(pool: &PgPool, id: i64) -> Result<PlanRow, AppError> {
    sqlx::query_as("SELECT * FROM plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))
}

pub async fn list_plans(pool: &PgPool) -> Result<Vec<PlanRow>, AppError> {
    Ok(sqlx::query_as("SELECT * FROM plans ORDER BY id")
        .fetch_all(pool)
        .await?)
}

pub async fn update_plan(
    pool: &PgPool,
    id: i64,
    payload: &PlanUpdate,
) -> Result<PlanRow, AppError> {
    sqlx::query_as(
        "UPDATE plans SET name = COALESCE($2, name), price = COALESCE($3, price), \
         period = COALESCE($4, period), updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&payload.name)
    .bind(payload.price)
    .bind(payload.period)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))
}

pub async fn delete_plan(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM plans WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Plan not found".to_string()));
    }
    Ok(())
}

/// Creates a (user, plan, posting) purchase. Exactly one posting
/// reference must be supplied.
pub async fn create_purchase(
    pool: &PgPool,
    user_id: i64,
    payload: &PurchasePayload,
) -> Result<PurchaseRow, AppError> {
    match (payload.job_id, payload.event_id) {
        (Some(_), None) | (None, Some(_)) => {}
        _ => {
            return Err(AppError::Validation(
                "Exactly one of job_id or event_id is required".to_string(),
            ))
        }
    }
    get_plan(pool, payload.plan_id).await?;

    if let Some(job_id) = payload.job_id {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM jobs WHERE id = $1)")
            .bind(job_id)
            .fetch_one(pool)
            .await?;
        if !exists {
            return Err(AppError::NotFound("Job not found".to_string()));
        }
    }
    if let Some(event_id) = payload.event_id {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM events WHERE id = $1)")
            .bind(event_id)
            .fetch_one(pool)
            .await?;
        if !exists {
            return Err(AppError::NotFound("Event not found".to_string()));
        }
    }

    Ok(sqlx::query_as(
        "INSERT INTO purchases (user_id, plan_id, job_id, event_id, contract_amount) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(user_id)
    .bind(payload.plan_id)
    .bind(payload.job_id)
    .bind(payload.event_id)
    .bind(payload.contract_amount)
    .fetch_one(pool)
    .await?)
}

pub async fn get_purchase(pool: &PgPool, id: i64) -> Result<PurchaseRow, AppError> {
    sqlx::query_as("SELECT * FROM purchases WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase not found".to_string()))
}

pub async fn delete_purchase(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM purchases WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Purchase not found".to_string()));
    }
    Ok(())
}

/// Admin payment confirmation. Idempotent: re-confirming a paid purchase
/// refreshes `updated_at`, restarting the visibility window.
pub async fn confirm_paid(pool: &PgPool, id: i64) -> Result<PurchaseRow, AppError> {
    sqlx::query_as(
        "UPDATE purchases SET is_paid = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Purchase not found".to_string()))
}

pub async fn list_purchases(
    pool: &PgPool,
    user_id: Option<i64>,
    paid: Option<bool>,
) -> Result<Vec<PurchaseRow>, AppError> {
    Ok(sqlx::query_as(
        "SELECT * FROM purchases \
         WHERE ($1::bigint IS NULL OR user_id = $1) \
         AND ($2::boolean IS NULL OR is_paid = $2) \
         ORDER BY id",
    )
    .bind(user_id)
    .bind(paid)
    .fetch_all(pool)
    .await?)
}
