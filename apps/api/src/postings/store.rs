use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};

use crate::errors::AppError;
use crate::models::posting::{PostingDetail, PostingRow, ReviewRow, TimeRow};
use crate::models::user::ApplicationRow;
use crate::tags;

use super::{PostingKind, PostingStatus};

#[derive(Debug, Deserialize)]
pub struct TimeWindow {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct PurchasePayload {
    pub plan_id: i64,
    #[serde(default = "default_contract_amount")]
    pub contract_amount: i32,
}

fn default_contract_amount() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct CreatePosting {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub postal_code: Option<String>,
    pub prefecture: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub times: Vec<TimeWindow>,
    /// Optional advertising-plan purchase created alongside the posting.
    pub purchase: Option<PurchasePayload>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePosting {
    pub name: Option<String>,
    pub description: Option<String>,
    pub postal_code: Option<String>,
    pub prefecture: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub tags: Option<Vec<String>>,
    pub times: Option<Vec<TimeWindow>>,
}

fn label(kind: PostingKind) -> &'static str {
    match kind {
        PostingKind::Job => "Job",
        PostingKind::Event => "Event",
    }
}

/// Inserts a posting (always `draft`), its tags, time windows, and the
/// optional purchase, in one transaction.
pub async fn create_posting(
    pool: &PgPool,
    kind: PostingKind,
    author_id: i64,
    payload: &CreatePosting,
) -> Result<PostingRow, AppError> {
    let mut tx = pool.begin().await?;

    let sql = format!(
        "INSERT INTO {} (user_id, name, description, postal_code, prefecture, city, address) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        kind.table()
    );
    let posting: PostingRow = sqlx::query_as(&sql)
        .bind(author_id)
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(&payload.postal_code)
        .bind(&payload.prefecture)
        .bind(&payload.city)
        .bind(&payload.address)
        .fetch_one(&mut *tx)
        .await?;

    set_tags(&mut tx, kind, posting.id, &payload.tags).await?;
    set_times(&mut tx, kind, posting.id, &payload.times).await?;

    if let Some(purchase) = &payload.purchase {
        let plan_exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM plans WHERE id = $1)")
            .bind(purchase.plan_id)
            .fetch_one(&mut *tx)
            .await?;
        if !plan_exists {
            return Err(AppError::NotFound("Plan not found".to_string()));
        }
        let sql = format!(
            "INSERT INTO purchases (user_id, plan_id, {}, contract_amount) VALUES ($1, $2, $3, $4)",
            kind.fk_column()
        );
        sqlx::query(&sql)
            .bind(author_id)
            .bind(purchase.plan_id)
            .bind(posting.id)
            .bind(purchase.contract_amount)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(posting)
}

async fn set_tags(
    tx: &mut Transaction<'_, Postgres>,
    kind: PostingKind,
    posting_id: i64,
    names: &[String],
) -> Result<(), AppError> {
    let clear = format!("DELETE FROM {} WHERE posting_id = $1", kind.tag_table());
    sqlx::query(&clear).bind(posting_id).execute(&mut **tx).await?;

    let link = format!(
        "INSERT INTO {} (posting_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.tag_table()
    );
    for name in names {
        let tag = tags::get_or_create(&mut **tx, name).await?;
        sqlx::query(&link)
            .bind(posting_id)
            .bind(tag.id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn set_times(
    tx: &mut Transaction<'_, Postgres>,
    kind: PostingKind,
    posting_id: i64,
    times: &[TimeWindow],
) -> Result<(), AppError> {
    let clear = format!("DELETE FROM {} WHERE posting_id = $1", kind.times_table());
    sqlx::query(&clear).bind(posting_id).execute(&mut **tx).await?;

    let insert = format!(
        "INSERT INTO {} (posting_id, start_time, end_time) VALUES ($1, $2, $3)",
        kind.times_table()
    );
    for window in times {
        sqlx::query(&insert)
            .bind(posting_id)
            .bind(window.start_time)
            .bind(window.end_time)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

pub async fn get_posting(
    pool: &PgPool,
    kind: PostingKind,
    id: i64,
) -> Result<PostingRow, AppError> {
    let sql = format!("SELECT * FROM {} WHERE id = $1", kind.table());
    sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", label(kind))))
}

/// Fetches a posting with its computed properties. When a viewer is
/// present their watch counter for this posting is bumped first, so the
/// read itself feeds the pv / history machinery.
pub async fn get_detail(
    pool: &PgPool,
    kind: PostingKind,
    id: i64,
    viewer: Option<i64>,
) -> Result<PostingDetail, AppError> {
    let posting = get_posting(pool, kind, id).await?;

    if let Some(user_id) = viewer {
        record_watch(pool, kind, id, user_id).await?;
    }

    let sql = format!(
        "SELECT t.name FROM tags t JOIN {} pt ON pt.tag_id = t.id WHERE pt.posting_id = $1 ORDER BY t.name",
        kind.tag_table()
    );
    let tag_names: Vec<String> = sqlx::query_scalar(&sql).bind(id).fetch_all(pool).await?;

    let sql = format!(
        "SELECT * FROM {} WHERE posting_id = $1 ORDER BY start_time",
        kind.times_table()
    );
    let times: Vec<TimeRow> = sqlx::query_as(&sql).bind(id).fetch_all(pool).await?;

    let sql = format!(
        "SELECT * FROM reviews WHERE {} = $1 ORDER BY id",
        kind.fk_column()
    );
    let reviews: Vec<ReviewRow> = sqlx::query_as(&sql).bind(id).fetch_all(pool).await?;

    let sql = format!(
        "SELECT AVG(score)::float8 FROM reviews WHERE {} = $1",
        kind.fk_column()
    );
    let average_review_point: Option<f64> =
        sqlx::query_scalar(&sql).bind(id).fetch_one(pool).await?;

    let is_active = purchase_is_active(pool, kind, id).await?;

    let is_favorite = match viewer {
        Some(user_id) => is_bookmarked(pool, kind, id, user_id).await?,
        None => false,
    };

    Ok(PostingDetail {
        posting,
        tags: tag_names,
        times,
        reviews,
        average_review_point,
        is_active,
        is_favorite,
    })
}

/// Purchase-derived visibility: a paid purchase exists whose window
/// (plan period × contract amount, counted from its last update) has not
/// expired. Independent of the posting's own `status`.
pub async fn purchase_is_active(
    pool: &PgPool,
    kind: PostingKind,
    id: i64,
) -> Result<bool, AppError> {
    let sql = format!(
        "SELECT EXISTS (SELECT 1 FROM purchases pu JOIN plans pl ON pl.id = pu.plan_id \
         WHERE pu.{} = $1 AND pu.is_paid \
         AND pu.updated_at + make_interval(days => pl.period * pu.contract_amount) > NOW())",
        kind.fk_column()
    );
    Ok(sqlx::query_scalar(&sql).bind(id).fetch_one(pool).await?)
}

pub async fn update_posting(
    pool: &PgPool,
    kind: PostingKind,
    id: i64,
    payload: &UpdatePosting,
) -> Result<PostingRow, AppError> {
    let mut tx = pool.begin().await?;

    let sql = format!(
        "UPDATE {} SET name = COALESCE($2, name), description = COALESCE($3, description), \
         postal_code = COALESCE($4, postal_code), prefecture = COALESCE($5, prefecture), \
         city = COALESCE($6, city), address = COALESCE($7, address), updated_at = NOW() \
         WHERE id = $1 RETURNING *",
        kind.table()
    );
    let posting: Option<PostingRow> = sqlx::query_as(&sql)
        .bind(id)
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(&payload.postal_code)
        .bind(&payload.prefecture)
        .bind(&payload.city)
        .bind(&payload.address)
        .fetch_optional(&mut *tx)
        .await?;
    let posting =
        posting.ok_or_else(|| AppError::NotFound(format!("{} not found", label(kind))))?;

    if let Some(tags) = &payload.tags {
        set_tags(&mut tx, kind, id, tags).await?;
    }
    if let Some(times) = &payload.times {
        set_times(&mut tx, kind, id, times).await?;
    }

    tx.commit().await?;
    Ok(posting)
}

pub async fn delete_posting(pool: &PgPool, kind: PostingKind, id: i64) -> Result<(), AppError> {
    let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
    let result = sqlx::query(&sql).bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("{} not found", label(kind))));
    }
    Ok(())
}

/// Admin status transition, validated against the lifecycle edges
/// (draft → active ⇄ inactive). Anything else is a 400.
pub async fn change_status(
    pool: &PgPool,
    kind: PostingKind,
    id: i64,
    status: PostingStatus,
) -> Result<PostingRow, AppError> {
    let posting = get_posting(pool, kind, id).await?;
    let allowed = PostingStatus::parse(&posting.status)
        .map(|current| current.can_transition_to(status))
        .unwrap_or(false);
    if !allowed {
        return Err(AppError::Validation(format!(
            "Bad status transition from '{}' to '{}'",
            posting.status,
            status.as_str()
        )));
    }

    let sql = format!(
        "UPDATE {} SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        kind.table()
    );
    sqlx::query_as(&sql)
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", label(kind))))
}

pub async fn is_bookmarked(
    pool: &PgPool,
    kind: PostingKind,
    posting_id: i64,
    user_id: i64,
) -> Result<bool, AppError> {
    let sql = format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE posting_id = $1 AND user_id = $2)",
        kind.bookmark_table()
    );
    Ok(sqlx::query_scalar(&sql)
        .bind(posting_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?)
}

/// Idempotent-by-pair toggle: first call creates and returns true, the
/// second removes and returns false.
pub async fn toggle_bookmark(
    pool: &PgPool,
    kind: PostingKind,
    posting_id: i64,
    user_id: i64,
) -> Result<bool, AppError> {
    get_posting(pool, kind, posting_id).await?;

    if is_bookmarked(pool, kind, posting_id, user_id).await? {
        let sql = format!(
            "DELETE FROM {} WHERE posting_id = $1 AND user_id = $2",
            kind.bookmark_table()
        );
        sqlx::query(&sql)
            .bind(posting_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(false)
    } else {
        let sql = format!(
            "INSERT INTO {} (posting_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            kind.bookmark_table()
        );
        sqlx::query(&sql)
            .bind(posting_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(true)
    }
}

async fn record_watch(
    pool: &PgPool,
    kind: PostingKind,
    posting_id: i64,
    user_id: i64,
) -> Result<(), AppError> {
    let sql = format!(
        "INSERT INTO {} (posting_id, user_id) VALUES ($1, $2) \
         ON CONFLICT (posting_id, user_id) \
         DO UPDATE SET view_count = {}.view_count + 1, updated_at = NOW()",
        kind.watched_table(),
        kind.watched_table()
    );
    sqlx::query(&sql)
        .bind(posting_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn create_review(
    pool: &PgPool,
    kind: PostingKind,
    posting_id: i64,
    user_id: i64,
    description: &str,
    score: i32,
) -> Result<ReviewRow, AppError> {
    if !(1..=5).contains(&score) {
        return Err(AppError::Validation("Score must be between 1 and 5".to_string()));
    }
    get_posting(pool, kind, posting_id).await?;

    // One review per (user, posting); checked here, not by constraint.
    let sql = format!(
        "SELECT EXISTS (SELECT 1 FROM reviews WHERE {} = $1 AND user_id = $2)",
        kind.fk_column()
    );
    let exists: bool = sqlx::query_scalar(&sql)
        .bind(posting_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    if exists {
        return Err(AppError::Validation("Review already exists".to_string()));
    }

    let sql = format!(
        "INSERT INTO reviews (user_id, {}, description, score) VALUES ($1, $2, $3, $4) RETURNING *",
        kind.fk_column()
    );
    Ok(sqlx::query_as(&sql)
        .bind(user_id)
        .bind(posting_id)
        .bind(description)
        .bind(score)
        .fetch_one(pool)
        .await?)
}

pub async fn update_review(
    pool: &PgPool,
    kind: PostingKind,
    posting_id: i64,
    user_id: i64,
    description: &str,
    score: i32,
) -> Result<ReviewRow, AppError> {
    if !(1..=5).contains(&score) {
        return Err(AppError::Validation("Score must be between 1 and 5".to_string()));
    }
    let sql = format!(
        "UPDATE reviews SET description = $3, score = $4, updated_at = NOW() \
         WHERE {} = $1 AND user_id = $2 RETURNING *",
        kind.fk_column()
    );
    sqlx::query_as(&sql)
        .bind(posting_id)
        .bind(user_id)
        .bind(description)
        .bind(score)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))
}

pub async fn delete_review(
    pool: &PgPool,
    kind: PostingKind,
    posting_id: i64,
    user_id: i64,
) -> Result<(), AppError> {
    let sql = format!("DELETE FROM reviews WHERE {} = $1 AND user_id = $2", kind.fk_column());
    let result = sqlx::query(&sql)
        .bind(posting_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Review not found".to_string()));
    }
    Ok(())
}

pub async fn apply_to_job(
    pool: &PgPool,
    job_id: i64,
    user_id: i64,
) -> Result<ApplicationRow, AppError> {
    get_posting(pool, PostingKind::Job, job_id).await?;

    // Read-then-write uniqueness check; the narrow race window is accepted
    // and backstopped by the database's default isolation.
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM applications WHERE job_id = $1 AND user_id = $2)",
    )
    .bind(job_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    if exists {
        return Err(AppError::Validation("Already applied".to_string()));
    }

    Ok(sqlx::query_as(
        "INSERT INTO applications (user_id, job_id) VALUES ($1, $2) RETURNING *",
    )
    .bind(user_id)
    .bind(job_id)
    .fetch_one(pool)
    .await?)
}

pub async fn resolve_application(
    pool: &PgPool,
    job_id: i64,
    application_id: i64,
    status: &str,
) -> Result<ApplicationRow, AppError> {
    let application: Option<ApplicationRow> =
        sqlx::query_as("SELECT * FROM applications WHERE id = $1 AND job_id = $2")
            .bind(application_id)
            .bind(job_id)
            .fetch_optional(pool)
            .await?;
    let application =
        application.ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

    if application.status != "pending" {
        return Err(AppError::Validation("Application already resolved".to_string()));
    }

    Ok(sqlx::query_as(
        "UPDATE applications SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(application_id)
    .bind(status)
    .fetch_one(pool)
    .await?)
}

pub async fn applications_for_job(
    pool: &PgPool,
    job_id: i64,
) -> Result<Vec<ApplicationRow>, AppError> {
    Ok(
        sqlx::query_as("SELECT * FROM applications WHERE job_id = $1 ORDER BY id")
            .bind(job_id)
            .fetch_all(pool)
            .await?,
    )
}

pub async fn applications_for_user(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<ApplicationRow>, AppError> {
    Ok(
        sqlx::query_as("SELECT * FROM applications WHERE user_id = $1 ORDER BY id")
            .bind(user_id)
            .fetch_all(pool)
            .await?,
    )
}
