use serde::Deserialize;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::message::{MessageRow, NoticeRow};

pub const NOTICE_TYPES: [&str; 2] = ["job-notice", "event-notice"];

#[derive(Debug, Deserialize)]
pub struct CreateMessage {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub recipient_ids: Vec<i64>,
}

/// Persists one message and its N fan-out boxes in a single transaction.
pub async fn create_message(pool: &PgPool, payload: &CreateMessage) -> Result<MessageRow, AppError> {
    if !NOTICE_TYPES.contains(&payload.kind.as_str()) {
        return Err(AppError::Validation(format!(
            "Unknown message type '{}'",
            payload.kind
        )));
    }

    let mut tx = pool.begin().await?;

    let message: MessageRow = sqlx::query_as(
        "INSERT INTO messages (type, title, body) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&payload.kind)
    .bind(&payload.title)
    .bind(&payload.body)
    .fetch_one(&mut *tx)
    .await?;

    for user_id in &payload.recipient_ids {
        sqlx::query("INSERT INTO message_boxes (message_id, user_id) VALUES ($1, $2)")
            .bind(message.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(message)
}

/// Unread notices for a user, joined to their message, insertion order.
pub async fn list_notices(
    pool: &PgPool,
    user_id: i64,
    kind: Option<&str>,
) -> Result<Vec<NoticeRow>, AppError> {
    Ok(sqlx::query_as(
        "SELECT mb.id, mb.message_id, m.type, m.title, m.body, mb.is_read \
         FROM message_boxes mb JOIN messages m ON m.id = mb.message_id \
         WHERE mb.user_id = $1 AND NOT mb.is_read \
         AND ($2::text IS NULL OR m.type = $2) \
         ORDER BY mb.id",
    )
    .bind(user_id)
    .bind(kind)
    .fetch_all(pool)
    .await?)
}

/// Flips the one matching box's read flag.
pub async fn mark_read(pool: &PgPool, message_id: i64, user_id: i64) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE message_boxes SET is_read = TRUE WHERE message_id = $1 AND user_id = $2",
    )
    .bind(message_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Message not found".to_string()));
    }
    Ok(())
}
