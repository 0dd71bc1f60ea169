use axum::extract::State;
use axum::Json;
use sqlx::{PgConnection, PgPool};

use crate::errors::AppError;
use crate::models::tag::TagRow;
use crate::state::AppState;

/// Get-or-create by exact name. No case normalization: "Rust" and "rust"
/// are distinct tags.
pub async fn get_or_create(conn: &mut PgConnection, name: &str) -> Result<TagRow, AppError> {
    let existing: Option<TagRow> = sqlx::query_as("SELECT * FROM tags WHERE name = $1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(tag) = existing {
        return Ok(tag);
    }
    Ok(
        sqlx::query_as(
            "INSERT INTO tags (name) VALUES ($1) ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name RETURNING *",
        )
        .bind(name)
        .fetch_one(conn)
        .await?,
    )
}

pub async fn list(pool: &PgPool) -> Result<Vec<TagRow>, AppError> {
    Ok(sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await?)
}

/// GET /tags
pub async fn handle_list(State(state): State<AppState>) -> Result<Json<Vec<TagRow>>, AppError> {
    Ok(Json(list(&state.db).await?))
}
