use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::auth::{AdminUser, CurrentUser};
use crate::errors::AppError;
use crate::models::message::{MessageRow, NoticeRow};
use crate::state::AppState;

use super::store::{self, CreateMessage};

/// POST /notices (admin) — fan out one message to N recipients.
pub async fn create_notice(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(payload): Json<CreateMessage>,
) -> Result<(StatusCode, Json<MessageRow>), AppError> {
    let message = store::create_message(&state.db, &payload).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Debug, Deserialize)]
pub struct NoticeListQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// GET /notices?type= — the caller's unread notices.
pub async fn list_notices(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<NoticeListQuery>,
) -> Result<Json<Vec<NoticeRow>>, AppError> {
    Ok(Json(
        store::list_notices(&state.db, user.id, q.kind.as_deref()).await?,
    ))
}

/// PUT /notices/:message_id/read
pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(message_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    store::mark_read(&state.db, message_id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
