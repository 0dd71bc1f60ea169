use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::{self, AdminUser, CurrentUser, Role};
use crate::errors::AppError;
use crate::models::posting::PostingRow;
use crate::models::user::{ApplicationRow, CompanyRow, UserRow};
use crate::postings::query::{ListParams, Scope};
use crate::postings::store as posting_store;
use crate::postings::{query, PostingKind, Target};
use crate::state::AppState;

use super::store::{self, CreateUser, UpdateUser};

#[derive(Debug, Serialize)]
pub struct UserResponse {
    #[serde(flatten)]
    pub user: UserRow,
    pub company: Option<CompanyRow>,
}

fn is_admin(user: &UserRow) -> bool {
    Role::parse(&user.role) == Some(Role::Admin)
}

fn ensure_self_or_admin(caller: &UserRow, id: i64) -> Result<(), AppError> {
    if caller.id != id && !is_admin(caller) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// POST /users — open signup. A company profile in the payload selects
/// the company role; the verification email goes out after commit.
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUser>,
) -> Result<(StatusCode, Json<UserRow>), AppError> {
    let password_hash = auth::hash_password(&payload.password)?;
    let user = store::create_user(&state.db, &payload, &password_hash).await?;

    let token = auth::issue_token(
        &user.username,
        "verify",
        auth::VERIFY_TOKEN_EXPIRE_MINUTES,
        &state.config.secret_key,
    )?;
    let link = format!("{}/auth/email-confirmation/{token}", state.config.base_url);
    state.mailer.send(
        &user.email,
        "Confirm your account",
        format!("<p>Welcome! Confirm your account:</p><p><a href=\"{link}\">{link}</a></p>"),
    );

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /users (admin)
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<UserRow>>, AppError> {
    Ok(Json(store::list_users(&state.db).await?))
}

/// GET /users/me
pub async fn get_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserResponse>, AppError> {
    let company = store::company_for_user(&state.db, user.id).await?;
    Ok(Json(UserResponse { user, company }))
}

/// GET /users/:id (self or admin)
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, AppError> {
    ensure_self_or_admin(&caller, id)?;
    let user = store::get_user(&state.db, id).await?;
    let company = store::company_for_user(&state.db, id).await?;
    Ok(Json(UserResponse { user, company }))
}

/// PUT /users/:id (self or admin)
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUser>,
) -> Result<Json<UserRow>, AppError> {
    ensure_self_or_admin(&caller, id)?;
    Ok(Json(store::update_user(&state.db, id, &payload).await?))
}

/// DELETE /users/:id (self or admin). Postings, applications, reviews,
/// and purchases go with the user via FK cascade.
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    ensure_self_or_admin(&caller, id)?;
    store::delete_user(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct MeListQuery {
    pub kind: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

async fn me_listing(
    state: &AppState,
    user: &UserRow,
    q: &MeListQuery,
    target: Target,
) -> Result<Json<Vec<PostingRow>>, AppError> {
    let kind = match q.kind.as_deref() {
        None => PostingKind::Job,
        Some(s) => PostingKind::parse(s)
            .ok_or_else(|| AppError::Validation(format!("Unknown kind '{s}'")))?,
    };
    let params = ListParams {
        offset: q.offset.unwrap_or(0).max(0),
        limit: q.limit.unwrap_or(100).max(1),
        scope: Some(Scope {
            user_id: user.id,
            target,
        }),
        sort: crate::postings::SortKey::Id,
        ..Default::default()
    };
    Ok(Json(query::list_postings(&state.db, kind, &params).await?))
}

/// GET /users/me/bookmarks?kind=job|event
pub async fn my_bookmarks(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<MeListQuery>,
) -> Result<Json<Vec<PostingRow>>, AppError> {
    me_listing(&state, &user, &q, Target::Favorite).await
}

/// GET /users/me/history?kind=job|event
pub async fn my_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<MeListQuery>,
) -> Result<Json<Vec<PostingRow>>, AppError> {
    me_listing(&state, &user, &q, Target::History).await
}

/// GET /users/me/postings?kind=job|event
pub async fn my_postings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<MeListQuery>,
) -> Result<Json<Vec<PostingRow>>, AppError> {
    me_listing(&state, &user, &q, Target::Posted).await
}

/// GET /users/me/applications
pub async fn my_applications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ApplicationRow>>, AppError> {
    Ok(Json(
        posting_store::applications_for_user(&state.db, user.id).await?,
    ))
}
