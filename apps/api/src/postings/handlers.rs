use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::{role_satisfies, CompanyUser, CurrentUser, GeneralUser, MaybeUser, Role};
use crate::errors::AppError;
use crate::models::posting::{PostingDetail, PostingRow, ReviewRow};
use crate::models::user::{ApplicationRow, UserRow};
use crate::state::AppState;

use super::query::{ListParams, Scope};
use super::store::{CreatePosting, UpdatePosting};
use super::{query, store, ListStatus, PostingKind, PostingStatus, SortKey, SortOrder, Target};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub keyword: Option<String>,
    pub tag: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub user_id: Option<i64>,
    pub target: Option<String>,
}

fn list_params(q: &ListQuery) -> Result<ListParams, AppError> {
    let scope = match (q.target.as_deref(), q.user_id) {
        (Some(t), Some(user_id)) => {
            let target = Target::parse(t)
                .ok_or_else(|| AppError::Validation(format!("Unknown target '{t}'")))?;
            Some(Scope { user_id, target })
        }
        (Some(_), None) => {
            return Err(AppError::Validation(
                "user_id is required with target".to_string(),
            ))
        }
        _ => None,
    };
    Ok(ListParams {
        status: ListStatus::parse(q.status.as_deref()),
        keyword: q.keyword.clone(),
        tag: q.tag.clone(),
        sort: SortKey::parse(q.sort.as_deref()),
        order: SortOrder::parse(q.order.as_deref()),
        offset: q.offset.unwrap_or(0).max(0),
        limit: q.limit.unwrap_or(100).max(1),
        scope,
    })
}

fn is_admin(user: &UserRow) -> bool {
    Role::parse(&user.role) == Some(Role::Admin)
}

fn ensure_owner_or_admin(user: &UserRow, posting: &PostingRow) -> Result<(), AppError> {
    if posting.user_id != user.id && !is_admin(user) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

async fn list(
    kind: PostingKind,
    state: &AppState,
    q: &ListQuery,
) -> Result<Json<Vec<PostingRow>>, AppError> {
    let params = list_params(q)?;
    Ok(Json(query::list_postings(&state.db, kind, &params).await?))
}

async fn create(
    kind: PostingKind,
    state: &AppState,
    author: &UserRow,
    payload: &CreatePosting,
) -> Result<(StatusCode, Json<PostingRow>), AppError> {
    let posting = store::create_posting(&state.db, kind, author.id, payload).await?;
    Ok((StatusCode::CREATED, Json(posting)))
}

async fn detail(
    kind: PostingKind,
    state: &AppState,
    viewer: Option<&UserRow>,
    id: i64,
) -> Result<Json<PostingDetail>, AppError> {
    let detail = store::get_detail(&state.db, kind, id, viewer.map(|u| u.id)).await?;
    Ok(Json(detail))
}

async fn update(
    kind: PostingKind,
    state: &AppState,
    user: &UserRow,
    id: i64,
    payload: &UpdatePosting,
) -> Result<Json<PostingRow>, AppError> {
    let posting = store::get_posting(&state.db, kind, id).await?;
    ensure_owner_or_admin(user, &posting)?;
    Ok(Json(store::update_posting(&state.db, kind, id, payload).await?))
}

async fn delete(
    kind: PostingKind,
    state: &AppState,
    user: &UserRow,
    id: i64,
) -> Result<StatusCode, AppError> {
    let posting = store::get_posting(&state.db, kind, id).await?;
    ensure_owner_or_admin(user, &posting)?;
    store::delete_posting(&state.db, kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusQuery {
    pub status: String,
}

/// Status transitions are admin-only; a non-admin caller (including the
/// posting's owner) gets a 400, not a 403.
async fn change_status(
    kind: PostingKind,
    state: &AppState,
    user: &UserRow,
    id: i64,
    q: &ChangeStatusQuery,
) -> Result<Json<PostingRow>, AppError> {
    if !role_satisfies(Role::Admin, Role::parse(&user.role).unwrap_or(Role::General)) {
        return Err(AppError::Validation(
            "Only admin can change posting status".to_string(),
        ));
    }
    let status = PostingStatus::parse(&q.status)
        .ok_or_else(|| AppError::Validation(format!("Invalid status '{}'", q.status)))?;
    Ok(Json(store::change_status(&state.db, kind, id, status).await?))
}

#[derive(Debug, Serialize)]
pub struct BookmarkResponse {
    pub is_favorite: bool,
}

async fn bookmark(
    kind: PostingKind,
    state: &AppState,
    user: &UserRow,
    id: i64,
) -> Result<Json<BookmarkResponse>, AppError> {
    let is_favorite = store::toggle_bookmark(&state.db, kind, id, user.id).await?;
    Ok(Json(BookmarkResponse { is_favorite }))
}

#[derive(Debug, Deserialize)]
pub struct ReviewPayload {
    #[serde(default)]
    pub description: String,
    pub score: i32,
}

// ── Jobs ────────────────────────────────────────────────────────────────

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<PostingRow>>, AppError> {
    list(PostingKind::Job, &state, &q).await
}

pub async fn create_job(
    State(state): State<AppState>,
    CompanyUser(user): CompanyUser,
    Json(payload): Json<CreatePosting>,
) -> Result<(StatusCode, Json<PostingRow>), AppError> {
    create(PostingKind::Job, &state, &user, &payload).await
}

pub async fn get_job(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<PostingDetail>, AppError> {
    detail(PostingKind::Job, &state, viewer.as_ref(), id).await
}

pub async fn update_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePosting>,
) -> Result<Json<PostingRow>, AppError> {
    update(PostingKind::Job, &state, &user, id, &payload).await
}

pub async fn delete_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    delete(PostingKind::Job, &state, &user, id).await
}

pub async fn change_job_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Query(q): Query<ChangeStatusQuery>,
) -> Result<Json<PostingRow>, AppError> {
    change_status(PostingKind::Job, &state, &user, id, &q).await
}

pub async fn bookmark_job(
    State(state): State<AppState>,
    GeneralUser(user): GeneralUser,
    Path(id): Path<i64>,
) -> Result<Json<BookmarkResponse>, AppError> {
    bookmark(PostingKind::Job, &state, &user, id).await
}

pub async fn create_job_review(
    State(state): State<AppState>,
    GeneralUser(user): GeneralUser,
    Path(id): Path<i64>,
    Json(payload): Json<ReviewPayload>,
) -> Result<(StatusCode, Json<ReviewRow>), AppError> {
    let review = store::create_review(
        &state.db,
        PostingKind::Job,
        id,
        user.id,
        &payload.description,
        payload.score,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn update_job_review(
    State(state): State<AppState>,
    GeneralUser(user): GeneralUser,
    Path(id): Path<i64>,
    Json(payload): Json<ReviewPayload>,
) -> Result<Json<ReviewRow>, AppError> {
    Ok(Json(
        store::update_review(
            &state.db,
            PostingKind::Job,
            id,
            user.id,
            &payload.description,
            payload.score,
        )
        .await?,
    ))
}

pub async fn delete_job_review(
    State(state): State<AppState>,
    GeneralUser(user): GeneralUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    store::delete_review(&state.db, PostingKind::Job, id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn apply_to_job(
    State(state): State<AppState>,
    GeneralUser(user): GeneralUser,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<ApplicationRow>), AppError> {
    let application = store::apply_to_job(&state.db, id, user.id).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

pub async fn list_job_applications(
    State(state): State<AppState>,
    CompanyUser(user): CompanyUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ApplicationRow>>, AppError> {
    let posting = store::get_posting(&state.db, PostingKind::Job, id).await?;
    ensure_owner_or_admin(&user, &posting)?;
    Ok(Json(store::applications_for_job(&state.db, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub status: String,
}

pub async fn resolve_job_application(
    State(state): State<AppState>,
    CompanyUser(user): CompanyUser,
    Path((id, application_id)): Path<(i64, i64)>,
    Query(q): Query<ResolveQuery>,
) -> Result<Json<ApplicationRow>, AppError> {
    let posting = store::get_posting(&state.db, PostingKind::Job, id).await?;
    ensure_owner_or_admin(&user, &posting)?;
    if q.status != "approved" && q.status != "rejected" {
        return Err(AppError::Validation(format!("Invalid status '{}'", q.status)));
    }
    Ok(Json(
        store::resolve_application(&state.db, id, application_id, &q.status).await?,
    ))
}

// ── Events ──────────────────────────────────────────────────────────────

pub async fn list_events(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<PostingRow>>, AppError> {
    list(PostingKind::Event, &state, &q).await
}

pub async fn create_event(
    State(state): State<AppState>,
    CompanyUser(user): CompanyUser,
    Json(payload): Json<CreatePosting>,
) -> Result<(StatusCode, Json<PostingRow>), AppError> {
    create(PostingKind::Event, &state, &user, &payload).await
}

pub async fn get_event(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<PostingDetail>, AppError> {
    detail(PostingKind::Event, &state, viewer.as_ref(), id).await
}

pub async fn update_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePosting>,
) -> Result<Json<PostingRow>, AppError> {
    update(PostingKind::Event, &state, &user, id, &payload).await
}

pub async fn delete_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    delete(PostingKind::Event, &state, &user, id).await
}

pub async fn change_event_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Query(q): Query<ChangeStatusQuery>,
) -> Result<Json<PostingRow>, AppError> {
    change_status(PostingKind::Event, &state, &user, id, &q).await
}

pub async fn bookmark_event(
    State(state): State<AppState>,
    GeneralUser(user): GeneralUser,
    Path(id): Path<i64>,
) -> Result<Json<BookmarkResponse>, AppError> {
    bookmark(PostingKind::Event, &state, &user, id).await
}

pub async fn create_event_review(
    State(state): State<AppState>,
    GeneralUser(user): GeneralUser,
    Path(id): Path<i64>,
    Json(payload): Json<ReviewPayload>,
) -> Result<(StatusCode, Json<ReviewRow>), AppError> {
    let review = store::create_review(
        &state.db,
        PostingKind::Event,
        id,
        user.id,
        &payload.description,
        payload.score,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn update_event_review(
    State(state): State<AppState>,
    GeneralUser(user): GeneralUser,
    Path(id): Path<i64>,
    Json(payload): Json<ReviewPayload>,
) -> Result<Json<ReviewRow>, AppError> {
    Ok(Json(
        store::update_review(
            &state.db,
            PostingKind::Event,
            id,
            user.id,
            &payload.description,
            payload.score,
        )
        .await?,
    ))
}

pub async fn delete_event_review(
    State(state): State<AppState>,
    GeneralUser(user): GeneralUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    store::delete_review(&state.db, PostingKind::Event, id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
