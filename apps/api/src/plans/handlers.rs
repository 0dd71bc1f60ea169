use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::auth::{AdminUser, CompanyUser, CurrentUser, Role};
use crate::errors::AppError;
use crate::models::plan::{PlanRow, PurchaseRow};
use crate::state::AppState;

use super::store::{self, PlanPayload, PlanUpdate, PurchasePayload};

/// GET /plans
pub async fn list_plans(State(state): State<AppState>) -> Result<Json<Vec<PlanRow>>, AppError> {
    Ok(Json(store::list_plans(&state.db).await?))
}

/// POST /plans (admin)
pub async fn create_plan(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(payload): Json<PlanPayload>,
) -> Result<(StatusCode, Json<PlanRow>), AppError> {
    let plan = store::create_plan(&state.db, &payload).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// PUT /plans/:id (admin)
pub async fn update_plan(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
    Json(payload): Json<PlanUpdate>,
) -> Result<Json<PlanRow>, AppError> {
    Ok(Json(store::update_plan(&state.db, id, &payload).await?))
}

/// DELETE /plans/:id (admin)
pub async fn delete_plan(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    store::delete_plan(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /purchases (company)
pub async fn create_purchase(
    State(state): State<AppState>,
    CompanyUser(user): CompanyUser,
    Json(payload): Json<PurchasePayload>,
) -> Result<(StatusCode, Json<PurchaseRow>), AppError> {
    let purchase = store::create_purchase(&state.db, user.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

/// DELETE /purchases/:id (owner or admin)
pub async fn cancel_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let purchase = store::get_purchase(&state.db, id).await?;
    if purchase.user_id != user.id && Role::parse(&user.role) != Some(Role::Admin) {
        return Err(AppError::Forbidden);
    }
    store::delete_purchase(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /purchases/:id/paid (admin)
pub async fn confirm_paid(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<PurchaseRow>, AppError> {
    Ok(Json(store::confirm_paid(&state.db, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct PurchaseListQuery {
    pub paid: Option<bool>,
}

/// GET /purchases?paid= — admins see all (the unpaid listing drives
/// manual invoicing), everyone else sees their own.
pub async fn list_purchases(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<PurchaseListQuery>,
) -> Result<Json<Vec<PurchaseRow>>, AppError> {
    let user_filter = if Role::parse(&user.role) == Some(Role::Admin) {
        None
    } else {
        Some(user.id)
    };
    Ok(Json(
        store::list_purchases(&state.db, user_filter, q.paid).await?,
    ))
}
