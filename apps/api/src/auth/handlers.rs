use axum::extract::{Path, State};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::AppError;
use crate::state::AppState;
use crate::users::store;

use super::{
    decode_token, hash_password, issue_token, verify_password, ACCESS_TOKEN_EXPIRE_MINUTES,
    RESET_TOKEN_EXPIRE_MINUTES, VERIFY_TOKEN_EXPIRE_MINUTES,
};

#[derive(Debug, Deserialize)]
pub struct TokenForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: &'static str,
}

/// POST /auth/token — OAuth2 password-grant style login.
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<TokenForm>,
) -> Result<Json<Token>, AppError> {
    let user = store::find_by_username(&state.db, &form.username).await?;
    let user = match user {
        Some(u) if verify_password(&form.password, &u.password_hash) => u,
        _ => {
            return Err(AppError::Validation(
                "Incorrect username or password".to_string(),
            ))
        }
    };

    let access_token = issue_token(
        &user.username,
        "access",
        ACCESS_TOKEN_EXPIRE_MINUTES,
        &state.config.secret_key,
    )?;
    Ok(Json(Token {
        access_token,
        token_type: "bearer",
    }))
}

#[derive(Debug, Deserialize)]
pub struct EmailPayload {
    pub email: String,
}

/// POST /auth/send-verification-email
pub async fn send_verification_email(
    State(state): State<AppState>,
    Json(payload): Json<EmailPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = store::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let token = issue_token(
        &user.username,
        "verify",
        VERIFY_TOKEN_EXPIRE_MINUTES,
        &state.config.secret_key,
    )?;
    let link = format!("{}/auth/email-confirmation/{token}", state.config.base_url);
    state.mailer.send(
        &user.email,
        "Confirm your account",
        format!("<p>Confirm your account:</p><p><a href=\"{link}\">{link}</a></p>"),
    );

    Ok(Json(json!({ "detail": "Verification email sent" })))
}

/// GET /auth/email-confirmation/:token — flips `is_active`. Expired or
/// malformed tokens are indistinguishable from any other auth failure.
pub async fn email_confirmation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let claims = decode_token(&token, "verify", &state.config.secret_key)?;
    store::activate(&state.db, &claims.sub).await?;
    Ok(Json(json!({ "detail": "Account confirmed" })))
}

/// POST /auth/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<EmailPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = store::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let token = issue_token(
        &user.username,
        "reset",
        RESET_TOKEN_EXPIRE_MINUTES,
        &state.config.secret_key,
    )?;
    let link = format!("{}/auth/reset-password/{token}", state.config.base_url);
    state.mailer.send(
        &user.email,
        "Reset your password",
        format!("<p>Reset your password:</p><p><a href=\"{link}\">{link}</a></p>"),
    );

    Ok(Json(json!({ "detail": "Password reset email sent" })))
}

#[derive(Debug, Deserialize)]
pub struct ResetPayload {
    pub password: String,
}

/// POST /auth/reset-password/:token
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    let claims = decode_token(&token, "reset", &state.config.secret_key)?;
    let password_hash = hash_password(&payload.password)?;
    store::set_password(&state.db, &claims.sub, &password_hash).await?;
    Ok(Json(json!({ "detail": "Password updated" })))
}
