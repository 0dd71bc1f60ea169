pub mod handlers;

use anyhow::Context;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::user::UserRow;
use crate::state::AppState;
use crate::users;

pub const ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 30;
pub const VERIFY_TOKEN_EXPIRE_MINUTES: i64 = 24 * 60;
pub const RESET_TOKEN_EXPIRE_MINUTES: i64 = 30;

/// Permission tiers. Stored as lowercase text in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    General,
    Company,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "general" => Some(Role::General),
            "company" => Some(Role::Company),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::General => "general",
            Role::Company => "company",
            Role::Admin => "admin",
        }
    }
}

/// The permission lattice: admin satisfies every requirement, any other
/// role satisfies only itself.
pub fn role_satisfies(required: Role, actual: Role) -> bool {
    actual == Role::Admin || actual == required
}

/// JWT claims. `purpose` distinguishes access tokens from the email
/// verification and password reset side channels, so one token class
/// cannot be replayed as another.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub purpose: String,
    pub exp: i64,
}

pub fn issue_token(
    username: &str,
    purpose: &str,
    expire_minutes: i64,
    secret: &str,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: username.to_string(),
        purpose: purpose.to_string(),
        exp: (Utc::now() + Duration::minutes(expire_minutes)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("failed to sign token")
    .map_err(AppError::Internal)
}

/// Decodes and validates a token. Expired, malformed, or wrong-purpose
/// tokens all surface as the same generic 401.
pub fn decode_token(token: &str, expected_purpose: &str, secret: &str) -> Result<Claims, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;
    if data.claims.purpose != expected_purpose {
        return Err(AppError::Unauthorized);
    }
    Ok(data.claims)
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .context("failed to hash password")
        .map_err(AppError::Internal)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(String::from)
}

async fn resolve_user(parts: &Parts, state: &AppState) -> Result<UserRow, AppError> {
    let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
    let claims = decode_token(&token, "access", &state.config.secret_key)?;
    let user = users::store::find_by_username(&state.db, &claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)?;
    // The active-account gate only applies in production mode.
    if state.config.is_production && !user.is_active {
        return Err(AppError::Validation("Inactive user".to_string()));
    }
    Ok(user)
}

/// Any authenticated (and, in production, active) user.
pub struct CurrentUser(pub UserRow);

/// Optional identity: routes readable anonymously but personalized when a
/// bearer token is supplied. A present-but-invalid token is still a 401.
pub struct MaybeUser(pub Option<UserRow>);

/// General-or-admin tier.
pub struct GeneralUser(pub UserRow);

/// Company-or-admin tier.
pub struct CompanyUser(pub UserRow);

/// Admin-only tier.
pub struct AdminUser(pub UserRow);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        Ok(CurrentUser(resolve_user(parts, state).await?))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        if bearer_token(parts).is_none() {
            return Ok(MaybeUser(None));
        }
        Ok(MaybeUser(Some(resolve_user(parts, state).await?)))
    }
}

macro_rules! role_extractor {
    ($name:ident, $required:expr) => {
        #[async_trait]
        impl FromRequestParts<AppState> for $name {
            type Rejection = AppError;

            async fn from_request_parts(
                parts: &mut Parts,
                state: &AppState,
            ) -> Result<Self, AppError> {
                let user = resolve_user(parts, state).await?;
                let actual = Role::parse(&user.role).ok_or(AppError::Forbidden)?;
                if !role_satisfies($required, actual) {
                    return Err(AppError::Forbidden);
                }
                Ok($name(user))
            }
        }
    };
}

role_extractor!(GeneralUser, Role::General);
role_extractor!(CompanyUser, Role::Company);
role_extractor!(AdminUser, Role::Admin);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_satisfies_every_tier() {
        for required in [Role::General, Role::Company, Role::Admin] {
            assert!(role_satisfies(required, Role::Admin));
        }
    }

    #[test]
    fn non_admin_satisfies_only_itself() {
        assert!(role_satisfies(Role::General, Role::General));
        assert!(!role_satisfies(Role::Company, Role::General));
        assert!(!role_satisfies(Role::Admin, Role::General));
        assert!(role_satisfies(Role::Company, Role::Company));
        assert!(!role_satisfies(Role::General, Role::Company));
    }

    #[test]
    fn role_parse_rejects_unknown() {
        assert_eq!(Role::parse("general"), Some(Role::General));
        assert_eq!(Role::parse("staff"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn token_round_trip_preserves_claims() {
        let token = issue_token("alice", "access", 30, "test-secret").unwrap();
        let claims = decode_token(&token, "access", "test-secret").unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.purpose, "access");
    }

    #[test]
    fn wrong_purpose_is_rejected() {
        let token = issue_token("alice", "verify", 30, "test-secret").unwrap();
        assert!(decode_token(&token, "access", "test-secret").is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("alice", "access", 30, "test-secret").unwrap();
        assert!(decode_token(&token, "access", "other-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token("alice", "access", -5, "test-secret").unwrap();
        assert!(decode_token(&token, "access", "test-secret").is_err());
    }

    #[test]
    fn password_hash_differs_and_verifies() {
        let hash = hash_password("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }
}
