use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::Role;
use crate::errors::AppError;
use crate::models::user::{CompanyRow, UserRow};

#[derive(Debug, Deserialize)]
pub struct CompanyPayload {
    pub name: String,
    pub postal_code: Option<String>,
    pub prefecture: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub homepage: Option<String>,
    pub representative: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub email: String,
    pub sex: Option<String>,
    pub birthday: Option<chrono::NaiveDate>,
    pub image_url: Option<String>,
    /// Present for company signups; its presence selects the company role.
    pub company: Option<CompanyPayload>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub sex: Option<String>,
    pub birthday: Option<chrono::NaiveDate>,
    pub image_url: Option<String>,
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<UserRow>, AppError> {
    Ok(sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, AppError> {
    Ok(sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?)
}

pub async fn get_user(pool: &PgPool, id: i64) -> Result<UserRow, AppError> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<UserRow>, AppError> {
    Ok(sqlx::query_as("SELECT * FROM users ORDER BY id")
        .fetch_all(pool)
        .await?)
}

pub async fn company_for_user(pool: &PgPool, user_id: i64) -> Result<Option<CompanyRow>, AppError> {
    Ok(sqlx::query_as("SELECT * FROM companies WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?)
}

/// Creates the user (and the company profile for company signups) in one
/// transaction. Duplicate username/email surface as 400 with the exact
/// messages the frontend matches on.
pub async fn create_user(
    pool: &PgPool,
    payload: &CreateUser,
    password_hash: &str,
) -> Result<UserRow, AppError> {
    let mut tx = pool.begin().await?;

    let taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
        .bind(&payload.email)
        .fetch_one(&mut *tx)
        .await?;
    if taken {
        return Err(AppError::Validation("Email already registered".to_string()));
    }
    let taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
        .bind(&payload.username)
        .fetch_one(&mut *tx)
        .await?;
    if taken {
        return Err(AppError::Validation("Username already registered".to_string()));
    }

    let role = if payload.company.is_some() {
        Role::Company
    } else {
        Role::General
    };

    let user: UserRow = sqlx::query_as(
        "INSERT INTO users (username, email, password_hash, role, sex, birthday, image_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(payload.sex.as_deref().unwrap_or("o"))
    .bind(payload.birthday)
    .bind(&payload.image_url)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(company) = &payload.company {
        sqlx::query(
            "INSERT INTO companies \
             (user_id, name, postal_code, prefecture, city, address, phone_number, email, homepage, representative) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(user.id)
        .bind(&company.name)
        .bind(&company.postal_code)
        .bind(&company.prefecture)
        .bind(&company.city)
        .bind(&company.address)
        .bind(&company.phone_number)
        .bind(&company.email)
        .bind(&company.homepage)
        .bind(&company.representative)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(user)
}

/// Partial profile update. Renames collide the same way signup does:
/// a username or email already held by another user is a 400 with the
/// matching message, never a constraint violation.
pub async fn update_user(
    pool: &PgPool,
    id: i64,
    payload: &UpdateUser,
) -> Result<UserRow, AppError> {
    if let Some(username) = &payload.username {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 AND id <> $2)",
        )
        .bind(username)
        .bind(id)
        .fetch_one(pool)
        .await?;
        if taken {
            return Err(AppError::Validation("Username already registered".to_string()));
        }
    }
    if let Some(email) = &payload.email {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 AND id <> $2)")
                .bind(email)
                .bind(id)
                .fetch_one(pool)
                .await?;
        if taken {
            return Err(AppError::Validation("Email already registered".to_string()));
        }
    }

    sqlx::query_as(
        "UPDATE users SET username = COALESCE($2, username), email = COALESCE($3, email), \
         sex = COALESCE($4, sex), birthday = COALESCE($5, birthday), \
         image_url = COALESCE($6, image_url), updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&payload.sex)
    .bind(payload.birthday)
    .bind(&payload.image_url)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn delete_user(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(())
}

pub async fn activate(pool: &PgPool, username: &str) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE users SET is_active = TRUE, updated_at = NOW() WHERE username = $1")
        .bind(username)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(())
}

pub async fn set_password(pool: &PgPool, username: &str, password_hash: &str) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE username = $1")
        .bind(username)
        .bind(password_hash)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(())
}
