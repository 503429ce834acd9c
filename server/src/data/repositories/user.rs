//! User repository

use sqlx::SqlitePool;

use crate::data::DataError;
use crate::data::types::UserRow;
use crate::utils::time::now_millis;

/// Create a new user with a generated CUID2 ID.
/// A duplicate email surfaces as `DataError::Conflict`.
pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
    name: Option<&str>,
) -> Result<UserRow, DataError> {
    let id = cuid2::create_id();
    let now = now_millis();

    let result = sqlx::query(
        "INSERT INTO users (id, email, password_hash, name, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(UserRow {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            name: name.map(str::to_string),
            created_at: now,
        }),
        Err(e) if is_unique_violation(&e) => {
            Err(DataError::Conflict("email already registered".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Get a user by email
pub async fn get_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<UserRow>, DataError> {
    let row = sqlx::query_as::<_, (String, String, String, Option<String>, i64)>(
        "SELECT id, email, password_hash, name, created_at FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, email, password_hash, name, created_at)| UserRow {
        id,
        email,
        password_hash,
        name,
        created_at,
    }))
}

/// Get a user by ID
pub async fn get_user_by_id(pool: &SqlitePool, id: &str) -> Result<Option<UserRow>, DataError> {
    let row = sqlx::query_as::<_, (String, String, String, Option<String>, i64)>(
        "SELECT id, email, password_hash, name, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, email, password_hash, name, created_at)| UserRow {
        id,
        email,
        password_hash,
        name,
        created_at,
    }))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|d| d.message().contains("UNIQUE constraint failed"))
}
