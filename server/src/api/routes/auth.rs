//! Registration and login endpoints
//!
//! Responses never disclose whether an email is registered: login failures
//! and unknown accounts share one generic message, and registration
//! conflicts return the same shape as validation failures.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::types::ApiError;
use crate::data::repositories::user;
use crate::data::{DataError, Store};
use crate::utils::crypto::{hash_password, verify_password};

use super::super::auth::jwt::create_session_token;

#[derive(Clone)]
pub struct AuthRoutesState {
    pub store: Arc<Store>,
    pub jwt_secret: Vec<u8>,
    pub token_expiration_hours: u64,
}

pub fn routes(store: Arc<Store>, jwt_secret: Vec<u8>, token_expiration_hours: u64) -> Router<()> {
    let state = AuthRoutesState {
        store,
        jwt_secret,
        token_expiration_hours,
    };

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .with_state(state)
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be 8-128 characters"))]
    pub password: String,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub user: UserDto,
}

/// Create an account and issue a session token
pub async fn register(
    State(state): State<AuthRoutesState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    body.validate()
        .map_err(|e| ApiError::bad_request("VALIDATION", e.to_string()))?;

    let password_hash = hash_password(&body.password).map_err(|e| {
        tracing::error!(error = %e, "Password hashing failed");
        ApiError::Internal
    })?;

    let created = user::create_user(
        state.store.pool(),
        &body.email,
        &password_hash,
        body.name.as_deref(),
    )
    .await;

    let row = match created {
        Ok(row) => row,
        // An already-registered email gets the same generic shape as a
        // validation failure, not a distinguishable conflict
        Err(DataError::Conflict(_)) => {
            return Err(ApiError::bad_request(
                "REGISTRATION_FAILED",
                "Unable to register with the provided credentials",
            ));
        }
        Err(e) => return Err(ApiError::from_data(e)),
    };

    let token = create_session_token(
        &state.jwt_secret,
        &row.id,
        &row.email,
        state.token_expiration_hours,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Token creation failed");
        ApiError::Internal
    })?;

    tracing::info!(user_id = %row.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token,
            user: UserDto {
                id: row.id,
                email: row.email,
                name: row.name,
                created_at: row.created_at,
            },
        }),
    ))
}

/// Authenticate and issue a session token
pub async fn login(
    State(state): State<AuthRoutesState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let row = user::get_user_by_email(state.store.pool(), &body.email)
        .await
        .map_err(ApiError::from_data)?;

    // Verify against a stored hash when the user exists; unknown emails take
    // the same rejection path
    let authenticated = row
        .as_ref()
        .map(|u| verify_password(&body.password, &u.password_hash))
        .unwrap_or(false);

    let Some(row) = row.filter(|_| authenticated) else {
        return Err(ApiError::Unauthorized);
    };

    let token = create_session_token(
        &state.jwt_secret,
        &row.id,
        &row.email,
        state.token_expiration_hours,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Token creation failed");
        ApiError::Internal
    })?;

    Ok(Json(SessionResponse {
        token,
        user: UserDto {
            id: row.id,
            email: row.email,
            name: row.name,
            created_at: row.created_at,
        },
    }))
}
