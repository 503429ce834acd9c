//! Project management endpoints
//!
//! The raw API key appears in exactly two responses: project creation and
//! explicit rotation. Everything else exposes only the display prefix.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::auth::AuthUser;
use crate::api::types::ApiError;
use crate::data::Store;
use crate::data::repositories::project;
use crate::data::types::ProjectRow;
use crate::utils::api_key::{generate_api_key, hash_api_key, key_prefix};

#[derive(Clone)]
pub struct ProjectsApiState {
    pub store: Arc<Store>,
    pub api_key_secret: Vec<u8>,
}

pub fn routes(store: Arc<Store>, api_key_secret: Vec<u8>) -> Router<()> {
    let state = ProjectsApiState {
        store,
        api_key_secret,
    };

    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/{project_id}",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route("/{project_id}/api-key", post(rotate_api_key))
        .with_state(state)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDto {
    pub id: String,
    pub name: String,
    pub owner_email: String,
    pub api_key_prefix: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<ProjectRow> for ProjectDto {
    fn from(p: ProjectRow) -> Self {
        Self {
            id: p.id,
            name: p.name,
            owner_email: p.owner_email,
            api_key_prefix: p.api_key_prefix,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Project creation response: the only place the key ships with the project
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedProjectResponse {
    #[serde(flatten)]
    pub project: ProjectDto,
    /// Plaintext API key; shown once, never retrievable again
    pub api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotatedKeyResponse {
    pub api_key: String,
    pub api_key_prefix: String,
}

/// Create a project; returns the plaintext key exactly once
pub async fn create_project(
    State(state): State<ProjectsApiState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<CreatedProjectResponse>), ApiError> {
    body.validate()
        .map_err(|e| ApiError::bad_request("VALIDATION", e.to_string()))?;

    let api_key = generate_api_key();
    let hash = hash_api_key(&api_key, &state.api_key_secret);
    let prefix = key_prefix(&api_key);

    let row = project::create_project(state.store.pool(), &body.name, &user.email, &hash, &prefix)
        .await
        .map_err(ApiError::from_data)?;

    tracing::info!(project_id = %row.id, key_prefix = %prefix, "Project created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedProjectResponse {
            project: row.into(),
            api_key,
        }),
    ))
}

/// List the caller's projects
pub async fn list_projects(
    State(state): State<ProjectsApiState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ProjectDto>>, ApiError> {
    let rows = project::list_projects_for_owner(state.store.pool(), &user.email)
        .await
        .map_err(ApiError::from_data)?;

    Ok(Json(rows.into_iter().map(ProjectDto::from).collect()))
}

/// Get one project; other tenants' projects are indistinguishable from
/// missing ones
pub async fn get_project(
    State(state): State<ProjectsApiState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectDto>, ApiError> {
    let row = project::get_project_for_owner(state.store.pool(), &project_id, &user.email)
        .await
        .map_err(ApiError::from_data)?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(row.into()))
}

/// Rename a project
pub async fn update_project(
    State(state): State<ProjectsApiState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(body): Json<UpdateProjectRequest>,
) -> Result<Json<ProjectDto>, ApiError> {
    body.validate()
        .map_err(|e| ApiError::bad_request("VALIDATION", e.to_string()))?;

    let row = project::update_project_name(state.store.pool(), &project_id, &user.email, &body.name)
        .await
        .map_err(ApiError::from_data)?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(row.into()))
}

/// Delete a project; cascades to its traces and spans
pub async fn delete_project(
    State(state): State<ProjectsApiState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = project::delete_project(state.store.pool(), &project_id, &user.email)
        .await
        .map_err(ApiError::from_data)?;

    if !deleted {
        return Err(ApiError::NotFound);
    }

    tracing::info!(project_id = %project_id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Rotate the project's API key; the prior key stops validating immediately
pub async fn rotate_api_key(
    State(state): State<ProjectsApiState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<Json<RotatedKeyResponse>, ApiError> {
    let api_key = generate_api_key();
    let hash = hash_api_key(&api_key, &state.api_key_secret);
    let prefix = key_prefix(&api_key);

    let rotated = project::rotate_api_key(state.store.pool(), &project_id, &user.email, &hash, &prefix)
        .await
        .map_err(ApiError::from_data)?;

    if !rotated {
        return Err(ApiError::NotFound);
    }

    tracing::info!(project_id = %project_id, key_prefix = %prefix, "API key rotated");

    Ok(Json(RotatedKeyResponse {
        api_key,
        api_key_prefix: prefix,
    }))
}
