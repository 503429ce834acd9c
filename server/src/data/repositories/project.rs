//! Project repository
//!
//! Ownership is scoped by `owner_email`: every read or mutation that takes an
//! owner filter returns nothing for other tenants' projects, so handlers can
//! answer 404 without a separate authorization query.

use sqlx::SqlitePool;

use crate::data::DataError;
use crate::data::types::ProjectRow;
use crate::utils::time::now_millis;

type ProjectTuple = (String, String, String, String, String, i64, i64);

fn from_tuple(t: ProjectTuple) -> ProjectRow {
    let (id, name, owner_email, api_key_hash, api_key_prefix, created_at, updated_at) = t;
    ProjectRow {
        id,
        name,
        owner_email,
        api_key_hash,
        api_key_prefix,
        created_at,
        updated_at,
    }
}

const PROJECT_COLUMNS: &str =
    "id, name, owner_email, api_key_hash, api_key_prefix, created_at, updated_at";

/// Create a new project with a generated CUID2 ID
pub async fn create_project(
    pool: &SqlitePool,
    name: &str,
    owner_email: &str,
    api_key_hash: &str,
    api_key_prefix: &str,
) -> Result<ProjectRow, DataError> {
    let id = cuid2::create_id();
    let now = now_millis();

    sqlx::query(
        "INSERT INTO projects (id, name, owner_email, api_key_hash, api_key_prefix, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(owner_email)
    .bind(api_key_hash)
    .bind(api_key_prefix)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(ProjectRow {
        id,
        name: name.to_string(),
        owner_email: owner_email.to_string(),
        api_key_hash: api_key_hash.to_string(),
        api_key_prefix: api_key_prefix.to_string(),
        created_at: now,
        updated_at: now,
    })
}

/// Get a project by ID regardless of owner (ingestion path)
pub async fn get_project(pool: &SqlitePool, id: &str) -> Result<Option<ProjectRow>, DataError> {
    let row = sqlx::query_as::<_, ProjectTuple>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(from_tuple))
}

/// Get a project by ID, scoped to an owner
pub async fn get_project_for_owner(
    pool: &SqlitePool,
    id: &str,
    owner_email: &str,
) -> Result<Option<ProjectRow>, DataError> {
    let row = sqlx::query_as::<_, ProjectTuple>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ? AND owner_email = ?"
    ))
    .bind(id)
    .bind(owner_email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(from_tuple))
}

/// Resolve a project from a hashed API key (ingest authentication)
pub async fn get_project_by_api_key_hash(
    pool: &SqlitePool,
    api_key_hash: &str,
) -> Result<Option<ProjectRow>, DataError> {
    let row = sqlx::query_as::<_, ProjectTuple>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE api_key_hash = ?"
    ))
    .bind(api_key_hash)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(from_tuple))
}

/// List all projects for an owner, newest first
pub async fn list_projects_for_owner(
    pool: &SqlitePool,
    owner_email: &str,
) -> Result<Vec<ProjectRow>, DataError> {
    let rows = sqlx::query_as::<_, ProjectTuple>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE owner_email = ? ORDER BY created_at DESC"
    ))
    .bind(owner_email)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(from_tuple).collect())
}

/// Update a project's name. Returns the updated project if found and owned.
pub async fn update_project_name(
    pool: &SqlitePool,
    id: &str,
    owner_email: &str,
    name: &str,
) -> Result<Option<ProjectRow>, DataError> {
    let result =
        sqlx::query("UPDATE projects SET name = ?, updated_at = ? WHERE id = ? AND owner_email = ?")
            .bind(name)
            .bind(now_millis())
            .bind(id)
            .bind(owner_email)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_project_for_owner(pool, id, owner_email).await
}

/// Replace the project's API key material. Only the targeted project changes;
/// the prior key stops validating as soon as the row is updated.
pub async fn rotate_api_key(
    pool: &SqlitePool,
    id: &str,
    owner_email: &str,
    api_key_hash: &str,
    api_key_prefix: &str,
) -> Result<bool, DataError> {
    let result = sqlx::query(
        "UPDATE projects SET api_key_hash = ?, api_key_prefix = ?, updated_at = ? \
         WHERE id = ? AND owner_email = ?",
    )
    .bind(api_key_hash)
    .bind(api_key_prefix)
    .bind(now_millis())
    .bind(id)
    .bind(owner_email)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a project. Cascades to its traces and spans.
pub async fn delete_project(
    pool: &SqlitePool,
    id: &str,
    owner_email: &str,
) -> Result<bool, DataError> {
    let result = sqlx::query("DELETE FROM projects WHERE id = ? AND owner_email = ?")
        .bind(id)
        .bind(owner_email)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
