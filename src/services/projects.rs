//! Project reads and creation.

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::present;
use crate::error::ApiError;
use crate::models::Project;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// # Errors
///
/// 500 on store failure.
pub async fn list(state: &AppState) -> Result<Vec<Project>, ApiError> {
    Ok(state.store.list_projects().await?)
}

/// # Errors
///
/// 404 when the id is malformed or unknown.
pub async fn get(state: &AppState, id: &str) -> Result<Project, ApiError> {
    let not_found = || ApiError::not_found("Project not found");
    let id = Uuid::parse_str(id.trim()).map_err(|_| not_found())?;
    state.store.get_project(id).await?.ok_or_else(not_found)
}

/// # Errors
///
/// 400 when the name is blank.
pub async fn create(state: &AppState, request: CreateProjectRequest) -> Result<Project, ApiError> {
    let name = present(request.name.as_deref()).ok_or_else(|| ApiError::validation("Project name is required"))?;
    let description = request.description.as_deref().map_or("", str::trim);

    let project = state.store.create_project(name, description).await?;
    info!(project_id = %project.id, name = %project.name, "projects: created");
    Ok(project)
}

#[cfg(test)]
#[path = "projects_test.rs"]
mod tests;
