//! Feature reads, creation, and edits.
//!
//! Features carry the latest review copied down from their suites; those
//! fields are written by the feedback pipeline only, never by an edit here.

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{present, required_id};
use crate::db::StoreError;
use crate::error::ApiError;
use crate::models::Feature;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeatureRequest {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFeatureRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn feature_name(raw: Option<&str>) -> Result<&str, ApiError> {
    present(raw).ok_or_else(|| ApiError::validation("Feature name is required"))
}

/// Features of one project, newest first.
///
/// # Errors
///
/// 400 when `project_id` is missing or not a UUID.
pub async fn list(state: &AppState, project_id: Option<&str>) -> Result<Vec<Feature>, ApiError> {
    let project_id = required_id(project_id, "projectId")?;
    Ok(state.store.list_features(project_id).await?)
}

/// # Errors
///
/// 400 on missing fields; 404 when the project does not exist.
pub async fn create(state: &AppState, request: CreateFeatureRequest) -> Result<Feature, ApiError> {
    let project_id = required_id(request.project_id.as_deref(), "projectId")?;
    let name = feature_name(request.name.as_deref())?;
    let description = request.description.as_deref().map_or("", str::trim);

    let feature = state
        .store
        .create_feature(project_id, name, description)
        .await
        .map_err(|e| match e {
            StoreError::ProjectMissing(_) => ApiError::not_found("Project not found"),
            other => other.into(),
        })?;
    info!(%project_id, feature_id = %feature.id, name = %feature.name, "features: created");
    Ok(feature)
}

/// Rename or re-describe a feature. Omitted fields are left as stored.
///
/// # Errors
///
/// 400 when a supplied name is blank; 404 when the feature does not exist.
pub async fn update(state: &AppState, id: &str, request: UpdateFeatureRequest) -> Result<Feature, ApiError> {
    let not_found = || ApiError::not_found("Feature not found");
    let id = Uuid::parse_str(id.trim()).map_err(|_| not_found())?;
    let name = request.name.as_deref().map(|raw| feature_name(Some(raw))).transpose()?;
    let description = request.description.as_deref().map(str::trim);

    let feature = state
        .store
        .update_feature(id, name, description)
        .await?
        .ok_or_else(not_found)?;
    info!(feature_id = %feature.id, "features: updated");
    Ok(feature)
}

#[cfg(test)]
#[path = "features_test.rs"]
mod tests;
