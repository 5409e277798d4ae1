//! Project routes.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{OriginalUri, Path, State};
use axum::http::StatusCode;
use serde_json::{Value, json};

use super::json_body;
use crate::cache::{CachedJson, url_key};
use crate::error::ApiError;
use crate::services::projects::{self, CreateProjectRequest};
use crate::state::AppState;

/// `GET /api/projects`: `{"projects": [...]}`, cached by URL.
pub async fn list_projects(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<CachedJson, ApiError> {
    let key = url_key(&uri);
    let state = &state;
    state
        .cache
        .get_or_compute(Some(&key), || async move {
            let projects = projects::list(state).await?;
            Ok::<_, ApiError>(json!({ "projects": projects }))
        })
        .await
}

/// `GET /api/projects/{id}`
pub async fn get_project(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let project = projects::get(&state, &id).await?;
    Ok(Json(json!({ "project": project })))
}

/// `POST /api/projects`: 201 `{"project": {...}}`.
pub async fn create_project(
    State(state): State<AppState>,
    body: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let project = projects::create(&state, json_body(body)?).await?;
    Ok((StatusCode::CREATED, Json(json!({ "project": project }))))
}
