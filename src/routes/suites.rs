//! Suite routes: cached listing, lookup, and append.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{OriginalUri, Path, Query, State};
use serde::Deserialize;
use serde_json::json;

use super::json_body;
use crate::cache::{CachedJson, url_key};
use crate::error::ApiError;
use crate::models::TestSuite;
use crate::services::suites::{self, AppendRequest};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuitesQuery {
    pub project_id: Option<String>,
}

/// `GET /api/suites?projectId=`: `{"suites": [...]}`, cached by URL.
pub async fn list_suites(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<SuitesQuery>,
) -> Result<CachedJson, ApiError> {
    let key = url_key(&uri);
    let state = &state;
    let project_id = query.project_id.as_deref();
    state
        .cache
        .get_or_compute(Some(&key), || async move {
            let suites = suites::list(state, project_id).await?;
            Ok::<_, ApiError>(json!({ "suites": suites }))
        })
        .await
}

/// `GET /api/suites/{id}`
pub async fn get_suite(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<TestSuite>, ApiError> {
    Ok(Json(suites::get(&state, &id).await?))
}

/// `POST /api/suites/add-cases`
pub async fn add_cases(
    State(state): State<AppState>,
    body: Result<Json<AppendRequest>, JsonRejection>,
) -> Result<Json<TestSuite>, ApiError> {
    Ok(Json(suites::append(&state, json_body(body)?).await?))
}
