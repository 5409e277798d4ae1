//! Feature routes.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use super::json_body;
use crate::error::ApiError;
use crate::services::features::{self, CreateFeatureRequest, UpdateFeatureRequest};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturesQuery {
    pub project_id: Option<String>,
}

/// `GET /api/features?projectId=`
pub async fn list_features(
    State(state): State<AppState>,
    Query(query): Query<FeaturesQuery>,
) -> Result<Json<Value>, ApiError> {
    let features = features::list(&state, query.project_id.as_deref()).await?;
    Ok(Json(json!({ "features": features })))
}

/// `POST /api/features`: 201 `{"feature": {...}}`.
pub async fn create_feature(
    State(state): State<AppState>,
    body: Result<Json<CreateFeatureRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let feature = features::create(&state, json_body(body)?).await?;
    Ok((StatusCode::CREATED, Json(json!({ "feature": feature }))))
}

/// `PATCH /api/features/{id}`
pub async fn update_feature(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateFeatureRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let feature = features::update(&state, &id, json_body(body)?).await?;
    Ok(Json(json!({ "feature": feature })))
}
