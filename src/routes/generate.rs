//! `POST /api/generate-tests`.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use super::json_body;
use crate::cache::CachedJson;
use crate::error::ApiError;
use crate::services::generation::{self, GenerateRequest};
use crate::state::AppState;

/// Generate (or regenerate) a suite for a feature.
pub async fn generate_tests(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<CachedJson, ApiError> {
    generation::generate(&state, json_body(body)?).await
}
