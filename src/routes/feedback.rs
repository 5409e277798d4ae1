//! `POST /api/feedback-review`.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use super::json_body;
use crate::cache::CachedJson;
use crate::error::ApiError;
use crate::services::feedback::{self, FeedbackRequest};
use crate::state::AppState;

pub async fn feedback_review(
    State(state): State<AppState>,
    body: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<CachedJson, ApiError> {
    feedback::review(&state, json_body(body)?).await
}
