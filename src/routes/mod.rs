//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every JSON endpoint lives under `/api` and sits behind the fixed-window
//! rate limiter, which runs before any handler, cache, or body work.
//! `/healthz` is outside the limiter so probes are never throttled. CORS and
//! request tracing wrap the whole router.

pub mod features;
pub mod feedback;
pub mod generate;
pub mod projects;
pub mod suites;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router, middleware};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::rate_limit;
use crate::state::AppState;

/// JSON endpoints, relative to `/api`.
fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/generate-tests", post(generate::generate_tests))
        .route("/feedback-review", post(feedback::feedback_review))
        .route("/suites", get(suites::list_suites))
        .route("/suites/add-cases", post(suites::add_cases))
        .route("/suites/{id}", get(suites::get_suite))
        .route("/projects", get(projects::list_projects).post(projects::create_project))
        .route("/projects/{id}", get(projects::get_project))
        .route("/features", get(features::list_features).post(features::create_feature))
        .route("/features/{id}", patch(features::update_feature))
        .layer(middleware::from_fn_with_state(state.limiter.clone(), rate_limit::enforce))
}

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api_routes(&state))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Unwrap a JSON body, turning axum's rejection into our `{"error"}` 400.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
