//! Suite reads and the append ("accept suggested cases") operation.

use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::{optional_id, present};
use crate::error::ApiError;
use crate::models::{TestCase, TestSuite};
use crate::normalize::validate_submitted_case;
use crate::state::AppState;

const SUITE_NOT_FOUND: &str = "Suite not found";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendRequest {
    #[serde(default)]
    pub suite_id: Option<String>,
    #[serde(default)]
    pub test_cases: Option<Value>,
}

/// All suites newest first, narrowed to one project when `project_id` is
/// given.
///
/// # Errors
///
/// 400 when `project_id` is not a UUID; 500 on store failure.
pub async fn list(state: &AppState, project_id: Option<&str>) -> Result<Vec<TestSuite>, ApiError> {
    let project_id = optional_id(project_id, "projectId")?;
    Ok(state.store.list_suites(project_id).await?)
}

/// # Errors
///
/// 404 when the id is malformed or unknown.
pub async fn get(state: &AppState, id: &str) -> Result<TestSuite, ApiError> {
    let Ok(id) = Uuid::parse_str(id.trim()) else {
        return Err(ApiError::not_found(SUITE_NOT_FOUND));
    };
    state
        .store
        .get_suite(id)
        .await?
        .ok_or_else(|| ApiError::not_found(SUITE_NOT_FOUND))
}

/// Append caller-approved cases to the end of a suite, in order.
///
/// # Errors
///
/// 400 when the body is incomplete or any case fails the strict schema;
/// 404 when the suite does not exist.
pub async fn append(state: &AppState, request: AppendRequest) -> Result<TestSuite, ApiError> {
    let (Some(raw_id), Some(Value::Array(items))) = (present(request.suite_id.as_deref()), &request.test_cases) else {
        return Err(ApiError::validation("suiteId and testCases are required"));
    };
    let cases: Vec<TestCase> = items
        .iter()
        .enumerate()
        .map(|(i, item)| validate_submitted_case(i, item))
        .collect::<Result<_, _>>()
        .map_err(ApiError::Validation)?;

    let Ok(suite_id) = Uuid::parse_str(raw_id) else {
        return Err(ApiError::not_found(SUITE_NOT_FOUND));
    };
    let suite = state
        .store
        .append_cases(suite_id, &cases)
        .await?
        .ok_or_else(|| ApiError::not_found(SUITE_NOT_FOUND))?;

    info!(%suite_id, added = cases.len(), total = suite.test_cases.len(), "suites: cases appended");
    Ok(suite)
}

#[cfg(test)]
#[path = "suites_test.rs"]
mod tests;
