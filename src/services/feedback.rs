//! Feedback review pipeline: score a suite's coverage and suggest cases.
//!
//! The review itself is transient. Its score, summary, and review time are
//! stamped onto the suite named by `suiteId` and copied down to that suite's
//! feature. A review for a suite that cannot be found is still returned to
//! the caller; it just is not recorded anywhere.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::present;
use crate::cache::{CachedJson, body_key};
use crate::db::FeatureRef;
use crate::error::{ApiError, ErrorCode};
use crate::llm::LlmChat;
use crate::llm::types::{Message, ResponseFormat};
use crate::models::{FeedbackResult, FeedbackStamp, TestCase};
use crate::normalize::{normalize_feedback, validate_submitted_case};
use crate::prompt::{SYSTEM_INSTRUCTION, feedback_prompt};
use crate::state::AppState;

const CACHE_ROUTE: &str = "feedback-review";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(default)]
    pub feature_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub test_cases: Option<Value>,
    #[serde(default)]
    pub suite_id: Option<String>,
}

struct Review {
    feature_name: String,
    description: String,
    test_cases: Vec<TestCase>,
    suite_id: Option<Uuid>,
}

impl FeedbackRequest {
    fn validate(&self) -> Result<Review, ApiError> {
        let (Some(feature_name), Some(description)) =
            (present(self.feature_name.as_deref()), present(self.description.as_deref()))
        else {
            return Err(ApiError::validation("Feature name and description are required."));
        };
        let items = match &self.test_cases {
            Some(Value::Array(items)) if !items.is_empty() => items,
            _ => return Err(ApiError::validation("At least one test case is required for feedback review.")),
        };
        let test_cases = items
            .iter()
            .enumerate()
            .map(|(i, item)| validate_submitted_case(i, item))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ApiError::Validation)?;

        let suite_id = match present(self.suite_id.as_deref()) {
            Some(raw) => match Uuid::parse_str(raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(suite_id = raw, "feedback: unparseable suite id; review will not be recorded");
                    None
                }
            },
            None => None,
        };

        Ok(Review {
            feature_name: feature_name.to_string(),
            description: description.to_string(),
            test_cases,
            suite_id,
        })
    }
}

/// Run the feedback pipeline for one request.
///
/// # Errors
///
/// 400 on invalid input; 500 when the LLM is unconfigured, fails, or
/// answers with something unusable, or when recording the review fails.
pub async fn review(state: &AppState, request: FeedbackRequest) -> Result<CachedJson, ApiError> {
    let review = request.validate()?;
    let llm = state.require_llm()?;
    let key = body_key(CACHE_ROUTE, &request);

    state
        .cache
        .get_or_compute(key.as_deref(), || run(state, llm.as_ref(), review))
        .await
}

async fn run(state: &AppState, llm: &dyn LlmChat, review: Review) -> Result<FeedbackResult, ApiError> {
    let prompt = feedback_prompt(&review.feature_name, &review.description, &review.test_cases);
    let response = llm
        .chat(state.pipeline.max_tokens, SYSTEM_INSTRUCTION, &[Message::user(prompt)], ResponseFormat::JsonObject)
        .await?;
    info!(
        model = %response.model,
        cases = review.test_cases.len(),
        output_tokens = response.output_tokens,
        "feedback: llm answered"
    );

    let Some(text) = response.text() else {
        return Err(ApiError::UpstreamEmpty("No response from AI."));
    };
    let result = normalize_feedback(&text).map_err(|e| {
        warn!(code = e.error_code(), error = %e, "feedback: unusable model output");
        ApiError::MalformedResponse("AI returned invalid feedback format".into())
    })?;

    let stamp = result.stamp(OffsetDateTime::now_utc());
    record(state, review.suite_id, &stamp).await?;
    Ok(result)
}

/// Stamp the review onto the suite, then onto the suite's feature.
async fn record(state: &AppState, suite_id: Option<Uuid>, stamp: &FeedbackStamp) -> Result<(), ApiError> {
    let Some(suite_id) = suite_id else {
        debug!("feedback: no suite id; review not recorded");
        return Ok(());
    };
    let Some(suite) = state.store.stamp_suite_feedback(suite_id, stamp).await? else {
        warn!(%suite_id, "feedback: suite not found; review not recorded");
        return Ok(());
    };

    let target = FeatureRef::for_suite(&suite);
    let features = state.store.stamp_feature_feedback(&target, stamp).await?;
    info!(%suite_id, score = stamp.score, features, "feedback: review recorded");
    Ok(())
}

#[cfg(test)]
#[path = "feedback_test.rs"]
mod tests;
