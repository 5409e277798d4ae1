//! Generation pipeline: feature description in, persisted test suite out.
//!
//! DESIGN
//! ======
//! Validation and the LLM configuration check run before the cache so a bad
//! request never produces a cached body. Everything after the cache lookup
//! runs inside [`crate::cache::ResponseCache::get_or_compute`]: a hit
//! replays the stored body with no LLM call and no write.
//!
//! A `suiteId` that resolves to a suite of the same project regenerates
//! that suite in place; anything else creates a new suite.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{optional_id, present, required_id};
use crate::cache::{CachedJson, body_key};
use crate::db::{FeedbackCarry, NewSuite, SuiteReplacement};
use crate::error::{ApiError, ErrorCode};
use crate::llm::LlmChat;
use crate::llm::types::{Message, ResponseFormat};
use crate::models::{TestCase, TestSuite};
use crate::normalize::{clamp_score, parse_generated_cases};
use crate::prompt::{SYSTEM_INSTRUCTION, generation_prompt};
use crate::state::AppState;

const CACHE_ROUTE: &str = "generate-tests";

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub feature_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub feature_id: Option<String>,
    #[serde(default)]
    pub suite_id: Option<String>,
    #[serde(default)]
    pub last_feedback_score: Option<f64>,
    #[serde(default)]
    pub last_feedback_summary: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_reviewed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub suite_id: Uuid,
    pub project_id: Uuid,
    pub feature_name: String,
    pub test_cases: Vec<TestCase>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_feedback_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_feedback_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "time::serde::rfc3339::option")]
    pub last_reviewed_at: Option<OffsetDateTime>,
}

impl From<TestSuite> for GenerateResponse {
    fn from(suite: TestSuite) -> Self {
        Self {
            suite_id: suite.id,
            project_id: suite.project_id,
            feature_name: suite.feature_name,
            test_cases: suite.test_cases,
            created_at: suite.created_at,
            last_feedback_score: suite.last_feedback_score,
            last_feedback_summary: suite.last_feedback_summary,
            last_reviewed_at: suite.last_reviewed_at,
        }
    }
}

/// A request that passed validation.
#[derive(Debug)]
struct Generation {
    feature_name: String,
    description: String,
    project_id: Uuid,
    feature_id: Option<Uuid>,
    suite_id: Option<Uuid>,
    feedback: FeedbackCarry,
}

impl GenerateRequest {
    fn validate(&self) -> Result<Generation, ApiError> {
        let (Some(feature_name), Some(description)) =
            (present(self.feature_name.as_deref()), present(self.description.as_deref()))
        else {
            return Err(ApiError::validation("Feature name and description are required"));
        };
        let project_id = required_id(self.project_id.as_deref(), "projectId")?;
        let feature_id = optional_id(self.feature_id.as_deref(), "featureId")?;
        // An unparseable suite id is the same as no suite id.
        let suite_id = present(self.suite_id.as_deref()).and_then(|raw| Uuid::parse_str(raw).ok());

        Ok(Generation {
            feature_name: feature_name.to_string(),
            description: description.to_string(),
            project_id,
            feature_id,
            suite_id,
            feedback: FeedbackCarry {
                score: self.last_feedback_score.filter(|s| s.is_finite()).map(clamp_score),
                summary: present(self.last_feedback_summary.as_deref()).map(str::to_string),
                reviewed_at: self.last_reviewed_at,
            },
        })
    }
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Run the generation pipeline for one request.
///
/// # Errors
///
/// 400 on invalid input, 404 for an unknown project, 500 when the LLM is
/// unconfigured, fails, or answers with something unusable.
pub async fn generate(state: &AppState, request: GenerateRequest) -> Result<CachedJson, ApiError> {
    let generation = request.validate()?;
    let llm = state.require_llm()?;
    let key = body_key(CACHE_ROUTE, &request);

    state
        .cache
        .get_or_compute(key.as_deref(), || run(state, llm.as_ref(), generation))
        .await
}

async fn run(state: &AppState, llm: &dyn LlmChat, generation: Generation) -> Result<GenerateResponse, ApiError> {
    let project_id = generation.project_id;
    if state.store.get_project(project_id).await?.is_none() {
        return Err(ApiError::not_found("Project not found"));
    }

    let existing = match generation.suite_id {
        Some(id) => state
            .store
            .get_suite(id)
            .await?
            .filter(|suite| suite.project_id == project_id),
        None => None,
    };
    if generation.suite_id.is_some() && existing.is_none() {
        warn!(%project_id, suite_id = ?generation.suite_id, "generate: suite not found in project; creating new suite");
    }

    let prompt = generation_prompt(
        &generation.feature_name,
        &generation.description,
        existing.as_ref().map(|suite| suite.test_cases.as_slice()),
    );
    let response = llm
        .chat(state.pipeline.max_tokens, SYSTEM_INSTRUCTION, &[Message::user(prompt)], ResponseFormat::JsonObject)
        .await?;
    info!(
        %project_id,
        model = %response.model,
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        "generate: llm answered"
    );

    let Some(text) = response.text() else {
        return Err(ApiError::UpstreamEmpty("No response from AI"));
    };
    let test_cases = parse_generated_cases(&text).map_err(|e| {
        warn!(%project_id, code = e.error_code(), error = %e, "generate: unusable model output");
        ApiError::MalformedResponse("AI returned invalid test case format".into())
    })?;

    let suite = persist(state, existing, generation, test_cases).await?;
    info!(%project_id, suite_id = %suite.id, cases = suite.test_cases.len(), "generate: suite saved");
    Ok(suite.into())
}

async fn persist(
    state: &AppState,
    existing: Option<TestSuite>,
    generation: Generation,
    test_cases: Vec<TestCase>,
) -> Result<TestSuite, ApiError> {
    if let Some(existing) = existing {
        let replacement = SuiteReplacement {
            name: generation.feature_name.clone(),
            feature_name: generation.feature_name.clone(),
            description: generation.description.clone(),
            test_cases: test_cases.clone(),
            feedback: generation.feedback.clone(),
        };
        if let Some(suite) = state.store.replace_suite(existing.id, replacement).await? {
            return Ok(suite);
        }
        warn!(suite_id = %existing.id, "generate: suite vanished before replace; creating new suite");
    }

    let suite = state
        .store
        .create_suite(NewSuite {
            project_id: generation.project_id,
            feature_id: generation.feature_id,
            name: generation.feature_name.clone(),
            feature_name: generation.feature_name,
            description: generation.description,
            test_cases,
            feedback: generation.feedback,
        })
        .await?;
    Ok(suite)
}

#[cfg(test)]
#[path = "generation_test.rs"]
mod tests;
