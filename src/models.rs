//! Domain records shared by the store, the pipelines, and the HTTP layer.
//!
//! DESIGN
//! ======
//! Field names serialize as camelCase because the JSON shapes are consumed by
//! the browser client unchanged. Timestamps travel as RFC 3339 strings.
//! A suite is associated with its feature by `feature_name` equality; the
//! optional `feature_id` is the explicit link and wins when present.
//!
//! Records map straight onto their Postgres rows; a suite's cases live in a
//! single JSONB column.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// TEST CASE
// =============================================================================

/// Category of a generated test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseType {
    Happy,
    Negative,
    Edge,
}

impl CaseType {
    pub const ALL: [Self; 3] = [Self::Happy, Self::Negative, Self::Edge];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Negative => "negative",
            Self::Edge => "edge",
        }
    }

    /// Lenient parse used on model output: trims and ignores ASCII case.
    #[must_use]
    pub fn parse_loose(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw))
    }
}

/// One test case. Always owned by a suite; `id` is suite-local (`TC_1`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CaseType,
    pub title: String,
    pub steps: Vec<String>,
    pub expected: String,
    #[serde(default)]
    pub sample_payload: Map<String, Value>,
}

// =============================================================================
// PROJECT / FEATURE / SUITE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub last_feedback_score: Option<f64>,
    pub last_feedback_summary: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_reviewed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TestSuite {
    pub id: Uuid,
    pub project_id: Uuid,
    pub feature_id: Option<Uuid>,
    pub name: String,
    pub feature_name: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[sqlx(json)]
    pub test_cases: Vec<TestCase>,
    pub last_feedback_score: Option<f64>,
    pub last_feedback_summary: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_reviewed_at: Option<OffsetDateTime>,
}

// =============================================================================
// FEEDBACK
// =============================================================================

/// Normalized feedback review. Transient: only the score, summary, and review
/// time persist (see [`FeedbackStamp`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResult {
    pub score: f64,
    pub summary: String,
    pub missing_areas: Vec<String>,
    pub suggestions: Vec<String>,
    pub suggested_test_cases: Vec<TestCase>,
}

/// The slice of a feedback review written onto a suite and its feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackStamp {
    pub score: f64,
    pub summary: String,
    pub reviewed_at: OffsetDateTime,
}

impl FeedbackResult {
    #[must_use]
    pub fn stamp(&self, reviewed_at: OffsetDateTime) -> FeedbackStamp {
        FeedbackStamp { score: self.score, summary: self.summary.clone(), reviewed_at }
    }
}

#[cfg(test)]
#[path = "models_test.rs"]
mod tests;
