//! Normalization of untrusted model output into typed records.
//!
//! DESIGN
//! ======
//! Model output is parsed into `serde_json::Value` first and then walked
//! field by field, so one bad case never sinks its siblings. Generation is
//! lenient per case (repair what is repairable, drop the rest) but strict on
//! the batch: fewer than [`MIN_GENERATED_CASES`] usable cases is treated as a
//! malformed answer. Feedback is defaulted field by field and never fails
//! once the top level is an object.
//!
//! Cases supplied by callers (the append flow) go through
//! [`validate_submitted_case`] instead, which repairs nothing.

use serde_json::{Map, Value};

use crate::models::{CaseType, FeedbackResult, TestCase};

pub const MIN_GENERATED_CASES: usize = 4;
pub const MAX_GENERATED_CASES: usize = 8;
pub const DEFAULT_FEEDBACK_SUMMARY: &str = "No summary provided.";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("response is not valid JSON")]
    InvalidJson,
    #[error("response JSON has the wrong shape: {0}")]
    WrongShape(&'static str),
    #[error("only {usable} usable test cases (need at least {MIN_GENERATED_CASES})")]
    TooFewCases { usable: usize },
}

impl crate::error::ErrorCode for NormalizeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidJson => "E_NORMALIZE_INVALID_JSON",
            Self::WrongShape(_) => "E_NORMALIZE_WRONG_SHAPE",
            Self::TooFewCases { .. } => "E_NORMALIZE_TOO_FEW_CASES",
        }
    }

    fn retryable(&self) -> bool {
        true
    }
}

// =============================================================================
// GENERATION
// =============================================================================

/// Parse a generation answer into 4–8 repaired test cases.
///
/// # Errors
///
/// Returns [`NormalizeError`] when the text is not JSON, `testCases` is not
/// an array, or too few cases survive repair.
pub fn parse_generated_cases(raw: &str) -> Result<Vec<TestCase>, NormalizeError> {
    let root: Value = serde_json::from_str(raw.trim()).map_err(|_| NormalizeError::InvalidJson)?;
    let Some(items) = root.get("testCases").and_then(Value::as_array) else {
        return Err(NormalizeError::WrongShape("testCases is not an array"));
    };

    let mut cases: Vec<TestCase> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| repair_case(item, || format!("TC_{}", i + 1)))
        .collect();

    if cases.len() < MIN_GENERATED_CASES {
        return Err(NormalizeError::TooFewCases { usable: cases.len() });
    }
    cases.truncate(MAX_GENERATED_CASES);
    Ok(cases)
}

/// Repair one model-produced case, or `None` if it cannot be salvaged.
///
/// Strings are trimmed; `type` is matched case-insensitively; a missing id
/// is filled from `fallback_id`; `steps` may be a single string; non-string
/// steps are dropped; a non-object `samplePayload` becomes `{}`.
fn repair_case(item: &Value, fallback_id: impl FnOnce() -> String) -> Option<TestCase> {
    let obj = item.as_object()?;

    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .and_then(CaseType::parse_loose)?;
    let title = non_blank(obj.get("title"))?;
    let expected = non_blank(obj.get("expected"))?;

    let steps: Vec<String> = match obj.get("steps") {
        Some(Value::Array(steps)) => steps
            .iter()
            .filter_map(|step| non_blank(Some(step)))
            .collect(),
        Some(single @ Value::String(_)) => non_blank(Some(single)).into_iter().collect(),
        _ => Vec::new(),
    };
    if steps.is_empty() {
        return None;
    }

    let id = non_blank(obj.get("id")).unwrap_or_else(fallback_id);
    let sample_payload = match obj.get("samplePayload") {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };

    Some(TestCase { id, kind, title, steps, expected, sample_payload })
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    let text = value?.as_str()?.trim();
    if text.is_empty() { None } else { Some(text.to_string()) }
}

// =============================================================================
// FEEDBACK
// =============================================================================

/// Parse a feedback answer, clamping and defaulting every field.
///
/// # Errors
///
/// Returns [`NormalizeError`] when the text is not JSON or not an object.
pub fn normalize_feedback(raw: &str) -> Result<FeedbackResult, NormalizeError> {
    let root: Value = serde_json::from_str(raw.trim()).map_err(|_| NormalizeError::InvalidJson)?;
    let Some(obj) = root.as_object() else {
        return Err(NormalizeError::WrongShape("feedback is not an object"));
    };

    let score = obj
        .get("score")
        .and_then(Value::as_f64)
        .filter(|s| s.is_finite())
        .map_or(0.0, clamp_score);
    let summary = non_blank(obj.get("summary")).unwrap_or_else(|| DEFAULT_FEEDBACK_SUMMARY.to_string());

    let suggested_test_cases = obj
        .get("suggestedTestCases")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| repair_case(item, || format!("TC_extra_{}", i + 1)))
                .collect()
        })
        .unwrap_or_default();

    Ok(FeedbackResult {
        score,
        summary,
        missing_areas: string_list(obj.get("missingAreas")),
        suggestions: string_list(obj.get("suggestions")),
        suggested_test_cases,
    })
}

#[must_use]
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| non_blank(Some(v))).collect())
        .unwrap_or_default()
}

// =============================================================================
// SUBMITTED CASES
// =============================================================================

/// Strict check for a caller-supplied case: every field must already be
/// well-formed. Returns a message suitable for a 400 response.
///
/// # Errors
///
/// Returns a human-readable reason naming the offending field.
pub fn validate_submitted_case(index: usize, item: &Value) -> Result<TestCase, String> {
    let case: TestCase =
        serde_json::from_value(item.clone()).map_err(|e| format!("testCases[{index}] is invalid: {e}"))?;

    let blank = |field: &str| format!("testCases[{index}].{field} must not be empty");
    if case.id.trim().is_empty() {
        return Err(blank("id"));
    }
    if case.title.trim().is_empty() {
        return Err(blank("title"));
    }
    if case.expected.trim().is_empty() {
        return Err(blank("expected"));
    }
    if case.steps.is_empty() || case.steps.iter().any(|s| s.trim().is_empty()) {
        return Err(blank("steps"));
    }
    Ok(case)
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
