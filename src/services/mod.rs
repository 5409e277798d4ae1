//! Request pipelines behind the HTTP handlers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Handlers decode the body and hand it here. `generation` and `feedback`
//! run the AI pipelines inside the response cache; `suites`, `projects`,
//! and `features` are thin validation layers over the [`crate::db::Store`].
//! Every service returns [`ApiError`] so handlers stay one line.

pub mod feedback;
pub mod features;
pub mod generation;
pub mod projects;
pub mod suites;

use uuid::Uuid;

use crate::config::env_parse;
use crate::error::ApiError;

const DEFAULT_AI_MAX_TOKENS: u32 = 4096;
const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Knobs shared by the generation and feedback pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub max_tokens: u32,
    pub cache_ttl_secs: u64,
}

impl PipelineConfig {
    /// `AI_MAX_TOKENS` (default 4096), `CACHE_TTL_SECS` (default 60).
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_tokens: env_parse("AI_MAX_TOKENS", DEFAULT_AI_MAX_TOKENS),
            cache_ttl_secs: env_parse("CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { max_tokens: DEFAULT_AI_MAX_TOKENS, cache_ttl_secs: DEFAULT_CACHE_TTL_SECS }
    }
}

// =============================================================================
// INPUT HELPERS
// =============================================================================

/// Trimmed text, or `None` when absent or blank.
pub(crate) fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Required UUID field: `"{field} is required"` when blank,
/// `"{field} is invalid"` when unparseable.
pub(crate) fn required_id(value: Option<&str>, field: &str) -> Result<Uuid, ApiError> {
    let raw = present(value).ok_or_else(|| ApiError::validation(format!("{field} is required")))?;
    Uuid::parse_str(raw).map_err(|_| ApiError::validation(format!("{field} is invalid")))
}

/// Optional UUID field: blank is `None`, unparseable is a 400.
pub(crate) fn optional_id(value: Option<&str>, field: &str) -> Result<Option<Uuid>, ApiError> {
    present(value)
        .map(|raw| Uuid::parse_str(raw).map_err(|_| ApiError::validation(format!("{field} is invalid"))))
        .transpose()
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};

    use crate::llm::LlmChat;
    use crate::llm::types::{ChatResponse, ContentBlock, LlmError, Message, ResponseFormat};

    enum Reply {
        Text(String),
        /// One answer per call; the last repeats once the script runs out.
        InTurn(Vec<String>),
        Empty,
        Fail,
    }

    /// Scripted [`LlmChat`]: answers every call the same way and records
    /// what it was asked.
    pub(crate) struct MockLlm {
        reply: Reply,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
        formats: Mutex<Vec<ResponseFormat>>,
    }

    impl MockLlm {
        fn with(reply: Reply) -> Self {
            Self { reply, calls: AtomicUsize::new(0), prompts: Mutex::new(Vec::new()), formats: Mutex::new(Vec::new()) }
        }

        pub(crate) fn replying(text: impl Into<String>) -> Self {
            Self::with(Reply::Text(text.into()))
        }

        pub(crate) fn replying_in_turn(texts: Vec<String>) -> Self {
            Self::with(Reply::InTurn(texts))
        }

        /// Answers with no text blocks at all.
        pub(crate) fn silent() -> Self {
            Self::with(Reply::Empty)
        }

        /// Fails every call with a provider 502.
        pub(crate) fn failing() -> Self {
            Self::with(Reply::Fail)
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub(crate) fn last_prompt(&self) -> Option<String> {
            self.prompts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .last()
                .cloned()
        }

        pub(crate) fn formats(&self) -> Vec<ResponseFormat> {
            self.formats
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    #[async_trait::async_trait]
    impl LlmChat for MockLlm {
        async fn chat(
            &self,
            _max_tokens: u32,
            _system: &str,
            messages: &[Message],
            format: ResponseFormat,
        ) -> Result<ChatResponse, LlmError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(last) = messages.last() {
                self.prompts
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(last.content.clone());
            }
            self.formats
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(format);

            let content = match &self.reply {
                Reply::Text(text) => vec![ContentBlock::Text { text: text.clone() }],
                Reply::InTurn(texts) => texts
                    .get(call)
                    .or(texts.last())
                    .map(|text| ContentBlock::Text { text: text.clone() })
                    .into_iter()
                    .collect(),
                Reply::Empty => Vec::new(),
                Reply::Fail => return Err(LlmError::ApiResponse { status: 502, body: "bad gateway".into() }),
            };
            Ok(ChatResponse {
                content,
                model: "mock".into(),
                stop_reason: "end_turn".into(),
                input_tokens: 10,
                output_tokens: 20,
            })
        }
    }

    /// A well-formed generation answer with `n` cases cycling through the types.
    pub(crate) fn generation_reply(n: usize) -> String {
        let kinds = ["happy", "negative", "edge"];
        let cases: Vec<serde_json::Value> = (1..=n)
            .map(|i| {
                serde_json::json!({
                    "id": format!("TC_{i}"),
                    "type": kinds[(i - 1) % kinds.len()],
                    "title": format!("Case {i}"),
                    "steps": ["Open the form", "Submit"],
                    "expected": "It behaves",
                    "samplePayload": { "field": i }
                })
            })
            .collect();
        serde_json::json!({ "testCases": cases }).to_string()
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
