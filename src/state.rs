//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! Every collaborator is created once in `main` and shared behind an `Arc`:
//! the document store, the optional LLM client, the rate limiter, and the
//! response cache. The limiter and cache share one [`KvStore`].

use std::sync::Arc;
use std::time::Duration;

use crate::cache::ResponseCache;
use crate::db::Store;
use crate::error::ApiError;
use crate::kv::KvStore;
use crate::llm::LlmChat;
use crate::rate_limit::{FixedWindowLimiter, RateLimitConfig};
use crate::services::PipelineConfig;

/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub llm: Option<Arc<dyn LlmChat>>,
    pub limiter: Arc<FixedWindowLimiter>,
    pub cache: Arc<ResponseCache>,
    pub pipeline: PipelineConfig,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        llm: Option<Arc<dyn LlmChat>>,
        kv: Arc<dyn KvStore>,
        rate_limit: RateLimitConfig,
        pipeline: PipelineConfig,
    ) -> Self {
        let limiter = Arc::new(FixedWindowLimiter::new(kv.clone(), rate_limit));
        let cache = Arc::new(ResponseCache::new(kv, Duration::from_secs(pipeline.cache_ttl_secs)));
        Self { store, llm, limiter, cache, pipeline }
    }

    /// The configured LLM client, or a 500 before any network call.
    ///
    /// # Errors
    ///
    /// [`ApiError::Configuration`] when no provider key was found at startup.
    pub fn require_llm(&self) -> Result<Arc<dyn LlmChat>, ApiError> {
        self.llm
            .clone()
            .ok_or_else(|| ApiError::Configuration("LLM API key is not configured".into()))
    }
}


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
