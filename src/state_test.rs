use std::sync::Arc;

use super::test_helpers::test_state;
use crate::db::memory::MemoryStore;
use crate::error::ErrorCode;
use crate::services::test_helpers::MockLlm;

#[test]
fn require_llm_without_client_is_configuration_error() {
    let state = test_state(Arc::new(MemoryStore::new()), None);
    let Err(err) = state.require_llm() else {
        panic!("expected configuration error");
    };
    assert_eq!(err.error_code(), "E_CONFIGURATION");
    assert_eq!(err.public_message(), "LLM API key is not configured");
}

#[test]
fn require_llm_returns_shared_client() {
    let state = test_state(Arc::new(MemoryStore::new()), Some(Arc::new(MockLlm::replying("{}"))));
    assert!(state.require_llm().is_ok());
}

#[test]
fn cache_ttl_follows_pipeline_config() {
    let state = test_state(Arc::new(MemoryStore::new()), None);
    assert_eq!(state.cache.ttl().as_secs(), state.pipeline.cache_ttl_secs);
    assert_eq!(state.limiter.config().limit, 5);
}
