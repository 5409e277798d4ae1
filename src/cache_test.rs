use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::kv::MemoryKv;
use crate::kv::test_helpers::FailingKv;

fn cache() -> ResponseCache {
    ResponseCache::new(Arc::new(MemoryKv::new()), Duration::from_secs(60))
}

// =============================================================================
// keys
// =============================================================================

#[test]
fn url_key_includes_query() {
    let uri: Uri = "/api/suites?projectId=abc".parse().unwrap();
    assert_eq!(url_key(&uri), "cache:url:/api/suites?projectId=abc");
    let bare: Uri = "/api/projects".parse().unwrap();
    assert_eq!(url_key(&bare), "cache:url:/api/projects");
}

#[test]
fn body_key_ignores_field_order() {
    let a: serde_json::Value = serde_json::from_str(r#"{"featureName":"Login","description":"d"}"#).unwrap();
    let b: serde_json::Value = serde_json::from_str(r#"{"description":"d","featureName":"Login"}"#).unwrap();
    assert_eq!(body_key("generate-tests", &a), body_key("generate-tests", &b));
}

#[test]
fn body_key_separates_routes_and_values() {
    let body = serde_json::json!({ "featureName": "Login" });
    let key = body_key("generate-tests", &body).unwrap();
    assert!(key.starts_with("cache:generate-tests:"));
    assert_eq!(key.len(), "cache:generate-tests:".len() + 64);
    assert_ne!(Some(key), body_key("feedback-review", &body));
    assert_ne!(
        body_key("generate-tests", &body),
        body_key("generate-tests", &serde_json::json!({ "featureName": "Logout" }))
    );
}

// =============================================================================
// get_or_compute
// =============================================================================

#[tokio::test]
async fn second_call_replays_identical_body_without_compute() {
    let cache = cache();
    let counter = AtomicUsize::new(0);
    let calls = &counter;
    let compute = || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, ApiError>(serde_json::json!({ "n": 1 }))
    };

    let first = cache.get_or_compute(Some("k"), compute).await.unwrap();
    let second = cache.get_or_compute(Some("k"), compute).await.unwrap();

    assert_eq!(first.status, CacheStatus::Miss);
    assert_eq!(second.status, CacheStatus::Hit);
    assert_eq!(first.body, second.body);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn errors_are_not_cached() {
    let cache = cache();
    let result = cache
        .get_or_compute::<serde_json::Value, _, _>(Some("k"), || async { Err(ApiError::not_found("nope")) })
        .await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
    assert!(cache.lookup("k").await.is_none());
}

#[tokio::test]
async fn no_key_bypasses_cache() {
    let cache = cache();
    let hit = cache
        .get_or_compute(None, || async { Ok::<_, ApiError>(vec![1, 2]) })
        .await
        .unwrap();
    assert_eq!(hit.status, CacheStatus::Miss);
    assert_eq!(hit.body, "[1,2]");
}

#[tokio::test]
async fn failing_store_degrades_to_uncached() {
    let cache = ResponseCache::new(Arc::new(FailingKv), Duration::from_secs(60));
    let counter = AtomicUsize::new(0);
    let calls = &counter;
    for _ in 0..2 {
        let out = cache
            .get_or_compute(Some("k"), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ApiError>("v")
            })
            .await
            .unwrap();
        assert_eq!(out.status, CacheStatus::Miss);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// =============================================================================
// response headers
// =============================================================================

#[test]
fn cached_json_sets_cache_headers() {
    let response = CachedJson { body: "{}".into(), status: CacheStatus::Hit, ttl: Duration::from_secs(60) }.into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-cache"], "HIT");
    assert_eq!(headers[CACHE_CONTROL], "public, s-maxage=60, stale-while-revalidate=300");
    assert_eq!(headers[CONTENT_TYPE], "application/json");
}
