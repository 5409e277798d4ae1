//! Response cache for list endpoints and the AI pipelines.
//!
//! DESIGN
//! ======
//! Bodies are stored as opaque JSON strings in the [`KvStore`] and replayed
//! byte-for-byte on a hit. GET lists are keyed by their URL
//! (`cache:url:{path?query}`); POST pipelines by a SHA-256 of the request
//! re-serialized through `serde_json::Value`, whose maps are ordered, so key
//! order in the client's JSON does not matter.
//!
//! Cache failures never fail a request: a read error is a miss and a write
//! error is a skipped write.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderValue};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{ApiError, ErrorCode};
use crate::kv::KvStore;

const STALE_WHILE_REVALIDATE_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    fn as_header(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}

/// A JSON body plus the cache metadata that becomes response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedJson {
    pub body: String,
    pub status: CacheStatus,
    pub ttl: Duration,
}

impl IntoResponse for CachedJson {
    fn into_response(self) -> Response {
        let cache_control = format!(
            "public, s-maxage={}, stale-while-revalidate={STALE_WHILE_REVALIDATE_SECS}",
            self.ttl.as_secs()
        );
        let mut response = (StatusCode::OK, self.body).into_response();
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-cache", HeaderValue::from_static(self.status.as_header()));
        if let Ok(value) = HeaderValue::from_str(&cache_control) {
            headers.insert(CACHE_CONTROL, value);
        }
        response
    }
}

// =============================================================================
// KEYS
// =============================================================================

/// `cache:url:{path?query}`.
#[must_use]
pub fn url_key(uri: &Uri) -> String {
    let path_and_query = uri
        .path_and_query()
        .map_or_else(|| uri.path(), |pq| pq.as_str());
    format!("cache:url:{path_and_query}")
}

/// `cache:{route}:{sha256 hex}` of the canonical JSON form of `body`.
/// `None` when the value cannot be represented as JSON.
pub fn body_key<T: Serialize>(route: &str, body: &T) -> Option<String> {
    let canonical = match serde_json::to_value(body) {
        Ok(value) => value.to_string(),
        Err(e) => {
            warn!(route, error = %e, "cache key: request not serializable; bypassing cache");
            return None;
        }
    };
    Some(format!("cache:{route}:{}", sha256_hex(canonical.as_bytes())))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

// =============================================================================
// CACHE
// =============================================================================

pub struct ResponseCache {
    kv: Arc<dyn KvStore>,
    ttl: Duration,
}

impl ResponseCache {
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    #[cfg(test)]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn lookup(&self, key: &str) -> Option<String> {
        match self.kv.get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(key, code = e.error_code(), error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    pub async fn store(&self, key: &str, body: &str) {
        if let Err(e) = self.kv.set(key, body, self.ttl).await {
            warn!(key, code = e.error_code(), error = %e, "cache write failed; skipping");
        }
    }

    /// Replay a cached body for `key`, or run `compute`, store its JSON, and
    /// return it. Errors from `compute` are never cached. A `None` key
    /// bypasses the cache entirely.
    ///
    /// # Errors
    ///
    /// Whatever `compute` returns, or [`ApiError::Internal`] if its value
    /// cannot be serialized.
    pub async fn get_or_compute<T, F, Fut>(&self, key: Option<&str>, compute: F) -> Result<CachedJson, ApiError>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(key) = key {
            if let Some(body) = self.lookup(key).await {
                debug!(key, "cache hit");
                return Ok(CachedJson { body, status: CacheStatus::Hit, ttl: self.ttl });
            }
        }

        let value = compute().await?;
        let body = serde_json::to_string(&value).map_err(|e| ApiError::Internal(e.to_string()))?;
        if let Some(key) = key {
            self.store(key, &body).await;
        }
        Ok(CachedJson { body, status: CacheStatus::Miss, ttl: self.ttl })
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
