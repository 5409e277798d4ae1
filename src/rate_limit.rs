//! Fixed-window rate limiting for the API surface.
//!
//! DESIGN
//! ======
//! One counter per client per window, kept in the [`KvStore`] under
//! `rate-limit:{client}`. The first hit of a window sets the key's TTL, so
//! the window starts at the client's first request and the counter vanishes
//! when it ends. Bursts of up to twice the limit across a window edge are
//! accepted.
//!
//! TRADE-OFFS
//! ==========
//! When the store fails the request is let through and a warning logged: a
//! broken counter should not take the API down with it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use crate::config::env_parse;
use crate::error::{ApiError, ErrorCode};
use crate::kv::{KvError, KvStore};

const DEFAULT_PER_CLIENT_LIMIT: u64 = 5;
const DEFAULT_WINDOW_SECS: u64 = 60;
const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub limit: u64,
    pub window: Duration,
}

impl RateLimitConfig {
    /// `RATE_LIMIT_PER_CLIENT` (default 5) requests per
    /// `RATE_LIMIT_WINDOW_SECS` (default 60).
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            limit: env_parse("RATE_LIMIT_PER_CLIENT", DEFAULT_PER_CLIENT_LIMIT),
            window: Duration::from_secs(env_parse("RATE_LIMIT_WINDOW_SECS", DEFAULT_WINDOW_SECS)),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { limit: DEFAULT_PER_CLIENT_LIMIT, window: Duration::from_secs(DEFAULT_WINDOW_SECS) }
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit exceeded (max {limit} requests/{window_secs}s)")]
    Exceeded { limit: u64, window_secs: u64 },
    #[error(transparent)]
    Store(#[from] KvError),
}

impl ErrorCode for RateLimitError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Exceeded { .. } => "E_RATE_LIMITED",
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        true
    }
}

// =============================================================================
// RATE LIMITER
// =============================================================================

pub struct FixedWindowLimiter {
    kv: Arc<dyn KvStore>,
    config: RateLimitConfig,
}

impl FixedWindowLimiter {
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>, config: RateLimitConfig) -> Self {
        Self { kv, config }
    }

    #[cfg(test)]
    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Count one request for `client` and decide whether it may proceed.
    ///
    /// # Errors
    ///
    /// [`RateLimitError::Exceeded`] once the window's count passes the limit;
    /// [`RateLimitError::Store`] when the counter could not be updated.
    pub async fn check(&self, client: &str) -> Result<(), RateLimitError> {
        let key = counter_key(client);
        let count = self.kv.incr(&key).await?;
        if count == 1 {
            self.kv.expire(&key, self.config.window).await?;
        }
        if count > self.config.limit {
            return Err(RateLimitError::Exceeded {
                limit: self.config.limit,
                window_secs: self.config.window.as_secs(),
            });
        }
        Ok(())
    }
}

fn counter_key(client: &str) -> String {
    format!("rate-limit:{client}")
}

/// Identify the caller: first `X-Forwarded-For` hop, else the peer IP, else
/// `"unknown"`.
#[must_use]
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(client) = forwarded {
        return client.to_string();
    }
    peer.map_or_else(|| UNKNOWN_CLIENT.to_string(), |addr| addr.ip().to_string())
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// Axum middleware: reject with 429 before any handler work happens.
pub async fn enforce(State(limiter): State<Arc<FixedWindowLimiter>>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(request.headers(), peer);

    match limiter.check(&client).await {
        Ok(()) => next.run(request).await,
        Err(RateLimitError::Exceeded { limit, window_secs }) => {
            debug!(%client, limit, window_secs, "rate limit exceeded");
            ApiError::RateLimited.into_response()
        }
        Err(e @ RateLimitError::Store(_)) => {
            warn!(%client, code = e.error_code(), error = %e, "rate limiter unavailable; allowing request");
            next.run(request).await
        }
    }
}

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
