//! Key/value store backing the rate limiter and the response cache.
//!
//! DESIGN
//! ======
//! `KvStore` is the narrow seam both consumers need: string get/set with a
//! TTL, an atomic counter, and a way to attach a TTL to an existing key.
//! `MemoryKv` is the in-process backend: a `HashMap` behind a mutex with
//! lazy expiry on access and an occasional sweep once the map grows.
//!
//! A networked backend only has to implement the trait; callers never see
//! which one is wired in.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

const SWEEP_THRESHOLD: usize = 1024;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("value at {key} is not an integer")]
    NotAnInteger { key: String },
    #[error("kv store unavailable: {0}")]
    Unavailable(String),
}

impl crate::error::ErrorCode for KvError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotAnInteger { .. } => "E_KV_NOT_AN_INTEGER",
            Self::Unavailable(_) => "E_KV_UNAVAILABLE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

// =============================================================================
// TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    /// Read a live value.
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Write a value that disappears after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError>;

    /// Increment the integer at `key` (missing counts as 0) and return the
    /// new value. An existing TTL is preserved.
    async fn incr(&self, key: &str) -> Result<u64, KvError>;

    /// Attach a TTL to an existing key. No-op when the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError>;
}

// =============================================================================
// IN-MEMORY BACKEND
// =============================================================================

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryKv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<String> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set_at(&self, key: &str, value: &str, ttl: Duration, now: Instant) {
        let mut entries = self.lock();
        if entries.len() >= SWEEP_THRESHOLD {
            entries.retain(|_, entry| entry.is_live(now));
        }
        entries.insert(key.to_string(), Entry { value: value.to_string(), expires_at: Some(now + ttl) });
    }

    fn incr_at(&self, key: &str, now: Instant) -> Result<u64, KvError> {
        let mut entries = self.lock();
        if entries.len() >= SWEEP_THRESHOLD {
            entries.retain(|_, entry| entry.is_live(now));
        }
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry { value: "0".to_string(), expires_at: None });
        if !entry.is_live(now) {
            entry.value = "0".to_string();
            entry.expires_at = None;
        }
        let current: u64 = entry
            .value
            .parse()
            .map_err(|_| KvError::NotAnInteger { key: key.to_string() })?;
        let next = current.saturating_add(1);
        entry.value = next.to_string();
        Ok(next)
    }

    fn expire_at(&self, key: &str, ttl: Duration, now: Instant) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(key) {
            if entry.is_live(now) {
                entry.expires_at = Some(now + ttl);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }
}

#[async_trait::async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.get_at(key, Instant::now()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        self.set_at(key, value, ttl, Instant::now());
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<u64, KvError> {
        self.incr_at(key, Instant::now())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError> {
        self.expire_at(key, ttl, Instant::now());
        Ok(())
    }
}


#[cfg(test)]
#[path = "kv_test.rs"]
mod tests;
