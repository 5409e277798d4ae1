//! Process configuration loaded from environment variables.
//!
//! SYSTEM CONTEXT
//! ==============
//! `main` loads `.env` (if present), then builds [`AppConfig`] once. Each
//! subsystem owns its own typed config struct and `from_env` constructor;
//! this module only stitches them together and holds the shared parsing
//! helper. The LLM config is loaded separately because a missing key is not
//! fatal at startup.

use crate::db::DbConfig;
use crate::rate_limit::RateLimitConfig;
use crate::services::PipelineConfig;

const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Everything the server needs before it can accept traffic.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub db: DbConfig,
    pub rate_limit: RateLimitConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Build from the environment.
    ///
    /// Required: `DATABASE_URL`. Optional: `PORT` (default 3000) plus the
    /// subsystem knobs documented on each config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or `PORT` is not a port.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value: raw })?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            database_url,
            db: DbConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
            pipeline: PipelineConfig::from_env(),
        })
    }
}

/// Parse an env var, falling back to `default` when unset or unparseable.
pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
pub(crate) mod test_env {
    use std::sync::{Mutex, MutexGuard, PoisonError};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serialize tests that touch process environment.
    pub(crate) fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears the named variables and restores their prior values on drop.
    /// Only set variables that were named in [`EnvGuard::clear`].
    pub(crate) struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        pub(crate) fn clear(keys: &[&'static str]) -> Self {
            let saved = keys
                .iter()
                .map(|&key| (key, std::env::var(key).ok()))
                .collect();
            for key in keys {
                // SAFETY: callers hold `lock_env`, so no other test mutates the environment.
                unsafe { std::env::remove_var(key) };
            }
            Self { saved }
        }

        pub(crate) fn set(&self, key: &'static str, value: &str) {
            debug_assert!(self.saved.iter().any(|(k, _)| *k == key), "{key} not cleared by this guard");
            // SAFETY: see `clear`.
            unsafe { std::env::set_var(key, value) };
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in &self.saved {
                // SAFETY: see `clear`.
                unsafe {
                    match value {
                        Some(v) => std::env::set_var(key, v),
                        None => std::env::remove_var(key),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
