//! Document store: projects, features, and test suites.
//!
//! SYSTEM CONTEXT
//! ==============
//! Startup uses [`init_pool`] to create the shared SQLx pool and run
//! migrations before accepting traffic. Services only see the [`Store`]
//! trait; [`postgres::PgStore`] is the production implementation and tests
//! run against an in-memory one.
//!
//! TRADE-OFFS
//! ==========
//! Suites carry no version column. Two generations racing on the same suite
//! both succeed and the later write wins.

pub mod postgres;

#[cfg(test)]
pub(crate) mod memory;

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::config::env_parse;
use crate::models::{FeedbackStamp, Feature, Project, TestCase, TestSuite};

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// POOL
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DbConfig {
    /// `DB_MAX_CONNECTIONS` (default 5), `DB_ACQUIRE_TIMEOUT_SECS` (default 5).
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            acquire_timeout_secs: env_parse("DB_ACQUIRE_TIMEOUT_SECS", DEFAULT_DB_ACQUIRE_TIMEOUT_SECS),
        }
    }
}

/// Initialize the `PostgreSQL` connection pool and run migrations.
///
/// # Errors
///
/// Returns an error if the connection or migrations fail.
pub async fn init_pool(database_url: &str, config: DbConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;

    Ok(pool)
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("project not found: {0}")]
    ProjectMissing(Uuid),
}

impl crate::error::ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "E_DATABASE",
            Self::ProjectMissing(_) => "E_PROJECT_MISSING",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)))
    }
}

// =============================================================================
// WRITE MODELS
// =============================================================================

/// Everything needed to create a suite.
#[derive(Debug, Clone)]
pub struct NewSuite {
    pub project_id: Uuid,
    pub feature_id: Option<Uuid>,
    pub name: String,
    pub feature_name: String,
    pub description: String,
    pub test_cases: Vec<TestCase>,
    pub feedback: FeedbackCarry,
}

/// Full replacement of a suite's generated content. `created_at` is reset
/// to now; feedback fields left `None` keep their stored values.
#[derive(Debug, Clone)]
pub struct SuiteReplacement {
    pub name: String,
    pub feature_name: String,
    pub description: String,
    pub test_cases: Vec<TestCase>,
    pub feedback: FeedbackCarry,
}

/// Feedback fields a caller carries forward onto a generated suite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackCarry {
    pub score: Option<f64>,
    pub summary: Option<String>,
    pub reviewed_at: Option<time::OffsetDateTime>,
}

/// How a suite finds its feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureRef {
    Id(Uuid),
    Name { project_id: Uuid, name: String },
}

impl FeatureRef {
    /// Explicit id when the suite has one, else project + name equality.
    #[must_use]
    pub fn for_suite(suite: &TestSuite) -> Self {
        match suite.feature_id {
            Some(id) => Self::Id(id),
            None => Self::Name { project_id: suite.project_id, name: suite.feature_name.clone() },
        }
    }
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Narrow persistence seam used by the services. Lists are newest first.
/// Lookups and updates by id return `None` when nothing matched.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>, StoreError>;
    async fn get_project(&self, id: Uuid) -> Result<Option<Project>, StoreError>;
    async fn create_project(&self, name: &str, description: &str) -> Result<Project, StoreError>;

    async fn list_features(&self, project_id: Uuid) -> Result<Vec<Feature>, StoreError>;
    /// Fails with [`StoreError::ProjectMissing`] when the project is unknown.
    async fn create_feature(&self, project_id: Uuid, name: &str, description: &str) -> Result<Feature, StoreError>;
    /// `None` fields keep their stored values.
    async fn update_feature(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Feature>, StoreError>;
    /// Write a review stamp onto the matching feature(s); returns how many
    /// were updated.
    async fn stamp_feature_feedback(&self, target: &FeatureRef, stamp: &FeedbackStamp) -> Result<u64, StoreError>;

    async fn list_suites(&self, project_id: Option<Uuid>) -> Result<Vec<TestSuite>, StoreError>;
    async fn get_suite(&self, id: Uuid) -> Result<Option<TestSuite>, StoreError>;
    /// Fails with [`StoreError::ProjectMissing`] when the project is unknown.
    async fn create_suite(&self, suite: NewSuite) -> Result<TestSuite, StoreError>;
    async fn replace_suite(&self, id: Uuid, replacement: SuiteReplacement) -> Result<Option<TestSuite>, StoreError>;
    /// Append in order after the existing cases.
    async fn append_cases(&self, id: Uuid, cases: &[TestCase]) -> Result<Option<TestSuite>, StoreError>;
    async fn stamp_suite_feedback(&self, id: Uuid, stamp: &FeedbackStamp) -> Result<Option<TestSuite>, StoreError>;
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
