//! Postgres implementation of [`Store`].
//!
//! Suites keep their cases in a JSONB array; append is a single
//! `test_cases || $2` update so concurrent appends never drop each other.

use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::{FeatureRef, NewSuite, Store, StoreError, SuiteReplacement};
use crate::models::{FeedbackStamp, Feature, Project, TestCase, TestSuite};

const PROJECT_COLUMNS: &str = "id, name, description, created_at";
const FEATURE_COLUMNS: &str =
    "id, project_id, name, description, created_at, last_feedback_score, last_feedback_summary, last_reviewed_at";
const SUITE_COLUMNS: &str = "id, project_id, feature_id, name, feature_name, description, created_at, test_cases, \
                             last_feedback_score, last_feedback_summary, last_reviewed_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a foreign-key violation on `project_id` to a typed error.
fn project_fk(project_id: Uuid) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StoreError::ProjectMissing(project_id),
        _ => StoreError::Database(e),
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    // -------------------------------------------------------------------------
    // projects
    // -------------------------------------------------------------------------

    async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC");
        Ok(sqlx::query_as::<_, Project>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        Ok(sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_project(&self, name: &str, description: &str) -> Result<Project, StoreError> {
        let sql = format!("INSERT INTO projects (id, name, description) VALUES ($1, $2, $3) RETURNING {PROJECT_COLUMNS}");
        Ok(sqlx::query_as::<_, Project>(&sql)
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(description)
            .fetch_one(&self.pool)
            .await?)
    }

    // -------------------------------------------------------------------------
    // features
    // -------------------------------------------------------------------------

    async fn list_features(&self, project_id: Uuid) -> Result<Vec<Feature>, StoreError> {
        let sql = format!("SELECT {FEATURE_COLUMNS} FROM features WHERE project_id = $1 ORDER BY created_at DESC");
        Ok(sqlx::query_as::<_, Feature>(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_feature(&self, project_id: Uuid, name: &str, description: &str) -> Result<Feature, StoreError> {
        let sql = format!(
            "INSERT INTO features (id, project_id, name, description) VALUES ($1, $2, $3, $4) RETURNING {FEATURE_COLUMNS}"
        );
        sqlx::query_as::<_, Feature>(&sql)
            .bind(Uuid::new_v4())
            .bind(project_id)
            .bind(name)
            .bind(description)
            .fetch_one(&self.pool)
            .await
            .map_err(project_fk(project_id))
    }

    async fn update_feature(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Feature>, StoreError> {
        let sql = format!(
            "UPDATE features
             SET name = COALESCE($2, name), description = COALESCE($3, description)
             WHERE id = $1
             RETURNING {FEATURE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Feature>(&sql)
            .bind(id)
            .bind(name)
            .bind(description)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn stamp_feature_feedback(&self, target: &FeatureRef, stamp: &FeedbackStamp) -> Result<u64, StoreError> {
        let query = match target {
            FeatureRef::Id(id) => sqlx::query(
                "UPDATE features
                 SET last_feedback_score = $1, last_feedback_summary = $2, last_reviewed_at = $3
                 WHERE id = $4",
            )
            .bind(stamp.score)
            .bind(&stamp.summary)
            .bind(stamp.reviewed_at)
            .bind(*id),
            FeatureRef::Name { project_id, name } => sqlx::query(
                "UPDATE features
                 SET last_feedback_score = $1, last_feedback_summary = $2, last_reviewed_at = $3
                 WHERE project_id = $4 AND name = $5",
            )
            .bind(stamp.score)
            .bind(&stamp.summary)
            .bind(stamp.reviewed_at)
            .bind(*project_id)
            .bind(name),
        };
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    // -------------------------------------------------------------------------
    // suites
    // -------------------------------------------------------------------------

    async fn list_suites(&self, project_id: Option<Uuid>) -> Result<Vec<TestSuite>, StoreError> {
        let sql = format!(
            "SELECT {SUITE_COLUMNS} FROM test_suites
             WHERE $1::uuid IS NULL OR project_id = $1
             ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, TestSuite>(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_suite(&self, id: Uuid) -> Result<Option<TestSuite>, StoreError> {
        let sql = format!("SELECT {SUITE_COLUMNS} FROM test_suites WHERE id = $1");
        Ok(sqlx::query_as::<_, TestSuite>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_suite(&self, suite: NewSuite) -> Result<TestSuite, StoreError> {
        let sql = format!(
            "INSERT INTO test_suites
                (id, project_id, feature_id, name, feature_name, description, test_cases,
                 last_feedback_score, last_feedback_summary, last_reviewed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {SUITE_COLUMNS}"
        );
        sqlx::query_as::<_, TestSuite>(&sql)
            .bind(Uuid::new_v4())
            .bind(suite.project_id)
            .bind(suite.feature_id)
            .bind(&suite.name)
            .bind(&suite.feature_name)
            .bind(&suite.description)
            .bind(Json(&suite.test_cases))
            .bind(suite.feedback.score)
            .bind(&suite.feedback.summary)
            .bind(suite.feedback.reviewed_at)
            .fetch_one(&self.pool)
            .await
            .map_err(project_fk(suite.project_id))
    }

    async fn replace_suite(&self, id: Uuid, replacement: SuiteReplacement) -> Result<Option<TestSuite>, StoreError> {
        let sql = format!(
            "UPDATE test_suites
             SET name = $2,
                 feature_name = $3,
                 description = $4,
                 test_cases = $5,
                 created_at = now(),
                 last_feedback_score = COALESCE($6, last_feedback_score),
                 last_feedback_summary = COALESCE($7, last_feedback_summary),
                 last_reviewed_at = COALESCE($8, last_reviewed_at)
             WHERE id = $1
             RETURNING {SUITE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, TestSuite>(&sql)
            .bind(id)
            .bind(&replacement.name)
            .bind(&replacement.feature_name)
            .bind(&replacement.description)
            .bind(Json(&replacement.test_cases))
            .bind(replacement.feedback.score)
            .bind(&replacement.feedback.summary)
            .bind(replacement.feedback.reviewed_at)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn append_cases(&self, id: Uuid, cases: &[TestCase]) -> Result<Option<TestSuite>, StoreError> {
        let sql = format!(
            "UPDATE test_suites SET test_cases = test_cases || $2::jsonb WHERE id = $1 RETURNING {SUITE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, TestSuite>(&sql)
            .bind(id)
            .bind(Json(cases))
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn stamp_suite_feedback(&self, id: Uuid, stamp: &FeedbackStamp) -> Result<Option<TestSuite>, StoreError> {
        let sql = format!(
            "UPDATE test_suites
             SET last_feedback_score = $2, last_feedback_summary = $3, last_reviewed_at = $4
             WHERE id = $1
             RETURNING {SUITE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, TestSuite>(&sql)
            .bind(id)
            .bind(stamp.score)
            .bind(&stamp.summary)
            .bind(stamp.reviewed_at)
            .fetch_optional(&self.pool)
            .await?)
    }
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;
