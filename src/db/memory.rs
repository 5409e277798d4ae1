//! In-memory [`Store`] for service and handler tests.
//!
//! Mirrors the Postgres semantics the services rely on: newest-first
//! listing, project existence on insert, COALESCE-style feedback carry, and
//! order-preserving append. Also counts writes so tests can assert that a
//! rejected or cached request touched nothing.

use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicUsize, Ordering};

use time::OffsetDateTime;
use uuid::Uuid;

use super::{FeatureRef, NewSuite, Store, StoreError, SuiteReplacement};
use crate::models::{FeedbackStamp, Feature, Project, TestCase, TestSuite};

#[derive(Default)]
struct Tables {
    projects: Vec<Project>,
    features: Vec<Feature>,
    suites: Vec<TestSuite>,
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    tables: Mutex<Tables>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    /// Seed a project directly, bypassing the write counter.
    pub(crate) fn seed_project(&self, name: &str) -> Project {
        let project = Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables().projects.push(project.clone());
        project
    }

    /// Seed a suite directly, bypassing the write counter.
    pub(crate) fn seed_suite(&self, project_id: Uuid, feature_name: &str, cases: Vec<TestCase>) -> TestSuite {
        let suite = TestSuite {
            id: Uuid::new_v4(),
            project_id,
            feature_id: None,
            name: format!("{feature_name} suite"),
            feature_name: feature_name.to_string(),
            description: String::new(),
            created_at: OffsetDateTime::now_utc(),
            test_cases: cases,
            last_feedback_score: None,
            last_feedback_summary: None,
            last_reviewed_at: None,
        };
        self.tables().suites.push(suite.clone());
        suite
    }
}

fn newest_first<T>(rows: impl Iterator<Item = T>, created_at: impl Fn(&T) -> OffsetDateTime) -> Vec<T> {
    let mut out: Vec<T> = rows.collect();
    out.reverse();
    out.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    out
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let tables = self.tables();
        Ok(newest_first(tables.projects.iter().cloned(), |p| p.created_at))
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(self.tables().projects.iter().find(|p| p.id == id).cloned())
    }

    async fn create_project(&self, name: &str, description: &str) -> Result<Project, StoreError> {
        let project = Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables().projects.push(project.clone());
        self.wrote();
        Ok(project)
    }

    async fn list_features(&self, project_id: Uuid) -> Result<Vec<Feature>, StoreError> {
        let tables = self.tables();
        Ok(newest_first(
            tables.features.iter().filter(|f| f.project_id == project_id).cloned(),
            |f| f.created_at,
        ))
    }

    async fn create_feature(&self, project_id: Uuid, name: &str, description: &str) -> Result<Feature, StoreError> {
        let mut tables = self.tables();
        if !tables.projects.iter().any(|p| p.id == project_id) {
            return Err(StoreError::ProjectMissing(project_id));
        }
        let feature = Feature {
            id: Uuid::new_v4(),
            project_id,
            name: name.to_string(),
            description: description.to_string(),
            created_at: OffsetDateTime::now_utc(),
            last_feedback_score: None,
            last_feedback_summary: None,
            last_reviewed_at: None,
        };
        tables.features.push(feature.clone());
        drop(tables);
        self.wrote();
        Ok(feature)
    }

    async fn update_feature(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Feature>, StoreError> {
        let mut tables = self.tables();
        let Some(feature) = tables.features.iter_mut().find(|f| f.id == id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            feature.name = name.to_string();
        }
        if let Some(description) = description {
            feature.description = description.to_string();
        }
        let updated = feature.clone();
        drop(tables);
        self.wrote();
        Ok(Some(updated))
    }

    async fn stamp_feature_feedback(&self, target: &FeatureRef, stamp: &FeedbackStamp) -> Result<u64, StoreError> {
        let mut tables = self.tables();
        let mut updated = 0;
        for feature in &mut tables.features {
            let matches = match target {
                FeatureRef::Id(id) => feature.id == *id,
                FeatureRef::Name { project_id, name } => feature.project_id == *project_id && feature.name == *name,
            };
            if matches {
                feature.last_feedback_score = Some(stamp.score);
                feature.last_feedback_summary = Some(stamp.summary.clone());
                feature.last_reviewed_at = Some(stamp.reviewed_at);
                updated += 1;
            }
        }
        drop(tables);
        if updated > 0 {
            self.wrote();
        }
        Ok(updated)
    }

    async fn list_suites(&self, project_id: Option<Uuid>) -> Result<Vec<TestSuite>, StoreError> {
        let tables = self.tables();
        Ok(newest_first(
            tables
                .suites
                .iter()
                .filter(|s| project_id.is_none_or(|p| s.project_id == p))
                .cloned(),
            |s| s.created_at,
        ))
    }

    async fn get_suite(&self, id: Uuid) -> Result<Option<TestSuite>, StoreError> {
        Ok(self.tables().suites.iter().find(|s| s.id == id).cloned())
    }

    async fn create_suite(&self, suite: NewSuite) -> Result<TestSuite, StoreError> {
        let mut tables = self.tables();
        if !tables.projects.iter().any(|p| p.id == suite.project_id) {
            return Err(StoreError::ProjectMissing(suite.project_id));
        }
        let created = TestSuite {
            id: Uuid::new_v4(),
            project_id: suite.project_id,
            feature_id: suite.feature_id,
            name: suite.name,
            feature_name: suite.feature_name,
            description: suite.description,
            created_at: OffsetDateTime::now_utc(),
            test_cases: suite.test_cases,
            last_feedback_score: suite.feedback.score,
            last_feedback_summary: suite.feedback.summary,
            last_reviewed_at: suite.feedback.reviewed_at,
        };
        tables.suites.push(created.clone());
        drop(tables);
        self.wrote();
        Ok(created)
    }

    async fn replace_suite(&self, id: Uuid, replacement: SuiteReplacement) -> Result<Option<TestSuite>, StoreError> {
        let mut tables = self.tables();
        let Some(suite) = tables.suites.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        suite.name = replacement.name;
        suite.feature_name = replacement.feature_name;
        suite.description = replacement.description;
        suite.test_cases = replacement.test_cases;
        suite.created_at = OffsetDateTime::now_utc();
        if let Some(score) = replacement.feedback.score {
            suite.last_feedback_score = Some(score);
        }
        if let Some(summary) = replacement.feedback.summary {
            suite.last_feedback_summary = Some(summary);
        }
        if let Some(at) = replacement.feedback.reviewed_at {
            suite.last_reviewed_at = Some(at);
        }
        let updated = suite.clone();
        drop(tables);
        self.wrote();
        Ok(Some(updated))
    }

    async fn append_cases(&self, id: Uuid, cases: &[TestCase]) -> Result<Option<TestSuite>, StoreError> {
        let mut tables = self.tables();
        let Some(suite) = tables.suites.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        suite.test_cases.extend_from_slice(cases);
        let updated = suite.clone();
        drop(tables);
        self.wrote();
        Ok(Some(updated))
    }

    async fn stamp_suite_feedback(&self, id: Uuid, stamp: &FeedbackStamp) -> Result<Option<TestSuite>, StoreError> {
        let mut tables = self.tables();
        let Some(suite) = tables.suites.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        suite.last_feedback_score = Some(stamp.score);
        suite.last_feedback_summary = Some(stamp.summary.clone());
        suite.last_reviewed_at = Some(stamp.reviewed_at);
        let updated = suite.clone();
        drop(tables);
        self.wrote();
        Ok(Some(updated))
    }
}
