//! Serialized read-modify-write of student aggregates.
//!
//! Mastery updates for one student must not interleave, so every write path
//! takes that student's lock before loading and holds it until the save lands.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::engine::{AssessmentEngine, AssessmentOutcome};
use crate::error::{MasteryError, Result};
use crate::mastery::PracticeResult;
use crate::models::{AnalysisBatch, AssessmentAggregate};
use crate::practice::PracticePlan;
use crate::store::{validate_student_id, AssessmentStore};

pub struct AssessmentService<S> {
    engine: AssessmentEngine,
    store: S,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: AssessmentStore> AssessmentService<S> {
    pub fn new(engine: AssessmentEngine, store: S) -> Self {
        Self {
            engine,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &AssessmentEngine {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs `work` while holding the student's lock. The lock entry is dropped
    /// from the map once no other caller holds or waits on it.
    async fn with_student_lock<T, F, Fut>(&self, student_id: &str, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(student_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let result = {
            let _guard = lock.lock().await;
            work().await
        };
        let mut locks = self.locks.lock().await;
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(student_id);
        }
        result
    }

    /// Creates an empty aggregate if the student has none yet.
    #[instrument(level = "info", skip(self))]
    pub async fn ensure_student(&self, student_id: &str) -> Result<AssessmentAggregate> {
        validate_student_id(student_id)?;
        self.with_student_lock(student_id, move || async move {
            if let Some(existing) = self.store.load(student_id).await? {
                return Ok(existing);
            }
            let aggregate = self.engine.new_aggregate(student_id);
            self.store.save(&aggregate).await?;
            info!(target: "skill_mastery", %student_id, "Created assessment");
            Ok(aggregate)
        })
        .await
    }

    pub async fn fetch(&self, student_id: &str) -> Result<AssessmentAggregate> {
        validate_student_id(student_id)?;
        self.store
            .load(student_id)
            .await?
            .ok_or_else(|| MasteryError::NotFound(student_id.to_string()))
    }

    #[instrument(level = "info", skip(self, batch), fields(scores = batch.scores.len()))]
    pub async fn record_batch(
        &self,
        student_id: &str,
        essay_ref: &str,
        batch: &AnalysisBatch,
    ) -> Result<AssessmentOutcome> {
        validate_student_id(student_id)?;
        self.with_student_lock(student_id, move || async move {
            let current = self.store.load(student_id).await?;
            let outcome = self
                .engine
                .assess(current, student_id, essay_ref, batch, Utc::now())?;
            self.store.save(&outcome.aggregate).await?;
            Ok(outcome)
        })
        .await
    }

    pub async fn record_json(
        &self,
        student_id: &str,
        essay_ref: &str,
        payload: &Value,
    ) -> Result<AssessmentOutcome> {
        let batch = self.engine.extractor().extract_json(payload);
        self.record_batch(student_id, essay_ref, &batch).await
    }

    #[instrument(level = "info", skip(self, results), fields(results = results.len()))]
    pub async fn submit_practice(
        &self,
        student_id: &str,
        test_ref: &str,
        results: &[PracticeResult],
    ) -> Result<AssessmentOutcome> {
        validate_student_id(student_id)?;
        self.with_student_lock(student_id, move || async move {
            let current = self
                .store
                .load(student_id)
                .await?
                .ok_or_else(|| MasteryError::NotFound(student_id.to_string()))?;
            let outcome = self
                .engine
                .submit_practice(current, test_ref, results, Utc::now())?;
            self.store.save(&outcome.aggregate).await?;
            Ok(outcome)
        })
        .await
    }

    pub async fn practice_plan(&self, student_id: &str) -> Result<PracticePlan> {
        let aggregate = self.fetch(student_id).await?;
        Ok(self.engine.practice_plan(&aggregate))
    }
}
