use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::extract::SkillExtractor;
use crate::mastery::{MasteryUpdater, PracticeResult};
use crate::models::{AnalysisBatch, AssessmentAggregate, AssessmentHistoryEntry, ProgressSnapshot};
use crate::planner::{ChangeDigest, LearningPathPlanner, PracticeStep};
use crate::practice::{self, PracticePlan};

/// Everything one assessment produces for the persistence and presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentOutcome {
    #[serde(skip)]
    pub aggregate: AssessmentAggregate,
    pub entry: AssessmentHistoryEntry,
    pub snapshot: ProgressSnapshot,
    pub digest: ChangeDigest,
    pub next_steps: Vec<PracticeStep>,
}

/// Stateless scoring core: every call takes the current aggregate and returns the next one.
#[derive(Debug, Clone)]
pub struct AssessmentEngine {
    config: EngineConfig,
    extractor: SkillExtractor,
    updater: MasteryUpdater,
}

impl Default for AssessmentEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl AssessmentEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            extractor: SkillExtractor::new(&config),
            updater: MasteryUpdater::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn extractor(&self) -> &SkillExtractor {
        &self.extractor
    }

    pub fn planner(&self) -> &LearningPathPlanner {
        self.updater.planner()
    }

    pub fn new_aggregate(&self, student_id: impl Into<String>) -> AssessmentAggregate {
        self.updater.fresh_aggregate(student_id)
    }

    /// Folds one essay's batch into the student's aggregate, creating it when absent.
    pub fn assess(
        &self,
        current: Option<AssessmentAggregate>,
        student_id: &str,
        essay_ref: &str,
        batch: &AnalysisBatch,
        now: DateTime<Utc>,
    ) -> Result<AssessmentOutcome> {
        let aggregate = current.unwrap_or_else(|| self.new_aggregate(student_id));
        let (aggregate, entry) = self.updater.apply(aggregate, essay_ref, batch, now)?;
        Ok(self.outcome(aggregate, entry))
    }

    pub fn assess_json(
        &self,
        current: Option<AssessmentAggregate>,
        student_id: &str,
        essay_ref: &str,
        payload: &Value,
        now: DateTime<Utc>,
    ) -> Result<AssessmentOutcome> {
        let batch = self.extractor.extract_json(payload);
        self.assess(current, student_id, essay_ref, &batch, now)
    }

    pub fn submit_practice(
        &self,
        current: AssessmentAggregate,
        test_ref: &str,
        results: &[PracticeResult],
        now: DateTime<Utc>,
    ) -> Result<AssessmentOutcome> {
        let (aggregate, entry) = self.updater.apply_practice(current, test_ref, results, now)?;
        Ok(self.outcome(aggregate, entry))
    }

    pub fn practice_plan(&self, aggregate: &AssessmentAggregate) -> PracticePlan {
        practice::build_plan(aggregate, self.planner(), self.config.minutes_per_exercise)
    }

    fn outcome(
        &self,
        aggregate: AssessmentAggregate,
        entry: AssessmentHistoryEntry,
    ) -> AssessmentOutcome {
        AssessmentOutcome {
            snapshot: aggregate.snapshot(),
            digest: self.planner().digest(&entry),
            next_steps: self.planner().next_steps(&aggregate),
            aggregate,
            entry,
        }
    }
}
