//! Folding new skill scores into a student's persisted mastery.
//!
//! Updates are read-modify-write over one aggregate and are not commutative:
//! callers must apply them one at a time per student, in submission order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{MasteryError, Result};
use crate::models::{
    AnalysisBatch, AssessmentAggregate, AssessmentHistoryEntry, AssessmentKind, MasteryRecord,
    SkillChange, SkillName,
};
use crate::planner::LearningPathPlanner;

/// One scored exercise from a submitted practice test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PracticeResult {
    pub skill: SkillName,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct MasteryUpdater {
    weight: f64,
    planner: LearningPathPlanner,
}

impl Default for MasteryUpdater {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl MasteryUpdater {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            weight: config.smoothing_weight,
            planner: LearningPathPlanner::new(config),
        }
    }

    pub fn planner(&self) -> &LearningPathPlanner {
        &self.planner
    }

    /// A new aggregate with every skill at level 0.
    pub fn fresh_aggregate(&self, student_id: impl Into<String>) -> AssessmentAggregate {
        let skills: Vec<MasteryRecord> = SkillName::ALL
            .into_iter()
            .map(|skill| MasteryRecord { skill, level: 0.0 })
            .collect();
        AssessmentAggregate {
            student_id: student_id.into(),
            learning_path: self.planner.plan(&skills),
            skills,
            history: Vec::new(),
        }
    }

    /// `L·(1−w) + S·w` over clamped inputs. A NaN score leaves the level as it was.
    pub fn blend(&self, level: f64, score: f64) -> f64 {
        let level = clamp_level(level);
        if score.is_nan() {
            return level;
        }
        let score = clamp_level(score);
        (level * (1.0 - self.weight) + score * self.weight).clamp(0.0, 100.0)
    }

    /// Applies an essay's scores, appends the history entry and replans.
    pub fn apply(
        &self,
        mut aggregate: AssessmentAggregate,
        essay_ref: impl Into<String>,
        batch: &AnalysisBatch,
        now: DateTime<Utc>,
    ) -> Result<(AssessmentAggregate, AssessmentHistoryEntry)> {
        aggregate.validate()?;

        let mut per_skill = Vec::with_capacity(batch.scores.len());
        for score in &batch.scores {
            if score.value.is_nan() {
                warn!(target: "skill_mastery", skill = %score.skill, "Ignoring NaN skill score");
                continue;
            }
            let record = aggregate
                .record_mut(score.skill)
                .ok_or(MasteryError::MissingSkill(score.skill))?;
            let previous_level = record.level;
            let new_level = round_level(self.blend(previous_level, score.value));
            record.level = new_level;
            debug!(
                target: "skill_mastery",
                skill = %score.skill,
                previous_level,
                new_level,
                observed = score.value,
                measured = score.is_measured(),
                "Updated skill mastery"
            );
            per_skill.push(SkillChange {
                skill: score.skill,
                previous_level,
                new_level,
                improvement: new_level - previous_level,
            });
        }

        let entry = AssessmentHistoryEntry {
            id: Uuid::new_v4(),
            kind: AssessmentKind::Essay,
            essay_ref: essay_ref.into(),
            assessed_at: now,
            per_skill,
            strengths: batch.feedback.strengths.clone(),
            weaknesses: batch.feedback.weaknesses.clone(),
            recommendations: batch.feedback.recommendations.clone(),
        };
        Ok(self.commit(aggregate, entry))
    }

    /// Replaces each tested skill's level with the mean of its practice scores.
    pub fn apply_practice(
        &self,
        mut aggregate: AssessmentAggregate,
        test_ref: impl Into<String>,
        results: &[PracticeResult],
        now: DateTime<Utc>,
    ) -> Result<(AssessmentAggregate, AssessmentHistoryEntry)> {
        aggregate.validate()?;

        let mut per_skill = Vec::new();
        for skill in SkillName::ALL {
            let scores: Vec<f64> = results
                .iter()
                .filter(|result| result.skill == skill && !result.score.is_nan())
                .map(|result| clamp_level(result.score))
                .collect();
            if scores.is_empty() {
                continue;
            }
            let average = scores.iter().sum::<f64>() / scores.len() as f64;
            let record = aggregate
                .record_mut(skill)
                .ok_or(MasteryError::MissingSkill(skill))?;
            let previous_level = record.level;
            let new_level = round_level(average);
            record.level = new_level;
            per_skill.push(SkillChange {
                skill,
                previous_level,
                new_level,
                improvement: new_level - previous_level,
            });
        }

        let entry = AssessmentHistoryEntry {
            id: Uuid::new_v4(),
            kind: AssessmentKind::PracticeTest,
            essay_ref: test_ref.into(),
            assessed_at: now,
            per_skill,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            recommendations: Vec::new(),
        };
        Ok(self.commit(aggregate, entry))
    }

    fn commit(
        &self,
        mut aggregate: AssessmentAggregate,
        entry: AssessmentHistoryEntry,
    ) -> (AssessmentAggregate, AssessmentHistoryEntry) {
        aggregate.learning_path = self.planner.plan(&aggregate.skills);
        aggregate.history.push(entry.clone());
        info!(
            target: "skill_mastery",
            student_id = %aggregate.student_id,
            essay_ref = %entry.essay_ref,
            skills_updated = entry.per_skill.len(),
            overall_progress = aggregate.overall_progress(),
            tier = %aggregate.learning_path.tier,
            "Recorded assessment"
        );
        (aggregate, entry)
    }
}

fn clamp_level(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn round_level(value: f64) -> f64 {
    clamp_level(value).round()
}
