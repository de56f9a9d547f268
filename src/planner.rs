use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::models::{
    mean_level, AssessmentAggregate, AssessmentHistoryEntry, LearningPath, MasteryRecord,
    Milestone, RecommendedSkill, SkillName, Tier,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    FundamentalPractice,
    IntermediatePractice,
    AdvancedPractice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeStep {
    pub skill: SkillName,
    pub kind: StepKind,
    pub description: String,
    pub priority: StepPriority,
}

/// Skills from one assessment that are still weak, and those that jumped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeDigest {
    pub critical_areas: Vec<SkillName>,
    pub improvements: Vec<SkillName>,
}

#[derive(Debug, Clone)]
pub struct LearningPathPlanner {
    recommendation_count: usize,
    milestone_gain: f64,
    milestone_step: f64,
    intermediate_threshold: f64,
    advanced_threshold: f64,
    critical_threshold: f64,
    improvement_threshold: f64,
}

impl Default for LearningPathPlanner {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl LearningPathPlanner {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            recommendation_count: config.recommendation_count,
            milestone_gain: config.milestone_gain,
            milestone_step: config.milestone_step,
            intermediate_threshold: config.intermediate_threshold,
            advanced_threshold: config.advanced_threshold,
            critical_threshold: config.critical_threshold,
            improvement_threshold: config.improvement_threshold,
        }
    }

    /// Skills ordered weakest first; equal levels fall back to enumeration order.
    pub fn rank(&self, skills: &[MasteryRecord]) -> Vec<MasteryRecord> {
        let mut ranked = skills.to_vec();
        ranked.sort_by(|a, b| {
            a.level
                .partial_cmp(&b.level)
                .unwrap_or(Ordering::Equal)
                .then(a.skill.position().cmp(&b.skill.position()))
        });
        ranked
    }

    pub fn plan(&self, skills: &[MasteryRecord]) -> LearningPath {
        let ranked = self.rank(skills);

        let recommended_skills = ranked
            .iter()
            .take(self.recommendation_count)
            .map(|record| RecommendedSkill {
                skill: record.skill,
                priority: priority(record.level),
            })
            .collect();

        let next_milestone = ranked.first().map(|weakest| Milestone {
            skill: weakest.skill,
            target_level: self.milestone_target(weakest.level),
        });

        LearningPath {
            tier: self.tier(mean_level(skills)),
            recommended_skills,
            next_milestone,
        }
    }

    /// `level + gain`, rounded up to the next step, capped at 100.
    pub fn milestone_target(&self, level: f64) -> f64 {
        let raised = ((level + self.milestone_gain) / self.milestone_step).ceil() * self.milestone_step;
        raised.min(100.0)
    }

    pub fn tier(&self, progress: f64) -> Tier {
        if progress >= self.advanced_threshold {
            Tier::Advanced
        } else if progress >= self.intermediate_threshold {
            Tier::Intermediate
        } else {
            Tier::Beginner
        }
    }

    pub fn digest(&self, entry: &AssessmentHistoryEntry) -> ChangeDigest {
        let mut digest = ChangeDigest::default();
        for change in &entry.per_skill {
            if change.new_level < self.critical_threshold {
                digest.critical_areas.push(change.skill);
            }
            if change.improvement > self.improvement_threshold {
                digest.improvements.push(change.skill);
            }
        }
        digest
    }

    /// One targeted practice step per skill currently below the critical threshold.
    pub fn next_steps(&self, aggregate: &AssessmentAggregate) -> Vec<PracticeStep> {
        aggregate
            .skills
            .iter()
            .filter(|record| record.level < self.critical_threshold)
            .map(|record| {
                let label = record.skill.label().to_lowercase();
                let (kind, description, priority) = match self.tier(record.level) {
                    Tier::Beginner => (
                        StepKind::FundamentalPractice,
                        format!("Practice basic {label} exercises"),
                        StepPriority::High,
                    ),
                    Tier::Intermediate => (
                        StepKind::IntermediatePractice,
                        format!("Strengthen {label} through targeted exercises"),
                        StepPriority::Medium,
                    ),
                    Tier::Advanced => (
                        StepKind::AdvancedPractice,
                        format!("Refine advanced aspects of {label}"),
                        StepPriority::Low,
                    ),
                };
                PracticeStep {
                    skill: record.skill,
                    kind,
                    description,
                    priority,
                }
            })
            .collect()
    }
}

pub fn priority(level: f64) -> f64 {
    (1.0 - level / 100.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssessmentKind, SkillChange};
    use chrono::Utc;
    use uuid::Uuid;

    fn records(levels: &[f64]) -> Vec<MasteryRecord> {
        SkillName::ALL
            .iter()
            .zip(levels)
            .map(|(skill, level)| MasteryRecord {
                skill: *skill,
                level: *level,
            })
            .collect()
    }

    #[test]
    fn tiers_follow_inclusive_lower_bounds() {
        let planner = LearningPathPlanner::default();
        assert_eq!(planner.tier(39.9), Tier::Beginner);
        assert_eq!(planner.tier(40.0), Tier::Intermediate);
        assert_eq!(planner.tier(69.9), Tier::Intermediate);
        assert_eq!(planner.tier(70.0), Tier::Advanced);
        assert_eq!(planner.tier(0.0), Tier::Beginner);
        assert_eq!(planner.tier(100.0), Tier::Advanced);
    }

    #[test]
    fn milestone_rounds_up_to_next_ten_and_caps() {
        let planner = LearningPathPlanner::default();
        assert_eq!(planner.milestone_target(42.0), 70.0);
        assert_eq!(planner.milestone_target(95.0), 100.0);
        assert_eq!(planner.milestone_target(0.0), 20.0);
        assert_eq!(planner.milestone_target(50.0), 70.0);
    }

    #[test]
    fn milestone_targets_are_multiples_of_ten_above_level() {
        let planner = LearningPathPlanner::default();
        for level in 0..=99 {
            let level = level as f64;
            let target = planner.milestone_target(level);
            assert_eq!(target % 10.0, 0.0, "level {level}");
            assert!(target >= level + 1.0, "level {level}");
            assert!(target <= 100.0, "level {level}");
        }
        assert_eq!(planner.milestone_target(100.0), 100.0);
    }

    #[test]
    fn recommends_three_weakest_with_stable_ties() {
        let planner = LearningPathPlanner::default();
        let path = planner.plan(&records(&[50.0, 10.0, 30.0, 10.0, 90.0, 10.0, 70.0, 80.0]));
        let skills: Vec<SkillName> = path.recommended_skills.iter().map(|r| r.skill).collect();
        assert_eq!(
            skills,
            vec![
                SkillName::EvidenceEvaluation,
                SkillName::CounterArgumentHandling,
                SkillName::RhetoricalAwareness,
            ]
        );
        assert!((path.recommended_skills[0].priority - 0.9).abs() < 1e-9);
        let milestone = path.next_milestone.unwrap();
        assert_eq!(milestone.skill, SkillName::EvidenceEvaluation);
        assert_eq!(milestone.target_level, 30.0);
    }

    #[test]
    fn all_tied_picks_first_in_enumeration_order() {
        let planner = LearningPathPlanner::default();
        let path = planner.plan(&records(&[55.0; 8]));
        assert_eq!(path.next_milestone.unwrap().skill, SkillName::ThesisConstruction);
        assert_eq!(path.recommended_skills.len(), 3);
        assert_eq!(path.tier, Tier::Intermediate);
    }

    #[test]
    fn ties_break_by_enumeration_order_regardless_of_input_order() {
        let planner = LearningPathPlanner::default();
        let mut skills = records(&[80.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        skills.reverse();
        let path = planner.plan(&skills);
        let recommended: Vec<SkillName> = path.recommended_skills.iter().map(|r| r.skill).collect();
        assert_eq!(
            recommended,
            vec![
                SkillName::EvidenceEvaluation,
                SkillName::LogicalReasoning,
                SkillName::CounterArgumentHandling,
            ]
        );
        assert_eq!(path.next_milestone.unwrap().skill, SkillName::EvidenceEvaluation);
    }

    #[test]
    fn fewer_skills_than_recommendation_count() {
        let planner = LearningPathPlanner::default();
        let path = planner.plan(&records(&[100.0, 0.0]));
        assert_eq!(path.recommended_skills.len(), 2);
        assert_eq!(path.recommended_skills[0].priority, 1.0);
        assert_eq!(path.recommended_skills[1].priority, 0.0);

        let empty = planner.plan(&[]);
        assert!(empty.recommended_skills.is_empty());
        assert!(empty.next_milestone.is_none());
        assert_eq!(empty.tier, Tier::Beginner);
    }

    #[test]
    fn digest_flags_critical_and_improved_skills() {
        let planner = LearningPathPlanner::default();
        let change = |skill, previous_level: f64, new_level: f64| SkillChange {
            skill,
            previous_level,
            new_level,
            improvement: new_level - previous_level,
        };
        let entry = AssessmentHistoryEntry {
            id: Uuid::new_v4(),
            kind: AssessmentKind::Essay,
            essay_ref: "essay-1".to_string(),
            assessed_at: Utc::now(),
            per_skill: vec![
                change(SkillName::ThesisConstruction, 10.0, 40.0),
                change(SkillName::LogicalReasoning, 70.0, 72.0),
                change(SkillName::ArgumentStructure, 58.0, 59.0),
            ],
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            recommendations: Vec::new(),
        };
        let digest = planner.digest(&entry);
        assert_eq!(
            digest.critical_areas,
            vec![SkillName::ThesisConstruction, SkillName::ArgumentStructure]
        );
        assert_eq!(digest.improvements, vec![SkillName::ThesisConstruction]);
    }

    #[test]
    fn next_steps_band_by_level() {
        let planner = LearningPathPlanner::default();
        let skills = records(&[20.0, 45.0, 80.0, 60.0, 59.0, 100.0, 39.0, 75.0]);
        let aggregate = AssessmentAggregate {
            student_id: "s-1".to_string(),
            learning_path: planner.plan(&skills),
            skills,
            history: Vec::new(),
        };
        let steps = planner.next_steps(&aggregate);
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0].skill, SkillName::ThesisConstruction);
        assert_eq!(steps[0].kind, StepKind::FundamentalPractice);
        assert_eq!(steps[0].priority, StepPriority::High);
        assert_eq!(steps[1].kind, StepKind::IntermediatePractice);
        assert_eq!(steps[1].description, "Strengthen evidence evaluation through targeted exercises");
        assert_eq!(steps[3].skill, SkillName::SourceIntegration);
    }

    #[test]
    fn raised_critical_threshold_reaches_advanced_steps() {
        let planner = LearningPathPlanner::new(&EngineConfig {
            critical_threshold: 90.0,
            ..EngineConfig::default()
        });
        let skills = records(&[80.0, 95.0, 95.0, 95.0, 95.0, 95.0, 95.0, 95.0]);
        let aggregate = AssessmentAggregate {
            student_id: "s-2".to_string(),
            learning_path: planner.plan(&skills),
            skills,
            history: Vec::new(),
        };
        let steps = planner.next_steps(&aggregate);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].skill, SkillName::ThesisConstruction);
        assert_eq!(steps[0].kind, StepKind::AdvancedPractice);
        assert_eq!(steps[0].priority, StepPriority::Low);
        assert_eq!(steps[0].description, "Refine advanced aspects of thesis construction");
    }
}
