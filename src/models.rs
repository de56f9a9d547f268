use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MasteryError;

/// Argumentative-writing skills tracked per student, in enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillName {
    ThesisConstruction,
    EvidenceEvaluation,
    LogicalReasoning,
    CounterArgumentHandling,
    ConclusionSynthesis,
    RhetoricalAwareness,
    SourceIntegration,
    ArgumentStructure,
}

impl SkillName {
    pub const ALL: [SkillName; 8] = [
        SkillName::ThesisConstruction,
        SkillName::EvidenceEvaluation,
        SkillName::LogicalReasoning,
        SkillName::CounterArgumentHandling,
        SkillName::ConclusionSynthesis,
        SkillName::RhetoricalAwareness,
        SkillName::SourceIntegration,
        SkillName::ArgumentStructure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SkillName::ThesisConstruction => "thesis_construction",
            SkillName::EvidenceEvaluation => "evidence_evaluation",
            SkillName::LogicalReasoning => "logical_reasoning",
            SkillName::CounterArgumentHandling => "counter_argument_handling",
            SkillName::ConclusionSynthesis => "conclusion_synthesis",
            SkillName::RhetoricalAwareness => "rhetorical_awareness",
            SkillName::SourceIntegration => "source_integration",
            SkillName::ArgumentStructure => "argument_structure",
        }
    }

    /// Human-readable label used in reports and practice steps.
    pub fn label(self) -> &'static str {
        match self {
            SkillName::ThesisConstruction => "Thesis Construction",
            SkillName::EvidenceEvaluation => "Evidence Evaluation",
            SkillName::LogicalReasoning => "Logical Reasoning",
            SkillName::CounterArgumentHandling => "Counter-Argument Handling",
            SkillName::ConclusionSynthesis => "Conclusion Synthesis",
            SkillName::RhetoricalAwareness => "Rhetorical Awareness",
            SkillName::SourceIntegration => "Source Integration",
            SkillName::ArgumentStructure => "Argument Structure",
        }
    }

    /// Named aspects the analysis text is searched for when scoring this skill.
    pub fn aspects(self) -> &'static [&'static str] {
        match self {
            SkillName::ThesisConstruction => &["clarity", "specificity", "arguability", "relevance"],
            SkillName::EvidenceEvaluation => &["relevance", "credibility", "sufficiency", "integration"],
            SkillName::LogicalReasoning => &["validity", "soundness", "fallacy-avoidance"],
            SkillName::CounterArgumentHandling => &["identification", "response", "integration"],
            SkillName::ConclusionSynthesis => &["synthesis", "closure", "implications"],
            SkillName::RhetoricalAwareness => &["ethos", "pathos", "logos"],
            SkillName::SourceIntegration => &["formatting", "synthesis", "attribution"],
            SkillName::ArgumentStructure => &["coherence", "flow", "transitions"],
        }
    }

    pub fn position(self) -> usize {
        SkillName::ALL
            .iter()
            .position(|skill| *skill == self)
            .unwrap_or(SkillName::ALL.len())
    }
}

impl fmt::Display for SkillName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillName {
    type Err = MasteryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        SkillName::ALL
            .into_iter()
            .find(|skill| skill.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| MasteryError::UnknownSkill(needle.to_string()))
    }
}

/// Whether an aspect score came from the analysis or from the neutral default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOrigin {
    Measured,
    Defaulted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectScore {
    pub aspect: String,
    pub value: f64,
    pub origin: ScoreOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillScore {
    pub skill: SkillName,
    pub value: f64,
    pub aspects: Vec<AspectScore>,
}

impl SkillScore {
    pub fn is_measured(&self) -> bool {
        self.aspects
            .iter()
            .any(|aspect| aspect.origin == ScoreOrigin::Measured)
    }

    pub fn defaulted_aspects(&self) -> usize {
        self.aspects
            .iter()
            .filter(|aspect| aspect.origin == ScoreOrigin::Defaulted)
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EssayFeedback {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl EssayFeedback {
    pub fn is_empty(&self) -> bool {
        self.strengths.is_empty() && self.weaknesses.is_empty() && self.recommendations.is_empty()
    }
}

/// Extractor output for one essay. Skills absent from the payload are absent here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBatch {
    pub scores: Vec<SkillScore>,
    pub feedback: EssayFeedback,
}

impl AnalysisBatch {
    pub fn score_for(&self, skill: SkillName) -> Option<&SkillScore> {
        self.scores.iter().find(|score| score.skill == skill)
    }

    pub fn unmeasured_skills(&self) -> Vec<SkillName> {
        SkillName::ALL
            .into_iter()
            .filter(|skill| self.score_for(*skill).is_none())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MasteryRecord {
    pub skill: SkillName,
    pub level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    Essay,
    PracticeTest,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillChange {
    pub skill: SkillName,
    pub previous_level: f64,
    pub new_level: f64,
    pub improvement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentHistoryEntry {
    pub id: Uuid,
    pub kind: AssessmentKind,
    pub essay_ref: String,
    pub assessed_at: DateTime<Utc>,
    pub per_skill: Vec<SkillChange>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Beginner,
    Intermediate,
    Advanced,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Beginner => "beginner",
            Tier::Intermediate => "intermediate",
            Tier::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendedSkill {
    pub skill: SkillName,
    pub priority: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub skill: SkillName,
    pub target_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPath {
    pub tier: Tier,
    pub recommended_skills: Vec<RecommendedSkill>,
    pub next_milestone: Option<Milestone>,
}

/// Root entity per student. Overall progress is derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentAggregate {
    pub student_id: String,
    pub skills: Vec<MasteryRecord>,
    pub learning_path: LearningPath,
    #[serde(default)]
    pub history: Vec<AssessmentHistoryEntry>,
}

impl AssessmentAggregate {
    pub fn level(&self, skill: SkillName) -> Option<f64> {
        self.skills
            .iter()
            .find(|record| record.skill == skill)
            .map(|record| record.level)
    }

    pub fn record_mut(&mut self, skill: SkillName) -> Option<&mut MasteryRecord> {
        self.skills.iter_mut().find(|record| record.skill == skill)
    }

    pub fn overall_progress(&self) -> f64 {
        mean_level(&self.skills)
    }

    /// Rejects aggregates whose skill taxonomy is out of sync with `SkillName::ALL`
    /// or whose levels fall outside [0, 100].
    pub fn validate(&self) -> Result<(), MasteryError> {
        for skill in SkillName::ALL {
            match self.skills.iter().filter(|record| record.skill == skill).count() {
                0 => return Err(MasteryError::MissingSkill(skill)),
                1 => {}
                _ => return Err(MasteryError::DuplicateSkill(skill)),
            }
        }
        if let Some(record) = self
            .skills
            .iter()
            .find(|record| !(0.0..=100.0).contains(&record.level))
        {
            return Err(MasteryError::LevelOutOfRange {
                skill: record.skill,
                level: record.level,
            });
        }
        Ok(())
    }

    /// Puts the skill records back into enumeration order.
    pub fn normalize_order(&mut self) {
        self.skills.sort_by_key(|record| record.skill.position());
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            student_id: self.student_id.clone(),
            skills: self.skills.clone(),
            overall_progress: self.overall_progress(),
            learning_path: self.learning_path.clone(),
        }
    }
}

pub fn mean_level(skills: &[MasteryRecord]) -> f64 {
    if skills.is_empty() {
        0.0
    } else {
        skills.iter().map(|record| record.level).sum::<f64>() / skills.len() as f64
    }
}

/// Presentation value handed to whatever renders or serializes progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub student_id: String,
    pub skills: Vec<MasteryRecord>,
    pub overall_progress: f64,
    pub learning_path: LearningPath,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skill_names_parse_case_insensitively() {
        assert_eq!(
            "Thesis_Construction".parse::<SkillName>().unwrap(),
            SkillName::ThesisConstruction
        );
        assert!(matches!(
            "grammar".parse::<SkillName>(),
            Err(MasteryError::UnknownSkill(name)) if name == "grammar"
        ));
    }

    #[test]
    fn skill_names_serialize_snake_case() {
        let json = serde_json::to_string(&SkillName::CounterArgumentHandling).unwrap();
        assert_eq!(json, "\"counter_argument_handling\"");
        for skill in SkillName::ALL {
            assert_eq!(skill.to_string(), skill.as_str());
            assert!(!skill.aspects().is_empty());
        }
    }

    #[test]
    fn enumeration_positions_follow_declaration_order() {
        assert_eq!(SkillName::ThesisConstruction.position(), 0);
        assert_eq!(SkillName::ArgumentStructure.position(), 7);
    }

    #[test]
    fn unmeasured_skills_lists_absent_ones() {
        let batch = AnalysisBatch {
            scores: vec![SkillScore {
                skill: SkillName::LogicalReasoning,
                value: 60.0,
                aspects: Vec::new(),
            }],
            feedback: EssayFeedback::default(),
        };
        let unmeasured = batch.unmeasured_skills();
        assert_eq!(unmeasured.len(), 7);
        assert!(!unmeasured.contains(&SkillName::LogicalReasoning));
    }

    #[test]
    fn measured_flag_requires_one_measured_aspect() {
        let mut score = SkillScore {
            skill: SkillName::RhetoricalAwareness,
            value: 50.0,
            aspects: vec![AspectScore {
                aspect: "ethos".to_string(),
                value: 50.0,
                origin: ScoreOrigin::Defaulted,
                feedback: None,
            }],
        };
        assert!(!score.is_measured());
        assert_eq!(score.defaulted_aspects(), 1);
        score.aspects[0].origin = ScoreOrigin::Measured;
        assert!(score.is_measured());
    }

    #[test]
    fn validate_rejects_levels_outside_range() {
        let mut aggregate = AssessmentAggregate {
            student_id: "s".to_string(),
            skills: SkillName::ALL
                .iter()
                .map(|skill| MasteryRecord { skill: *skill, level: 0.0 })
                .collect(),
            learning_path: LearningPath {
                tier: Tier::Beginner,
                recommended_skills: Vec::new(),
                next_milestone: None,
            },
            history: Vec::new(),
        };
        assert!(aggregate.validate().is_ok());

        aggregate.skills[3].level = f64::NAN;
        assert!(matches!(
            aggregate.validate(),
            Err(MasteryError::LevelOutOfRange { skill: SkillName::CounterArgumentHandling, .. })
        ));
        aggregate.skills[3].level = -1.0;
        assert!(aggregate.validate().is_err());
        aggregate.skills[3].level = 100.0;
        assert!(aggregate.validate().is_ok());
    }

    #[test]
    fn normalize_order_restores_enumeration_order() {
        let mut aggregate = AssessmentAggregate {
            student_id: "s".to_string(),
            skills: SkillName::ALL
                .iter()
                .rev()
                .map(|skill| MasteryRecord { skill: *skill, level: 10.0 })
                .collect(),
            learning_path: LearningPath {
                tier: Tier::Beginner,
                recommended_skills: Vec::new(),
                next_milestone: None,
            },
            history: Vec::new(),
        };
        aggregate.normalize_order();
        let order: Vec<SkillName> = aggregate.skills.iter().map(|r| r.skill).collect();
        assert_eq!(order, SkillName::ALL.to_vec());
    }

    #[test]
    fn mean_level_of_nothing_is_zero() {
        assert_eq!(mean_level(&[]), 0.0);
    }
}
