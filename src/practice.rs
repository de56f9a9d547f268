//! Practice tests targeted at a student's weakest skills.

use serde::{Deserialize, Serialize};

use crate::models::{AssessmentAggregate, RecommendedSkill, SkillName, Tier};
use crate::planner::LearningPathPlanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Video,
    Article,
    Worksheet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningResource {
    pub kind: ResourceKind,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub skill: SkillName,
    pub difficulty: Tier,
    pub description: String,
    pub estimated_minutes: u32,
    pub resources: Vec<LearningResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticePlan {
    pub target_skills: Vec<RecommendedSkill>,
    pub exercises: Vec<Exercise>,
    pub estimated_minutes: u32,
    /// The student's current tier.
    pub difficulty: Tier,
    pub focus_areas: Vec<SkillName>,
}

pub fn resources_for(skill: SkillName) -> Vec<LearningResource> {
    let entries: &[(ResourceKind, &str)] = match skill {
        SkillName::ThesisConstruction => &[
            (ResourceKind::Video, "Crafting Strong Thesis Statements"),
            (ResourceKind::Article, "Thesis Writing Guide"),
        ],
        SkillName::EvidenceEvaluation => &[
            (ResourceKind::Article, "Judging Source Credibility"),
            (ResourceKind::Worksheet, "Is This Evidence Sufficient?"),
        ],
        SkillName::LogicalReasoning => &[
            (ResourceKind::Video, "Common Logical Fallacies"),
            (ResourceKind::Worksheet, "Valid and Sound Arguments"),
        ],
        SkillName::CounterArgumentHandling => &[
            (ResourceKind::Article, "Anticipating Objections"),
        ],
        SkillName::ConclusionSynthesis => &[
            (ResourceKind::Article, "Conclusions That Synthesize"),
        ],
        SkillName::RhetoricalAwareness => &[
            (ResourceKind::Video, "Ethos, Pathos and Logos in Practice"),
        ],
        SkillName::SourceIntegration => &[
            (ResourceKind::Article, "Quoting, Paraphrasing and Attribution"),
            (ResourceKind::Worksheet, "Citation Formatting Drill"),
        ],
        SkillName::ArgumentStructure => &[
            (ResourceKind::Worksheet, "Outlining an Argument"),
            (ResourceKind::Article, "Transitions Between Claims"),
        ],
    };
    entries
        .iter()
        .map(|(kind, title)| LearningResource {
            kind: *kind,
            title: (*title).to_string(),
        })
        .collect()
}

/// One exercise per recommended skill, pitched at that skill's own level band.
pub fn build_plan(
    aggregate: &AssessmentAggregate,
    planner: &LearningPathPlanner,
    minutes_per_exercise: u32,
) -> PracticePlan {
    let target_skills = aggregate.learning_path.recommended_skills.clone();
    let exercises: Vec<Exercise> = target_skills
        .iter()
        .map(|target| {
            let level = aggregate.level(target.skill).unwrap_or(0.0);
            let difficulty = planner.tier(level);
            Exercise {
                skill: target.skill,
                difficulty,
                description: format!(
                    "{} practice exercise for {}",
                    capitalize(difficulty.as_str()),
                    target.skill.label().to_lowercase()
                ),
                estimated_minutes: minutes_per_exercise,
                resources: resources_for(target.skill),
            }
        })
        .collect();

    PracticePlan {
        estimated_minutes: exercises.len() as u32 * minutes_per_exercise,
        focus_areas: target_skills.iter().map(|target| target.skill).collect(),
        difficulty: aggregate.learning_path.tier,
        target_skills,
        exercises,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
