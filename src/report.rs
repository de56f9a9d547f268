use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{AssessmentAggregate, AssessmentHistoryEntry, AssessmentKind, SkillName};
use crate::planner::LearningPathPlanner;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillImprovement {
    pub skill: SkillName,
    pub improvement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressTrend {
    pub assessed_at: DateTime<Utc>,
    pub essay_ref: String,
    pub kind: AssessmentKind,
    pub skills: Vec<SkillImprovement>,
}

pub fn progress_trends(history: &[AssessmentHistoryEntry]) -> Vec<ProgressTrend> {
    history
        .iter()
        .map(|entry| ProgressTrend {
            assessed_at: entry.assessed_at,
            essay_ref: entry.essay_ref.clone(),
            kind: entry.kind,
            skills: entry
                .per_skill
                .iter()
                .map(|change| SkillImprovement {
                    skill: change.skill,
                    improvement: change.improvement,
                })
                .collect(),
        })
        .collect()
}

pub fn build_report(aggregate: &AssessmentAggregate, planner: &LearningPathPlanner) -> String {
    let mut output = String::new();
    let path = &aggregate.learning_path;

    let _ = writeln!(output, "# Writing Skill Progress Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} assessments recorded)",
        aggregate.student_id,
        aggregate.history.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Overall progress: {:.1} ({})",
        aggregate.overall_progress(),
        path.tier
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Skill Levels");
    for record in &aggregate.skills {
        let _ = writeln!(output, "- {}: {:.0}", record.skill.label(), record.level);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommended Focus");
    if path.recommended_skills.is_empty() {
        let _ = writeln!(output, "No recommendations yet.");
    } else {
        for recommended in &path.recommended_skills {
            let _ = writeln!(
                output,
                "- {} (priority {:.2})",
                recommended.skill.label(),
                recommended.priority
            );
        }
    }
    if let Some(milestone) = &path.next_milestone {
        let _ = writeln!(
            output,
            "\nNext milestone: {} to {:.0}",
            milestone.skill.label(),
            milestone.target_level
        );
    }

    let steps = planner.next_steps(aggregate);
    if !steps.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Next Steps");
        for step in &steps {
            let _ = writeln!(output, "- {} ({:?} priority)", step.description, step.priority);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Progress Trends");
    let trends = progress_trends(&aggregate.history);
    if trends.is_empty() {
        let _ = writeln!(output, "No assessments recorded yet.");
    } else {
        for trend in trends.iter().rev().take(10) {
            let changes: Vec<String> = trend
                .skills
                .iter()
                .map(|s| format!("{} {:+.0}", s.skill, s.improvement))
                .collect();
            let summary = if changes.is_empty() {
                "no skills scored".to_string()
            } else {
                changes.join(", ")
            };
            let _ = writeln!(
                output,
                "- {} {}: {}",
                trend.assessed_at.format("%Y-%m-%d"),
                trend.essay_ref,
                summary
            );
        }
    }

    if let Some(latest) = aggregate.history.last() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Latest Feedback");
        for strength in &latest.strengths {
            let _ = writeln!(output, "- Strength: {strength}");
        }
        for weakness in &latest.weaknesses {
            let _ = writeln!(output, "- Weakness: {weakness}");
        }
        for recommendation in &latest.recommendations {
            let _ = writeln!(output, "- Try: {recommendation}");
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AssessmentEngine;
    use serde_json::json;

    #[test]
    fn trends_mirror_history_entries() {
        let engine = AssessmentEngine::default();
        let first = engine
            .assess_json(None, "s", "e1", &json!({ "thesis_construction": 80 }), Utc::now())
            .unwrap();
        let second = engine
            .assess_json(
                Some(first.aggregate),
                "s",
                "e2",
                &json!({ "thesis_construction": 0, "argument_structure": 100 }),
                Utc::now(),
            )
            .unwrap();
        let trends = progress_trends(&second.aggregate.history);
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[1].essay_ref, "e2");
        assert_eq!(trends[1].skills[0].improvement, -7.0);
        assert_eq!(trends[1].skills[1].skill, SkillName::ArgumentStructure);
    }

    #[test]
    fn report_contains_core_sections() {
        let engine = AssessmentEngine::default();
        let outcome = engine
            .assess_json(
                None,
                "avery",
                "essay-7",
                &json!({
                    "analysis": { "thesis_construction": 80 },
                    "feedback": { "strengths": ["Focused claim"], "specificSuggestions": ["Add data"] }
                }),
                Utc::now(),
            )
            .unwrap();
        let report = build_report(&outcome.aggregate, engine.planner());
        assert!(report.contains("Generated for avery (1 assessments recorded)"));
        assert!(report.contains("Overall progress: 3.0 (beginner)"));
        assert!(report.contains("- Thesis Construction: 24"));
        assert!(report.contains("Next milestone: Evidence Evaluation to 20"));
        assert!(report.contains("essay-7: thesis_construction +24"));
        assert!(report.contains("- Strength: Focused claim"));
        assert!(report.contains("- Try: Add data"));
    }

    #[test]
    fn empty_history_report() {
        let engine = AssessmentEngine::default();
        let aggregate = engine.new_aggregate("new-student");
        let report = build_report(&aggregate, engine.planner());
        assert!(report.contains("No assessments recorded yet."));
        assert!(!report.contains("## Latest Feedback"));
    }
}
