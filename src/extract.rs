//! Skill extraction from untrusted essay-analysis output.
//!
//! Extraction never fails: an aspect with no number in the analysis falls back
//! to the configured default score and is marked `ScoreOrigin::Defaulted`, so
//! callers can still tell a measured 50 from a guessed one.

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::models::{AnalysisBatch, AspectScore, EssayFeedback, ScoreOrigin, SkillName, SkillScore};

pub const DEFAULT_RECOMMENDATION: &str = "Practice more with similar exercises.";

/// Aspect name recorded when a payload gives one number for the whole skill.
const OVERALL_ASPECT: &str = "overall";

#[derive(Debug, Clone)]
struct AspectPattern {
    aspect: &'static str,
    score: Option<Regex>,
    feedback: Option<Regex>,
}

impl AspectPattern {
    fn new(aspect: &'static str) -> Self {
        let escaped = regex::escape(aspect);
        Self {
            aspect,
            score: Regex::new(&format!(r"(?i){escaped}.*?(\d+)")).ok(),
            feedback: Regex::new(&format!(r"(?i){escaped}[^.]*\.([^\n]+)")).ok(),
        }
    }

    fn find_score(&self, text: &str) -> Option<f64> {
        self.score
            .as_ref()?
            .captures(text)?
            .get(1)?
            .as_str()
            .parse::<f64>()
            .ok()
    }

    fn find_feedback(&self, text: &str) -> Option<String> {
        let found = self.feedback.as_ref()?.captures(text)?.get(1)?.as_str().trim();
        if found.is_empty() {
            None
        } else {
            Some(found.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkillExtractor {
    default_score: f64,
    strength_threshold: f64,
    critical_threshold: f64,
    patterns: Vec<(SkillName, Vec<AspectPattern>)>,
    recommendations: Option<Regex>,
}

impl Default for SkillExtractor {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl SkillExtractor {
    pub fn new(config: &EngineConfig) -> Self {
        let patterns = SkillName::ALL
            .into_iter()
            .map(|skill| {
                let aspects = skill.aspects().iter().copied().map(AspectPattern::new).collect();
                (skill, aspects)
            })
            .collect();

        Self {
            default_score: config.default_score,
            strength_threshold: config.strength_threshold,
            critical_threshold: config.critical_threshold,
            patterns,
            recommendations: Regex::new(r"(?i)recommendations?:([^\n]+)").ok(),
        }
    }

    fn aspect_patterns(&self, skill: SkillName) -> &[AspectPattern] {
        self.patterns
            .iter()
            .find(|(candidate, _)| *candidate == skill)
            .map(|(_, patterns)| patterns.as_slice())
            .unwrap_or(&[])
    }

    /// Scores one skill from a free-text analysis by finding a number after each aspect name.
    pub fn extract_text(&self, skill: SkillName, text: &str) -> SkillScore {
        let aspects: Vec<AspectScore> = self
            .aspect_patterns(skill)
            .iter()
            .map(|pattern| {
                let feedback = pattern.find_feedback(text);
                match pattern.find_score(text) {
                    Some(value) => AspectScore {
                        aspect: pattern.aspect.to_string(),
                        value,
                        origin: ScoreOrigin::Measured,
                        feedback,
                    },
                    None => self.defaulted_aspect(pattern.aspect, feedback),
                }
            })
            .collect();

        let score = SkillScore {
            skill,
            value: self.combine(&aspects),
            aspects,
        };
        debug!(
            target: "skill_mastery",
            %skill,
            value = score.value,
            defaulted = score.defaulted_aspects(),
            "Extracted skill score from text"
        );
        score
    }

    /// Learning recommendations written after a `Recommendations:` marker, split on `;`.
    pub fn extract_recommendations(&self, text: &str) -> Vec<String> {
        let found: Vec<String> = self
            .recommendations
            .as_ref()
            .and_then(|re| re.captures(text))
            .and_then(|caps| caps.get(1))
            .map(|m| {
                m.as_str()
                    .split(';')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if found.is_empty() {
            vec![DEFAULT_RECOMMENDATION.to_string()]
        } else {
            found
        }
    }

    /// Builds a batch from one analysis text per skill. Repeated skills keep the first text.
    pub fn extract_text_batch(&self, analyses: &[(SkillName, String)]) -> AnalysisBatch {
        let mut scores: Vec<SkillScore> = Vec::new();
        let mut recommendations: Vec<String> = Vec::new();

        for (skill, text) in analyses {
            if scores.iter().any(|score| score.skill == *skill) {
                warn!(target: "skill_mastery", %skill, "Ignoring repeated analysis for skill");
                continue;
            }
            scores.push(self.extract_text(*skill, text));
            for item in self.extract_recommendations(text) {
                push_unique(&mut recommendations, item);
            }
        }

        scores.sort_by_key(|score| score.skill.position());
        let mut feedback = self.derive_feedback(&scores);
        feedback.recommendations = recommendations;
        AnalysisBatch { scores, feedback }
    }

    /// Reads a loosely shaped JSON payload, either a bare `{skill: value}` map or an
    /// `{analysis, feedback}` envelope. Unknown skills are skipped.
    pub fn extract_json(&self, payload: &Value) -> AnalysisBatch {
        let (analysis, envelope_feedback) = match payload.get("analysis") {
            Some(inner) if inner.is_object() => (inner, payload.get("feedback")),
            _ => (payload, None),
        };

        let Some(map) = analysis.as_object() else {
            warn!(target: "skill_mastery", "Analysis payload is not a JSON object; no skills measured");
            return AnalysisBatch::default();
        };

        let mut scores = Vec::new();
        let mut recommendations = Vec::new();
        for (key, value) in map {
            let skill = match key.parse::<SkillName>() {
                Ok(skill) => skill,
                Err(_) => {
                    warn!(target: "skill_mastery", key = %key, "Skipping unknown skill in analysis payload");
                    continue;
                }
            };
            if scores.iter().any(|score: &SkillScore| score.skill == skill) {
                continue;
            }
            if let Value::Object(fields) = value {
                for item in string_list(fields.get("recommendations")) {
                    push_unique(&mut recommendations, item);
                }
            }
            scores.push(self.score_from_value(skill, value));
        }
        scores.sort_by_key(|score| score.skill.position());

        let mut feedback = envelope_feedback.map(feedback_from_value).unwrap_or_default();
        if feedback.is_empty() {
            feedback = self.derive_feedback(&scores);
            feedback.recommendations.extend(recommendations);
        }
        AnalysisBatch { scores, feedback }
    }

    fn score_from_value(&self, skill: SkillName, value: &Value) -> SkillScore {
        match value {
            Value::Object(fields) => self.score_from_object(skill, fields),
            Value::String(text) => match text.trim().parse::<f64>() {
                Ok(number) => self.single_measured(skill, number),
                Err(_) => self.extract_text(skill, text),
            },
            other => match other.as_f64() {
                Some(number) => self.single_measured(skill, number),
                None => self.all_defaulted(skill),
            },
        }
    }

    fn score_from_object(&self, skill: SkillName, fields: &Map<String, Value>) -> SkillScore {
        let aspect_map = fields
            .get("aspects")
            .and_then(Value::as_object)
            .unwrap_or(fields);

        let aspects: Vec<AspectScore> = skill
            .aspects()
            .iter()
            .map(|aspect| {
                let entry = aspect_map
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(aspect))
                    .map(|(_, value)| value);
                let (value, feedback) = match entry {
                    Some(Value::Object(inner)) => (
                        inner.get("score").and_then(number_from_value),
                        inner.get("feedback").and_then(Value::as_str).map(str::to_string),
                    ),
                    Some(other) => (number_from_value(other), None),
                    None => (None, None),
                };
                match value {
                    Some(value) => AspectScore {
                        aspect: aspect.to_string(),
                        value,
                        origin: ScoreOrigin::Measured,
                        feedback,
                    },
                    None => self.defaulted_aspect(aspect, feedback),
                }
            })
            .collect();

        if aspects.iter().all(|a| a.origin == ScoreOrigin::Defaulted) {
            let overall = ["overallScore", "overall_score", "score"]
                .iter()
                .find_map(|key| fields.get(*key).and_then(number_from_value));
            if let Some(number) = overall {
                return self.single_measured(skill, number);
            }
        }

        SkillScore {
            skill,
            value: self.combine(&aspects),
            aspects,
        }
    }

    fn single_measured(&self, skill: SkillName, value: f64) -> SkillScore {
        let aspects = vec![AspectScore {
            aspect: OVERALL_ASPECT.to_string(),
            value,
            origin: ScoreOrigin::Measured,
            feedback: None,
        }];
        SkillScore {
            skill,
            value: self.combine(&aspects),
            aspects,
        }
    }

    fn all_defaulted(&self, skill: SkillName) -> SkillScore {
        let aspects: Vec<AspectScore> = skill
            .aspects()
            .iter()
            .map(|aspect| self.defaulted_aspect(aspect, None))
            .collect();
        SkillScore {
            skill,
            value: self.combine(&aspects),
            aspects,
        }
    }

    fn defaulted_aspect(&self, aspect: &str, feedback: Option<String>) -> AspectScore {
        AspectScore {
            aspect: aspect.to_string(),
            value: self.default_score,
            origin: ScoreOrigin::Defaulted,
            feedback,
        }
    }

    /// Unweighted mean, rounded to the nearest integer, then clamped to [0, 100].
    fn combine(&self, aspects: &[AspectScore]) -> f64 {
        if aspects.is_empty() {
            return self.default_score;
        }
        let mean = aspects.iter().map(|a| a.value).sum::<f64>() / aspects.len() as f64;
        if mean.is_nan() {
            return self.default_score;
        }
        mean.round().clamp(0.0, 100.0)
    }

    /// Strengths and weaknesses implied by the scores when the payload carries none.
    pub fn derive_feedback(&self, scores: &[SkillScore]) -> EssayFeedback {
        let mut feedback = EssayFeedback::default();
        for score in scores {
            if score.value >= self.strength_threshold {
                feedback
                    .strengths
                    .push(format!("Strong {} ({:.0})", score.skill.label().to_lowercase(), score.value));
            } else if score.value < self.critical_threshold {
                feedback
                    .weaknesses
                    .push(format!("{} needs work ({:.0})", score.skill.label(), score.value));
            }
        }
        feedback
    }
}

fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::String(text) => text.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn feedback_from_value(value: &Value) -> EssayFeedback {
    let mut recommendations = string_list(value.get("specificSuggestions"));
    for item in string_list(value.get("recommendations")) {
        push_unique(&mut recommendations, item);
    }
    EssayFeedback {
        strengths: string_list(value.get("strengths")),
        weaknesses: string_list(value.get("weaknesses")),
        recommendations,
    }
}

fn push_unique(items: &mut Vec<String>, item: String) {
    if !items.contains(&item) {
        items.push(item);
    }
}
